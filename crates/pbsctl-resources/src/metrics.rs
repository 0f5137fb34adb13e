//! Metrics server sinks: `/config/metrics/server/{influxdb-http,influxdb-udp}`.

use crate::client::ResourceClient;
use crate::WriteOutcome;
use pbsctl_error::PbsError;
use pbsctl_transport::{Headers, Transport};

/// Metrics sink protocol PBS exposes under `/config/metrics/server/{kind}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsServerKind {
    /// InfluxDB over HTTP.
    InfluxDbHttp,
    /// InfluxDB over UDP (line protocol, fire-and-forget).
    InfluxDbUdp,
}

impl MetricsServerKind {
    fn base_path(self) -> &'static str {
        match self {
            Self::InfluxDbHttp => "/api2/json/config/metrics/server/influxdb-http",
            Self::InfluxDbUdp => "/api2/json/config/metrics/server/influxdb-udp",
        }
    }
}

/// CRUD client for `/config/metrics/server/{kind}`.
pub struct MetricsServerClient<'t> {
    transport: &'t dyn Transport,
    inner: ResourceClient,
}

impl<'t> MetricsServerClient<'t> {
    /// A client bound to the given transport and sink kind.
    pub fn new(transport: &'t dyn Transport, kind: MetricsServerKind) -> Self {
        Self {
            transport,
            inner: ResourceClient::new(kind.base_path()),
        }
    }

    /// `GET` the sink list for this kind.
    pub async fn list(&self, headers: &Headers) -> Result<Vec<serde_json::Value>, PbsError> {
        self.inner.list(self.transport, headers).await
    }

    /// `GET` a single sink by name.
    pub async fn get(&self, headers: &Headers, name: &str) -> Result<serde_json::Value, PbsError> {
        self.inner.get(self.transport, headers, name).await
    }

    /// `POST` a new sink.
    pub async fn create(&self, headers: &Headers, body: &serde_json::Value) -> Result<WriteOutcome, PbsError> {
        self.inner.create(self.transport, headers, body).await
    }

    /// `PUT` an update.
    pub async fn update(
        &self,
        headers: &Headers,
        name: &str,
        body: &serde_json::Value,
    ) -> Result<WriteOutcome, PbsError> {
        self.inner.update(self.transport, headers, name, body).await
    }

    /// `DELETE` a sink; idempotent.
    pub async fn delete(&self, headers: &Headers, name: &str) -> Result<WriteOutcome, PbsError> {
        self.inner.delete(self.transport, headers, name).await
    }
}
