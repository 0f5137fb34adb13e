//! Notification endpoints (per-kind), matchers, and the aggregate
//! `targets` read-only view.

use crate::client::ResourceClient;
use crate::WriteOutcome;
use pbsctl_error::PbsError;
use pbsctl_transport::{Headers, Transport};

const MATCHERS_PATH: &str = "/api2/json/config/notifications/matchers";
const TARGETS_PATH: &str = "/api2/json/config/notifications/targets";

/// Notification endpoint transport kinds PBS exposes under
/// `/config/notifications/endpoints/{kind}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationEndpointKind {
    /// SMTP email endpoint.
    Smtp,
    /// Gotify push endpoint.
    Gotify,
    /// Local `sendmail` endpoint.
    Sendmail,
    /// Generic webhook endpoint.
    Webhook,
}

impl NotificationEndpointKind {
    fn segment(self) -> &'static str {
        match self {
            Self::Smtp => "smtp",
            Self::Gotify => "gotify",
            Self::Sendmail => "sendmail",
            Self::Webhook => "webhook",
        }
    }
}

/// CRUD client for `/config/notifications/endpoints/{kind}`.
pub struct NotificationEndpointClient<'t> {
    transport: &'t dyn Transport,
    inner: ResourceClient,
}

impl<'t> NotificationEndpointClient<'t> {
    /// A client bound to the given transport and endpoint kind.
    pub fn new(transport: &'t dyn Transport, kind: NotificationEndpointKind) -> Self {
        let base_path: &'static str = match kind {
            NotificationEndpointKind::Smtp => "/api2/json/config/notifications/endpoints/smtp",
            NotificationEndpointKind::Gotify => "/api2/json/config/notifications/endpoints/gotify",
            NotificationEndpointKind::Sendmail => "/api2/json/config/notifications/endpoints/sendmail",
            NotificationEndpointKind::Webhook => "/api2/json/config/notifications/endpoints/webhook",
        };
        debug_assert!(base_path.ends_with(kind.segment()));
        Self {
            transport,
            inner: ResourceClient::new(base_path),
        }
    }

    /// `GET` the endpoint list for this kind.
    pub async fn list(&self, headers: &Headers) -> Result<Vec<serde_json::Value>, PbsError> {
        self.inner.list(self.transport, headers).await
    }

    /// `GET` a single endpoint by name.
    pub async fn get(&self, headers: &Headers, name: &str) -> Result<serde_json::Value, PbsError> {
        self.inner.get(self.transport, headers, name).await
    }

    /// `POST` a new endpoint.
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

    /// `DELETE` an endpoint; idempotent.
    pub async fn delete(&self, headers: &Headers, name: &str) -> Result<WriteOutcome, PbsError> {
        self.inner.delete(self.transport, headers, name).await
    }
}

/// CRUD client for `/config/notifications/matchers`.
pub struct NotificationMatcherClient<'t> {
    transport: &'t dyn Transport,
    inner: ResourceClient,
}

impl<'t> NotificationMatcherClient<'t> {
    /// A client bound to the given transport.
    pub fn new(transport: &'t dyn Transport) -> Self {
        Self {
            transport,
            inner: ResourceClient::new(MATCHERS_PATH),
        }
    }

    /// `GET` the matcher list.
    pub async fn list(&self, headers: &Headers) -> Result<Vec<serde_json::Value>, PbsError> {
        self.inner.list(self.transport, headers).await
    }

    /// `GET` a single matcher by name.
    pub async fn get(&self, headers: &Headers, name: &str) -> Result<serde_json::Value, PbsError> {
        self.inner.get(self.transport, headers, name).await
    }

    /// `POST` a new matcher.
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

    /// `DELETE` a matcher; idempotent.
    pub async fn delete(&self, headers: &Headers, name: &str) -> Result<WriteOutcome, PbsError> {
        self.inner.delete(self.transport, headers, name).await
    }

    /// `GET /config/notifications/targets` — read-only aggregate view over
    /// both endpoints and matchers, as PBS reports them together.
    pub async fn list_targets(&self, headers: &Headers) -> Result<Vec<serde_json::Value>, PbsError> {
        let envelope = self.transport.get(TARGETS_PATH, headers).await?;
        envelope.decode()
    }
}
