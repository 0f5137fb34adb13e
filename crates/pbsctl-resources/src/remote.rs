//! Remote (peer PBS instance) CRUD plus the `scan` family-specific
//! operation for enumerating datastores visible on a remote.

use crate::client::ResourceClient;
use crate::WriteOutcome;
use pbsctl_error::PbsError;
use pbsctl_transport::{Headers, Transport};

const BASE_PATH: &str = "/api2/json/config/remote";

/// CRUD client for `/config/remote`.
pub struct RemoteClient<'t> {
    transport: &'t dyn Transport,
    inner: ResourceClient,
}

impl<'t> RemoteClient<'t> {
    /// A client bound to the given transport.
    pub fn new(transport: &'t dyn Transport) -> Self {
        Self {
            transport,
            inner: ResourceClient::new(BASE_PATH),
        }
    }

    /// `GET /config/remote`.
    pub async fn list(&self, headers: &Headers) -> Result<Vec<serde_json::Value>, PbsError> {
        self.inner.list(self.transport, headers).await
    }

    /// `GET /config/remote/{name}`.
    pub async fn get(&self, headers: &Headers, name: &str) -> Result<serde_json::Value, PbsError> {
        self.inner.get(self.transport, headers, name).await
    }

    /// `POST /config/remote`.
    pub async fn create(&self, headers: &Headers, body: &serde_json::Value) -> Result<WriteOutcome, PbsError> {
        self.inner.create(self.transport, headers, body).await
    }

    /// `PUT /config/remote/{name}`.
    pub async fn update(
        &self,
        headers: &Headers,
        name: &str,
        body: &serde_json::Value,
    ) -> Result<WriteOutcome, PbsError> {
        self.inner.update(self.transport, headers, name, body).await
    }

    /// `DELETE /config/remote/{name}`; idempotent.
    pub async fn delete(&self, headers: &Headers, name: &str) -> Result<WriteOutcome, PbsError> {
        self.inner.delete(self.transport, headers, name).await
    }

    /// `GET /config/remote/{name}/scan[/{store}]` — enumerate datastores (or
    /// namespaces within `store`) visible through this remote's credentials.
    pub async fn scan(
        &self,
        headers: &Headers,
        name: &str,
        store: Option<&str>,
    ) -> Result<serde_json::Value, PbsError> {
        let path = match store {
            Some(store) => format!("{BASE_PATH}/{name}/scan/{store}"),
            None => format!("{BASE_PATH}/{name}/scan"),
        };
        let envelope = self.transport.get(&path, headers).await?;
        Ok(envelope.data)
    }
}
