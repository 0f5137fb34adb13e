//! S3-compatible storage endpoint CRUD: `/config/s3-endpoints`.
//!
//! Not to be confused with an S3-backed datastore's `backend` property
//! string (see `pbsctl-mapping::BackendConfig`) — this is the reusable
//! named endpoint (credentials + region + host) that a datastore's
//! `client` field references.

use crate::client::ResourceClient;
use crate::WriteOutcome;
use pbsctl_error::PbsError;
use pbsctl_transport::{Headers, Transport};

const BASE_PATH: &str = "/api2/json/config/s3-endpoints";

/// CRUD client for `/config/s3-endpoints`.
pub struct S3EndpointClient<'t> {
    transport: &'t dyn Transport,
    inner: ResourceClient,
}

impl<'t> S3EndpointClient<'t> {
    /// A client bound to the given transport.
    pub fn new(transport: &'t dyn Transport) -> Self {
        Self {
            transport,
            inner: ResourceClient::new(BASE_PATH),
        }
    }

    /// `GET /config/s3-endpoints`.
    pub async fn list(&self, headers: &Headers) -> Result<Vec<serde_json::Value>, PbsError> {
        self.inner.list(self.transport, headers).await
    }

    /// `GET /config/s3-endpoints/{id}`.
    pub async fn get(&self, headers: &Headers, id: &str) -> Result<serde_json::Value, PbsError> {
        self.inner.get(self.transport, headers, id).await
    }

    /// `POST /config/s3-endpoints`. The secret key is write-only; callers
    /// populate it from a [`pbsctl_core::SensitiveOverlay`] before calling.
    pub async fn create(&self, headers: &Headers, body: &serde_json::Value) -> Result<WriteOutcome, PbsError> {
        self.inner.create(self.transport, headers, body).await
    }

    /// `PUT /config/s3-endpoints/{id}`.
    pub async fn update(
        &self,
        headers: &Headers,
        id: &str,
        body: &serde_json::Value,
    ) -> Result<WriteOutcome, PbsError> {
        self.inner.update(self.transport, headers, id, body).await
    }

    /// `DELETE /config/s3-endpoints/{id}`; idempotent.
    pub async fn delete(&self, headers: &Headers, id: &str) -> Result<WriteOutcome, PbsError> {
        self.inner.delete(self.transport, headers, id).await
    }
}
