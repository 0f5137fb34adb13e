//! Generic CRUD helper shared by every resource family.
//!
//! Resource schemas are owned by the embedding declarative framework, not
//! this crate, so the wire type defaults to [`serde_json::Value`]; the
//! generic parameter exists so a family can plug in a narrower
//! `Deserialize` target for `list`/`get` decoding when it wants one.

use crate::WriteOutcome;
use pbsctl_core::Upid;
use pbsctl_error::{ErrorCode, PbsError};
use pbsctl_transport::{Headers, Transport};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// CRUD client bound to one resource family's base path.
///
/// `W` is the shape `list`/`get` decode responses into; `create`/`update`
/// bodies are passed as raw [`serde_json::Value`] since the merged
/// fields+`delete`+`digest` body is assembled by the mapping layer, not by
/// this client.
pub struct ResourceClient<W = serde_json::Value> {
    base_path: &'static str,
    _marker: PhantomData<fn() -> W>,
}

impl<W> ResourceClient<W>
where
    W: DeserializeOwned,
{
    /// A client rooted at `base_path` (e.g. `"/api2/json/config/datastore"`).
    pub const fn new(base_path: &'static str) -> Self {
        Self {
            base_path,
            _marker: PhantomData,
        }
    }

    /// `base_path` this client was constructed with.
    pub fn base_path(&self) -> &'static str {
        self.base_path
    }

    /// `GET {base_path}`.
    pub async fn list(&self, transport: &dyn Transport, headers: &Headers) -> Result<Vec<W>, PbsError> {
        let envelope = transport.get(self.base_path, headers).await?;
        envelope.decode()
    }

    /// `GET {base_path}/{id}`.
    pub async fn get(&self, transport: &dyn Transport, headers: &Headers, id: &str) -> Result<W, PbsError> {
        let path = format!("{}/{}", self.base_path, id);
        let envelope = transport.get(&path, headers).await?;
        envelope.decode()
    }

    /// `POST {base_path}` with `body`.
    pub async fn create(
        &self,
        transport: &dyn Transport,
        headers: &Headers,
        body: &serde_json::Value,
    ) -> Result<WriteOutcome, PbsError> {
        let envelope = transport.post(self.base_path, body, headers).await?;
        classify_write_outcome(&envelope.data)
    }

    /// `PUT {base_path}/{id}` with `body`.
    pub async fn update(
        &self,
        transport: &dyn Transport,
        headers: &Headers,
        id: &str,
        body: &serde_json::Value,
    ) -> Result<WriteOutcome, PbsError> {
        let path = format!("{}/{}", self.base_path, id);
        let envelope = transport.put(&path, body, headers).await?;
        classify_write_outcome(&envelope.data)
    }

    /// `DELETE {base_path}/{id}`. A 404 is treated as success: destroy is
    /// idempotent.
    pub async fn delete(&self, transport: &dyn Transport, headers: &Headers, id: &str) -> Result<WriteOutcome, PbsError> {
        let path = format!("{}/{}", self.base_path, id);
        match transport.delete(&path, headers).await {
            Ok(envelope) => classify_write_outcome(&envelope.data),
            Err(err) if err.code == ErrorCode::NotFoundResource => Ok(WriteOutcome::Sync),
            Err(err) => Err(err),
        }
    }
}

/// A write response is either a direct success (`Sync`) or a UPID the
/// caller must hand to [`pbsctl_task::wait_for_task`] (`Async`).
pub(crate) fn classify_write_outcome(data: &serde_json::Value) -> Result<WriteOutcome, PbsError> {
    match data.as_str() {
        Some(s) if s.starts_with("UPID:") => {
            let upid: Upid = s.parse()?;
            Ok(WriteOutcome::Async(upid))
        }
        _ => Ok(WriteOutcome::Sync),
    }
}
