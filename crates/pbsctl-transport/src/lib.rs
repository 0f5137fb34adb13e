//! Authenticated HTTPS transport for the PBS JSON API.
//!
//! [`Transport`] is the lone seam between the resource clients/session layer
//! and the wire: a live [`ReqwestTransport`] for production use, and a
//! scripted [`mock::MockTransport`] (feature `test-util`-free — always
//! available so `pbsctl-reconcile`'s tests can depend on it directly) for
//! exercising the reconciler without a live server.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod reqwest_transport;

pub mod mock;

pub use reqwest_transport::ReqwestTransport;

use async_trait::async_trait;
use pbsctl_error::PbsError;
use std::collections::BTreeMap;

/// Raw, additional request headers beyond `Content-Type`/`Accept`, keyed by
/// header name. Used by the session layer to inject the ticket cookie, the
/// CSRF prevention header, and the `Authorization: PBSAPIToken=...` header.
pub type Headers = BTreeMap<String, String>;

/// The decoded `data` field of a PBS JSON envelope, plus the raw status code
/// for callers that need it (task submission endpoints return the UPID as a
/// bare string under `data`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// The JSON value under the server's `data` key (or `Value::Null` if absent).
    pub data: serde_json::Value,
}

impl Envelope {
    /// Wrap a `data` payload directly — used by [`mock::MockTransport`] and
    /// tests that don't round-trip through JSON bytes.
    pub fn new(data: serde_json::Value) -> Self {
        Self { data }
    }

    /// Deserialize `data` into `T`, surfacing a
    /// [`pbsctl_error::ErrorCode::TransportMalformedResponse`] on mismatch.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, PbsError> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            PbsError::new(
                pbsctl_error::ErrorCode::TransportMalformedResponse,
                format!("failed to decode response data: {e}"),
            )
        })
    }
}

/// The authenticated HTTPS transport seam.
///
/// Implementations decode the server's JSON envelope and classify non-2xx
/// responses into the error taxonomy (`TransportNetwork`/`TransportTls` for
/// connection-level failures, `AuthUnauthorized`/`AuthForbidden` for
/// 401/403, `NotFoundResource` for 404, `ConflictDigestMismatch` for 412,
/// and `Internal` with a body excerpt for other 4xx/5xx). Implementations
/// do not retry; retry policy (auth replay, lock contention) lives above
/// this seam in `pbsctl-session` and `pbsctl-reconcile`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `GET path`. `path` begins with `/`; the base URL is prepended by the
    /// implementation. Percent-encoding of path segments is the caller's
    /// responsibility.
    async fn get(&self, path: &str, headers: &Headers) -> Result<Envelope, PbsError>;

    /// `POST path` with a JSON body.
    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        headers: &Headers,
    ) -> Result<Envelope, PbsError>;

    /// `PUT path` with a JSON body.
    async fn put(
        &self,
        path: &str,
        body: &serde_json::Value,
        headers: &Headers,
    ) -> Result<Envelope, PbsError>;

    /// `DELETE path`.
    async fn delete(&self, path: &str, headers: &Headers) -> Result<Envelope, PbsError>;
}
