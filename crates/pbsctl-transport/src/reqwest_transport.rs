//! `reqwest`-backed [`Transport`] implementation with PBS's TLS trust policy.

use crate::{Envelope, Headers, Transport};
use async_trait::async_trait;
use pbsctl_core::{Credentials, TlsPolicy};
use pbsctl_error::{ErrorCode, PbsError};
use sha2::{Digest as _, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Live transport backed by a pooled `reqwest::Client`.
///
/// A single `Client` is built once per [`Credentials`] and cloned cheaply
/// (internally `Arc`-backed by `reqwest`) into every call site that needs
/// one; connection pooling is delegated entirely to `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Arc<url::Url>,
    pinned_fingerprint: Option<String>,
}

impl ReqwestTransport {
    /// Build a transport from [`Credentials`], applying the configured
    /// [`TlsPolicy`]. A pinned fingerprint implies skip-verify: normal CA
    /// validation is bypassed and only the pin governs trust, checked
    /// per-response against the peer certificate's DER SHA-256 digest.
    pub fn new(credentials: &Credentials) -> Result<Self, PbsError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .tls_info(true);

        let pinned_fingerprint = match &credentials.tls {
            TlsPolicy::Verify => None,
            TlsPolicy::Insecure => {
                builder = builder.danger_accept_invalid_certs(true);
                None
            }
            TlsPolicy::Pinned(fingerprint) => {
                builder = builder.danger_accept_invalid_certs(true);
                Some(normalize_fingerprint(fingerprint))
            }
        };

        let client = builder.build().map_err(|e| {
            PbsError::new(
                ErrorCode::TransportTls,
                format!("failed to build HTTPS client: {e}"),
            )
        })?;

        Ok(Self {
            client,
            base_url: Arc::new(credentials.endpoint.clone()),
            pinned_fingerprint,
        })
    }

    fn url_for(&self, path: &str) -> Result<url::Url, PbsError> {
        self.base_url.join(path).map_err(|e| {
            PbsError::new(ErrorCode::TransportNetwork, format!("invalid path {path:?}: {e}"))
                .with_context("path", path)
        })
    }

    async fn dispatch(&self, request: reqwest::RequestBuilder, path: &str) -> Result<Envelope, PbsError> {
        let response = request.send().await.map_err(classify_request_error)?;

        if let Some(expected) = &self.pinned_fingerprint {
            verify_pin(&response, expected)?;
        }

        let status = response.status();
        let body_text = response.text().await.map_err(|e| {
            PbsError::new(
                ErrorCode::TransportMalformedResponse,
                format!("failed to read response body: {e}"),
            )
        })?;

        if status.is_success() {
            return decode_envelope(&body_text);
        }

        Err(classify_status_error(status, &body_text, path))
    }

    /// `GET`.
    pub async fn raw_get(&self, path: &str, headers: &Headers) -> Result<Envelope, PbsError> {
        let url = self.url_for(path)?;
        let mut req = self.client.get(url);
        req = apply_headers(req, headers);
        self.dispatch(req, path).await
    }
}

fn apply_headers(mut req: reqwest::RequestBuilder, headers: &Headers) -> reqwest::RequestBuilder {
    for (k, v) in headers {
        req = req.header(k, v);
    }
    req
}

fn decode_envelope(body_text: &str) -> Result<Envelope, PbsError> {
    let value: serde_json::Value = serde_json::from_str(body_text).map_err(|e| {
        PbsError::new(
            ErrorCode::TransportMalformedResponse,
            format!("response body is not valid JSON: {e}"),
        )
    })?;
    let data = value.get("data").cloned().unwrap_or(serde_json::Value::Null);
    Ok(Envelope::new(data))
}

fn classify_request_error(err: reqwest::Error) -> PbsError {
    if err.is_timeout() || err.is_connect() {
        PbsError::new(ErrorCode::TransportNetwork, err.to_string())
    } else if err.is_builder() {
        PbsError::new(ErrorCode::TransportTls, err.to_string())
    } else {
        PbsError::new(ErrorCode::TransportNetwork, err.to_string())
    }
}

fn classify_status_error(status: reqwest::StatusCode, body_excerpt: &str, path: &str) -> PbsError {
    let excerpt: String = body_excerpt.chars().take(500).collect();
    let code = match status.as_u16() {
        401 => ErrorCode::AuthUnauthorized,
        403 => ErrorCode::AuthForbidden,
        404 => ErrorCode::NotFoundResource,
        412 => ErrorCode::ConflictDigestMismatch,
        _ => ErrorCode::Internal,
    };
    PbsError::new(code, format!("HTTP {status} from {path}"))
        .with_context("path", path)
        .with_context("status", status.as_u16())
        .with_context("body_excerpt", excerpt)
}

fn normalize_fingerprint(fingerprint: &str) -> String {
    fingerprint.to_lowercase().replace(':', "")
}

fn verify_pin(response: &reqwest::Response, expected: &str) -> Result<(), PbsError> {
    let Some(cert) = response.extensions().get::<reqwest::tls::TlsInfo>() else {
        return Err(PbsError::new(
            ErrorCode::TransportTls,
            "pinned TLS policy configured but no certificate info available",
        ));
    };
    let Some(der) = cert.peer_certificate() else {
        return Err(PbsError::new(
            ErrorCode::TransportTls,
            "pinned TLS policy configured but peer certificate is unavailable",
        ));
    };
    let digest = Sha256::digest(der);
    let actual = hex_lower(&digest);
    if actual != expected {
        return Err(PbsError::new(
            ErrorCode::TransportTls,
            "server certificate fingerprint does not match pinned value",
        )
        .with_context("expected", expected)
        .with_context("actual", actual));
    }
    Ok(())
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, path: &str, headers: &Headers) -> Result<Envelope, PbsError> {
        self.raw_get(path, headers).await
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        headers: &Headers,
    ) -> Result<Envelope, PbsError> {
        let url = self.url_for(path)?;
        let mut req = self.client.post(url).json(body);
        req = apply_headers(req, headers);
        self.dispatch(req, path).await
    }

    async fn put(
        &self,
        path: &str,
        body: &serde_json::Value,
        headers: &Headers,
    ) -> Result<Envelope, PbsError> {
        let url = self.url_for(path)?;
        let mut req = self.client.put(url).json(body);
        req = apply_headers(req, headers);
        self.dispatch(req, path).await
    }

    async fn delete(&self, path: &str, headers: &Headers) -> Result<Envelope, PbsError> {
        let url = self.url_for(path)?;
        let mut req = self.client.delete(url);
        req = apply_headers(req, headers);
        self.dispatch(req, path).await
    }
}
