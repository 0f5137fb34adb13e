//! Ticket/CSRF session lifecycle.
//!
//! `Unauthenticated -> Authenticating -> Authenticated -> Expired ->
//! Authenticating`. API-token credentials short-circuit the whole state
//! machine: [`Session::ensure`] just returns the `Authorization` header,
//! no ticket is ever acquired, and CSRF is not required.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use pbsctl_core::{AuthMethod, Credentials};
use pbsctl_error::{ErrorCode, PbsError};
use pbsctl_transport::{Headers, Transport};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// PBS tickets are valid for two hours; refreshed at 90% of that window so
/// a racing request never observes a server-side-expired-but-locally-fresh
/// ticket.
const TICKET_VALIDITY: Duration = Duration::from_secs(2 * 60 * 60);
const REFRESH_AT_FRACTION: f64 = 0.9;

#[derive(Debug, Clone)]
enum SessionState {
    Unauthenticated,
    Authenticated {
        ticket: String,
        csrf_token: String,
        issued_at: Instant,
    },
    Expired,
}

/// Shared, per-process session guarding ticket acquisition/refresh. Cheap to
/// clone (internally `Arc`-free; wrap in `Arc<Session>` at the call site to
/// share across reconciliations).
pub struct Session {
    credentials: Credentials,
    state: Mutex<SessionState>,
}

impl Session {
    /// Construct a fresh, unauthenticated session for these credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            state: Mutex::new(SessionState::Unauthenticated),
        }
    }

    /// Idempotent: acquires a ticket when absent or expired, otherwise
    /// returns the currently active credentials. Always returns immediately
    /// for API-token credentials.
    pub async fn ensure(&self, transport: &dyn Transport) -> Result<Headers, PbsError> {
        if let AuthMethod::ApiToken { token_id, secret } = &self.credentials.auth {
            let mut headers = Headers::new();
            headers.insert(
                "Authorization".to_string(),
                format!("PBSAPIToken={token_id}:{secret}"),
            );
            return Ok(headers);
        }

        let mut state = self.state.lock().await;
        let needs_auth = match &*state {
            SessionState::Unauthenticated | SessionState::Expired => true,
            SessionState::Authenticated { issued_at, .. } => is_stale(*issued_at),
        };

        if needs_auth {
            let (ticket, csrf_token) = self.authenticate(transport).await?;
            *state = SessionState::Authenticated {
                ticket: ticket.clone(),
                csrf_token: csrf_token.clone(),
                issued_at: Instant::now(),
            };
            return Ok(auth_headers(&ticket, &csrf_token));
        }

        match &*state {
            SessionState::Authenticated { ticket, csrf_token, .. } => {
                Ok(auth_headers(ticket, csrf_token))
            }
            _ => unreachable!("needs_auth handled the non-Authenticated cases above"),
        }
    }

    /// Clears the session so the next [`Session::ensure`] re-authenticates.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        *state = SessionState::Expired;
    }

    async fn authenticate(&self, transport: &dyn Transport) -> Result<(String, String), PbsError> {
        let AuthMethod::UserPass { username, password, realm } = &self.credentials.auth else {
            unreachable!("API-token path returns early in ensure()");
        };

        tracing::debug!(username = %username, realm = %realm, "acquiring PBS ticket");

        let body = serde_json::json!({
            "username": format!("{username}@{realm}"),
            "password": password,
        });
        let envelope = transport
            .post("/api2/json/access/ticket", &body, &Headers::new())
            .await?;

        let ticket = envelope.data.get("ticket").and_then(|v| v.as_str()).ok_or_else(|| {
            PbsError::new(
                ErrorCode::TransportMalformedResponse,
                "ticket response missing 'ticket' field",
            )
        })?;
        let csrf_token = envelope
            .data
            .get("CSRFPreventionToken")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                PbsError::new(
                    ErrorCode::TransportMalformedResponse,
                    "ticket response missing 'CSRFPreventionToken' field",
                )
            })?;

        Ok((ticket.to_string(), csrf_token.to_string()))
    }

    /// Runs `op` with fresh auth headers; on an `AuthUnauthorized` error,
    /// invalidates the session and retries `op` exactly once with a
    /// freshly-acquired ticket. Any other error, or a second auth failure,
    /// propagates.
    pub async fn execute_with_replay<T, F, Fut>(
        &self,
        transport: &dyn Transport,
        mut op: F,
    ) -> Result<T, PbsError>
    where
        F: FnMut(Headers) -> Fut,
        Fut: Future<Output = Result<T, PbsError>>,
    {
        let headers = self.ensure(transport).await?;
        match op(headers).await {
            Err(err) if err.code == ErrorCode::AuthUnauthorized => {
                tracing::warn!("ticket rejected mid-reconciliation, re-authenticating and replaying once");
                self.invalidate().await;
                let headers = self.ensure(transport).await?;
                op(headers).await
            }
            other => other,
        }
    }
}

fn is_stale(issued_at: Instant) -> bool {
    let refresh_after = TICKET_VALIDITY.mul_f64(REFRESH_AT_FRACTION);
    issued_at.elapsed() >= refresh_after
}

fn auth_headers(ticket: &str, csrf_token: &str) -> Headers {
    let mut headers = Headers::new();
    headers.insert("Cookie".to_string(), format!("PBSAuthCookie={ticket}"));
    headers.insert("CSRFPreventionToken".to_string(), csrf_token.to_string());
    headers
}
