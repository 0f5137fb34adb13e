//! Scripted [`Transport`] for exercising the session, task-tracker, and
//! reconciler layers without a live PBS server.

use crate::{Envelope, Headers, Transport};
use async_trait::async_trait;
use pbsctl_error::PbsError;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted response queued against a `(method, path)` pair.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Succeed with the given envelope payload.
    Ok(serde_json::Value),
    /// Fail with the given error.
    Err(PbsError),
}

/// Calls recorded by [`MockTransport`] for post-hoc assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// HTTP-ish verb: `"GET"`, `"POST"`, `"PUT"`, or `"DELETE"`.
    pub method: &'static str,
    /// Request path.
    pub path: String,
    /// Request body, if any.
    pub body: Option<serde_json::Value>,
    /// Headers present on the request (ticket cookie, CSRF token, etc).
    pub headers: Headers,
}

/// A [`Transport`] whose responses are pre-scripted per `(method, path)`
/// key, each a FIFO queue so a test can script a sequence (e.g. 401 then
/// 200, for the session-replay scenario).
#[derive(Default)]
pub struct MockTransport {
    scripts: Mutex<std::collections::HashMap<(&'static str, String), VecDeque<Scripted>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    /// An empty mock with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `method`/`path`; multiple calls for the same
    /// key are consumed in the order queued.
    pub fn push(&self, method: &'static str, path: impl Into<String>, response: Scripted) {
        self.scripts
            .lock()
            .unwrap()
            .entry((method, path.into()))
            .or_default()
            .push_back(response);
    }

    /// All calls recorded so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str, path: &str, body: Option<serde_json::Value>, headers: &Headers) {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path: path.to_string(),
            body,
            headers: headers.clone(),
        });
    }

    fn respond(&self, method: &'static str, path: &str) -> Result<Envelope, PbsError> {
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.get_mut(&(method, path.to_string()));
        match queue.and_then(|q| q.pop_front()) {
            Some(Scripted::Ok(data)) => Ok(Envelope::new(data)),
            Some(Scripted::Err(err)) => Err(err),
            None => Err(PbsError::new(
                pbsctl_error::ErrorCode::Internal,
                format!("MockTransport: no scripted response for {method} {path}"),
            )),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str, headers: &Headers) -> Result<Envelope, PbsError> {
        self.record("GET", path, None, headers);
        self.respond("GET", path)
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        headers: &Headers,
    ) -> Result<Envelope, PbsError> {
        self.record("POST", path, Some(body.clone()), headers);
        self.respond("POST", path)
    }

    async fn put(
        &self,
        path: &str,
        body: &serde_json::Value,
        headers: &Headers,
    ) -> Result<Envelope, PbsError> {
        self.record("PUT", path, Some(body.clone()), headers);
        self.respond("PUT", path)
    }

    async fn delete(&self, path: &str, headers: &Headers) -> Result<Envelope, PbsError> {
        self.record("DELETE", path, None, headers);
        self.respond("DELETE", path)
    }
}
