//! Asynchronous UPID task tracking.
//!
//! PBS's async tasks are not a general RPC pattern; this crate encapsulates
//! them behind a single [`wait_for_task`] seam so call sites look
//! synchronous. The tracker is pure with respect to reconciler state: it
//! never mutates resource models, only observes task status.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use pbsctl_core::{TaskStatus, Upid};
use pbsctl_error::{ErrorCode, PbsError};
use pbsctl_retry::Backoff;
use pbsctl_transport::{Headers, Transport};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// A task's terminal outcome: its final [`TaskStatus`] plus a bounded tail
/// of its text log, if one was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    /// Final task status (never [`TaskStatus::Running`]).
    pub status: TaskStatus,
    /// Tail of the task's text log, bounded to a few hundred lines.
    pub log_excerpt: Option<String>,
}

/// Window during which a 404 polling `/tasks/{upid}/status` is treated as
/// "task not yet visible to this node" rather than a terminal error.
const NOT_YET_VISIBLE_WINDOW: Duration = Duration::from_secs(2);

/// Maximum number of trailing log lines fetched from `/tasks/{upid}/log`.
const LOG_TAIL_LINES: usize = 200;

/// Polls `/api2/json/nodes/{node}/tasks/{upid}/status` with exponential-with-jitter
/// backoff until the task leaves the running state, the `deadline` passes,
/// or `cancel` fires.
///
/// A timeout is fatal to the calling CRUD operation: this layer does not
/// retry past the deadline, and the UPID is left in the returned error's
/// context so an operator can consult PBS's task history directly.
pub async fn wait_for_task(
    transport: &dyn Transport,
    headers: &Headers,
    node: &str,
    upid: &Upid,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Result<TaskOutcome, PbsError> {
    let _span = tracing::debug_span!("wait_for_task", node, upid = %upid).entered();

    let started_at = Instant::now();
    let mut backoff = Backoff::task_poll();
    let status_path = format!("/api2/json/nodes/{}/tasks/{}/status", node, percent_encode(upid.as_str()));

    loop {
        if cancel.is_cancelled() {
            return Err(PbsError::new(ErrorCode::OperationCanceled, "task wait canceled")
                .with_context("upid", upid.as_str()));
        }
        if Instant::now() >= deadline {
            return Err(PbsError::new(
                ErrorCode::TaskDeadlineExceeded,
                "task did not complete before deadline",
            )
            .with_context("upid", upid.as_str())
            .with_context("node", node));
        }

        match transport.get(&status_path, headers).await {
            Ok(envelope) => {
                let wire_status = envelope.data.get("status").and_then(|v| v.as_str()).unwrap_or("running");
                let exit_status = envelope.data.get("exitstatus").and_then(|v| v.as_str());
                let status = TaskStatus::from_wire(wire_status, exit_status);

                if status.is_running() {
                    tracing::debug!(attempt = backoff.attempt(), "task still running");
                } else {
                    let log_excerpt = fetch_log_tail(transport, headers, node, upid).await;
                    if let TaskStatus::StoppedError(ref msg) = status {
                        return Err(PbsError::new(ErrorCode::TaskExitError, msg.clone())
                            .with_context("upid", upid.as_str())
                            .with_context("node", node));
                    }
                    return Ok(TaskOutcome { status, log_excerpt });
                }
            }
            Err(err) if err.code == ErrorCode::NotFoundResource && started_at.elapsed() < NOT_YET_VISIBLE_WINDOW => {
                tracing::debug!("task not yet visible on node, retrying");
            }
            Err(err) => return Err(err.with_context("upid", upid.as_str()).with_context("node", node)),
        }

        let delay = backoff.next_delay();
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {
                return Err(PbsError::new(ErrorCode::OperationCanceled, "task wait canceled")
                    .with_context("upid", upid.as_str()));
            }
        }
    }
}

async fn fetch_log_tail(
    transport: &dyn Transport,
    headers: &Headers,
    node: &str,
    upid: &Upid,
) -> Option<String> {
    let log_path = format!(
        "/api2/json/nodes/{}/tasks/{}/log?limit={}",
        node,
        percent_encode(upid.as_str()),
        LOG_TAIL_LINES
    );
    let envelope = transport.get(&log_path, headers).await.ok()?;
    let lines = envelope.data.as_array()?;
    let text: Vec<&str> = lines
        .iter()
        .filter_map(|entry| entry.get("t").and_then(|v| v.as_str()))
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text.join("\n"))
    }
}

fn percent_encode(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            ':' => "%3A".to_string(),
            c => c.to_string(),
        })
        .collect()
}
