//! UPID parsing and task status.
//!
//! `UPID:<node>:<pid-hex>:<start-hex>:<type>:<id>:<user>:<status>` — PBS's
//! identifier for an asynchronous worker task. The node field identifies the
//! cluster member the task must be queried on.

use pbsctl_error::{ErrorCode, PbsError};
use std::fmt;
use std::str::FromStr;

/// A parsed PBS UPID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upid {
    /// Cluster node the task runs/ran on.
    pub node: String,
    /// Worker process id, as a hex string (kept as text: never arithmetic).
    pub pid_hex: String,
    /// Worker start time, as a hex unix-timestamp string.
    pub start_hex: String,
    /// Task type, e.g. `"create"`, `"gc"`, `"syncjob"`.
    pub task_type: String,
    /// Task-specific id, e.g. a datastore or job name.
    pub id: String,
    /// `user@realm` that started the task.
    pub user: String,
    /// Trailing status field, empty while the task is still running.
    pub status: String,
    /// The original, unparsed UPID string — some endpoints (task log) take
    /// the UPID verbatim as a path segment.
    raw: String,
}

impl Upid {
    /// The original UPID string this value was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Upid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Upid {
    type Err = PbsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || {
            PbsError::new(
                ErrorCode::TransportMalformedResponse,
                format!("malformed UPID: {s:?}"),
            )
            .with_context("upid", s)
        };

        let rest = s.strip_prefix("UPID:").ok_or_else(malformed)?;
        // UPID has 7 colon-separated fields after the "UPID:" tag; `status`
        // may itself be empty (task still running) or contain further `:`.
        let mut parts = rest.splitn(7, ':');
        let node = parts.next().ok_or_else(malformed)?.to_string();
        let pid_hex = parts.next().ok_or_else(malformed)?.to_string();
        let start_hex = parts.next().ok_or_else(malformed)?.to_string();
        let task_type = parts.next().ok_or_else(malformed)?.to_string();
        let id = parts.next().ok_or_else(malformed)?.to_string();
        let user = parts.next().ok_or_else(malformed)?.to_string();
        let status = parts.next().unwrap_or_default().to_string();

        if node.is_empty() || pid_hex.is_empty() || start_hex.is_empty() {
            return Err(malformed());
        }

        Ok(Upid {
            node,
            pid_hex,
            start_hex,
            task_type,
            id,
            user,
            status,
            raw: s.to_string(),
        })
    }
}

/// Lifecycle state of a task identified by a [`Upid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task has not reached a terminal state.
    Running,
    /// Task finished with an empty/`"OK"` exit status.
    StoppedOk,
    /// Task finished with a non-empty exit-status message.
    StoppedError(String),
    /// Server reported a status string this client does not recognize.
    Unknown(String),
}

impl TaskStatus {
    /// Parses the `status` field returned by `/nodes/{node}/tasks/{upid}/status`.
    pub fn from_wire(status: &str, exit_status: Option<&str>) -> Self {
        match status {
            "running" => TaskStatus::Running,
            "stopped" => match exit_status {
                None | Some("") | Some("OK") => TaskStatus::StoppedOk,
                Some(msg) => TaskStatus::StoppedError(msg.to_string()),
            },
            other => TaskStatus::Unknown(other.to_string()),
        }
    }

    /// True if this status is not a final state.
    pub fn is_running(&self) -> bool {
        matches!(self, TaskStatus::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_upid() {
        let upid: Upid = "UPID:pbs1:00001234:0005A1B2:create:store1:root@pam:"
            .parse()
            .unwrap();
        assert_eq!(upid.node, "pbs1");
        assert_eq!(upid.pid_hex, "00001234");
        assert_eq!(upid.start_hex, "0005A1B2");
        assert_eq!(upid.task_type, "create");
        assert_eq!(upid.id, "store1");
        assert_eq!(upid.user, "root@pam");
        assert_eq!(upid.status, "");
    }

    #[test]
    fn parses_upid_with_trailing_status() {
        let upid: Upid = "UPID:pbs1:1:2:gc:store1:root@pam:OK"
            .parse()
            .unwrap();
        assert_eq!(upid.status, "OK");
    }

    #[test]
    fn rejects_missing_prefix() {
        let err = "pbs1:1:2:create:store1:root@pam:".parse::<Upid>().unwrap_err();
        assert_eq!(err.code, pbsctl_error::ErrorCode::TransportMalformedResponse);
    }

    #[test]
    fn rejects_too_few_fields() {
        let err = "UPID:pbs1:1:2:create".parse::<Upid>().unwrap_err();
        assert_eq!(err.code, pbsctl_error::ErrorCode::TransportMalformedResponse);
    }

    #[test]
    fn display_round_trips_raw_string() {
        let raw = "UPID:pbs1:1:2:create:store1:root@pam:";
        let upid: Upid = raw.parse().unwrap();
        assert_eq!(upid.to_string(), raw);
        assert_eq!(upid.as_str(), raw);
    }

    #[test]
    fn task_status_running() {
        assert_eq!(TaskStatus::from_wire("running", None), TaskStatus::Running);
    }

    #[test]
    fn task_status_stopped_ok() {
        assert_eq!(
            TaskStatus::from_wire("stopped", Some("OK")),
            TaskStatus::StoppedOk
        );
        assert_eq!(TaskStatus::from_wire("stopped", None), TaskStatus::StoppedOk);
    }

    #[test]
    fn task_status_stopped_error() {
        assert_eq!(
            TaskStatus::from_wire("stopped", Some("unable to acquire lock")),
            TaskStatus::StoppedError("unable to acquire lock".into())
        );
    }

    #[test]
    fn task_status_unknown() {
        assert_eq!(
            TaskStatus::from_wire("paused", None),
            TaskStatus::Unknown("paused".into())
        );
    }

    #[test]
    fn is_running_helper() {
        assert!(TaskStatus::Running.is_running());
        assert!(!TaskStatus::StoppedOk.is_running());
    }
}
