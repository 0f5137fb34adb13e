//! Datastore lifecycle: the one resource family whose writes are
//! genuinely async and whose reads need eventual-consistency handling.
//!
//! The 3s settle sleep plus bounded 10-attempt read retry is a load-bearing
//! correctness mechanism, not a workaround to quietly special-case away —
//! kept here as a named, documented contract so it isn't rediscovered by
//! trial and error later.

use crate::client::ResourceClient;
use crate::WriteOutcome;
use pbsctl_core::Upid;
use pbsctl_error::{ErrorCode, PbsError};
use pbsctl_retry::Backoff;
use pbsctl_task::wait_for_task;
use pbsctl_transport::{Headers, Transport};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const BASE_PATH: &str = "/api2/json/config/datastore";

/// Delay after a Create task completes, before the first follow-up Get.
pub const DATASTORE_CREATE_SETTLE: Duration = Duration::from_secs(3);
/// Delay after a Delete task completes.
pub const DATASTORE_DELETE_SETTLE: Duration = Duration::from_secs(3);

const GET_RETRY_ATTEMPTS: u32 = 10;
const GET_RETRY_INITIAL: Duration = Duration::from_secs(1);
const GET_RETRY_CAP: Duration = Duration::from_secs(5);

/// Result of a datastore Get: either the direct per-object record, or a
/// `minimal` one assembled from the list endpoint (which only returns
/// `name`/`path`) when the direct Get failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatastoreRead {
    /// The decoded record.
    pub data: serde_json::Value,
    /// True if `data` came from the list fallback rather than a direct Get.
    pub minimal: bool,
}

/// CRUD client for `/config/datastore`, with the async-write and
/// eventual-consistency handling this resource family needs.
pub struct DatastoreClient<'t> {
    transport: &'t dyn Transport,
    inner: ResourceClient,
}

impl<'t> DatastoreClient<'t> {
    /// A client bound to the given transport.
    pub fn new(transport: &'t dyn Transport) -> Self {
        Self {
            transport,
            inner: ResourceClient::new(BASE_PATH),
        }
    }

    /// `GET /config/datastore`.
    pub async fn list(&self, headers: &Headers) -> Result<Vec<serde_json::Value>, PbsError> {
        self.inner.list(self.transport, headers).await
    }

    /// Direct `GET /config/datastore/{name}`; on any error, falls back to
    /// scanning [`Self::list`] and filtering by `name`, flagging the result
    /// `minimal`. Only a genuine absence from both surfaces is `NotFound`.
    pub async fn get(&self, headers: &Headers, name: &str) -> Result<DatastoreRead, PbsError> {
        match self.inner.get(self.transport, headers, name).await {
            Ok(data) => Ok(DatastoreRead { data, minimal: false }),
            Err(direct_err) => {
                let rows = self.list(headers).await.map_err(|_| direct_err)?;
                rows.into_iter()
                    .find(|row| row.get("name").and_then(|v| v.as_str()) == Some(name))
                    .map(|data| DatastoreRead { data, minimal: true })
                    .ok_or_else(|| {
                        PbsError::new(ErrorCode::NotFoundResource, "datastore not found")
                            .with_context("resource_kind", "datastore")
                            .with_context("resource_id", name)
                    })
            }
        }
    }

    /// Retries [`Self::get`] up to [`GET_RETRY_ATTEMPTS`] times with a
    /// 1s-to-5s backoff, for the window after a Create/Update task where
    /// PBS has not yet made the resource visible.
    pub async fn get_with_retry(&self, headers: &Headers, name: &str) -> Result<DatastoreRead, PbsError> {
        let mut backoff = Backoff::new(GET_RETRY_INITIAL, GET_RETRY_CAP);
        let mut last_err = None;
        for attempt in 0..GET_RETRY_ATTEMPTS {
            match self.get(headers, name).await {
                Ok(read) => return Ok(read),
                Err(err) => {
                    tracing::debug!(attempt, name, "datastore not yet visible, retrying");
                    last_err = Some(err);
                }
            }
            tokio::time::sleep(backoff.next_delay()).await;
        }
        Err(last_err.unwrap_or_else(|| {
            PbsError::new(ErrorCode::NotFoundResource, "datastore never became visible")
                .with_context("resource_id", name)
        }))
    }

    /// `POST /config/datastore`, waits on the returned UPID, sleeps
    /// [`DATASTORE_CREATE_SETTLE`], then reads back the datastore with
    /// bounded retry. Always async: the server never creates a datastore
    /// synchronously.
    pub async fn create(
        &self,
        headers: &Headers,
        node: &str,
        name: &str,
        body: &serde_json::Value,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<DatastoreRead, PbsError> {
        let outcome = self.inner.create(self.transport, headers, body).await?;
        self.await_and_settle(headers, node, name, outcome, DATASTORE_CREATE_SETTLE, deadline, cancel)
            .await
    }

    /// `PUT /config/datastore/{name}`; async only if the server chooses to
    /// return a UPID (most updates are synchronous, but GC-triggering
    /// updates are not).
    pub async fn update(
        &self,
        headers: &Headers,
        node: &str,
        name: &str,
        body: &serde_json::Value,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<DatastoreRead, PbsError> {
        let outcome = self.inner.update(self.transport, headers, name, body).await?;
        match outcome {
            WriteOutcome::Sync => self.get_with_retry(headers, name).await,
            WriteOutcome::Async(_) => {
                self.await_and_settle(headers, node, name, outcome, DATASTORE_CREATE_SETTLE, deadline, cancel)
                    .await
            }
        }
    }

    /// `DELETE /config/datastore/{name}`, always async; waits on
    /// the UPID and settles before returning. A 404 is treated as success
    /// (idempotent destroy) and short-circuits without a settle sleep.
    /// `destroy_data` maps to the `destroy-data=1` query parameter PBS
    /// accepts to also remove the datastore's backing chunk store.
    pub async fn delete(
        &self,
        headers: &Headers,
        node: &str,
        name: &str,
        destroy_data: bool,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<(), PbsError> {
        let path = if destroy_data {
            format!("{BASE_PATH}/{name}?destroy-data=1")
        } else {
            format!("{BASE_PATH}/{name}")
        };
        let outcome = match self.transport.delete(&path, headers).await {
            Ok(envelope) => crate::client::classify_write_outcome(&envelope.data)?,
            Err(err) if err.code == ErrorCode::NotFoundResource => WriteOutcome::Sync,
            Err(err) => return Err(err),
        };
        match outcome {
            WriteOutcome::Sync => Ok(()),
            WriteOutcome::Async(upid) => {
                wait_for_task(self.transport, headers, node, &upid, deadline, cancel).await?;
                tokio::time::sleep(DATASTORE_DELETE_SETTLE).await;
                Ok(())
            }
        }
    }

    async fn await_and_settle(
        &self,
        headers: &Headers,
        node: &str,
        name: &str,
        outcome: WriteOutcome,
        settle: Duration,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<DatastoreRead, PbsError> {
        if let WriteOutcome::Async(upid) = outcome {
            wait_for_upid(self.transport, headers, node, &upid, deadline, cancel).await?;
        }
        tokio::time::sleep(settle).await;
        self.get_with_retry(headers, name).await
    }
}

async fn wait_for_upid(
    transport: &dyn Transport,
    headers: &Headers,
    node: &str,
    upid: &Upid,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Result<(), PbsError> {
    wait_for_task(transport, headers, node, upid, deadline, cancel).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbsctl_transport::mock::{MockTransport, Scripted};

    #[tokio::test(start_paused = true)]
    async fn create_waits_settles_and_reads_back() {
        let mock = MockTransport::new();
        mock.push(
            "POST",
            "/api2/json/config/datastore",
            Scripted::Ok(serde_json::json!("UPID:pbs1:1:2:create:dir-ds-1:root@pam:")),
        );
        let status_path = "/api2/json/nodes/pbs1/tasks/UPID%3Apbs1%3A1%3A2%3Acreate%3Adir-ds-1%3Aroot@pam%3A/status";
        mock.push("GET", status_path, Scripted::Ok(serde_json::json!({"status": "stopped", "exitstatus": "OK"})));
        let log_path = "/api2/json/nodes/pbs1/tasks/UPID%3Apbs1%3A1%3A2%3Acreate%3Adir-ds-1%3Aroot@pam%3A/log?limit=200";
        mock.push("GET", log_path, Scripted::Ok(serde_json::json!([])));
        mock.push(
            "GET",
            "/api2/json/config/datastore/dir-ds-1",
            Scripted::Ok(serde_json::json!({"name": "dir-ds-1", "path": "/datastore/dir-ds-1", "digest": "abc"})),
        );

        let client = DatastoreClient::new(&mock);
        let cancel = CancellationToken::new();
        let read = client
            .create(
                &Headers::new(),
                "pbs1",
                "dir-ds-1",
                &serde_json::json!({"name": "dir-ds-1", "path": "/datastore/dir-ds-1"}),
                Instant::now() + Duration::from_secs(60),
                &cancel,
            )
            .await
            .unwrap();

        assert!(!read.minimal);
        assert_eq!(read.data["digest"], "abc");
    }

    #[tokio::test]
    async fn get_falls_back_to_list_and_flags_minimal() {
        let mock = MockTransport::new();
        mock.push(
            "GET",
            "/api2/json/config/datastore/ds1",
            Scripted::Err(PbsError::new(ErrorCode::NotFoundResource, "gone")),
        );
        mock.push(
            "GET",
            "/api2/json/config/datastore",
            Scripted::Ok(serde_json::json!([{"name": "ds1", "path": "/datastore/ds1"}])),
        );
        let client = DatastoreClient::new(&mock);
        let read = client.get(&Headers::new(), "ds1").await.unwrap();
        assert!(read.minimal);
        assert_eq!(read.data["path"], "/datastore/ds1");
    }

    #[tokio::test]
    async fn get_errors_when_absent_from_both_surfaces() {
        let mock = MockTransport::new();
        mock.push(
            "GET",
            "/api2/json/config/datastore/missing",
            Scripted::Err(PbsError::new(ErrorCode::NotFoundResource, "gone")),
        );
        mock.push("GET", "/api2/json/config/datastore", Scripted::Ok(serde_json::json!([])));
        let client = DatastoreClient::new(&mock);
        let err = client.get(&Headers::new(), "missing").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFoundResource);
    }

    #[tokio::test]
    async fn delete_is_idempotent_on_not_found() {
        let mock = MockTransport::new();
        mock.push(
            "DELETE",
            "/api2/json/config/datastore/gone",
            Scripted::Err(PbsError::new(ErrorCode::NotFoundResource, "already gone")),
        );
        let client = DatastoreClient::new(&mock);
        let cancel = CancellationToken::new();
        client
            .delete(
                &Headers::new(),
                "pbs1",
                "gone",
                false,
                Instant::now() + Duration::from_secs(30),
                &cancel,
            )
            .await
            .unwrap();
    }
}
