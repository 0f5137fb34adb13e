//! Scheduled job families: prune, sync, verify, GC. All four are
//! synchronous, digest-protected CRUD over `/config/{kind}-job`.

use crate::client::ResourceClient;
use crate::WriteOutcome;
use pbsctl_error::PbsError;
use pbsctl_transport::{Headers, Transport};

macro_rules! job_client {
    ($name:ident, $base:literal, $doc:literal) => {
        #[doc = $doc]
        pub struct $name<'t> {
            transport: &'t dyn Transport,
            inner: ResourceClient,
        }

        impl<'t> $name<'t> {
            /// A client bound to the given transport.
            pub fn new(transport: &'t dyn Transport) -> Self {
                Self {
                    transport,
                    inner: ResourceClient::new($base),
                }
            }

            /// `GET` the job list.
            pub async fn list(&self, headers: &Headers) -> Result<Vec<serde_json::Value>, PbsError> {
                self.inner.list(self.transport, headers).await
            }

            /// `GET` a single job by id.
            pub async fn get(&self, headers: &Headers, id: &str) -> Result<serde_json::Value, PbsError> {
                self.inner.get(self.transport, headers, id).await
            }

            /// `POST` a new job. Synchronous: PBS does not queue a task to
            /// create a schedule entry.
            pub async fn create(&self, headers: &Headers, body: &serde_json::Value) -> Result<WriteOutcome, PbsError> {
                self.inner.create(self.transport, headers, body).await
            }

            /// `PUT` an update. `body` must carry `digest` from the prior
            /// read plus any `delete` entries; a 412 surfaces as
            /// [`pbsctl_error::ErrorCode::ConflictDigestMismatch`] with no
            /// local retry.
            pub async fn update(
                &self,
                headers: &Headers,
                id: &str,
                body: &serde_json::Value,
            ) -> Result<WriteOutcome, PbsError> {
                self.inner.update(self.transport, headers, id, body).await
            }

            /// `DELETE` a job; idempotent (404 maps to success).
            pub async fn delete(&self, headers: &Headers, id: &str) -> Result<WriteOutcome, PbsError> {
                self.inner.delete(self.transport, headers, id).await
            }
        }
    };
}

job_client!(PruneJobClient, "/api2/json/config/prune-job", "CRUD client for `/config/prune-job`.");
job_client!(SyncJobClient, "/api2/json/config/sync-job", "CRUD client for `/config/sync-job`.");
job_client!(VerifyJobClient, "/api2/json/config/verify-job", "CRUD client for `/config/verify-job`.");
job_client!(GcJobClient, "/api2/json/config/gc-job", "CRUD client for `/config/gc-job`.");

#[cfg(test)]
mod tests {
    use super::*;
    use pbsctl_error::ErrorCode;
    use pbsctl_transport::mock::{MockTransport, Scripted};

    #[tokio::test]
    async fn prune_job_update_with_digest_and_delete_scenario() {
        let mock = MockTransport::new();
        mock.push("PUT", "/api2/json/config/prune-job/p1", Scripted::Ok(serde_json::Value::Null));
        let client = PruneJobClient::new(&mock);
        let body = serde_json::json!({
            "store": "ds1",
            "schedule": "daily",
            "keep-daily": 7,
            "delete": ["comment"],
            "digest": "D0",
        });
        let outcome = client.update(&Headers::new(), "p1", &body).await.unwrap();
        assert!(matches!(outcome, WriteOutcome::Sync));

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].body.as_ref().unwrap()["delete"], serde_json::json!(["comment"]));
        assert_eq!(calls[0].body.as_ref().unwrap()["digest"], "D0");
    }

    #[tokio::test]
    async fn verify_job_update_conflict_surfaces_without_retry() {
        let mock = MockTransport::new();
        mock.push(
            "PUT",
            "/api2/json/config/verify-job/v1",
            Scripted::Err(PbsError::new(ErrorCode::ConflictDigestMismatch, "digest mismatch")),
        );
        let client = VerifyJobClient::new(&mock);
        let err = client
            .update(&Headers::new(), "v1", &serde_json::json!({"digest": "D0"}))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConflictDigestMismatch);
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn gc_job_delete_is_idempotent() {
        let mock = MockTransport::new();
        mock.push(
            "DELETE",
            "/api2/json/config/gc-job/g1",
            Scripted::Err(PbsError::new(ErrorCode::NotFoundResource, "gone")),
        );
        let client = GcJobClient::new(&mock);
        let outcome = client.delete(&Headers::new(), "g1").await.unwrap();
        assert!(matches!(outcome, WriteOutcome::Sync));
    }
}
