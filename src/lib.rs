// SPDX-License-Identifier: MIT OR Apache-2.0
//! Top-level facade wiring the PBS reconciliation stack together: a
//! [`PbsClient`] owns the shared [`Transport`] and [`Session`] and hands out
//! per-resource-family clients and reconcilers bound to them, so the
//! declarative framework this core sits behind only ever touches one type.
//!
//! Construction takes [`pbsctl_core::Credentials`] directly, or a
//! [`pbsctl_config::PbsConfig`] via [`PbsClient::from_config`] for callers
//! loading credentials from the environment/a file.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

pub use pbsctl_config::{self as config, ConfigError, ConfigWarning, PbsConfig};
pub use pbsctl_core::{AuthMethod, Credentials, DeleteSet, Digest, TaskStatus, TlsPolicy, Upid, Value};
pub use pbsctl_error::{ErrorCategory, ErrorCode, PbsError};
pub use pbsctl_reconcile::{
    fields, validate_datastore_create, DatastoreDesired, DatastoreKind, DatastoreReconciler,
    ReconcileOutcome,
};
pub use pbsctl_reconcile::job::{build_job_update_body, reconcile_job_update};
pub use pbsctl_resources::{
    GcJobClient, MetricsServerClient, MetricsServerKind, NotificationEndpointClient,
    NotificationEndpointKind, NotificationMatcherClient, PruneJobClient, RemoteClient,
    S3EndpointClient, SyncJobClient, VerifyJobClient, WriteOutcome,
};
pub use pbsctl_session::Session;
pub use pbsctl_task::{wait_for_task, TaskOutcome};
pub use pbsctl_transport::mock;
pub use pbsctl_transport::{Envelope, Headers, ReqwestTransport, Transport};

/// Owns the shared [`Transport`] and [`Session`] for one PBS endpoint and
/// hands out clients/reconcilers bound to them.
///
/// Cheap to clone: both fields are `Arc`-backed, so cloning a [`PbsClient`]
/// shares the same connection pool and session state rather than
/// re-authenticating.
#[derive(Clone)]
pub struct PbsClient {
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
}

impl PbsClient {
    /// Builds a live client from [`Credentials`], constructing a pooled
    /// [`ReqwestTransport`] per the credentials' [`TlsPolicy`].
    pub fn new(credentials: Credentials) -> Result<Self, PbsError> {
        let transport = ReqwestTransport::new(&credentials)?;
        Ok(Self::from_parts(Arc::new(transport), credentials))
    }

    /// Builds credentials from a [`PbsConfig`] (validating it first) and
    /// constructs a live client from them.
    pub fn from_config(config: PbsConfig) -> Result<Self, PbsError> {
        config::validate_config(&config).map_err(config_to_pbs_error)?;
        let credentials = config
            .into_credentials()
            .map_err(config_to_pbs_error)?;
        Self::new(credentials)
    }

    /// Builds a client around a caller-supplied [`Transport`] (e.g.
    /// [`mock::MockTransport`] in tests) instead of a live [`ReqwestTransport`].
    pub fn from_parts(transport: Arc<dyn Transport>, credentials: Credentials) -> Self {
        Self { transport, session: Arc::new(Session::new(credentials)) }
    }

    /// The underlying transport, for call sites that need to hand it to a
    /// free function like [`wait_for_task`] directly.
    pub fn transport(&self) -> &dyn Transport {
        &*self.transport
    }

    /// The underlying session, for call sites driving [`Session::execute_with_replay`]
    /// themselves.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// A [`DatastoreReconciler`] bound to this client's transport and session.
    pub fn datastores(&self) -> DatastoreReconciler<'_> {
        DatastoreReconciler::new(&*self.transport, &self.session)
    }

    /// A [`RemoteClient`] bound to this client's transport.
    pub fn remotes(&self) -> RemoteClient<'_> {
        RemoteClient::new(&*self.transport)
    }

    /// An [`S3EndpointClient`] bound to this client's transport.
    pub fn s3_endpoints(&self) -> S3EndpointClient<'_> {
        S3EndpointClient::new(&*self.transport)
    }

    /// A [`NotificationEndpointClient`] of the given kind, bound to this
    /// client's transport.
    pub fn notification_endpoints(&self, kind: NotificationEndpointKind) -> NotificationEndpointClient<'_> {
        NotificationEndpointClient::new(&*self.transport, kind)
    }

    /// A [`NotificationMatcherClient`] bound to this client's transport.
    pub fn notification_matchers(&self) -> NotificationMatcherClient<'_> {
        NotificationMatcherClient::new(&*self.transport)
    }

    /// A [`MetricsServerClient`] of the given kind, bound to this client's
    /// transport.
    pub fn metrics_servers(&self, kind: MetricsServerKind) -> MetricsServerClient<'_> {
        MetricsServerClient::new(&*self.transport, kind)
    }

    /// Lists cluster nodes, replaying once on a mid-call ticket expiry.
    pub async fn list_nodes(&self) -> Result<Vec<serde_json::Value>, PbsError> {
        self.session
            .execute_with_replay(&*self.transport, |headers| {
                pbsctl_resources::list_nodes(&*self.transport, &headers)
            })
            .await
    }
}

macro_rules! job_reconciler {
    ($method:ident, $client:ident, $accessor:ident, $doc:literal) => {
        impl PbsClient {
            #[doc = $doc]
            pub fn $accessor(&self) -> $client<'_> {
                $client::new(&*self.transport)
            }

            /// Runs the digest-protected Update for this job family,
            /// replaying once on a mid-call ticket expiry per
            /// [`Session::execute_with_replay`].
            pub async fn $method(
                &self,
                id: &str,
                field_specs: &[pbsctl_reconcile::fields::FieldSpec],
                desired: &std::collections::BTreeMap<&'static str, Value<String>>,
                prior: &serde_json::Value,
            ) -> Result<WriteOutcome, PbsError> {
                let client = self.$accessor();
                self.session
                    .execute_with_replay(&*self.transport, |headers| {
                        reconcile_job_update(field_specs, desired, prior, |body| {
                            client.update(&headers, id, &body)
                        })
                    })
                    .await
            }
        }
    };
}

job_reconciler!(reconcile_prune_job, PruneJobClient, prune_jobs, "A [`PruneJobClient`] bound to this client's transport.");
job_reconciler!(reconcile_sync_job, SyncJobClient, sync_jobs, "A [`SyncJobClient`] bound to this client's transport.");
job_reconciler!(reconcile_verify_job, VerifyJobClient, verify_jobs, "A [`VerifyJobClient`] bound to this client's transport.");
job_reconciler!(reconcile_gc_job, GcJobClient, gc_jobs, "A [`GcJobClient`] bound to this client's transport.");

fn config_to_pbs_error(err: ConfigError) -> PbsError {
    PbsError::new(ErrorCode::ValidationMissingField, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock::{MockTransport, Scripted};
    use std::collections::BTreeMap;

    fn token_credentials() -> Credentials {
        Credentials::new(
            url::Url::parse("https://pbs.example.com:8007").unwrap(),
            AuthMethod::ApiToken { token_id: "root@pam!ci".into(), secret: "s3cr3t".into() },
            TlsPolicy::Verify,
        )
    }

    fn client_with(mock: &Arc<MockTransport>) -> PbsClient {
        PbsClient::from_parts(mock.clone() as Arc<dyn Transport>, token_credentials())
    }

    #[tokio::test(start_paused = true)]
    async fn datastore_accessor_round_trips_through_create() {
        let mock = Arc::new(MockTransport::new());
        mock.push(
            "POST",
            "/api2/json/config/datastore",
            Scripted::Ok(serde_json::Value::Null),
        );
        mock.push(
            "GET",
            "/api2/json/config/datastore/ds1",
            Scripted::Ok(serde_json::json!({"name": "ds1", "path": "/datastore/ds1", "digest": "D0"})),
        );
        let client = client_with(&mock);

        let desired = DatastoreDesired {
            name: "ds1".to_string(),
            path: Some("/datastore/ds1".to_string()),
            server: None,
            export: None,
            s3_client: None,
            s3_bucket: None,
            gc_schedule: Value::Unknown,
            comment: Value::Unknown,
            prune_schedule: None,
            tune_level: None,
        };
        let cancel = tokio_util::sync::CancellationToken::new();
        let outcome = client
            .datastores()
            .create("pbs1", &desired, std::time::Instant::now() + std::time::Duration::from_secs(30), &cancel)
            .await
            .unwrap();
        assert!(!outcome.degraded);
        assert_eq!(outcome.data["name"], "ds1");
    }

    #[tokio::test]
    async fn prune_job_reconciler_replays_on_auth_expiry() {
        let mock = Arc::new(MockTransport::new());
        mock.push(
            "PUT",
            "/api2/json/config/prune-job/p1",
            Scripted::Err(PbsError::new(ErrorCode::AuthUnauthorized, "ticket expired")),
        );
        mock.push("PUT", "/api2/json/config/prune-job/p1", Scripted::Ok(serde_json::Value::Null));
        let client = client_with(&mock);

        let prior = serde_json::json!({"schedule": "daily", "digest": "D0"});
        let mut desired = BTreeMap::new();
        desired.insert("schedule", Value::Known("daily".to_string()));

        let outcome = client
            .reconcile_prune_job("p1", pbsctl_reconcile::fields::PRUNE_JOB_FIELDS, &desired, &prior)
            .await
            .unwrap();
        assert!(matches!(outcome, WriteOutcome::Sync));
        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn list_nodes_uses_api_token_header() {
        let mock = Arc::new(MockTransport::new());
        mock.push("GET", "/api2/json/nodes", Scripted::Ok(serde_json::json!([{"node": "pbs1"}])));
        let client = client_with(&mock);
        let nodes = client.list_nodes().await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(mock.calls()[0].headers.get("Authorization").unwrap(), "PBSAPIToken=root@pam!ci:s3cr3t");
    }
}
