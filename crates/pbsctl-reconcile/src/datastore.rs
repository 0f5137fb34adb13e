//! Datastore reconciliation: Create/Update/Delete against
//! `/config/datastore`, composing validation, the S3 `backend`
//! property-string, digest/delete-set merging, the Session ticket-replay
//! wrapper, and the two error classifications this family is singled out
//! for (lock contention on Create, the B2 atime-check provider quirk).

use crate::fields::DATASTORE_FIELDS;
use crate::validate::{validate_datastore_create, DatastoreDesired, DatastoreKind};
use pbsctl_core::Value;
use pbsctl_error::{ErrorCode, PbsError};
use pbsctl_mapping::{compute_delete_set, sync_tune_level, BackendConfig};
use pbsctl_resources::{DatastoreClient, DatastoreRead};
use pbsctl_retry::{is_lock_contention, is_provider_quirk_b2_atime};
use pbsctl_session::Session;
use pbsctl_transport::Transport;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Retries after the first Create attempt, per §4.6 step 2 ("up to 3
/// attempts"). One initial attempt plus this many retries.
const MAX_CREATE_LOCK_RETRIES: u32 = 2;
/// Linear backoff unit for Create lock-contention retries: `attempt * this`.
const CREATE_LOCK_RETRY_BASE: Duration = Duration::from_secs(2);

/// Outcome of a successful Create/Update/Read. `degraded` mirrors
/// [`DatastoreRead::minimal`]: the record came from the list-scan fallback
/// rather than a direct Get, so any field PBS's list endpoint doesn't carry
/// (only `name`/`path`) reflects the desired model rather than a server
/// echo. Still success — only a genuine absence from both surfaces is an
/// error (§8 boundary behavior).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// The merged/observed record.
    pub data: serde_json::Value,
    /// True if `data` came from the degraded list-scan fallback.
    pub degraded: bool,
}

impl From<DatastoreRead> for ReconcileOutcome {
    fn from(read: DatastoreRead) -> Self {
        Self {
            data: read.data,
            degraded: read.minimal,
        }
    }
}

/// Datastore reconciler: owns a [`DatastoreClient`] and the [`Session`]
/// used to authenticate each request.
pub struct DatastoreReconciler<'t> {
    transport: &'t dyn Transport,
    session: &'t Session,
    client: DatastoreClient<'t>,
}

impl<'t> DatastoreReconciler<'t> {
    /// A reconciler bound to the given transport and session.
    pub fn new(transport: &'t dyn Transport, session: &'t Session) -> Self {
        Self {
            transport,
            session,
            client: DatastoreClient::new(transport),
        }
    }

    /// Create path per §4.6: validate, build the wire body, POST with bounded
    /// lock-contention retry, wait on the UPID, settle, re-read.
    pub async fn create(
        &self,
        node: &str,
        desired: &DatastoreDesired,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, PbsError> {
        let kind = validate_datastore_create(desired)?;
        let body = build_datastore_create_body(desired, kind)?;

        let mut attempt = 0u32;
        loop {
            let result = self
                .session
                .execute_with_replay(self.transport, |headers| {
                    self.client.create(&headers, node, &desired.name, &body, deadline, cancel)
                })
                .await;

            match result {
                Ok(read) => return Ok(read.into()),
                Err(err) if is_b2_atime_quirk(&err) => {
                    return Err(PbsError::new(
                        ErrorCode::ProviderQuirkB2AtimeCheck,
                        format!("provider rejected datastore create: {}", err.message),
                    )
                    .with_context("resource_kind", "datastore")
                    .with_context("resource_id", desired.name.clone()));
                }
                Err(err) if is_lock_contention(&err.message) && attempt < MAX_CREATE_LOCK_RETRIES => {
                    attempt += 1;
                    tracing::debug!(attempt, name = %desired.name, "datastore create hit lock contention, retrying");
                    tokio::time::sleep(CREATE_LOCK_RETRY_BASE * attempt).await;
                    continue;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Update path per §4.6: carry the prior digest, compute the delete set
    /// against `prior`, PUT, then re-read. A digest mismatch surfaces
    /// immediately with no local retry.
    pub async fn update(
        &self,
        node: &str,
        name: &str,
        desired: &std::collections::BTreeMap<&'static str, Value<String>>,
        prior: &serde_json::Value,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, PbsError> {
        let body = build_datastore_update_body(desired, prior)?;
        let read = self
            .session
            .execute_with_replay(self.transport, |headers| {
                self.client.update(&headers, node, name, &body, deadline, cancel)
            })
            .await?;
        Ok(read.into())
    }

    /// Delete path per §4.6: idempotent on 404, `destroy_data` maps to the
    /// `destroy-data=1` query parameter.
    pub async fn delete(
        &self,
        node: &str,
        name: &str,
        destroy_data: bool,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<(), PbsError> {
        self.session
            .execute_with_replay(self.transport, |headers| {
                self.client.delete(&headers, node, name, destroy_data, deadline, cancel)
            })
            .await
    }
}

fn is_b2_atime_quirk(err: &PbsError) -> bool {
    err.code == ErrorCode::TaskExitError && is_provider_quirk_b2_atime(&err.message)
}

fn build_datastore_create_body(desired: &DatastoreDesired, kind: DatastoreKind) -> Result<serde_json::Value, PbsError> {
    let mut body = serde_json::Map::new();
    body.insert("name".to_string(), serde_json::Value::String(desired.name.clone()));

    match kind {
        DatastoreKind::Directory => {
            body.insert(
                "path".to_string(),
                serde_json::Value::String(desired.path.clone().expect("validated present")),
            );
        }
        DatastoreKind::Nfs => {
            body.insert(
                "server".to_string(),
                serde_json::Value::String(desired.server.clone().expect("validated present")),
            );
            body.insert(
                "export".to_string(),
                serde_json::Value::String(desired.export.clone().expect("validated present")),
            );
        }
        DatastoreKind::S3 => {
            let backend = BackendConfig::S3 {
                client: desired.s3_client.clone().expect("validated present"),
                bucket: desired.s3_bucket.clone().expect("validated present"),
            };
            let propstring = pbsctl_propstring::format(&backend.to_property_map());
            body.insert("backend".to_string(), serde_json::Value::String(propstring));
            body.insert(
                "path".to_string(),
                serde_json::Value::String(desired.path.clone().expect("validated present")),
            );
        }
    }

    if let Value::Known(v) = &desired.gc_schedule {
        body.insert("gc-schedule".to_string(), serde_json::Value::String(v.clone()));
    }
    if let Value::Known(v) = &desired.comment {
        body.insert("comment".to_string(), serde_json::Value::String(v.clone()));
    }
    if let Some(level) = desired.tune_level {
        body.insert("tune-level".to_string(), serde_json::Value::from(level));
    }
    sync_tune_level(&mut body)?;

    Ok(serde_json::Value::Object(body))
}

fn build_datastore_update_body(
    desired: &std::collections::BTreeMap<&'static str, Value<String>>,
    prior: &serde_json::Value,
) -> Result<serde_json::Value, PbsError> {
    let prior_present: BTreeSet<&'static str> = DATASTORE_FIELDS
        .iter()
        .filter(|spec| prior.get(spec.wire_name).is_some())
        .map(|spec| spec.wire_name)
        .collect();
    let delete_set = compute_delete_set(DATASTORE_FIELDS, desired, &prior_present);

    let mut body = serde_json::Map::new();
    for spec in DATASTORE_FIELDS {
        if let Some(Value::Known(v)) = desired.get(spec.wire_name) {
            body.insert(spec.wire_name.to_string(), serde_json::Value::String(v.clone()));
        }
    }
    sync_tune_level(&mut body)?;
    if !delete_set.is_empty() {
        body.insert(
            "delete".to_string(),
            serde_json::Value::Array(delete_set.to_wire_array().into_iter().map(Into::into).collect()),
        );
    }
    if let Some(digest) = prior.get("digest").and_then(|v| v.as_str()) {
        body.insert("digest".to_string(), serde_json::Value::String(digest.to_string()));
    }
    Ok(serde_json::Value::Object(body))
}
