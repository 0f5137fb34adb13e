//! Digest-protected CRUD reconciliation shared by the four scheduled-job
//! families (prune, sync, verify, GC). Every family's Update is "merge
//! desired fields, compute the delete set, echo the prior digest, PUT" —
//! the only thing that differs per family is which [`FieldSpec`] table
//! applies and which endpoint the caller's closure hits, so this module
//! builds the body and leaves the actual client call to the caller.

use pbsctl_core::Value;
use pbsctl_error::PbsError;
use pbsctl_mapping::{compute_delete_set, FieldSpec};
use pbsctl_resources::WriteOutcome;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

/// Builds the PUT body for a job Update: every `Known` desired field, the
/// derived `delete` array (§4.6 Update step 2), and the prior `digest`
/// carried forward untouched (§4.6 Update step 1).
pub fn build_job_update_body(
    field_specs: &[FieldSpec],
    desired: &BTreeMap<&'static str, Value<String>>,
    prior: &serde_json::Value,
) -> serde_json::Value {
    let prior_present: BTreeSet<&'static str> = field_specs
        .iter()
        .filter(|spec| prior.get(spec.wire_name).is_some())
        .map(|spec| spec.wire_name)
        .collect();
    let delete_set = compute_delete_set(field_specs, desired, &prior_present);

    let mut body = serde_json::Map::new();
    for spec in field_specs {
        if let Some(Value::Known(v)) = desired.get(spec.wire_name) {
            body.insert(spec.wire_name.to_string(), serde_json::Value::String(v.clone()));
        }
    }
    if !delete_set.is_empty() {
        body.insert(
            "delete".to_string(),
            serde_json::Value::Array(delete_set.to_wire_array().into_iter().map(Into::into).collect()),
        );
    }
    if let Some(digest) = prior.get("digest").and_then(|v| v.as_str()) {
        body.insert("digest".to_string(), serde_json::Value::String(digest.to_string()));
    }
    serde_json::Value::Object(body)
}

/// Builds the Update body then hands it to `update`, the caller's bound
/// job-family client call (e.g. `|body| prune_client.update(&headers, id,
/// &body)`). On `ConflictDigestMismatch`, per §4.6 Update step 4, this
/// function does not retry — the error is returned as-is for the framework
/// to re-plan.
pub async fn reconcile_job_update<F, Fut>(
    field_specs: &[FieldSpec],
    desired: &BTreeMap<&'static str, Value<String>>,
    prior: &serde_json::Value,
    update: F,
) -> Result<WriteOutcome, PbsError>
where
    F: FnOnce(serde_json::Value) -> Fut,
    Fut: Future<Output = Result<WriteOutcome, PbsError>>,
{
    let body = build_job_update_body(field_specs, desired, prior);
    update(body).await
}
