//! Pre-flight validation: local checks that must pass before any request
//! reaches the server (spec §4.6 Create step 1).

use pbsctl_core::Value;
use pbsctl_error::{ErrorCode, PbsError};

/// Desired state for a datastore Create/Update, as handed down by the
/// embedding declarative framework. Exactly one of the three backend shapes
/// (directory, S3, NFS) must be populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatastoreDesired {
    /// Datastore name (also its id).
    pub name: String,
    /// Local chunk-store path. Required for directory and S3-cached
    /// datastores; ignored for NFS.
    pub path: Option<String>,
    /// NFS server hostname, if this is an NFS-backed datastore.
    pub server: Option<String>,
    /// NFS export path, if this is an NFS-backed datastore.
    pub export: Option<String>,
    /// Name of a configured s3-endpoint, if this is an S3-backed datastore.
    pub s3_client: Option<String>,
    /// Target bucket, if this is an S3-backed datastore.
    pub s3_bucket: Option<String>,
    /// `gc-schedule` scalar field.
    pub gc_schedule: Value<String>,
    /// `comment` scalar field.
    pub comment: Value<String>,
    /// The deprecated PBS 4.0 per-datastore `prune_schedule` field. Its mere
    /// presence is rejected — see DESIGN.md's Open Question decisions.
    pub prune_schedule: Option<String>,
    /// The deprecated `tune_level` scalar (0-2). Kept in sync with
    /// `tuning.sync-level` by [`pbsctl_mapping::sync_tune_level`] when the
    /// wire body is built.
    pub tune_level: Option<u8>,
}

/// The three backend shapes a datastore's desired model resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatastoreKind {
    /// Local directory / chunk store only.
    Directory,
    /// S3-compatible object storage backend.
    S3,
    /// NFS-mounted backing store.
    Nfs,
}

/// Validates a datastore Create/Update desired model, classifying its
/// backend kind and enforcing the required fields for that kind.
///
/// Rejects a present `prune_schedule` outright: PBS 4.0 moved scheduled
/// pruning to `/config/prune-job`, and the per-datastore field is a
/// deprecated compatibility shim this adapter does not support.
pub fn validate_datastore_create(desired: &DatastoreDesired) -> Result<DatastoreKind, PbsError> {
    if desired.prune_schedule.is_some() {
        return Err(PbsError::new(
            ErrorCode::ValidationRejectedField,
            "prune_schedule is not supported; use a prune-job resource instead",
        )
        .with_context("resource_kind", "datastore")
        .with_context("resource_id", desired.name.clone())
        .with_context("field", "prune_schedule"));
    }

    let is_s3 = desired.s3_client.is_some() || desired.s3_bucket.is_some();
    let is_nfs = desired.server.is_some() || desired.export.is_some();

    if is_s3 && is_nfs {
        return Err(PbsError::new(
            ErrorCode::ValidationMutuallyExclusive,
            "datastore cannot specify both an s3 backend and an nfs backend",
        )
        .with_context("resource_kind", "datastore")
        .with_context("resource_id", desired.name.clone()));
    }

    if is_s3 {
        require(desired.s3_client.as_deref(), "s3_client", &desired.name)?;
        require(desired.s3_bucket.as_deref(), "s3_bucket", &desired.name)?;
        require(desired.path.as_deref(), "path", &desired.name)?;
        return Ok(DatastoreKind::S3);
    }

    if is_nfs {
        require(desired.server.as_deref(), "server", &desired.name)?;
        require(desired.export.as_deref(), "export", &desired.name)?;
        return Ok(DatastoreKind::Nfs);
    }

    require(desired.path.as_deref(), "path", &desired.name)?;
    Ok(DatastoreKind::Directory)
}

fn require(field: Option<&str>, name: &'static str, resource_id: &str) -> Result<(), PbsError> {
    if field.is_some_and(|v| !v.is_empty()) {
        Ok(())
    } else {
        Err(PbsError::new(
            ErrorCode::ValidationMissingField,
            format!("{name} is required for this datastore backend"),
        )
        .with_context("resource_kind", "datastore")
        .with_context("resource_id", resource_id.to_string())
        .with_context("field", name))
    }
}
