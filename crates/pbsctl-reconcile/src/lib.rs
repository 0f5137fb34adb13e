//! Per-resource-family reconciliation: Create/Update/Delete against the
//! PBS API, composing `pbsctl-resources`' CRUD clients, `pbsctl-session`'s
//! ticket replay, and `pbsctl-mapping`'s delete-set/digest/backend-string
//! plumbing into the state machine the declarative front end this core
//! sits behind drives each write through.
//!
//! States move `Planned -> Validating -> Writing -> Waiting -> Reading ->
//! Merged` on success, with failure states `ValidationFailed`,
//! `WriteFailed`, `TaskTimeout`, `Conflict` surfaced as the matching
//! [`pbsctl_error::ErrorCode`]; `Degraded` (list-scan fallback read) is
//! folded into success as [`datastore::ReconcileOutcome::degraded`] rather
//! than a distinct terminal state, since the only hard failure on Read is
//! absence from both the direct Get and the list fallback.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod datastore;
pub mod fields;
pub mod job;
pub mod validate;

pub use datastore::{DatastoreReconciler, ReconcileOutcome};
pub use job::{build_job_update_body, reconcile_job_update};
pub use validate::{validate_datastore_create, DatastoreDesired, DatastoreKind};
