//! Per-resource-family field tables for [`pbsctl_mapping::compute_delete_set`].
//!
//! One const array per family naming every scalar/block field the wire
//! struct carries; the reconciler never hand-rolls a delete set, it always
//! goes through one of these plus `compute_delete_set`.

use pbsctl_mapping::FieldSpec;

/// `/config/datastore` wire fields.
pub const DATASTORE_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("comment"),
    FieldSpec::scalar("gc-schedule"),
    FieldSpec::scalar("prune-schedule"),
    FieldSpec::scalar("tune-level"),
    FieldSpec::block("notify"),
    FieldSpec::block("tuning"),
    FieldSpec::block("maintenance-mode"),
];

/// `/config/prune-job` wire fields.
pub const PRUNE_JOB_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("schedule"),
    FieldSpec::scalar("keep-daily"),
    FieldSpec::scalar("keep-weekly"),
    FieldSpec::scalar("keep-monthly"),
    FieldSpec::scalar("keep-yearly"),
    FieldSpec::scalar("comment"),
];

/// `/config/sync-job` wire fields.
pub const SYNC_JOB_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("schedule"),
    FieldSpec::scalar("remote"),
    FieldSpec::scalar("remote-store"),
    FieldSpec::scalar("comment"),
];

/// `/config/verify-job` wire fields.
pub const VERIFY_JOB_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("schedule"),
    FieldSpec::scalar("ignore-verified"),
    FieldSpec::scalar("comment"),
];

/// `/config/gc-job` wire fields.
pub const GC_JOB_FIELDS: &[FieldSpec] = &[FieldSpec::scalar("schedule"), FieldSpec::scalar("comment")];

/// `/config/remote` wire fields.
pub const REMOTE_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("host"),
    FieldSpec::scalar("auth-id"),
    FieldSpec::scalar("fingerprint"),
    FieldSpec::scalar("comment"),
];
