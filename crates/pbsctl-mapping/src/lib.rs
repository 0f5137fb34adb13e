// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Bidirectional mapping between the declarative resource model and PBS
//! wire structs: the [`DeleteSet`] derivation rule, the write-only
//! [`SensitiveOverlay`] merge, and the typed view of property-string-valued
//! fields like `backend`.

use pbsctl_core::{DeleteSet, SensitiveOverlay, Value};
use pbsctl_error::{ErrorCode, PbsError};
use pbsctl_propstring::PropertyMap;
use std::collections::BTreeMap;

/// Whether a wire field is a plain scalar or a property-string-encoded
/// structural block (`notify`, `tuning`, `maintenance-mode`, `backend`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Mapped directly, kebab-case key on the wire.
    Scalar,
    /// Serialized as a single property-string value; absence of the whole
    /// block (not individual sub-keys) drives deletion.
    Block,
}

/// Describes one field of a resource family's wire struct for the purposes
/// of [`compute_delete_set`].
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Wire-level (kebab-case) field name.
    pub wire_name: &'static str,
    /// Scalar vs. structural-block field.
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Shorthand for a scalar field spec.
    pub const fn scalar(wire_name: &'static str) -> Self {
        Self {
            wire_name,
            kind: FieldKind::Scalar,
        }
    }

    /// Shorthand for a structural-block field spec.
    pub const fn block(wire_name: &'static str) -> Self {
        Self {
            wire_name,
            kind: FieldKind::Block,
        }
    }
}

/// Computes the [`DeleteSet`] for an Update request.
///
/// `desired` maps each field's wire name to its three-valued state;
/// `prior_present` is the set of wire names the prior Read actually
/// returned a value for. A key appears in the resulting set iff the desired
/// value is null/absent *and* the prior model had it present — for
/// [`FieldKind::Block`] fields this holds regardless of which property-string
/// sub-keys changed, since PBS has no notion of partial clearing within a
/// property-string-valued field.
pub fn compute_delete_set(
    specs: &[FieldSpec],
    desired: &BTreeMap<&'static str, Value<String>>,
    prior_present: &std::collections::BTreeSet<&'static str>,
) -> DeleteSet {
    let mut delete_set = DeleteSet::new();
    for spec in specs {
        let desired_value = desired.get(spec.wire_name).unwrap_or(&Value::Unknown);
        let was_present = prior_present.contains(spec.wire_name);
        match spec.kind {
            FieldKind::Scalar => delete_set.consider_scalar(spec.wire_name, desired_value, was_present),
            FieldKind::Block => delete_set.consider_block(spec.wire_name, desired_value, was_present),
        }
    }
    delete_set
}

/// Merges a [`SensitiveOverlay`] into a wire-level JSON object, overwriting
/// any conflicting key. Sensitive fields are never sourced from a Read, so
/// this is always the last step before a Create/Update body is serialized.
pub fn apply_sensitive_overlay(body: &mut serde_json::Map<String, serde_json::Value>, overlay: &SensitiveOverlay) {
    for field in SENSITIVE_FIELD_NAMES {
        if let Some(value) = overlay.get(field) {
            match value {
                Value::Known(v) => {
                    body.insert((*field).to_string(), serde_json::Value::String(v.clone()));
                }
                Value::Null => {
                    body.remove(*field);
                }
                Value::Unknown => {}
            }
        }
    }
}

/// Every sensitive/write-only field name this codec knows to look for when
/// merging a [`SensitiveOverlay`]. Kept as a flat list rather than per
/// resource family, since the overlay itself already scopes which of these
/// are actually populated for a given resource.
const SENSITIVE_FIELD_NAMES: &[&str] = &["password", "token-secret", "secret-key", "token"];

/// Typed view of the `backend` property-string field used by s3-endpoint
/// and S3-backed datastore configuration. Kept as the canonical in-memory
/// form; the property string itself is derived only at serialization
/// boundaries via [`BackendConfig::to_property_map`] /
/// [`BackendConfig::from_property_map`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// S3-compatible object storage backend.
    S3 {
        /// Name of the configured s3-endpoint client.
        client: String,
        /// Target bucket name.
        bucket: String,
    },
}

impl BackendConfig {
    /// Encode as the property map PBS expects under the `backend` key.
    pub fn to_property_map(&self) -> PropertyMap {
        match self {
            BackendConfig::S3 { client, bucket } => PropertyMap::from([
                ("type".to_string(), "s3".to_string()),
                ("client".to_string(), client.clone()),
                ("bucket".to_string(), bucket.clone()),
            ]),
        }
    }

    /// Decode from a parsed property map.
    pub fn from_property_map(map: &PropertyMap) -> Result<Self, PbsError> {
        let backend_type = map.get("type").ok_or_else(|| {
            PbsError::new(
                ErrorCode::ValidationMissingField,
                "backend property string missing 'type'",
            )
        })?;

        match backend_type.as_str() {
            "s3" => {
                let client = map.get("client").ok_or_else(|| {
                    PbsError::new(ErrorCode::ValidationMissingField, "s3 backend missing 'client'")
                        .with_context("field", "client")
                })?;
                let bucket = map.get("bucket").ok_or_else(|| {
                    PbsError::new(ErrorCode::ValidationMissingField, "s3 backend missing 'bucket'")
                        .with_context("field", "bucket")
                })?;
                Ok(BackendConfig::S3 {
                    client: client.clone(),
                    bucket: bucket.clone(),
                })
            }
            other => Err(PbsError::new(
                ErrorCode::ValidationRejectedField,
                format!("unsupported backend type: {other}"),
            )
            .with_context("backend_type", other)),
        }
    }
}

/// The three granularities PBS's `tuning.sync-level` property-string field
/// accepts. The deprecated `tune-level` scalar collapses the same three
/// choices to an integer 0-2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncLevel {
    /// No additional fsync beyond what the OS already does.
    None,
    /// fsync each written file plus its containing directory.
    Filesystem,
    /// fsync a commit file after each write, the strictest option.
    File,
}

impl SyncLevel {
    /// Maps the deprecated `tune-level` scalar (0-2).
    pub fn from_tune_level(level: u8) -> Result<Self, PbsError> {
        match level {
            0 => Ok(SyncLevel::None),
            1 => Ok(SyncLevel::Filesystem),
            2 => Ok(SyncLevel::File),
            other => Err(PbsError::new(
                ErrorCode::ValidationRejectedField,
                format!("tune_level out of range: {other}"),
            )
            .with_context("field", "tune_level")),
        }
    }

    /// The deprecated `tune-level` scalar this level collapses to.
    pub fn to_tune_level(self) -> u8 {
        match self {
            SyncLevel::None => 0,
            SyncLevel::Filesystem => 1,
            SyncLevel::File => 2,
        }
    }

    /// The `tuning.sync-level` property-string value.
    pub fn as_wire_str(self) -> &'static str {
        match self {
            SyncLevel::None => "none",
            SyncLevel::Filesystem => "filesystem",
            SyncLevel::File => "file",
        }
    }

    /// Parses a `tuning.sync-level` property-string value.
    pub fn from_wire_str(value: &str) -> Result<Self, PbsError> {
        match value {
            "none" => Ok(SyncLevel::None),
            "filesystem" => Ok(SyncLevel::Filesystem),
            "file" => Ok(SyncLevel::File),
            other => Err(PbsError::new(
                ErrorCode::ValidationRejectedField,
                format!("unsupported sync-level: {other}"),
            )
            .with_context("field", "tuning.sync-level")),
        }
    }
}

const TUNE_LEVEL_WIRE: &str = "tune-level";
const TUNING_WIRE: &str = "tuning";
const SYNC_LEVEL_KEY: &str = "sync-level";

/// Keeps the deprecated `tune-level` scalar and the `tuning` block's
/// `sync-level` sub-key in sync on a datastore wire body. Whichever one the
/// caller populated drives the other; if both are present they must agree,
/// since sending PBS two disagreeing views of the same setting is a caller
/// bug rather than something to resolve silently.
pub fn sync_tune_level(body: &mut serde_json::Map<String, serde_json::Value>) -> Result<(), PbsError> {
    let tune_level = match body.get(TUNE_LEVEL_WIRE) {
        Some(serde_json::Value::Number(n)) => n.as_u64().map(|v| v as u8),
        Some(serde_json::Value::String(s)) => Some(s.parse::<u8>().map_err(|_| {
            PbsError::new(ErrorCode::ValidationRejectedField, format!("tune_level is not an integer: {s}"))
                .with_context("field", "tune_level")
        })?),
        _ => None,
    };
    let mut tuning_map = match body.get(TUNING_WIRE).and_then(|v| v.as_str()) {
        Some(s) => pbsctl_propstring::parse(s)?,
        None => PropertyMap::new(),
    };
    let sync_level_from_tuning =
        tuning_map.get(SYNC_LEVEL_KEY).map(|s| SyncLevel::from_wire_str(s)).transpose()?;

    let resolved = match (tune_level, sync_level_from_tuning) {
        (Some(level), Some(from_tuning)) => {
            let from_scalar = SyncLevel::from_tune_level(level)?;
            if from_scalar != from_tuning {
                return Err(PbsError::new(
                    ErrorCode::ValidationMutuallyExclusive,
                    "tune_level and tuning.sync-level disagree",
                )
                .with_context("field", "tune_level"));
            }
            from_scalar
        }
        (Some(level), None) => SyncLevel::from_tune_level(level)?,
        (None, Some(from_tuning)) => from_tuning,
        (None, None) => return Ok(()),
    };

    body.insert(TUNE_LEVEL_WIRE.to_string(), serde_json::Value::from(resolved.to_tune_level()));
    tuning_map.insert(SYNC_LEVEL_KEY.to_string(), resolved.as_wire_str().to_string());
    body.insert(TUNING_WIRE.to_string(), serde_json::Value::String(pbsctl_propstring::format(&tuning_map)));
    Ok(())
}
