//! Unified error taxonomy with stable error codes for the PBS reconciliation core.
//!
//! Every error surfaced across the crate family carries an [`ErrorCode`] (a
//! machine-readable, stable string tag), a human-readable message, an
//! optional cause chain, and arbitrary key-value context. Use the builder
//! returned by [`PbsError::new`] to construct errors fluently.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Network/TLS/malformed-response failures below the HTTP semantics layer.
    Transport,
    /// Authentication/authorization failures.
    Auth,
    /// Requested resource does not exist on the server.
    NotFound,
    /// Optimistic-concurrency digest mismatch.
    Conflict,
    /// Desired-state validation failed before a request was ever sent.
    Validation,
    /// An async task reported a non-OK terminal status.
    TaskFailed,
    /// An async task did not reach a terminal status before the deadline.
    TaskTimeout,
    /// A write was rejected due to a config-file lock held by another writer.
    LockContention,
    /// A known backend/provider quirk rejected an otherwise-valid request.
    ProviderQuirk,
    /// The operation was canceled via its `CancellationToken`.
    Canceled,
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transport => "transport",
            Self::Auth => "auth",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Validation => "validation",
            Self::TaskFailed => "task_failed",
            Self::TaskTimeout => "task_timeout",
            Self::LockContention => "lock_contention",
            Self::ProviderQuirk => "provider_quirk",
            Self::Canceled => "canceled",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that is
/// guaranteed not to change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Transport --
    /// The request could not reach the server (DNS, connect, reset, timeout).
    TransportNetwork,
    /// TLS handshake or certificate verification failed.
    TransportTls,
    /// The server responded, but the body did not parse into the expected shape.
    TransportMalformedResponse,

    // -- Auth --
    /// Server rejected credentials (expired ticket, bad token).
    AuthUnauthorized,
    /// Server rejected the request as insufficiently privileged.
    AuthForbidden,

    // -- NotFound --
    /// The resource identified by id/kind does not exist on the server.
    NotFoundResource,

    // -- Conflict --
    /// The digest supplied on update/delete does not match the server's current digest.
    ConflictDigestMismatch,

    // -- Validation --
    /// A field required by the resource family's schema is absent from the desired model.
    ValidationMissingField,
    /// Two fields that are mutually exclusive were both set.
    ValidationMutuallyExclusive,
    /// A field was present but is rejected outright for this resource/version.
    ValidationRejectedField,

    // -- TaskFailed --
    /// The worker task referenced by a UPID finished with a non-OK exit status.
    TaskExitError,

    // -- TaskTimeout --
    /// The worker task did not reach a terminal state before the caller's deadline.
    TaskDeadlineExceeded,

    // -- LockContention --
    /// Retries against a config-file lock were exhausted without success.
    LockContentionRetryExhausted,

    // -- ProviderQuirk --
    /// Backblaze B2 rejected the create call due to its atime-check quirk.
    ProviderQuirkB2AtimeCheck,

    // -- Canceled --
    /// The operation's `CancellationToken` was canceled before completion.
    OperationCanceled,

    // -- Internal --
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TransportNetwork | Self::TransportTls | Self::TransportMalformedResponse => {
                ErrorCategory::Transport
            }

            Self::AuthUnauthorized | Self::AuthForbidden => ErrorCategory::Auth,

            Self::NotFoundResource => ErrorCategory::NotFound,

            Self::ConflictDigestMismatch => ErrorCategory::Conflict,

            Self::ValidationMissingField
            | Self::ValidationMutuallyExclusive
            | Self::ValidationRejectedField => ErrorCategory::Validation,

            Self::TaskExitError => ErrorCategory::TaskFailed,

            Self::TaskDeadlineExceeded => ErrorCategory::TaskTimeout,

            Self::LockContentionRetryExhausted => ErrorCategory::LockContention,

            Self::ProviderQuirkB2AtimeCheck => ErrorCategory::ProviderQuirk,

            Self::OperationCanceled => ErrorCategory::Canceled,

            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Stable `&'static str` representation of the code (e.g.
    /// `"TRANSPORT_NETWORK"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransportNetwork => "TRANSPORT_NETWORK",
            Self::TransportTls => "TRANSPORT_TLS",
            Self::TransportMalformedResponse => "TRANSPORT_MALFORMED_RESPONSE",
            Self::AuthUnauthorized => "AUTH_UNAUTHORIZED",
            Self::AuthForbidden => "AUTH_FORBIDDEN",
            Self::NotFoundResource => "NOT_FOUND_RESOURCE",
            Self::ConflictDigestMismatch => "CONFLICT_DIGEST_MISMATCH",
            Self::ValidationMissingField => "VALIDATION_MISSING_FIELD",
            Self::ValidationMutuallyExclusive => "VALIDATION_MUTUALLY_EXCLUSIVE",
            Self::ValidationRejectedField => "VALIDATION_REJECTED_FIELD",
            Self::TaskExitError => "TASK_EXIT_ERROR",
            Self::TaskDeadlineExceeded => "TASK_DEADLINE_EXCEEDED",
            Self::LockContentionRetryExhausted => "LOCK_CONTENTION_RETRY_EXHAUSTED",
            Self::ProviderQuirkB2AtimeCheck => "PROVIDER_QUIRK_B2_ATIME_CHECK",
            Self::OperationCanceled => "OPERATION_CANCELED",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PbsError
// ---------------------------------------------------------------------------

/// Unified reconciliation-core error.
///
/// Carries a stable [`ErrorCode`], a human-readable message, an optional
/// source error for cause-chaining, and arbitrary structured context. Every
/// error surfaced by a resource client or the reconciler populates
/// `resource_kind`/`resource_id`/`path` (and `upid` for task errors) in the
/// context map.
///
/// # Builder usage
///
/// ```
/// use pbsctl_error::{PbsError, ErrorCode};
///
/// let err = PbsError::new(ErrorCode::ConflictDigestMismatch, "digest changed since read")
///     .with_context("resource_kind", "datastore")
///     .with_context("resource_id", "backups");
/// ```
pub struct PbsError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl PbsError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialisation
    /// fails, the entry is silently skipped.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// True if this error's category is [`ErrorCategory::LockContention`].
    pub fn is_lock_contention(&self) -> bool {
        self.category() == ErrorCategory::LockContention
    }
}

impl Clone for PbsError {
    /// Clones code/message/context; the boxed `source` is not `Clone` and is
    /// intentionally dropped (callers needing the cause chain should not
    /// clone — this exists for test scripting, e.g. `MockTransport`).
    fn clone(&self) -> Self {
        Self {
            code: self.code,
            message: self.message.clone(),
            source: None,
            context: self.context.clone(),
        }
    }
}

impl fmt::Debug for PbsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("PbsError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for PbsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            // Deterministic output thanks to BTreeMap.
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for PbsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// Serialization support
// ---------------------------------------------------------------------------

/// Serialisable snapshot of a [`PbsError`] (without the opaque source).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PbsErrorDto {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Structured context.
    pub context: BTreeMap<String, serde_json::Value>,
    /// String representation of the source error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_message: Option<String>,
}

impl From<&PbsError> for PbsErrorDto {
    fn from(err: &PbsError) -> Self {
        Self {
            code: err.code,
            message: err.message.clone(),
            context: err.context.clone(),
            source_message: err.source.as_ref().map(|s| s.to_string()),
        }
    }
}

impl From<PbsErrorDto> for PbsError {
    fn from(dto: PbsErrorDto) -> Self {
        Self {
            code: dto.code,
            message: dto.message,
            source: None,
            context: dto.context,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
