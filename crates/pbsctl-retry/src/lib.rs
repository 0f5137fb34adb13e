//! Retry and backoff policy shared by the task tracker and the reconciler.
//!
//! Two independent concerns live here, isolated per their own predicates so
//! the substrings and constants involved can be evolved without scattering
//! literals across the call sites:
//!
//! - an exponential-with-jitter [`Backoff`] calculator used by the task
//!   tracker's polling loop,
//! - the [`is_lock_contention`] and [`is_provider_quirk_b2_atime`] substring
//!   predicates used by the reconciler to decide whether a failed write is
//!   safe to retry locally.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use rand::Rng;
use std::time::Duration;

/// Exponential backoff with jitter, starting at 500 ms and doubling to a cap
/// of 5 s, plus ±20% jitter — the schedule the task tracker's poll loop uses.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    initial: Duration,
    cap: Duration,
    attempt: u32,
}

impl Backoff {
    /// The task tracker's polling schedule: 500 ms initial, 5 s cap.
    pub fn task_poll() -> Self {
        Self {
            initial: Duration::from_millis(500),
            cap: Duration::from_secs(5),
            attempt: 0,
        }
    }

    /// Build a backoff with custom initial delay and cap.
    pub fn new(initial: Duration, cap: Duration) -> Self {
        Self {
            initial,
            cap,
            attempt: 0,
        }
    }

    /// Returns the delay for the current attempt, then advances to the next.
    pub fn next_delay(&mut self) -> Duration {
        let exp = self.initial.as_millis().saturating_mul(1u128 << self.attempt.min(16));
        let capped = exp.min(self.cap.as_millis());
        self.attempt = self.attempt.saturating_add(1);
        jitter(capped as u64)
    }

    /// Current attempt count (number of delays already handed out).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

fn jitter(base_ms: u64) -> Duration {
    let mut rng = rand::thread_rng();
    let factor = rng.gen_range(0.8..=1.2);
    let jittered = (base_ms as f64 * factor).round().max(0.0) as u64;
    Duration::from_millis(jittered)
}

/// Bounded retry policy: a maximum attempt count plus a backoff schedule.
///
/// Used by the reconciler for lock-contention retries (§4.6): bounded
/// attempts, not indefinite, so a persistently-locked config file surfaces
/// `LockContentionRetryExhausted` rather than hanging the reconciliation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Construct a policy with the given attempt budget and backoff schedule.
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// The reconciler's lock-contention retry policy: 5 attempts, same
    /// exponential-with-jitter schedule as task polling.
    pub fn lock_contention() -> Self {
        Self::new(5, Backoff::task_poll())
    }

    /// Maximum number of attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another attempt is allowed given the attempts already made.
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Delay to wait before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        self.backoff.next_delay()
    }
}

/// Substrings PBS is known to emit when a config-file write collides with
/// another writer's advisory lock. Isolated here per the design note that
/// this detection is brittle and must not be duplicated at call sites.
const LOCK_CONTENTION_SUBSTRINGS: &[&str] = &[
    "unable to acquire lock",
    "interrupted system call",
    ".datastore.lck",
];

/// True if `message` (a PBS API error body or task exit message) indicates a
/// config-file lock contention rather than a hard failure.
pub fn is_lock_contention(message: &str) -> bool {
    let lower = message.to_lowercase();
    LOCK_CONTENTION_SUBSTRINGS
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Substrings seen in Backblaze B2's rejection of PBS's access-time safety
/// check on S3-backed datastores. Isolated per the same brittleness concern
/// as [`is_lock_contention`]; B2 may change this wording upstream.
const B2_ATIME_QUIRK_SUBSTRINGS: &[&str] = &["access time safety check", "not implemented", "atime"];

/// True if `message` (a task exit message) matches the known B2
/// atime-safety-check incompatibility.
pub fn is_provider_quirk_b2_atime(message: &str) -> bool {
    let lower = message.to_lowercase();
    let [safety_check, not_implemented, atime] = B2_ATIME_QUIRK_SUBSTRINGS else {
        return false;
    };
    lower.contains(safety_check) || (lower.contains(not_implemented) && lower.contains(atime))
}
