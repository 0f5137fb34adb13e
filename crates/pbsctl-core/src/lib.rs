// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stable contract types for the PBS reconciliation core — `Credentials`,
//! `Upid`/`TaskStatus`, the three-valued `Value` field semantics,
//! `DesiredModel`/`PriorModel`, `DeleteSet`, and `Digest`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod credentials;
mod digest;
mod model;
mod upid;
mod value;

pub use credentials::{AuthMethod, Credentials, TlsPolicy};
pub use digest::Digest;
pub use model::{DeleteSet, DesiredModel, PriorModel, SensitiveOverlay};
pub use upid::{TaskStatus, Upid};
pub use value::Value;
