//! Typed CRUD clients for PBS resource families.
//!
//! Resource schemas (which fields a datastore or a prune job actually has)
//! are owned by the embedding declarative framework; this crate only knows
//! endpoint shapes, which writes are async (return a UPID) vs. sync, and
//! the family-specific quirks each one has (datastore eventual
//! consistency, remote scan, notification target aggregation).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod datastore;
mod jobs;
mod metrics;
mod nodes;
mod notifications;
mod remote;
mod s3endpoint;

pub use client::ResourceClient;
pub use datastore::{DatastoreClient, DatastoreRead, DATASTORE_CREATE_SETTLE, DATASTORE_DELETE_SETTLE};
pub use jobs::{GcJobClient, PruneJobClient, SyncJobClient, VerifyJobClient};
pub use metrics::{MetricsServerClient, MetricsServerKind};
pub use nodes::list_nodes;
pub use notifications::{NotificationEndpointClient, NotificationEndpointKind, NotificationMatcherClient};
pub use remote::RemoteClient;
pub use s3endpoint::S3EndpointClient;

use pbsctl_core::Upid;

/// Outcome of a `create`/`update`/`delete` call: either the server answered
/// synchronously, or it queued an async task the caller must await via
/// [`pbsctl_task::wait_for_task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The server completed the write inline; no task to wait on.
    Sync,
    /// The server queued an async task under this UPID.
    Async(Upid),
}

impl WriteOutcome {
    /// The UPID, if this was an async write.
    pub fn upid(&self) -> Option<&Upid> {
        match self {
            Self::Async(upid) => Some(upid),
            Self::Sync => None,
        }
    }
}
