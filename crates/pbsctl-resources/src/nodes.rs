//! `GET /nodes` — cluster member enumeration, used to resolve which node a
//! task-bearing write should be polled against when the caller doesn't
//! already know (single-node PBS deployments always have exactly one).

use pbsctl_error::PbsError;
use pbsctl_transport::{Headers, Transport};

/// `GET /nodes`.
pub async fn list_nodes(transport: &dyn Transport, headers: &Headers) -> Result<Vec<serde_json::Value>, PbsError> {
    let envelope = transport.get("/api2/json/nodes", headers).await?;
    envelope.decode()
}
