#![forbid(unsafe_code)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Deployment operations that converge a NocoBase instance on a manifest.
//!
//! Layout: `report.rs` (per-run tallies and the per-item failure policy),
//! `collections.rs`, `seed.rs`, `permissions.rs`, `routes.rs`, `ui.rs`
//! (block insertion into existing pages), `workflow.rs` (restartable
//! workflow saga), `error.rs`.
//!
//! Operations run sequentially, one request per remote object. A failed item
//! is counted and the run moves on; losing the connection aborts the run.

pub mod collections;
pub mod error;
pub mod permissions;
pub mod report;
pub mod routes;
pub mod seed;
pub mod ui;
pub mod workflow;

pub use collections::{
    CollectionPhase, collection_payload, count_records, deploy_collections,
    export_collection_schema, list_collections,
};
pub use error::{DeployError, DeployResult};
pub use permissions::{
    PermissionCheck, check_permission, ensure_role, ensure_roles, grant_resources,
    revoke_resource, set_strategy,
};
pub use report::Tally;
pub use routes::{
    CreatedPage, RouteLookup, create_group, create_page, deploy_routes, find_grid_uid,
    find_route_by_title, insert_into_grid,
};
pub use seed::{seed_all, seed_records};
pub use ui::add_blocks_to_page;
pub use workflow::{CursorBook, SagaCursor, WorkflowPlan, apply, apply_all};

use serde_json::Value;

/// Identifier in a create response (`data.id`), when present.
pub(crate) fn created_id(payload: &Value) -> Option<i64> {
    payload.pointer("/data/id").and_then(Value::as_i64)
}
