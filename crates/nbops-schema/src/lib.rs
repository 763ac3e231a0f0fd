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

//! Desired-state models and NocoBase UI-schema builders.
//!
//! Layout: `ids.rs` (deterministic schema identifiers), `model.rs` (manifest
//! types), `blocks.rs` (table/markdown/chart blocks and grid rows), `pages.rs`
//! (page skeletons and workflow assign forms), `fields.rs` (field definitions
//! and creation payloads).
//!
//! Every builder is pure: it only reads its inputs and draws identifiers from
//! the supplied [`UidGenerator`].

pub mod blocks;
pub mod fields;
pub mod ids;
pub mod model;
pub mod pages;

pub use blocks::{
    ChartBlockOptions, ChartDimension, ChartMeasure, TableBlockOptions, build_chart_block,
    build_markdown_block, build_table_block, wrap_in_row,
};
pub use fields::{
    field_belongs_to, field_bool, field_date, field_datetime, field_int, field_select, field_str,
    field_txt,
};
pub use ids::{UID_LEN, UidGenerator};
pub use model::{
    CollectionSpec, FieldSpec, Manifest, NodeSpec, ResourceGrant, RoleSpec, RouteKind, RouteSpec,
    SeedSet, TriggerSpec, WorkflowKind, WorkflowSpec,
};
pub use pages::{
    PageSkeleton, assign_form_schema, page_schema, placeholder_content, placeholder_page_schema,
};
