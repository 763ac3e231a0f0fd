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

//! Shared test helpers used across the workspace.
//! Layout: mocks.rs (scripted transport that records requests), fixtures.rs (sample desired state).

pub mod fixtures;
pub mod mocks;

pub use mocks::{RecordingTransport, Reply};
