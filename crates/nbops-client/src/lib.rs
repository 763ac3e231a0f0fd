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

//! NocoBase REST client core.
//!
//! Layout: `transport.rs` (request model and the `Transport` seam),
//! `http.rs` (reqwest-backed transport), `dry_run.rs` (decorator that
//! suppresses writes), `retry.rs` (linear back-off), `client.rs` (verbs,
//! pagination, action logging), `error.rs` (typed remote failures).

pub mod client;
pub mod dry_run;
pub mod error;
pub mod http;
pub mod retry;
pub mod transport;

pub use client::{ApiClient, DEFAULT_PAGE_SIZE};
pub use dry_run::{DryRunTransport, is_dry_run_payload};
pub use error::{RemoteError, RemoteResult, TransportBuildError, classify_response};
pub use http::{HEADER_REQUEST_ID, HEADER_ROLE, HttpTransport};
pub use retry::RetryPolicy;
pub use transport::{ApiRequest, Method, Transport, encode_query};
