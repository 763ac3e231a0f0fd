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

//! Console logging and the persistent action log.
//!
//! Layout: `init.rs` (tracing subscriber installation), `action_log.rs`
//! (structured action records, sinks, and payload sanitising).

pub mod action_log;
pub mod init;

pub use action_log::{
    ActionRecord, ActionSink, FileActionLog, MemoryActionLog, NullActionLog, REDACTED,
    SENSITIVE_KEYS, log_action, sanitize,
};
pub use init::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging, log_format_from_str,
};
