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

//! Connection settings and manifest loading for the NocoBase toolkit.
//!
//! Layout: `settings.rs` (environment/flag resolution for the API connection),
//! `manifest.rs` (JSON desired-state file loading), `error.rs` (`ConfigError`).

pub mod error;
pub mod manifest;
pub mod settings;

pub use error::{ConfigError, ConfigResult};
pub use manifest::{load_manifest, write_json};
pub use settings::{
    ConnectionSettings, DEFAULT_TIMEOUT_SECS, ENV_API_KEY, ENV_BASE_URL, ENV_ROLE, ENV_TIMEOUT,
    SettingsOverrides,
};
