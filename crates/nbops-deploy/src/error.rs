//! Errors that abort a deployment operation.
//!
//! # Design
//! - Per-item remote failures are counted in a [`crate::Tally`]; only the
//!   failures listed here stop an operation.

use std::path::PathBuf;

use nbops_client::RemoteError;
use thiserror::Error;

/// Primary error type for deployment operations.
#[derive(Debug, Error)]
pub enum DeployError {
    /// A remote call failed in a way the operation cannot continue past.
    #[error("{operation} failed")]
    Remote {
        /// Operation that was running.
        operation: &'static str,
        /// Underlying remote error.
        source: RemoteError,
    },
    /// A create call succeeded but returned no identifier.
    #[error("{operation} returned no identifier")]
    MissingId {
        /// Call that was expected to return an id.
        operation: &'static str,
    },
    /// A page route could not be found.
    #[error("page '{title}' not found under parent {parent_id}")]
    PageNotFound {
        /// Requested page title.
        title: String,
        /// Parent route id searched.
        parent_id: i64,
    },
    /// A page exists but has no block grid.
    #[error("page '{title}' has no grid")]
    GridNotFound {
        /// Page title.
        title: String,
    },
    /// The workflow cursor file could not be read or written.
    #[error("workflow cursor {} is unusable", path.display())]
    Cursor {
        /// Cursor file.
        path: PathBuf,
        /// Underlying configuration error.
        source: nbops_config::ConfigError,
    },
}

impl DeployError {
    /// Wrap a remote error with the operation name.
    #[must_use]
    pub const fn remote(operation: &'static str, source: RemoteError) -> Self {
        Self::Remote { operation, source }
    }
}

/// Convenience alias for deployment results.
pub type DeployResult<T> = Result<T, DeployError>;
