//! Run tallies and the per-item failure policy.

use std::fmt::{self, Display, Formatter};
use std::ops::AddAssign;

use nbops_client::RemoteResult;
use tracing::{info, warn};

use crate::error::{DeployError, DeployResult};

/// Outcome counts for one operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    /// Items applied.
    pub ok: usize,
    /// Items that already existed.
    pub skipped: usize,
    /// Items rejected by the server.
    pub failed: usize,
}

impl Tally {
    /// Short form used at the end of seeding: `"<ok> OK, <failed> errors"`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{} OK, {} errors", self.ok, self.failed)
    }

    /// Whether any item failed.
    #[must_use]
    pub const fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Total items seen.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.ok + self.skipped + self.failed
    }

    /// Apply the per-item policy to one remote outcome.
    ///
    /// Success counts as ok, `AlreadyExists` as skipped, a lost connection
    /// aborts, and any other error counts as failed.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Remote`] for connectivity failures.
    pub fn settle<T>(
        &mut self,
        operation: &'static str,
        item: &str,
        outcome: RemoteResult<T>,
    ) -> DeployResult<Option<T>> {
        match outcome {
            Ok(value) => {
                self.ok += 1;
                info!(operation, item, "applied");
                Ok(Some(value))
            }
            Err(err) if err.is_already_exists() => {
                self.skipped += 1;
                info!(operation, item, "already exists, skipped");
                Ok(None)
            }
            Err(err) if err.is_connectivity() => Err(DeployError::remote(operation, err)),
            Err(err) => {
                self.failed += 1;
                warn!(operation, item, error = %err, "item failed");
                Ok(None)
            }
        }
    }
}

impl AddAssign for Tally {
    fn add_assign(&mut self, other: Self) {
        self.ok += other.ok;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

impl Display for Tally {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{} OK, {} skipped, {} errors",
            self.ok, self.skipped, self.failed
        )
    }
}
