//! Command handlers grouped by concern.

pub(crate) mod collections;
pub(crate) mod deploy;
pub(crate) mod roles;
pub(crate) mod routes;
pub(crate) mod seed;
pub(crate) mod ui;
pub(crate) mod workflow;

use std::path::Path;

use nbops_config::load_manifest;
use nbops_deploy::Tally;
use nbops_schema::Manifest;

use crate::client::{CliError, CliResult};

/// Read and validate a manifest file.
pub(crate) fn read_manifest(path: &Path) -> CliResult<Manifest> {
    load_manifest(path).map_err(CliError::failure)
}

/// Turn per-item failures into a non-zero exit once the summary is printed.
pub(crate) fn finish(tally: Tally) -> CliResult<()> {
    if tally.has_failures() {
        Err(CliError::incomplete(tally))
    } else {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use nbops_telemetry::MemoryActionLog;
    use nbops_test_support::RecordingTransport;
    use nbops_test_support::fixtures::fixed_ids;

    use crate::cli::OutputFormat;
    use crate::client::{AppContext, SharedTransport};

    /// Context over `recorder`, logging into `log`.
    pub(crate) fn context(recorder: &Arc<RecordingTransport>, log: &Arc<MemoryActionLog>) -> AppContext {
        let transport: SharedTransport = recorder.clone();
        AppContext::new(transport, log.clone(), "test", fixed_ids(), OutputFormat::Json)
    }

    /// Write `manifest` into `dir` and return its path.
    pub(crate) fn manifest_file(dir: &tempfile::TempDir, manifest: &Manifest) -> anyhow::Result<PathBuf> {
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, serde_json::to_vec_pretty(manifest)?)?;
        Ok(path)
    }

    #[test]
    fn finish_fails_only_on_failures() {
        assert!(finish(Tally { ok: 1, skipped: 2, failed: 0 }).is_ok());
        assert!(finish(Tally { ok: 1, skipped: 0, failed: 1 }).is_err());
    }

    #[test]
    fn unreadable_manifest_is_an_error() {
        let result = read_manifest(Path::new("/nonexistent/manifest.json"));
        assert!(result.is_err());
    }
}
