//! JSON manifest loading and export writing.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Read and deserialize a JSON manifest from `path`.
///
/// # Errors
///
/// Returns [`ConfigError::ManifestRead`] when the file cannot be read and
/// [`ConfigError::ManifestParse`] when it does not match `T`.
pub fn load_manifest<T: DeserializeOwned>(path: &Path) -> ConfigResult<T> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::ManifestRead {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = serde_json::from_str(&raw).map_err(|source| ConfigError::ManifestParse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded manifest");
    Ok(parsed)
}

/// Serialize `value` as pretty JSON into `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`ConfigError::ExportSerialize`] or [`ConfigError::ExportWrite`].
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> ConfigResult<()> {
    let mut rendered =
        serde_json::to_string_pretty(value).map_err(|source| ConfigError::ExportSerialize { source })?;
    rendered.push('\n');
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ConfigError::ExportWrite {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, rendered).map_err(|source| ConfigError::ExportWrite {
        path: path.to_path_buf(),
        source,
    })
}
