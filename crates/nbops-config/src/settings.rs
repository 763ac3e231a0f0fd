//! Connection settings resolved from flags and environment variables.
//!
//! # Design
//! - Flags win over environment variables; within the environment the first
//!   non-empty name in each list wins, which keeps legacy names working.
//! - Resolution takes a lookup function so tests never touch the process
//!   environment.

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Accepted variables for the API base URL, in precedence order.
pub const ENV_BASE_URL: &[&str] = &["NOCOBASE_BASE_URL", "API_BASE_URL"];
/// Accepted variables for the bearer token, in precedence order.
pub const ENV_API_KEY: &[&str] = &["NOCOBASE_API_KEY", "API_KEY", "NOCOBASE_MIRA_TOKEN"];
/// Optional role header override.
pub const ENV_ROLE: &str = "NOCOBASE_ROLE";
/// Optional request timeout in seconds.
pub const ENV_TIMEOUT: &str = "NOCOBASE_TIMEOUT_SECONDS";
/// Request timeout used when nothing is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Values supplied on the command line; each one overrides its variable.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    /// `--api-url`
    pub api_url: Option<String>,
    /// `--api-key`
    pub api_key: Option<String>,
    /// `--role`
    pub role: Option<String>,
    /// `--timeout`
    pub timeout_secs: Option<u64>,
}

/// Everything needed to talk to a NocoBase instance.
#[derive(Clone)]
pub struct ConnectionSettings {
    /// API root, always ending in `/` (for example `http://host:13000/api/`).
    pub base_url: Url,
    /// Bearer token.
    pub api_key: String,
    /// Optional `X-Role` header value.
    pub role: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ConnectionSettings")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"***")
            .field("role", &self.role)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ConnectionSettings {
    /// Resolve settings from overrides and the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVariable`] when the base URL or token is
    /// absent, and a parse error when a supplied value is malformed.
    pub fn from_env(overrides: &SettingsOverrides) -> ConfigResult<Self> {
        Self::resolve(overrides, |name| std::env::var(name).ok())
    }

    /// Resolve settings using an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`ConnectionSettings::from_env`].
    pub fn resolve<F>(overrides: &SettingsOverrides, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = non_empty(overrides.api_url.clone())
            .or_else(|| first_present(ENV_BASE_URL, &lookup))
            .ok_or(ConfigError::MissingVariable {
                names: ENV_BASE_URL,
            })?;
        let api_key = non_empty(overrides.api_key.clone())
            .or_else(|| first_present(ENV_API_KEY, &lookup))
            .ok_or(ConfigError::MissingVariable { names: ENV_API_KEY })?;
        let role = non_empty(overrides.role.clone()).or_else(|| non_empty(lookup(ENV_ROLE)));
        let timeout_secs = match overrides.timeout_secs {
            Some(value) => value,
            None => match non_empty(lookup(ENV_TIMEOUT)) {
                Some(raw) => parse_timeout(&raw)?,
                None => DEFAULT_TIMEOUT_SECS,
            },
        };
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout {
                value: timeout_secs.to_string(),
            });
        }

        let base_url = parse_base_url(&raw_url)?;
        debug!(base_url = %base_url, role = ?role, timeout_secs, "resolved connection settings");

        Ok(Self {
            base_url,
            api_key,
            role,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Parse an API root and normalise it to end with a slash.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidUrl`] or [`ConfigError::UnsupportedUrl`].
pub fn parse_base_url(raw: &str) -> ConfigResult<Url> {
    let trimmed = raw.trim();
    let mut url = Url::parse(trimmed).map_err(|source| ConfigError::InvalidUrl {
        value: trimmed.to_string(),
        source,
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::UnsupportedUrl {
            value: trimmed.to_string(),
        });
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_timeout(raw: &str) -> ConfigResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidTimeout {
            value: raw.to_string(),
        })
}

fn first_present<F>(names: &[&str], lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names.iter().find_map(|name| non_empty(lookup(name)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn resolves_primary_variables() -> ConfigResult<()> {
        let settings = ConnectionSettings::resolve(
            &SettingsOverrides::default(),
            lookup_from(&[
                ("NOCOBASE_BASE_URL", "http://localhost:13000/api"),
                ("NOCOBASE_API_KEY", "token"),
                ("NOCOBASE_ROLE", "root"),
            ]),
        )?;
        assert_eq!(settings.base_url.as_str(), "http://localhost:13000/api/");
        assert_eq!(settings.api_key, "token");
        assert_eq!(settings.role.as_deref(), Some("root"));
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        Ok(())
    }

    #[test]
    fn falls_back_to_legacy_names() -> ConfigResult<()> {
        let settings = ConnectionSettings::resolve(
            &SettingsOverrides::default(),
            lookup_from(&[
                ("API_BASE_URL", "https://nb.example.org/api/"),
                ("NOCOBASE_API_KEY", "  "),
                ("NOCOBASE_MIRA_TOKEN", "mira"),
            ]),
        )?;
        assert_eq!(settings.base_url.as_str(), "https://nb.example.org/api/");
        assert_eq!(settings.api_key, "mira");
        assert!(settings.role.is_none());
        Ok(())
    }

    #[test]
    fn overrides_beat_environment() -> ConfigResult<()> {
        let overrides = SettingsOverrides {
            api_url: Some("http://override:1/api".into()),
            api_key: Some("flag".into()),
            role: Some("admin".into()),
            timeout_secs: Some(3),
        };
        let settings = ConnectionSettings::resolve(
            &overrides,
            lookup_from(&[
                ("NOCOBASE_BASE_URL", "http://env/api"),
                ("NOCOBASE_API_KEY", "env"),
                ("NOCOBASE_TIMEOUT_SECONDS", "40"),
            ]),
        )?;
        assert_eq!(settings.base_url.as_str(), "http://override:1/api/");
        assert_eq!(settings.api_key, "flag");
        assert_eq!(settings.role.as_deref(), Some("admin"));
        assert_eq!(settings.timeout, Duration::from_secs(3));
        Ok(())
    }

    #[test]
    fn missing_token_is_reported() {
        let result = ConnectionSettings::resolve(
            &SettingsOverrides::default(),
            lookup_from(&[("NOCOBASE_BASE_URL", "http://localhost/api")]),
        );
        assert!(matches!(
            result,
            Err(ConfigError::MissingVariable { names }) if names == ENV_API_KEY
        ));
    }

    #[test]
    fn missing_url_is_reported_first() {
        let result =
            ConnectionSettings::resolve(&SettingsOverrides::default(), lookup_from(&[]));
        assert!(matches!(
            result,
            Err(ConfigError::MissingVariable { names }) if names == ENV_BASE_URL
        ));
    }

    #[test]
    fn rejects_bad_timeout_and_url() {
        let bad_timeout = ConnectionSettings::resolve(
            &SettingsOverrides::default(),
            lookup_from(&[
                ("NOCOBASE_BASE_URL", "http://localhost/api"),
                ("NOCOBASE_API_KEY", "token"),
                ("NOCOBASE_TIMEOUT_SECONDS", "soon"),
            ]),
        );
        assert!(matches!(bad_timeout, Err(ConfigError::InvalidTimeout { .. })));

        let bad_url = ConnectionSettings::resolve(
            &SettingsOverrides::default(),
            lookup_from(&[("NOCOBASE_BASE_URL", "not a url"), ("API_KEY", "token")]),
        );
        assert!(matches!(bad_url, Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn debug_output_hides_token() -> ConfigResult<()> {
        let settings = ConnectionSettings::resolve(
            &SettingsOverrides::default(),
            lookup_from(&[
                ("NOCOBASE_BASE_URL", "http://localhost/api"),
                ("NOCOBASE_API_KEY", "super-secret"),
            ]),
        )?;
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("super-secret"));
        Ok(())
    }
}
