//! Shared context, error type and start-up wiring for the CLI.

use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use nbops_client::{ApiClient, DryRunTransport, HttpTransport, Transport};
use nbops_config::{ConnectionSettings, SettingsOverrides};
use nbops_deploy::{DeployError, Tally};
use nbops_schema::UidGenerator;
use nbops_telemetry::{ActionSink, FileActionLog, NullActionLog};
use rand::{Rng, distr::Alphanumeric};

use crate::cli::OutputFormat;

/// Exit code for every failure the CLI reports.
pub(crate) const EXIT_FAILURE: i32 = 1;

/// CLI-level error: bad input or a failed operation.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    /// Error reported after an operation that finished with per-item failures.
    pub(crate) fn incomplete(tally: Tally) -> Self {
        Self::Validation(format!("{} item(s) failed ({tally})", tally.failed))
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        EXIT_FAILURE
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl From<DeployError> for CliError {
    fn from(err: DeployError) -> Self {
        Self::failure(err)
    }
}

/// Transport handed to every command; HTTP, optionally behind the dry-run decorator.
pub(crate) type SharedTransport = Arc<dyn Transport>;

/// Application context passed to command handlers.
pub(crate) struct AppContext {
    pub(crate) api: ApiClient<SharedTransport>,
    pub(crate) ids: UidGenerator,
    pub(crate) output: OutputFormat,
}

impl AppContext {
    /// Context over an arbitrary transport and action sink.
    pub(crate) fn new(
        transport: SharedTransport,
        actions: Arc<dyn ActionSink>,
        script: &str,
        ids: UidGenerator,
        output: OutputFormat,
    ) -> Self {
        Self {
            api: ApiClient::new(transport, actions, script),
            ids,
            output,
        }
    }
}

/// Global options needed to build an [`AppContext`].
pub(crate) struct Connection<'a> {
    pub(crate) overrides: SettingsOverrides,
    pub(crate) dry_run: bool,
    pub(crate) log_dir: &'a Path,
    pub(crate) no_action_log: bool,
    pub(crate) output: OutputFormat,
}

/// Resolve settings, open the action log and build the transport stack.
pub(crate) fn connect(connection: Connection<'_>, script: &str, trace_id: &str) -> CliResult<AppContext> {
    let settings = ConnectionSettings::from_env(&connection.overrides).map_err(CliError::failure)?;
    let http = HttpTransport::new(&settings, trace_id).map_err(CliError::failure)?;
    let transport: SharedTransport = if connection.dry_run {
        tracing::info!("dry run: mutating requests are printed, not sent");
        Arc::new(DryRunTransport::new(http))
    } else {
        Arc::new(http)
    };
    let actions: Arc<dyn ActionSink> = if connection.no_action_log {
        Arc::new(NullActionLog)
    } else {
        let file = FileActionLog::new(connection.log_dir).map_err(|err| {
            CliError::failure(anyhow!(
                "failed to open action log in {}: {err}",
                connection.log_dir.display()
            ))
        })?;
        Arc::new(file)
    };
    let ids = UidGenerator::with_seed(random_string(16));
    Ok(AppContext::new(
        transport,
        actions,
        script,
        ids,
        connection.output,
    ))
}

/// Random alphanumeric seed for the uid generator.
#[must_use]
pub(crate) fn random_string(len: usize) -> String {
    let mut rng = rand::rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric) as char)
        .take(len)
        .collect()
}
