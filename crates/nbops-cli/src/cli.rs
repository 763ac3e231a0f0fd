//! Argument parsing, start-up and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use nbops_config::SettingsOverrides;
use nbops_telemetry::{DEFAULT_LOG_LEVEL, LoggingConfig, build_sha, init_logging, log_format_from_str};
use tracing::info;
use uuid::Uuid;

use crate::client::{AppContext, CliResult, Connection, connect};
use crate::commands::{collections, deploy, roles, routes, seed, ui, workflow};

/// Parses arguments, runs the requested command and returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    if let Err(err) = init_logging(&logging_config(cli.log_format.as_deref())) {
        eprintln!("warning: {err:#}");
    }

    let label = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();
    match execute(cli, label, &trace_id).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

/// Console logging settings; the package version stands in for a build id.
fn logging_config(log_format: Option<&str>) -> LoggingConfig<'static> {
    LoggingConfig {
        level: DEFAULT_LOG_LEVEL,
        format: log_format_from_str(log_format),
        build_sha: env!("CARGO_PKG_VERSION"),
    }
}

async fn execute(cli: Cli, label: &'static str, trace_id: &str) -> CliResult<()> {
    let Cli {
        api_url,
        api_key,
        role,
        timeout,
        dry_run,
        log_dir,
        no_action_log,
        output,
        command,
        ..
    } = cli;
    let ctx = connect(
        Connection {
            overrides: SettingsOverrides {
                api_url,
                api_key,
                role,
                timeout_secs: timeout,
            },
            dry_run,
            log_dir: &log_dir,
            no_action_log,
            output,
        },
        label,
        trace_id,
    )?;
    info!(command = label, trace_id, dry_run, build = build_sha(), "starting");
    dispatch(&ctx, command).await
}

pub(crate) async fn dispatch(ctx: &AppContext, command: Command) -> CliResult<()> {
    match command {
        Command::Deploy(args) => deploy::handle_deploy(ctx, args).await,
        Command::Collections(collections) => match collections {
            CollectionsCommand::List => collections::handle_list(ctx).await,
            CollectionsCommand::Export(args) => collections::handle_export(ctx, args).await,
            CollectionsCommand::Count(args) => collections::handle_count(ctx, args).await,
        },
        Command::Seed(args) => seed::handle_seed(ctx, args).await,
        Command::Roles(roles) => match roles {
            RolesCommand::Ensure(args) => roles::handle_ensure(ctx, args).await,
            RolesCommand::Grant(args) => roles::handle_grant(ctx, args).await,
            RolesCommand::Revoke(args) => roles::handle_revoke(ctx, args).await,
            RolesCommand::Check(args) => roles::handle_check(ctx, args).await,
        },
        Command::Routes(RoutesCommand::Deploy(args)) => routes::handle_deploy(ctx, args).await,
        Command::Workflow(workflows) => match workflows {
            WorkflowCommand::Apply(args) => workflow::handle_apply(ctx, args).await,
            WorkflowCommand::Sync(args) => workflow::handle_sync(ctx, args).await,
            WorkflowCommand::Notify(args) => workflow::handle_notify(ctx, args).await,
        },
        Command::Ui(ui) => match ui {
            UiCommand::AddTable(args) => ui::handle_add_table(ctx, args).await,
            UiCommand::AddMarkdown(args) => ui::handle_add_markdown(ctx, args).await,
        },
    }
}

/// Script label recorded in the action log.
pub(crate) const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Deploy(_) => "deploy",
        Command::Collections(CollectionsCommand::List) => "collections-list",
        Command::Collections(CollectionsCommand::Export(_)) => "collections-export",
        Command::Collections(CollectionsCommand::Count(_)) => "collections-count",
        Command::Seed(_) => "seed",
        Command::Roles(RolesCommand::Ensure(_)) => "roles-ensure",
        Command::Roles(RolesCommand::Grant(_)) => "roles-grant",
        Command::Roles(RolesCommand::Revoke(_)) => "roles-revoke",
        Command::Roles(RolesCommand::Check(_)) => "roles-check",
        Command::Routes(RoutesCommand::Deploy(_)) => "routes-deploy",
        Command::Workflow(WorkflowCommand::Apply(_)) => "workflow-apply",
        Command::Workflow(WorkflowCommand::Sync(_)) => "workflow-sync",
        Command::Workflow(WorkflowCommand::Notify(_)) => "workflow-notify",
        Command::Ui(UiCommand::AddTable(_)) => "ui-add-table",
        Command::Ui(UiCommand::AddMarkdown(_)) => "ui-add-markdown",
    }
}

#[derive(Parser)]
#[command(
    name = "nbops",
    about = "Deploy and maintain NocoBase applications through the REST API"
)]
pub(crate) struct Cli {
    #[arg(long, global = true, help = "API root, e.g. http://localhost:13000/api")]
    api_url: Option<String>,
    #[arg(long, global = true, help = "Bearer token")]
    api_key: Option<String>,
    #[arg(long, global = true, help = "Value for the X-Role header")]
    role: Option<String>,
    #[arg(long, global = true, help = "Request timeout in seconds")]
    timeout: Option<u64>,
    #[arg(long, global = true, help = "Print mutating requests instead of sending them")]
    dry_run: bool,
    #[arg(long, global = true, default_value = ".logs")]
    log_dir: PathBuf,
    #[arg(long, global = true, help = "Do not write the JSONL action log")]
    no_action_log: bool,
    #[arg(long, global = true, help = "Console log format: json or pretty")]
    log_format: Option<String>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Apply a manifest, phase by phase.
    Deploy(DeployArgs),
    #[command(subcommand)]
    Collections(CollectionsCommand),
    /// Load reference data from a manifest.
    Seed(SeedArgs),
    #[command(subcommand)]
    Roles(RolesCommand),
    #[command(subcommand)]
    Routes(RoutesCommand),
    #[command(subcommand)]
    Workflow(WorkflowCommand),
    #[command(subcommand)]
    Ui(UiCommand),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum DeployPhase {
    Collections,
    Fields,
    Seed,
    Roles,
    Routes,
    Workflows,
}

impl DeployPhase {
    /// Every phase, in deployment order.
    pub(crate) const ALL: [Self; 6] = [
        Self::Collections,
        Self::Fields,
        Self::Seed,
        Self::Roles,
        Self::Routes,
        Self::Workflows,
    ];

    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::Collections => "collections",
            Self::Fields => "fields",
            Self::Seed => "seed",
            Self::Roles => "roles",
            Self::Routes => "routes",
            Self::Workflows => "workflows",
        }
    }
}

#[derive(Args)]
pub(crate) struct DeployArgs {
    #[arg(long, help = "Manifest file")]
    pub(crate) config: PathBuf,
    #[arg(long, value_enum, help = "Run only this phase")]
    pub(crate) phase: Option<DeployPhase>,
    #[arg(long, help = "Limit collections, fields and seeds to one collection")]
    pub(crate) collection: Option<String>,
    #[arg(long, help = "Parent route for the navigation tree")]
    pub(crate) parent_id: Option<i64>,
    #[arg(long, help = "Workflow cursor file used to resume interrupted runs")]
    pub(crate) cursor: Option<PathBuf>,
}

#[derive(Subcommand)]
pub(crate) enum CollectionsCommand {
    /// List every collection.
    List,
    /// Write a collection's field definitions to a file.
    Export(ExportArgs),
    /// Count the records of a collection.
    Count(CountArgs),
}

#[derive(Args)]
pub(crate) struct ExportArgs {
    pub(crate) name: String,
    #[arg(long)]
    pub(crate) out: PathBuf,
}

#[derive(Args)]
pub(crate) struct CountArgs {
    pub(crate) collection: String,
}

#[derive(Args)]
pub(crate) struct SeedArgs {
    #[arg(long)]
    pub(crate) config: PathBuf,
    #[arg(long)]
    pub(crate) collection: Option<String>,
}

#[derive(Args)]
pub(crate) struct ManifestArgs {
    #[arg(long)]
    pub(crate) config: PathBuf,
}

#[derive(Subcommand)]
pub(crate) enum RolesCommand {
    /// Create or update the roles in a manifest.
    Ensure(ManifestArgs),
    /// Grant actions on a collection.
    Grant(GrantArgs),
    /// Remove a collection grant.
    Revoke(RevokeArgs),
    /// Report whether a role may perform an action.
    Check(CheckArgs),
}

#[derive(Args)]
pub(crate) struct GrantArgs {
    pub(crate) role: String,
    pub(crate) collection: String,
    #[arg(long, value_delimiter = ',', required = true)]
    pub(crate) actions: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub(crate) fields: Vec<String>,
}

#[derive(Args)]
pub(crate) struct RevokeArgs {
    pub(crate) role: String,
    pub(crate) collection: String,
}

#[derive(Args)]
pub(crate) struct CheckArgs {
    pub(crate) role: String,
    pub(crate) collection: String,
    pub(crate) action: String,
}

#[derive(Subcommand)]
pub(crate) enum RoutesCommand {
    /// Create the navigation tree of a manifest.
    Deploy(RoutesDeployArgs),
}

#[derive(Args)]
pub(crate) struct RoutesDeployArgs {
    #[arg(long)]
    pub(crate) config: PathBuf,
    #[arg(long)]
    pub(crate) parent_id: Option<i64>,
}

#[derive(Subcommand)]
pub(crate) enum WorkflowCommand {
    /// Create the workflows of a manifest.
    Apply(WorkflowApplyArgs),
    /// Copy new records from one collection into another.
    Sync(SyncArgs),
    /// Create a notification for each new record.
    Notify(NotifyArgs),
}

#[derive(Args)]
pub(crate) struct WorkflowApplyArgs {
    #[arg(long)]
    pub(crate) config: PathBuf,
    #[arg(long)]
    pub(crate) cursor: Option<PathBuf>,
}

#[derive(Args)]
pub(crate) struct SyncArgs {
    pub(crate) source: String,
    pub(crate) target: String,
    #[arg(long, help = "Comma-separated field or source:target pairs")]
    pub(crate) mapping: String,
    #[arg(long, default_value = "synced")]
    pub(crate) sync_field: String,
    #[arg(long)]
    pub(crate) cursor: Option<PathBuf>,
}

#[derive(Args)]
pub(crate) struct NotifyArgs {
    pub(crate) collection: String,
    #[arg(long, default_value = "notifications")]
    pub(crate) notify_collection: String,
    #[arg(long, default_value = "title")]
    pub(crate) title_field: String,
    #[arg(long)]
    pub(crate) cursor: Option<PathBuf>,
}

#[derive(Subcommand)]
pub(crate) enum UiCommand {
    /// Append a table block to a page.
    AddTable(AddTableArgs),
    /// Append a markdown block to a page.
    AddMarkdown(AddMarkdownArgs),
}

#[derive(Args)]
pub(crate) struct AddTableArgs {
    #[arg(long)]
    pub(crate) parent_id: i64,
    #[arg(long)]
    pub(crate) page: String,
    #[arg(long)]
    pub(crate) collection: String,
    #[arg(long, value_delimiter = ',', required = true)]
    pub(crate) columns: Vec<String>,
    #[arg(long)]
    pub(crate) title: Option<String>,
}

#[derive(Args)]
pub(crate) struct AddMarkdownArgs {
    #[arg(long)]
    pub(crate) parent_id: i64,
    #[arg(long)]
    pub(crate) page: String,
    #[arg(long)]
    pub(crate) content: String,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("nbops").chain(args.iter().copied()))
    }

    #[test]
    fn global_flags_follow_the_subcommand() -> Result<(), clap::Error> {
        let cli = parse(&[
            "collections",
            "list",
            "--dry-run",
            "--api-url",
            "http://localhost:13000/api",
            "--output",
            "json",
        ])?;
        assert!(cli.dry_run);
        assert_eq!(cli.api_url.as_deref(), Some("http://localhost:13000/api"));
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_dir, PathBuf::from(".logs"));
        assert!(!cli.no_action_log);
        assert_eq!(command_label(&cli.command), "collections-list");
        Ok(())
    }

    #[test]
    fn deploy_accepts_phase_and_collection() -> Result<(), clap::Error> {
        let cli = parse(&[
            "deploy",
            "--config",
            "app.json",
            "--phase",
            "fields",
            "--collection",
            "beds",
        ])?;
        let Command::Deploy(args) = cli.command else {
            panic!("expected deploy");
        };
        assert_eq!(args.phase, Some(DeployPhase::Fields));
        assert_eq!(args.collection.as_deref(), Some("beds"));
        Ok(())
    }

    #[test]
    fn grant_splits_lists() -> Result<(), clap::Error> {
        let cli = parse(&[
            "roles", "grant", "nurse", "beds", "--actions", "view,update", "--fields", "label",
        ])?;
        let Command::Roles(RolesCommand::Grant(args)) = cli.command else {
            panic!("expected roles grant");
        };
        assert_eq!(args.actions, vec!["view", "update"]);
        assert_eq!(args.fields, vec!["label"]);
        Ok(())
    }

    #[test]
    fn unknown_phase_is_rejected() {
        assert!(parse(&["deploy", "--config", "a.json", "--phase", "views"]).is_err());
        assert!(parse(&["roles", "grant", "nurse", "beds"]).is_err());
    }

    #[test]
    fn phases_run_in_dependency_order() {
        let labels: Vec<&str> = DeployPhase::ALL.iter().map(|phase| phase.label()).collect();
        assert_eq!(
            labels,
            vec!["collections", "fields", "seed", "roles", "routes", "workflows"]
        );
    }

    #[test]
    fn logging_reports_the_package_version() {
        let config = logging_config(Some("json"));
        assert_eq!(config.build_sha, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.format, nbops_telemetry::LogFormat::Json);
    }

    #[test]
    fn action_log_can_be_disabled() -> Result<(), clap::Error> {
        let cli = parse(&["collections", "count", "beds", "--no-action-log"])?;
        assert!(cli.no_action_log);
        Ok(())
    }
}
