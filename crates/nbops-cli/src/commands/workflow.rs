//! `workflow apply|sync|notify`.

use std::path::Path;

use nbops_deploy::apply_all;
use nbops_schema::WorkflowSpec;

use crate::cli::{NotifyArgs, SyncArgs, WorkflowApplyArgs};
use crate::client::{AppContext, CliResult};
use crate::commands::{finish, read_manifest};
use crate::output::render_tally;

async fn apply_specs(ctx: &AppContext, specs: &[WorkflowSpec], cursor: Option<&Path>) -> CliResult<()> {
    let tally = apply_all(&ctx.api, &ctx.ids, specs, cursor).await?;
    render_tally("workflows", tally, ctx.output)?;
    finish(tally)
}

pub(crate) async fn handle_apply(ctx: &AppContext, args: WorkflowApplyArgs) -> CliResult<()> {
    let manifest = read_manifest(&args.config)?;
    apply_specs(ctx, &manifest.workflows, args.cursor.as_deref()).await
}

pub(crate) async fn handle_sync(ctx: &AppContext, args: SyncArgs) -> CliResult<()> {
    let spec = WorkflowSpec::sync(&args.source, &args.target, &args.mapping, &args.sync_field);
    apply_specs(ctx, &[spec], args.cursor.as_deref()).await
}

pub(crate) async fn handle_notify(ctx: &AppContext, args: NotifyArgs) -> CliResult<()> {
    let spec = WorkflowSpec::notify(&args.collection, &args.notify_collection, &args.title_field);
    apply_specs(ctx, &[spec], args.cursor.as_deref()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::context;
    use nbops_client::Method;
    use nbops_telemetry::MemoryActionLog;
    use nbops_test_support::RecordingTransport;
    use std::sync::Arc;

    #[tokio::test]
    async fn sync_preset_creates_two_linked_nodes() -> anyhow::Result<()> {
        let recorder = Arc::new(RecordingTransport::new());
        let log = Arc::new(MemoryActionLog::new());
        let ctx = context(&recorder, &log);

        handle_sync(
            &ctx,
            SyncArgs {
                source: "orders".into(),
                target: "archive".into(),
                mapping: "code,total:amount".into(),
                sync_field: "synced".into(),
                cursor: None,
            },
        )
        .await
        .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        let workflow = recorder.calls_to(Method::Post, "workflows:create");
        let body = workflow[0].body.clone().unwrap_or_default();
        assert_eq!(body["config"]["collection"], "orders");
        assert_eq!(recorder.calls_to(Method::Post, "flow_nodes:create").len(), 2);
        assert_eq!(recorder.calls_to(Method::Post, "flow_nodes:update").len(), 1);
        assert!(log.actions().contains(&"WORKFLOW_CREATED".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn notify_preset_uses_target_collection() -> anyhow::Result<()> {
        let recorder = Arc::new(RecordingTransport::new());
        let ctx = context(&recorder, &Arc::new(MemoryActionLog::new()));

        handle_notify(
            &ctx,
            NotifyArgs {
                collection: "admissions".into(),
                notify_collection: "alerts".into(),
                title_field: "patient".into(),
                cursor: None,
            },
        )
        .await
        .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        let node = recorder.calls_to(Method::Post, "flow_nodes:create")[0]
            .body
            .clone()
            .unwrap_or_default();
        assert_eq!(node["config"]["collection"], "alerts");
        assert_eq!(
            node["config"]["params"]["values"]["title"],
            "{{$context.data.patient}}"
        );
        Ok(())
    }
}
