//! `routes deploy`.

use nbops_deploy::deploy_routes;

use crate::cli::RoutesDeployArgs;
use crate::client::{AppContext, CliResult};
use crate::commands::{finish, read_manifest};
use crate::output::render_tally;

pub(crate) async fn handle_deploy(ctx: &AppContext, args: RoutesDeployArgs) -> CliResult<()> {
    let manifest = read_manifest(&args.config)?;
    let planned: usize = manifest.routes.iter().map(nbops_schema::RouteSpec::count).sum();
    tracing::info!(routes = planned, parent_id = ?args.parent_id, "deploying navigation");
    let tally = deploy_routes(&ctx.api, &ctx.ids, &manifest.routes, args.parent_id).await?;
    render_tally("routes", tally, ctx.output)?;
    finish(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{context, manifest_file};
    use nbops_client::Method;
    use nbops_schema::Manifest;
    use nbops_telemetry::MemoryActionLog;
    use nbops_test_support::RecordingTransport;
    use nbops_test_support::fixtures::route_tree;
    use std::sync::Arc;

    #[tokio::test]
    async fn tree_lands_under_parent() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let manifest = Manifest {
            routes: vec![route_tree()],
            ..Manifest::default()
        };
        let path = manifest_file(&dir, &manifest)?;
        let recorder = Arc::new(RecordingTransport::new());
        let ctx = context(&recorder, &Arc::new(MemoryActionLog::new()));

        handle_deploy(
            &ctx,
            RoutesDeployArgs {
                config: path,
                parent_id: Some(40),
            },
        )
        .await
        .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        let creates = recorder.calls_to(Method::Post, "desktopRoutes:create");
        assert_eq!(creates.len(), 3);
        assert_eq!(
            creates[0].body.as_ref().map(|body| body["parentId"].clone()),
            Some(serde_json::json!(40))
        );
        Ok(())
    }
}
