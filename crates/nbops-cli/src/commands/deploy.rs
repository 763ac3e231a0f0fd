//! `deploy`: apply a manifest phase by phase.

use nbops_deploy::{
    CollectionPhase, Tally, apply_all, deploy_collections, deploy_routes, ensure_roles, seed_all,
};
use tracing::info;

use crate::cli::{DeployArgs, DeployPhase};
use crate::client::{AppContext, CliResult};
use crate::commands::{finish, read_manifest};
use crate::output::render_tally;

pub(crate) async fn handle_deploy(ctx: &AppContext, args: DeployArgs) -> CliResult<()> {
    let manifest = read_manifest(&args.config)?;
    let phases = args
        .phase
        .map_or_else(|| DeployPhase::ALL.to_vec(), |phase| vec![phase]);
    let only = args.collection.as_deref();

    let mut total = Tally::default();
    for phase in phases {
        info!(phase = phase.label(), "phase started");
        let tally = match phase {
            DeployPhase::Collections => {
                deploy_collections(&ctx.api, &manifest.collections, only, CollectionPhase::Collections)
                    .await?
            }
            DeployPhase::Fields => {
                deploy_collections(&ctx.api, &manifest.collections, only, CollectionPhase::Fields)
                    .await?
            }
            DeployPhase::Seed => seed_all(&ctx.api, &manifest.seeds, only).await?,
            DeployPhase::Roles => ensure_roles(&ctx.api, &manifest.roles).await?,
            DeployPhase::Routes => {
                deploy_routes(&ctx.api, &ctx.ids, &manifest.routes, args.parent_id).await?
            }
            DeployPhase::Workflows => {
                apply_all(&ctx.api, &ctx.ids, &manifest.workflows, args.cursor.as_deref()).await?
            }
        };
        render_tally(phase.label(), tally, ctx.output)?;
        total += tally;
    }
    finish(total)
}
