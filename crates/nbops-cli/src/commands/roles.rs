//! `roles ensure|grant|revoke|check`.

use nbops_deploy::{check_permission, ensure_roles, grant_resources, revoke_resource};
use nbops_schema::ResourceGrant;

use crate::cli::{CheckArgs, GrantArgs, ManifestArgs, RevokeArgs};
use crate::client::{AppContext, CliResult};
use crate::commands::{finish, read_manifest};
use crate::output::{render_permission, render_tally};

pub(crate) async fn handle_ensure(ctx: &AppContext, args: ManifestArgs) -> CliResult<()> {
    let manifest = read_manifest(&args.config)?;
    let tally = ensure_roles(&ctx.api, &manifest.roles).await?;
    render_tally("roles", tally, ctx.output)?;
    finish(tally)
}

pub(crate) async fn handle_grant(ctx: &AppContext, args: GrantArgs) -> CliResult<()> {
    let grant = ResourceGrant {
        collection: args.collection,
        actions: args.actions,
        fields: (!args.fields.is_empty()).then_some(args.fields),
    };
    let tally = grant_resources(&ctx.api, &args.role, &[grant]).await?;
    render_tally("grant", tally, ctx.output)?;
    finish(tally)
}

pub(crate) async fn handle_revoke(ctx: &AppContext, args: RevokeArgs) -> CliResult<()> {
    revoke_resource(&ctx.api, &args.role, &args.collection).await?;
    println!("revoked {} on {}", args.role, args.collection);
    Ok(())
}

pub(crate) async fn handle_check(ctx: &AppContext, args: CheckArgs) -> CliResult<()> {
    let check = check_permission(&ctx.api, &args.role, &args.collection, &args.action).await?;
    render_permission(&check, ctx.output)
}
