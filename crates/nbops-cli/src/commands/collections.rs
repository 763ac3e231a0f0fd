//! `collections list|export|count`.

use nbops_config::write_json;
use nbops_deploy::{count_records, export_collection_schema, list_collections};

use crate::cli::{CountArgs, ExportArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_collections, render_count};

pub(crate) async fn handle_list(ctx: &AppContext) -> CliResult<()> {
    let collections = list_collections(&ctx.api).await?;
    render_collections(&collections, ctx.output)
}

pub(crate) async fn handle_export(ctx: &AppContext, args: ExportArgs) -> CliResult<()> {
    let schema = export_collection_schema(&ctx.api, &args.name).await?;
    write_json(&args.out, &schema).map_err(CliError::failure)?;
    println!("exported {} to {}", args.name, args.out.display());
    Ok(())
}

pub(crate) async fn handle_count(ctx: &AppContext, args: CountArgs) -> CliResult<()> {
    let count = count_records(&ctx.api, &args.collection).await?;
    render_count(&args.collection, count, ctx.output)
}
