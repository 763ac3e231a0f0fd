//! `seed`: load reference data.

use nbops_deploy::seed_all;

use crate::cli::{OutputFormat, SeedArgs};
use crate::client::{AppContext, CliResult};
use crate::commands::{finish, read_manifest};
use crate::output::render_tally;

pub(crate) async fn handle_seed(ctx: &AppContext, args: SeedArgs) -> CliResult<()> {
    let manifest = read_manifest(&args.config)?;
    let tally = seed_all(&ctx.api, &manifest.seeds, args.collection.as_deref()).await?;
    match ctx.output {
        OutputFormat::Table => println!("{}", tally.summary()),
        OutputFormat::Json => render_tally("seed", tally, ctx.output)?,
    }
    finish(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{context, manifest_file};
    use nbops_client::Method;
    use nbops_schema::{Manifest, SeedSet};
    use nbops_telemetry::MemoryActionLog;
    use nbops_test_support::RecordingTransport;
    use nbops_test_support::fixtures::areas_seed;
    use std::sync::Arc;

    #[tokio::test]
    async fn collection_flag_limits_seeding() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let manifest = Manifest {
            seeds: vec![
                areas_seed(),
                SeedSet {
                    collection: "beds".into(),
                    unique_field: None,
                    records: areas_seed().records,
                },
            ],
            ..Manifest::default()
        };
        let path = manifest_file(&dir, &manifest)?;
        let recorder = Arc::new(RecordingTransport::new());
        let ctx = context(&recorder, &Arc::new(MemoryActionLog::new()));

        handle_seed(
            &ctx,
            SeedArgs {
                config: path,
                collection: Some("beds".into()),
            },
        )
        .await
        .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        assert_eq!(recorder.calls_to(Method::Post, "beds:create").len(), 2);
        assert!(recorder.calls_to(Method::Post, "areas:create").is_empty());
        Ok(())
    }
}
