//! `ui add-table|add-markdown`.

use nbops_deploy::add_blocks_to_page;
use nbops_schema::{TableBlockOptions, build_markdown_block, build_table_block};

use crate::cli::{AddMarkdownArgs, AddTableArgs};
use crate::client::{AppContext, CliResult};
use crate::commands::finish;
use crate::output::render_tally;

pub(crate) async fn handle_add_table(ctx: &AppContext, args: AddTableArgs) -> CliResult<()> {
    let options = TableBlockOptions {
        title: args.title.unwrap_or_else(|| args.collection.clone()),
        collection: args.collection,
        columns: args.columns,
        include_export: true,
        include_create: true,
        ..TableBlockOptions::default()
    };
    let block = build_table_block(&ctx.ids, &options);
    let tally = add_blocks_to_page(&ctx.api, &ctx.ids, args.parent_id, &args.page, vec![block]).await?;
    render_tally("ui", tally, ctx.output)?;
    finish(tally)
}

pub(crate) async fn handle_add_markdown(ctx: &AppContext, args: AddMarkdownArgs) -> CliResult<()> {
    let block = build_markdown_block(&args.content);
    let tally = add_blocks_to_page(&ctx.api, &ctx.ids, args.parent_id, &args.page, vec![block]).await?;
    render_tally("ui", tally, ctx.output)?;
    finish(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CliError;
    use crate::commands::tests::context;
    use nbops_client::Method;
    use nbops_telemetry::MemoryActionLog;
    use nbops_test_support::RecordingTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn page_with_grid() -> RecordingTransport {
        RecordingTransport::new()
            .ok(
                Method::Get,
                "desktopRoutes:list",
                json!({ "data": [{ "id": 9, "title": "Beds", "schemaUid": "page-uid" }] }),
            )
            .ok(
                Method::Get,
                "uiSchemas:getProperties/page-uid",
                json!({ "data": { "properties": { "g": { "x-component": "Grid", "x-uid": "grid-uid" } } } }),
            )
    }

    #[tokio::test]
    async fn table_block_lands_in_grid() -> anyhow::Result<()> {
        let recorder = Arc::new(page_with_grid());
        let ctx = context(&recorder, &Arc::new(MemoryActionLog::new()));

        handle_add_table(
            &ctx,
            AddTableArgs {
                parent_id: 3,
                page: "Beds".into(),
                collection: "beds".into(),
                columns: vec!["label".into(), "occupied".into()],
                title: None,
            },
        )
        .await
        .map_err(|err| anyhow::anyhow!(err.display_message()))?;

        let inserts = recorder.calls_to(Method::Post, "uiSchemas:insertAdjacent/grid-uid");
        assert_eq!(inserts.len(), 1);
        let rendered = serde_json::to_string(&inserts[0].body)?;
        assert!(rendered.contains("\"beds:list\""));
        Ok(())
    }

    #[tokio::test]
    async fn missing_page_fails() {
        let recorder = Arc::new(RecordingTransport::new());
        let ctx = context(&recorder, &Arc::new(MemoryActionLog::new()));
        let result = handle_add_markdown(
            &ctx,
            AddMarkdownArgs {
                parent_id: 3,
                page: "Nowhere".into(),
                content: "# hi".into(),
            },
        )
        .await;
        assert!(matches!(result, Err(CliError::Failure(_))));
    }
}
