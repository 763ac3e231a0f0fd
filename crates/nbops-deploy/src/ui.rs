//! Block insertion into existing pages.

use nbops_client::{ApiClient, Transport};
use nbops_schema::{UidGenerator, wrap_in_row};
use serde_json::Value;
use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::report::Tally;
use crate::routes::{find_grid_uid, find_route_by_title, insert_into_grid};

/// Append each block, in its own row, to the page titled `page_title` under
/// `parent_id`.
///
/// # Errors
///
/// Returns [`DeployError::PageNotFound`] or [`DeployError::GridNotFound`] when
/// the target cannot be located, and [`DeployError::Remote`] when a lookup
/// fails or the server becomes unreachable.
pub async fn add_blocks_to_page<T: Transport>(
    client: &ApiClient<T>,
    ids: &UidGenerator,
    parent_id: i64,
    page_title: &str,
    blocks: Vec<Value>,
) -> DeployResult<Tally> {
    let route = find_route_by_title(client, parent_id, page_title)
        .await?
        .ok_or_else(|| DeployError::PageNotFound {
            title: page_title.to_string(),
            parent_id,
        })?;
    let grid_missing = || DeployError::GridNotFound {
        title: page_title.to_string(),
    };
    let page_uid = route.schema_uid.ok_or_else(grid_missing)?;
    let grid_uid = find_grid_uid(client, &page_uid)
        .await?
        .ok_or_else(grid_missing)?;

    let mut tally = Tally::default();
    for block in blocks {
        let row = wrap_in_row(ids, vec![block]);
        let outcome = insert_into_grid(client, &grid_uid, row).await;
        tally.settle("uiSchemas:insertAdjacent", page_title, outcome)?;
    }
    info!(page = page_title, grid = %grid_uid, %tally, "blocks added");
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbops_client::Method;
    use nbops_schema::build_markdown_block;
    use nbops_telemetry::MemoryActionLog;
    use nbops_test_support::RecordingTransport;
    use nbops_test_support::fixtures::fixed_ids;
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

    fn client_for(transport: RecordingTransport) -> ApiClient<RecordingTransport> {
        ApiClient::new(transport, Arc::new(MemoryActionLog::new()), "ui")
    }

    #[tokio::test]
    async fn each_block_gets_its_own_row() -> anyhow::Result<()> {
        let client = client_for(page_with_grid());
        let blocks = vec![build_markdown_block("one"), build_markdown_block("two")];
        let tally = add_blocks_to_page(&client, &fixed_ids(), 4, "Beds", blocks).await?;

        assert_eq!(tally.ok, 2);
        let inserts = client
            .transport()
            .calls_to(Method::Post, "uiSchemas:insertAdjacent/grid-uid");
        assert_eq!(inserts.len(), 2);
        let row = inserts[0]
            .body
            .as_ref()
            .map(|body| body["schema"].clone())
            .unwrap_or_default();
        assert_eq!(row["x-component"], "Grid.Row");
        Ok(())
    }

    #[tokio::test]
    async fn unknown_page_is_reported() {
        let client = client_for(RecordingTransport::new());
        let result =
            add_blocks_to_page(&client, &fixed_ids(), 4, "Beds", vec![build_markdown_block("x")]).await;
        assert!(matches!(
            result,
            Err(DeployError::PageNotFound { parent_id: 4, .. })
        ));
    }

    #[tokio::test]
    async fn page_without_grid_is_reported() {
        let transport = RecordingTransport::new().ok(
            Method::Get,
            "desktopRoutes:list",
            json!({ "data": [{ "id": 9, "title": "Beds", "schemaUid": "page-uid" }] }),
        );
        let client = client_for(transport);
        let result =
            add_blocks_to_page(&client, &fixed_ids(), 4, "Beds", vec![build_markdown_block("x")]).await;
        assert!(matches!(result, Err(DeployError::GridNotFound { .. })));
        assert!(client.transport().mutating_calls().is_empty());
    }
}
