//! Navigation routes: tree deployment, page creation and lookups.

use nbops_client::{ApiClient, ApiRequest, Transport, is_dry_run_payload};
use nbops_schema::{RouteKind, RouteSpec, UidGenerator, page_schema, placeholder_page_schema};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::created_id;
use crate::error::{DeployError, DeployResult};
use crate::report::Tally;

/// A page created by [`create_page`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPage {
    /// Route id; `None` when the write was suppressed by a dry run.
    pub route_id: Option<i64>,
    /// `x-uid` of the page schema.
    pub page_uid: String,
    /// `x-uid` of the grid that receives blocks.
    pub grid_uid: String,
}

/// A route found by [`find_route_by_title`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteLookup {
    /// Route id.
    pub id: i64,
    /// Page schema uid, when the route has one.
    pub schema_uid: Option<String>,
}

fn route_body(route: &RouteSpec, parent_id: Option<i64>) -> Value {
    let icon = route
        .icon
        .clone()
        .unwrap_or_else(|| route.kind.default_icon().to_string());
    let mut body = json!({
        "title": route.title,
        "type": route.kind.as_str(),
        "icon": icon,
        "parentId": parent_id,
        "hideInMenu": false,
    });
    if let Some(url) = &route.url {
        body["url"] = json!(url);
    }
    body
}

/// Deploy a route tree depth first under `parent_id` (top level when `None`).
///
/// Every page gets one placeholder schema that is linked back to its route.
/// A route that fails to create is counted and its subtree is skipped.
///
/// # Errors
///
/// Returns [`DeployError::Remote`] when the server becomes unreachable and
/// [`DeployError::MissingId`] when a live create returns no id.
pub async fn deploy_routes<T: Transport>(
    client: &ApiClient<T>,
    ids: &UidGenerator,
    routes: &[RouteSpec],
    parent_id: Option<i64>,
) -> DeployResult<Tally> {
    let mut tally = Tally::default();
    let mut pending: Vec<(&RouteSpec, Option<i64>)> =
        routes.iter().rev().map(|route| (route, parent_id)).collect();

    while let Some((route, parent)) = pending.pop() {
        let outcome = client
            .post("desktopRoutes:create", route_body(route, parent))
            .await;
        let Some(payload) = tally.settle("desktopRoutes:create", &route.title, outcome)? else {
            if !route.children.is_empty() {
                warn!(route = %route.title, children = route.children.len(), "subtree skipped");
            }
            continue;
        };
        let id = created_id(&payload);
        if id.is_none() && !is_dry_run_payload(&payload) {
            return Err(DeployError::MissingId {
                operation: "desktopRoutes:create",
            });
        }
        info!(route = %route.title, kind = route.kind.as_str(), id = ?id, "route created");

        if route.kind == RouteKind::Page {
            attach_placeholder(client, ids, route, id, &mut tally).await?;
        }
        pending.extend(route.children.iter().rev().map(|child| (child, id)));
    }
    Ok(tally)
}

async fn attach_placeholder<T: Transport>(
    client: &ApiClient<T>,
    ids: &UidGenerator,
    route: &RouteSpec,
    route_id: Option<i64>,
    tally: &mut Tally,
) -> DeployResult<()> {
    let schema = placeholder_page_schema(ids, &route.title, route.schema_content.as_deref());
    let generated = schema
        .get("x-uid")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default();
    let outcome = client.post("uiSchemas:insert", schema).await;
    let Some(inserted) = tally.settle("uiSchemas:insert", &route.title, outcome)? else {
        return Ok(());
    };
    let schema_uid = inserted
        .pointer("/data/x-uid")
        .and_then(Value::as_str)
        .map_or(generated, str::to_string);

    if let Some(id) = route_id {
        let outcome = client
            .request(
                ApiRequest::post("desktopRoutes:update", json!({ "schemaUid": schema_uid }))
                    .with_param("filterByTk", id),
            )
            .await;
        tally.settle("desktopRoutes:update", &route.title, outcome)?;
    }
    Ok(())
}

/// Create a page route with a hidden tab and an empty block grid.
///
/// # Errors
///
/// Returns [`DeployError::Remote`] when either call fails and
/// [`DeployError::MissingId`] when a live create returns no id.
pub async fn create_page<T: Transport>(
    client: &ApiClient<T>,
    ids: &UidGenerator,
    parent_id: Option<i64>,
    title: &str,
) -> DeployResult<CreatedPage> {
    let skeleton = page_schema(ids, None);
    let payload = client
        .post(
            "desktopRoutes:create",
            json!({
                "type": "page",
                "title": title,
                "parentId": parent_id,
                "schemaUid": skeleton.page_uid,
                "menuSchemaUid": skeleton.menu_uid,
                "enableTabs": false,
                "children": [{
                    "type": "tabs",
                    "schemaUid": skeleton.grid_uid,
                    "tabSchemaName": skeleton.grid_name,
                    "hidden": true,
                }],
            }),
        )
        .await
        .map_err(|source| DeployError::remote("desktopRoutes:create", source))?;
    let route_id = created_id(&payload);
    if route_id.is_none() && !is_dry_run_payload(&payload) {
        return Err(DeployError::MissingId {
            operation: "desktopRoutes:create",
        });
    }

    client
        .post("uiSchemas:insert", skeleton.schema)
        .await
        .map_err(|source| DeployError::remote("uiSchemas:insert", source))?;

    info!(title, route_id = ?route_id, grid = %skeleton.grid_uid, "page created");
    Ok(CreatedPage {
        route_id,
        page_uid: skeleton.page_uid,
        grid_uid: skeleton.grid_uid,
    })
}

/// Create a menu group and return its id.
///
/// # Errors
///
/// Returns [`DeployError::Remote`] when the call fails.
pub async fn create_group<T: Transport>(
    client: &ApiClient<T>,
    parent_id: Option<i64>,
    title: &str,
) -> DeployResult<Option<i64>> {
    let payload = client
        .post(
            "desktopRoutes:create",
            json!({ "type": "group", "title": title, "parentId": parent_id, "hidden": false }),
        )
        .await
        .map_err(|source| DeployError::remote("desktopRoutes:create", source))?;
    let id = created_id(&payload);
    info!(title, id = ?id, "group created");
    Ok(id)
}

/// Find a direct child of `parent_id` by title.
///
/// # Errors
///
/// Returns [`DeployError::Remote`] when the listing fails.
pub async fn find_route_by_title<T: Transport>(
    client: &ApiClient<T>,
    parent_id: i64,
    title: &str,
) -> DeployResult<Option<RouteLookup>> {
    let payload = client
        .get(
            "desktopRoutes:list",
            Some(&json!({ "filter": { "parentId": parent_id }, "pageSize": 100 })),
        )
        .await
        .map_err(|source| DeployError::remote("desktopRoutes:list", source))?;
    let found = payload
        .get("data")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|route| route.get("title").and_then(Value::as_str) == Some(title))
        .and_then(|route| {
            Some(RouteLookup {
                id: route.get("id").and_then(Value::as_i64)?,
                schema_uid: route
                    .get("schemaUid")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        });
    Ok(found)
}

/// Find the `x-uid` of the block grid directly under a page schema.
///
/// # Errors
///
/// Returns [`DeployError::Remote`] when the schema cannot be read.
pub async fn find_grid_uid<T: Transport>(
    client: &ApiClient<T>,
    page_uid: &str,
) -> DeployResult<Option<String>> {
    let payload = client
        .get(&format!("uiSchemas:getProperties/{page_uid}"), None)
        .await
        .map_err(|source| DeployError::remote("uiSchemas:getProperties", source))?;
    let grid = payload
        .pointer("/data/properties")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|properties| properties.values())
        .filter(|node| node.get("x-component").and_then(Value::as_str) == Some("Grid"))
        .find_map(|node| node.get("x-uid").and_then(Value::as_str))
        .map(str::to_string);
    Ok(grid)
}

/// Append `schema` as the last child of a grid.
///
/// # Errors
///
/// Returns the transport's error unchanged.
pub async fn insert_into_grid<T: Transport>(
    client: &ApiClient<T>,
    grid_uid: &str,
    schema: Value,
) -> nbops_client::RemoteResult<Value> {
    client
        .request(
            ApiRequest::post(
                format!("uiSchemas:insertAdjacent/{grid_uid}"),
                json!({ "schema": schema }),
            )
            .with_param("position", "beforeEnd"),
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbops_client::{DryRunTransport, Method, RemoteError};
    use nbops_telemetry::MemoryActionLog;
    use nbops_test_support::RecordingTransport;
    use nbops_test_support::fixtures::{fixed_ids, route_tree};
    use std::sync::Arc;

    fn client_for(transport: RecordingTransport) -> ApiClient<RecordingTransport> {
        ApiClient::new(transport, Arc::new(MemoryActionLog::new()), "routes")
    }

    #[tokio::test]
    async fn tree_is_created_depth_first_and_pages_linked() -> anyhow::Result<()> {
        let client = client_for(RecordingTransport::new());
        let tally = deploy_routes(&client, &fixed_ids(), &[route_tree()], None).await?;

        let recorder = client.transport();
        assert_eq!(
            recorder.call_log(),
            vec![
                "POST desktopRoutes:create",
                "POST desktopRoutes:create",
                "POST uiSchemas:insert",
                "POST desktopRoutes:update",
                "POST desktopRoutes:create",
            ]
        );
        assert_eq!(tally.ok, 5);

        let creates = recorder.calls_to(Method::Post, "desktopRoutes:create");
        let group = creates[0].body.clone().unwrap_or_default();
        assert_eq!(group["icon"], "FolderOutlined");
        assert_eq!(group["parentId"], Value::Null);
        assert_eq!(group["hideInMenu"], false);
        let page = creates[1].body.clone().unwrap_or_default();
        assert_eq!(page["parentId"], 1);
        assert_eq!(page["icon"], "CalendarOutlined");
        let link = creates[2].body.clone().unwrap_or_default();
        assert_eq!(link["type"], "link");
        assert_eq!(link["parentId"], 1);
        assert_eq!(link["url"], "https://example.org/handbook");

        let inserted = recorder.calls_to(Method::Post, "uiSchemas:insert")[0]
            .body
            .clone()
            .unwrap_or_default();
        let markdown = inserted
            .pointer("/properties/grid/properties/row1/properties/col1/properties/card/properties/markdown/x-component-props/content")
            .cloned();
        assert_eq!(markdown, Some(json!("# Today")));

        let update = &recorder.calls_to(Method::Post, "desktopRoutes:update")[0];
        assert_eq!(update.query.get("filterByTk"), Some(&json!(2)));
        assert_eq!(
            update.body.as_ref().map(|body| body["schemaUid"].clone()),
            Some(inserted["x-uid"].clone())
        );
        Ok(())
    }

    #[tokio::test]
    async fn dry_run_still_walks_children() -> anyhow::Result<()> {
        let recorder = Arc::new(RecordingTransport::new());
        let log = Arc::new(MemoryActionLog::new());
        let client = ApiClient::new(DryRunTransport::new(recorder.clone()), log.clone(), "routes");
        let tally = deploy_routes(&client, &fixed_ids(), &[route_tree()], None).await?;

        assert!(recorder.mutating_calls().is_empty());
        assert_eq!(tally.ok, 4);
        assert_eq!(log.records().len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn failed_parent_skips_its_subtree() -> anyhow::Result<()> {
        let transport = RecordingTransport::new().on(
            Method::Post,
            "desktopRoutes:create",
            Err(RemoteError::Validation {
                status: 400,
                message: "title required".into(),
            }),
        );
        let client = client_for(transport);
        let tally = deploy_routes(&client, &fixed_ids(), &[route_tree()], Some(7)).await?;
        assert_eq!(tally, Tally { ok: 0, skipped: 0, failed: 1 });
        assert_eq!(client.transport().calls().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn live_create_without_id_is_an_error() {
        let client = client_for(RecordingTransport::new().ok(
            Method::Post,
            "desktopRoutes:create",
            json!({ "data": {} }),
        ));
        let result = deploy_routes(&client, &fixed_ids(), &[route_tree()], None).await;
        assert!(matches!(result, Err(DeployError::MissingId { .. })));
    }

    #[tokio::test]
    async fn create_page_links_tab_to_grid() -> anyhow::Result<()> {
        let client = client_for(RecordingTransport::new());
        let page = create_page(&client, &fixed_ids(), Some(4), "Beds").await?;
        assert_eq!(page.route_id, Some(1));

        let recorder = client.transport();
        let route = recorder.calls_to(Method::Post, "desktopRoutes:create")[0]
            .body
            .clone()
            .unwrap_or_default();
        assert_eq!(route["schemaUid"], page.page_uid.as_str());
        assert_eq!(route["children"][0]["type"], "tabs");
        assert_eq!(route["children"][0]["schemaUid"], page.grid_uid.as_str());
        assert_eq!(route["children"][0]["hidden"], true);

        let schema = recorder.calls_to(Method::Post, "uiSchemas:insert")[0]
            .body
            .clone()
            .unwrap_or_default();
        assert_eq!(schema["x-uid"], page.page_uid.as_str());
        Ok(())
    }

    #[tokio::test]
    async fn create_group_returns_new_id() -> anyhow::Result<()> {
        let client = client_for(RecordingTransport::new());
        assert_eq!(create_group(&client, None, "Admin").await?, Some(1));
        let body = client.transport().calls()[0].body.clone().unwrap_or_default();
        assert_eq!(body["type"], "group");
        assert_eq!(body["hidden"], false);
        Ok(())
    }

    #[tokio::test]
    async fn lookups_find_route_and_grid() -> anyhow::Result<()> {
        let transport = RecordingTransport::new()
            .ok(
                Method::Get,
                "desktopRoutes:list",
                json!({ "data": [
                    { "id": 3, "title": "Other", "schemaUid": "x" },
                    { "id": 9, "title": "Beds", "schemaUid": "page-uid" }
                ]}),
            )
            .ok(
                Method::Get,
                "uiSchemas:getProperties/page-uid",
                json!({ "data": { "properties": {
                    "header": { "x-component": "PageHeader", "x-uid": "h" },
                    "body": { "x-component": "Grid", "x-uid": "grid-uid" }
                }}}),
            );
        let client = client_for(transport);

        let route = find_route_by_title(&client, 5, "Beds").await?;
        assert_eq!(
            route,
            Some(RouteLookup {
                id: 9,
                schema_uid: Some("page-uid".into())
            })
        );
        assert!(find_route_by_title(&client, 5, "Missing").await?.is_none());
        let listed = &client.transport().calls_to(Method::Get, "desktopRoutes:list")[0];
        assert_eq!(listed.query.get("filter"), Some(&json!({ "parentId": 5 })));
        assert_eq!(listed.query.get("pageSize"), Some(&json!(100)));

        assert_eq!(find_grid_uid(&client, "page-uid").await?.as_deref(), Some("grid-uid"));
        Ok(())
    }

    #[tokio::test]
    async fn insert_appends_to_grid() -> anyhow::Result<()> {
        let client = client_for(RecordingTransport::new());
        insert_into_grid(&client, "grid-uid", json!({ "type": "void" })).await?;
        let call = &client.transport().calls()[0];
        assert_eq!(call.path, "uiSchemas:insertAdjacent/grid-uid");
        assert_eq!(call.query.get("position"), Some(&json!("beforeEnd")));
        assert_eq!(call.body, Some(json!({ "schema": { "type": "void" } })));
        Ok(())
    }
}
