//! Collection and field deployment, listing and schema export.

use nbops_client::{ApiClient, Transport};
use nbops_schema::CollectionSpec;
use serde_json::{Value, json};
use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::report::Tally;

/// Which half of collection deployment to run. Every collection exists
/// before any field is added, so relations can target any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionPhase {
    /// `collections:create` for each collection.
    Collections,
    /// `fields:create` for each field of each collection.
    Fields,
}

/// Body for `collections:create`; fields are added one by one afterwards.
#[must_use]
pub fn collection_payload(spec: &CollectionSpec) -> Value {
    json!({
        "name": spec.name,
        "title": spec.title,
        "description": spec.description.clone().unwrap_or_default(),
        "fields": [],
        "autoGenId": true,
        "createdAt": true,
        "updatedAt": true,
        "createdBy": true,
        "updatedBy": true,
        "sortable": true,
    })
}

/// Create collections and their fields, optionally limited to `only`.
///
/// # Errors
///
/// Returns [`DeployError::Remote`] when the server becomes unreachable.
pub async fn deploy_collections<T: Transport>(
    client: &ApiClient<T>,
    specs: &[CollectionSpec],
    only: Option<&str>,
    phase: CollectionPhase,
) -> DeployResult<Tally> {
    let mut tally = Tally::default();
    for spec in specs.iter().filter(|spec| only.is_none_or(|name| spec.name == name)) {
        match phase {
            CollectionPhase::Collections => {
                info!(collection = %spec.name, fields = spec.fields.len(), "creating collection");
                let outcome = client
                    .post("collections:create", collection_payload(spec))
                    .await;
                tally.settle("collections:create", &spec.name, outcome)?;
            }
            CollectionPhase::Fields => {
                let path = format!("collections/{}/fields:create", spec.name);
                for field in &spec.fields {
                    let outcome = client.post(&path, field.to_payload()).await;
                    let item = format!("{}.{}", spec.name, field.name);
                    tally.settle("fields:create", &item, outcome)?;
                }
            }
        }
    }
    info!(%tally, "collections deployed");
    Ok(tally)
}

/// Every collection known to the server, across all pages.
///
/// # Errors
///
/// Returns [`DeployError::Remote`] when listing fails.
pub async fn list_collections<T: Transport>(client: &ApiClient<T>) -> DeployResult<Vec<Value>> {
    client
        .list_all("collections:list", Some(&json!({ "sort": ["name"] })), None)
        .await
        .map_err(|source| DeployError::remote("collections:list", source))
}

/// Record count of `collection`.
///
/// # Errors
///
/// Returns [`DeployError::Remote`] when the count call fails.
pub async fn count_records<T: Transport>(client: &ApiClient<T>, collection: &str) -> DeployResult<u64> {
    let response = client
        .get_with_retry(&format!("{collection}:count"), None)
        .await
        .map_err(|source| DeployError::remote("count", source))?;
    let data = response.get("data").unwrap_or(&Value::Null);
    Ok(data
        .get("count")
        .and_then(Value::as_u64)
        .or_else(|| data.as_u64())
        .unwrap_or_default())
}

/// Portable description of `name`: `{name, title, fields: [...]}`.
///
/// # Errors
///
/// Returns [`DeployError::Remote`] when the collection cannot be fetched.
pub async fn export_collection_schema<T: Transport>(
    client: &ApiClient<T>,
    name: &str,
) -> DeployResult<Value> {
    let response = client
        .get_with_retry(
            "collections:get",
            Some(&json!({ "filterByTk": name, "appends": ["fields"] })),
        )
        .await
        .map_err(|source| DeployError::remote("collections:get", source))?;
    let schema = response.get("data").cloned().unwrap_or(Value::Null);
    if schema.is_null() {
        return Err(DeployError::remote(
            "collections:get",
            nbops_client::RemoteError::NotFound {
                message: format!("collection '{name}' does not exist"),
            },
        ));
    }

    let fields: Vec<Value> = schema
        .get("fields")
        .and_then(Value::as_array)
        .map(|fields| fields.iter().map(export_field).collect())
        .unwrap_or_default();

    Ok(json!({
        "name": schema.get("name").cloned().unwrap_or_else(|| json!(name)),
        "title": schema.get("title").cloned().unwrap_or(Value::Null),
        "fields": fields,
    }))
}

fn export_field(field: &Value) -> Value {
    let title = field
        .pointer("/uiSchema/title")
        .or_else(|| field.get("title"))
        .cloned()
        .unwrap_or(Value::Null);
    let mut exported = json!({
        "name": field.get("name").cloned().unwrap_or(Value::Null),
        "type": field.get("type").cloned().unwrap_or(Value::Null),
        "interface": field.get("interface").cloned().unwrap_or(Value::Null),
        "title": title,
        "required": field.get("required").and_then(Value::as_bool).unwrap_or(false),
        "unique": field.get("unique").and_then(Value::as_bool).unwrap_or(false),
    });
    for key in ["defaultValue", "target", "foreignKey"] {
        if let Some(value) = field.get(key).filter(|value| !value.is_null()) {
            exported[key] = value.clone();
        }
    }
    exported
}
