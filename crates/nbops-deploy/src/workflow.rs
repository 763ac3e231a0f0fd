//! Workflow creation as a restartable saga.
//!
//! # Design
//! - Every payload is built up front by [`WorkflowPlan::from_spec`]; applying
//!   a plan only fills in server-assigned ids.
//! - A [`SagaCursor`] records each confirmed step. Applying a plan with a
//!   cursor issues only the steps after the last confirmed one, so a run
//!   that died half way can be resumed without duplicating objects.
//! - Dry runs return no ids; steps still go out (and are logged) but the
//!   cursor is left untouched.

use std::collections::BTreeMap;
use std::path::Path;

use nbops_client::{ApiClient, ApiRequest, Transport, is_dry_run_payload};
use nbops_config::{load_manifest, write_json};
use nbops_schema::{NodeSpec, UidGenerator, WorkflowKind, WorkflowSpec, assign_form_schema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::info;

use crate::created_id;
use crate::error::{DeployError, DeployResult};
use crate::report::Tally;

const DEFAULT_SCHEDULE: &str = "0 */5 * * * *";
const DEFAULT_QUERY_PAGE_SIZE: u64 = 20;

/// Every payload needed to create one workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowPlan {
    /// Workflow title, also the cursor key.
    pub title: String,
    /// Trigger kind.
    pub kind: WorkflowKind,
    /// Body for `workflows:create`.
    pub workflow: Value,
    /// Bodies for `flow_nodes:create`, without workflow or upstream ids.
    pub nodes: Vec<Value>,
    /// Whether to enable the workflow once its nodes are linked.
    pub enable: bool,
}

impl WorkflowPlan {
    /// Build the plan for `spec`.
    #[must_use]
    pub fn from_spec(ids: &UidGenerator, spec: &WorkflowSpec) -> Self {
        let mut workflow = json!({
            "title": spec.title,
            "type": spec.kind.as_str(),
            "enabled": false,
            "description": spec.description.clone().unwrap_or_default(),
        });
        match spec.kind {
            WorkflowKind::Collection => {
                workflow["config"] = json!({
                    "collection": spec.trigger.collection,
                    "mode": spec.trigger.mode.filter(|mode| *mode > 0).unwrap_or(1),
                    "changed": [],
                });
            }
            WorkflowKind::Schedule => {
                workflow["config"] = json!({
                    "cron": spec.trigger.cron.as_deref().unwrap_or(DEFAULT_SCHEDULE),
                    "mode": 0,
                });
            }
            WorkflowKind::Action => {}
        }

        let nodes = spec.nodes.iter().map(|node| node_payload(ids, node)).collect();
        Self {
            title: spec.title.clone(),
            kind: spec.kind,
            workflow,
            nodes,
            enable: spec.enabled,
        }
    }
}

fn config_value(node: &NodeSpec, key: &str) -> Option<Value> {
    node.config
        .as_ref()
        .and_then(|config| config.get(key))
        .filter(|value| !value.is_null())
        .cloned()
}

fn node_payload(ids: &UidGenerator, node: &NodeSpec) -> Value {
    let mut payload = json!({
        "key": ids.next("node"),
        "type": node.kind,
        "title": node.title,
    });
    let config = match node.kind.as_str() {
        "create" | "update" => {
            let values = node.values.clone().unwrap_or_default();
            let fields: Vec<String> = values.keys().cloned().collect();
            let collection = node.collection.clone().unwrap_or_default();
            let mut config = json!({
                "collection": collection,
                "params": { "values": values, "individualHooks": false },
                "assignFormSchema": assign_form_schema(ids, &collection, &fields),
                "usingAssignFormSchema": true,
            });
            if node.kind == "update"
                && let Some(filter) = node.filter.as_ref().filter(|filter| !filter.is_empty())
            {
                config["params"]["filter"] = equality_filter(filter);
            }
            Some(config)
        }
        "query" => Some(json!({
            "collection": node.collection,
            "params": {
                "filter": node.filter.clone().unwrap_or_default(),
                "appends": [],
                "pageSize": config_value(node, "pageSize").unwrap_or_else(|| json!(DEFAULT_QUERY_PAGE_SIZE)),
            },
        })),
        "condition" => Some(json!({
            "calculation": config_value(node, "calculation").unwrap_or_else(|| json!("true")),
            "rejectOnFalse": config_value(node, "rejectOnFalse").unwrap_or(Value::Bool(false)),
        })),
        _ => node.config.clone().map(Value::Object),
    };
    if let Some(config) = config {
        payload["config"] = config;
    }
    payload
}

fn equality_filter(filter: &Map<String, Value>) -> Value {
    let clauses: Vec<Value> = filter
        .iter()
        .map(|(field, value)| {
            let mut clause = Map::new();
            clause.insert(field.clone(), json!({ "$eq": value }));
            Value::Object(clause)
        })
        .collect();
    json!({ "$and": clauses })
}

/// Confirmed progress of one workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaCursor {
    /// Id of the created workflow.
    #[serde(default)]
    pub workflow_id: Option<i64>,
    /// Ids of created nodes, in plan order.
    #[serde(default)]
    pub node_ids: Vec<i64>,
    /// Number of `downstreamId` links confirmed.
    #[serde(default)]
    pub linked: usize,
    /// Whether the workflow has been enabled.
    #[serde(default)]
    pub enabled: bool,
}

impl SagaCursor {
    /// Whether every step of `plan` is confirmed.
    #[must_use]
    pub fn is_complete(&self, plan: &WorkflowPlan) -> bool {
        self.workflow_id.is_some()
            && self.node_ids.len() >= plan.nodes.len()
            && self.linked + 1 >= plan.nodes.len()
            && (self.enabled || !plan.enable)
    }
}

/// Cursors keyed by workflow title, stored as one JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CursorBook {
    cursors: BTreeMap<String, SagaCursor>,
}

impl CursorBook {
    /// Read `path`; a missing file yields an empty book.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Cursor`] when the file exists but cannot be parsed.
    pub fn load(path: &Path) -> DeployResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        load_manifest(path).map_err(|source| DeployError::Cursor {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the book to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Cursor`] when the file cannot be written.
    pub fn save(&self, path: &Path) -> DeployResult<()> {
        write_json(path, self).map_err(|source| DeployError::Cursor {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Cursor for `title`, if one was recorded.
    #[must_use]
    pub fn get(&self, title: &str) -> Option<&SagaCursor> {
        self.cursors.get(title)
    }

    /// Cursor for `title`, created empty when absent.
    pub fn cursor_mut(&mut self, title: &str) -> &mut SagaCursor {
        self.cursors.entry(title.to_string()).or_default()
    }
}

fn confirmed(payload: &Value, operation: &'static str) -> DeployResult<Option<i64>> {
    match created_id(payload) {
        Some(id) => Ok(Some(id)),
        None if is_dry_run_payload(payload) => Ok(None),
        None => Err(DeployError::MissingId { operation }),
    }
}

/// Issue the steps of `plan` that `cursor` has not confirmed yet.
///
/// Returns the workflow id (`None` in a dry run).
///
/// # Errors
///
/// Returns [`DeployError::Remote`] on the first failed step, leaving
/// `cursor` at the last confirmed one.
pub async fn apply<T: Transport>(
    client: &ApiClient<T>,
    plan: &WorkflowPlan,
    cursor: &mut SagaCursor,
) -> DeployResult<Option<i64>> {
    let workflow_id = match cursor.workflow_id {
        Some(id) => Some(id),
        None => {
            let payload = client
                .post("workflows:create", plan.workflow.clone())
                .await
                .map_err(|source| DeployError::remote("workflows:create", source))?;
            let id = confirmed(&payload, "workflows:create")?;
            cursor.workflow_id = id;
            id
        }
    };
    info!(workflow = %plan.title, id = ?workflow_id, "workflow ready");

    let mut node_ids: Vec<Option<i64>> = cursor.node_ids.iter().copied().map(Some).collect();
    for (index, node) in plan.nodes.iter().enumerate() {
        let upstream = index.checked_sub(1).and_then(|previous| node_ids[previous]);

        if index >= node_ids.len() {
            let mut body = node.clone();
            body["workflowId"] = json!(workflow_id);
            if let Some(upstream) = upstream {
                body["upstreamId"] = json!(upstream);
            }
            let payload = client
                .post("flow_nodes:create", body)
                .await
                .map_err(|source| DeployError::remote("flow_nodes:create", source))?;
            let id = confirmed(&payload, "flow_nodes:create")?;
            if let Some(id) = id {
                cursor.node_ids.push(id);
            }
            node_ids.push(id);
        }

        if index > 0 && cursor.linked < index {
            let current = node_ids[index];
            client
                .request(
                    ApiRequest::post("flow_nodes:update", json!({ "downstreamId": current }))
                        .with_param("filterByTk", json!(upstream)),
                )
                .await
                .map_err(|source| DeployError::remote("flow_nodes:update", source))?;
            if upstream.is_some() && current.is_some() {
                cursor.linked = index;
            }
        }
    }

    if plan.enable && !cursor.enabled {
        client
            .request(
                ApiRequest::post("workflows:update", json!({ "enabled": true }))
                    .with_param("filterByTk", json!(workflow_id)),
            )
            .await
            .map_err(|source| DeployError::remote("workflows:update", source))?;
        cursor.enabled = workflow_id.is_some();
    }

    client.log_action(
        "WORKFLOW_CREATED",
        json!({
            "workflowId": workflow_id,
            "title": plan.title,
            "type": plan.kind.as_str(),
            "nodes": plan.nodes.len(),
        }),
    );
    Ok(workflow_id)
}

/// Apply every workflow, resuming from the cursor file at `cursor_path`.
///
/// The cursor file is rewritten after each workflow, whether it finished or
/// not. A failed step is settled like any other item: a workflow that
/// already exists is skipped, one rejected by the server is counted as
/// failed, and the run moves on.
///
/// # Errors
///
/// Returns [`DeployError::Cursor`] when the cursor file is unusable, and
/// [`DeployError::Remote`] when the server becomes unreachable.
pub async fn apply_all<T: Transport>(
    client: &ApiClient<T>,
    ids: &UidGenerator,
    specs: &[WorkflowSpec],
    cursor_path: Option<&Path>,
) -> DeployResult<Tally> {
    let mut book = match cursor_path {
        Some(path) => CursorBook::load(path)?,
        None => CursorBook::default(),
    };
    let mut tally = Tally::default();

    for spec in specs {
        let plan = WorkflowPlan::from_spec(ids, spec);
        let cursor = book.cursor_mut(&plan.title);
        if cursor.is_complete(&plan) {
            info!(workflow = %plan.title, "already applied, skipped");
            tally.skipped += 1;
            continue;
        }
        let outcome = apply(client, &plan, cursor).await;
        if let Some(path) = cursor_path {
            book.save(path)?;
        }
        match outcome {
            Ok(_) => tally.ok += 1,
            Err(DeployError::Remote { operation, source }) => {
                tally.settle::<()>(operation, &plan.title, Err(source))?;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(tally)
}
