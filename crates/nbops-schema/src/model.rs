//! Desired-state documents loaded from manifests.
//!
//! All types use camelCase on the wire and reject unknown keys so that a
//! misspelled manifest entry fails loudly instead of being ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Complete desired state for one application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Manifest {
    /// Collections with their fields.
    #[serde(default)]
    pub collections: Vec<CollectionSpec>,
    /// Reference data to load.
    #[serde(default)]
    pub seeds: Vec<SeedSet>,
    /// Roles and their grants.
    #[serde(default)]
    pub roles: Vec<RoleSpec>,
    /// Navigation tree.
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
    /// Workflows to create.
    #[serde(default)]
    pub workflows: Vec<WorkflowSpec>,
}

/// One collection (table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CollectionSpec {
    /// Technical name.
    pub name: String,
    /// Display title.
    pub title: String,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Field definitions, created in order.
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// One field of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FieldSpec {
    /// Technical name.
    pub name: String,
    /// Storage type (`string`, `text`, `integer`, `belongsTo`, ...).
    #[serde(rename = "type")]
    pub field_type: String,
    /// Display title.
    pub title: String,
    /// UI interface override; derived from the type when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    /// Whether a value is mandatory.
    #[serde(default)]
    pub required: bool,
    /// Whether values must be unique.
    #[serde(default)]
    pub unique: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// Target collection for relations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Foreign key column for relations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    /// Allowed values; plain strings or `{value, label}` objects.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Value>>,
}

impl FieldSpec {
    /// Field with only the mandatory attributes set.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            title: title.into(),
            interface: None,
            required: false,
            unique: false,
            default_value: None,
            target: None,
            foreign_key: None,
            options: None,
        }
    }
}

/// Records to load into one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeedSet {
    /// Target collection.
    pub collection: String,
    /// Field whose value identifies an existing record; without it every
    /// record is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_field: Option<String>,
    /// Record bodies.
    #[serde(default)]
    pub records: Vec<Map<String, Value>>,
}

/// A role and the resources it may act on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RoleSpec {
    /// Role name.
    pub name: String,
    /// Display title; defaults to the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Global strategy actions (for example `view`, `create`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_actions: Option<Vec<String>>,
    /// Per-collection grants.
    #[serde(default)]
    pub resources: Vec<ResourceGrant>,
}

/// Actions a role may perform on one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResourceGrant {
    /// Collection name.
    pub collection: String,
    /// Allowed actions.
    pub actions: Vec<String>,
    /// Restrict every action to these fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

/// Kind of navigation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    /// Menu folder.
    Group,
    /// Page with a UI schema.
    Page,
    /// External link.
    Link,
}

impl RouteKind {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Page => "page",
            Self::Link => "link",
        }
    }

    /// Menu icon used when none is configured.
    #[must_use]
    pub const fn default_icon(self) -> &'static str {
        match self {
            Self::Group => "FolderOutlined",
            Self::Page | Self::Link => "FileOutlined",
        }
    }
}

/// One node of the navigation tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RouteSpec {
    /// Menu title.
    pub title: String,
    /// Entry kind.
    #[serde(rename = "type")]
    pub kind: RouteKind,
    /// Menu icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Target for links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Markdown shown on a freshly created page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_content: Option<String>,
    /// Nested entries.
    #[serde(default)]
    pub children: Vec<RouteSpec>,
}

impl RouteSpec {
    /// Number of routes in this subtree, including itself.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Self::count).sum::<usize>()
    }
}

/// What triggers a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowKind {
    /// Collection events.
    Collection,
    /// Cron schedule.
    Schedule,
    /// Manual action.
    Action,
}

impl WorkflowKind {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Schedule => "schedule",
            Self::Action => "action",
        }
    }
}

/// Trigger settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TriggerSpec {
    /// Watched collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Event mask: 1 create, 2 update, 4 delete (7 all).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    /// Cron expression for schedules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
}

/// One step of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NodeSpec {
    /// Node type (`create`, `update`, `query`, `condition`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Display title.
    pub title: String,
    /// Collection the node works on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Field assignments for create/update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Map<String, Value>>,
    /// Equality filter for update/query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Map<String, Value>>,
    /// Extra configuration, passed through for other node types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Map<String, Value>>,
}

impl NodeSpec {
    /// Node of `kind` with a title and nothing else.
    #[must_use]
    pub fn new(kind: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            title: title.into(),
            collection: None,
            values: None,
            filter: None,
            config: None,
        }
    }
}

const fn enabled_by_default() -> bool {
    true
}

/// A workflow and its linear chain of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkflowSpec {
    /// Display title.
    pub title: String,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Trigger kind.
    #[serde(rename = "type")]
    pub kind: WorkflowKind,
    /// Trigger settings.
    #[serde(default)]
    pub trigger: TriggerSpec,
    /// Nodes, executed in order.
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    /// Enable after creation.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl WorkflowSpec {
    /// Copy new `source` records into `target` and flag the source record.
    ///
    /// `mapping` is a comma-separated list of `field` or `source:target` pairs.
    #[must_use]
    pub fn sync(source: &str, target: &str, mapping: &str, sync_field: &str) -> Self {
        let mut values = Map::new();
        for pair in mapping.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
            let (from, to) = pair.split_once(':').unwrap_or((pair, pair));
            values.insert(
                to.trim().to_string(),
                Value::String(format!("{{{{$context.data.{}}}}}", from.trim())),
            );
        }
        values.insert("synced_at".to_string(), Value::String("{{$system.now}}".to_string()));

        let mut create = NodeSpec::new("create", format!("Create in {target}"));
        create.collection = Some(target.to_string());
        create.values = Some(values);

        let mut mark = NodeSpec::new("update", "Mark as synchronised");
        mark.collection = Some(source.to_string());
        mark.filter = Some(Map::from_iter([(
            "id".to_string(),
            Value::String("{{$context.data.id}}".to_string()),
        )]));
        mark.values = Some(Map::from_iter([(
            sync_field.to_string(),
            Value::String("true".to_string()),
        )]));

        Self {
            title: format!("Sync: {source} → {target}"),
            description: Some(format!("Copies new {source} records into {target}")),
            kind: WorkflowKind::Collection,
            trigger: TriggerSpec {
                collection: Some(source.to_string()),
                mode: Some(1),
                cron: None,
            },
            nodes: vec![create, mark],
            enabled: true,
        }
    }

    /// Create a notification record whenever `collection` gains a record.
    #[must_use]
    pub fn notify(collection: &str, notify_collection: &str, title_field: &str) -> Self {
        let mut create = NodeSpec::new("create", "Create notification");
        create.collection = Some(notify_collection.to_string());
        create.values = Some(Map::from_iter([
            (
                "title".to_string(),
                Value::String(format!("{{{{$context.data.{title_field}}}}}")),
            ),
            (
                "message".to_string(),
                Value::String(format!("New record created in {collection}")),
            ),
            ("read".to_string(), Value::String("false".to_string())),
            ("createdAt".to_string(), Value::String("{{$system.now}}".to_string())),
        ]));

        Self {
            title: format!("Notify: new {collection}"),
            description: Some(format!("Creates a notification for each new {collection} record")),
            kind: WorkflowKind::Collection,
            trigger: TriggerSpec {
                collection: Some(collection.to_string()),
                mode: Some(1),
                cron: None,
            },
            nodes: vec![create],
            enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn manifest_parses_camel_case_document() -> anyhow::Result<()> {
        let manifest: Manifest = serde_json::from_value(json!({
            "collections": [{
                "name": "areas",
                "title": "Areas",
                "fields": [
                    { "name": "code", "type": "string", "title": "Code", "unique": true },
                    { "name": "kind", "type": "string", "title": "Kind", "enum": ["a", { "value": "b", "label": "B" }] }
                ]
            }],
            "seeds": [{ "collection": "areas", "uniqueField": "code", "records": [{ "code": "A1" }] }],
            "roles": [{ "name": "nurse", "strategyActions": ["view"], "resources": [
                { "collection": "areas", "actions": ["view", "update"], "fields": ["code"] }
            ]}],
            "routes": [{ "title": "Agenda", "type": "group", "children": [
                { "title": "Today", "type": "page", "schemaContent": "# Today" }
            ]}],
            "workflows": [{ "title": "wf", "type": "schedule", "trigger": { "cron": "0 0 * * * *" } }]
        }))?;

        assert_eq!(manifest.collections[0].fields[0].field_type, "string");
        assert!(manifest.collections[0].fields[0].unique);
        assert_eq!(manifest.seeds[0].unique_field.as_deref(), Some("code"));
        assert_eq!(manifest.roles[0].resources[0].fields, Some(vec!["code".to_string()]));
        assert_eq!(manifest.routes[0].count(), 2);
        assert_eq!(manifest.routes[0].children[0].kind, RouteKind::Page);
        assert_eq!(manifest.workflows[0].kind, WorkflowKind::Schedule);
        assert!(manifest.workflows[0].enabled);
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed = serde_json::from_value::<Manifest>(json!({ "collection": [] }));
        assert!(parsed.is_err());
        let parsed = serde_json::from_value::<RoleSpec>(json!({ "name": "r", "strategy": [] }));
        assert!(parsed.is_err());
    }

    #[test]
    fn sync_preset_maps_fields_and_marks_source() {
        let spec = WorkflowSpec::sync("orders", "archive", "code, total:amount", "synced");
        assert_eq!(spec.trigger.collection.as_deref(), Some("orders"));
        let values = spec.nodes[0].values.clone().unwrap_or_default();
        assert_eq!(values.get("code"), Some(&json!("{{$context.data.code}}")));
        assert_eq!(values.get("amount"), Some(&json!("{{$context.data.total}}")));
        assert_eq!(values.get("synced_at"), Some(&json!("{{$system.now}}")));
        assert_eq!(spec.nodes[1].kind, "update");
        assert_eq!(
            spec.nodes[1].filter.clone().unwrap_or_default().get("id"),
            Some(&json!("{{$context.data.id}}"))
        );
    }

    #[test]
    fn notify_preset_targets_notification_collection() {
        let spec = WorkflowSpec::notify("patients", "notifications", "name");
        assert_eq!(spec.nodes.len(), 1);
        assert_eq!(spec.nodes[0].collection.as_deref(), Some("notifications"));
        assert_eq!(
            spec.nodes[0].values.clone().unwrap_or_default().get("title"),
            Some(&json!("{{$context.data.name}}"))
        );
    }
}
