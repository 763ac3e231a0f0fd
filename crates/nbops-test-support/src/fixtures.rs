//! Sample desired state shared by orchestration tests.

use nbops_schema::{
    CollectionSpec, FieldSpec, NodeSpec, ResourceGrant, RoleSpec, RouteKind, RouteSpec, SeedSet,
    TriggerSpec, UidGenerator, WorkflowKind, WorkflowSpec,
};
use serde_json::{Map, Value, json};

/// Identifier generator with a fixed seed.
#[must_use]
pub fn fixed_ids() -> UidGenerator {
    UidGenerator::with_seed("fixture-seed")
}

/// `areas` collection with a unique code and a relation.
#[must_use]
pub fn areas_collection() -> CollectionSpec {
    let mut code = FieldSpec::new("code", "string", "Code");
    code.unique = true;
    code.required = true;
    let mut parent = FieldSpec::new("parent", "belongsTo", "Parent");
    parent.target = Some("areas".into());
    parent.foreign_key = Some("parent_id".into());
    CollectionSpec {
        name: "areas".into(),
        title: "Areas".into(),
        description: Some("Hospital areas".into()),
        fields: vec![code, FieldSpec::new("name", "string", "Name"), parent],
    }
}

/// `beds` collection with two plain fields.
#[must_use]
pub fn beds_collection() -> CollectionSpec {
    CollectionSpec {
        name: "beds".into(),
        title: "Beds".into(),
        description: None,
        fields: vec![
            FieldSpec::new("label", "string", "Label"),
            FieldSpec::new("occupied", "boolean", "Occupied"),
        ],
    }
}

fn record(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Two `areas` records keyed by `code`.
#[must_use]
pub fn areas_seed() -> SeedSet {
    SeedSet {
        collection: "areas".into(),
        unique_field: Some("code".into()),
        records: vec![
            record(json!({ "code": "ER", "name": "Emergency" })),
            record(json!({ "code": "ICU", "name": "Intensive care" })),
        ],
    }
}

/// Role with a `view` strategy and `grants` resource grants (`resource_0`, `resource_1`, ...).
#[must_use]
pub fn nurse_role(grants: usize) -> RoleSpec {
    RoleSpec {
        name: "nurse".into(),
        title: Some("Nurse".into()),
        strategy_actions: Some(vec!["view".into()]),
        resources: (0..grants)
            .map(|index| ResourceGrant {
                collection: format!("resource_{index}"),
                actions: vec!["view".into(), "update".into()],
                fields: (index == 0).then(|| vec!["name".into()]),
            })
            .collect(),
    }
}

/// Group containing one page and one link.
#[must_use]
pub fn route_tree() -> RouteSpec {
    RouteSpec {
        title: "Agenda".into(),
        kind: RouteKind::Group,
        icon: None,
        url: None,
        schema_content: None,
        children: vec![
            RouteSpec {
                title: "Today".into(),
                kind: RouteKind::Page,
                icon: Some("CalendarOutlined".into()),
                url: None,
                schema_content: Some("# Today".into()),
                children: Vec::new(),
            },
            RouteSpec {
                title: "Handbook".into(),
                kind: RouteKind::Link,
                icon: None,
                url: Some("https://example.org/handbook".into()),
                schema_content: None,
                children: Vec::new(),
            },
        ],
    }
}

/// Collection-triggered workflow with create, update and condition nodes.
#[must_use]
pub fn admission_workflow() -> WorkflowSpec {
    let mut create = NodeSpec::new("create", "Copy to log");
    create.collection = Some("admission_log".into());
    create.values = Some(record(json!({ "patient": "{{$context.data.patient}}" })));

    let mut update = NodeSpec::new("update", "Mark copied");
    update.collection = Some("admissions".into());
    update.filter = Some(record(json!({ "id": "{{$context.data.id}}" })));
    update.values = Some(record(json!({ "copied": true })));

    let mut condition = NodeSpec::new("condition", "Is urgent");
    condition.config = Some(record(json!({ "calculation": "{{$context.data.urgent}}" })));

    WorkflowSpec {
        title: "Admission copy".into(),
        description: None,
        kind: WorkflowKind::Collection,
        trigger: TriggerSpec {
            collection: Some("admissions".into()),
            mode: None,
            cron: None,
        },
        nodes: vec![create, update, condition],
        enabled: true,
    }
}
