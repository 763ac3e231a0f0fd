//! Block builders: table, markdown, chart, and the grid row that hosts them.
//!
//! Sibling nodes carry `x-index` so the rendered order follows the input
//! order regardless of how the generated keys sort.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::ids::UidGenerator;

/// Default page size for table blocks.
pub const TABLE_PAGE_SIZE: u64 = 20;

/// Inputs for [`build_table_block`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableBlockOptions {
    /// Collection to list.
    pub collection: String,
    /// Card title.
    pub title: String,
    /// Field names shown as columns, in order.
    pub columns: Vec<String>,
    /// Extra list params merged over `pageSize`.
    pub params: Map<String, Value>,
    /// Add an export button.
    pub include_export: bool,
    /// Add an "Add new" drawer button.
    pub include_create: bool,
}

/// One aggregated value in a chart query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartMeasure {
    /// Field path.
    pub field: Vec<String>,
    /// Aggregation function (`count`, `sum`, ...).
    pub aggregation: String,
    /// Output alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// One grouping key in a chart query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartDimension {
    /// Field path.
    pub field: Vec<String>,
    /// Output alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Inputs for [`build_chart_block`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartBlockOptions {
    /// Card title.
    pub title: String,
    /// Queried collection.
    pub collection: String,
    /// Aggregations.
    pub measures: Vec<ChartMeasure>,
    /// Groupings.
    pub dimensions: Vec<ChartDimension>,
    /// Chart kind (`Bar`, `Pie`, `Line`, ...).
    pub chart_type: String,
    /// X axis field.
    pub x_field: Option<String>,
    /// Y axis field.
    pub y_field: Option<String>,
    /// Series split field.
    pub series_field: Option<String>,
}

fn index_of(position: usize) -> Value {
    json!(position + 1)
}

fn column_schema(collection: &str, column: &str, position: usize) -> Value {
    let mut field = Map::new();
    field.insert(
        column.to_string(),
        json!({
            "_isJSONSchemaObject": true,
            "version": "2.0",
            "x-collection-field": format!("{collection}.{column}"),
            "x-component": "CollectionField",
            "x-component-props": {},
            "x-read-pretty": true,
            "x-decorator": null,
            "x-decorator-props": {},
        }),
    );
    json!({
        "_isJSONSchemaObject": true,
        "version": "2.0",
        "type": "void",
        "x-decorator": "TableV2.Column.Decorator",
        "x-component": "TableV2.Column",
        "x-index": index_of(position + 1),
        "properties": field,
    })
}

fn action_bar(options: &TableBlockOptions) -> Value {
    let collection = &options.collection;
    let mut items = Map::new();
    items.insert(
        "filter".to_string(),
        json!({
            "_isJSONSchemaObject": true,
            "version": "2.0",
            "type": "void",
            "title": "{{ t(\"Filter\") }}",
            "x-action": "filter",
            "x-component": "Filter.Action",
            "x-use-component-props": "useFilterActionProps",
            "x-component-props": { "icon": "FilterOutlined" },
            "x-align": "left",
        }),
    );
    if options.include_create {
        items.insert(
            "create".to_string(),
            json!({
                "_isJSONSchemaObject": true,
                "version": "2.0",
                "type": "void",
                "title": "{{ t(\"Add new\") }}",
                "x-action": "create",
                "x-component": "Action",
                "x-component-props": { "openMode": "drawer", "type": "primary", "icon": "PlusOutlined" },
                "x-align": "right",
                "x-acl-action": format!("{collection}:create"),
                "properties": {
                    "drawer": {
                        "_isJSONSchemaObject": true,
                        "version": "2.0",
                        "type": "void",
                        "title": "{{ t(\"Add record\") }}",
                        "x-component": "Action.Container",
                        "x-component-props": { "className": "nb-action-popup" },
                        "properties": {
                            "grid": {
                                "_isJSONSchemaObject": true,
                                "version": "2.0",
                                "type": "void",
                                "x-component": "Grid",
                                "x-initializer": "popup:addNew:addBlock",
                                "properties": {},
                            }
                        }
                    }
                }
            }),
        );
    }
    if options.include_export {
        items.insert(
            "export".to_string(),
            json!({
                "_isJSONSchemaObject": true,
                "version": "2.0",
                "type": "void",
                "title": "{{ t(\"Export\") }}",
                "x-action": "export",
                "x-component": "Action",
                "x-component-props": { "icon": "DownloadOutlined", "useAction": "{{ useExportAction }}" },
                "x-align": "right",
                "x-acl-action": format!("{collection}:export"),
            }),
        );
    }
    json!({
        "_isJSONSchemaObject": true,
        "version": "2.0",
        "type": "void",
        "x-initializer": "table:configureActions",
        "x-component": "ActionBar",
        "x-component-props": { "style": { "marginBottom": "var(--nb-spacing)" } },
        "properties": items,
    })
}

/// Table block listing `options.collection`, ready for a grid column.
#[must_use]
pub fn build_table_block(ids: &UidGenerator, options: &TableBlockOptions) -> Value {
    let collection = &options.collection;

    let mut columns = Map::new();
    columns.insert(
        "actions".to_string(),
        json!({
            "_isJSONSchemaObject": true,
            "version": "2.0",
            "type": "void",
            "title": "{{ t(\"Actions\") }}",
            "x-action-column": "actions",
            "x-decorator": "TableV2.Column.ActionBar",
            "x-component": "TableV2.Column",
            "x-component-props": { "width": 120, "fixed": "right" },
            "x-initializer": "table:configureItemActions",
            "x-index": index_of(0),
            "properties": {},
        }),
    );
    for (position, column) in options.columns.iter().enumerate() {
        columns.insert(ids.next("column"), column_schema(collection, column, position));
    }

    let mut params = Map::new();
    params.insert("pageSize".to_string(), json!(TABLE_PAGE_SIZE));
    params.extend(options.params.clone());

    let mut properties = Map::new();
    properties.insert("actions".to_string(), action_bar(options));
    properties.insert(
        ids.next("table"),
        json!({
            "_isJSONSchemaObject": true,
            "version": "2.0",
            "type": "array",
            "x-initializer": "table:configureColumns",
            "x-component": "TableV2",
            "x-use-component-props": "useTableBlockProps",
            "x-component-props": { "rowKey": "id", "rowSelection": { "type": "checkbox" } },
            "properties": columns,
        }),
    );

    json!({
        "_isJSONSchemaObject": true,
        "version": "2.0",
        "type": "void",
        "x-acl-action": format!("{collection}:list"),
        "x-decorator": "TableBlockProvider",
        "x-decorator-props": {
            "collection": collection,
            "dataSource": "main",
            "action": "list",
            "params": params,
            "showIndex": true,
            "dragSort": false,
        },
        "x-component": "CardItem",
        "x-component-props": { "title": options.title },
        "x-toolbar": "BlockSchemaToolbar",
        "x-settings": "blockSettings:table",
        "properties": properties,
    })
}

/// Read-only markdown block.
#[must_use]
pub fn build_markdown_block(content: &str) -> Value {
    json!({
        "_isJSONSchemaObject": true,
        "version": "2.0",
        "type": "void",
        "x-decorator": "BlockItem",
        "x-component": "Markdown",
        "x-component-props": { "content": content },
        "x-editable": false,
    })
}

/// Chart card (data-visualization plugin).
#[must_use]
pub fn build_chart_block(ids: &UidGenerator, options: &ChartBlockOptions) -> Value {
    json!({
        "_isJSONSchemaObject": true,
        "version": "2.0",
        "type": "void",
        "x-decorator": "ChartV2Block",
        "x-decorator-props": {},
        "x-component": "CardItem",
        "x-component-props": { "title": options.title },
        "x-toolbar": "BlockSchemaToolbar",
        "x-settings": "blockSettings:chartV2",
        "x-uid": ids.next("chart"),
        "properties": {
            "chart": {
                "_isJSONSchemaObject": true,
                "version": "2.0",
                "type": "void",
                "x-component": "ChartRenderer",
                "x-component-props": {
                    "collection": options.collection,
                    "dataSource": "main",
                    "query": {
                        "measures": options.measures,
                        "dimensions": options.dimensions,
                    },
                    "config": {
                        "chartType": options.chart_type,
                        "general": {
                            "xField": options.x_field,
                            "yField": options.y_field,
                            "seriesField": options.series_field,
                        },
                    },
                },
            },
        },
    })
}

/// A `Grid.Row` with one `Grid.Col` per block, each column holding only its block.
#[must_use]
pub fn wrap_in_row(ids: &UidGenerator, blocks: Vec<Value>) -> Value {
    let row_uid = ids.next("row");
    let mut cols = Map::new();
    for (position, block) in blocks.into_iter().enumerate() {
        let mut content = Map::new();
        content.insert(ids.next("block"), block);
        cols.insert(
            ids.next("col"),
            json!({
                "_isJSONSchemaObject": true,
                "version": "2.0",
                "type": "void",
                "x-component": "Grid.Col",
                "x-index": index_of(position),
                "properties": content,
            }),
        );
    }
    json!({
        "_isJSONSchemaObject": true,
        "version": "2.0",
        "type": "void",
        "x-component": "Grid.Row",
        "x-uid": row_uid,
        "name": row_uid,
        "properties": cols,
    })
}
