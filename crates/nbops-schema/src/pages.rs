//! Page skeletons and workflow assign-form schemas.

use serde_json::{Map, Value, json};

use crate::ids::UidGenerator;

/// A `Page` + `Grid` schema and the identifiers route creation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSkeleton {
    /// `x-uid` of the page root.
    pub page_uid: String,
    /// `x-uid` of the grid that receives blocks.
    pub grid_uid: String,
    /// Property name of the grid under the page.
    pub grid_name: String,
    /// Menu schema identifier for the route.
    pub menu_uid: String,
    /// Schema body for `uiSchemas:insert`.
    pub schema: Value,
}

/// Empty page with a block grid, used when creating a page route.
#[must_use]
pub fn page_schema(ids: &UidGenerator, title: Option<&str>) -> PageSkeleton {
    let page_uid = ids.next("page");
    let grid_uid = ids.next("grid");
    let grid_name = ids.next("grid-name");
    let menu_uid = ids.next("menu");

    let mut properties = Map::new();
    properties.insert(
        grid_name.clone(),
        json!({
            "type": "void",
            "x-component": "Grid",
            "x-initializer": "page:addBlock",
            "x-uid": grid_uid,
            "x-async": true,
            "properties": {},
        }),
    );
    let mut schema = json!({
        "type": "void",
        "x-component": "Page",
        "x-uid": page_uid,
        "properties": properties,
    });
    if let Some(title) = title {
        schema["title"] = Value::String(title.to_string());
    }

    PageSkeleton {
        page_uid,
        grid_uid,
        grid_name,
        menu_uid,
        schema,
    }
}

/// Default markdown shown on a page created from a route tree.
#[must_use]
pub fn placeholder_content(title: &str) -> String {
    format!("# {title}\n\n*Use the + button to add blocks*")
}

/// Page with a single card holding a markdown note.
#[must_use]
pub fn placeholder_page_schema(ids: &UidGenerator, title: &str, content: Option<&str>) -> Value {
    let content = content.map_or_else(|| placeholder_content(title), str::to_string);
    json!({
        "type": "void",
        "x-component": "Page",
        "x-async": true,
        "x-uid": ids.next("page"),
        "properties": {
            "grid": {
                "type": "void",
                "x-component": "Grid",
                "x-initializer": "page:addBlock",
                "properties": {
                    "row1": {
                        "type": "void",
                        "x-component": "Grid.Row",
                        "properties": {
                            "col1": {
                                "type": "void",
                                "x-component": "Grid.Col",
                                "properties": {
                                    "card": {
                                        "type": "void",
                                        "x-component": "CardItem",
                                        "x-component-props": { "title": title },
                                        "properties": {
                                            "markdown": {
                                                "type": "void",
                                                "x-component": "Markdown.Void",
                                                "x-component-props": { "content": content },
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}

/// Form grid for create/update workflow nodes: one row and column per field.
#[must_use]
pub fn assign_form_schema(ids: &UidGenerator, collection: &str, fields: &[String]) -> Value {
    let mut rows = Map::new();
    for (position, field) in fields.iter().enumerate() {
        let row_id = ids.next("form-row");
        let col_id = ids.next("form-col");
        let mut assigned = Map::new();
        assigned.insert(
            field.clone(),
            json!({
                "name": field,
                "type": "string",
                "version": "2.0",
                "x-toolbar": "FormItemSchemaToolbar",
                "x-settings": "fieldSettings:FormItem",
                "x-component": "AssignedField",
                "x-decorator": "FormItem",
                "x-collection-field": format!("{collection}.{field}"),
                "_isJSONSchemaObject": true,
            }),
        );
        let mut cols = Map::new();
        cols.insert(
            col_id.clone(),
            json!({
                "name": col_id,
                "type": "void",
                "version": "2.0",
                "x-component": "Grid.Col",
                "_isJSONSchemaObject": true,
                "properties": assigned,
            }),
        );
        rows.insert(
            row_id.clone(),
            json!({
                "name": row_id,
                "type": "void",
                "version": "2.0",
                "x-component": "Grid.Row",
                "x-index": position + 1,
                "_isJSONSchemaObject": true,
                "properties": cols,
            }),
        );
    }
    json!({
        "name": ids.next("form"),
        "type": "void",
        "version": "2.0",
        "x-component": "Grid",
        "x-initializer": "assignFieldValuesForm:configureFields",
        "_isJSONSchemaObject": true,
        "properties": rows,
    })
}
