//! Field definitions and collection field creation payloads.

use serde_json::{Value, json};

use crate::model::FieldSpec;

const RELATION_TYPES: &[&str] = &["belongsTo", "hasMany", "belongsToMany", "hasOne"];
const TO_MANY_TYPES: &[&str] = &["hasMany", "belongsToMany"];

/// UI component for a storage type.
#[must_use]
pub fn component_for(field_type: &str) -> &'static str {
    match field_type {
        "text" => "Input.TextArea",
        "integer" | "bigInt" | "double" | "decimal" | "float" => "InputNumber",
        "boolean" => "Checkbox",
        "date" | "datetime" => "DatePicker",
        "time" => "TimePicker",
        "belongsTo" | "hasMany" | "belongsToMany" | "hasOne" => "AssociationField",
        _ => "Input",
    }
}

/// Default UI interface for a storage type.
#[must_use]
pub fn interface_for(field_type: &str) -> &'static str {
    match field_type {
        "text" => "textarea",
        "integer" | "bigInt" => "integer",
        "double" | "decimal" | "float" => "number",
        "boolean" => "checkbox",
        "date" | "datetime" => "datetime",
        "time" => "time",
        "belongsTo" => "obo",
        "hasOne" => "oho",
        "hasMany" => "o2m",
        "belongsToMany" => "m2m",
        _ => "input",
    }
}

fn schema_type_for(field_type: &str) -> &'static str {
    match field_type {
        "integer" | "bigInt" | "double" | "decimal" | "float" => "number",
        "boolean" => "boolean",
        "belongsTo" | "hasOne" => "object",
        "hasMany" | "belongsToMany" => "array",
        _ => "string",
    }
}

/// Normalise enum entries: plain strings become `{value, label}` pairs.
fn enum_entries(options: &[Value]) -> Vec<Value> {
    options
        .iter()
        .map(|option| match option {
            Value::String(text) => json!({ "value": text, "label": text }),
            other => other.clone(),
        })
        .collect()
}

impl FieldSpec {
    /// Body for `POST collections/<name>/fields:create`.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let is_relation = RELATION_TYPES.contains(&self.field_type.as_str());
        let interface = self.interface.clone().unwrap_or_else(|| {
            if self.options.is_some() && !is_relation {
                "select".to_string()
            } else {
                interface_for(&self.field_type).to_string()
            }
        });
        let component = if self.options.is_some() && !is_relation {
            "Select"
        } else {
            component_for(&self.field_type)
        };

        let mut ui_schema = json!({
            "title": self.title,
            "type": schema_type_for(&self.field_type),
            "x-component": component,
        });
        let mut payload = json!({
            "name": self.name,
            "type": self.field_type,
            "interface": interface,
        });

        if self.required {
            payload["required"] = Value::Bool(true);
            ui_schema["required"] = Value::Bool(true);
        }
        if self.unique {
            payload["unique"] = Value::Bool(true);
        }
        if let Some(default) = &self.default_value {
            payload["defaultValue"] = default.clone();
        }
        if is_relation {
            if let Some(target) = &self.target {
                payload["target"] = Value::String(target.clone());
            }
            if let Some(foreign_key) = &self.foreign_key {
                payload["foreignKey"] = Value::String(foreign_key.clone());
            }
            ui_schema["x-component-props"] = json!({
                "multiple": TO_MANY_TYPES.contains(&self.field_type.as_str()),
            });
        }
        if let Some(options) = &self.options {
            ui_schema["enum"] = Value::Array(enum_entries(options));
        }

        payload["uiSchema"] = ui_schema;
        payload
    }
}

/// Single-line text field.
#[must_use]
pub fn field_str(name: &str, title: &str, required: bool) -> Value {
    let mut field = json!({
        "name": name,
        "type": "string",
        "interface": "input",
        "uiSchema": { "title": title, "type": "string", "x-component": "Input" },
    });
    if required {
        field["required"] = Value::Bool(true);
    }
    field
}

/// Multi-line text field.
#[must_use]
pub fn field_txt(name: &str, title: &str) -> Value {
    json!({
        "name": name,
        "type": "text",
        "interface": "textarea",
        "uiSchema": { "title": title, "type": "string", "x-component": "Input.TextArea" },
    })
}

/// Integer field.
#[must_use]
pub fn field_int(name: &str, title: &str) -> Value {
    json!({
        "name": name,
        "type": "integer",
        "interface": "integer",
        "uiSchema": { "title": title, "type": "number", "x-component": "InputNumber" },
    })
}

/// Checkbox with a default value.
#[must_use]
pub fn field_bool(name: &str, title: &str, default_value: bool) -> Value {
    json!({
        "name": name,
        "type": "boolean",
        "interface": "checkbox",
        "defaultValue": default_value,
        "uiSchema": { "title": title, "type": "boolean", "x-component": "Checkbox" },
    })
}

/// Date-only field.
#[must_use]
pub fn field_date(name: &str, title: &str) -> Value {
    json!({
        "name": name,
        "type": "date",
        "interface": "datetime",
        "uiSchema": {
            "title": title,
            "type": "string",
            "x-component": "DatePicker",
            "x-component-props": { "dateOnly": true },
        },
    })
}

/// Date and time field.
#[must_use]
pub fn field_datetime(name: &str, title: &str) -> Value {
    json!({
        "name": name,
        "type": "date",
        "interface": "datetime",
        "uiSchema": {
            "title": title,
            "type": "string",
            "x-component": "DatePicker",
            "x-component-props": { "showTime": true },
        },
    })
}

/// Single-choice field; each option is both value and label.
#[must_use]
pub fn field_select(name: &str, title: &str, options: &[&str]) -> Value {
    let entries: Vec<Value> = options
        .iter()
        .map(|option| json!({ "value": option, "label": option }))
        .collect();
    json!({
        "name": name,
        "type": "string",
        "interface": "select",
        "uiSchema": { "title": title, "type": "string", "x-component": "Select", "enum": entries },
    })
}

/// Many-to-one relation. The field name is the foreign key without its `_id` suffix.
#[must_use]
pub fn field_belongs_to(foreign_key: &str, title: &str, target: &str) -> Value {
    let name = foreign_key.strip_suffix("_id").unwrap_or(foreign_key);
    json!({
        "name": name,
        "type": "belongsTo",
        "interface": "obo",
        "foreignKey": foreign_key,
        "target": target,
        "uiSchema": { "title": title, "type": "object", "x-component": "AssociationField" },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn belongs_to_strips_id_suffix() {
        let field = field_belongs_to("area_id", "Area", "areas");
        assert_eq!(field["name"], "area");
        assert_eq!(field["foreignKey"], "area_id");
        assert_eq!(field["target"], "areas");
        assert_eq!(field["uiSchema"]["x-component"], "AssociationField");

        let untouched = field_belongs_to("owner", "Owner", "users");
        assert_eq!(untouched["name"], "owner");
    }

    #[test]
    fn select_options_become_value_label_pairs() {
        let field = field_select("status", "Status", &["open", "closed"]);
        assert_eq!(
            field["uiSchema"]["enum"],
            json!([
                { "value": "open", "label": "open" },
                { "value": "closed", "label": "closed" }
            ])
        );
    }

    #[test]
    fn simple_helpers_pick_components() {
        assert_eq!(field_str("code", "Code", true)["required"], true);
        assert!(field_str("code", "Code", false).get("required").is_none());
        assert_eq!(field_txt("notes", "Notes")["uiSchema"]["x-component"], "Input.TextArea");
        assert_eq!(field_int("beds", "Beds")["uiSchema"]["type"], "number");
        assert_eq!(field_bool("active", "Active", true)["defaultValue"], true);
        assert_eq!(field_date("born", "Born")["interface"], "datetime");
        assert_eq!(field_datetime("at", "At")["type"], "date");
    }

    #[test]
    fn payload_maps_types_to_components() {
        for (field_type, component) in [
            ("string", "Input"),
            ("text", "Input.TextArea"),
            ("integer", "InputNumber"),
            ("decimal", "InputNumber"),
            ("boolean", "Checkbox"),
            ("datetime", "DatePicker"),
            ("time", "TimePicker"),
            ("json", "Input"),
        ] {
            let payload = FieldSpec::new("f", field_type, "F").to_payload();
            assert_eq!(payload["uiSchema"]["x-component"], component, "{field_type}");
        }
    }

    #[test]
    fn relation_payload_carries_target_and_multiplicity() {
        let mut to_many = FieldSpec::new("beds", "hasMany", "Beds");
        to_many.target = Some("beds".into());
        let payload = to_many.to_payload();
        assert_eq!(payload["target"], "beds");
        assert_eq!(payload["interface"], "o2m");
        assert_eq!(payload["uiSchema"]["x-component"], "AssociationField");
        assert_eq!(payload["uiSchema"]["x-component-props"]["multiple"], true);

        let mut to_one = FieldSpec::new("area", "belongsTo", "Area");
        to_one.target = Some("areas".into());
        to_one.foreign_key = Some("area_id".into());
        let payload = to_one.to_payload();
        assert_eq!(payload["foreignKey"], "area_id");
        assert_eq!(payload["uiSchema"]["x-component-props"]["multiple"], false);
    }

    #[test]
    fn payload_flags_and_enums() {
        let mut field = FieldSpec::new("level", "string", "Level");
        field.required = true;
        field.unique = true;
        field.default_value = Some(json!("low"));
        field.options = Some(vec![json!("low"), json!({ "value": "hi", "label": "High" })]);
        let payload = field.to_payload();
        assert_eq!(payload["required"], true);
        assert_eq!(payload["unique"], true);
        assert_eq!(payload["defaultValue"], "low");
        assert_eq!(payload["interface"], "select");
        assert_eq!(payload["uiSchema"]["x-component"], "Select");
        assert_eq!(
            payload["uiSchema"]["enum"],
            json!([{ "value": "low", "label": "low" }, { "value": "hi", "label": "High" }])
        );
    }
}
