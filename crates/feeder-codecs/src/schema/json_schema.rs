//! A small JSON Schema validator.
//!
//! Covers the keywords the feeder's schemas use: `type` (single or list),
//! `required`, `properties`, `items` and `format: date-time`. Unknown
//! keywords are ignored.

use serde_json::Value;

/// Validate `instance` against `schema`, returning every violation found.
/// An empty list means the instance is valid.
pub fn validate(schema: &Value, instance: &Value) -> Vec<String> {
    let mut issues = Vec::new();
    validate_at(schema, instance, "$", &mut issues);
    issues
}

fn validate_at(schema: &Value, instance: &Value, path: &str, issues: &mut Vec<String>) {
    let Some(schema) = schema.as_object() else {
        return;
    };

    if let Some(expected) = schema.get("type") {
        let allowed: Vec<&str> = match expected {
            Value::String(name) => vec![name.as_str()],
            Value::Array(names) => names.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        if !allowed.is_empty() && !allowed.iter().any(|name| has_type(instance, name)) {
            issues.push(format!(
                "{path}: expected {}, found {}",
                allowed.join(" or "),
                type_of(instance)
            ));
            return;
        }
    }

    if let (Some("date-time"), Some(text)) = (
        schema.get("format").and_then(Value::as_str),
        instance.as_str(),
    ) {
        if chrono::DateTime::parse_from_rfc3339(text).is_err() {
            issues.push(format!("{path}: '{text}' is not a valid date-time"));
        }
    }

    if let Some(object) = instance.as_object() {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for name in required.iter().filter_map(Value::as_str) {
                if !object.contains_key(name) {
                    issues.push(format!("{path}: missing required property '{name}'"));
                }
            }
        }
        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, property_schema) in properties {
                if let Some(value) = object.get(name) {
                    validate_at(property_schema, value, &format!("{path}.{name}"), issues);
                }
            }
        }
    }

    if let (Some(items), Some(elements)) = (schema.get("items"), instance.as_array()) {
        for (i, element) in elements.iter().enumerate() {
            validate_at(items, element, &format!("{path}[{i}]"), issues);
        }
    }
}

fn has_type(value: &Value, name: &str) -> bool {
    match name {
        "null" => value.is_null(),
        "boolean" => value.is_boolean(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => match value {
            Value::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        },
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
