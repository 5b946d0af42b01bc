//! Argument validation against a tool's input schema
//!
//! Covers the subset of JSON Schema that tool descriptors use: `required`
//! and per-property `type` (a single name or an array of names). Keys not
//! declared in `properties` are accepted unchanged.

use serde_json::{Map, Value};

use crate::error::ToolFailure;

/// Check `arguments` against `schema`.
///
/// A required key that is absent or null fails with `MissingParameter`; a
/// declared property with the wrong JSON type fails with `InvalidArguments`.
/// Both name the offending field.
pub fn validate_arguments(schema: &Value, arguments: &Map<String, Value>) -> Result<(), ToolFailure> {
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            match arguments.get(field) {
                None | Some(Value::Null) => return Err(ToolFailure::missing_parameter(field)),
                Some(_) => {}
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (field, value) in arguments {
        let Some(declared) = properties.get(field).and_then(|p| p.get("type")) else {
            continue;
        };
        // Null optional values are treated as absent by the tools.
        if value.is_null() {
            continue;
        }
        if !matches_type(declared, value) {
            return Err(ToolFailure::invalid_arguments(format!(
                "Invalid type for parameter {field}: expected {}",
                describe_type(declared)
            )));
        }
    }
    Ok(())
}

fn matches_type(declared: &Value, value: &Value) -> bool {
    match declared {
        Value::String(name) => matches_named(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| matches_named(name, value)),
        _ => true,
    }
}

fn matches_named(name: &str, value: &Value) -> bool {
    match name {
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        // Unknown type names are not enforced
        _ => true,
    }
}

fn describe_type(declared: &Value) -> String {
    match declared {
        Value::String(name) => name.clone(),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.to_string(),
    }
}
