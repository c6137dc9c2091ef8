//! Conversion between UTCP tool definitions and model function calling.
//!
//! Outbound, manifest tools become [`ToolSpec`]s the model can choose from.
//! Inbound, the JSON arguments the model produced become UTCP call
//! [`Parameters`].

use crate::model::ToolSpec;
use serde_json::{Map, Number, Value, json};
use std::collections::HashMap;
use tracing::debug;
use utcp::{ParamValue, Parameters, PropertySchema, Tool};

/// Describe one tool as a function definition.
pub fn to_function_schema(tool: &Tool) -> ToolSpec {
    let properties: Map<String, Value> = tool
        .inputs
        .properties
        .iter()
        .map(|(name, property)| (name.clone(), property_schema(property)))
        .collect();

    ToolSpec {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: json!({
            "type": tool.inputs.kind,
            "properties": properties,
            "required": tool.inputs.required,
        }),
    }
}

/// Describe every tool, one definition per distinct name.
///
/// A repeated name keeps the position of its first occurrence and the
/// content of its last.
pub fn to_function_schemas(tools: &[Tool]) -> Vec<ToolSpec> {
    let mut specs: Vec<ToolSpec> = Vec::with_capacity(tools.len());
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for tool in tools {
        let spec = to_function_schema(tool);
        match positions.get(tool.name.as_str()) {
            Some(&index) => specs[index] = spec,
            None => {
                positions.insert(&tool.name, specs.len());
                specs.push(spec);
            }
        }
    }
    specs
}

fn property_schema(property: &PropertySchema) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String(property.kind.clone()));

    if let Some(description) = property.description.as_deref().filter(|d| !d.is_empty()) {
        schema.insert("description".into(), Value::String(description.to_string()));
    }
    if let Some(allowed) = property.allowed.as_ref().filter(|v| !v.is_empty()) {
        schema.insert("enum".into(), json!(allowed));
    }
    if property.is_numeric() {
        if let Some(minimum) = &property.minimum {
            schema.insert("minimum".into(), Value::Number(minimum.clone()));
        }
        if let Some(maximum) = &property.maximum {
            schema.insert("maximum".into(), Value::Number(maximum.clone()));
        }
    }

    Value::Object(schema)
}

/// Turn model-produced arguments into call parameters for `tool`.
///
/// Anything other than a JSON object yields no parameters. Arguments are
/// not checked against the tool's declared inputs; mismatches are only logged.
pub fn to_parameter_mapping(tool: &Tool, arguments: &Value) -> Parameters {
    let Value::Object(fields) = arguments else {
        debug!(tool = %tool.name, "arguments are not an object; calling without parameters");
        return Parameters::new();
    };

    for name in fields.keys() {
        if !tool.inputs.properties.contains_key(name) {
            debug!(tool = %tool.name, argument = %name, "argument not declared by tool");
        }
    }
    for name in &tool.inputs.required {
        if !fields.contains_key(name) {
            debug!(tool = %tool.name, argument = %name, "required argument missing");
        }
    }

    fields
        .iter()
        .map(|(name, value)| (name.clone(), convert_value(value)))
        .collect()
}

/// Convert one JSON value into a parameter value.
///
/// Whole numbers become integers, other numbers floats. `null` becomes the
/// empty string.
pub fn convert_value(value: &Value) -> ParamValue {
    match value {
        Value::String(s) => ParamValue::String(s.clone()),
        Value::Number(n) => convert_number(n),
        Value::Bool(b) => ParamValue::Bool(*b),
        Value::Array(items) => ParamValue::Sequence(items.iter().map(convert_value).collect()),
        Value::Object(fields) => ParamValue::Mapping(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), convert_value(v)))
                .collect(),
        ),
        Value::Null => ParamValue::String(String::new()),
    }
}

fn convert_number(n: &Number) -> ParamValue {
    if let Some(i) = n.as_i64() {
        return ParamValue::Int(i);
    }
    let f = n.as_f64().unwrap_or_default();
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        ParamValue::Int(f as i64)
    } else {
        ParamValue::Float(f)
    }
}
