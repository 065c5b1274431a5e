use serde_json::Value;

use crate::ast::{JsonDocument, NodeContent, NodeId};

/// Projects a syntax tree node to a plain JSON value.
///
/// Numbers project through their `f64` value. When an object node carries
/// duplicate keys the last occurrence wins, matching what a plain JSON
/// parser would produce. A property without a value (error recovery)
/// contributes nothing.
pub fn node_value(document: &JsonDocument, id: NodeId) -> Value {
    match &document.node(id).content {
        NodeContent::Null => Value::Null,
        NodeContent::Boolean(value) => Value::Bool(*value),
        NodeContent::Number { value, .. } => serde_json::Number::from_f64(*value)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        NodeContent::String(value) => Value::String(value.clone()),
        NodeContent::Array { items } => Value::Array(
            items
                .iter()
                .map(|&item| node_value(document, item))
                .collect(),
        ),
        NodeContent::Object { properties } => {
            let mut map = serde_json::Map::new();
            for &property in properties {
                if let NodeContent::Property {
                    key,
                    value: Some(value),
                    ..
                } = document.node(property).content
                {
                    if let Some(key) = document.node(key).as_str() {
                        map.insert(key.to_string(), node_value(document, value));
                    }
                }
            }
            Value::Object(map)
        }
        NodeContent::Property { value, .. } => value
            .map(|value| node_value(document, value))
            .unwrap_or(Value::Null),
    }
}

/// Deep structural equality over JSON values.
///
/// Unlike `serde_json`'s `PartialEq`, numbers compare by numeric value, so
/// `1` and `1.0` are equal. Arrays compare element-wise, objects by key set
/// and per-key values.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => false,
    }
}
