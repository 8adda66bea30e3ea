//! Tool definition types.
//!
//! A [`Tool`] is what the broker advertises to the model: a unique name, a
//! description, and a JSON-Schema-style parameter schema used both for
//! model-facing advertisement and for required-field validation before
//! dispatch.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON Schema-compatible parameter definition for a tool.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolParameterSchema {
    /// Top-level JSON Schema type (`"object"` for every built-in).
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Property definitions (when type is `object`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Map<String, Value>>,
    /// Required property names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl ToolParameterSchema {
    /// An object schema with the given properties and required names.
    #[must_use]
    pub fn object(properties: serde_json::Map<String, Value>, required: Vec<String>) -> Self {
        Self {
            schema_type: "object".into(),
            properties: Some(properties),
            required: if required.is_empty() { None } else { Some(required) },
        }
    }
}

/// A tool definition advertised to the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name (unique identifier).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Parameter schema.
    pub parameters: ToolParameterSchema,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_tool() -> Tool {
        let mut props = serde_json::Map::new();
        let _ = props.insert("command".into(), json!({"type": "string"}));
        Tool {
            name: "shell".into(),
            description: "Run a shell command".into(),
            parameters: ToolParameterSchema::object(props, vec!["command".into()]),
        }
    }

    #[test]
    fn schema_type_serializes_as_type() {
        let tool = sample_tool();
        let v: Value = serde_json::to_value(&tool).unwrap();
        assert_eq!(v["parameters"]["type"], "object");
        assert_eq!(v["parameters"]["required"][0], "command");
    }

    #[test]
    fn empty_required_is_omitted() {
        let schema = ToolParameterSchema::object(serde_json::Map::new(), vec![]);
        let json = serde_json::to_string(&schema).unwrap();
        assert!(!json.contains("required"));
    }

    #[test]
    fn roundtrip() {
        let tool = sample_tool();
        let back: Tool = serde_json::from_str(&serde_json::to_string(&tool).unwrap()).unwrap();
        assert_eq!(back, tool);
    }
}
