//! Schema reflection tree
//!
//! An immutable, serializable description of a record's shape. The tagged
//! union is encoded with a `type` discriminator so it survives a round trip
//! through JSON, which is how code generators and the CLI-flag deriver consume
//! it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{BindingError, Result};

/// Free-form schema tags (`x-groups`, `x-familiar-*`, ...)
pub type Annotations = BTreeMap<String, serde_json::Value>;

/// A node of the reflection tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Reflection {
    Object(ObjectReflection),
    #[serde(rename = "objectitem")]
    ObjectItem(ObjectItem),
    Array(ArrayReflection),
    #[serde(rename = "arrayitem")]
    ArrayItem(ArrayItem),
    String(LiteralReflection),
    Number(LiteralReflection),
    Integer(LiteralReflection),
    Boolean(LiteralReflection),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectReflection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<ObjectItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(flatten)]
    pub annotations: Annotations,
}

/// One named property of an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectItem {
    pub name: String,
    pub optional: bool,
    pub property: Box<Reflection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayReflection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub items: Box<Reflection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(flatten)]
    pub annotations: Annotations,
}

/// One indexed element of an array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayItem {
    pub name: String,
    pub idx: usize,
    pub item: Box<Reflection>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LiteralReflection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(flatten)]
    pub annotations: Annotations,
}

impl Reflection {
    /// The `type` discriminator
    pub fn kind_name(&self) -> &'static str {
        match self {
            Reflection::Object(_) => "object",
            Reflection::ObjectItem(_) => "objectitem",
            Reflection::Array(_) => "array",
            Reflection::ArrayItem(_) => "arrayitem",
            Reflection::String(_) => "string",
            Reflection::Number(_) => "number",
            Reflection::Integer(_) => "integer",
            Reflection::Boolean(_) => "boolean",
        }
    }

    pub fn as_object(&self) -> Option<&ObjectReflection> {
        match self {
            Reflection::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayReflection> {
        match self {
            Reflection::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Reflection::String(_) | Reflection::Number(_) | Reflection::Integer(_) | Reflection::Boolean(_)
        )
    }

    /// Schema-level default, if any
    pub fn default_value(&self) -> Option<&serde_json::Value> {
        match self {
            Reflection::Object(obj) => obj.default.as_ref(),
            Reflection::Array(arr) => arr.default.as_ref(),
            Reflection::String(lit)
            | Reflection::Number(lit)
            | Reflection::Integer(lit)
            | Reflection::Boolean(lit) => lit.default.as_ref(),
            Reflection::ObjectItem(_) | Reflection::ArrayItem(_) => None,
        }
    }

    pub fn format(&self) -> Option<&str> {
        match self {
            Reflection::String(lit)
            | Reflection::Number(lit)
            | Reflection::Integer(lit)
            | Reflection::Boolean(lit) => lit.format.as_deref(),
            _ => None,
        }
    }

    pub fn annotations(&self) -> Option<&Annotations> {
        match self {
            Reflection::Object(obj) => Some(&obj.annotations),
            Reflection::Array(arr) => Some(&arr.annotations),
            Reflection::String(lit)
            | Reflection::Number(lit)
            | Reflection::Integer(lit)
            | Reflection::Boolean(lit) => Some(&lit.annotations),
            Reflection::ObjectItem(_) | Reflection::ArrayItem(_) => None,
        }
    }

    /// Tags stored under `name` (matched case-insensitively). A single string
    /// counts as a one-element list.
    pub fn annotation(&self, name: &str) -> Vec<String> {
        let Some(annotations) = self.annotations() else {
            return Vec::new();
        };
        let found = annotations
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v);
        match found {
            Some(serde_json::Value::String(s)) => vec![s.clone()],
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Convert an inline JSON Schema document.
    ///
    /// Supports `type` object/array/string/number/integer/boolean together with
    /// `$id`, `title`, `description`, `required`, `properties`, `items`,
    /// `format`, `default` and `x-*` annotations. `$ref` must already be
    /// resolved by the caller.
    pub fn from_json_schema(schema: &serde_json::Value) -> Result<Reflection> {
        let obj = schema
            .as_object()
            .ok_or_else(|| BindingError::InvalidSchema(format!("schema must be an object: {}", schema)))?;

        if let Some(reference) = obj.get("$ref").and_then(|v| v.as_str()) {
            return Err(BindingError::InvalidSchema(format!("unresolved $ref: {}", reference)));
        }

        let annotations: Annotations = obj
            .iter()
            .filter(|(k, _)| k.starts_with("x-"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let string_field = |name: &str| obj.get(name).and_then(|v| v.as_str()).map(String::from);
        let id = string_field("$id").or_else(|| string_field("id"));
        let description = string_field("description");
        let default = obj.get("default").cloned();

        let kind = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BindingError::InvalidSchema(format!("missing type: {}", schema)))?;

        match kind {
            "object" => {
                let required: Vec<String> = obj
                    .get("required")
                    .and_then(|v| v.as_array())
                    .map(|items| items.iter().filter_map(|v| v.as_str().map(String::from)).collect())
                    .unwrap_or_default();
                let mut properties = Vec::new();
                if let Some(props) = obj.get("properties").and_then(|v| v.as_object()) {
                    for (name, prop) in props {
                        properties.push(ObjectItem {
                            name: name.clone(),
                            optional: !required.contains(name),
                            property: Box::new(Reflection::from_json_schema(prop)?),
                            key: None,
                        });
                    }
                }
                Ok(Reflection::Object(ObjectReflection {
                    id,
                    title: string_field("title"),
                    description,
                    required,
                    properties,
                    default,
                    annotations,
                }))
            }
            "array" => {
                let items = obj
                    .get("items")
                    .ok_or_else(|| BindingError::InvalidSchema(format!("array without items: {}", schema)))?;
                Ok(Reflection::Array(ArrayReflection {
                    id,
                    description,
                    items: Box::new(Reflection::from_json_schema(items)?),
                    default,
                    annotations,
                }))
            }
            "string" | "number" | "integer" | "boolean" => {
                let literal = LiteralReflection {
                    format: string_field("format"),
                    description,
                    default,
                    annotations,
                };
                Ok(match kind {
                    "string" => Reflection::String(literal),
                    "number" => Reflection::Number(literal),
                    "integer" => Reflection::Integer(literal),
                    _ => Reflection::Boolean(literal),
                })
            }
            other => Err(BindingError::InvalidSchema(format!("unknown type {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn simple_schema() -> serde_json::Value {
        json!({
            "$id": "https://Simple",
            "title": "Simple",
            "type": "object",
            "properties": {
                "name": { "type": "string", "x-groups": ["key"] },
                "count": { "type": "integer", "default": 3 },
                "tags": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["name"]
        })
    }

    #[test]
    fn test_from_json_schema_object() {
        let reflection = Reflection::from_json_schema(&simple_schema()).unwrap();
        let obj = reflection.as_object().expect("object");
        assert_eq!(obj.id.as_deref(), Some("https://Simple"));
        assert_eq!(obj.title.as_deref(), Some("Simple"));

        let names: Vec<_> = obj.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "count", "tags"]);
        assert!(!obj.properties[0].optional);
        assert!(obj.properties[1].optional);
        assert_eq!(obj.properties[1].property.default_value(), Some(&json!(3)));
        assert_eq!(obj.properties[2].property.kind_name(), "array");
    }

    #[test]
    fn test_optional_matches_required_list() {
        let reflection = Reflection::from_json_schema(&simple_schema()).unwrap();
        let obj = reflection.as_object().unwrap();
        for item in &obj.properties {
            assert_eq!(item.optional, !obj.required.contains(&item.name));
        }
    }

    #[test]
    fn test_annotations_are_kept() {
        let reflection = Reflection::from_json_schema(&simple_schema()).unwrap();
        let obj = reflection.as_object().unwrap();
        assert_eq!(obj.properties[0].property.annotation("X-Groups"), vec!["key".to_string()]);
        assert!(obj.properties[1].property.annotation("x-groups").is_empty());
    }

    #[test]
    fn test_json_round_trip_keeps_discriminator() {
        let reflection = Reflection::from_json_schema(&simple_schema()).unwrap();
        let text = serde_json::to_string(&reflection).unwrap();
        assert!(text.contains(r#""type":"object""#));
        assert!(text.contains(r#""type":"array""#));
        let back: Reflection = serde_json::from_str(&text).unwrap();
        assert_eq!(back, reflection);
    }

    #[test]
    fn test_rejects_ref_and_unknown_types() {
        assert!(Reflection::from_json_schema(&json!({"$ref": "other.json"})).is_err());
        assert!(Reflection::from_json_schema(&json!({"type": "null"})).is_err());
        assert!(Reflection::from_json_schema(&json!({"type": "array"})).is_err());
    }
}
