use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A reference into `#/components/schemas/` or an inline schema.
///
/// `Ref` must come first: untagged deserialization tries variants in order,
/// and an object carrying `$ref` would otherwise match the inline variant
/// through its `extra` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaOrRef {
    Ref {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Inline(Box<Schema>),
}

impl SchemaOrRef {
    /// Build a reference to a named component schema.
    pub fn schema_ref(name: &str) -> Self {
        SchemaOrRef::Ref {
            reference: crate::reference::schema_ref(name),
        }
    }
}

/// A schema node: scalar constraints, object properties, array items and
/// the composition keywords, all potentially recursive.
///
/// Constraint keywords we do not model explicitly (minimum, pattern, ...)
/// survive round-trips through the `extra` flatten map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaOrRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaOrRef>>,

    #[serde(rename = "allOf", default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaOrRef>,

    #[serde(rename = "oneOf", default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<SchemaOrRef>,

    #[serde(rename = "anyOf", default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<SchemaOrRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<SchemaOrRef>>,

    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<AdditionalProperties>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,

    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// `additionalProperties` is either a boolean or a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(Box<SchemaOrRef>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_object_deserializes_as_ref() {
        let json = r##"{"$ref": "#/components/schemas/User"}"##;
        let parsed: SchemaOrRef = serde_json::from_str(json).unwrap();
        assert!(matches!(
            parsed,
            SchemaOrRef::Ref { ref reference } if reference == "#/components/schemas/User"
        ));
    }

    #[test]
    fn inline_schema_keeps_unmodeled_keywords() {
        let json = r#"{"type": "string", "minLength": 3, "pattern": "^[a-z]+$"}"#;
        let parsed: SchemaOrRef = serde_json::from_str(json).unwrap();
        let SchemaOrRef::Inline(schema) = parsed else {
            panic!("expected inline schema");
        };
        assert_eq!(schema.extra.get("minLength"), Some(&Value::from(3)));
        assert_eq!(schema.extra.get("pattern"), Some(&Value::from("^[a-z]+$")));
    }

    #[test]
    fn nested_composition_round_trips() {
        let json = r##"{
            "allOf": [
                {"$ref": "#/components/schemas/Base"},
                {"type": "object", "properties": {"id": {"type": "integer"}}}
            ]
        }"##;
        let parsed: SchemaOrRef = serde_json::from_str(json).unwrap();
        let back = serde_json::to_value(&parsed).unwrap();
        let reparsed: SchemaOrRef = serde_json::from_value(back).unwrap();
        assert_eq!(parsed, reparsed);
    }
}
