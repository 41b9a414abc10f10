// Copyright 2026 The vizrpc developers

use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::json::types::JsonType;

/// Description of the shape of a JSON value.
///
/// Several fields are only meaningful in combination; `kind()` resolves the
/// single branch that governs validation and (de)serialization of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonSchema {
    pub title: String,
    pub description: String,
    pub json_type: JsonType,
    /// Only false for record fields that carry a default value.
    pub required: bool,
    pub default: Option<Value>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    /// Element schema of an array, or value schema of an open map.
    pub items: Option<Box<JsonSchema>>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    /// Fields of a closed record, in declaration order.
    pub properties: Vec<(String, JsonSchema)>,
    pub constant: Option<Value>,
    pub enumeration: Vec<String>,
    pub one_of: Vec<JsonSchema>,
}

/// The mutually exclusive dispatch branches of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Any,
    Primitive,
    Array,
    Map,
    Record,
    Enum,
    OneOf,
    Const,
}

impl Default for JsonSchema {
    fn default() -> Self {
        JsonSchema {
            title: String::new(),
            description: String::new(),
            json_type: JsonType::Undefined,
            required: true,
            default: None,
            minimum: None,
            maximum: None,
            items: None,
            min_items: None,
            max_items: None,
            properties: Vec::new(),
            constant: None,
            enumeration: Vec::new(),
            one_of: Vec::new(),
        }
    }
}

impl JsonSchema {
    /// A schema accepting any value.
    pub fn any() -> JsonSchema {
        JsonSchema::default()
    }

    pub fn of_type(json_type: JsonType) -> JsonSchema {
        JsonSchema {
            json_type,
            ..JsonSchema::default()
        }
    }

    pub fn array(items: JsonSchema) -> JsonSchema {
        JsonSchema {
            json_type: JsonType::Array,
            items: Some(Box::new(items)),
            ..JsonSchema::default()
        }
    }

    /// Object with arbitrary keys whose values all follow `items`.
    pub fn map(items: JsonSchema) -> JsonSchema {
        JsonSchema {
            json_type: JsonType::Object,
            items: Some(Box::new(items)),
            ..JsonSchema::default()
        }
    }

    pub fn record(title: &str) -> RecordBuilder {
        RecordBuilder {
            schema: JsonSchema {
                title: title.to_string(),
                json_type: JsonType::Object,
                ..JsonSchema::default()
            },
        }
    }

    pub fn enumeration<I, S>(title: &str, values: I) -> JsonSchema
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        JsonSchema {
            title: title.to_string(),
            json_type: JsonType::String,
            enumeration: values.into_iter().map(Into::into).collect(),
            ..JsonSchema::default()
        }
    }

    pub fn one_of(alternatives: Vec<JsonSchema>) -> JsonSchema {
        JsonSchema {
            one_of: alternatives,
            ..JsonSchema::default()
        }
    }

    pub fn constant(value: Value) -> JsonSchema {
        JsonSchema {
            json_type: JsonType::of(&value),
            constant: Some(value),
            ..JsonSchema::default()
        }
    }

    pub fn with_title(mut self, title: &str) -> JsonSchema {
        self.title = title.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> JsonSchema {
        self.description = description.to_string();
        self
    }

    pub fn with_bounds(mut self, minimum: Option<f64>, maximum: Option<f64>) -> JsonSchema {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    pub fn with_item_count(mut self, min: Option<usize>, max: Option<usize>) -> JsonSchema {
        self.min_items = min;
        self.max_items = max;
        self
    }

    pub fn kind(&self) -> SchemaKind {
        if !self.one_of.is_empty() {
            return SchemaKind::OneOf;
        }
        if !self.enumeration.is_empty() {
            return SchemaKind::Enum;
        }
        if self.constant.is_some() {
            return SchemaKind::Const;
        }
        match self.json_type {
            JsonType::Undefined => SchemaKind::Any,
            JsonType::Array => SchemaKind::Array,
            JsonType::Object if self.items.is_some() => SchemaKind::Map,
            JsonType::Object => SchemaKind::Record,
            _ => SchemaKind::Primitive,
        }
    }

    /// Wire representation, following JSON Schema keyword names.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        if !self.title.is_empty() {
            out.insert("title".into(), Value::from(self.title.as_str()));
        }
        if !self.description.is_empty() {
            out.insert("description".into(), Value::from(self.description.as_str()));
        }
        if let Some(default) = &self.default {
            out.insert("default".into(), default.clone());
        }
        match self.kind() {
            SchemaKind::Any => (),
            SchemaKind::OneOf => {
                let alternatives = self.one_of.iter().map(JsonSchema::to_value).collect();
                out.insert("oneOf".into(), Value::Array(alternatives));
            }
            SchemaKind::Enum => {
                out.insert("type".into(), Value::from(self.json_type.as_str()));
                let values = self.enumeration.iter().map(|v| Value::from(v.as_str())).collect();
                out.insert("enum".into(), Value::Array(values));
            }
            SchemaKind::Const => {
                if let Some(constant) = &self.constant {
                    out.insert("const".into(), constant.clone());
                }
            }
            SchemaKind::Primitive => {
                out.insert("type".into(), Value::from(self.json_type.as_str()));
                if let Some(minimum) = self.minimum {
                    out.insert("minimum".into(), Value::from(minimum));
                }
                if let Some(maximum) = self.maximum {
                    out.insert("maximum".into(), Value::from(maximum));
                }
            }
            SchemaKind::Array => {
                out.insert("type".into(), Value::from("array"));
                if let Some(items) = &self.items {
                    out.insert("items".into(), items.to_value());
                }
                if let Some(min) = self.min_items {
                    out.insert("minItems".into(), Value::from(min));
                }
                if let Some(max) = self.max_items {
                    out.insert("maxItems".into(), Value::from(max));
                }
            }
            SchemaKind::Map => {
                out.insert("type".into(), Value::from("object"));
                if let Some(items) = &self.items {
                    out.insert("additionalProperties".into(), items.to_value());
                }
            }
            SchemaKind::Record => {
                out.insert("type".into(), Value::from("object"));
                let mut properties = Map::new();
                let mut required = Vec::new();
                for (name, property) in &self.properties {
                    properties.insert(name.clone(), property.to_value());
                    if property.required {
                        required.push(Value::from(name.as_str()));
                    }
                }
                out.insert("properties".into(), Value::Object(properties));
                if !required.is_empty() {
                    out.insert("required".into(), Value::Array(required));
                }
                out.insert("additionalProperties".into(), Value::Bool(false));
            }
        }
        Value::Object(out)
    }
}

impl Serialize for JsonSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Builds the schema of a closed record field by field.
pub struct RecordBuilder {
    schema: JsonSchema,
}

impl RecordBuilder {
    pub fn description(mut self, description: &str) -> RecordBuilder {
        self.schema.description = description.to_string();
        self
    }

    /// Adds a mandatory field.
    pub fn field(mut self, name: &str, description: &str, schema: JsonSchema) -> RecordBuilder {
        let schema = schema.with_description(description);
        self.schema.properties.push((name.to_string(), schema));
        self
    }

    /// Adds a field the client may omit; `default` is its serialized value.
    pub fn optional(
        mut self,
        name: &str,
        description: &str,
        schema: JsonSchema,
        default: Value,
    ) -> RecordBuilder {
        let mut schema = schema.with_description(description);
        schema.required = false;
        schema.default = Some(default);
        self.schema.properties.push((name.to_string(), schema));
        self
    }

    pub fn build(self) -> JsonSchema {
        self.schema
    }
}
