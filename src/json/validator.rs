// Copyright 2026 The vizrpc developers

use std::fmt;

use serde_json::{Map, Value};

use crate::json::schema::{JsonSchema, SchemaKind};
use crate::json::types::JsonType;

/// One step from a parent value to a child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathItem {
    Key(String),
    Index(usize),
}

/// Location of a value inside a document, rendered as `key[0].sub`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonPath(pub Vec<PathItem>);

impl JsonPath {
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, item) in self.0.iter().enumerate() {
            match item {
                PathItem::Key(key) if i == 0 => write!(f, "{}", key)?,
                PathItem::Key(key) => write!(f, ".{}", key)?,
                PathItem::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub path: JsonPath,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.path.is_root() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Checks `value` against `schema`, reporting the first mismatch found.
pub fn validate(value: &Value, schema: &JsonSchema) -> Result<(), ValidationError> {
    Validator { path: Vec::new() }.check(value, schema)
}

struct Validator {
    path: Vec<PathItem>,
}

impl Validator {
    fn error(&self, message: String) -> ValidationError {
        ValidationError {
            path: JsonPath(self.path.clone()),
            message,
        }
    }

    fn nested<F>(&mut self, item: PathItem, f: F) -> Result<(), ValidationError>
    where
        F: FnOnce(&mut Validator) -> Result<(), ValidationError>,
    {
        self.path.push(item);
        let result = f(self);
        self.path.pop();
        result
    }

    fn check(&mut self, value: &Value, schema: &JsonSchema) -> Result<(), ValidationError> {
        match schema.kind() {
            SchemaKind::Any => Ok(()),
            SchemaKind::OneOf => self.check_one_of(value, schema),
            SchemaKind::Const => self.check_const(value, schema),
            SchemaKind::Enum => self.check_enum(value, schema),
            SchemaKind::Primitive => {
                self.check_type(value, schema.json_type)?;
                self.check_bounds(value, schema)
            }
            SchemaKind::Array => {
                self.check_type(value, JsonType::Array)?;
                self.check_array(value, schema)
            }
            SchemaKind::Map => {
                self.check_type(value, JsonType::Object)?;
                self.check_map(value, schema)
            }
            SchemaKind::Record => {
                self.check_type(value, JsonType::Object)?;
                self.check_record(value, schema)
            }
        }
    }

    fn check_type(&self, value: &Value, expected: JsonType) -> Result<(), ValidationError> {
        let actual = JsonType::of(value);
        if actual.satisfies(expected) {
            Ok(())
        } else {
            Err(self.error(format!(
                "Invalid type: expected {} got {}",
                expected, actual
            )))
        }
    }

    fn check_bounds(&self, value: &Value, schema: &JsonSchema) -> Result<(), ValidationError> {
        let number = match value.as_f64() {
            Some(number) => number,
            None => return Ok(()),
        };
        if let Some(minimum) = schema.minimum {
            if number < minimum {
                return Err(self.error(format!(
                    "Value below minimum: {} < {}",
                    value, minimum
                )));
            }
        }
        if let Some(maximum) = schema.maximum {
            if number > maximum {
                return Err(self.error(format!(
                    "Value above maximum: {} > {}",
                    value, maximum
                )));
            }
        }
        Ok(())
    }

    fn check_array(&mut self, value: &Value, schema: &JsonSchema) -> Result<(), ValidationError> {
        let items = match value.as_array() {
            Some(items) => items,
            None => return Ok(()),
        };
        if let Some(min) = schema.min_items {
            if items.len() < min {
                return Err(self.error(format!(
                    "Not enough items: {} < {}",
                    items.len(),
                    min
                )));
            }
        }
        if let Some(max) = schema.max_items {
            if items.len() > max {
                return Err(self.error(format!(
                    "Too many items: {} > {}",
                    items.len(),
                    max
                )));
            }
        }
        if let Some(item_schema) = &schema.items {
            for (i, item) in items.iter().enumerate() {
                self.nested(PathItem::Index(i), |v| v.check(item, item_schema))?;
            }
        }
        Ok(())
    }

    fn check_map(&mut self, value: &Value, schema: &JsonSchema) -> Result<(), ValidationError> {
        let (object, item_schema) = match (value.as_object(), &schema.items) {
            (Some(object), Some(item_schema)) => (object, item_schema),
            _ => return Ok(()),
        };
        for (key, item) in object {
            self.nested(PathItem::Key(key.clone()), |v| v.check(item, item_schema))?;
        }
        Ok(())
    }

    fn check_record(&mut self, value: &Value, schema: &JsonSchema) -> Result<(), ValidationError> {
        let empty = Map::new();
        let object = value.as_object().unwrap_or(&empty);
        for (name, property) in &schema.properties {
            if property.required && !object.contains_key(name) {
                return Err(self.error(format!("Missing required property: '{}'", name)));
            }
        }
        for key in object.keys() {
            if !schema.properties.iter().any(|(name, _)| name == key) {
                return Err(self.error(format!("Unknown property: '{}'", key)));
            }
        }
        for (name, property) in &schema.properties {
            if let Some(item) = object.get(name) {
                self.nested(PathItem::Key(name.clone()), |v| v.check(item, property))?;
            }
        }
        Ok(())
    }

    fn check_enum(&self, value: &Value, schema: &JsonSchema) -> Result<(), ValidationError> {
        self.check_type(value, JsonType::String)?;
        let name = value.as_str().unwrap_or_default();
        if schema.enumeration.iter().any(|candidate| candidate == name) {
            Ok(())
        } else {
            Err(self.error(format!(
                "Invalid enum: '{}' not in [{}]",
                name,
                schema.enumeration.join(", ")
            )))
        }
    }

    fn check_const(&self, value: &Value, schema: &JsonSchema) -> Result<(), ValidationError> {
        match &schema.constant {
            Some(constant) if constant != value => Err(self.error(format!(
                "Invalid const: expected {} got {}",
                constant, value
            ))),
            _ => Ok(()),
        }
    }

    fn check_one_of(&mut self, value: &Value, schema: &JsonSchema) -> Result<(), ValidationError> {
        for alternative in &schema.one_of {
            if self.check(value, alternative).is_ok() {
                return Ok(());
            }
        }
        Err(self.error("Invalid oneOf".to_string()))
    }
}
