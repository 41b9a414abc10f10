// Copyright 2026 The vizrpc developers

use std::fmt;

use serde_json::Value;

/// The closed set of JSON value kinds known to the schema engine.
///
/// `Undefined` is used by schemas that place no constraint on the value
/// (for example the params of an endpoint that takes none).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonType {
    Undefined,
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    pub fn as_str(self) -> &'static str {
        match self {
            JsonType::Undefined => "undefined",
            JsonType::Null => "null",
            JsonType::Boolean => "boolean",
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Array => "array",
            JsonType::Object => "object",
        }
    }

    /// Kind of an already decoded value. Numbers without a fractional
    /// representation are reported as `Integer`.
    pub fn of(value: &Value) -> JsonType {
        match value {
            Value::Null => JsonType::Null,
            Value::Bool(_) => JsonType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => JsonType::Integer,
            Value::Number(_) => JsonType::Number,
            Value::String(_) => JsonType::String,
            Value::Array(_) => JsonType::Array,
            Value::Object(_) => JsonType::Object,
        }
    }

    pub fn is_primitive(self) -> bool {
        !matches!(
            self,
            JsonType::Undefined | JsonType::Array | JsonType::Object
        )
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, JsonType::Integer | JsonType::Number)
    }

    /// Whether a value of kind `self` is acceptable where `expected` is
    /// required. An integer satisfies a number, never the reverse.
    pub fn satisfies(self, expected: JsonType) -> bool {
        match expected {
            JsonType::Undefined => true,
            JsonType::Number => self.is_numeric(),
            _ => self == expected,
        }
    }
}

impl Default for JsonType {
    fn default() -> Self {
        JsonType::Undefined
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_kinds() {
        assert_eq!(JsonType::of(&json!(null)), JsonType::Null);
        assert_eq!(JsonType::of(&json!(true)), JsonType::Boolean);
        assert_eq!(JsonType::of(&json!(-3)), JsonType::Integer);
        assert_eq!(JsonType::of(&json!(u64::max_value())), JsonType::Integer);
        assert_eq!(JsonType::of(&json!(1.5)), JsonType::Number);
        assert_eq!(JsonType::of(&json!("1")), JsonType::String);
        assert_eq!(JsonType::of(&json!([])), JsonType::Array);
        assert_eq!(JsonType::of(&json!({})), JsonType::Object);
    }

    #[test]
    fn integer_is_a_number() {
        assert!(JsonType::Integer.satisfies(JsonType::Number));
        assert!(!JsonType::Number.satisfies(JsonType::Integer));
        assert!(!JsonType::Boolean.satisfies(JsonType::Integer));
        assert!(JsonType::Object.satisfies(JsonType::Undefined));
    }
}
