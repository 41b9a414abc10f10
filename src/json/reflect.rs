// Copyright 2026 The vizrpc developers

//! Schema reflection.
//!
//! Every type that crosses the wire implements [`Reflect`]. Primitives,
//! sequences, maps and `Option` are covered here; records, enumerations
//! and sum types describe themselves with the builders of
//! [`JsonSchema`](crate::json::JsonSchema). A type may also override the
//! structural rules entirely, as `JsonSchema` does below by presenting
//! itself as an opaque object.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::json::schema::JsonSchema;
use crate::json::types::JsonType;

pub trait Reflect {
    fn json_schema() -> JsonSchema;
}

/// Shorthand for `T::json_schema()`.
pub fn get_schema<T: Reflect>() -> JsonSchema {
    T::json_schema()
}

impl Reflect for () {
    fn json_schema() -> JsonSchema {
        JsonSchema::any()
    }
}

impl Reflect for bool {
    fn json_schema() -> JsonSchema {
        JsonSchema::of_type(JsonType::Boolean)
    }
}

macro_rules! reflect_integer {
    ($($t:ty),*) => {
        $(
            impl Reflect for $t {
                fn json_schema() -> JsonSchema {
                    JsonSchema::of_type(JsonType::Integer)
                        .with_bounds(Some(<$t>::MIN as f64), Some(<$t>::MAX as f64))
                }
            }
        )*
    };
}

reflect_integer!(u8, u16, u32, u64, usize, i8, i16, i32);

impl Reflect for i64 {
    fn json_schema() -> JsonSchema {
        JsonSchema::of_type(JsonType::Integer)
    }
}

impl Reflect for f32 {
    fn json_schema() -> JsonSchema {
        JsonSchema::of_type(JsonType::Number)
    }
}

impl Reflect for f64 {
    fn json_schema() -> JsonSchema {
        JsonSchema::of_type(JsonType::Number)
    }
}

impl Reflect for String {
    fn json_schema() -> JsonSchema {
        JsonSchema::of_type(JsonType::String)
    }
}

impl Reflect for Value {
    fn json_schema() -> JsonSchema {
        JsonSchema::any()
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn json_schema() -> JsonSchema {
        JsonSchema::array(T::json_schema())
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn json_schema() -> JsonSchema {
        JsonSchema::array(T::json_schema()).with_item_count(Some(N), Some(N))
    }
}

impl<T: Reflect> Reflect for HashMap<String, T> {
    fn json_schema() -> JsonSchema {
        JsonSchema::map(T::json_schema())
    }
}

impl<T: Reflect> Reflect for BTreeMap<String, T> {
    fn json_schema() -> JsonSchema {
        JsonSchema::map(T::json_schema())
    }
}

/// `Option<T>` is the sum type `T | null`.
impl<T: Reflect> Reflect for Option<T> {
    fn json_schema() -> JsonSchema {
        JsonSchema::one_of(vec![T::json_schema(), JsonSchema::of_type(JsonType::Null)])
    }
}

impl Reflect for JsonSchema {
    fn json_schema() -> JsonSchema {
        JsonSchema::map(JsonSchema::any()).with_title("JsonSchema")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::schema::SchemaKind;

    #[test]
    fn primitive_schemas() {
        let schema = get_schema::<u8>();
        assert_eq!(schema.json_type, JsonType::Integer);
        assert_eq!(schema.minimum, Some(0.0));
        assert_eq!(schema.maximum, Some(255.0));

        assert_eq!(get_schema::<f32>().json_type, JsonType::Number);
        assert_eq!(get_schema::<String>().json_type, JsonType::String);
        assert_eq!(get_schema::<()>().kind(), SchemaKind::Any);
    }

    #[test]
    fn container_schemas() {
        let schema = get_schema::<Vec<Vec<bool>>>();
        assert_eq!(schema.kind(), SchemaKind::Array);
        let items = schema.items.expect("items");
        assert_eq!(items.kind(), SchemaKind::Array);

        let schema = get_schema::<[f32; 3]>();
        assert_eq!(schema.min_items, Some(3));
        assert_eq!(schema.max_items, Some(3));

        let schema = get_schema::<HashMap<String, HashMap<String, i64>>>();
        assert_eq!(schema.kind(), SchemaKind::Map);
        assert_eq!(schema.items.expect("items").kind(), SchemaKind::Map);

        let schema = get_schema::<Option<String>>();
        assert_eq!(schema.kind(), SchemaKind::OneOf);
        assert_eq!(schema.one_of[1].json_type, JsonType::Null);
    }

    #[test]
    fn schema_is_opaque() {
        let schema = get_schema::<JsonSchema>();
        assert_eq!(schema.kind(), SchemaKind::Map);
        assert_eq!(schema.items.expect("items").kind(), SchemaKind::Any);
    }
}
