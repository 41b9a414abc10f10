// Copyright 2026 The vizrpc developers

//! JSON type model, schema reflection, validation and (de)serialization.

pub mod reflect;
pub mod schema;
pub mod serializer;
pub mod types;
pub mod validator;

pub use reflect::{get_schema, Reflect};
pub use schema::{JsonSchema, RecordBuilder, SchemaKind};
pub use serializer::{deserialize, deserialize_checked, serialize, JsonError};
pub use types::JsonType;
pub use validator::{validate, JsonPath, PathItem, ValidationError};
