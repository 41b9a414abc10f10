// Copyright 2026 The vizrpc developers

//! Conversion between decoded JSON values and typed records.
//!
//! The structural rules map onto serde as follows:
//!
//! * records are `#[derive(Serialize, Deserialize)]` structs; fields with a
//!   default carry `#[serde(default)]` and internal fields `#[serde(skip)]`
//! * enumerations serialize as their string names
//! * sum types are `#[serde(untagged)]` enums, which try the alternatives in
//!   declaration order and keep the first that deserializes
//! * literals implement `Deserialize` by hand and reject any other value

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::json::reflect::Reflect;
use crate::json::validator::{validate, ValidationError};

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Failed to serialize value: {0}")]
    Serialize(serde_json::Error),
    #[error("Failed to deserialize value: {0}")]
    Deserialize(serde_json::Error),
}

pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Value, JsonError> {
    serde_json::to_value(value).map_err(JsonError::Serialize)
}

pub fn deserialize<T: DeserializeOwned>(value: Value) -> Result<T, JsonError> {
    serde_json::from_value(value).map_err(JsonError::Deserialize)
}

/// Validates `value` against the schema of `T` before deserializing it, so
/// that a mismatch is reported with its path.
pub fn deserialize_checked<T>(value: Value) -> Result<T, JsonError>
where
    T: DeserializeOwned + Reflect,
{
    validate(&value, &T::json_schema())?;
    deserialize(value)
}
