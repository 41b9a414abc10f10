// Copyright 2026 The vizrpc developers

//! Typed endpoints.
//!
//! A handler is any `Fn(P) -> impl Future<Output = Result<R, EndpointError>>`
//! where `P` is one of:
//!
//! * `()`: the endpoint takes no params, nothing is decoded
//! * [`Json<T>`]: params are decoded into `T`
//! * [`Params<T>`]: like `Json<T>`, and the request's binary attachment is
//!   handed over untouched
//!
//! and `R` is `()`, [`Json<T>`] or [`Output<T>`] (a value plus a binary
//! attachment). The shape of both sides is fixed by the types when the
//! endpoint is registered and the schemas are derived once from `T`.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::io;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::{self, BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde_derive::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::json::{self, JsonError, JsonSchema, Reflect};
use crate::protocol::JsonRpcError;

/// Decoded params of a request as handed to an endpoint.
#[derive(Debug, Clone, Default)]
pub struct EndpointParams {
    pub value: Value,
    pub binary: Bytes,
}

/// What an endpoint produced, ready to be framed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointResult {
    pub value: Value,
    pub binary: Bytes,
}

/// Failure of an endpoint.
///
/// `Rpc` errors were raised on purpose and reach the client unchanged;
/// anything else is reported as an internal error.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error(transparent)]
    Rpc(#[from] JsonRpcError),
    #[error("{0}")]
    Internal(String),
}

impl EndpointError {
    pub fn invalid_params(message: impl Into<String>) -> EndpointError {
        EndpointError::Rpc(JsonRpcError::invalid_params(message))
    }

    pub fn internal(err: impl fmt::Display) -> EndpointError {
        EndpointError::Internal(err.to_string())
    }

    pub fn into_rpc(self) -> JsonRpcError {
        match self {
            EndpointError::Rpc(err) => err,
            EndpointError::Internal(text) => {
                JsonRpcError::internal_error(format!("Internal error: {}", text))
                    .with_data(Value::String(text))
            }
        }
    }
}

impl From<JsonError> for EndpointError {
    fn from(err: JsonError) -> Self {
        match err {
            JsonError::Serialize(_) => EndpointError::internal(err),
            _ => EndpointError::invalid_params(err.to_string()),
        }
    }
}

impl From<io::Error> for EndpointError {
    fn from(err: io::Error) -> Self {
        EndpointError::internal(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamsShape {
    None,
    Value,
    ValueWithBinary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    None,
    Value,
    ValueWithBinary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerShape {
    pub params: ParamsShape,
    pub result: ResultShape,
}

/// Plain typed params or result.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

/// Typed params together with the request's binary attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct Params<T> {
    pub value: T,
    pub binary: Bytes,
}

/// Typed result together with a binary attachment for the reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Output<T> {
    pub value: T,
    pub binary: Bytes,
}

impl<T> Output<T> {
    pub fn new(value: T, binary: impl Into<Bytes>) -> Output<T> {
        Output {
            value,
            binary: binary.into(),
        }
    }
}

pub trait FromParams: Sized + Send + 'static {
    const SHAPE: ParamsShape;

    fn schema() -> JsonSchema;

    fn from_params(params: EndpointParams) -> Result<Self, EndpointError>;
}

impl FromParams for () {
    const SHAPE: ParamsShape = ParamsShape::None;

    fn schema() -> JsonSchema {
        JsonSchema::any()
    }

    fn from_params(_params: EndpointParams) -> Result<Self, EndpointError> {
        Ok(())
    }
}

impl<T: Reflect + DeserializeOwned + Send + 'static> FromParams for Json<T> {
    const SHAPE: ParamsShape = ParamsShape::Value;

    fn schema() -> JsonSchema {
        T::json_schema()
    }

    fn from_params(params: EndpointParams) -> Result<Self, EndpointError> {
        Ok(Json(json::deserialize(params.value)?))
    }
}

impl<T: Reflect + DeserializeOwned + Send + 'static> FromParams for Params<T> {
    const SHAPE: ParamsShape = ParamsShape::ValueWithBinary;

    fn schema() -> JsonSchema {
        T::json_schema()
    }

    fn from_params(params: EndpointParams) -> Result<Self, EndpointError> {
        Ok(Params {
            value: json::deserialize(params.value)?,
            binary: params.binary,
        })
    }
}

pub trait IntoResult: Send + 'static {
    const SHAPE: ResultShape;

    fn schema() -> JsonSchema;

    fn into_result(self) -> Result<EndpointResult, EndpointError>;
}

impl IntoResult for () {
    const SHAPE: ResultShape = ResultShape::None;

    fn schema() -> JsonSchema {
        JsonSchema::any()
    }

    fn into_result(self) -> Result<EndpointResult, EndpointError> {
        Ok(EndpointResult::default())
    }
}

impl<T: Reflect + serde::Serialize + Send + 'static> IntoResult for Json<T> {
    const SHAPE: ResultShape = ResultShape::Value;

    fn schema() -> JsonSchema {
        T::json_schema()
    }

    fn into_result(self) -> Result<EndpointResult, EndpointError> {
        Ok(EndpointResult {
            value: json::serialize(&self.0)?,
            binary: Bytes::new(),
        })
    }
}

impl<T: Reflect + serde::Serialize + Send + 'static> IntoResult for Output<T> {
    const SHAPE: ResultShape = ResultShape::ValueWithBinary;

    fn schema() -> JsonSchema {
        T::json_schema()
    }

    fn into_result(self) -> Result<EndpointResult, EndpointError> {
        Ok(EndpointResult {
            value: json::serialize(&self.value)?,
            binary: self.binary,
        })
    }
}

/// Public description of an endpoint, as returned by `schema`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSchema {
    pub method: String,
    pub description: String,
    pub params: JsonSchema,
    pub result: JsonSchema,
}

impl Reflect for EndpointSchema {
    fn json_schema() -> JsonSchema {
        JsonSchema::record("EndpointSchema")
            .field("method", "Method name", String::json_schema())
            .field("description", "What the method does", String::json_schema())
            .field("params", "Schema of the params", JsonSchema::json_schema())
            .field("result", "Schema of the result", JsonSchema::json_schema())
            .build()
    }
}

type HandlerFn =
    dyn Fn(EndpointParams) -> BoxFuture<'static, Result<EndpointResult, EndpointError>> + Send + Sync;

pub struct Endpoint {
    schema: EndpointSchema,
    shape: HandlerShape,
    handler: Box<HandlerFn>,
}

impl Endpoint {
    pub fn new<P, R, F, Fut>(method: &str, description: &str, handler: F) -> Endpoint
    where
        P: FromParams,
        R: IntoResult,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, EndpointError>> + Send + 'static,
    {
        let schema = EndpointSchema {
            method: method.to_string(),
            description: description.to_string(),
            params: P::schema(),
            result: R::schema(),
        };
        let shape = HandlerShape {
            params: P::SHAPE,
            result: R::SHAPE,
        };
        let handler = move |params: EndpointParams| match P::from_params(params) {
            Ok(input) => handler(input)
                .map(|output| output.and_then(IntoResult::into_result))
                .boxed(),
            Err(err) => future::ready(Err(err)).boxed(),
        };

        Endpoint {
            schema,
            shape,
            handler: Box::new(handler),
        }
    }

    pub fn method(&self) -> &str {
        &self.schema.method
    }

    pub fn schema(&self) -> &EndpointSchema {
        &self.schema
    }

    pub fn shape(&self) -> HandlerShape {
        self.shape
    }

    pub fn call(
        &self,
        params: EndpointParams,
    ) -> BoxFuture<'static, Result<EndpointResult, EndpointError>> {
        (self.handler)(params)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("schema", &self.schema)
            .field("shape", &self.shape)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Duplicate endpoint method: '{0}'")]
    DuplicateMethod(String),
}

/// Table of every endpoint exposed by a service.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    endpoints: BTreeMap<String, Endpoint>,
}

impl EndpointRegistry {
    pub fn new() -> EndpointRegistry {
        EndpointRegistry::default()
    }

    pub fn insert(&mut self, endpoint: Endpoint) -> Result<(), RegistryError> {
        let method = endpoint.method().to_string();
        if self.endpoints.contains_key(&method) {
            return Err(RegistryError::DuplicateMethod(method));
        }
        self.endpoints.insert(method, endpoint);
        Ok(())
    }

    pub fn add<P, R, F, Fut>(
        &mut self,
        method: &str,
        description: &str,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        P: FromParams,
        R: IntoResult,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, EndpointError>> + Send + 'static,
    {
        self.insert(Endpoint::new(method, description, handler))
    }

    pub fn get(&self, method: &str) -> Option<&Endpoint> {
        self.endpoints.get(method)
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<String> {
        self.endpoints.keys().cloned().collect()
    }

    pub fn schemas(&self) -> Vec<EndpointSchema> {
        self.endpoints.values().map(|e| e.schema().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Shared, frozen registry.
pub type Endpoints = Arc<EndpointRegistry>;
