// Copyright 2026 The vizrpc developers

//! JSON-RPC 2.0 wire records and the two framings used to carry them.

use std::fmt;
use std::str;

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const JSONRPC_VERSION: &str = "2.0";

const FRAME_OFF_SIZE: usize = 0x0;
const FRAME_OFF_TEXT: usize = 0x4;

const FRAME_HEADER_SZ: usize = FRAME_OFF_TEXT;

/// Reserved JSON-RPC error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum ErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        ToPrimitive::to_i32(&self).unwrap_or(-32603)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RequestId::Int(id) => write!(f, "{}", id),
            RequestId::Text(id) => f.write_str(id),
        }
    }
}

/// The `error` member of a JSON-RPC error reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message} (code {code})")]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> JsonRpcError {
        JsonRpcError {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(message: impl Into<String>) -> JsonRpcError {
        JsonRpcError::new(ErrorCode::ParseError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> JsonRpcError {
        JsonRpcError::new(ErrorCode::InvalidRequest, message)
    }

    pub fn method_not_found(method: &str) -> JsonRpcError {
        JsonRpcError::new(
            ErrorCode::MethodNotFound,
            format!("Method '{}' not found", method),
        )
    }

    pub fn invalid_params(message: impl Into<String>) -> JsonRpcError {
        JsonRpcError::new(ErrorCode::InvalidParams, message)
    }

    pub fn internal_error(message: impl Into<String>) -> JsonRpcError {
        JsonRpcError::new(ErrorCode::InternalError, message)
    }

    pub fn with_data(mut self, data: Value) -> JsonRpcError {
        self.data = Some(data);
        self
    }

    /// The reserved code this error carries, if any.
    pub fn error_code(&self) -> Option<ErrorCode> {
        FromPrimitive::from_i32(self.code)
    }
}

/// Which kind of WebSocket frame carried a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    Text,
    Binary,
}

/// One transport message.
///
/// A binary frame is laid out as:
///
/// * SIZE    4-byte little-endian unsigned integer, the number of bytes of
///           JSON text that follow
/// * TEXT    SIZE bytes of UTF-8 encoded JSON
/// * BINARY  every remaining byte, the opaque attachment
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

impl Frame {
    pub fn mode(&self) -> FramingMode {
        match self {
            Frame::Text(_) => FramingMode::Text,
            Frame::Binary(_) => FramingMode::Binary,
        }
    }

    /// Builds a frame for `text` and `binary`. A non-empty attachment forces
    /// binary framing whatever mode was asked for.
    pub fn compose(mode: FramingMode, text: String, binary: &[u8]) -> Frame {
        if mode == FramingMode::Text && binary.is_empty() {
            Frame::Text(text)
        } else {
            Frame::Binary(encode_binary(&text, binary))
        }
    }

    /// Splits the frame into its JSON text and binary attachment.
    pub fn split(&self) -> Result<(&str, Bytes), JsonRpcError> {
        match self {
            Frame::Text(text) => Ok((text.as_str(), Bytes::new())),
            Frame::Binary(buf) => {
                let (text, binary) = decode_binary(buf)?;
                Ok((text, buf.slice_ref(binary)))
            }
        }
    }
}

pub fn encode_binary(text: &str, binary: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_SZ + text.len() + binary.len());
    buf.put_u32_le(text.len() as u32);
    buf.put_slice(text.as_bytes());
    buf.put_slice(binary);
    buf.freeze()
}

pub fn decode_binary(buf: &[u8]) -> Result<(&str, &[u8]), JsonRpcError> {
    check_buffer_size(buf)?;
    let text_size = LittleEndian::read_u32(&buf[FRAME_OFF_SIZE..FRAME_OFF_TEXT]) as usize;
    validate_text_size(buf, text_size)?;
    let end = FRAME_OFF_TEXT + text_size;
    let text = parse_text(&buf[FRAME_OFF_TEXT..end])?;
    Ok((text, &buf[end..]))
}

fn check_buffer_size(buf: &[u8]) -> Result<(), JsonRpcError> {
    if buf.len() < FRAME_HEADER_SZ {
        let msg = format!(
            "Invalid binary frame: {} bytes is less than the {} byte header",
            buf.len(),
            FRAME_HEADER_SZ
        );
        Err(JsonRpcError::parse_error(msg))
    } else {
        Ok(())
    }
}

fn validate_text_size(buf: &[u8], text_size: usize) -> Result<(), JsonRpcError> {
    if FRAME_HEADER_SZ + text_size > buf.len() {
        let msg = format!(
            "Invalid binary frame: text size {} + {} exceeds frame size {}",
            text_size,
            FRAME_HEADER_SZ,
            buf.len()
        );
        Err(JsonRpcError::parse_error(msg))
    } else {
        Ok(())
    }
}

fn parse_text(buf: &[u8]) -> Result<&str, JsonRpcError> {
    str::from_utf8(buf)
        .map_err(|e| JsonRpcError::parse_error(format!("Invalid UTF-8 in frame text: {}", e)))
}

#[derive(Serialize, Deserialize)]
struct RequestMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jsonrpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<RequestId>,
    method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    params: Value,
}

#[derive(Serialize, Deserialize)]
struct ResponseMessage {
    jsonrpc: String,
    id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

fn to_text<T: serde::Serialize>(message: &T) -> Result<String, JsonRpcError> {
    serde_json::to_string(message)
        .map_err(|e| JsonRpcError::internal_error(format!("Failed to encode message: {}", e)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    /// `None` marks a notification, which gets no reply.
    pub id: Option<RequestId>,
    pub method: String,
    pub params: Value,
    pub binary: Bytes,
}

impl JsonRpcRequest {
    pub fn new(id: Option<RequestId>, method: impl Into<String>, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            id,
            method: method.into(),
            params,
            binary: Bytes::new(),
        }
    }

    pub fn with_binary(mut self, binary: Bytes) -> JsonRpcRequest {
        self.binary = binary;
        self
    }

    pub fn parse(frame: &Frame) -> Result<JsonRpcRequest, JsonRpcError> {
        let (text, binary) = frame.split()?;
        let value: Value = serde_json::from_str(text)
            .map_err(|e| JsonRpcError::parse_error(format!("Invalid JSON: {}", e)))?;
        let message: RequestMessage = serde_json::from_value(value)
            .map_err(|e| JsonRpcError::invalid_request(format!("Invalid request: {}", e)))?;

        match message.jsonrpc.as_deref() {
            Some(version) if version != JSONRPC_VERSION => {
                Err(JsonRpcError::invalid_request(format!(
                    "Unsupported JSON-RPC version '{}', expected '{}'",
                    version, JSONRPC_VERSION
                )))
            }
            _ => Ok(JsonRpcRequest {
                id: message.id,
                method: message.method,
                params: message.params,
                binary,
            }),
        }
    }

    pub fn to_frame(&self, mode: FramingMode) -> Result<Frame, JsonRpcError> {
        let text = to_text(&RequestMessage {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id: self.id.clone(),
            method: self.method.clone(),
            params: self.params.clone(),
        })?;
        Ok(Frame::compose(mode, text, &self.binary))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcReply {
    pub id: RequestId,
    pub result: Value,
    pub binary: Bytes,
}

impl JsonRpcReply {
    pub fn to_frame(&self, mode: FramingMode) -> Result<Frame, JsonRpcError> {
        let text = to_text(&ResponseMessage {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(self.id.clone()),
            result: Some(self.result.clone()),
            error: None,
        })?;
        Ok(Frame::compose(mode, text, &self.binary))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcErrorReply {
    /// `None` when the request id could not be recovered.
    pub id: Option<RequestId>,
    pub error: JsonRpcError,
}

impl JsonRpcErrorReply {
    pub fn to_frame(&self, mode: FramingMode) -> Result<Frame, JsonRpcError> {
        let text = to_text(&ResponseMessage {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: self.id.clone(),
            result: None,
            error: Some(self.error.clone()),
        })?;
        Ok(Frame::compose(mode, text, &[]))
    }
}

/// What a client reads back for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonRpcResponse {
    Reply(JsonRpcReply),
    Error(JsonRpcErrorReply),
}

impl JsonRpcResponse {
    pub fn parse(frame: &Frame) -> Result<JsonRpcResponse, JsonRpcError> {
        let (text, binary) = frame.split()?;
        let message: ResponseMessage = serde_json::from_str(text)
            .map_err(|e| JsonRpcError::parse_error(format!("Invalid reply: {}", e)))?;

        if let Some(error) = message.error {
            return Ok(JsonRpcResponse::Error(JsonRpcErrorReply {
                id: message.id,
                error,
            }));
        }
        match message.id {
            Some(id) => Ok(JsonRpcResponse::Reply(JsonRpcReply {
                id,
                result: message.result.unwrap_or(Value::Null),
                binary,
            })),
            None => Err(JsonRpcError::invalid_request("Reply without id or error")),
        }
    }

    pub fn id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcResponse::Reply(reply) => Some(&reply.id),
            JsonRpcResponse::Error(error) => error.id.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;
    use serde_json::json;

    fn text(frame: &Frame) -> Value {
        let (text, _) = frame.split().unwrap();
        serde_json::from_str(text).unwrap()
    }

    quickcheck! {
        fn prop_binary_framing(text: String, binary: Vec<u8>) -> bool {
            let frame = encode_binary(&text, &binary);
            match decode_binary(&frame) {
                Ok((t, b)) => t == text && b == &binary[..],
                Err(_) => false,
            }
        }
    }

    #[test]
    fn reply_with_attachment() {
        let reply = JsonRpcReply {
            id: RequestId::Int(1),
            result: json!({"count": 3}),
            binary: Bytes::from_static(&[1, 2, 3, 255]),
        };
        let frame = reply.to_frame(FramingMode::Text).unwrap();
        assert_eq!(frame.mode(), FramingMode::Binary);

        let (body, binary) = frame.split().unwrap();
        let expected = r#"{"jsonrpc":"2.0","id":1,"result":{"count":3}}"#;
        assert_eq!(body, expected);
        assert_eq!(&binary[..], &[1, 2, 3, 255]);

        match JsonRpcResponse::parse(&frame).unwrap() {
            JsonRpcResponse::Reply(decoded) => assert_eq!(decoded, reply),
            JsonRpcResponse::Error(_) => panic!("expected a reply"),
        }
    }

    #[test]
    fn oversized_text_length() {
        let mut buf = encode_binary("{}", &[]).to_vec();
        buf[0] = 10;
        let err = decode_binary(&buf).unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::ParseError));
        assert!(err.message.contains("exceeds frame size"));

        let err = decode_binary(&[1, 0]).unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::ParseError));
    }

    #[test]
    fn parse_requests() {
        let frame = Frame::Text(r#"{"jsonrpc":"2.0","id":1,"method":"version"}"#.into());
        let request = JsonRpcRequest::parse(&frame).unwrap();
        assert_eq!(request.id, Some(RequestId::Int(1)));
        assert_eq!(request.method, "version");
        assert_eq!(request.params, Value::Null);

        let frame = Frame::Text(r#"{"id":"a","method":"m","params":[1]}"#.into());
        let request = JsonRpcRequest::parse(&frame).unwrap();
        assert_eq!(request.id, Some(RequestId::Text("a".into())));
        assert_eq!(request.params, json!([1]));

        let frame = Frame::Text(r#"{"jsonrpc":"2.0","method":"quit"}"#.into());
        assert_eq!(JsonRpcRequest::parse(&frame).unwrap().id, None);
    }

    #[test]
    fn parse_binary_request() {
        let request = JsonRpcRequest::new(Some(RequestId::Int(4)), "upload", json!({"a": 1}))
            .with_binary(Bytes::from_static(b"data"));
        let frame = request.to_frame(FramingMode::Binary).unwrap();
        assert_eq!(JsonRpcRequest::parse(&frame).unwrap(), request);
    }

    #[test]
    fn reject_bad_requests() {
        let frame = Frame::Text("{not json".into());
        let err = JsonRpcRequest::parse(&frame).unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::ParseError));

        let frame = Frame::Text(r#"{"jsonrpc":"1.0","id":1,"method":"version"}"#.into());
        let err = JsonRpcRequest::parse(&frame).unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::InvalidRequest));

        let frame = Frame::Text(r#"{"jsonrpc":"2.0","id":1}"#.into());
        let err = JsonRpcRequest::parse(&frame).unwrap_err();
        assert_eq!(err.error_code(), Some(ErrorCode::InvalidRequest));
    }

    #[test]
    fn error_reply_without_id() {
        let reply = JsonRpcErrorReply {
            id: None,
            error: JsonRpcError::parse_error("bad").with_data(json!("detail")),
        };
        let frame = reply.to_frame(FramingMode::Text).unwrap();
        assert_eq!(
            text(&frame),
            json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": {"code": -32700, "message": "bad", "data": "detail"}
            })
        );
        match JsonRpcResponse::parse(&frame).unwrap() {
            JsonRpcResponse::Error(decoded) => assert_eq!(decoded, reply),
            JsonRpcResponse::Reply(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn codes_round_trip() {
        let err = JsonRpcError::method_not_found("nope");
        assert_eq!(err.code, -32601);
        assert_eq!(err.error_code(), Some(ErrorCode::MethodNotFound));
        let custom = JsonRpcError {
            code: 7,
            message: String::new(),
            data: None,
        };
        assert_eq!(custom.error_code(), None);
    }
}
