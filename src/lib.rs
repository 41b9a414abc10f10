// Copyright 2026 The vizrpc developers

//! vizrpc: schema-checked JSON-RPC over WebSocket
//!
//! A service answering JSON-RPC 2.0 requests from visualization clients.
//! Every method is an endpoint whose params and result schemas are derived
//! from the handler's types; params are validated before the handler runs
//! and `schema` returns both schemas to clients.
//!
//! Message framing
//!
//! A message is sent in one WebSocket frame, in one of two modes:
//!
//! * Text frame: the message is the JSON text and carries no attachment.
//!
//! * Binary frame:
//!
//! ```text
//! +---------+---------+---------+---------+--------------+-------------+
//! | SIZE0   | SIZE1   | SIZE2   | SIZE3   | JSON text    | attachment  |
//! +---------+---------+---------+---------+--------------+-------------+
//!
//!     * SIZE0...SIZE3  4-byte little-endian unsigned integer, the number of
//!                      bytes of JSON text that follow
//!
//!     * JSON text      UTF-8 JSON-RPC message
//!
//!     * attachment     the remaining bytes of the frame, opaque binary data
//!                      such as packed arrays of ids, positions or values
//! ```
//!
//! A reply uses the framing of its request, except that a reply carrying
//! an attachment is always a binary frame. Requests without an `id` are
//! notifications and get no reply.
//!
//! Errors follow JSON-RPC: `{code, message, data?}` with the reserved codes
//! -32700 (parse error), -32600 (invalid request), -32601 (method not
//! found), -32602 (invalid params) and -32603 (internal error).

#![allow(missing_docs)]

pub mod client;
pub mod components;
pub mod config;
pub mod dataset;
pub mod endpoint;
pub mod handler;
pub mod json;
pub mod protocol;
pub mod server;
pub mod service;
