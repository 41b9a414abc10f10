// Copyright 2026 The vizrpc developers

//! A minimal JSON-RPC client for the WebSocket service.
//!
//! Requests are sent one at a time and each call waits for the matching
//! reply, mirroring how the server processes a connection. Plain requests
//! use text frames; requests carrying a binary attachment use binary
//! frames.

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::MaybeTlsStream;

use crate::protocol::{
    Frame, FramingMode, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId,
};
use crate::server::{Connection, TransportError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Transport(#[from] TransportError),
    #[error("invalid reply: {0}")]
    Protocol(JsonRpcError),
    #[error("remote error: {0}")]
    Rpc(JsonRpcError),
    #[error("connection closed before the reply arrived")]
    Closed,
    #[error("reply id {got:?} does not match request id {expected}")]
    UnexpectedId {
        expected: RequestId,
        got: Option<RequestId>,
    },
}

impl From<tungstenite::Error> for ClientError {
    fn from(err: tungstenite::Error) -> Self {
        ClientError::Transport(TransportError::WebSocket(err))
    }
}

/// Result of a call: the JSON result and the reply's attachment, empty
/// unless the method returns binary data.
#[derive(Debug, Clone, PartialEq)]
pub struct CallResult {
    pub value: Value,
    pub binary: Bytes,
}

pub struct Client {
    connection: Connection<MaybeTlsStream<TcpStream>>,
    next_id: i64,
}

impl Client {
    /// Connects to a `ws://` or `wss://` URL.
    pub async fn connect(url: &str) -> Result<Client, ClientError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url).await?;
        Ok(Client {
            connection: Connection::new(stream),
            next_id: 1,
        })
    }

    pub async fn request(&mut self, method: &str, params: Value) -> Result<Value, ClientError> {
        let result = self.call(method, params, Bytes::new()).await?;
        Ok(result.value)
    }

    /// Sends a request with no id. The server never replies to it.
    pub async fn notify(&mut self, method: &str, params: Value) -> Result<(), ClientError> {
        let request = JsonRpcRequest::new(None, method, params);
        let frame = request.to_frame(FramingMode::Text).map_err(ClientError::Protocol)?;
        self.send_frame(frame).await
    }

    /// Sends `binary` along with the params when it is not empty, in which
    /// case the request goes out as a binary frame.
    pub async fn call(
        &mut self,
        method: &str,
        params: Value,
        binary: Bytes,
    ) -> Result<CallResult, ClientError> {
        let id = RequestId::Int(self.next_id);
        self.next_id += 1;

        let mode = if binary.is_empty() {
            FramingMode::Text
        } else {
            FramingMode::Binary
        };
        let request = JsonRpcRequest::new(Some(id.clone()), method, params).with_binary(binary);
        let frame = request.to_frame(mode).map_err(ClientError::Protocol)?;
        self.send_frame(frame).await?;

        let frame = self.receive_frame().await?.ok_or(ClientError::Closed)?;
        let response = JsonRpcResponse::parse(&frame).map_err(ClientError::Protocol)?;
        match response {
            JsonRpcResponse::Reply(reply) if reply.id == id => Ok(CallResult {
                value: reply.result,
                binary: reply.binary,
            }),
            // A null id reports a request the server could not parse.
            JsonRpcResponse::Error(reply) if reply.id.is_none() || reply.id.as_ref() == Some(&id) => {
                Err(ClientError::Rpc(reply.error))
            }
            JsonRpcResponse::Reply(reply) => Err(ClientError::UnexpectedId {
                expected: id,
                got: Some(reply.id),
            }),
            JsonRpcResponse::Error(reply) => Err(ClientError::UnexpectedId {
                expected: id,
                got: reply.id,
            }),
        }
    }

    pub async fn send_frame(&mut self, frame: Frame) -> Result<(), ClientError> {
        self.connection.send(frame).await?;
        Ok(())
    }

    pub async fn receive_frame(&mut self) -> Result<Option<Frame>, ClientError> {
        Ok(self.connection.receive().await?)
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.connection.close().await?;
        Ok(())
    }
}
