// Copyright 2026 The vizrpc developers

use futures::future::{BoxFuture, FutureExt};
use slog::{debug, error, o, warn, Drain, Logger};

use crate::endpoint::{EndpointError, EndpointParams, EndpointResult, Endpoints};
use crate::json;
use crate::protocol::{
    Frame, FramingMode, JsonRpcError, JsonRpcErrorReply, JsonRpcReply, JsonRpcRequest, RequestId,
};
use crate::server::FrameHandler;

/// Turns one inbound frame into at most one outbound frame:
/// parse, validate, dispatch, serialize, reply.
pub struct JsonRpcHandler {
    endpoints: Endpoints,
    log: Logger,
}

impl JsonRpcHandler {
    pub fn new(endpoints: Endpoints, log: Option<&Logger>) -> JsonRpcHandler {
        let log = log
            .cloned()
            .unwrap_or_else(|| Logger::root(slog_stdlog::StdLog.fuse(), o!()));
        JsonRpcHandler { endpoints, log }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub async fn handle_frame(&self, frame: Frame) -> Option<Frame> {
        let mode = frame.mode();
        let request = match JsonRpcRequest::parse(&frame) {
            Ok(request) => request,
            Err(err) => {
                warn!(self.log, "failed to parse request"; "err" => %err);
                return Some(self.error_frame(None, err, mode));
            }
        };

        let id = request.id.clone();
        let method = request.method.clone();
        debug!(self.log, "handling request";
               "method" => &method, "id" => id.as_ref().map(RequestId::to_string));

        let outcome = self.dispatch(request).await;
        if let Err(err) = &outcome {
            warn!(self.log, "request failed"; "method" => &method, "err" => %err);
        }

        let id = match id {
            Some(id) => id,
            None => return None,
        };
        let frame = match outcome {
            Ok(result) => JsonRpcReply {
                id: id.clone(),
                result: result.value,
                binary: result.binary,
            }
            .to_frame(mode),
            Err(err) => return Some(self.error_frame(Some(id), err, mode)),
        };
        match frame {
            Ok(frame) => Some(frame),
            Err(err) => Some(self.error_frame(Some(id), err, mode)),
        }
    }

    pub async fn dispatch(&self, request: JsonRpcRequest) -> Result<EndpointResult, JsonRpcError> {
        let endpoint = self
            .endpoints
            .get(&request.method)
            .ok_or_else(|| JsonRpcError::method_not_found(&request.method))?;

        json::validate(&request.params, &endpoint.schema().params)
            .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?;

        let call = endpoint.call(EndpointParams {
            value: request.params,
            binary: request.binary,
        });
        let result = match tokio::spawn(call).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => return Err(err.into_rpc()),
            Err(err) => return Err(EndpointError::internal(err).into_rpc()),
        };

        if let Err(err) = json::validate(&result.value, &endpoint.schema().result) {
            warn!(self.log, "result does not match its schema";
                  "method" => &request.method, "err" => %err);
        }
        Ok(result)
    }

    fn error_frame(&self, id: Option<RequestId>, error: JsonRpcError, mode: FramingMode) -> Frame {
        let reply = JsonRpcErrorReply { id, error };
        match reply.to_frame(mode) {
            Ok(frame) => frame,
            Err(err) => {
                error!(self.log, "failed to encode error reply"; "err" => %err);
                let text = format!(
                    r#"{{"jsonrpc":"2.0","id":null,"error":{{"code":{},"message":"Internal error"}}}}"#,
                    err.code
                );
                Frame::compose(mode, text, &[])
            }
        }
    }
}

impl FrameHandler for JsonRpcHandler {
    fn handle<'a>(&'a self, frame: Frame) -> BoxFuture<'a, Option<Frame>> {
        self.handle_frame(frame).boxed()
    }
}
