// Copyright 2026 The vizrpc developers

//! Endpoints every deployment exposes: `version`, `registry`, `schema` and
//! `quit`.

use std::sync::{Arc, OnceLock, Weak};

use serde_derive::{Deserialize, Serialize};
use slog::{info, o, warn, Drain, Logger};
use tokio_util::sync::CancellationToken;

use crate::components::Component;
use crate::endpoint::{EndpointError, EndpointRegistry, EndpointSchema, Endpoints, Json, RegistryError};
use crate::json::{JsonSchema, Reflect};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Version {
    pub version: String,
}

impl Reflect for Version {
    fn json_schema() -> JsonSchema {
        JsonSchema::record("Version")
            .field("version", "Service version", String::json_schema())
            .build()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaRequest {
    pub endpoint: String,
}

impl Reflect for SchemaRequest {
    fn json_schema() -> JsonSchema {
        JsonSchema::record("SchemaRequest")
            .field("endpoint", "Method name", String::json_schema())
            .build()
    }
}

pub struct Builtin {
    endpoints: OnceLock<Weak<EndpointRegistry>>,
    stop: CancellationToken,
    log: Logger,
}

impl Builtin {
    pub fn new(stop: CancellationToken, log: Option<&Logger>) -> Builtin {
        let log = log
            .cloned()
            .unwrap_or_else(|| Logger::root(slog_stdlog::StdLog.fuse(), o!()));
        Builtin {
            endpoints: OnceLock::new(),
            stop,
            log,
        }
    }

    pub fn version(&self) -> Version {
        Version {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn methods(&self) -> Result<Vec<String>, EndpointError> {
        Ok(self.registry()?.methods())
    }

    pub fn schema(&self, method: &str) -> Result<EndpointSchema, EndpointError> {
        self.registry()?
            .get(method)
            .map(|endpoint| endpoint.schema().clone())
            .ok_or_else(|| EndpointError::invalid_params(format!("Unknown endpoint: '{}'", method)))
    }

    pub fn quit(&self) {
        info!(self.log, "shutdown requested");
        self.stop.cancel();
    }

    fn registry(&self) -> Result<Endpoints, EndpointError> {
        self.endpoints
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| EndpointError::internal("endpoint registry is not available"))
    }
}

impl Component for Builtin {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn register(self: Arc<Self>, endpoints: &mut EndpointRegistry) -> Result<(), RegistryError> {
        let this = Arc::clone(&self);
        endpoints.add("version", "Get the service version", move |_: ()| {
            let version = this.version();
            async move { Ok(Json(version)) }
        })?;

        let this = Arc::clone(&self);
        endpoints.add("registry", "List every registered method", move |_: ()| {
            let methods = this.methods();
            async move { methods.map(Json) }
        })?;

        let this = Arc::clone(&self);
        endpoints.add(
            "schema",
            "Get the params and result schemas of a method",
            move |Json(request): Json<SchemaRequest>| {
                let schema = this.schema(&request.endpoint);
                async move { schema.map(Json) }
            },
        )?;

        endpoints.add("quit", "Stop the service", move |_: ()| {
            self.quit();
            async { Ok(()) }
        })?;
        Ok(())
    }

    fn attach(&self, endpoints: &Endpoints) {
        // Only the first registry is kept; a Builtin serves one service.
        if self.endpoints.set(Arc::downgrade(endpoints)).is_err() {
            warn!(self.log, "already attached to a registry, ignoring another one";
                  "methods" => endpoints.len());
        }
    }
}
