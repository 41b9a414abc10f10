// Copyright 2026 The vizrpc developers

//! Wires the components into an endpoint registry and serves it.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use slog::{error, info, o, Drain, Logger};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::components::{Builtin, Component, ResourceRegistry};
use crate::config::ConfigError;
use crate::dataset::DatasetProvider;
use crate::endpoint::{EndpointRegistry, Endpoints, RegistryError};
use crate::handler::JsonRpcHandler;
use crate::server::{Server, ServerOptions, TransportError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("registration error: {0}")]
    Registry(#[from] RegistryError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Builds the endpoint registry from `components`. Every component sees the
/// finished registry before it is returned.
pub fn build_registry(components: &[Arc<dyn Component>], log: &Logger) -> Result<Endpoints, RegistryError> {
    let mut registry = EndpointRegistry::new();
    for component in components {
        Arc::clone(component).register(&mut registry)?;
        info!(log, "registered component"; "component" => component.name());
    }

    let endpoints = Arc::new(registry);
    for component in components {
        component.attach(&endpoints);
    }
    Ok(endpoints)
}

pub struct Service {
    server: Server,
    handler: Arc<JsonRpcHandler>,
    stop: CancellationToken,
    log: Logger,
}

impl Service {
    /// Registers the built-in endpoints and the resource registry, then
    /// binds the listening socket.
    pub async fn bind(
        options: &ServerOptions,
        provider: Arc<dyn DatasetProvider>,
        log: Option<&Logger>,
    ) -> Result<Service, ServiceError> {
        let log = log
            .cloned()
            .unwrap_or_else(|| Logger::root(slog_stdlog::StdLog.fuse(), o!()));
        let stop = CancellationToken::new();

        let components: Vec<Arc<dyn Component>> = vec![
            Arc::new(Builtin::new(stop.clone(), Some(&log))),
            Arc::new(ResourceRegistry::new(provider, Some(&log))),
        ];
        let endpoints = build_registry(&components, &log)?;
        info!(log, "endpoints ready"; "count" => endpoints.len());

        let handler = Arc::new(JsonRpcHandler::new(endpoints, Some(&log)));
        let server = Server::bind(options, Some(&log)).await?;

        Ok(Service {
            server,
            handler,
            stop,
            log,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.server.local_addr()
    }

    pub fn endpoints(&self) -> &Endpoints {
        self.handler.endpoints()
    }

    /// Cancelling the token has the same effect as the `quit` method.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Raises the stop signal on Ctrl-C.
    pub fn stop_on_ctrl_c(&self) {
        let stop = self.stop.clone();
        let log = self.log.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = stop.cancelled() => {}
                signal = tokio::signal::ctrl_c() => match signal {
                    Ok(()) => {
                        info!(log, "interrupted, shutting down");
                        stop.cancel();
                    }
                    Err(e) => error!(log, "failed to listen for Ctrl-C"; "err" => %e),
                },
            }
        });
    }

    /// Serves until stopped and every connection has closed.
    pub async fn run(self) {
        self.server.run(self.handler, self.stop).await;
        info!(self.log, "service stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::file::FileDatasetProvider;

    #[tokio::test]
    async fn registry_holds_every_component() {
        let options = ServerOptions {
            address: "127.0.0.1:0".parse().unwrap(),
            max_frame_size: 1 << 20,
            tls: None,
        };
        let service = Service::bind(&options, Arc::new(FileDatasetProvider), None)
            .await
            .unwrap();
        assert_ne!(service.local_addr().unwrap().port(), 0);
        assert_eq!(
            service.endpoints().methods(),
            vec![
                "get-frame",
                "get-ids",
                "get-positions",
                "get-report-info",
                "load-report",
                "load-selection",
                "quit",
                "registry",
                "schema",
                "unload-report",
                "unload-selection",
                "version",
            ]
        );

        let stop = service.stop_token();
        let running = tokio::spawn(service.run());
        stop.cancel();
        running.await.unwrap();
    }

    #[test]
    fn duplicate_components_fail_at_startup() {
        let log = Logger::root(slog::Discard, o!());
        let stop = CancellationToken::new();
        let components: Vec<Arc<dyn Component>> = vec![
            Arc::new(Builtin::new(stop.clone(), None)),
            Arc::new(Builtin::new(stop, None)),
        ];
        let err = build_registry(&components, &log).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateMethod("version".into()));
    }
}
