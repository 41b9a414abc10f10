// Copyright 2026 The vizrpc developers

use std::process;
use std::sync::{Arc, Mutex};

use clap::crate_version;
use slog::{error, info, o, Drain, LevelFilter, Logger};

use vizrpc::config::{ConfigError, ServiceConfig};
use vizrpc::dataset::file::FileDatasetProvider;
use vizrpc::service::Service;

#[tokio::main]
async fn main() {
    let config = ServiceConfig::from_args(std::env::args_os()).unwrap_or_else(|e| match e {
        ConfigError::Args(e) => e.exit(),
        e => {
            eprintln!("vizrpc: {}", e);
            process::exit(2)
        }
    });

    let plain = slog_term::PlainSyncDecorator::new(std::io::stdout());
    let log = Logger::root(
        Mutex::new(LevelFilter::new(
            slog_term::FullFormat::new(plain).build(),
            config.log_level,
        ))
        .fuse(),
        o!("version" => crate_version!()),
    );

    let options = match config.server_options() {
        Ok(options) => options,
        Err(e) => {
            error!(log, "invalid configuration"; "err" => %e);
            process::exit(2)
        }
    };

    let service = match Service::bind(&options, Arc::new(FileDatasetProvider), Some(&log)).await {
        Ok(service) => service,
        Err(e) => {
            error!(log, "failed to start"; "err" => %e);
            process::exit(1)
        }
    };

    service.stop_on_ctrl_c();
    service.run().await;
    info!(log, "exiting");
}
