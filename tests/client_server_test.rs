// Copyright 2026 The vizrpc developers

use std::fs::File;
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use serde_json::{json, Value};
use slog::{o, Drain, Level, LevelFilter, Logger};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_test::assert_ok;

use vizrpc::client::{Client, ClientError};
use vizrpc::dataset::file::FileDatasetProvider;
use vizrpc::protocol::{ErrorCode, Frame, JsonRpcResponse};
use vizrpc::server::ServerOptions;
use vizrpc::service::Service;

fn test_logger() -> Logger {
    let plain = slog_term::PlainSyncDecorator::new(std::io::stdout());
    Logger::root(
        Mutex::new(LevelFilter::new(
            slog_term::FullFormat::new(plain).build(),
            Level::Info,
        ))
        .fuse(),
        o!("build-id" => env!("CARGO_PKG_VERSION")),
    )
}

async fn start() -> (SocketAddr, JoinHandle<()>) {
    let options = ServerOptions {
        address: "127.0.0.1:0".parse().unwrap(),
        max_frame_size: 1 << 20,
        tls: None,
    };
    let log = test_logger();
    let service = Service::bind(&options, Arc::new(FileDatasetProvider), Some(&log))
        .await
        .expect("failed to start service");
    let address = service.local_addr().unwrap();
    (address, tokio::spawn(service.run()))
}

async fn connect(address: SocketAddr) -> Client {
    Client::connect(&format!("ws://{}", address))
        .await
        .expect("failed to connect")
}

fn rpc_error(err: ClientError) -> (Option<ErrorCode>, String) {
    match err {
        ClientError::Rpc(err) => (err.error_code(), err.message),
        other => panic!("unexpected error {:?}", other),
    }
}

/// Four nodes on a line; the soma report holds three frames where node `n`
/// reads `25 * n + frame`.
fn write_dataset(dir: &Path) -> PathBuf {
    let descriptor = json!({
        "populations": {
            "cells": {"positions": [[0, 0, 0], [1, 0, 0], [2, 0, 0], [3, 0, 0]]}
        },
        "node_sets": {
            "tail": {"population": "cells", "ids": [2, 3]}
        },
        "reports": {
            "soma": {"population": "cells", "kind": "soma", "file": "soma.bin",
                     "start": 0.0, "dt": 0.5, "unit": "mV"}
        }
    });
    let path = dir.join("dataset.json");
    let mut file = File::create(&path).unwrap();
    file.write_all(descriptor.to_string().as_bytes()).unwrap();

    let mut report = File::create(dir.join("soma.bin")).unwrap();
    for frame in 0..3 {
        for node in 0..4 {
            report
                .write_f32::<LittleEndian>((25 * node + frame) as f32)
                .unwrap();
        }
    }
    path
}

#[tokio::test]
async fn version_and_introspection() {
    let (address, _service) = start().await;
    let mut client = connect(address).await;

    client
        .send_frame(Frame::Text(
            r#"{"jsonrpc":"2.0","id":1,"method":"version"}"#.to_string(),
        ))
        .await
        .unwrap();
    let reply = client.receive_frame().await.unwrap().unwrap();
    let expected = format!(
        r#"{{"jsonrpc":"2.0","id":1,"result":{{"version":"{}"}}}}"#,
        env!("CARGO_PKG_VERSION")
    );
    assert_eq!(reply, Frame::Text(expected));

    let schema = client
        .request("schema", json!({"endpoint": "quit"}))
        .await
        .unwrap();
    assert_eq!(schema["method"], json!("quit"));
    assert_eq!(schema["description"], json!("Stop the service"));
    assert!(schema["params"].is_object());

    let methods = client.request("registry", Value::Null).await.unwrap();
    let methods: Vec<String> = serde_json::from_value(methods).unwrap();
    assert_eq!(methods.len(), 12);
    assert!(methods.contains(&"get-frame".to_string()));

    assert_ok!(client.close().await);
}

#[tokio::test]
async fn notifications_and_errors() {
    let (address, _service) = start().await;
    let mut client = connect(address).await;

    // A reply to the notification would show up as an id mismatch.
    client.notify("version", Value::Null).await.unwrap();
    client.notify("no-such-method", Value::Null).await.unwrap();
    let version = client.request("version", Value::Null).await.unwrap();
    assert_eq!(version["version"], json!(env!("CARGO_PKG_VERSION")));

    client
        .send_frame(Frame::Text("{\"jsonrpc\":\"2.0\",".to_string()))
        .await
        .unwrap();
    let reply = client.receive_frame().await.unwrap().unwrap();
    match JsonRpcResponse::parse(&reply).unwrap() {
        JsonRpcResponse::Error(err) => {
            assert_eq!(err.id, None);
            assert_eq!(err.error.error_code(), Some(ErrorCode::ParseError));
        }
        JsonRpcResponse::Reply(reply) => panic!("unexpected reply {:?}", reply),
    }

    let err = client.request("frobnicate", Value::Null).await.unwrap_err();
    assert_eq!(
        rpc_error(err),
        (
            Some(ErrorCode::MethodNotFound),
            "Method 'frobnicate' not found".to_string()
        )
    );

    let err = client
        .request("schema", json!({"endpoint": 7}))
        .await
        .unwrap_err();
    let (code, message) = rpc_error(err);
    assert_eq!(code, Some(ErrorCode::InvalidParams));
    assert_eq!(message, "endpoint: Invalid type: expected string got integer");

    // The connection survives every error above.
    assert_ok!(client.request("version", Value::Null).await);
    assert_ok!(client.close().await);
}

#[tokio::test]
async fn resource_lifecycle() {
    let dir: TempDir = tempfile::tempdir().unwrap();
    let path = write_dataset(dir.path());
    let path = path.to_str().unwrap();

    let (address, _service) = start().await;
    let mut client = connect(address).await;

    let selection = client
        .request(
            "load-selection",
            json!({"path": path, "population": "cells", "max_count": 2}),
        )
        .await
        .unwrap();
    assert_eq!(selection, json!({"handle": 0, "size": 2}));

    let ids = client
        .call("get-ids", json!({"handle": 0}), Default::default())
        .await
        .unwrap();
    assert_eq!(ids.value, json!({"count": 2}));
    let mut decoded = [0u64; 2];
    LittleEndian::read_u64_into(&ids.binary, &mut decoded);
    assert_eq!(decoded, [1, 2]);

    let positions = client
        .call("get-positions", json!({"handle": 0}), Default::default())
        .await
        .unwrap();
    let mut decoded = [0f32; 6];
    LittleEndian::read_f32_into(&positions.binary, &mut decoded);
    assert_eq!(decoded, [1.0, 0.0, 0.0, 2.0, 0.0, 0.0]);

    let report = client
        .request("load-report", json!({"selection": 0, "name": "soma"}))
        .await
        .unwrap();
    assert_eq!(report, json!({"handle": 0}));

    let info = client
        .request("get-report-info", json!({"handle": 0}))
        .await
        .unwrap();
    assert_eq!(info["kind"], json!("soma"));
    assert_eq!(info["frame_count"], json!(3));
    assert_eq!(info["unit"], json!("mV"));

    // Nodes 1 and 2 read 26 and 51 in the second frame.
    let frame = client
        .call(
            "get-frame",
            json!({"handle": 0, "index": 1, "min_value": 0.0, "max_value": 100.0}),
            Default::default(),
        )
        .await
        .unwrap();
    assert_eq!(frame.value, json!({"count": 2}));
    assert_eq!(&frame.binary[..], &[66, 130]);

    let err = client
        .request(
            "get-frame",
            json!({"handle": 0, "index": 1, "min_value": 5.0, "max_value": 5.0}),
        )
        .await
        .unwrap_err();
    assert_eq!(rpc_error(err).0, Some(ErrorCode::InvalidParams));

    let err = client
        .request(
            "load-selection",
            json!({"path": path, "population": "cells", "node_sets": ["head", "tail"]}),
        )
        .await
        .unwrap_err();
    assert_eq!(
        rpc_error(err),
        (
            Some(ErrorCode::InvalidParams),
            "Unknown node sets: head".to_string()
        )
    );

    client
        .request("unload-selection", json!({"handle": 0}))
        .await
        .unwrap();
    let err = client
        .request(
            "get-frame",
            json!({"handle": 0, "index": 0, "min_value": 0.0, "max_value": 1.0}),
        )
        .await
        .unwrap_err();
    assert_eq!(
        rpc_error(err),
        (
            Some(ErrorCode::InvalidParams),
            "Report registered with ID 0 could not be found".to_string()
        )
    );

    let selection = client
        .request(
            "load-selection",
            json!({"path": path, "population": "cells", "node_sets": ["tail"]}),
        )
        .await
        .unwrap();
    assert_eq!(selection, json!({"handle": 0, "size": 2}));

    assert_ok!(client.close().await);
}

#[tokio::test]
async fn quit_stops_the_service() {
    let (address, service) = start().await;
    let mut client = connect(address).await;

    let result = client.request("quit", Value::Null).await.unwrap();
    assert_eq!(result, Value::Null);

    tokio::time::timeout(Duration::from_secs(5), service)
        .await
        .expect("service did not stop")
        .unwrap();
    assert!(Client::connect(&format!("ws://{}", address)).await.is_err());
}
