// Copyright 2026 The vizrpc developers

use std::fs;
use std::path::PathBuf;
use std::process;

use bytes::Bytes;
use clap::{crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use serde_json::Value;

use vizrpc::client::{Client, ClientError};

static APP: &str = "vizcall";
static DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;

pub fn parse_opts(app: &'static str) -> ArgMatches {
    Command::new(app)
        .about("Command-line tool for making a vizrpc method call")
        .version(crate_version!())
        .arg(
            Arg::new("host")
                .help("DNS name or IP address of the server")
                .long("host")
                .value_name("HOST"),
        )
        .arg(
            Arg::new("port")
                .help("TCP port of the server (Default: 5000)")
                .long("port")
                .short('p')
                .value_name("PORT")
                .value_parser(value_parser!(u16)),
        )
        .arg(
            Arg::new("method")
                .help("Name of the remote method")
                .long("method")
                .short('m')
                .value_name("METHOD")
                .required(true),
        )
        .arg(
            Arg::new("params")
                .help("JSON-encoded params of the call")
                .long("params")
                .value_name("JSON"),
        )
        .arg(
            Arg::new("binary_file")
                .help("File sent as the binary attachment of the request")
                .long("binary-file")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("tls")
                .help("Connect with wss://")
                .long("tls")
                .action(ArgAction::SetTrue),
        )
        .get_matches()
}

fn fail(msg: String) -> ! {
    eprintln!("{}: {}", APP, msg);
    process::exit(1)
}

async fn call(url: &str, method: &str, params: Value, binary: Bytes) -> Result<(), ClientError> {
    let mut client = Client::connect(url).await?;
    let result = client.call(method, params, binary).await;
    client.close().await?;

    let result = result?;
    println!("{}", result.value);
    if !result.binary.is_empty() {
        println!("binary attachment: {} bytes", result.binary.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = parse_opts(APP);
    let host = matches
        .get_one::<String>("host")
        .map(String::as_str)
        .unwrap_or(DEFAULT_HOST);
    let port = matches.get_one::<u16>("port").copied().unwrap_or(DEFAULT_PORT);
    let scheme = if matches.get_flag("tls") { "wss" } else { "ws" };
    let url = format!("{}://{}:{}", scheme, host, port);

    let method = match matches.get_one::<String>("method") {
        Some(method) => method.clone(),
        None => fail("Failed to parse method argument".to_string()),
    };
    let params = match matches.get_one::<String>("params") {
        Some(text) => serde_json::from_str::<Value>(text)
            .unwrap_or_else(|e| fail(format!("Failed to parse params as JSON: {}", e))),
        None => Value::Null,
    };
    let binary = match matches.get_one::<PathBuf>("binary_file") {
        Some(path) => fs::read(path)
            .map(Bytes::from)
            .unwrap_or_else(|e| fail(format!("Failed to read {}: {}", path.display(), e))),
        None => Bytes::new(),
    };

    match call(&url, &method, params, binary).await {
        Ok(()) => (),
        Err(ClientError::Rpc(err)) => {
            match serde_json::to_string(&err) {
                Ok(text) => println!("{}", text),
                Err(_) => println!("{}", err),
            }
            process::exit(1)
        }
        Err(e) => fail(e.to_string()),
    }
}
