// Copyright 2026 The vizrpc developers

//! Startup configuration of the service, read from the command line.

use std::ffi::OsString;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use clap::{crate_version, value_parser, Arg, ArgMatches, Command};
use slog::Level;
use thiserror::Error;

use crate::server::{ServerOptions, TlsFiles};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
/// Largest frame whose text size still fits the binary framing header.
pub const DEFAULT_MAX_FRAME_SIZE: usize = i32::MAX as usize;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Args(#[from] clap::Error),
    #[error("invalid host '{0}': expected an IP address")]
    InvalidHost(String),
    #[error("invalid log level '{0}'")]
    InvalidLogLevel(String),
    #[error("max frame size {0} is out of range")]
    InvalidFrameSize(usize),
    #[error("certificate and private key files must be given together")]
    IncompleteTls,
    #[error("a private key password requires the certificate and private key files")]
    PasswordWithoutKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub max_frame_size: usize,
    pub certificate_file: Option<PathBuf>,
    pub private_key_file: Option<PathBuf>,
    pub private_key_password: Option<String>,
    pub log_level: Level,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            certificate_file: None,
            private_key_file: None,
            private_key_password: None,
            log_level: Level::Info,
        }
    }
}

impl ServiceConfig {
    pub fn command() -> Command {
        Command::new("vizrpc")
            .about("JSON-RPC over WebSocket service for visualization clients")
            .version(crate_version!())
            .arg(
                Arg::new("host")
                    .help("IP address to listen on")
                    .long("host")
                    .value_name("HOST")
                    .default_value(DEFAULT_HOST),
            )
            .arg(
                Arg::new("port")
                    .help("TCP port to listen on")
                    .long("port")
                    .short('p')
                    .value_name("PORT")
                    .value_parser(value_parser!(u16))
                    .default_value("5000"),
            )
            .arg(
                Arg::new("max-frame-size")
                    .help("Largest accepted WebSocket message, in bytes")
                    .long("max-frame-size")
                    .value_name("BYTES")
                    .value_parser(value_parser!(usize)),
            )
            .arg(
                Arg::new("certificate-file")
                    .help("PEM certificate chain, enables TLS")
                    .long("certificate-file")
                    .value_name("PATH")
                    .value_parser(value_parser!(PathBuf))
                    .requires("private-key-file"),
            )
            .arg(
                Arg::new("private-key-file")
                    .help("PEM private key matching the certificate")
                    .long("private-key-file")
                    .value_name("PATH")
                    .value_parser(value_parser!(PathBuf))
                    .requires("certificate-file"),
            )
            .arg(
                Arg::new("private-key-password")
                    .help("Password of a PKCS#8 encrypted private key")
                    .long("private-key-password")
                    .value_name("PASSWORD")
                    .requires("private-key-file"),
            )
            .arg(
                Arg::new("log-level")
                    .help("One of critical, error, warn, info, debug, trace")
                    .long("log-level")
                    .value_name("LEVEL")
                    .default_value("info"),
            )
    }

    pub fn from_args<I, T>(args: I) -> Result<ServiceConfig, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        Self::from_matches(&matches)
    }

    pub fn from_matches(matches: &ArgMatches) -> Result<ServiceConfig, ConfigError> {
        let defaults = ServiceConfig::default();
        let log_level = match matches.get_one::<String>("log-level") {
            Some(level) => {
                Level::from_str(level).map_err(|_| ConfigError::InvalidLogLevel(level.clone()))?
            }
            None => defaults.log_level,
        };

        let config = ServiceConfig {
            host: matches
                .get_one::<String>("host")
                .cloned()
                .unwrap_or(defaults.host),
            port: matches.get_one::<u16>("port").copied().unwrap_or(defaults.port),
            max_frame_size: matches
                .get_one::<usize>("max-frame-size")
                .copied()
                .unwrap_or(defaults.max_frame_size),
            certificate_file: matches.get_one::<PathBuf>("certificate-file").cloned(),
            private_key_file: matches.get_one::<PathBuf>("private-key-file").cloned(),
            private_key_password: matches.get_one::<String>("private-key-password").cloned(),
            log_level,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.address()?;
        if self.max_frame_size <= 4 || self.max_frame_size > u32::MAX as usize {
            return Err(ConfigError::InvalidFrameSize(self.max_frame_size));
        }
        self.tls().map(|_| ())
    }

    pub fn address(&self) -> Result<SocketAddr, ConfigError> {
        let ip = IpAddr::from_str(&self.host)
            .map_err(|_| ConfigError::InvalidHost(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn tls(&self) -> Result<Option<TlsFiles>, ConfigError> {
        match (&self.certificate_file, &self.private_key_file) {
            (Some(certificate), Some(private_key)) => Ok(Some(TlsFiles {
                certificate: certificate.clone(),
                private_key: private_key.clone(),
                password: self.private_key_password.clone(),
            })),
            (None, None) if self.private_key_password.is_some() => {
                Err(ConfigError::PasswordWithoutKey)
            }
            (None, None) => Ok(None),
            _ => Err(ConfigError::IncompleteTls),
        }
    }

    pub fn server_options(&self) -> Result<ServerOptions, ConfigError> {
        Ok(ServerOptions {
            address: self.address()?,
            max_frame_size: self.max_frame_size,
            tls: self.tls()?,
        })
    }
}
