// Copyright 2026 The vizrpc developers

//! Access to the datasets behind selections and reports.
//!
//! The resource registry only talks to these traits. [`file`] provides an
//! implementation backed by a JSON descriptor and little-endian report
//! files.

pub mod file;

use std::io;
use std::sync::Arc;

use serde_derive::Serialize;
use thiserror::Error;

use crate::endpoint::EndpointError;
use crate::json::{JsonSchema, Reflect};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Cannot open dataset '{path}': {reason}")]
    NotFound { path: String, reason: String },
    #[error("Unknown population '{0}'")]
    UnknownPopulation(String),
    #[error("Unknown node sets: {}", .0.join(", "))]
    UnknownNodeSets(Vec<String>),
    #[error("Unknown report '{0}'")]
    UnknownReport(String),
    #[error("Node {id} is out of range for population '{population}'")]
    UnknownNode { population: String, id: u64 },
    #[error("Time {time} is outside of report range [{start}, {end})")]
    TimeOutOfRange { time: f64, start: f64, end: f64 },
    #[error("Invalid dataset: {0}")]
    Format(String),
    #[error("Dataset I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DatasetError {
    /// Whether the error was caused by what the client asked for rather
    /// than by the dataset itself.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, DatasetError::Format(_) | DatasetError::Io(_))
    }
}

impl From<DatasetError> for EndpointError {
    fn from(err: DatasetError) -> Self {
        if err.is_client_error() {
            EndpointError::invalid_params(err.to_string())
        } else {
            EndpointError::internal(err)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// One value per node and frame.
    Soma,
    /// Several values per node and frame, the first one is reported.
    Compartment,
}

impl Reflect for ReportKind {
    fn json_schema() -> JsonSchema {
        JsonSchema::enumeration("ReportKind", vec!["soma", "compartment"])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportInfo {
    pub kind: ReportKind,
    pub start: f64,
    pub end: f64,
    pub time_step: f64,
    pub unit: String,
    pub frame_count: usize,
}

pub trait DatasetProvider: Send + Sync {
    fn open(&self, path: &str) -> Result<Arc<dyn Dataset>, DatasetError>;
}

pub trait Dataset: Send + Sync {
    /// Every node id of `population`, ascending.
    fn node_ids(&self, population: &str) -> Result<Vec<u64>, DatasetError>;

    /// Union of the named node sets restricted to `population`, ascending.
    /// Fails listing every unknown name.
    fn node_sets(&self, population: &str, names: &[String]) -> Result<Vec<u64>, DatasetError>;

    fn positions(&self, population: &str, ids: &[u64]) -> Result<Vec<[f32; 3]>, DatasetError>;

    /// Names of the reports recorded for `population`.
    fn reports(&self, population: &str) -> Vec<String>;

    fn open_report(&self, population: &str, name: &str)
        -> Result<Arc<dyn ReportReader>, DatasetError>;
}

pub trait ReportReader: Send + Sync {
    fn info(&self) -> &ReportInfo;

    /// One value per entry of `ids` at the frame covering `time`.
    fn read(&self, time: f64, ids: &[u64]) -> Result<Vec<f32>, DatasetError>;
}
