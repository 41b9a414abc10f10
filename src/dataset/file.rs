// Copyright 2026 The vizrpc developers

//! Datasets described by a JSON file.
//!
//! ```json
//! {
//!     "populations": {"cells": {"positions": [[0, 0, 0], [1, 2, 3]]}},
//!     "node_sets": {"Layer1": {"population": "cells", "ids": [1]}},
//!     "reports": {
//!         "soma": {
//!             "population": "cells",
//!             "kind": "soma",
//!             "file": "soma.bin",
//!             "start": 0.0,
//!             "dt": 0.1,
//!             "unit": "mV"
//!         }
//!     }
//! }
//! ```
//!
//! Node ids are the indices into `positions`. A report file holds frames
//! back to back, each frame being one little-endian `f32` per column. Soma
//! reports have a column per node; compartment reports list the number of
//! columns of each node in `compartments`. Relative report paths are
//! resolved against the directory of the descriptor.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use byteorder::{ByteOrder, LittleEndian};
use serde_derive::Deserialize;

use crate::dataset::{Dataset, DatasetError, DatasetProvider, ReportInfo, ReportKind, ReportReader};

const VALUE_SZ: usize = 4;

#[derive(Debug, Deserialize)]
struct Descriptor {
    populations: BTreeMap<String, PopulationDescriptor>,
    #[serde(default)]
    node_sets: BTreeMap<String, NodeSetDescriptor>,
    #[serde(default)]
    reports: BTreeMap<String, ReportDescriptor>,
}

#[derive(Debug, Deserialize)]
struct PopulationDescriptor {
    positions: Vec<[f32; 3]>,
}

#[derive(Debug, Deserialize)]
struct NodeSetDescriptor {
    population: String,
    ids: Vec<u64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum KindDescriptor {
    Soma,
    Compartment,
}

#[derive(Debug, Deserialize)]
struct ReportDescriptor {
    population: String,
    kind: KindDescriptor,
    file: PathBuf,
    #[serde(default)]
    start: f64,
    dt: f64,
    #[serde(default)]
    unit: String,
    #[serde(default)]
    compartments: Vec<usize>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FileDatasetProvider;

impl DatasetProvider for FileDatasetProvider {
    fn open(&self, path: &str) -> Result<Arc<dyn Dataset>, DatasetError> {
        Ok(Arc::new(FileDataset::open(Path::new(path))?))
    }
}

#[derive(Debug)]
pub struct FileDataset {
    root: PathBuf,
    descriptor: Descriptor,
}

impl FileDataset {
    pub fn open(path: &Path) -> Result<FileDataset, DatasetError> {
        let text = fs::read_to_string(path).map_err(|e| DatasetError::NotFound {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let descriptor: Descriptor = serde_json::from_str(&text)
            .map_err(|e| DatasetError::Format(format!("{}: {}", path.display(), e)))?;
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(FileDataset { root, descriptor })
    }

    fn population(&self, name: &str) -> Result<&PopulationDescriptor, DatasetError> {
        self.descriptor
            .populations
            .get(name)
            .ok_or_else(|| DatasetError::UnknownPopulation(name.to_string()))
    }
}

impl Dataset for FileDataset {
    fn node_ids(&self, population: &str) -> Result<Vec<u64>, DatasetError> {
        let count = self.population(population)?.positions.len() as u64;
        Ok((0..count).collect())
    }

    fn node_sets(&self, population: &str, names: &[String]) -> Result<Vec<u64>, DatasetError> {
        let count = self.population(population)?.positions.len() as u64;
        let unknown: Vec<String> = names
            .iter()
            .filter(|name| !self.descriptor.node_sets.contains_key(name.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(DatasetError::UnknownNodeSets(unknown));
        }

        let ids: BTreeSet<u64> = names
            .iter()
            .filter_map(|name| self.descriptor.node_sets.get(name.as_str()))
            .filter(|set| set.population == population)
            .flat_map(|set| set.ids.iter().copied())
            .filter(|id| *id < count)
            .collect();
        Ok(ids.into_iter().collect())
    }

    fn positions(&self, population: &str, ids: &[u64]) -> Result<Vec<[f32; 3]>, DatasetError> {
        let positions = &self.population(population)?.positions;
        ids.iter()
            .map(|id| {
                positions
                    .get(*id as usize)
                    .copied()
                    .ok_or_else(|| DatasetError::UnknownNode {
                        population: population.to_string(),
                        id: *id,
                    })
            })
            .collect()
    }

    fn reports(&self, population: &str) -> Vec<String> {
        self.descriptor
            .reports
            .iter()
            .filter(|(_, report)| report.population == population)
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn open_report(
        &self,
        population: &str,
        name: &str,
    ) -> Result<Arc<dyn ReportReader>, DatasetError> {
        let report = self
            .descriptor
            .reports
            .get(name)
            .filter(|report| report.population == population)
            .ok_or_else(|| DatasetError::UnknownReport(name.to_string()))?;
        let node_count = self.population(population)?.positions.len();
        let path = self.root.join(&report.file);
        Ok(Arc::new(FileReport::open(&path, report, node_count)?))
    }
}

struct FileReport {
    population: String,
    info: ReportInfo,
    /// Column of the first value of each node.
    offsets: Vec<usize>,
    columns: usize,
    file: Mutex<File>,
}

impl FileReport {
    fn open(path: &Path, report: &ReportDescriptor, node_count: usize) -> Result<FileReport, DatasetError> {
        let (kind, offsets, columns) = match report.kind {
            KindDescriptor::Soma => (ReportKind::Soma, (0..node_count).collect(), node_count),
            KindDescriptor::Compartment => {
                if report.compartments.len() != node_count {
                    return Err(DatasetError::Format(format!(
                        "{}: {} compartment counts for {} nodes",
                        path.display(),
                        report.compartments.len(),
                        node_count
                    )));
                }
                if let Some(node) = report.compartments.iter().position(|count| *count == 0) {
                    return Err(DatasetError::Format(format!(
                        "{}: node {} has no compartments",
                        path.display(),
                        node
                    )));
                }
                let mut offsets = Vec::with_capacity(node_count);
                let mut columns = 0;
                for count in &report.compartments {
                    offsets.push(columns);
                    columns += count;
                }
                (ReportKind::Compartment, offsets, columns)
            }
        };
        if columns == 0 || report.dt <= 0.0 {
            return Err(DatasetError::Format(format!(
                "{}: empty frames or non-positive time step",
                path.display()
            )));
        }

        let file = File::open(path)?;
        let frame_count = file.metadata()?.len() as usize / (columns * VALUE_SZ);
        let info = ReportInfo {
            kind,
            start: report.start,
            end: report.start + frame_count as f64 * report.dt,
            time_step: report.dt,
            unit: report.unit.clone(),
            frame_count,
        };

        Ok(FileReport {
            population: report.population.clone(),
            info,
            offsets,
            columns,
            file: Mutex::new(file),
        })
    }

    fn frame_index(&self, time: f64) -> Result<usize, DatasetError> {
        let info = &self.info;
        if time < info.start || time >= info.end {
            return Err(DatasetError::TimeOutOfRange {
                time,
                start: info.start,
                end: info.end,
            });
        }
        let index = ((time - info.start) / info.time_step + 1e-9).floor() as usize;
        Ok(index.min(info.frame_count.saturating_sub(1)))
    }
}

impl ReportReader for FileReport {
    fn info(&self) -> &ReportInfo {
        &self.info
    }

    fn read(&self, time: f64, ids: &[u64]) -> Result<Vec<f32>, DatasetError> {
        let index = self.frame_index(time)?;
        let frame_size = self.columns * VALUE_SZ;
        let mut buf = vec![0u8; frame_size];
        {
            let mut file = self
                .file
                .lock()
                .map_err(|_| DatasetError::Format("report reader lock poisoned".to_string()))?;
            file.seek(SeekFrom::Start((index * frame_size) as u64))?;
            file.read_exact(&mut buf)?;
        }
        let mut frame = vec![0f32; self.columns];
        LittleEndian::read_f32_into(&buf, &mut frame);

        ids.iter()
            .map(|id| {
                self.offsets
                    .get(*id as usize)
                    .and_then(|column| frame.get(*column).copied())
                    .ok_or_else(|| DatasetError::UnknownNode {
                        population: self.population.clone(),
                        id: *id,
                    })
            })
            .collect()
    }
}
