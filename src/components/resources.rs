// Copyright 2026 The vizrpc developers

//! Handle-based access to selections of dataset nodes and to the reports
//! recorded for them.
//!
//! Loading a selection or a report returns an integer handle that later
//! calls refer to. Handles are recycled once unloaded; selections and
//! reports draw from separate pools. Unloading a selection also unloads
//! every report loaded on it. Bulk data (ids, positions, frames) leaves as
//! the binary attachment of the reply, little-endian:
//!
//! * ids: one `u64` per node
//! * positions: three `f32` (x, y, z) per node
//! * frames: one `u8` per node, the value rescaled from
//!   `[min_value, max_value]` to `[0, 255]`

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use serde_derive::{Deserialize, Serialize};
use slog::{debug, info, o, Drain, Logger};
use tokio::sync::Mutex;

use crate::components::Component;
use crate::dataset::{Dataset, DatasetError, DatasetProvider, ReportKind, ReportReader};
use crate::endpoint::{EndpointError, EndpointRegistry, Json, Output, RegistryError};
use crate::json::{JsonSchema, Reflect};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoadSelection {
    pub path: String,
    pub population: String,
    #[serde(default)]
    pub node_sets: Vec<String>,
    #[serde(default)]
    pub max_count: Option<u64>,
}

impl Reflect for LoadSelection {
    fn json_schema() -> JsonSchema {
        JsonSchema::record("LoadSelection")
            .field("path", "Path of the dataset", String::json_schema())
            .field("population", "Node population", String::json_schema())
            .optional(
                "node_sets",
                "Keep only the nodes of these sets",
                Vec::<String>::json_schema(),
                serde_json::json!([]),
            )
            .optional(
                "max_count",
                "Evenly down-sample to at most this many nodes",
                Option::<u64>::json_schema(),
                serde_json::Value::Null,
            )
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionLoaded {
    pub handle: u64,
    pub size: u64,
}

impl Reflect for SelectionLoaded {
    fn json_schema() -> JsonSchema {
        JsonSchema::record("SelectionLoaded")
            .field("handle", "Selection handle", u64::json_schema())
            .field("size", "Number of selected nodes", u64::json_schema())
            .build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Handle {
    pub handle: u64,
}

impl Reflect for Handle {
    fn json_schema() -> JsonSchema {
        JsonSchema::record("Handle")
            .field("handle", "Resource handle", u64::json_schema())
            .build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Count {
    pub count: u64,
}

impl Reflect for Count {
    fn json_schema() -> JsonSchema {
        JsonSchema::record("Count")
            .field("count", "Number of elements in the attachment", u64::json_schema())
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoadReport {
    pub selection: u64,
    pub name: String,
}

impl Reflect for LoadReport {
    fn json_schema() -> JsonSchema {
        JsonSchema::record("LoadReport")
            .field("selection", "Selection handle", u64::json_schema())
            .field("name", "Report name", String::json_schema())
            .build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GetFrame {
    pub handle: u64,
    pub index: u64,
    pub min_value: f64,
    pub max_value: f64,
}

impl Reflect for GetFrame {
    fn json_schema() -> JsonSchema {
        JsonSchema::record("GetFrame")
            .field("handle", "Report handle", u64::json_schema())
            .field("index", "Frame index", u64::json_schema())
            .field("min_value", "Value mapped to 0", f64::json_schema())
            .field("max_value", "Value mapped to 255", f64::json_schema())
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDescription {
    pub kind: ReportKind,
    pub start: f64,
    pub end: f64,
    pub time_step: f64,
    pub unit: String,
    pub frame_count: u64,
}

impl Reflect for ReportDescription {
    fn json_schema() -> JsonSchema {
        JsonSchema::record("ReportDescription")
            .field("kind", "Report granularity", ReportKind::json_schema())
            .field("start", "Time of the first frame", f64::json_schema())
            .field("end", "End of the last frame", f64::json_schema())
            .field("time_step", "Time between frames", f64::json_schema())
            .field("unit", "Unit of the values", String::json_schema())
            .field("frame_count", "Number of frames", u64::json_schema())
            .build()
    }
}

/// Issues the smallest integer not currently in use.
#[derive(Debug, Default)]
pub struct IdPool {
    next: u64,
    free: BTreeSet<u64>,
}

impl IdPool {
    pub fn acquire(&mut self) -> u64 {
        if let Some(id) = self.free.pop_first() {
            return id;
        }
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn release(&mut self, id: u64) {
        if id < self.next {
            self.free.insert(id);
        }
    }
}

/// Evenly spaced sample of at most `count` items, preferring later items
/// over a prefix.
pub fn pick<T: Clone>(items: &[T], count: usize) -> Vec<T> {
    if count >= items.len() {
        return items.to_vec();
    }

    let mut picked = Vec::with_capacity(count);
    let mut position = 0;
    for i in 0..count {
        let remaining = items.len() - position;
        let left = count - i;
        position += remaining / (left + 1);
        picked.push(items[position].clone());
    }
    picked
}

/// Rescales `value` from `[min, max]` to `[0, 255]`, truncating.
fn quantize(value: f32, min: f64, max: f64) -> u8 {
    let value = f64::from(value).clamp(min, max);
    ((value - min) * 255.0 / (max - min)) as u8
}

struct Selection {
    dataset: Arc<dyn Dataset>,
    population: String,
    ids: Vec<u64>,
}

struct ReportBinding {
    selection: u64,
    nodes: Arc<Selection>,
    reader: Arc<dyn ReportReader>,
}

#[derive(Default)]
struct State {
    selection_ids: IdPool,
    report_ids: IdPool,
    selections: HashMap<u64, Arc<Selection>>,
    reports: HashMap<u64, Arc<ReportBinding>>,
}

impl State {
    fn selection(&self, handle: u64) -> Result<Arc<Selection>, EndpointError> {
        self.selections
            .get(&handle)
            .cloned()
            .ok_or_else(|| selection_not_found(handle))
    }

    fn report(&self, handle: u64) -> Result<Arc<ReportBinding>, EndpointError> {
        self.reports
            .get(&handle)
            .cloned()
            .ok_or_else(|| report_not_found(handle))
    }
}

fn selection_not_found(handle: u64) -> EndpointError {
    EndpointError::invalid_params(format!(
        "Selection registered with ID {} could not be found",
        handle
    ))
}

fn report_not_found(handle: u64) -> EndpointError {
    EndpointError::invalid_params(format!(
        "Report registered with ID {} could not be found",
        handle
    ))
}

/// Runs dataset I/O off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, EndpointError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DatasetError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(EndpointError::internal)?
        .map_err(EndpointError::from)
}

pub struct ResourceRegistry {
    provider: Arc<dyn DatasetProvider>,
    state: Mutex<State>,
    log: Logger,
}

impl ResourceRegistry {
    pub fn new(provider: Arc<dyn DatasetProvider>, log: Option<&Logger>) -> ResourceRegistry {
        let log = log
            .cloned()
            .unwrap_or_else(|| Logger::root(slog_stdlog::StdLog.fuse(), o!()));
        ResourceRegistry {
            provider,
            state: Mutex::new(State::default()),
            log,
        }
    }

    pub async fn load_selection(
        &self,
        params: LoadSelection,
    ) -> Result<SelectionLoaded, EndpointError> {
        let provider = Arc::clone(&self.provider);
        let selection = blocking(move || {
            let dataset = provider.open(&params.path)?;
            let ids = if params.node_sets.is_empty() {
                dataset.node_ids(&params.population)?
            } else {
                dataset.node_sets(&params.population, &params.node_sets)?
            };
            let ids = match params.max_count {
                Some(count) => pick(&ids, usize::try_from(count).unwrap_or(usize::MAX)),
                None => ids,
            };
            Ok(Selection {
                dataset,
                population: params.population,
                ids,
            })
        })
        .await?;

        let size = selection.ids.len() as u64;
        let mut state = self.state.lock().await;
        let handle = state.selection_ids.acquire();
        state.selections.insert(handle, Arc::new(selection));
        info!(self.log, "loaded selection"; "handle" => handle, "size" => size);
        Ok(SelectionLoaded { handle, size })
    }

    pub async fn unload_selection(&self, handle: u64) -> Result<(), EndpointError> {
        let mut state = self.state.lock().await;
        if state.selections.remove(&handle).is_none() {
            return Err(selection_not_found(handle));
        }

        let reports: Vec<u64> = state
            .reports
            .iter()
            .filter(|(_, binding)| binding.selection == handle)
            .map(|(report, _)| *report)
            .collect();
        for report in &reports {
            state.reports.remove(report);
            state.report_ids.release(*report);
        }
        state.selection_ids.release(handle);
        info!(self.log, "unloaded selection";
              "handle" => handle, "reports" => reports.len());
        Ok(())
    }

    pub async fn ids(&self, handle: u64) -> Result<Output<Count>, EndpointError> {
        let selection = self.state.lock().await.selection(handle)?;
        let mut binary = BytesMut::with_capacity(selection.ids.len() * 8);
        for id in &selection.ids {
            binary.put_u64_le(*id);
        }
        let count = Count {
            count: selection.ids.len() as u64,
        };
        Ok(Output::new(count, binary.freeze()))
    }

    pub async fn positions(&self, handle: u64) -> Result<Output<Count>, EndpointError> {
        let selection = self.state.lock().await.selection(handle)?;
        let count = Count {
            count: selection.ids.len() as u64,
        };
        let positions = blocking(move || {
            selection
                .dataset
                .positions(&selection.population, &selection.ids)
        })
        .await?;

        let mut binary = BytesMut::with_capacity(positions.len() * 12);
        for [x, y, z] in positions {
            binary.put_f32_le(x);
            binary.put_f32_le(y);
            binary.put_f32_le(z);
        }
        Ok(Output::new(count, binary.freeze()))
    }

    pub async fn load_report(&self, params: LoadReport) -> Result<Handle, EndpointError> {
        let nodes = self.state.lock().await.selection(params.selection)?;
        let name = params.name.clone();
        let opened = Arc::clone(&nodes);
        let reader = blocking(move || {
            if opened.dataset.reports(&opened.population).is_empty() {
                return Ok(None);
            }
            opened
                .dataset
                .open_report(&opened.population, &name)
                .map(Some)
        })
        .await?
        .ok_or_else(|| {
            EndpointError::invalid_params(format!("Selection {} has no reports", params.selection))
        })?;

        // The selection may have been unloaded while the report was opening.
        let mut state = self.state.lock().await;
        if !state.selections.contains_key(&params.selection) {
            return Err(selection_not_found(params.selection));
        }
        let handle = state.report_ids.acquire();
        state.reports.insert(
            handle,
            Arc::new(ReportBinding {
                selection: params.selection,
                nodes,
                reader,
            }),
        );
        info!(self.log, "loaded report";
              "handle" => handle, "name" => &params.name, "selection" => params.selection);
        Ok(Handle { handle })
    }

    pub async fn unload_report(&self, handle: u64) -> Result<(), EndpointError> {
        let mut state = self.state.lock().await;
        if state.reports.remove(&handle).is_none() {
            return Err(report_not_found(handle));
        }
        state.report_ids.release(handle);
        info!(self.log, "unloaded report"; "handle" => handle);
        Ok(())
    }

    pub async fn report_info(&self, handle: u64) -> Result<ReportDescription, EndpointError> {
        let binding = self.state.lock().await.report(handle)?;
        let info = binding.reader.info();
        Ok(ReportDescription {
            kind: info.kind,
            start: info.start,
            end: info.end,
            time_step: info.time_step,
            unit: info.unit.clone(),
            frame_count: info.frame_count as u64,
        })
    }

    pub async fn frame(&self, params: GetFrame) -> Result<Output<Count>, EndpointError> {
        let binding = self.state.lock().await.report(params.handle)?;
        if params.min_value >= params.max_value {
            return Err(EndpointError::invalid_params(format!(
                "Invalid value range: min_value {} must be below max_value {}",
                params.min_value, params.max_value
            )));
        }

        let info = binding.reader.info();
        let time = info.start + params.index as f64 * info.time_step;
        debug!(self.log, "reading frame";
               "handle" => params.handle, "index" => params.index, "time" => time);
        let reading = Arc::clone(&binding);
        let values = blocking(move || reading.reader.read(time, &reading.nodes.ids)).await?;

        let frame: Vec<u8> = values
            .iter()
            .map(|value| quantize(*value, params.min_value, params.max_value))
            .collect();
        let count = Count {
            count: frame.len() as u64,
        };
        Ok(Output::new(count, frame))
    }
}

impl Component for ResourceRegistry {
    fn name(&self) -> &'static str {
        "resources"
    }

    fn register(self: Arc<Self>, endpoints: &mut EndpointRegistry) -> Result<(), RegistryError> {
        let this = Arc::clone(&self);
        endpoints.add(
            "load-selection",
            "Select nodes of a dataset population",
            move |Json(params): Json<LoadSelection>| {
                let this = Arc::clone(&this);
                async move { this.load_selection(params).await.map(Json) }
            },
        )?;

        let this = Arc::clone(&self);
        endpoints.add(
            "unload-selection",
            "Release a selection and the reports loaded on it",
            move |Json(params): Json<Handle>| {
                let this = Arc::clone(&this);
                async move { this.unload_selection(params.handle).await }
            },
        )?;

        let this = Arc::clone(&self);
        endpoints.add(
            "get-ids",
            "Node ids of a selection as little-endian u64",
            move |Json(params): Json<Handle>| {
                let this = Arc::clone(&this);
                async move { this.ids(params.handle).await }
            },
        )?;

        let this = Arc::clone(&self);
        endpoints.add(
            "get-positions",
            "Node positions of a selection as little-endian f32 x, y, z",
            move |Json(params): Json<Handle>| {
                let this = Arc::clone(&this);
                async move { this.positions(params.handle).await }
            },
        )?;

        let this = Arc::clone(&self);
        endpoints.add(
            "load-report",
            "Open a report for the nodes of a selection",
            move |Json(params): Json<LoadReport>| {
                let this = Arc::clone(&this);
                async move { this.load_report(params).await.map(Json) }
            },
        )?;

        let this = Arc::clone(&self);
        endpoints.add(
            "unload-report",
            "Release a report",
            move |Json(params): Json<Handle>| {
                let this = Arc::clone(&this);
                async move { this.unload_report(params.handle).await }
            },
        )?;

        let this = Arc::clone(&self);
        endpoints.add(
            "get-report-info",
            "Time range and unit of a report",
            move |Json(params): Json<Handle>| {
                let this = Arc::clone(&this);
                async move { this.report_info(params.handle).await.map(Json) }
            },
        )?;

        endpoints.add(
            "get-frame",
            "One byte per node of a report frame rescaled to [0, 255]",
            move |Json(params): Json<GetFrame>| {
                let this = Arc::clone(&self);
                async move { this.frame(params).await }
            },
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use byteorder::{ByteOrder, LittleEndian};
    use quickcheck::quickcheck;

    use super::*;
    use crate::dataset::ReportInfo;
    use crate::protocol::ErrorCode;

    /// Nodes `0..count` at `(i, 2i, 3i)`; report values are `id + time`.
    struct Grid {
        count: u64,
        node_sets: BTreeMap<String, Vec<u64>>,
        info: ReportInfo,
    }

    impl Grid {
        fn new(count: u64) -> Grid {
            let mut node_sets = BTreeMap::new();
            node_sets.insert("odd".to_string(), (1..count).step_by(2).collect());
            Grid {
                count,
                node_sets,
                info: ReportInfo {
                    kind: ReportKind::Soma,
                    start: 10.0,
                    end: 20.0,
                    time_step: 1.0,
                    unit: "mV".to_string(),
                    frame_count: 10,
                },
            }
        }

        fn check_population(&self, population: &str) -> Result<(), DatasetError> {
            if population == "cells" || population == "bare" {
                Ok(())
            } else {
                Err(DatasetError::UnknownPopulation(population.to_string()))
            }
        }
    }

    impl Dataset for Grid {
        fn node_ids(&self, population: &str) -> Result<Vec<u64>, DatasetError> {
            self.check_population(population)?;
            Ok((0..self.count).collect())
        }

        fn node_sets(&self, population: &str, names: &[String]) -> Result<Vec<u64>, DatasetError> {
            self.check_population(population)?;
            let unknown: Vec<String> = names
                .iter()
                .filter(|n| !self.node_sets.contains_key(n.as_str()))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                return Err(DatasetError::UnknownNodeSets(unknown));
            }
            let ids: BTreeSet<u64> = names
                .iter()
                .flat_map(|n| self.node_sets[n.as_str()].iter().copied())
                .collect();
            Ok(ids.into_iter().collect())
        }

        fn positions(&self, _population: &str, ids: &[u64]) -> Result<Vec<[f32; 3]>, DatasetError> {
            Ok(ids
                .iter()
                .map(|id| {
                    let i = *id as f32;
                    [i, 2.0 * i, 3.0 * i]
                })
                .collect())
        }

        fn reports(&self, population: &str) -> Vec<String> {
            match population {
                "cells" => vec!["soma".to_string()],
                _ => Vec::new(),
            }
        }

        fn open_report(
            &self,
            _population: &str,
            name: &str,
        ) -> Result<Arc<dyn ReportReader>, DatasetError> {
            if name != "soma" {
                return Err(DatasetError::UnknownReport(name.to_string()));
            }
            Ok(Arc::new(GridReport(self.info.clone())))
        }
    }

    struct GridReport(ReportInfo);

    impl ReportReader for GridReport {
        fn info(&self) -> &ReportInfo {
            &self.0
        }

        fn read(&self, time: f64, ids: &[u64]) -> Result<Vec<f32>, DatasetError> {
            if time >= self.0.end {
                return Err(DatasetError::TimeOutOfRange {
                    time,
                    start: self.0.start,
                    end: self.0.end,
                });
            }
            Ok(ids.iter().map(|id| *id as f32 + time as f32).collect())
        }
    }

    struct GridProvider;

    impl DatasetProvider for GridProvider {
        fn open(&self, path: &str) -> Result<Arc<dyn Dataset>, DatasetError> {
            match path {
                "grid" => Ok(Arc::new(Grid::new(10))),
                _ => Err(DatasetError::NotFound {
                    path: path.to_string(),
                    reason: "no such dataset".to_string(),
                }),
            }
        }
    }

    fn registry() -> ResourceRegistry {
        ResourceRegistry::new(Arc::new(GridProvider), None)
    }

    fn selection(max_count: Option<u64>, node_sets: &[&str]) -> LoadSelection {
        LoadSelection {
            path: "grid".to_string(),
            population: "cells".to_string(),
            node_sets: node_sets.iter().map(|s| s.to_string()).collect(),
            max_count,
        }
    }

    fn message(err: EndpointError) -> (Option<ErrorCode>, String) {
        let err = err.into_rpc();
        (err.error_code(), err.message)
    }

    #[test]
    fn pick_examples() {
        assert_eq!(pick(&[1, 2, 3, 4], 3), vec![2, 3, 4]);
        assert_eq!(pick(&[1, 2, 3, 4], 2), vec![2, 3]);
        let items: Vec<u32> = (1..=10).collect();
        assert_eq!(pick(&items, 5), vec![2, 3, 5, 7, 9]);
        assert_eq!(pick(&items, 10), items);
        assert_eq!(pick(&items, 50), items);
        assert!(pick(&items, 0).is_empty());
    }

    quickcheck! {
        fn prop_pick_is_ordered_subset(items: Vec<u32>, count: usize) -> bool {
            let mut items = items;
            items.sort_unstable();
            items.dedup();
            let count = count % (items.len() + 2);
            let picked = pick(&items, count);
            picked.len() == count.min(items.len())
                && picked.windows(2).all(|w| w[0] < w[1])
                && picked.iter().all(|p| items.contains(p))
        }
    }

    #[test]
    fn id_pool_recycles_smallest_first() {
        let mut pool = IdPool::default();
        assert_eq!((pool.acquire(), pool.acquire(), pool.acquire()), (0, 1, 2));
        pool.release(2);
        pool.release(0);
        pool.release(7);
        assert_eq!(pool.acquire(), 0);
        assert_eq!(pool.acquire(), 2);
        assert_eq!(pool.acquire(), 3);
    }

    #[test]
    fn frame_quantization() {
        assert_eq!(quantize(-5.0, 0.0, 10.0), 0);
        assert_eq!(quantize(0.0, 0.0, 10.0), 0);
        assert_eq!(quantize(5.0, 0.0, 10.0), 127);
        assert_eq!(quantize(10.0, 0.0, 10.0), 255);
        assert_eq!(quantize(99.0, 0.0, 10.0), 255);
    }

    #[tokio::test]
    async fn selections() {
        let resources = registry();
        let loaded = resources.load_selection(selection(None, &[])).await.unwrap();
        assert_eq!(loaded, SelectionLoaded { handle: 0, size: 10 });

        let loaded = resources
            .load_selection(selection(Some(5), &[]))
            .await
            .unwrap();
        assert_eq!(loaded, SelectionLoaded { handle: 1, size: 5 });
        let ids = resources.ids(1).await.unwrap();
        assert_eq!(ids.value, Count { count: 5 });
        let mut decoded = vec![0u64; 5];
        LittleEndian::read_u64_into(&ids.binary, &mut decoded);
        assert_eq!(decoded, vec![1, 2, 4, 6, 8]);

        let loaded = resources
            .load_selection(selection(None, &["odd"]))
            .await
            .unwrap();
        assert_eq!(loaded.size, 5);
        let positions = resources.positions(loaded.handle).await.unwrap();
        assert_eq!(positions.binary.len(), 5 * 12);
        let mut decoded = vec![0f32; 15];
        LittleEndian::read_f32_into(&positions.binary, &mut decoded);
        assert_eq!(&decoded[..6], &[1.0, 2.0, 3.0, 3.0, 6.0, 9.0]);
    }

    #[tokio::test]
    async fn selection_failures_are_invalid_params() {
        let resources = registry();
        let mut params = selection(None, &[]);
        params.path = "missing".to_string();
        let (code, _) = message(resources.load_selection(params).await.unwrap_err());
        assert_eq!(code, Some(ErrorCode::InvalidParams));

        let mut params = selection(None, &[]);
        params.population = "glia".to_string();
        let (code, text) = message(resources.load_selection(params).await.unwrap_err());
        assert_eq!(code, Some(ErrorCode::InvalidParams));
        assert_eq!(text, "Unknown population 'glia'");

        let params = selection(None, &["odd", "even", "big"]);
        let (_, text) = message(resources.load_selection(params).await.unwrap_err());
        assert_eq!(text, "Unknown node sets: even, big");

        let (_, text) = message(resources.ids(3).await.unwrap_err());
        assert_eq!(text, "Selection registered with ID 3 could not be found");
        assert!(resources.unload_selection(0).await.is_err());
    }

    #[tokio::test]
    async fn frames() {
        let resources = registry();
        let selection = resources
            .load_selection(selection(Some(3), &[]))
            .await
            .unwrap();
        let report = resources
            .load_report(LoadReport {
                selection: selection.handle,
                name: "soma".to_string(),
            })
            .await
            .unwrap();

        let info = resources.report_info(report.handle).await.unwrap();
        assert_eq!(info.kind, ReportKind::Soma);
        assert_eq!(info.frame_count, 10);

        // Nodes 2, 4, 7 at time 11.
        let frame = resources
            .frame(GetFrame {
                handle: report.handle,
                index: 1,
                min_value: 12.0,
                max_value: 17.0,
            })
            .await
            .unwrap();
        assert_eq!(frame.value, Count { count: 3 });
        assert_eq!(&frame.binary[..], &[51, 153, 255]);

        let err = resources
            .frame(GetFrame {
                handle: report.handle,
                index: 0,
                min_value: 1.0,
                max_value: 1.0,
            })
            .await
            .unwrap_err();
        assert_eq!(message(err).0, Some(ErrorCode::InvalidParams));

        let err = resources
            .frame(GetFrame {
                handle: report.handle,
                index: 10,
                min_value: 0.0,
                max_value: 1.0,
            })
            .await
            .unwrap_err();
        assert_eq!(message(err).0, Some(ErrorCode::InvalidParams));

        let err = resources
            .load_report(LoadReport {
                selection: selection.handle,
                name: "spikes".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(message(err).1, "Unknown report 'spikes'");
    }

    #[tokio::test]
    async fn selection_without_reports() {
        let resources = registry();
        let cells = resources.load_selection(selection(None, &[])).await.unwrap();
        let mut params = selection(None, &[]);
        params.population = "bare".to_string();
        let bare = resources.load_selection(params).await.unwrap();
        assert_eq!((cells.handle, bare.handle), (0, 1));

        let err = resources
            .load_report(LoadReport {
                selection: bare.handle,
                name: "soma".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(
            message(err),
            (
                Some(ErrorCode::InvalidParams),
                "Selection 1 has no reports".to_string()
            )
        );

        // Nothing was registered for the failed attempt.
        let report = resources
            .load_report(LoadReport {
                selection: cells.handle,
                name: "soma".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(report.handle, 0);
    }

    #[tokio::test]
    async fn unloading_a_selection_unloads_its_reports() {
        let resources = registry();
        let first = resources.load_selection(selection(None, &[])).await.unwrap();
        let second = resources.load_selection(selection(None, &[])).await.unwrap();
        let load = |selection: u64| LoadReport {
            selection,
            name: "soma".to_string(),
        };
        let doomed = resources.load_report(load(first.handle)).await.unwrap();
        let kept = resources.load_report(load(second.handle)).await.unwrap();
        assert_eq!((doomed.handle, kept.handle), (0, 1));

        resources.unload_selection(first.handle).await.unwrap();
        let err = resources
            .frame(GetFrame {
                handle: doomed.handle,
                index: 0,
                min_value: 0.0,
                max_value: 1.0,
            })
            .await
            .unwrap_err();
        assert_eq!(
            message(err),
            (
                Some(ErrorCode::InvalidParams),
                "Report registered with ID 0 could not be found".to_string()
            )
        );
        assert!(resources.report_info(kept.handle).await.is_ok());

        let again = resources.load_selection(selection(None, &[])).await.unwrap();
        assert_eq!(again.handle, first.handle);
        assert_ne!(again.handle, second.handle);

        resources.unload_report(kept.handle).await.unwrap();
        assert!(resources.unload_report(kept.handle).await.is_err());
    }
}
