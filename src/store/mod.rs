//! Persistence sink for completed projection rows.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;

use crate::core::AggregateResult;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open projection store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to append projection row: {0}")]
    Append(#[from] std::io::Error),
    #[error("failed to encode projection row: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectionRow {
    pub scenario_id: String,
    pub simulation_count: u32,
    pub calculation_status: String,
    #[serde(flatten)]
    pub result: AggregateResult,
}

impl ProjectionRow {
    pub fn completed(scenario_id: String, simulation_count: u32, result: AggregateResult) -> Self {
        Self {
            scenario_id,
            simulation_count,
            calculation_status: "completed".to_string(),
            result,
        }
    }
}

pub trait ProjectionStore: Send + Sync {
    fn append(&self, row: &ProjectionRow) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    rows: Mutex<Vec<ProjectionRow>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<ProjectionRow> {
        self.rows.lock().expect("projection store lock poisoned").clone()
    }
}

impl ProjectionStore for InMemoryStore {
    fn append(&self, row: &ProjectionRow) -> Result<(), StoreError> {
        self.rows
            .lock()
            .expect("projection store lock poisoned")
            .push(row.clone());
        Ok(())
    }
}

/// Append-only JSON-lines file store, one row per completed simulation.
#[derive(Debug)]
pub struct JsonlStore {
    file: Mutex<File>,
}

impl JsonlStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| StoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ProjectionStore for JsonlStore {
    fn append(&self, row: &ProjectionRow) -> Result<(), StoreError> {
        let line = serde_json::to_string(row)?;
        let mut file = self.file.lock().expect("projection store lock poisoned");
        writeln!(file, "{line}")?;
        file.flush()?;
        Ok(())
    }
}
