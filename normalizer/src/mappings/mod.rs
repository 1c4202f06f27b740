//! Dimension rename table.
//!
//! A read-only mapping from dataset name to `{old_axis: new_axis}`, loaded
//! once per process and shared (via `Arc`) by every transform that needs it.
//!
//! ```json
//! {
//!   "efm_f_coil_current": {"dim_0": "fcoil_n"},
//!   "asx_time": {"dim_1": "time"}
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use crate::error::{PipelineError, PipelineResult};

/// Default location of the table, relative to the working directory.
pub const DEFAULT_MAPPINGS_PATH: &str = "mappings/dim_names.json";

/// Axis renames for one dataset.
pub type DimensionRenames = BTreeMap<String, String>;

/// Dataset name to axis renames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionTable {
    entries: HashMap<String, DimensionRenames>,
}

impl DimensionTable {
    /// An empty table: every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a table from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a table from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Mapping(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content).map_err(|e| {
            PipelineError::Mapping(format!("Invalid table {}: {}", path.display(), e))
        })
    }

    /// Add or replace the renames for one dataset name.
    pub fn insert<K, V>(&mut self, dataset: &str, renames: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let renames = renames
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.entries.insert(dataset.to_string(), renames);
    }

    /// Renames for a dataset name, if it is in the table.
    pub fn lookup(&self, dataset: &str) -> Option<&DimensionRenames> {
        self.entries.get(dataset)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
