//! Serializable transform and step descriptions.
//!
//! Each variant names a concrete transform and carries its parameters. They
//! are turned into live transforms with [`DatasetOp::build`] /
//! [`StepDef::build`], which is where patterns are compiled and the shared
//! dimension table is attached.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ConfigResult;
use crate::mappings::DimensionTable;
use crate::transform::{
    DatasetTransform, DropDatasets, DropZeroDimensions, MapDatasets, RenameDimensions,
    StandardizeSignalDataset, Step, TensorizeChannels, TimeAsData,
};

/// Shared inputs needed to build transforms.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    /// Dimension rename table handed to rename-style transforms.
    pub dimensions: Arc<DimensionTable>,
    /// Default for `map` steps that do not say.
    pub parallel: bool,
}

impl BuildContext {
    pub fn new(dimensions: Arc<DimensionTable>) -> Self {
        Self {
            dimensions,
            parallel: false,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// All available dataset transforms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DatasetOp {
    /// Squeeze, then rename axes from the dimension table
    RenameDimensions,

    /// Remove axes whose coordinate is all zeros
    DropZeroDimensions,

    /// Canonical variable names under a source prefix
    StandardizeSignal { source: String },

    /// Move `time` coordinate values into `data`
    TimeAsData,

    /// Fuse numbered channels along a new axis
    TensorizeChannels {
        stem: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        regex: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dim_name: Option<String>,
        #[serde(default = "default_assign_coords")]
        assign_coords: bool,
    },
}

fn default_assign_coords() -> bool {
    true
}

impl DatasetOp {
    pub fn standardize(source: &str) -> Self {
        DatasetOp::StandardizeSignal {
            source: source.to_string(),
        }
    }

    /// Tensorize with the default pattern, axis name and coordinates.
    pub fn tensorize(stem: &str) -> Self {
        DatasetOp::TensorizeChannels {
            stem: stem.to_string(),
            regex: None,
            dim_name: None,
            assign_coords: true,
        }
    }

    /// Instantiate the transform.
    pub fn build(&self, ctx: &BuildContext) -> ConfigResult<Box<dyn DatasetTransform>> {
        let transform: Box<dyn DatasetTransform> = match self {
            DatasetOp::RenameDimensions => Box::new(RenameDimensions::new(Arc::clone(&ctx.dimensions))),
            DatasetOp::DropZeroDimensions => Box::new(DropZeroDimensions),
            DatasetOp::StandardizeSignal { source } => Box::new(StandardizeSignalDataset::new(source.clone())),
            DatasetOp::TimeAsData => Box::new(TimeAsData::new(Arc::clone(&ctx.dimensions))),
            DatasetOp::TensorizeChannels {
                stem,
                regex,
                dim_name,
                assign_coords,
            } => Box::new(TensorizeChannels::from_parts(
                stem,
                regex.as_deref(),
                dim_name.as_deref(),
                *assign_coords,
            )?),
        };
        Ok(transform)
    }
}

/// One pipeline step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepDef {
    /// Apply a dataset transform to every entry of the collection
    Map {
        transform: DatasetOp,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parallel: Option<bool>,
    },

    /// Remove entries from the collection
    DropDatasets { keys: Vec<String> },

    /// Merge the collection into one dataset
    Merge,

    /// Apply a dataset transform to the merged dataset
    Apply { transform: DatasetOp },
}

impl StepDef {
    pub fn map(transform: DatasetOp) -> Self {
        StepDef::Map {
            transform,
            parallel: None,
        }
    }

    pub fn apply(transform: DatasetOp) -> Self {
        StepDef::Apply { transform }
    }

    pub fn build(&self, ctx: &BuildContext) -> ConfigResult<Step> {
        let step = match self {
            StepDef::Map { transform, parallel } => {
                let mapper = MapDatasets::boxed(transform.build(ctx)?).parallel(parallel.unwrap_or(ctx.parallel));
                Step::collection(mapper)
            }
            StepDef::DropDatasets { keys } => Step::collection(DropDatasets::new(keys.iter().cloned())),
            StepDef::Merge => Step::merge(),
            StepDef::Apply { transform } => Step::Dataset(transform.build(ctx)?),
        };
        Ok(step)
    }
}

/// Get operations description for documentation and the CLI
pub fn operations_description() -> String {
    r#"Available pipeline steps:

| Step | Input -> Output | Parameters |
|------|-----------------|------------|
| map | collection -> collection | transform: dataset transform, parallel: bool (optional) |
| drop_datasets | collection -> collection | keys: list of collection keys (each must exist) |
| merge | collection -> dataset | - |
| apply | dataset -> dataset | transform: dataset transform |

Available dataset transforms:

| Transform | Description | Parameters |
|-----------|-------------|------------|
| rename_dimensions | Squeeze, then rename axes listed in the dimension table | - |
| drop_zero_dimensions | Remove axes whose coordinate is all zeros | - |
| standardize_signal | data -> <name>, error -> <name>_error, name -> <source>/<name> | source: prefix |
| time_as_data | Replace data with the time coordinate values (listed datasets only) | - |
| tensorize_channels | Fuse <stem>N variables along a new leading axis | stem, regex (one group), dim_name (default <stem>_channel), assign_coords (default true) |

Example definition:
{
  "source": "amb",
  "steps": [
    {"type": "map", "transform": {"type": "standardize_signal", "source": "amb"}},
    {"type": "merge"},
    {"type": "apply", "transform": {"type": "tensorize_channels", "stem": "ccbv"}}
  ]
}"#
    .to_string()
}
