//! Transformation module.
//!
//! Transforms come in two shapes, each behind its own trait:
//! - [`DatasetTransform`]: one dataset in, one dataset out
//! - [`CollectionTransform`]: a keyed collection in, a keyed collection out
//!
//! The concrete transforms:
//! - Structural: rename, zero-axis pruning, signal standardization, key removal
//! - Tensorize: fuse numbered channel variables along a new axis
//! - Merge: fold a collection into one dataset
//! - Mapper: lift a dataset transform over a collection
//! - Pipeline: chain steps over a tagged payload
//! - DSL: serde definitions that build pipelines

use std::fmt;

use crate::error::NormalizeResult;
use crate::models::{LabeledCollection, LabeledDataset};

pub mod dsl;
pub mod mapper;
pub mod merge;
pub mod pipeline;
pub mod structural;
pub mod tensorize;

pub use dsl::*;
pub use mapper::MapDatasets;
pub use merge::MergeDatasets;
pub use pipeline::{Payload, PayloadKind, Pipeline, Step};
pub use structural::{DropDatasets, DropZeroDimensions, RenameDimensions, StandardizeSignalDataset, TimeAsData};
pub use tensorize::TensorizeChannels;

/// A dataset to dataset unit of work.
///
/// Implementations hold only read-only configuration, so one instance can be
/// applied to many datasets, from several threads.
pub trait DatasetTransform: Send + Sync + fmt::Debug {
    /// Short label used in logs and error messages.
    fn label(&self) -> String;

    fn apply(&self, dataset: LabeledDataset) -> NormalizeResult<LabeledDataset>;
}

/// A collection to collection unit of work.
pub trait CollectionTransform: Send + Sync + fmt::Debug {
    /// Short label used in logs and error messages.
    fn label(&self) -> String;

    fn apply(&self, collection: LabeledCollection) -> NormalizeResult<LabeledCollection>;
}
