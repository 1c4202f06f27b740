//! # Diagnorm - Diagnostic dataset normalization
//!
//! Diagnorm turns the raw signals of an instrument diagnostic (one labeled
//! dataset per signal, with inconsistent axis names, degenerate axes and
//! numbered channel variables) into one canonical labeled dataset per source.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Raw signals │────▶│  map(...)   │────▶│    Merge    │────▶│ Tensorize   │
//! │ (collection)│     │ (per key)   │     │ (1 dataset) │     │ (channels)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use diagnorm::Config;
//!
//! let registry = Config::from_env().registry()?;
//! let canonical = registry.run("amb", raw_signals)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Labeled datasets, variables and coordinates
//! - [`mappings`] - Dimension rename table
//! - [`transform`] - Transforms, pipelines and their JSON definitions
//! - [`registry`] - Source name to pipeline
//! - [`config`] - Environment configuration
//! - [`logs`] - Log broadcasting

// Core modules
pub mod error;
pub mod models;

// Configuration
pub mod config;
pub mod mappings;

// Transformation
pub mod transform;

// Registry
pub mod registry;

// Logging
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigurationError,
    DataShapeError,
    NormalizeError,
    PipelineError,
    TransformError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Attrs,
    ChunkHint,
    CoordValues,
    Coordinate,
    LabeledCollection,
    LabeledDataset,
    Variable,
};

// =============================================================================
// Re-exports - Transforms
// =============================================================================

pub use transform::{
    CollectionTransform,
    DatasetTransform,
    DropDatasets,
    DropZeroDimensions,
    MapDatasets,
    MergeDatasets,
    RenameDimensions,
    StandardizeSignalDataset,
    TensorizeChannels,
    TimeAsData,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{Payload, PayloadKind, Pipeline, Step};

// =============================================================================
// Re-exports - DSL
// =============================================================================

pub use transform::dsl::{
    operations_description,
    BuildContext,
    DatasetOp,
    PipelineDefinition,
    StepDef,
};

// =============================================================================
// Re-exports - Registry & Config
// =============================================================================

pub use config::Config;
pub use mappings::DimensionTable;
pub use registry::{load_definition, PipelineRegistry};
