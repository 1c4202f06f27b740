//! Declarative pipeline definitions
//!
//! This module provides:
//! - `operations`: serde-tagged dataset transforms and steps
//! - `definition`: a source name plus its ordered steps
//!
//! ## Usage Flow
//!
//! ```text
//! JSON definition → PipelineDefinition::from_json → build(ctx) → Pipeline → run_collection
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use diagnorm::transform::dsl::{BuildContext, PipelineDefinition};
//!
//! let definition = PipelineDefinition::from_json(&std::fs::read_to_string("pipelines/amb.json")?)?;
//! let pipeline = definition.build(&BuildContext::default())?;
//! let canonical = pipeline.run_collection(raw)?;
//! ```

pub mod definition;
pub mod operations;

// Re-exports for convenience
pub use definition::PipelineDefinition;
pub use operations::{operations_description, BuildContext, DatasetOp, StepDef};
