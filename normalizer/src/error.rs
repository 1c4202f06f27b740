//! Error types for the normalization pipeline.
//!
//! The hierarchy mirrors the three failure families a run can hit:
//!
//! - [`ConfigurationError`] - bad pipeline definitions (unknown source, broken
//!   chain, fusion shape mismatch, merge conflicts)
//! - [`DataShapeError`] - a malformed individual dataset
//! - [`TransformError`] - a per-key failure inside a collection mapper
//! - [`NormalizeError`] - what every transform returns
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::transform::pipeline::PayloadKind;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors caused by a bad pipeline definition. Always fatal, never retried.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// No pipeline is registered under this source name.
    #[error("{0} is not a registered source")]
    UnregisteredSource(String),

    /// Two consecutive steps disagree on the payload they exchange.
    #[error("Step {} ({step}) expects a {expected} but the previous step produces a {found}", .index + 1)]
    ChainMismatch {
        /// Zero-based position; messages count from 1.
        index: usize,
        step: String,
        expected: PayloadKind,
        found: PayloadKind,
    },

    /// A pipeline was run with the wrong kind of input.
    #[error("Pipeline expects a {expected} as input, got a {found}")]
    PayloadMismatch {
        expected: PayloadKind,
        found: PayloadKind,
    },

    /// A pipeline produced something other than what the caller asked for.
    #[error("Pipeline produces a {found}, expected a {expected}")]
    OutputMismatch {
        expected: PayloadKind,
        found: PayloadKind,
    },

    /// The new channel axis name is already an axis of the channels themselves.
    #[error("Cannot fuse into '{stem}': channels already have an axis named '{dim}'")]
    DimensionInUse { stem: String, dim: String },

    /// Channel variables cannot be stacked because their layout differs.
    #[error("Cannot fuse '{variable}' into '{stem}': expected dims {expected:?}, found {found:?}")]
    ShapeMismatch {
        stem: String,
        variable: String,
        expected: Vec<(String, usize)>,
        found: Vec<(String, usize)>,
    },

    /// The same axis has two different sizes.
    #[error("Axis '{axis}' has conflicting sizes {left} and {right}")]
    AxisSizeConflict {
        axis: String,
        left: usize,
        right: usize,
    },

    /// Two inputs define the same variable with different content.
    #[error("Variable '{0}' is defined with conflicting values")]
    VariableConflict(String),

    /// Two inputs define the same coordinate with different content.
    #[error("Coordinate '{0}' is defined with conflicting values")]
    CoordinateConflict(String),

    /// A channel pattern is not a valid single-group regex.
    #[error("Invalid channel pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A rename would merge two distinct axes.
    #[error("Cannot rename axis '{from}' to '{to}' in '{dataset}': axis already exists")]
    RenameCollision {
        dataset: String,
        from: String,
        to: String,
    },

    /// A key listed for removal is not in the collection.
    #[error("Cannot drop '{0}': no such key in the collection")]
    MissingKey(String),

    /// The tensorizer output name is already taken by an unrelated variable.
    #[error("Variable '{0}' already exists and is not one of the fused channels")]
    StemExists(String),

    /// A pipeline definition file could not be understood.
    #[error("Invalid pipeline definition: {0}")]
    InvalidDefinition(String),
}

// =============================================================================
// Data Shape Errors
// =============================================================================

/// Errors caused by a malformed dataset.
#[derive(Debug, Error)]
pub enum DataShapeError {
    /// A variable the transform relies on is absent.
    #[error("Dataset '{dataset}' has no '{variable}' variable")]
    MissingVariable { dataset: String, variable: String },

    /// A required attribute is absent or not a string.
    #[error("Dataset has no string attribute '{0}'")]
    MissingAttribute(String),

    /// A coordinate the transform relies on is absent.
    #[error("Dataset '{dataset}' has no '{coordinate}' coordinate")]
    MissingCoordinate { dataset: String, coordinate: String },

    /// A coordinate holds labels where numbers were expected.
    #[error("Coordinate '{0}' holds labels, not numbers")]
    NonNumericCoordinate(String),

    /// Flat values do not fill the declared shape.
    #[error("Shape {shape:?} needs {expected} values, got {found}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        found: usize,
    },

    /// The declared shape does not fit in memory addressing.
    #[error("Shape {0:?} is too large")]
    ShapeOverflow(Vec<usize>),

    /// A multi-axis variable was given without its shape.
    #[error("Variable with {0} axes needs an explicit shape")]
    ShapeRequired(usize),

    /// Axis names do not match the array rank.
    #[error("Variable has {dims} axis names for an array of rank {rank}")]
    RankMismatch { dims: usize, rank: usize },

    /// The same axis has two different sizes inside one dataset.
    #[error("Axis '{axis}' has conflicting sizes {left} and {right}")]
    AxisSizeConflict {
        axis: String,
        left: usize,
        right: usize,
    },
}

// =============================================================================
// Transform Errors
// =============================================================================

/// A failure inside a collection mapper, attributed to one key.
#[derive(Debug, Error)]
#[error("{key}: {cause}")]
pub struct TransformError {
    /// Collection key whose dataset failed.
    pub key: String,
    /// What went wrong for that key.
    #[source]
    pub cause: Box<NormalizeError>,
}

impl TransformError {
    pub fn new(key: impl Into<String>, cause: NormalizeError) -> Self {
        Self {
            key: key.into(),
            cause: Box::new(cause),
        }
    }
}

// =============================================================================
// Normalize Errors
// =============================================================================

/// Error returned by every transform.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Data shape error: {0}")]
    DataShape(#[from] DataShapeError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),
}

impl NormalizeError {
    /// Collection key of the innermost keyed failure, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            NormalizeError::Transform(e) => Some(&e.key),
            _ => None,
        }
    }
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level orchestration errors.
///
/// This is the error returned by [`crate::transform::pipeline::Pipeline::run`]
/// and by the registry entry points. It wraps the innermost failure and adds
/// the step that raised it.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A step failed.
    #[error("Step {} ({step}) failed: {cause}", .index + 1)]
    Step {
        /// Zero-based position; messages count from 1.
        index: usize,
        step: String,
        #[source]
        cause: NormalizeError,
    },

    /// A pipeline failed while normalizing a named source.
    #[error("Source '{source_name}': {cause}")]
    Source {
        source_name: String,
        #[source]
        cause: Box<PipelineError>,
    },

    /// Registry or chain problem.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Dimension table could not be loaded.
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Attach the source name to a run failure.
    pub fn for_source(self, source_name: impl Into<String>) -> Self {
        PipelineError::Source {
            source_name: source_name.into(),
            cause: Box::new(self),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for configuration checks.
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Result type for dataset shape checks.
pub type ShapeResult<T> = Result<T, DataShapeError>;

/// Result type for transforms.
pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // ConfigurationError -> NormalizeError
        let config_err = ConfigurationError::UnregisteredSource("zzz".into());
        let err: NormalizeError = config_err.into();
        assert!(err.to_string().contains("zzz"));

        // DataShapeError -> NormalizeError
        let shape_err = DataShapeError::MissingAttribute("name".into());
        let err: NormalizeError = shape_err.into();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_transform_error_carries_key() {
        let cause = DataShapeError::MissingVariable {
            dataset: "ip".into(),
            variable: "data".into(),
        };
        let err: NormalizeError = TransformError::new("amc_plasma_current", cause.into()).into();
        assert_eq!(err.key(), Some("amc_plasma_current"));
        let msg = err.to_string();
        assert!(msg.contains("amc_plasma_current"));
        assert!(msg.contains("data"));
    }

    #[test]
    fn test_pipeline_error_format() {
        let err = PipelineError::Step {
            index: 2,
            step: "merge".into(),
            cause: ConfigurationError::VariableConflict("ip".into()).into(),
        }
        .for_source("amc");
        let msg = err.to_string();
        assert!(msg.contains("amc"));
        assert!(msg.contains("Step 3 (merge)"));
        assert!(msg.contains("ip"));
    }

    #[test]
    fn test_chain_mismatch_counts_from_one() {
        let err = ConfigurationError::ChainMismatch {
            index: 1,
            step: "map(drop_zero_dimensions)".into(),
            expected: PayloadKind::Collection,
            found: PayloadKind::Dataset,
        };
        assert!(err.to_string().starts_with("Step 2 (map(drop_zero_dimensions))"));
    }
}
