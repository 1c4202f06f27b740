//! Labeled data model for diagnostic signals.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Variable`] - N-dimensional array with named axes and attributes
//! - [`Coordinate`] - 1-D labels attached to one axis
//! - [`LabeledDataset`] - named variables sharing consistent axes
//! - [`LabeledCollection`] - signal key to dataset mapping
//!
//! Axes are identified by name, never by position.

mod dataset;

pub use dataset::LabeledDataset;

use std::collections::BTreeMap;

use ndarray::{Array1, ArrayD, Axis, IxDyn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DataShapeError, ShapeResult};

/// Free-form metadata. Always carries `name` on datasets.
pub type Attrs = BTreeMap<String, Value>;

/// Signal key to dataset. Ordered so runs are deterministic.
pub type LabeledCollection = BTreeMap<String, LabeledDataset>;

/// Attribute key holding the canonical identifier.
pub const NAME_ATTR: &str = "name";

/// Attribute key holding the ordered axis list after a rename.
pub const DIMS_ATTR: &str = "dims";

// =============================================================================
// Chunking Hint
// =============================================================================

/// How a downstream writer should materialize a variable.
///
/// Purely a performance hint; values are identical either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkHint {
    #[default]
    Eager,
    /// Let the writer pick chunk sizes.
    Auto,
}

// =============================================================================
// Variable
// =============================================================================

/// An array of values with one axis name per dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VariableRecord", into = "VariableRecord")]
pub struct Variable {
    dims: Vec<String>,
    data: ArrayD<f64>,
    /// Per-variable metadata.
    pub attrs: Attrs,
    /// Materialization hint.
    pub chunks: ChunkHint,
}

impl Variable {
    /// Wrap an array, checking one axis name per dimension.
    pub fn new<S: Into<String>>(dims: Vec<S>, data: ArrayD<f64>) -> ShapeResult<Self> {
        let dims: Vec<String> = dims.into_iter().map(Into::into).collect();
        if dims.len() != data.ndim() {
            return Err(DataShapeError::RankMismatch {
                dims: dims.len(),
                rank: data.ndim(),
            });
        }
        Ok(Self {
            dims,
            data,
            attrs: Attrs::new(),
            chunks: ChunkHint::Eager,
        })
    }

    /// Build from row-major values.
    pub fn from_vec(dims: &[&str], shape: &[usize], values: Vec<f64>) -> ShapeResult<Self> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| DataShapeError::ShapeOverflow(shape.to_vec()))?;
        let found = values.len();
        let data = ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|_| {
            DataShapeError::ShapeMismatch {
                shape: shape.to_vec(),
                expected,
                found,
            }
        })?;
        Self::new(dims.to_vec(), data)
    }

    /// A 1-D variable along `dim`.
    pub fn vector(dim: &str, values: Vec<f64>) -> Self {
        Self {
            dims: vec![dim.to_string()],
            data: Array1::from_vec(values).into_dyn(),
            attrs: Attrs::new(),
            chunks: ChunkHint::Eager,
        }
    }

    /// A zero-dimensional variable.
    pub fn scalar(value: f64) -> Self {
        Self {
            dims: Vec::new(),
            data: ArrayD::from_elem(IxDyn(&[]), value),
            attrs: Attrs::new(),
            chunks: ChunkHint::Eager,
        }
    }

    /// Set one attribute.
    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// `(axis, size)` pairs in axis order.
    pub fn sizes(&self) -> Vec<(String, usize)> {
        self.dims
            .iter()
            .cloned()
            .zip(self.data.shape().iter().copied())
            .collect()
    }

    /// Size along a named axis.
    pub fn size_of(&self, axis: &str) -> Option<usize> {
        self.dims
            .iter()
            .position(|d| d == axis)
            .map(|i| self.data.shape()[i])
    }

    pub fn has_dim(&self, axis: &str) -> bool {
        self.dims.iter().any(|d| d == axis)
    }

    /// Row-major copy of the values.
    pub fn values(&self) -> Vec<f64> {
        self.data.iter().copied().collect()
    }

    /// True when every value is exactly zero.
    pub fn is_all_zero(&self) -> bool {
        self.data.iter().all(|v| *v == 0.0)
    }

    /// Drop every axis of size 1. Returns the removed axis names.
    pub fn squeeze(&mut self) -> Vec<String> {
        let mut removed = Vec::new();
        for i in (0..self.dims.len()).rev() {
            if self.data.shape()[i] == 1 {
                let data = std::mem::replace(&mut self.data, ArrayD::zeros(IxDyn(&[])));
                self.data = data.index_axis_move(Axis(i), 0);
                removed.push(self.dims.remove(i));
            }
        }
        removed.reverse();
        removed
    }

    /// Rename axes through `map`; names missing from `map` are kept.
    pub fn rename_dims(&mut self, map: &BTreeMap<String, String>) {
        for dim in &mut self.dims {
            if let Some(new) = map.get(dim) {
                *dim = new.clone();
            }
        }
    }

    /// Same axes, same shape, same values. NaN equals NaN.
    pub fn same_content(&self, other: &Variable) -> bool {
        self.dims == other.dims
            && self.shape() == other.shape()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| a == b || (a.is_nan() && b.is_nan()))
    }
}

/// Wire form of a [`Variable`]. NaN travels as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VariableRecord {
    #[serde(default)]
    dims: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shape: Option<Vec<usize>>,
    values: Vec<Option<f64>>,
    #[serde(default)]
    attrs: Attrs,
    #[serde(default)]
    chunks: ChunkHint,
}

impl TryFrom<VariableRecord> for Variable {
    type Error = DataShapeError;

    fn try_from(record: VariableRecord) -> Result<Self, Self::Error> {
        let shape = match record.shape {
            Some(shape) => shape,
            None => match record.dims.len() {
                0 => Vec::new(),
                1 => vec![record.values.len()],
                rank => return Err(DataShapeError::ShapeRequired(rank)),
            },
        };
        let values: Vec<f64> = record
            .values
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        let dims: Vec<&str> = record.dims.iter().map(String::as_str).collect();
        let mut variable = Variable::from_vec(&dims, &shape, values)?;
        variable.attrs = record.attrs;
        variable.chunks = record.chunks;
        Ok(variable)
    }
}

impl From<Variable> for VariableRecord {
    fn from(variable: Variable) -> Self {
        let shape = variable.shape().to_vec();
        let values = variable
            .data
            .iter()
            .map(|v| if v.is_nan() { None } else { Some(*v) })
            .collect();
        Self {
            dims: variable.dims,
            shape: Some(shape),
            values,
            attrs: variable.attrs,
            chunks: variable.chunks,
        }
    }
}

// =============================================================================
// Coordinate
// =============================================================================

/// Labels along one axis: numbers or strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CoordRecord", into = "CoordRecord")]
pub enum CoordValues {
    Numeric(Vec<f64>),
    Labels(Vec<String>),
}

/// Wire form of [`CoordValues`]. NaN travels as `null`, like variable values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum CoordRecord {
    Numeric(Vec<Option<f64>>),
    Labels(Vec<String>),
}

impl From<CoordRecord> for CoordValues {
    fn from(record: CoordRecord) -> Self {
        match record {
            CoordRecord::Numeric(values) => {
                CoordValues::Numeric(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
            }
            CoordRecord::Labels(labels) => CoordValues::Labels(labels),
        }
    }
}

impl From<CoordValues> for CoordRecord {
    fn from(values: CoordValues) -> Self {
        match values {
            CoordValues::Numeric(values) => CoordRecord::Numeric(
                values
                    .into_iter()
                    .map(|v| if v.is_nan() { None } else { Some(v) })
                    .collect(),
            ),
            CoordValues::Labels(labels) => CoordRecord::Labels(labels),
        }
    }
}

impl CoordValues {
    pub fn len(&self) -> usize {
        match self {
            CoordValues::Numeric(v) => v.len(),
            CoordValues::Labels(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A labeling array attached to one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Axis the labels run along.
    pub dim: String,
    pub values: CoordValues,
}

impl Coordinate {
    pub fn numeric(dim: &str, values: Vec<f64>) -> Self {
        Self {
            dim: dim.to_string(),
            values: CoordValues::Numeric(values),
        }
    }

    pub fn labels<S: Into<String>>(dim: &str, values: Vec<S>) -> Self {
        Self {
            dim: dim.to_string(),
            values: CoordValues::Labels(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True for numeric coordinates whose values are all exactly zero.
    pub fn is_all_zero(&self) -> bool {
        match &self.values {
            CoordValues::Numeric(v) => v.iter().all(|x| *x == 0.0),
            CoordValues::Labels(_) => false,
        }
    }

    /// Same axis and same labels. NaN equals NaN.
    pub fn same_content(&self, other: &Coordinate) -> bool {
        if self.dim != other.dim {
            return false;
        }
        match (&self.values, &other.values) {
            (CoordValues::Numeric(a), CoordValues::Numeric(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b)
                        .all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
            }
            (CoordValues::Labels(a), CoordValues::Labels(b)) => a == b,
            _ => false,
        }
    }
}
