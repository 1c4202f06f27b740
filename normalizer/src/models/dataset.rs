//! [`LabeledDataset`]: variables and coordinates over consistently sized axes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Attrs, Coordinate, Variable, NAME_ATTR};
use crate::error::{ConfigResult, ConfigurationError, DataShapeError, ShapeResult};

/// A mapping from variable name to [`Variable`], plus coordinates and attributes.
///
/// Every axis name has exactly one size across all variables and coordinates;
/// insertions that would break this are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DatasetRecord")]
pub struct LabeledDataset {
    variables: BTreeMap<String, Variable>,
    coords: BTreeMap<String, Coordinate>,
    /// Dataset-level metadata.
    pub attrs: Attrs,
}

#[derive(Deserialize)]
struct DatasetRecord {
    #[serde(default)]
    variables: BTreeMap<String, Variable>,
    #[serde(default)]
    coords: BTreeMap<String, Coordinate>,
    #[serde(default)]
    attrs: Attrs,
}

impl TryFrom<DatasetRecord> for LabeledDataset {
    type Error = DataShapeError;

    fn try_from(record: DatasetRecord) -> Result<Self, Self::Error> {
        let mut dataset = LabeledDataset {
            attrs: record.attrs,
            ..Default::default()
        };
        for (name, variable) in record.variables {
            dataset.insert_variable(name, variable)?;
        }
        for (name, coord) in record.coords {
            dataset.insert_coord(name, coord)?;
        }
        Ok(dataset)
    }
}

impl LabeledDataset {
    /// Empty dataset carrying a `name` attribute.
    pub fn new(name: &str) -> Self {
        let mut attrs = Attrs::new();
        attrs.insert(NAME_ATTR.to_string(), Value::String(name.to_string()));
        Self {
            attrs,
            ..Default::default()
        }
    }

    /// Builder form of [`insert_variable`](Self::insert_variable).
    pub fn with_variable(mut self, name: &str, variable: Variable) -> ShapeResult<Self> {
        self.insert_variable(name, variable)?;
        Ok(self)
    }

    /// Builder form of [`insert_coord`](Self::insert_coord).
    pub fn with_coord(mut self, name: &str, coord: Coordinate) -> ShapeResult<Self> {
        self.insert_coord(name, coord)?;
        Ok(self)
    }

    /// Set one dataset attribute.
    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    /// The `name` attribute, if it is a string.
    pub fn name(&self) -> Option<&str> {
        self.attrs.get(NAME_ATTR).and_then(Value::as_str)
    }

    /// The `name` attribute, or a [`DataShapeError::MissingAttribute`].
    pub fn require_name(&self) -> ShapeResult<String> {
        self.name()
            .map(str::to_string)
            .ok_or_else(|| DataShapeError::MissingAttribute(NAME_ATTR.to_string()))
    }

    // -------------------------------------------------------------------------
    // Variables
    // -------------------------------------------------------------------------

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.variables.iter()
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Insert or replace a variable after checking its axis sizes.
    pub fn insert_variable(&mut self, name: impl Into<String>, variable: Variable) -> ShapeResult<()> {
        let name = name.into();
        let known = self.axis_sizes_excluding(Some(&name), None);
        check_sizes(&known, variable.sizes())?;
        self.variables.insert(name, variable);
        Ok(())
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<Variable> {
        self.variables.remove(name)
    }

    // -------------------------------------------------------------------------
    // Coordinates
    // -------------------------------------------------------------------------

    pub fn coord(&self, name: &str) -> Option<&Coordinate> {
        self.coords.get(name)
    }

    pub fn coords(&self) -> impl Iterator<Item = (&String, &Coordinate)> {
        self.coords.iter()
    }

    pub fn coord_names(&self) -> Vec<String> {
        self.coords.keys().cloned().collect()
    }

    /// Insert or replace a coordinate after checking its axis size.
    pub fn insert_coord(&mut self, name: impl Into<String>, coord: Coordinate) -> ShapeResult<()> {
        let name = name.into();
        let known = self.axis_sizes_excluding(None, Some(&name));
        check_sizes(&known, vec![(coord.dim.clone(), coord.len())])?;
        self.coords.insert(name, coord);
        Ok(())
    }

    pub fn remove_coord(&mut self, name: &str) -> Option<Coordinate> {
        self.coords.remove(name)
    }

    /// Move a coordinate to a new key. Returns false when `from` does not exist.
    pub fn rename_coord(&mut self, from: &str, to: &str) -> bool {
        match self.coords.remove(from) {
            Some(coord) => {
                self.coords.insert(to.to_string(), coord);
                true
            }
            None => false,
        }
    }

    // -------------------------------------------------------------------------
    // Axes
    // -------------------------------------------------------------------------

    /// `(axis, size)` pairs in order of first appearance: variables by name,
    /// then coordinates.
    pub fn sizes(&self) -> Vec<(String, usize)> {
        let mut seen = BTreeSet::new();
        let mut sizes = Vec::new();
        let from_variables = self.variables.values().flat_map(Variable::sizes);
        let from_coords = self.coords.values().map(|c| (c.dim.clone(), c.len()));
        for (axis, size) in from_variables.chain(from_coords) {
            if seen.insert(axis.clone()) {
                sizes.push((axis, size));
            }
        }
        sizes
    }

    pub fn dim_names(&self) -> Vec<String> {
        self.sizes().into_iter().map(|(axis, _)| axis).collect()
    }

    pub fn size_of(&self, axis: &str) -> Option<usize> {
        self.sizes()
            .into_iter()
            .find(|(name, _)| name == axis)
            .map(|(_, size)| size)
    }

    pub fn has_dim(&self, axis: &str) -> bool {
        self.size_of(axis).is_some()
    }

    /// Drop every size-1 axis from all variables, and coordinates along them.
    /// Returns the removed axis names.
    pub fn squeeze(&mut self) -> Vec<String> {
        let unit: Vec<String> = self
            .sizes()
            .into_iter()
            .filter(|(_, size)| *size == 1)
            .map(|(axis, _)| axis)
            .collect();
        if unit.is_empty() {
            return unit;
        }
        for variable in self.variables.values_mut() {
            variable.squeeze();
        }
        self.coords.retain(|_, coord| !unit.contains(&coord.dim));
        unit
    }

    /// Rename axes simultaneously through `map`. Entries for axes that are
    /// not present are ignored, so applying the same map twice is a no-op.
    pub fn rename_dims(&mut self, map: &BTreeMap<String, String>) -> ConfigResult<()> {
        let present = self.dim_names();
        let applied: BTreeMap<String, String> = map
            .iter()
            .filter(|(old, new)| old != new && present.contains(*old))
            .map(|(old, new)| (old.clone(), new.clone()))
            .collect();
        if applied.is_empty() {
            return Ok(());
        }

        let mut targets: BTreeMap<String, String> = BTreeMap::new();
        for axis in &present {
            let target = applied.get(axis).unwrap_or(axis);
            if let Some(previous) = targets.insert(target.clone(), axis.clone()) {
                let from = if applied.contains_key(axis) { axis } else { &previous };
                return Err(ConfigurationError::RenameCollision {
                    dataset: self.name().unwrap_or("?").to_string(),
                    from: from.clone(),
                    to: target.clone(),
                });
            }
        }

        for variable in self.variables.values_mut() {
            variable.rename_dims(&applied);
        }
        for coord in self.coords.values_mut() {
            if let Some(new) = applied.get(&coord.dim) {
                coord.dim = new.clone();
            }
        }
        Ok(())
    }

    /// Split into variables, coordinates and attributes.
    pub fn into_parts(self) -> (BTreeMap<String, Variable>, BTreeMap<String, Coordinate>, Attrs) {
        (self.variables, self.coords, self.attrs)
    }

    fn axis_sizes_excluding(&self, variable: Option<&str>, coord: Option<&str>) -> BTreeMap<String, usize> {
        let from_variables = self
            .variables
            .iter()
            .filter(|(name, _)| Some(name.as_str()) != variable)
            .flat_map(|(_, v)| v.sizes());
        let from_coords = self
            .coords
            .iter()
            .filter(|(name, _)| Some(name.as_str()) != coord)
            .map(|(_, c)| (c.dim.clone(), c.len()));
        let mut sizes = BTreeMap::new();
        for (axis, size) in from_variables.chain(from_coords) {
            sizes.entry(axis).or_insert(size);
        }
        sizes
    }
}

fn check_sizes(known: &BTreeMap<String, usize>, incoming: Vec<(String, usize)>) -> ShapeResult<()> {
    for (axis, size) in incoming {
        if let Some(&existing) = known.get(&axis) {
            if existing != size {
                return Err(DataShapeError::AxisSizeConflict {
                    axis,
                    left: existing,
                    right: size,
                });
            }
        }
    }
    Ok(())
}
