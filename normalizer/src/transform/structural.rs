//! Single-purpose structural transforms.
//!
//! None of these look at signal values except to detect all-zero arrays;
//! they rename, prune and regroup.

use std::sync::Arc;

use serde_json::{json, Value};

use super::{CollectionTransform, DatasetTransform};
use crate::error::{ConfigurationError, DataShapeError, NormalizeResult};
use crate::mappings::DimensionTable;
use crate::models::{CoordValues, LabeledCollection, LabeledDataset, Variable, DIMS_ATTR, NAME_ATTR};

const DATA_VAR: &str = "data";
const ERROR_VAR: &str = "error";
const TIME_COORD: &str = "time";

// =============================================================================
// RenameDimensions
// =============================================================================

/// Squeeze size-1 axes, then rename axes listed for this dataset's name.
#[derive(Debug, Clone)]
pub struct RenameDimensions {
    table: Arc<DimensionTable>,
}

impl RenameDimensions {
    pub fn new(table: Arc<DimensionTable>) -> Self {
        Self { table }
    }
}

impl DatasetTransform for RenameDimensions {
    fn label(&self) -> String {
        "rename_dimensions".to_string()
    }

    fn apply(&self, mut dataset: LabeledDataset) -> NormalizeResult<LabeledDataset> {
        let name = dataset.require_name()?;
        dataset.squeeze();

        let Some(renames) = self.table.lookup(&name) else {
            return Ok(dataset);
        };

        dataset.rename_dims(renames)?;
        for (old, new) in renames {
            if old == new || dataset.coord(old).is_none() {
                continue;
            }
            if dataset.coord(new).is_some() {
                return Err(ConfigurationError::CoordinateConflict(new.clone()).into());
            }
            dataset.rename_coord(old, new);
        }

        let dims: Vec<Value> = dataset.dim_names().into_iter().map(Value::String).collect();
        dataset.attrs.insert(DIMS_ATTR.to_string(), Value::Array(dims));
        Ok(dataset)
    }
}

// =============================================================================
// DropZeroDimensions
// =============================================================================

/// Prune axes whose coordinate is all zeros.
///
/// The axis goes entirely: the coordinate, every other coordinate along it
/// and every variable that spans it. Only coordinate values are inspected.
#[derive(Debug, Clone, Default)]
pub struct DropZeroDimensions;

impl DatasetTransform for DropZeroDimensions {
    fn label(&self) -> String {
        "drop_zero_dimensions".to_string()
    }

    fn apply(&self, mut dataset: LabeledDataset) -> NormalizeResult<LabeledDataset> {
        let zero: Vec<(String, String)> = dataset
            .coords()
            .filter(|(_, coord)| coord.is_all_zero())
            .map(|(key, coord)| (key.clone(), coord.dim.clone()))
            .collect();

        for (key, dim) in zero {
            dataset.remove_coord(&key);
            let on_axis: Vec<String> = dataset
                .coords()
                .filter(|(_, coord)| coord.dim == dim)
                .map(|(name, _)| name.clone())
                .collect();
            for name in on_axis {
                dataset.remove_coord(&name);
            }
            let spanning: Vec<String> = dataset
                .variables()
                .filter(|(_, variable)| variable.has_dim(&dim))
                .map(|(name, _)| name.clone())
                .collect();
            for name in spanning {
                dataset.remove_variable(&name);
            }
        }
        Ok(dataset)
    }
}

// =============================================================================
// StandardizeSignalDataset
// =============================================================================

/// Give a single-signal dataset its canonical variable names.
///
/// `data` becomes the signal name (`time` becomes `time_`), a non-trivial
/// `error` becomes `<name>_error`, and the dataset name becomes
/// `<source>/<name>`. The updated attributes are copied onto the signal
/// variable so they survive the merge.
#[derive(Debug, Clone)]
pub struct StandardizeSignalDataset {
    source: String,
}

impl StandardizeSignalDataset {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }

    /// Variable name for a signal, avoiding the `time` axis name.
    pub fn canonical_name(name: &str) -> String {
        if name == TIME_COORD {
            format!("{}_", name)
        } else {
            name.to_string()
        }
    }
}

impl DatasetTransform for StandardizeSignalDataset {
    fn label(&self) -> String {
        format!("standardize_signal({})", self.source)
    }

    fn apply(&self, mut dataset: LabeledDataset) -> NormalizeResult<LabeledDataset> {
        dataset.squeeze();
        let name = dataset.require_name()?;

        let mut data = dataset
            .remove_variable(DATA_VAR)
            .ok_or_else(|| DataShapeError::MissingVariable {
                dataset: name.clone(),
                variable: DATA_VAR.to_string(),
            })?;
        let error = dataset
            .remove_variable(ERROR_VAR)
            .filter(|error| !error.is_all_zero());

        let canonical = Self::canonical_name(&name);
        if let Some(error) = error {
            dataset.insert_variable(format!("{}_error", canonical), error)?;
        }

        dataset.attrs.insert(
            NAME_ATTR.to_string(),
            json!(format!("{}/{}", self.source, canonical)),
        );
        data.attrs
            .extend(dataset.attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
        dataset.insert_variable(canonical, data)?;
        Ok(dataset)
    }
}

// =============================================================================
// TimeAsData
// =============================================================================

/// For signals whose time points are the payload.
///
/// The `data` variable of these signals is blank and the real values sit in
/// the `time` coordinate. Only datasets listed in the dimension table are
/// touched: their axes are renamed, `data` is replaced by the `time`
/// coordinate values and the coordinate is removed.
#[derive(Debug, Clone)]
pub struct TimeAsData {
    table: Arc<DimensionTable>,
}

impl TimeAsData {
    pub fn new(table: Arc<DimensionTable>) -> Self {
        Self { table }
    }
}

impl DatasetTransform for TimeAsData {
    fn label(&self) -> String {
        "time_as_data".to_string()
    }

    fn apply(&self, mut dataset: LabeledDataset) -> NormalizeResult<LabeledDataset> {
        let name = dataset.require_name()?;
        let Some(renames) = self.table.lookup(&name) else {
            dataset.squeeze();
            return Ok(dataset);
        };

        // Taken before the squeeze, which would drop a single-point axis.
        let time = dataset
            .remove_coord(TIME_COORD)
            .ok_or_else(|| DataShapeError::MissingCoordinate {
                dataset: name.clone(),
                coordinate: TIME_COORD.to_string(),
            })?;
        let values = match time.values {
            CoordValues::Numeric(values) => values,
            CoordValues::Labels(_) => {
                return Err(DataShapeError::NonNumericCoordinate(TIME_COORD.to_string()).into());
            }
        };

        dataset.squeeze();
        dataset.rename_dims(renames)?;
        dataset.remove_variable(DATA_VAR);

        let data = if values.len() == 1 {
            Variable::scalar(values[0])
        } else {
            Variable::vector(renames.get(&time.dim).unwrap_or(&time.dim), values)
        };
        dataset.insert_variable(DATA_VAR, data)?;
        Ok(dataset)
    }
}

// =============================================================================
// DropDatasets
// =============================================================================

/// Remove named entries from a collection.
#[derive(Debug, Clone)]
pub struct DropDatasets {
    keys: Vec<String>,
}

impl DropDatasets {
    pub fn new<S: Into<String>>(keys: impl IntoIterator<Item = S>) -> Self {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl CollectionTransform for DropDatasets {
    fn label(&self) -> String {
        format!("drop_datasets({})", self.keys.join(", "))
    }

    fn apply(&self, mut collection: LabeledCollection) -> NormalizeResult<LabeledCollection> {
        for key in &self.keys {
            if collection.remove(key).is_none() {
                return Err(ConfigurationError::MissingKey(key.clone()).into());
            }
        }
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NormalizeError;
    use crate::models::Coordinate;

    fn table() -> Arc<DimensionTable> {
        let mut table = DimensionTable::new();
        table.insert("efm_psi", [("dim_0", "time"), ("dim_1", "r")]);
        table.insert("asx_hits", [("dim_0", "event")]);
        Arc::new(table)
    }

    fn psi() -> LabeledDataset {
        LabeledDataset::new("efm_psi")
            .with_variable(
                "data",
                Variable::from_vec(&["shot", "dim_0", "dim_1"], &[1, 2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap(),
            )
            .unwrap()
            .with_coord("dim_0", Coordinate::numeric("dim_0", vec![0.1, 0.2]))
            .unwrap()
    }

    #[test]
    fn test_rename_dimensions_squeezes_and_renames() {
        let out = RenameDimensions::new(table()).apply(psi()).unwrap();

        assert!(out.sizes().iter().all(|(_, size)| *size != 1));
        assert_eq!(out.dim_names(), vec!["time".to_string(), "r".to_string()]);
        assert_eq!(out.coord("time").unwrap().dim, "time");
        assert!(out.coord("dim_0").is_none());
        assert_eq!(out.attrs[DIMS_ATTR], json!(["time", "r"]));
    }

    #[test]
    fn test_rename_dimensions_is_idempotent() {
        let transform = RenameDimensions::new(table());
        let once = transform.apply(psi()).unwrap();
        let twice = transform.apply(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rename_dimensions_unknown_name_only_squeezes() {
        let ds = LabeledDataset::new("unlisted")
            .with_variable("data", Variable::from_vec(&["a", "b"], &[1, 2], vec![1.0, 2.0]).unwrap())
            .unwrap();
        let out = RenameDimensions::new(table()).apply(ds).unwrap();
        assert_eq!(out.dim_names(), vec!["b".to_string()]);
        assert!(!out.attrs.contains_key(DIMS_ATTR));
    }

    #[test]
    fn test_rename_dimensions_requires_name() {
        let ds = LabeledDataset::default()
            .with_variable("data", Variable::scalar(1.0))
            .unwrap();
        let err = RenameDimensions::new(table()).apply(ds).unwrap_err();
        assert!(matches!(err, NormalizeError::DataShape(DataShapeError::MissingAttribute(_))));
    }

    #[test]
    fn test_drop_zero_dimensions() {
        let ds = LabeledDataset::new("fcoil")
            .with_variable("data", Variable::from_vec(&["time", "bank"], &[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap())
            .unwrap()
            .with_variable("bank_gain", Variable::vector("bank", vec![5.0, 6.0]))
            .unwrap()
            .with_variable("spare", Variable::vector("unused", vec![7.0, 8.0, 9.0]))
            .unwrap()
            .with_coord("bank", Coordinate::numeric("bank", vec![1.0, 2.0]))
            .unwrap()
            .with_coord("unused", Coordinate::numeric("unused", vec![0.0, 0.0, 0.0]))
            .unwrap();

        let out = DropZeroDimensions.apply(ds).unwrap();

        assert!(out.coord("unused").is_none());
        assert!(!out.contains("spare"));
        assert!(!out.has_dim("unused"));
        assert_eq!(out.coord("bank"), Some(&Coordinate::numeric("bank", vec![1.0, 2.0])));
        assert!(out.contains("bank_gain"));
        assert!(out.contains("data"));
    }

    #[test]
    fn test_drop_zero_dimensions_removes_spanning_variables() {
        let ds = LabeledDataset::new("fcoil")
            .with_variable("data", Variable::from_vec(&["time", "bank"], &[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap())
            .unwrap()
            .with_variable("ip", Variable::vector("time", vec![5.0, 6.0]))
            .unwrap()
            .with_coord("bank", Coordinate::numeric("bank", vec![0.0, 0.0]))
            .unwrap()
            .with_coord("bank_label", Coordinate::labels("bank", vec!["a", "b"]))
            .unwrap();

        let out = DropZeroDimensions.apply(ds).unwrap();

        assert!(!out.has_dim("bank"));
        assert_eq!(out.dim_names(), vec!["time".to_string()]);
        assert_eq!(out.variable_names(), vec!["ip".to_string()]);
        assert!(out.coord("bank_label").is_none());
    }

    #[test]
    fn test_drop_zero_dimensions_has_no_tolerance() {
        let ds = LabeledDataset::new("x")
            .with_coord("r", Coordinate::numeric("r", vec![0.0, 1e-300]))
            .unwrap();
        let out = DropZeroDimensions.apply(ds).unwrap();
        assert!(out.coord("r").is_some());
    }

    #[test]
    fn test_standardize_time_signal() {
        let ds = LabeledDataset::new("time")
            .with_variable("data", Variable::vector("t", vec![0.0, 0.1, 0.2]))
            .unwrap()
            .with_variable("error", Variable::vector("t", vec![0.0, 0.0, 0.0]))
            .unwrap();

        let out = StandardizeSignalDataset::new("src").apply(ds).unwrap();

        assert_eq!(out.variable_names(), vec!["time_".to_string()]);
        assert_eq!(out.name(), Some("src/time_"));
        assert_eq!(out.variable("time_").unwrap().attrs[NAME_ATTR], "src/time_");
    }

    #[test]
    fn test_standardize_keeps_nonzero_error() {
        let ds = LabeledDataset::new("ip")
            .with_attr("units", "A")
            .with_variable("data", Variable::vector("time", vec![1.0, 2.0]))
            .unwrap()
            .with_variable("error", Variable::vector("time", vec![0.0, 0.5]))
            .unwrap();

        let out = StandardizeSignalDataset::new("amc").apply(ds).unwrap();

        assert_eq!(out.variable_names(), vec!["ip".to_string(), "ip_error".to_string()]);
        let ip = out.variable("ip").unwrap();
        assert_eq!(ip.attrs[NAME_ATTR], "amc/ip");
        assert_eq!(ip.attrs["units"], "A");
        assert!(!out.variable("ip_error").unwrap().attrs.contains_key(NAME_ATTR));
    }

    #[test]
    fn test_standardize_missing_data() {
        let ds = LabeledDataset::new("ip")
            .with_variable("error", Variable::vector("time", vec![1.0]))
            .unwrap();
        let err = StandardizeSignalDataset::new("amc").apply(ds).unwrap_err();
        assert!(err.to_string().contains("data"));
    }

    #[test]
    fn test_time_as_data() {
        let ds = LabeledDataset::new("asx_hits")
            .with_variable("data", Variable::vector("dim_0", vec![0.0, 0.0, 0.0]))
            .unwrap()
            .with_coord("time", Coordinate::numeric("dim_0", vec![0.5, 1.5, 2.5]))
            .unwrap();

        let out = TimeAsData::new(table()).apply(ds).unwrap();

        let data = out.variable("data").unwrap();
        assert_eq!(data.dims(), &["event".to_string()]);
        assert_eq!(data.values(), vec![0.5, 1.5, 2.5]);
        assert!(out.coord("time").is_none());
    }

    #[test]
    fn test_time_as_data_single_point() {
        let mut dims = DimensionTable::new();
        dims.insert("hits", [("time", "event")]);
        let ds = LabeledDataset::new("hits")
            .with_variable("data", Variable::vector("time", vec![0.0]))
            .unwrap()
            .with_coord("time", Coordinate::numeric("time", vec![0.7]))
            .unwrap();

        let out = TimeAsData::new(Arc::new(dims)).apply(ds).unwrap();

        let data = out.variable("data").unwrap();
        assert!(data.dims().is_empty());
        assert_eq!(data.values(), vec![0.7]);
        assert!(out.coord("time").is_none());
    }

    #[test]
    fn test_time_as_data_missing_time() {
        let ds = LabeledDataset::new("asx_hits")
            .with_variable("data", Variable::vector("dim_0", vec![0.0, 0.0]))
            .unwrap();
        let err = TimeAsData::new(table()).apply(ds).unwrap_err();
        assert!(matches!(err, NormalizeError::DataShape(DataShapeError::MissingCoordinate { .. })));
    }

    #[test]
    fn test_time_as_data_unlisted_passes_through() {
        let ds = LabeledDataset::new("asx_other")
            .with_variable("data", Variable::vector("dim_0", vec![1.0, 2.0]))
            .unwrap();
        let out = TimeAsData::new(table()).apply(ds.clone()).unwrap();
        assert_eq!(out, ds);
    }

    #[test]
    fn test_drop_datasets() {
        let mut collection = LabeledCollection::new();
        collection.insert("ip".into(), LabeledDataset::new("ip"));
        collection.insert("shot_number".into(), LabeledDataset::new("shot_number"));

        let drop = DropDatasets::new(["shot_number"]);
        assert_eq!(drop.keys(), &["shot_number".to_string()]);
        let out = drop.apply(collection.clone()).unwrap();
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["ip"]);

        let err = DropDatasets::new(["limitern"]).apply(collection).unwrap_err();
        assert!(err.to_string().contains("limitern"));
    }
}
