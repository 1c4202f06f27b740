//! Collapse a collection into a single dataset.

use crate::error::{ConfigurationError, DataShapeError, NormalizeError, NormalizeResult};
use crate::logs::log_info_indent;
use crate::models::{LabeledCollection, LabeledDataset};

/// Union of all variables and coordinates of a collection.
///
/// Same-named variables (or coordinates) are accepted only when identical.
/// Shared axes must agree in size. Dataset-level attributes are discarded:
/// provenance survives on each variable's `name` attribute.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeDatasets;

impl MergeDatasets {
    pub fn new() -> Self {
        Self
    }

    pub fn label(&self) -> String {
        "merge".to_string()
    }

    pub fn merge(&self, collection: LabeledCollection) -> NormalizeResult<LabeledDataset> {
        let inputs = collection.len();
        let mut merged = LabeledDataset::default();

        for (_, dataset) in collection {
            let (variables, coords, _) = dataset.into_parts();

            for (name, coord) in coords {
                match merged.coord(&name) {
                    Some(existing) if existing.same_content(&coord) => {}
                    Some(_) => return Err(ConfigurationError::CoordinateConflict(name).into()),
                    None => merged.insert_coord(name, coord).map_err(axis_conflict)?,
                }
            }

            for (name, variable) in variables {
                match merged.variable(&name) {
                    Some(existing) if existing.same_content(&variable) => {}
                    Some(_) => return Err(ConfigurationError::VariableConflict(name).into()),
                    None => merged.insert_variable(name, variable).map_err(axis_conflict)?,
                }
            }
        }

        log_info_indent(
            format!("Merged {} datasets into {} variables", inputs, merged.len()),
            2,
        );
        Ok(merged)
    }
}

/// Axis disagreements between inputs are a pipeline problem, not a bad dataset.
fn axis_conflict(err: DataShapeError) -> NormalizeError {
    match err {
        DataShapeError::AxisSizeConflict { axis, left, right } => {
            ConfigurationError::AxisSizeConflict { axis, left, right }.into()
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinate, Variable};

    fn signal(key: &str, variable: &str, values: Vec<f64>) -> (String, LabeledDataset) {
        let times: Vec<f64> = (0..values.len()).map(|i| i as f64 * 0.1).collect();
        let ds = LabeledDataset::new(key)
            .with_variable(variable, Variable::vector("time", values).with_attr("name", format!("amc/{}", variable)))
            .unwrap()
            .with_coord("time", Coordinate::numeric("time", times))
            .unwrap();
        (key.to_string(), ds)
    }

    #[test]
    fn test_disjoint_union() {
        let collection = LabeledCollection::from([
            signal("amc_ip", "ip", vec![1.0, 2.0, 3.0]),
            signal("amc_tf", "tf", vec![4.0, 5.0, 6.0]),
        ]);
        let merged = MergeDatasets.merge(collection).unwrap();

        assert_eq!(merged.variable_names(), vec!["ip".to_string(), "tf".to_string()]);
        assert_eq!(merged.coord_names(), vec!["time".to_string()]);
        assert!(merged.attrs.is_empty());
        assert_eq!(merged.variable("tf").unwrap().attrs["name"], "amc/tf");
    }

    #[test]
    fn test_identical_duplicates_accepted() {
        let collection = LabeledCollection::from([
            signal("a", "ip", vec![1.0, f64::NAN]),
            signal("b", "ip", vec![1.0, f64::NAN]),
        ]);
        let merged = MergeDatasets.merge(collection).unwrap();
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_variable_conflict() {
        let collection = LabeledCollection::from([
            signal("a", "ip", vec![1.0, 2.0]),
            signal("b", "ip", vec![1.0, 3.0]),
        ]);
        let err = MergeDatasets.merge(collection).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::Configuration(ConfigurationError::VariableConflict(ref name)) if name == "ip"
        ));
    }

    #[test]
    fn test_coordinate_conflict() {
        let (_, mut shifted) = signal("b", "tf", vec![1.0, 2.0]);
        shifted.insert_coord("time", Coordinate::numeric("time", vec![5.0, 6.0])).unwrap();
        let collection = LabeledCollection::from([signal("a", "ip", vec![1.0, 2.0]), ("b".to_string(), shifted)]);

        let err = MergeDatasets.merge(collection).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::Configuration(ConfigurationError::CoordinateConflict(_))
        ));
    }

    #[test]
    fn test_axis_size_conflict() {
        let a = LabeledDataset::new("a")
            .with_variable("ip", Variable::vector("time", vec![1.0, 2.0]))
            .unwrap();
        let b = LabeledDataset::new("b")
            .with_variable("tf", Variable::vector("time", vec![1.0, 2.0, 3.0]))
            .unwrap();
        let collection = LabeledCollection::from([("a".to_string(), a), ("b".to_string(), b)]);

        let err = MergeDatasets.merge(collection).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::Configuration(ConfigurationError::AxisSizeConflict { left: 2, right: 3, .. })
        ));
    }

    #[test]
    fn test_empty_collection() {
        let merged = MergeDatasets.merge(LabeledCollection::new()).unwrap();
        assert!(merged.is_empty());
    }
}
