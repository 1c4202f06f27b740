//! Lift a dataset transform over every entry of a collection.

use rayon::prelude::*;

use super::{CollectionTransform, DatasetTransform};
use crate::error::{NormalizeResult, TransformError};
use crate::models::{LabeledCollection, LabeledDataset};

/// Applies one [`DatasetTransform`] to each dataset of a collection.
///
/// Keys are preserved exactly. The first failure aborts the whole map and is
/// reported as a [`TransformError`] naming the offending key; no partial
/// collection is returned.
#[derive(Debug)]
pub struct MapDatasets {
    transform: Box<dyn DatasetTransform>,
    parallel: bool,
}

impl MapDatasets {
    pub fn new(transform: impl DatasetTransform + 'static) -> Self {
        Self::boxed(Box::new(transform))
    }

    pub fn boxed(transform: Box<dyn DatasetTransform>) -> Self {
        Self {
            transform,
            parallel: false,
        }
    }

    /// Run the per-key transforms on the rayon pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn apply_one(&self, key: String, dataset: LabeledDataset) -> Result<(String, LabeledDataset), TransformError> {
        match self.transform.apply(dataset) {
            Ok(dataset) => Ok((key, dataset)),
            Err(cause) => Err(TransformError::new(key, cause)),
        }
    }
}

impl CollectionTransform for MapDatasets {
    fn label(&self) -> String {
        format!("map({})", self.transform.label())
    }

    fn apply(&self, collection: LabeledCollection) -> NormalizeResult<LabeledCollection> {
        if self.parallel {
            let mapped: Result<LabeledCollection, TransformError> = collection
                .into_par_iter()
                .map(|(key, dataset)| self.apply_one(key, dataset))
                .collect();
            return Ok(mapped?);
        }

        let mut mapped = LabeledCollection::new();
        for (key, dataset) in collection {
            let (key, dataset) = self.apply_one(key, dataset)?;
            mapped.insert(key, dataset);
        }
        Ok(mapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DataShapeError, NormalizeError};
    use crate::models::Variable;

    /// Fails on datasets named "bad", tags the rest.
    #[derive(Debug)]
    struct FailOnBad;

    impl DatasetTransform for FailOnBad {
        fn label(&self) -> String {
            "fail_on_bad".to_string()
        }

        fn apply(&self, dataset: LabeledDataset) -> NormalizeResult<LabeledDataset> {
            if dataset.name() == Some("bad") {
                return Err(DataShapeError::MissingVariable {
                    dataset: "bad".into(),
                    variable: "data".into(),
                }
                .into());
            }
            Ok(dataset.with_attr("seen", true))
        }
    }

    fn collection(names: &[&str]) -> LabeledCollection {
        names
            .iter()
            .map(|n| {
                let ds = LabeledDataset::new(n)
                    .with_variable("data", Variable::scalar(1.0))
                    .unwrap();
                (n.to_string(), ds)
            })
            .collect()
    }

    #[test]
    fn test_preserves_keys() {
        let input = collection(&["a", "b", "c"]);
        let out = MapDatasets::new(FailOnBad).apply(input).unwrap();
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert!(out.values().all(|ds| ds.attrs["seen"] == true));
    }

    #[test]
    fn test_failure_names_key() {
        for names in [["good", "bad"], ["bad", "good"]] {
            let err = MapDatasets::new(FailOnBad).apply(collection(&names)).unwrap_err();
            assert_eq!(err.key(), Some("bad"));
            assert!(err.to_string().contains("bad"));
        }
    }

    #[test]
    fn test_parallel_failure_names_key() {
        let mut names: Vec<String> = (0..64).map(|i| format!("sig{}", i)).collect();
        names.push("bad".to_string());
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let err = MapDatasets::new(FailOnBad)
            .parallel(true)
            .apply(collection(&refs))
            .unwrap_err();
        assert!(matches!(err, NormalizeError::Transform(ref e) if e.key == "bad"));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let names: Vec<String> = (0..32).map(|i| format!("sig{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let sequential = MapDatasets::new(FailOnBad).apply(collection(&refs)).unwrap();
        let parallel = MapDatasets::new(FailOnBad)
            .parallel(true)
            .apply(collection(&refs))
            .unwrap();
        assert_eq!(sequential, parallel);
    }
}
