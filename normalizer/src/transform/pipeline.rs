//! Ordered transform chains.
//!
//! A [`Pipeline`] is a list of [`Step`]s passing a [`Payload`] from one to
//! the next. Every step declares the payload kind it consumes and produces,
//! and [`Pipeline::new`] refuses chains where these do not line up, so a
//! registered pipeline can never hand a dataset to a collection transform.
//!
//! # Example
//!
//! ```rust,ignore
//! use diagnorm::transform::{Pipeline, Step, StandardizeSignalDataset, TensorizeChannels};
//!
//! let pipeline = Pipeline::new(vec![
//!     Step::map(StandardizeSignalDataset::new("amb")),
//!     Step::merge(),
//!     Step::dataset(TensorizeChannels::new("ccbv")?),
//! ])?;
//! let canonical = pipeline.run_collection(raw)?;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{CollectionTransform, DatasetTransform, MapDatasets, MergeDatasets};
use crate::error::{ConfigResult, ConfigurationError, NormalizeResult, PipelineError, PipelineResult};
use crate::logs::{log_error, log_info_indent};
use crate::models::{LabeledCollection, LabeledDataset};

// =============================================================================
// Payload
// =============================================================================

/// What flows between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Collection,
    Dataset,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadKind::Collection => write!(f, "collection"),
            PayloadKind::Dataset => write!(f, "dataset"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Collection(LabeledCollection),
    Dataset(LabeledDataset),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Collection(_) => PayloadKind::Collection,
            Payload::Dataset(_) => PayloadKind::Dataset,
        }
    }

    pub fn into_dataset(self) -> ConfigResult<LabeledDataset> {
        match self {
            Payload::Dataset(dataset) => Ok(dataset),
            other => Err(ConfigurationError::OutputMismatch {
                expected: PayloadKind::Dataset,
                found: other.kind(),
            }),
        }
    }

    pub fn into_collection(self) -> ConfigResult<LabeledCollection> {
        match self {
            Payload::Collection(collection) => Ok(collection),
            other => Err(ConfigurationError::OutputMismatch {
                expected: PayloadKind::Collection,
                found: other.kind(),
            }),
        }
    }
}

impl From<LabeledCollection> for Payload {
    fn from(collection: LabeledCollection) -> Self {
        Payload::Collection(collection)
    }
}

impl From<LabeledDataset> for Payload {
    fn from(dataset: LabeledDataset) -> Self {
        Payload::Dataset(dataset)
    }
}

// =============================================================================
// Step
// =============================================================================

/// One stage of a pipeline.
#[derive(Debug)]
pub enum Step {
    /// Collection in, collection out.
    Collection(Box<dyn CollectionTransform>),
    /// Collection in, dataset out.
    Merge(MergeDatasets),
    /// Dataset in, dataset out.
    Dataset(Box<dyn DatasetTransform>),
}

impl Step {
    /// Apply a dataset transform to every entry of the collection.
    pub fn map(transform: impl DatasetTransform + 'static) -> Self {
        Step::Collection(Box::new(MapDatasets::new(transform)))
    }

    pub fn collection(transform: impl CollectionTransform + 'static) -> Self {
        Step::Collection(Box::new(transform))
    }

    pub fn dataset(transform: impl DatasetTransform + 'static) -> Self {
        Step::Dataset(Box::new(transform))
    }

    pub fn merge() -> Self {
        Step::Merge(MergeDatasets::new())
    }

    pub fn label(&self) -> String {
        match self {
            Step::Collection(t) => t.label(),
            Step::Merge(m) => m.label(),
            Step::Dataset(t) => t.label(),
        }
    }

    pub fn input_kind(&self) -> PayloadKind {
        match self {
            Step::Collection(_) | Step::Merge(_) => PayloadKind::Collection,
            Step::Dataset(_) => PayloadKind::Dataset,
        }
    }

    pub fn output_kind(&self) -> PayloadKind {
        match self {
            Step::Collection(_) => PayloadKind::Collection,
            Step::Merge(_) | Step::Dataset(_) => PayloadKind::Dataset,
        }
    }

    pub fn apply(&self, payload: Payload) -> NormalizeResult<Payload> {
        match (self, payload) {
            (Step::Collection(t), Payload::Collection(c)) => Ok(Payload::Collection(t.apply(c)?)),
            (Step::Merge(m), Payload::Collection(c)) => Ok(Payload::Dataset(m.merge(c)?)),
            (Step::Dataset(t), Payload::Dataset(d)) => Ok(Payload::Dataset(t.apply(d)?)),
            (step, payload) => Err(ConfigurationError::PayloadMismatch {
                expected: step.input_kind(),
                found: payload.kind(),
            }
            .into()),
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// A checked sequence of steps.
#[derive(Debug)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    /// Build a pipeline, checking that each step accepts what the previous
    /// one produces.
    pub fn new(steps: Vec<Step>) -> ConfigResult<Self> {
        for (i, pair) in steps.windows(2).enumerate() {
            let (previous, step) = (&pair[0], &pair[1]);
            if step.input_kind() != previous.output_kind() {
                return Err(ConfigurationError::ChainMismatch {
                    index: i + 1,
                    step: step.label(),
                    expected: step.input_kind(),
                    found: previous.output_kind(),
                });
            }
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Payload kind the first step consumes. `None` for an empty pipeline,
    /// which passes anything through.
    pub fn input_kind(&self) -> Option<PayloadKind> {
        self.steps.first().map(Step::input_kind)
    }

    pub fn output_kind(&self) -> Option<PayloadKind> {
        self.steps.last().map(Step::output_kind)
    }

    /// Step labels, in order.
    pub fn labels(&self) -> Vec<String> {
        self.steps.iter().map(Step::label).collect()
    }

    /// Run every step in order, stopping at the first failure.
    pub fn run(&self, payload: Payload) -> PipelineResult<Payload> {
        if let Some(expected) = self.input_kind() {
            if payload.kind() != expected {
                return Err(ConfigurationError::PayloadMismatch {
                    expected,
                    found: payload.kind(),
                }
                .into());
            }
        }

        let total = self.steps.len();
        let mut payload = payload;
        for (index, step) in self.steps.iter().enumerate() {
            log_info_indent(format!("[{}/{}] {}", index + 1, total, step.label()), 1);
            payload = step.apply(payload).map_err(|cause| {
                log_error(format!("Step {} ({}) failed: {}", index + 1, step.label(), cause));
                PipelineError::Step {
                    index,
                    step: step.label(),
                    cause,
                }
            })?;
        }
        Ok(payload)
    }

    /// Run a collection to dataset pipeline.
    pub fn run_collection(&self, collection: LabeledCollection) -> PipelineResult<LabeledDataset> {
        let output = self.run(Payload::Collection(collection))?;
        Ok(output.into_dataset()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NormalizeError;
    use crate::models::Variable;
    use crate::transform::{DropDatasets, StandardizeSignalDataset, TensorizeChannels};

    fn raw() -> LabeledCollection {
        ["ccbv1", "ccbv2", "ccbv10"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let ds = LabeledDataset::new(name)
                    .with_variable("data", Variable::vector("time", vec![i as f64; 3]))
                    .unwrap();
                (format!("amb_{}", name), ds)
            })
            .collect()
    }

    fn amb() -> Pipeline {
        Pipeline::new(vec![
            Step::map(StandardizeSignalDataset::new("amb")),
            Step::merge(),
            Step::dataset(TensorizeChannels::new("ccbv").unwrap()),
        ])
        .unwrap()
    }

    #[test]
    fn test_chain_mismatch_rejected() {
        let err = Pipeline::new(vec![
            Step::merge(),
            Step::map(StandardizeSignalDataset::new("amb")),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::ChainMismatch {
                index: 1,
                expected: PayloadKind::Collection,
                found: PayloadKind::Dataset,
                ..
            }
        ));
    }

    #[test]
    fn test_kinds() {
        let pipeline = amb();
        assert_eq!(pipeline.input_kind(), Some(PayloadKind::Collection));
        assert_eq!(pipeline.output_kind(), Some(PayloadKind::Dataset));
        assert_eq!(
            pipeline.labels(),
            vec!["map(standardize_signal(amb))", "merge", "tensorize_channels(ccbv)"]
        );
    }

    #[test]
    fn test_run_collection() {
        let out = amb().run_collection(raw()).unwrap();
        let ccbv = out.variable("ccbv").unwrap();
        assert_eq!(ccbv.shape(), &[3, 3]);
        assert_eq!(ccbv.values(), vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
        assert_eq!(ccbv.attrs["name"], "amb/ccbv1");
    }

    #[test]
    fn test_step_failure_names_step_and_key() {
        let mut input = raw();
        input.insert("amb_empty".to_string(), LabeledDataset::new("empty"));

        let err = amb().run(input.into()).unwrap_err();
        match err {
            PipelineError::Step { index, step, cause } => {
                assert_eq!(index, 0);
                assert_eq!(step, "map(standardize_signal(amb))");
                assert_eq!(cause.key(), Some("amb_empty"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wrong_input_kind() {
        let err = amb().run(LabeledDataset::new("x").into()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Configuration(ConfigurationError::PayloadMismatch { .. })
        ));
    }

    #[test]
    fn test_collection_output_rejected_by_run_collection() {
        let pipeline = Pipeline::new(vec![Step::collection(DropDatasets::new(["amb_ccbv1"]))]).unwrap();
        let remaining = pipeline.run(raw().into()).unwrap().into_collection().unwrap();
        assert_eq!(remaining.keys().collect::<Vec<_>>(), vec!["amb_ccbv10", "amb_ccbv2"]);

        let err = pipeline.run_collection(raw()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Configuration(ConfigurationError::OutputMismatch { .. })
        ));
    }

    #[test]
    fn test_step_apply_mismatch() {
        let err = Step::merge().apply(LabeledDataset::new("x").into()).unwrap_err();
        assert!(matches!(err, NormalizeError::Configuration(_)));
    }
}
