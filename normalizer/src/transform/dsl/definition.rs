//! Pipeline definition
//!
//! A definition is the declarative form of a [`Pipeline`]: the source it
//! normalizes and its ordered steps. Built-in pipelines and the JSON files of
//! a pipelines directory both go through this type.

use serde::{Deserialize, Serialize};

use super::operations::{BuildContext, DatasetOp, StepDef};
use crate::error::{ConfigResult, ConfigurationError};
use crate::transform::Pipeline;

/// A complete pipeline definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Version of the definition format
    #[serde(default = "default_version")]
    pub version: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Source name the pipeline is registered under
    pub source: String,

    /// Ordered steps
    pub steps: Vec<StepDef>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl PipelineDefinition {
    /// Empty definition for a source
    pub fn new(source: &str) -> Self {
        Self {
            version: default_version(),
            description: String::new(),
            source: source.to_string(),
            steps: Vec::new(),
        }
    }

    /// Load from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Export to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn step(mut self, step: StepDef) -> Self {
        self.steps.push(step);
        self
    }

    /// Append a `map` step.
    pub fn map(self, transform: DatasetOp) -> Self {
        self.step(StepDef::map(transform))
    }

    /// Append a `merge` step.
    pub fn merge(self) -> Self {
        self.step(StepDef::Merge)
    }

    /// Append an `apply` step.
    pub fn apply(self, transform: DatasetOp) -> Self {
        self.step(StepDef::apply(transform))
    }

    /// Append one `apply(tensorize_channels)` per stem, with defaults.
    pub fn tensorize<'a>(self, stems: impl IntoIterator<Item = &'a str>) -> Self {
        stems
            .into_iter()
            .fold(self, |definition, stem| definition.apply(DatasetOp::tensorize(stem)))
    }

    /// Instantiate and chain-check the steps.
    pub fn build(&self, ctx: &BuildContext) -> ConfigResult<Pipeline> {
        if self.source.is_empty() {
            return Err(ConfigurationError::InvalidDefinition("source name is empty".to_string()));
        }
        let steps = self
            .steps
            .iter()
            .map(|step| step.build(ctx))
            .collect::<ConfigResult<Vec<_>>>()?;
        Pipeline::new(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::PayloadKind;

    #[test]
    fn test_definition_from_json() {
        let json = r#"{
            "source": "amb",
            "steps": [
                {"type": "map", "transform": {"type": "standardize_signal", "source": "amb"}},
                {"type": "merge"},
                {"type": "apply", "transform": {"type": "tensorize_channels", "stem": "ccbv"}}
            ]
        }"#;
        let definition = PipelineDefinition::from_json(json).unwrap();
        assert_eq!(definition.version, "1.0");
        assert_eq!(
            definition,
            PipelineDefinition::new("amb")
                .map(DatasetOp::standardize("amb"))
                .merge()
                .tensorize(["ccbv"])
        );

        let pipeline = definition.build(&BuildContext::default()).unwrap();
        assert_eq!(pipeline.len(), 3);
        assert_eq!(pipeline.output_kind(), Some(PayloadKind::Dataset));
    }

    #[test]
    fn test_definition_serialization() {
        let definition = PipelineDefinition::new("asx")
            .with_description("time points as payload")
            .map(DatasetOp::TimeAsData)
            .map(DatasetOp::standardize("asx"))
            .merge();
        let json = definition.to_json().unwrap();
        assert!(json.contains("time_as_data"));
        assert_eq!(PipelineDefinition::from_json(&json).unwrap(), definition);
    }

    #[test]
    fn test_build_rejects_broken_chain() {
        let definition = PipelineDefinition::new("bad")
            .merge()
            .map(DatasetOp::DropZeroDimensions);
        let err = definition.build(&BuildContext::default()).unwrap_err();
        assert!(matches!(err, ConfigurationError::ChainMismatch { index: 1, .. }));
    }

    #[test]
    fn test_build_rejects_empty_source() {
        let err = PipelineDefinition::new("").merge().build(&BuildContext::default()).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidDefinition(_)));
    }
}
