//! Pipeline Registry - Look up the pipeline of a diagnostic source
//!
//! Starts from the built-in table and can be extended from a directory of
//! JSON definitions. Each file is registered under its `source` field and
//! overrides the built-in pipeline of that source; files are expected to be
//! named `<source>.json` and a mismatch is logged.

mod builtin;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigResult, ConfigurationError, PipelineResult};
use crate::logs::{log_info, log_info_indent, log_success, log_warning_indent};
use crate::models::{LabeledCollection, LabeledDataset};
use crate::transform::dsl::{BuildContext, PipelineDefinition};
use crate::transform::Pipeline;

pub use builtin::definitions as builtin_definitions;

/// Directory scanned for definitions when none is configured
pub const DEFAULT_PIPELINES_DIR: &str = "pipelines";

/// A registered pipeline, with the definition it was built from when known
#[derive(Debug)]
struct Registered {
    definition: Option<PipelineDefinition>,
    pipeline: Pipeline,
}

/// Registry mapping source names to pipelines
#[derive(Debug, Default)]
pub struct PipelineRegistry {
    pipelines: BTreeMap<String, Registered>,
}

impl PipelineRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in source
    pub fn builtin(ctx: &BuildContext) -> ConfigResult<Self> {
        let mut registry = Self::new();
        for definition in builtin::definitions() {
            registry.register(definition, ctx)?;
        }
        Ok(registry)
    }

    /// Add every `*.json` definition found in `dir`, in file name order.
    ///
    /// A missing directory adds nothing. An unreadable or invalid file is an
    /// error naming the file.
    pub fn with_dir(mut self, dir: impl AsRef<Path>, ctx: &BuildContext) -> PipelineResult<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(self);
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|e| e == "json"))
            .collect();
        paths.sort();

        log_info(format!("Loading {} pipeline definition(s) from {}", paths.len(), dir.display()));
        for path in paths {
            let definition = load_definition(&path)?;
            log_info_indent(format!("{} ({} steps)", definition.source, definition.steps.len()), 1);
            if path.file_stem().is_some_and(|stem| stem != definition.source.as_str()) {
                log_warning_indent(
                    format!("{} defines source '{}'", path.display(), definition.source),
                    2,
                );
            }
            self.register(definition, ctx)?;
        }
        Ok(self)
    }

    /// Build and register a definition, replacing any pipeline of the same source
    pub fn register(&mut self, definition: PipelineDefinition, ctx: &BuildContext) -> ConfigResult<()> {
        let pipeline = definition.build(ctx)?;
        self.pipelines.insert(
            definition.source.clone(),
            Registered {
                definition: Some(definition),
                pipeline,
            },
        );
        Ok(())
    }

    /// Register a pipeline assembled in code
    pub fn insert(&mut self, source: &str, pipeline: Pipeline) {
        self.pipelines.insert(
            source.to_string(),
            Registered {
                definition: None,
                pipeline,
            },
        );
    }

    /// Get the pipeline of a source
    pub fn get(&self, source: &str) -> ConfigResult<&Pipeline> {
        self.pipelines
            .get(source)
            .map(|r| &r.pipeline)
            .ok_or_else(|| ConfigurationError::UnregisteredSource(source.to_string()))
    }

    /// Definition a source's pipeline was built from, if it came from one
    pub fn definition(&self, source: &str) -> Option<&PipelineDefinition> {
        self.pipelines.get(source).and_then(|r| r.definition.as_ref())
    }

    pub fn contains(&self, source: &str) -> bool {
        self.pipelines.contains_key(source)
    }

    /// Registered source names, sorted
    pub fn sources(&self) -> Vec<&str> {
        self.pipelines.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Normalize a raw collection with the pipeline of `source`
    pub fn run(&self, source: &str, collection: LabeledCollection) -> PipelineResult<LabeledDataset> {
        let pipeline = self.get(source)?;
        log_info(format!("Normalizing {} ({} signals, {} steps)", source, collection.len(), pipeline.len()));
        let dataset = pipeline
            .run_collection(collection)
            .map_err(|e| e.for_source(source))?;
        log_success(format!("{}: {} variables", source, dataset.len()));
        Ok(dataset)
    }
}

/// Read and parse one definition file
pub fn load_definition(path: &Path) -> PipelineResult<PipelineDefinition> {
    let content = fs::read_to_string(path)?;
    let definition = PipelineDefinition::from_json(&content).map_err(|e| {
        ConfigurationError::InvalidDefinition(format!("{}: {}", path.display(), e))
    })?;
    Ok(definition)
}
