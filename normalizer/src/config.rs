//! Runtime configuration.
//!
//! Values come from the environment (the binary loads `.env` first) and can
//! be overridden by CLI flags:
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `DIAGNORM_DIM_MAPPINGS` | dimension rename table | `mappings/dim_names.json` |
//! | `DIAGNORM_PIPELINES_DIR` | directory of JSON pipeline definitions | `pipelines` |
//! | `DIAGNORM_PARALLEL` | run `map` steps on the rayon pool | `false` |

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::PipelineResult;
use crate::logs::{log_info, log_warning};
use crate::mappings::{DimensionTable, DEFAULT_MAPPINGS_PATH};
use crate::registry::{PipelineRegistry, DEFAULT_PIPELINES_DIR};
use crate::transform::dsl::BuildContext;

pub const ENV_DIM_MAPPINGS: &str = "DIAGNORM_DIM_MAPPINGS";
pub const ENV_PIPELINES_DIR: &str = "DIAGNORM_PIPELINES_DIR";
pub const ENV_PARALLEL: &str = "DIAGNORM_PARALLEL";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Dimension rename table
    pub dim_mappings: PathBuf,
    /// Directory of pipeline definitions overriding the built-in table
    pub pipelines_dir: PathBuf,
    /// Default parallelism of `map` steps
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dim_mappings: PathBuf::from(DEFAULT_MAPPINGS_PATH),
            pipelines_dir: PathBuf::from(DEFAULT_PIPELINES_DIR),
            parallel: false,
        }
    }
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            dim_mappings: lookup(ENV_DIM_MAPPINGS).map(PathBuf::from).unwrap_or(defaults.dim_mappings),
            pipelines_dir: lookup(ENV_PIPELINES_DIR).map(PathBuf::from).unwrap_or(defaults.pipelines_dir),
            parallel: lookup(ENV_PARALLEL).map(|v| parse_flag(&v)).unwrap_or(defaults.parallel),
        }
    }

    pub fn with_dim_mappings(mut self, path: impl Into<PathBuf>) -> Self {
        self.dim_mappings = path.into();
        self
    }

    pub fn with_pipelines_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.pipelines_dir = path.into();
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Load the dimension table. A missing file yields an empty table.
    pub fn load_dimensions(&self) -> PipelineResult<Arc<DimensionTable>> {
        if !self.dim_mappings.exists() {
            log_warning(format!(
                "No dimension table at {}, axes will not be renamed",
                self.dim_mappings.display()
            ));
            return Ok(Arc::new(DimensionTable::new()));
        }
        let table = DimensionTable::from_file(&self.dim_mappings)?;
        log_info(format!("Loaded {} dimension mappings from {}", table.len(), self.dim_mappings.display()));
        Ok(Arc::new(table))
    }

    pub fn build_context(&self) -> PipelineResult<BuildContext> {
        Ok(BuildContext::new(self.load_dimensions()?).with_parallel(self.parallel))
    }

    /// Built-in pipelines plus the definitions of the pipelines directory
    pub fn registry(&self) -> PipelineResult<PipelineRegistry> {
        let ctx = self.build_context()?;
        PipelineRegistry::builtin(&ctx)?.with_dir(&self.pipelines_dir, &ctx)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
