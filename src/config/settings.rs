//! Generator settings from `domaingen.yaml`
//!
//! Settings are resolved with the precedence CLI flag > environment variable
//! > settings file > built-in default. The CLI applies its own flags last;
//! this module handles the file and the environment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codegen::fs_utils::read_source;
use crate::codegen::targets::GenerationTarget;
use crate::diff::MatchPolicy;
use crate::error::{DomaingenError, DomaingenResult};

/// Environment variable overriding [`MatchPolicy::threshold`]
pub const ENV_MATCH_THRESHOLD: &str = "DOMAINGEN_MATCH_THRESHOLD";

/// Environment variable overriding [`GeneratorSettings::output`]
pub const ENV_OUTPUT_DIR: &str = "DOMAINGEN_OUTPUT_DIR";

/// Default settings file name, looked up in the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "domaingen.yaml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Root directory for generated artifacts
    pub output: PathBuf,
    /// Targets generated when none are given on the command line
    pub targets: Vec<GenerationTarget>,
    /// Directory of template overrides (`<id>.tera`)
    pub templates: Option<PathBuf>,
    /// Fan entity generation out over blocking tasks
    pub concurrent: bool,
    pub matching: MatchPolicy,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            output: default_output_dir(),
            targets: GenerationTarget::ALL.to_vec(),
            templates: None,
            concurrent: false,
            matching: MatchPolicy::default(),
        }
    }
}

impl GeneratorSettings {
    /// Load settings from a YAML file and validate them
    pub fn from_file<P: AsRef<Path>>(path: P) -> DomaingenResult<Self> {
        let path = path.as_ref();
        let contents = read_source(path)?;
        let settings: Self = serde_yaml::from_str(&contents).map_err(|source| DomaingenError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load `path` if given, else `domaingen.yaml` if present, else defaults
    pub fn discover(path: Option<&Path>) -> DomaingenResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_SETTINGS_FILE).exists() => Self::from_file(DEFAULT_SETTINGS_FILE),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> DomaingenResult<()> {
        if self.targets.is_empty() {
            return Err(DomaingenError::Settings(
                "at least one generation target is required".to_string(),
            ));
        }
        self.matching.validate().map_err(DomaingenError::Settings)
    }

    /// Apply environment overrides from the process environment
    pub fn apply_env(&mut self) -> DomaingenResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply environment-style overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> DomaingenResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MATCH_THRESHOLD) {
            let threshold: f64 = value.trim().parse().map_err(|_| {
                DomaingenError::Settings(format!(
                    "{} must be a number between 0 and 1, got '{}'",
                    ENV_MATCH_THRESHOLD, value
                ))
            })?;
            tracing::debug!(threshold, "match threshold from environment");
            self.matching.threshold = threshold;
        }

        if let Some(value) = lookup(ENV_OUTPUT_DIR) {
            tracing::debug!(output = %value, "output directory from environment");
            self.output = PathBuf::from(value);
        }

        self.validate()
    }
}
