//! Domain configuration loader.
//!
//! Reads a domain config from YAML or JSON and hands it to the validator.
//! Files ending in `.json` are parsed as JSON; anything else (`.yaml`,
//! `.yml`, no extension) is parsed as YAML.

use std::path::Path;

use super::raw::RawDomainConfig;
use super::types::DomainConfig;
use super::validator;
use crate::codegen::fs_utils::read_source;
use crate::error::{DomaingenError, DomaingenResult};

/// Parse a domain config file without validating it
///
/// # Arguments
///
/// * `path` - Path to a `.yaml`, `.yml` or `.json` domain config
///
/// # Example
///
/// ```ignore
/// use domaingen::config::load_raw;
///
/// let raw = load_raw("config/examples/taskboard.yaml").unwrap();
/// assert_eq!(raw.name.as_deref(), Some("taskboard"));
/// ```
pub fn load_raw<P: AsRef<Path>>(path: P) -> DomaingenResult<RawDomainConfig> {
    let path = path.as_ref();
    let contents = read_source(path)?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        serde_json::from_str(&contents).map_err(|source| DomaingenError::Json {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_yaml::from_str(&contents).map_err(|source| DomaingenError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Load and validate a domain config file
///
/// # Arguments
///
/// * `path` - Path to a `.yaml`, `.yml` or `.json` domain config
///
/// # Returns
///
/// The validated [`DomainConfig`], or [`DomaingenError::Validation`] carrying
/// every defect found.
pub fn load_config<P: AsRef<Path>>(path: P) -> DomaingenResult<DomainConfig> {
    let path = path.as_ref();
    let raw = load_raw(path)?;
    let config = validator::validate(&raw).map_err(DomaingenError::Validation)?;

    tracing::info!(
        path = %path.display(),
        domain = %config.name,
        entities = config.entities.len(),
        "loaded domain config"
    );
    Ok(config)
}

/// Parse and validate a YAML document held in memory
pub fn from_yaml_str(yaml: &str) -> DomaingenResult<DomainConfig> {
    let raw: RawDomainConfig = serde_yaml::from_str(yaml).map_err(|source| DomaingenError::Yaml {
        path: "<inline>".into(),
        source,
    })?;
    validator::validate(&raw).map_err(DomaingenError::Validation)
}
