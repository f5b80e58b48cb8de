//! Generated artifacts, per-artifact errors and the run manifest.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::fs_utils::write_artifact;
use super::targets::GenerationTarget;
use crate::error::{DomaingenError, DomaingenResult, TemplateError};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Hex-encoded SHA-256 of `text`
pub fn checksum(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// One emitted file. The checksum is always computed from `source_text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifact {
    /// Relative to the output directory
    pub path: String,
    pub kind: GenerationTarget,
    /// Owning entity; `None` for domain-level files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub template: String,
    #[serde(skip)]
    pub source_text: String,
    pub checksum: String,
}

impl GeneratedArtifact {
    pub fn new(
        path: String,
        kind: GenerationTarget,
        entity: Option<String>,
        template: &str,
        source_text: String,
    ) -> Self {
        Self {
            checksum: checksum(&source_text),
            path,
            kind,
            entity,
            template: template.to_string(),
            source_text,
        }
    }
}

/// A template that failed for one entity and stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub target: GenerationTarget,
    pub template: String,
    pub path: String,
    pub cause: TemplateError,
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entity {
            Some(entity) => write!(f, "{} [{}] {}: {}", entity, self.target, self.path, self.cause),
            None => write!(f, "[{}] {}: {}", self.target, self.path, self.cause),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub path: String,
    pub kind: GenerationTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub checksum: String,
}

/// Summary of a generation run, written as `manifest.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub domain: String,
    pub version: String,
    pub template_version: String,
    pub files: Vec<ManifestEntry>,
    pub errors: Vec<GenerationError>,
}

impl Manifest {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Artifacts in entity declaration order then stage order, followed by
/// domain-level artifacts
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub domain: String,
    pub version: String,
    pub template_version: String,
    pub artifacts: Vec<GeneratedArtifact>,
    pub errors: Vec<GenerationError>,
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn artifact(&self, path: &str) -> Option<&GeneratedArtifact> {
        self.artifacts.iter().find(|a| a.path == path)
    }

    pub fn manifest(&self) -> Manifest {
        Manifest {
            domain: self.domain.clone(),
            version: self.version.clone(),
            template_version: self.template_version.clone(),
            files: self
                .artifacts
                .iter()
                .map(|a| ManifestEntry {
                    path: a.path.clone(),
                    kind: a.kind,
                    entity: a.entity.clone(),
                    checksum: a.checksum.clone(),
                })
                .collect(),
            errors: self.errors.clone(),
        }
    }

    /// Write every artifact under `dir`, then `manifest.json`
    pub fn write_to<P: AsRef<Path>>(&self, dir: P) -> DomaingenResult<Manifest> {
        let dir = dir.as_ref();
        for artifact in &self.artifacts {
            write_artifact(&dir.join(&artifact.path), &artifact.source_text)?;
        }

        let manifest = self.manifest();
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&manifest).map_err(|source| DomaingenError::Json {
            path: path.clone(),
            source,
        })?;
        write_artifact(&path, &json)?;

        tracing::info!(
            dir = %dir.display(),
            files = manifest.files.len(),
            errors = manifest.errors.len(),
            "wrote generated artifacts"
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> GenerationResult {
        GenerationResult {
            domain: "taskboard".to_string(),
            version: "1.0.0".to_string(),
            template_version: "abc".to_string(),
            artifacts: vec![GeneratedArtifact::new(
                "backend/app/models/task.py".to_string(),
                GenerationTarget::Model,
                Some("task".to_string()),
                "model.py",
                "class Task:\n    pass\n".to_string(),
            )],
            errors: vec![],
        }
    }

    #[test]
    fn test_checksum_matches_source_text() {
        let artifact = &result().artifacts[0];
        assert_eq!(artifact.checksum, checksum(&artifact.source_text));
        assert_eq!(artifact.checksum.len(), 64);
    }

    #[test]
    fn test_write_to_creates_files_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = result().write_to(dir.path()).unwrap();
        assert!(manifest.is_success());

        let written = std::fs::read_to_string(dir.path().join("backend/app/models/task.py")).unwrap();
        assert_eq!(written, "class Task:\n    pass\n");

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap()).unwrap();
        assert_eq!(json["files"][0]["kind"], "model");
        assert_eq!(json["files"][0]["checksum"], manifest.files[0].checksum.as_str());
        assert_eq!(json["errors"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_errors_make_run_unsuccessful() {
        let mut result = result();
        result.errors.push(GenerationError {
            entity: Some("task".to_string()),
            target: GenerationTarget::Route,
            template: "route.py".to_string(),
            path: "backend/app/api/routes/tasks.py".to_string(),
            cause: TemplateError::Missing {
                template: "route.py".to_string(),
            },
        });
        assert!(!result.is_success());
        assert!(!result.manifest().is_success());
        assert!(result.errors[0].to_string().starts_with("task [route]"));
    }
}
