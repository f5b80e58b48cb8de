//! Template registry backed by Tera.
//!
//! Built-in templates are embedded in the binary. An override directory may
//! replace any of them by id (`<dir>/<id>.tera`); every template is parsed
//! once when the renderer is built, so a malformed or unknown file fails
//! fast instead of surfacing mid-generation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tera::{Context, Tera};

use crate::error::{TemplateError, TemplateLoadError};

macro_rules! builtin {
    ($($id:literal),* $(,)?) => {
        &[$(($id, include_str!(concat!("../../templates/", $id, ".tera")))),*]
    };
}

/// Embedded template sources, keyed by id
pub const BUILTIN_TEMPLATES: &[(&str, &str)] = builtin![
    "macros/python",
    "macros/tsx",
    "model.py",
    "schema.py",
    "service.py",
    "route.py",
    "ui/form.tsx",
    "ui/list.tsx",
    "domain/models_index.py",
    "domain/api_router.py",
    "domain/navigation.ts",
    "domain/dashboard.ts",
    "domain/components_index.ts",
    "snippet/model_class",
    "snippet/model_column",
    "snippet/relationship",
    "snippet/schema_field",
    "snippet/ui_input",
    "snippet/route_prefix",
    "snippet/component_names",
    "snippet/nav_item",
    "snippet/dashboard_metric",
    "snippet/alembic/add_column",
    "snippet/alembic/drop_column",
    "snippet/alembic/rename_column",
    "snippet/alembic/alter_type",
    "snippet/alembic/alter_constraints",
    "snippet/alembic/rename_table",
    "snippet/alembic/create_table",
    "snippet/alembic/drop_table",
    "snippet/alembic/create_foreign_key",
    "snippet/alembic/drop_foreign_key",
    "snippet/alembic/create_association",
];

/// Parsed, immutable template set
#[derive(Debug)]
pub struct TemplateRenderer {
    tera: Tera,
    sources: BTreeMap<String, String>,
    version: String,
}

/// Join an error with its chain of causes
pub(crate) fn describe(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn builtin_sources() -> BTreeMap<String, String> {
    BUILTIN_TEMPLATES
        .iter()
        .map(|(id, source)| (id.to_string(), source.to_string()))
        .collect()
}

impl TemplateRenderer {
    /// Renderer over the embedded templates only
    pub fn builtin() -> Result<Self, TemplateLoadError> {
        Self::from_sources(builtin_sources())
    }

    /// Built-in templates with some replaced by id.
    ///
    /// Overrides may only replace known templates; an unknown id is an error.
    pub fn with_overrides<I>(overrides: I) -> Result<Self, TemplateLoadError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut sources = builtin_sources();
        for (id, source) in overrides {
            if !sources.contains_key(&id) {
                return Err(TemplateLoadError::UnknownTemplate { path: PathBuf::from(id) });
            }
            tracing::debug!(template = %id, "overriding built-in template");
            sources.insert(id, source);
        }
        Self::from_sources(sources)
    }

    /// Built-in templates overridden by every `*.tera` file under `dir`.
    ///
    /// # Arguments
    ///
    /// * `dir` - Override directory; `dir/ui/form.tsx.tera` replaces `ui/form.tsx`
    ///
    /// # Example
    ///
    /// ```ignore
    /// use domaingen::codegen::TemplateRenderer;
    ///
    /// let renderer = TemplateRenderer::from_dir("templates/custom")?;
    /// println!("templates {}", renderer.template_version());
    /// ```
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, TemplateLoadError> {
        let dir = dir.as_ref();
        let mut files = Vec::new();
        collect_template_files(dir, &mut files)?;
        files.sort();

        let known = builtin_sources();
        let mut overrides = Vec::with_capacity(files.len());
        for path in files {
            let id = template_id(dir, &path);
            if !known.contains_key(&id) {
                return Err(TemplateLoadError::UnknownTemplate { path });
            }
            let source = fs::read_to_string(&path).map_err(|source| TemplateLoadError::Io {
                path: path.clone(),
                source,
            })?;
            overrides.push((id, source));
        }

        tracing::info!(dir = %dir.display(), overrides = overrides.len(), "loaded template overrides");
        Self::with_overrides(overrides)
    }

    fn from_sources(sources: BTreeMap<String, String>) -> Result<Self, TemplateLoadError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.add_raw_templates(sources.iter().map(|(id, source)| (id.as_str(), source.as_str())))
            .map_err(|e| TemplateLoadError::Parse { cause: describe(&e) })?;

        let mut hasher = Sha256::new();
        for (id, source) in &sources {
            hasher.update(id.as_bytes());
            hasher.update([0u8]);
            hasher.update(source.as_bytes());
            hasher.update([0u8]);
        }
        let version = hex::encode(hasher.finalize());

        Ok(Self { tera, sources, version })
    }

    /// Render `template` against a serializable binding
    pub fn render<T: Serialize>(&self, template: &str, binding: &T) -> Result<String, TemplateError> {
        if !self.has_template(template) {
            return Err(TemplateError::Missing {
                template: template.to_string(),
            });
        }
        let context = Context::from_serialize(binding).map_err(|e| TemplateError::Binding {
            template: template.to_string(),
            cause: describe(&e),
        })?;
        self.tera.render(template, &context).map_err(|e| TemplateError::Render {
            template: template.to_string(),
            cause: describe(&e),
        })
    }

    /// SHA-256 fingerprint over every registered template id and source
    pub fn template_version(&self) -> &str {
        &self.version
    }

    pub fn has_template(&self, template: &str) -> bool {
        self.sources.contains_key(template)
    }

    pub fn template_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), TemplateLoadError> {
    let io = |source| TemplateLoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io)? {
        let path = entry.map_err(io)?.path();
        if path.is_dir() {
            collect_template_files(&path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("tera") {
            out.push(path);
        }
    }
    Ok(())
}

/// `dir/ui/form.tsx.tera` -> `ui/form.tsx`
fn template_id(dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(dir).unwrap_or(path);
    let id = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    id.strip_suffix(".tera").map(str::to_string).unwrap_or(id)
}
