//! Code generation from validated domain configs.
//!
//! Each entity is bound once ([`binding`]) and rendered through the
//! registered templates ([`templates`]) for every requested
//! [`GenerationTarget`], producing a FastAPI backend and React components.

pub mod artifact;
pub mod binding;
pub mod fs_utils;
pub mod orchestrator;
pub mod targets;
pub mod templates;
pub mod type_registry;
pub mod utils;

use std::path::Path;

pub use artifact::{checksum, GeneratedArtifact, GenerationError, GenerationResult, Manifest, ManifestEntry};
pub use binding::{mint_names, DomainBinding, EntityBinding, EntityNames, NameTable};
pub use orchestrator::Generator;
pub use targets::GenerationTarget;
pub use templates::TemplateRenderer;
pub use type_registry::{MappingTarget, TargetTypeDescriptor, TypeMappingRegistry};

use crate::config::load_config;
use crate::error::DomaingenResult;

/// Load, validate and generate a config file into `output_dir`
///
/// Returns the written manifest; callers decide whether recorded template
/// errors are fatal.
///
/// # Example
///
/// ```ignore
/// use domaingen::codegen::{generate_from_file, GenerationTarget};
///
/// let manifest = generate_from_file("config/examples/taskboard.yaml", "generated", &GenerationTarget::ALL)?;
/// assert!(manifest.is_success());
/// ```
pub fn generate_from_file<P, Q>(config_path: P, output_dir: Q, targets: &[GenerationTarget]) -> DomaingenResult<Manifest>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let config = load_config(config_path)?;
    let generator = Generator::builtin()?;
    let result = generator.generate(&config, targets)?;
    result.write_to(output_dir)
}
