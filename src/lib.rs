//! # Domaingen: Domain-Config-Driven Application Generator
//!
//! Domaingen turns a declarative domain description (entities, fields,
//! relationships, navigation, dashboard metrics) into a working FastAPI
//! backend and React frontend, and explains how to move an application
//! generated from one domain config over to another.
//!
//! ## Features
//!
//! - **Validated configs**: YAML or JSON input, every defect reported at once
//! - **Template-driven generation**: SQLAlchemy models, Pydantic schemas,
//!   services, routes and React components from overridable Tera templates
//! - **Deterministic output**: identical input yields byte-identical files
//!   and SHA-256 checksums in `manifest.json`
//! - **Structural diffing**: entities matched across domains by name, field
//!   overlap and type agreement, with renames detected
//! - **Adaptation manuals**: ordered Markdown instructions with literal
//!   before/after snippets and unified diffs
//!
//! ## Example: domain config
//!
//! ```yaml
//! name: taskboard
//! version: 1.0.0
//! entities:
//!   - name: task
//!     fields:
//!       - { name: title, type: string, required: true, validation: { max_length: 200 } }
//!       - { name: status, type: enum, validation: { choices: [todo, doing, done] } }
//!   - name: user
//!     fields:
//!       - { name: email, type: email, required: true, unique: true }
//! relationships:
//!   - { name: assignee, type: many_to_one, source_entity: task, target_entity: user }
//! ```
//!
//! ## Example: generate and adapt
//!
//! ```ignore
//! use domaingen::codegen::{GenerationTarget, Generator};
//! use domaingen::config::load_config;
//! use domaingen::diff::{diff, MatchPolicy};
//! use domaingen::manual::{generate_manual, render_markdown};
//!
//! let source = load_config("config/examples/taskboard.yaml")?;
//! let result = Generator::builtin()?.generate(&source, &GenerationTarget::ALL)?;
//! result.write_to("generated")?;
//!
//! let target = load_config("config/examples/property_management.yaml")?;
//! let diff = diff(&source, &target, &MatchPolicy::default());
//! let manual = generate_manual(&diff, &source, &target)?;
//! println!("{}", render_markdown(&manual));
//! ```

pub mod codegen;
pub mod config;
pub mod diff;
pub mod error;
pub mod manual;

pub use codegen::{generate_from_file, GenerationResult, GenerationTarget, Generator, Manifest, TemplateRenderer};
pub use config::{load_config, DomainConfig, GeneratorSettings};
pub use diff::{diff_files, ConfigDiff, MatchPolicy};
pub use error::{DomaingenError, DomaingenResult, TemplateError, TypeRegistryGap, ValidationError};
pub use manual::{generate_manual, render_manual_files, render_markdown, AdaptationManual};
