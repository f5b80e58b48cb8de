//! Adaptation manuals: step-by-step instructions, with code fragments,
//! for turning an application generated from one config into one that
//! matches another.

pub mod effort;
pub mod markdown;
pub mod snippets;
pub mod steps;

use std::path::Path;

pub use effort::{estimate, ChangeKind, Difficulty, Effort};
pub use markdown::{render_markdown, unified_diff};
pub use snippets::{SnippetRenderer, Structure};
pub use steps::{
    generate_manual, generate_manual_with, migration_path, AdaptationManual, AdaptationStep, FileChange,
    ManualError, StepCategory,
};

use crate::config::load_config;
use crate::diff::{diff, MatchPolicy};
use crate::error::DomaingenResult;

/// Load two config files, diff them and render the manual as Markdown
pub fn render_manual_files<P, Q>(source_path: P, target_path: Q, policy: &MatchPolicy) -> DomaingenResult<String>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let source = load_config(source_path)?;
    let target = load_config(target_path)?;
    let diff = diff(&source, &target, policy);
    let manual = generate_manual(&diff, &source, &target)?;
    Ok(render_markdown(&manual))
}
