//! Entity matching and structural diffing of two domain configs.

pub mod changes;
pub mod matcher;
pub mod similarity;
pub mod types;

pub use matcher::{diff, match_entities, MatchOutcome};
pub use similarity::{field_similarity, name_similarity, score_entities, EntityScore};
pub use types::*;

use std::path::Path;

use crate::config::{load_config, DomainConfig};
use crate::error::DomaingenResult;

/// Load and validate two config files, then diff them.
///
/// Returns both configs alongside the diff; manual generation needs them.
pub fn diff_files<P, Q>(
    source_path: P,
    target_path: Q,
    policy: &MatchPolicy,
) -> DomaingenResult<(DomainConfig, DomainConfig, ConfigDiff)>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let source = load_config(source_path)?;
    let target = load_config(target_path)?;
    let diff = diff(&source, &target, policy);
    Ok((source, target, diff))
}
