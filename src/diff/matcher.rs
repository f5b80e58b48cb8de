//! Entity alignment between two domain configs.
//!
//! Every (source, target) pair is scored independently, then pairs are
//! assigned greedily from the highest score down. Ties break on field
//! overlap, then on the lexical order of (source, target) names, so the same
//! inputs always produce the same matches.

use std::cmp::Ordering;

use super::changes::{config_changes, field_changes, relationship_changes};
use super::similarity::{score_entities, EntityScore};
use super::types::*;
use crate::config::DomainConfig;

/// Matches, leftovers and warnings from aligning two entity lists
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub matches: Vec<EntityMatch>,
    pub unmatched_source: Vec<String>,
    pub unmatched_target: Vec<String>,
    pub warnings: Vec<AmbiguousMatchWarning>,
}

struct ScoredPair {
    source: usize,
    target: usize,
    score: EntityScore,
}

fn by_preference(a: &ScoredPair, b: &ScoredPair, source: &DomainConfig, target: &DomainConfig) -> Ordering {
    b.score
        .total
        .total_cmp(&a.score.total)
        .then_with(|| b.score.fields.total_cmp(&a.score.fields))
        .then_with(|| source.entities[a.source].name.cmp(&source.entities[b.source].name))
        .then_with(|| target.entities[a.target].name.cmp(&target.entities[b.target].name))
}

/// Candidates for one source entity, best first, ties in lexical order
fn ranked_candidates(scores: &[ScoredPair], source_index: usize, target: &DomainConfig) -> Vec<ScoredCandidate> {
    let mut candidates: Vec<ScoredCandidate> = scores
        .iter()
        .filter(|p| p.source == source_index)
        .map(|p| ScoredCandidate {
            target: target.entities[p.target].name.clone(),
            score: p.score.total,
        })
        .collect();
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.target.cmp(&b.target)));
    candidates
}

/// Align the entities of `source` with those of `target`
pub fn match_entities(source: &DomainConfig, target: &DomainConfig, policy: &MatchPolicy) -> MatchOutcome {
    let mut scores = Vec::with_capacity(source.entities.len() * target.entities.len());
    for (si, s) in source.entities.iter().enumerate() {
        for (ti, t) in target.entities.iter().enumerate() {
            scores.push(ScoredPair {
                source: si,
                target: ti,
                score: score_entities(s, t, policy),
            });
        }
    }

    let mut eligible: Vec<&ScoredPair> = scores.iter().filter(|p| p.score.total >= policy.threshold).collect();
    eligible.sort_by(|a, b| by_preference(a, b, source, target));

    let mut source_taken = vec![None; source.entities.len()];
    let mut target_taken = vec![false; target.entities.len()];
    for pair in eligible {
        if source_taken[pair.source].is_some() || target_taken[pair.target] {
            continue;
        }
        source_taken[pair.source] = Some((pair.target, pair.score));
        target_taken[pair.target] = true;
    }

    let mut matches = Vec::new();
    let mut unmatched_source = Vec::new();
    let mut warnings = Vec::new();

    for (si, s) in source.entities.iter().enumerate() {
        let candidates = ranked_candidates(&scores, si, target);

        match source_taken[si] {
            Some((ti, score)) => {
                let t = &target.entities[ti];
                let runner_up = candidates.iter().find(|c| c.target != t.name);
                if let Some(runner_up) = runner_up {
                    if score.total - runner_up.score <= policy.ambiguity_margin {
                        warnings.push(AmbiguousMatchWarning {
                            kind: AmbiguityKind::CloseRunnerUp,
                            source: s.name.clone(),
                            chosen: Some(t.name.clone()),
                            candidates: candidates.iter().take(policy.top_n).cloned().collect(),
                        });
                    }
                }

                matches.push(EntityMatch {
                    source: s.name.clone(),
                    target: t.name.clone(),
                    score: score.total,
                    name_score: score.name,
                    field_score: score.fields,
                    type_score: score.types,
                    renamed: s.name != t.name,
                    table_renamed: s.table_name != t.table_name,
                    source_table: s.table_name.clone(),
                    target_table: t.table_name.clone(),
                });
            }
            None => {
                if let Some(best) = candidates.first() {
                    if best.score >= policy.threshold / 2.0 {
                        warnings.push(AmbiguousMatchWarning {
                            kind: AmbiguityKind::NearMiss,
                            source: s.name.clone(),
                            chosen: None,
                            candidates: candidates.iter().take(policy.top_n).cloned().collect(),
                        });
                    }
                }
                unmatched_source.push(s.name.clone());
            }
        }
    }

    let unmatched_target = target
        .entities
        .iter()
        .enumerate()
        .filter(|(ti, _)| !target_taken[*ti])
        .map(|(_, t)| t.name.clone())
        .collect();

    MatchOutcome {
        matches,
        unmatched_source,
        unmatched_target,
        warnings,
    }
}

/// Compute the structural diff from `source` to `target`
///
/// # Arguments
///
/// * `source` - The config being migrated from
/// * `target` - The config being migrated to
/// * `policy` - Matching weights and thresholds
///
/// # Example
///
/// ```ignore
/// use domaingen::config::load_config;
/// use domaingen::diff::{diff, MatchPolicy};
///
/// let source = load_config("config/examples/taskboard.yaml").unwrap();
/// let target = load_config("config/examples/property_management.yaml").unwrap();
/// let changes = diff(&source, &target, &MatchPolicy::default());
/// println!("{} entities matched", changes.entity_matches.len());
/// ```
pub fn diff(source: &DomainConfig, target: &DomainConfig, policy: &MatchPolicy) -> ConfigDiff {
    let outcome = match_entities(source, target, policy);

    let mut field_diffs = Vec::new();
    let mut relationship_diffs = Vec::new();

    for m in &outcome.matches {
        let (Some(s), Some(t)) = (source.entity(&m.source), target.entity(&m.target)) else {
            continue;
        };

        let changes = field_changes(s, t, policy);
        if !changes.is_empty() {
            field_diffs.push(FieldDiff {
                source_entity: m.source.clone(),
                target_entity: m.target.clone(),
                changes,
            });
        }

        let changes = relationship_changes(source, target, &m.source, &m.target, &outcome.matches);
        if !changes.is_empty() {
            relationship_diffs.push(RelationshipDiff {
                source_entity: m.source.clone(),
                target_entity: m.target.clone(),
                changes,
            });
        }
    }

    let result = ConfigDiff {
        source_domain: source.name.clone(),
        source_version: source.version.clone(),
        target_domain: target.name.clone(),
        target_version: target.version.clone(),
        entity_matches: outcome.matches,
        unmatched_source: outcome.unmatched_source,
        unmatched_target: outcome.unmatched_target,
        field_diffs,
        relationship_diffs,
        config_changes: config_changes(source, target),
        warnings: outcome.warnings,
    };

    tracing::info!(
        matched = result.entity_matches.len(),
        added = result.unmatched_target.len(),
        removed = result.unmatched_source.len(),
        warnings = result.warnings.len(),
        "computed config diff"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::from_yaml_str;

    fn config(entities: &str) -> DomainConfig {
        from_yaml_str(&format!("name: demo\nversion: 1.0.0\nentities:\n{}", entities)).unwrap()
    }

    #[test]
    fn test_identical_configs_match_one_to_one() {
        let yaml = r#"
  - name: task
    fields:
      - { name: title, type: string }
  - name: project
    fields:
      - { name: name, type: string }
"#;
        let result = diff(&config(yaml), &config(yaml), &MatchPolicy::default());
        assert!(result.is_empty());
        assert_eq!(result.entity_matches.len(), 2);
        assert!(result.entity_matches.iter().all(|m| m.source == m.target));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_greedy_prefers_highest_score() {
        let source = config(
            r#"
  - name: ticket
    fields:
      - { name: title, type: string }
      - { name: body, type: text }
"#,
        );
        let target = config(
            r#"
  - name: issue
    fields:
      - { name: title, type: string }
  - name: ticket
    fields:
      - { name: title, type: string }
      - { name: body, type: text }
"#,
        );
        let outcome = match_entities(&source, &target, &MatchPolicy::default());
        assert_eq!(outcome.matches[0].target, "ticket");
        assert_eq!(outcome.unmatched_target, vec!["issue".to_string()]);
    }

    #[test]
    fn test_ties_break_lexically() {
        let source = config(
            r#"
  - name: item
    fields:
      - { name: label, type: string }
"#,
        );
        let target = config(
            r#"
  - name: beta
    fields:
      - { name: label, type: string }
  - name: alpha
    fields:
      - { name: label, type: string }
"#,
        );
        let outcome = match_entities(&source, &target, &MatchPolicy::default());
        assert_eq!(outcome.matches[0].target, "alpha");
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, AmbiguityKind::CloseRunnerUp);
        assert_eq!(outcome.warnings[0].candidates.len(), 2);
    }

    #[test]
    fn test_near_miss_is_warned() {
        let source = config(
            r#"
  - name: invoice
    fields:
      - { name: total, type: decimal }
      - { name: issued_on, type: date }
      - { name: notes, type: text }
"#,
        );
        let target = config(
            r#"
  - name: bill
    fields:
      - { name: total, type: decimal }
      - { name: due_on, type: date }
      - { name: memo, type: text }
      - { name: paid, type: boolean }
"#,
        );
        let outcome = match_entities(&source, &target, &MatchPolicy::default());
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, AmbiguityKind::NearMiss);
        assert_eq!(outcome.warnings[0].candidates[0].target, "bill");
    }
}
