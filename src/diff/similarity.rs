//! Similarity scores between entities and between fields.
//!
//! All scores are in `[0, 1]`. Scoring is independent per pair; the matcher
//! decides assignments from these numbers.

use std::collections::HashSet;
use std::hash::Hash;

use serde::Serialize;

use super::types::MatchPolicy;
use crate::codegen::utils::tokens;
use crate::config::{EntityConfig, FieldConfig};

/// Jaccard index of two sets; two empty sets are identical
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Token Jaccard of two identifiers (`work_order` vs `WorkOrderItem` -> 2/3)
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a: HashSet<String> = tokens(a).into_iter().collect();
    let b: HashSet<String> = tokens(b).into_iter().collect();
    jaccard(&a, &b)
}

/// Jaccard over the two entities' field names
pub fn field_overlap(source: &EntityConfig, target: &EntityConfig) -> f64 {
    let a: HashSet<&str> = source.field_names().collect();
    let b: HashSet<&str> = target.field_names().collect();
    jaccard(&a, &b)
}

/// Fraction of shared field names whose types agree; 0 without overlap
pub fn type_compatibility(source: &EntityConfig, target: &EntityConfig) -> f64 {
    let mut shared = 0usize;
    let mut agreeing = 0usize;
    for field in &source.fields {
        if let Some(other) = target.field(&field.name) {
            shared += 1;
            if other.field_type == field.field_type {
                agreeing += 1;
            }
        }
    }
    if shared == 0 {
        0.0
    } else {
        agreeing as f64 / shared as f64
    }
}

/// Component scores of an entity pair and their weighted total
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntityScore {
    pub name: f64,
    pub fields: f64,
    pub types: f64,
    pub total: f64,
}

pub fn score_entities(source: &EntityConfig, target: &EntityConfig, policy: &MatchPolicy) -> EntityScore {
    let name = name_similarity(&source.name, &target.name);
    let fields = field_overlap(source, target);
    let types = type_compatibility(source, target);

    let weight_sum = policy.name_weight + policy.field_weight + policy.type_weight;
    let total = if weight_sum > 0.0 {
        (policy.name_weight * name + policy.field_weight * fields + policy.type_weight * types) / weight_sum
    } else {
        0.0
    };

    EntityScore {
        name,
        fields,
        types,
        total,
    }
}

/// Likelihood that `added` is `removed` under a new name
pub fn field_similarity(removed: &FieldConfig, added: &FieldConfig, policy: &MatchPolicy) -> f64 {
    let name = name_similarity(&removed.name, &added.name);
    let types = if removed.field_type == added.field_type { 1.0 } else { 0.0 };

    let weight_sum = policy.field_name_weight + policy.field_type_weight;
    if weight_sum > 0.0 {
        (policy.field_name_weight * name + policy.field_type_weight * types) / weight_sum
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::from_yaml_str;

    fn scenario() -> (EntityConfig, EntityConfig) {
        let source = from_yaml_str(
            r#"
name: tasks
version: 1.0.0
entities:
  - name: task
    fields:
      - { name: id, type: integer }
      - { name: title, type: string }
      - { name: assignee_id, type: integer }
"#,
        )
        .unwrap();
        let target = from_yaml_str(
            r#"
name: properties
version: 1.0.0
entities:
  - name: property
    fields:
      - { name: id, type: integer }
      - { name: title, type: string }
      - { name: owner_id, type: integer }
"#,
        )
        .unwrap();
        (source.entities[0].clone(), target.entities[0].clone())
    }

    #[test]
    fn test_name_similarity() {
        assert_eq!(name_similarity("task", "task"), 1.0);
        assert_eq!(name_similarity("task", "property"), 0.0);
        assert!((name_similarity("work_order", "WorkOrderItem") - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_scenario_entity_score() {
        let (task, property) = scenario();
        let score = score_entities(&task, &property, &MatchPolicy::default());
        assert_eq!(score.name, 0.0);
        assert_eq!(score.fields, 0.5);
        assert_eq!(score.types, 1.0);
        assert!((score.total - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_scenario_field_rename_score() {
        let (task, property) = scenario();
        let removed = task.field("assignee_id").unwrap();
        let added = property.field("owner_id").unwrap();
        let score = field_similarity(removed, added, &MatchPolicy::default());
        assert!((score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_type_compatibility_without_overlap_is_zero() {
        let (task, mut property) = scenario();
        for field in &mut property.fields {
            field.name = format!("p_{}", field.name);
        }
        assert_eq!(type_compatibility(&task, &property), 0.0);
    }
}
