//! Field, relationship and config-level changes between matched configs.

use std::collections::HashSet;

use super::similarity::field_similarity;
use super::types::*;
use crate::config::{DomainConfig, EntityConfig, RelationshipConfig};

/// Field changes from `source` to `target`, a matched entity pair.
///
/// Source fields are visited in declaration order (type, constraint,
/// rename and removal changes), then unclaimed target fields are reported
/// as additions in their declaration order.
pub fn field_changes(source: &EntityConfig, target: &EntityConfig, policy: &MatchPolicy) -> Vec<FieldChange> {
    let removed: Vec<_> = source.fields.iter().filter(|f| !target.has_field(&f.name)).collect();
    let added: Vec<_> = target.fields.iter().filter(|f| !source.has_field(&f.name)).collect();

    // Greedy rename pairing over removed x added, best score first
    let mut candidates = Vec::new();
    for (ri, r) in removed.iter().enumerate() {
        for (ai, a) in added.iter().enumerate() {
            let score = field_similarity(r, a, policy);
            if score >= policy.field_rename_threshold {
                candidates.push((ri, ai, score));
            }
        }
    }
    candidates.sort_by(|x, y| {
        y.2.total_cmp(&x.2)
            .then_with(|| removed[x.0].name.cmp(&removed[y.0].name))
            .then_with(|| added[x.1].name.cmp(&added[y.1].name))
    });

    let mut renamed_to = vec![None; removed.len()];
    let mut claimed = vec![false; added.len()];
    for (ri, ai, score) in candidates {
        if renamed_to[ri].is_some() || claimed[ai] {
            continue;
        }
        renamed_to[ri] = Some((ai, score));
        claimed[ai] = true;
    }

    let mut changes = Vec::new();
    for field in &source.fields {
        if let Some(other) = target.field(&field.name) {
            if other.field_type != field.field_type {
                changes.push(FieldChange::TypeChanged {
                    name: field.name.clone(),
                    from: field.field_type,
                    to: other.field_type,
                });
            }
            let required = (field.required != other.required).then_some((field.required, other.required));
            let unique = (field.unique != other.unique).then_some((field.unique, other.unique));
            if required.is_some() || unique.is_some() {
                changes.push(FieldChange::ConstraintChanged {
                    name: field.name.clone(),
                    required,
                    unique,
                });
            }
            continue;
        }

        let Some(ri) = removed.iter().position(|r| r.name == field.name) else {
            continue;
        };
        match renamed_to[ri] {
            Some((ai, score)) => changes.push(FieldChange::Renamed {
                from: field.name.clone(),
                to: added[ai].name.clone(),
                score,
                from_type: field.field_type,
                to_type: added[ai].field_type,
            }),
            None => changes.push(FieldChange::Removed {
                name: field.name.clone(),
                field_type: field.field_type,
            }),
        }
    }

    for (ai, field) in added.iter().enumerate() {
        if !claimed[ai] {
            changes.push(FieldChange::Added {
                name: field.name.clone(),
                field_type: field.field_type,
            });
        }
    }

    changes
}

/// Target-side name of a source entity, falling back to its own name
fn mapped<'a>(name: &'a str, matches: &'a [EntityMatch]) -> &'a str {
    matches
        .iter()
        .find(|m| m.source == name)
        .map(|m| m.target.as_str())
        .unwrap_or(name)
}

/// Classify how a relationship changed between configs, if at all
fn compare(before: &RelationshipConfig, after: &RelationshipConfig, matches: &[EntityMatch]) -> Option<RelationshipChange> {
    let pair = || (before.clone(), after.clone());
    if before.kind != after.kind {
        let (before, after) = pair();
        return Some(RelationshipChange::CardinalityChanged { before, after });
    }
    if mapped(&before.target_entity, matches) != after.target_entity || before.foreign_key != after.foreign_key {
        let (before, after) = pair();
        return Some(RelationshipChange::Retargeted { before, after });
    }
    if before.name != after.name {
        let (before, after) = pair();
        return Some(RelationshipChange::Renamed { before, after });
    }
    None
}

/// Relationship changes declared by a matched entity pair.
///
/// Relationships pair up by name first; leftover removed/added relationships
/// with the same (mapped) target and cardinality are reported as renames.
pub fn relationship_changes(
    source: &DomainConfig,
    target: &DomainConfig,
    source_entity: &str,
    target_entity: &str,
    matches: &[EntityMatch],
) -> Vec<RelationshipChange> {
    let before: Vec<&RelationshipConfig> = source.relationships_from(source_entity).collect();
    let after: Vec<&RelationshipConfig> = target.relationships_from(target_entity).collect();

    let mut changes = Vec::new();
    let mut paired_after = HashSet::new();
    let mut unpaired_before = Vec::new();

    for rel in &before {
        match after.iter().position(|a| a.name == rel.name) {
            Some(ai) => {
                paired_after.insert(ai);
                if let Some(change) = compare(rel, after[ai], matches) {
                    changes.push(change);
                }
            }
            None => unpaired_before.push(*rel),
        }
    }

    for rel in unpaired_before {
        let renamed = after.iter().enumerate().find(|(ai, a)| {
            !paired_after.contains(ai)
                && a.kind == rel.kind
                && a.target_entity == mapped(&rel.target_entity, matches)
        });
        match renamed {
            Some((ai, a)) => {
                paired_after.insert(ai);
                changes.push(RelationshipChange::Renamed {
                    before: rel.clone(),
                    after: (*a).clone(),
                });
            }
            None => changes.push(RelationshipChange::Removed { relationship: rel.clone() }),
        }
    }

    for (ai, rel) in after.iter().enumerate() {
        if !paired_after.contains(&ai) {
            changes.push(RelationshipChange::Added {
                relationship: (*rel).clone(),
            });
        }
    }

    changes
}

/// Navigation items (keyed by path) and dashboard metrics (keyed by name)
/// that were added, removed or changed.
pub fn config_changes(source: &DomainConfig, target: &DomainConfig) -> Vec<ConfigChange> {
    let mut changes = Vec::new();

    for item in &source.navigation {
        match target.navigation.iter().find(|n| n.path == item.path) {
            Some(other) if other != item => changes.push(ConfigChange::NavigationChanged {
                before: item.clone(),
                after: other.clone(),
            }),
            Some(_) => {}
            None => changes.push(ConfigChange::NavigationRemoved { item: item.clone() }),
        }
    }
    for item in &target.navigation {
        if !source.navigation.iter().any(|n| n.path == item.path) {
            changes.push(ConfigChange::NavigationAdded { item: item.clone() });
        }
    }

    for metric in &source.dashboard_metrics {
        match target.dashboard_metrics.iter().find(|m| m.name == metric.name) {
            Some(other) if other != metric => changes.push(ConfigChange::MetricChanged {
                before: metric.clone(),
                after: other.clone(),
            }),
            Some(_) => {}
            None => changes.push(ConfigChange::MetricRemoved { metric: metric.clone() }),
        }
    }
    for metric in &target.dashboard_metrics {
        if !source.dashboard_metrics.iter().any(|m| m.name == metric.name) {
            changes.push(ConfigChange::MetricAdded { metric: metric.clone() });
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{from_yaml_str, FieldType, RelationshipKind};

    fn entity(fields: &str) -> EntityConfig {
        let config = from_yaml_str(&format!(
            "name: demo\nversion: 1.0.0\nentities:\n  - name: task\n    fields:\n{}",
            fields
        ))
        .unwrap();
        config.entities[0].clone()
    }

    #[test]
    fn test_type_and_constraint_changes() {
        let before = entity("      - { name: title, type: string }\n      - { name: points, type: integer }\n");
        let after = entity(
            "      - { name: title, type: string, required: true }\n      - { name: points, type: decimal }\n",
        );
        let changes = field_changes(&before, &after, &MatchPolicy::default());
        assert_eq!(
            changes,
            vec![
                FieldChange::ConstraintChanged {
                    name: "title".to_string(),
                    required: Some((false, true)),
                    unique: None,
                },
                FieldChange::TypeChanged {
                    name: "points".to_string(),
                    from: FieldType::Integer,
                    to: FieldType::Decimal,
                },
            ]
        );
    }

    #[test]
    fn test_unrelated_fields_are_not_renamed() {
        let before = entity("      - { name: title, type: string }\n      - { name: estimate, type: integer }\n");
        let after = entity("      - { name: title, type: string }\n      - { name: due_on, type: date }\n");
        let changes = field_changes(&before, &after, &MatchPolicy::default());
        assert!(matches!(changes[0], FieldChange::Removed { ref name, .. } if name == "estimate"));
        assert!(matches!(changes[1], FieldChange::Added { ref name, .. } if name == "due_on"));
    }

    fn domain(relationships: &str) -> DomainConfig {
        from_yaml_str(&format!(
            r#"
name: demo
version: 1.0.0
entities:
  - name: task
    fields:
      - {{ name: title, type: string }}
  - name: user
    fields:
      - {{ name: email, type: email }}
  - name: team
    fields:
      - {{ name: name, type: string }}
relationships:
{}"#,
            relationships
        ))
        .unwrap()
    }

    fn identity(config: &DomainConfig) -> Vec<EntityMatch> {
        config
            .entities
            .iter()
            .map(|e| EntityMatch {
                source: e.name.clone(),
                target: e.name.clone(),
                score: 1.0,
                name_score: 1.0,
                field_score: 1.0,
                type_score: 1.0,
                renamed: false,
                table_renamed: false,
                source_table: e.table_name.clone(),
                target_table: e.table_name.clone(),
            })
            .collect()
    }

    #[test]
    fn test_relationship_retarget_and_cardinality() {
        let before = domain(
            "  - { name: owner, type: many_to_one, source_entity: task, target_entity: user }\n  - { name: watchers, type: one_to_many, source_entity: task, target_entity: user, foreign_key: watched_task_id }\n",
        );
        let after = domain(
            "  - { name: owner, type: many_to_one, source_entity: task, target_entity: team, foreign_key: user_id }\n  - { name: watchers, type: many_to_many, source_entity: task, target_entity: user }\n",
        );
        let matches = identity(&before);
        let changes = relationship_changes(&before, &after, "task", "task", &matches);
        assert_eq!(changes.len(), 2);
        assert!(matches!(changes[0], RelationshipChange::Retargeted { .. }));
        assert_eq!(
            changes[1].cardinality(),
            (Some(RelationshipKind::OneToMany), Some(RelationshipKind::ManyToMany))
        );
    }

    #[test]
    fn test_relationship_rename_is_paired() {
        let before = domain("  - { name: owner, type: many_to_one, source_entity: task, target_entity: user }\n");
        let after = domain(
            "  - { name: assignee, type: many_to_one, source_entity: task, target_entity: user, foreign_key: user_id }\n",
        );
        let matches = identity(&before);
        let changes = relationship_changes(&before, &after, "task", "task", &matches);
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0], RelationshipChange::Renamed { .. }));
    }

    #[test]
    fn test_navigation_changes_keyed_by_path() {
        let base = "name: demo\nversion: 1.0.0\nentities:\n  - name: task\n    fields:\n      - { name: title, type: string }\n";
        let before = from_yaml_str(&format!("{}navigation:\n  - {{ label: Tasks, entity: task }}\n", base)).unwrap();
        let after = from_yaml_str(&format!("{}navigation:\n  - {{ label: Work, entity: task }}\n", base)).unwrap();
        let changes = config_changes(&before, &after);
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0], ConfigChange::NavigationChanged { .. }));
    }
}
