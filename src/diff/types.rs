//! Diff result types and the tunable matching policy.

use serde::{Deserialize, Serialize};

use crate::config::{DashboardMetric, FieldType, NavigationItem, RelationshipConfig, RelationshipKind};

/// Weights and thresholds used to align entities and fields.
///
/// These are policy, not contract: they are read from `domaingen.yaml`
/// (`matching:`) and `DOMAINGEN_MATCH_THRESHOLD`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MatchPolicy {
    /// Weight of entity name token similarity
    pub name_weight: f64,
    /// Weight of field-name set overlap
    pub field_weight: f64,
    /// Weight of type agreement on shared field names
    pub type_weight: f64,
    /// Minimum entity score for a match
    pub threshold: f64,
    /// Minimum field score for a removed/added pair to count as a rename
    pub field_rename_threshold: f64,
    /// Weight of field name similarity within a field score
    pub field_name_weight: f64,
    /// Weight of type equality within a field score
    pub field_type_weight: f64,
    /// A runner-up within this distance of the chosen score is ambiguous
    pub ambiguity_margin: f64,
    /// Candidates listed per ambiguity warning
    pub top_n: usize,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            name_weight: 0.3,
            field_weight: 0.5,
            type_weight: 0.2,
            threshold: 0.4,
            field_rename_threshold: 0.5,
            field_name_weight: 0.6,
            field_type_weight: 0.4,
            ambiguity_margin: 0.05,
            top_n: 3,
        }
    }
}

impl MatchPolicy {
    pub fn validate(&self) -> Result<(), String> {
        let weights = [
            ("name_weight", self.name_weight),
            ("field_weight", self.field_weight),
            ("type_weight", self.type_weight),
            ("field_name_weight", self.field_name_weight),
            ("field_type_weight", self.field_type_weight),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(format!("matching.{} must be a non-negative number, got {}", name, weight));
            }
        }
        if self.name_weight + self.field_weight + self.type_weight <= 0.0 {
            return Err("matching entity weights must not all be zero".to_string());
        }
        if self.field_name_weight + self.field_type_weight <= 0.0 {
            return Err("matching field weights must not both be zero".to_string());
        }

        let unit = [
            ("threshold", self.threshold),
            ("field_rename_threshold", self.field_rename_threshold),
            ("ambiguity_margin", self.ambiguity_margin),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("matching.{} must be between 0 and 1, got {}", name, value));
            }
        }
        if self.top_n == 0 {
            return Err("matching.top_n must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Two entities judged to be the same concept across configs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityMatch {
    pub source: String,
    pub target: String,
    pub score: f64,
    pub name_score: f64,
    pub field_score: f64,
    pub type_score: f64,
    pub renamed: bool,
    pub table_renamed: bool,
    pub source_table: String,
    pub target_table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub target: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityKind {
    /// No match, but a candidate scored at least half the threshold
    NearMiss,
    /// Matched, but another candidate scored within the ambiguity margin
    CloseRunnerUp,
}

/// A matching decision a human should double-check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmbiguousMatchWarning {
    pub kind: AmbiguityKind,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen: Option<String>,
    /// Best candidates first, at most `top_n`
    pub candidates: Vec<ScoredCandidate>,
}

impl std::fmt::Display for AmbiguousMatchWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let candidates: Vec<String> = self
            .candidates
            .iter()
            .map(|c| format!("{} ({:.2})", c.target, c.score))
            .collect();
        match (&self.kind, &self.chosen) {
            (AmbiguityKind::CloseRunnerUp, Some(chosen)) => write!(
                f,
                "'{}' was matched to '{}' but other candidates scored close: {}",
                self.source,
                chosen,
                candidates.join(", ")
            ),
            _ => write!(
                f,
                "'{}' was left unmatched; nearest candidates: {}",
                self.source,
                candidates.join(", ")
            ),
        }
    }
}

/// Change to a single field of a matched entity pair
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum FieldChange {
    Added {
        name: String,
        field_type: FieldType,
    },
    Removed {
        name: String,
        field_type: FieldType,
    },
    TypeChanged {
        name: String,
        from: FieldType,
        to: FieldType,
    },
    Renamed {
        from: String,
        to: String,
        score: f64,
        from_type: FieldType,
        to_type: FieldType,
    },
    ConstraintChanged {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        required: Option<(bool, bool)>,
        #[serde(skip_serializing_if = "Option::is_none")]
        unique: Option<(bool, bool)>,
    },
}

impl FieldChange {
    /// Field name in the source config, if the field existed there
    pub fn source_name(&self) -> Option<&str> {
        match self {
            FieldChange::Added { .. } => None,
            FieldChange::Removed { name, .. }
            | FieldChange::TypeChanged { name, .. }
            | FieldChange::ConstraintChanged { name, .. } => Some(name),
            FieldChange::Renamed { from, .. } => Some(from),
        }
    }

    /// Field name in the target config, if the field exists there
    pub fn target_name(&self) -> Option<&str> {
        match self {
            FieldChange::Removed { .. } => None,
            FieldChange::Added { name, .. }
            | FieldChange::TypeChanged { name, .. }
            | FieldChange::ConstraintChanged { name, .. } => Some(name),
            FieldChange::Renamed { to, .. } => Some(to),
        }
    }
}

/// Field changes between a matched entity pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDiff {
    pub source_entity: String,
    pub target_entity: String,
    pub changes: Vec<FieldChange>,
}

/// Change to a relationship declared by a matched entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum RelationshipChange {
    Added {
        relationship: RelationshipConfig,
    },
    Removed {
        relationship: RelationshipConfig,
    },
    Retargeted {
        before: RelationshipConfig,
        after: RelationshipConfig,
    },
    CardinalityChanged {
        before: RelationshipConfig,
        after: RelationshipConfig,
    },
    Renamed {
        before: RelationshipConfig,
        after: RelationshipConfig,
    },
}

impl RelationshipChange {
    pub fn name(&self) -> &str {
        match self {
            RelationshipChange::Added { relationship } | RelationshipChange::Removed { relationship } => {
                &relationship.name
            }
            RelationshipChange::Retargeted { after, .. }
            | RelationshipChange::CardinalityChanged { after, .. }
            | RelationshipChange::Renamed { after, .. } => &after.name,
        }
    }

    pub fn before(&self) -> Option<&RelationshipConfig> {
        match self {
            RelationshipChange::Added { .. } => None,
            RelationshipChange::Removed { relationship } => Some(relationship),
            RelationshipChange::Retargeted { before, .. }
            | RelationshipChange::CardinalityChanged { before, .. }
            | RelationshipChange::Renamed { before, .. } => Some(before),
        }
    }

    pub fn after(&self) -> Option<&RelationshipConfig> {
        match self {
            RelationshipChange::Removed { .. } => None,
            RelationshipChange::Added { relationship } => Some(relationship),
            RelationshipChange::Retargeted { after, .. }
            | RelationshipChange::CardinalityChanged { after, .. }
            | RelationshipChange::Renamed { after, .. } => Some(after),
        }
    }

    pub fn cardinality(&self) -> (Option<RelationshipKind>, Option<RelationshipKind>) {
        (self.before().map(|r| r.kind), self.after().map(|r| r.kind))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipDiff {
    pub source_entity: String,
    pub target_entity: String,
    pub changes: Vec<RelationshipChange>,
}

/// Change to navigation or dashboard configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum ConfigChange {
    NavigationAdded { item: NavigationItem },
    NavigationRemoved { item: NavigationItem },
    NavigationChanged { before: NavigationItem, after: NavigationItem },
    MetricAdded { metric: DashboardMetric },
    MetricRemoved { metric: DashboardMetric },
    MetricChanged { before: DashboardMetric, after: DashboardMetric },
}

impl ConfigChange {
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            ConfigChange::NavigationAdded { .. }
                | ConfigChange::NavigationRemoved { .. }
                | ConfigChange::NavigationChanged { .. }
        )
    }
}

/// Structural difference between two validated domain configs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigDiff {
    pub source_domain: String,
    pub source_version: String,
    pub target_domain: String,
    pub target_version: String,
    /// In source declaration order
    pub entity_matches: Vec<EntityMatch>,
    pub unmatched_source: Vec<String>,
    pub unmatched_target: Vec<String>,
    /// Only pairs with at least one change
    pub field_diffs: Vec<FieldDiff>,
    pub relationship_diffs: Vec<RelationshipDiff>,
    pub config_changes: Vec<ConfigChange>,
    pub warnings: Vec<AmbiguousMatchWarning>,
}

impl ConfigDiff {
    /// Whether the two configs are structurally identical
    pub fn is_empty(&self) -> bool {
        self.unmatched_source.is_empty()
            && self.unmatched_target.is_empty()
            && self.field_diffs.is_empty()
            && self.relationship_diffs.is_empty()
            && self.config_changes.is_empty()
            && self.entity_matches.iter().all(|m| !m.renamed && !m.table_renamed)
    }

    pub fn match_for_source(&self, source: &str) -> Option<&EntityMatch> {
        self.entity_matches.iter().find(|m| m.source == source)
    }

    pub fn field_diff(&self, source: &str) -> Option<&FieldDiff> {
        self.field_diffs.iter().find(|d| d.source_entity == source)
    }

    pub fn relationship_diff(&self, source: &str) -> Option<&RelationshipDiff> {
        self.relationship_diffs.iter().find(|d| d.source_entity == source)
    }

    /// Target name a source entity maps to, if it was matched
    pub fn mapped_name(&self, source: &str) -> Option<&str> {
        self.match_for_source(source).map(|m| m.target.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        MatchPolicy::default().validate().unwrap();
    }

    #[test]
    fn test_policy_rejects_out_of_range_threshold() {
        let policy = MatchPolicy {
            threshold: 1.5,
            ..MatchPolicy::default()
        };
        assert!(policy.validate().unwrap_err().contains("threshold"));
    }

    #[test]
    fn test_policy_rejects_zero_weights() {
        let policy = MatchPolicy {
            name_weight: 0.0,
            field_weight: 0.0,
            type_weight: 0.0,
            ..MatchPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_field_change_names() {
        let change = FieldChange::Renamed {
            from: "assignee_id".to_string(),
            to: "owner_id".to_string(),
            score: 0.6,
            from_type: FieldType::Integer,
            to_type: FieldType::Integer,
        };
        assert_eq!(change.source_name(), Some("assignee_id"));
        assert_eq!(change.target_name(), Some("owner_id"));
    }
}
