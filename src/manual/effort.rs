//! Fixed effort table for adaptation steps.

use std::fmt;

use serde::Serialize;

use super::steps::StepCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Low,
    Medium,
    High,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Low => "low",
            Difficulty::Medium => "medium",
            Difficulty::High => "high",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of change an adaptation step carries out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    EntityRenamed,
    EntityAdded,
    EntityRemoved,
    FieldAdded,
    FieldRemoved,
    FieldRenamed,
    FieldTypeChanged,
    FieldConstraintChanged,
    RelationshipAdded,
    RelationshipRemoved,
    RelationshipRetargeted,
    RelationshipCardinalityChanged,
    RelationshipRenamed,
    NavigationChanged,
    MetricChanged,
}

impl ChangeKind {
    /// Difficulty and base minutes before the category factor
    pub fn base_effort(&self) -> (Difficulty, u32) {
        use Difficulty::*;
        match self {
            ChangeKind::EntityRenamed => (Low, 15),
            ChangeKind::EntityAdded => (Medium, 30),
            ChangeKind::EntityRemoved => (Medium, 20),
            ChangeKind::FieldAdded => (Low, 10),
            ChangeKind::FieldRemoved => (Low, 10),
            ChangeKind::FieldRenamed => (Low, 10),
            ChangeKind::FieldTypeChanged => (Medium, 20),
            ChangeKind::FieldConstraintChanged => (Low, 10),
            ChangeKind::RelationshipAdded => (Medium, 25),
            ChangeKind::RelationshipRemoved => (Medium, 20),
            ChangeKind::RelationshipRetargeted => (High, 40),
            ChangeKind::RelationshipCardinalityChanged => (High, 60),
            ChangeKind::RelationshipRenamed => (Low, 10),
            ChangeKind::NavigationChanged => (Low, 5),
            ChangeKind::MetricChanged => (Low, 10),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::EntityRenamed => "entity_renamed",
            ChangeKind::EntityAdded => "entity_added",
            ChangeKind::EntityRemoved => "entity_removed",
            ChangeKind::FieldAdded => "field_added",
            ChangeKind::FieldRemoved => "field_removed",
            ChangeKind::FieldRenamed => "field_renamed",
            ChangeKind::FieldTypeChanged => "field_type_changed",
            ChangeKind::FieldConstraintChanged => "field_constraint_changed",
            ChangeKind::RelationshipAdded => "relationship_added",
            ChangeKind::RelationshipRemoved => "relationship_removed",
            ChangeKind::RelationshipRetargeted => "relationship_retargeted",
            ChangeKind::RelationshipCardinalityChanged => "relationship_cardinality_changed",
            ChangeKind::RelationshipRenamed => "relationship_renamed",
            ChangeKind::NavigationChanged => "navigation_changed",
            ChangeKind::MetricChanged => "metric_changed",
        }
    }
}

/// Share of the base minutes spent in each category
pub fn category_factor(category: StepCategory) -> f64 {
    match category {
        StepCategory::Database => 1.0,
        StepCategory::Model => 1.0,
        StepCategory::Schema => 0.5,
        StepCategory::Api => 0.5,
        StepCategory::Frontend => 0.75,
        StepCategory::Config => 0.25,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Effort {
    pub difficulty: Difficulty,
    pub minutes: u32,
}

impl Effort {
    /// Harder of the two difficulties, summed minutes
    pub fn combine(self, other: Effort) -> Effort {
        Effort {
            difficulty: self.difficulty.max(other.difficulty),
            minutes: self.minutes + other.minutes,
        }
    }
}

/// Effort for one step: base minutes scaled by category, rounded up to
/// the next multiple of five, never below five.
pub fn estimate(kind: ChangeKind, category: StepCategory) -> Effort {
    let (difficulty, base) = kind.base_effort();
    let scaled = (base as f64 * category_factor(category)).ceil() as u32;
    let minutes = scaled.div_ceil(5).max(1) * 5;
    Effort { difficulty, minutes }
}
