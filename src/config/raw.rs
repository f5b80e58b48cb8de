//! User-authored configuration as parsed from YAML or JSON.
//!
//! These structures are deliberately lenient: required keys are `Option`s and
//! enumerations are plain strings so the validator can report every defect in
//! one pass instead of stopping at the first serde error.

use serde::{Deserialize, Serialize};

/// Per-field validation rules
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ValidationRules {
    #[serde(default, alias = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(default, alias = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, alias = "options", skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

impl ValidationRules {
    pub fn is_empty(&self) -> bool {
        *self == ValidationRules::default()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDomainConfig {
    pub name: Option<String>,
    pub title: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub entities: Vec<RawEntity>,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
    #[serde(default)]
    pub navigation: Vec<RawNavigationItem>,
    #[serde(default, alias = "dashboardMetrics", alias = "metrics")]
    pub dashboard_metrics: Vec<RawDashboardMetric>,
    #[serde(default)]
    pub workflows: Vec<RawWorkflow>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawEntity {
    pub name: Option<String>,
    #[serde(alias = "displayName")]
    pub display_name: Option<String>,
    #[serde(alias = "tableName")]
    pub table_name: Option<String>,
    #[serde(alias = "primaryKey")]
    pub primary_key: Option<String>,
    #[serde(alias = "displayField")]
    pub display_field: Option<String>,
    pub timestamps: Option<bool>,
    #[serde(rename = "type", alias = "kind")]
    pub kind: Option<String>,
    #[serde(default)]
    pub fields: Vec<RawField>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawField {
    pub name: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(rename = "default", alias = "defaultValue", alias = "default_value")]
    pub default_value: Option<serde_json::Value>,
    #[serde(default, alias = "validationRules", alias = "validation_rules")]
    pub validation: ValidationRules,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawRelationship {
    pub name: Option<String>,
    #[serde(rename = "type", alias = "kind")]
    pub kind: Option<String>,
    #[serde(alias = "sourceEntity", alias = "source")]
    pub source_entity: Option<String>,
    #[serde(alias = "targetEntity", alias = "target")]
    pub target_entity: Option<String>,
    #[serde(alias = "foreignKey")]
    pub foreign_key: Option<String>,
    #[serde(default, alias = "cascadeDelete")]
    pub cascade_delete: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawNavigationItem {
    pub label: Option<String>,
    pub entity: Option<String>,
    pub icon: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDashboardMetric {
    pub name: Option<String>,
    pub title: Option<String>,
    pub entity: Option<String>,
    pub aggregation: Option<String>,
    pub field: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawWorkflow {
    pub name: Option<String>,
    pub entity: Option<String>,
    pub field: Option<String>,
    #[serde(default)]
    pub states: Vec<String>,
    #[serde(default)]
    pub transitions: Vec<RawTransition>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTransition {
    pub name: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}
