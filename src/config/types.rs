//! Validated intermediate representation of a business domain.
//!
//! Values of these types are only produced by the validator
//! ([`crate::config::validate`]) and are treated as immutable for the
//! duration of a generation or diff run.

use serde::Serialize;
use std::fmt;

use super::raw::ValidationRules;

/// Abstract field type, independent of any target language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Text,
    Integer,
    Float,
    Decimal,
    Boolean,
    Date,
    Datetime,
    Time,
    Enum,
    File,
    Uuid,
    Json,
    Array,
    Email,
    Url,
}

impl FieldType {
    /// Every member of the closed enumeration, in declaration order
    pub const ALL: [FieldType; 16] = [
        FieldType::String,
        FieldType::Text,
        FieldType::Integer,
        FieldType::Float,
        FieldType::Decimal,
        FieldType::Boolean,
        FieldType::Date,
        FieldType::Datetime,
        FieldType::Time,
        FieldType::Enum,
        FieldType::File,
        FieldType::Uuid,
        FieldType::Json,
        FieldType::Array,
        FieldType::Email,
        FieldType::Url,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Decimal => "decimal",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Time => "time",
            FieldType::Enum => "enum",
            FieldType::File => "file",
            FieldType::Uuid => "uuid",
            FieldType::Json => "json",
            FieldType::Array => "array",
            FieldType::Email => "email",
            FieldType::Url => "url",
        }
    }

    /// Parse a type name as written in a config file
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Float | FieldType::Decimal)
    }

    /// Types whose values are stored as plain strings
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            FieldType::String
                | FieldType::Text
                | FieldType::Enum
                | FieldType::Email
                | FieldType::Url
                | FieldType::File
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity role within the domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[default]
    Core,
    Lookup,
}

impl EntityKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "core" => Some(EntityKind::Core),
            "lookup" => Some(EntityKind::Lookup),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Core => "core",
            EntityKind::Lookup => "lookup",
        }
    }
}

/// Relationship cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl RelationshipKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "one_to_one" => Some(RelationshipKind::OneToOne),
            "one_to_many" => Some(RelationshipKind::OneToMany),
            "many_to_one" => Some(RelationshipKind::ManyToOne),
            "many_to_many" => Some(RelationshipKind::ManyToMany),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::OneToOne => "one_to_one",
            RelationshipKind::OneToMany => "one_to_many",
            RelationshipKind::ManyToOne => "many_to_one",
            RelationshipKind::ManyToMany => "many_to_many",
        }
    }

    /// True when the foreign key column lives on the source entity's table
    pub fn foreign_key_on_source(&self) -> bool {
        matches!(self, RelationshipKind::ManyToOne | RelationshipKind::OneToOne)
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregation applied by a dashboard metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "count" => Some(Aggregation::Count),
            "sum" => Some(Aggregation::Sum),
            "avg" => Some(Aggregation::Avg),
            "min" => Some(Aggregation::Min),
            "max" => Some(Aggregation::Max),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Count => "count",
            Aggregation::Sum => "sum",
            Aggregation::Avg => "avg",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
        }
    }

    /// Every aggregation except `count` operates on a field
    pub fn requires_field(&self) -> bool {
        !matches!(self, Aggregation::Count)
    }
}

/// A single field of an entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldConfig {
    pub name: String,
    pub title: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    pub validation: ValidationRules,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A business entity and its ordered fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityConfig {
    pub name: String,
    pub display_name: String,
    pub table_name: String,
    pub primary_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_field: Option<String>,
    pub timestamps: bool,
    pub kind: EntityKind,
    pub fields: Vec<FieldConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EntityConfig {
    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Whether the primary key column is declared among the fields
    pub fn declares_primary_key(&self) -> bool {
        self.has_field(&self.primary_key)
    }

    /// Field used to label records in lists and pickers.
    ///
    /// Falls back to the first textual field, then to the primary key.
    pub fn display_field_name(&self) -> &str {
        if let Some(ref name) = self.display_field {
            return name;
        }
        self.fields
            .iter()
            .find(|f| f.name != self.primary_key && f.field_type.is_textual())
            .map(|f| f.name.as_str())
            .unwrap_or(&self.primary_key)
    }
}

/// A relationship between two entities
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: RelationshipKind,
    pub source_entity: String,
    pub target_entity: String,
    pub foreign_key: String,
    pub cascade_delete: bool,
}

impl RelationshipConfig {
    pub fn is_self_reference(&self) -> bool {
        self.source_entity == self.target_entity
    }

    /// Entity whose table carries the foreign key column, if any
    pub fn foreign_key_owner(&self) -> Option<&str> {
        match self.kind {
            RelationshipKind::ManyToOne | RelationshipKind::OneToOne => Some(&self.source_entity),
            RelationshipKind::OneToMany => Some(&self.target_entity),
            RelationshipKind::ManyToMany => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationItem {
    pub label: String,
    pub entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetric {
    pub name: String,
    pub title: String,
    pub entity: String,
    pub aggregation: Aggregation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowTransition {
    pub name: String,
    pub from: String,
    pub to: String,
}

/// State machine over an entity's status field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowConfig {
    pub name: String,
    pub entity: String,
    pub field: String,
    pub states: Vec<String>,
    pub transitions: Vec<WorkflowTransition>,
}

/// Validated domain configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainConfig {
    pub name: String,
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declaration order doubles as generation priority
    pub entities: Vec<EntityConfig>,
    pub relationships: Vec<RelationshipConfig>,
    pub navigation: Vec<NavigationItem>,
    pub dashboard_metrics: Vec<DashboardMetric>,
    pub workflows: Vec<WorkflowConfig>,
}

impl DomainConfig {
    pub fn entity(&self, name: &str) -> Option<&EntityConfig> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn entity_index(&self, name: &str) -> Option<usize> {
        self.entities.iter().position(|e| e.name == name)
    }

    /// Relationships declared with `entity` as their source
    pub fn relationships_from<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a RelationshipConfig> {
        self.relationships.iter().filter(move |r| r.source_entity == entity)
    }

    /// Relationships pointing at `entity`
    pub fn relationships_to<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a RelationshipConfig> {
        self.relationships.iter().filter(move |r| r.target_entity == entity)
    }

    pub fn navigation_for<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a NavigationItem> {
        self.navigation.iter().filter(move |n| n.entity == entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, field_type: FieldType) -> FieldConfig {
        FieldConfig {
            name: name.to_string(),
            title: name.to_string(),
            field_type,
            required: false,
            unique: false,
            default_value: None,
            validation: ValidationRules::default(),
            description: None,
        }
    }

    fn entity(fields: Vec<FieldConfig>) -> EntityConfig {
        EntityConfig {
            name: "task".to_string(),
            display_name: "Task".to_string(),
            table_name: "tasks".to_string(),
            primary_key: "id".to_string(),
            display_field: None,
            timestamps: true,
            kind: EntityKind::Core,
            fields,
            description: None,
        }
    }

    #[test]
    fn test_field_type_round_trips_names() {
        for field_type in FieldType::ALL {
            assert_eq!(FieldType::from_name(field_type.as_str()), Some(field_type));
        }
        assert_eq!(FieldType::from_name("unsupported_type"), None);
        assert_eq!(FieldType::from_name("String"), None);
    }

    #[test]
    fn test_display_field_falls_back_to_first_textual_field() {
        let e = entity(vec![
            field("id", FieldType::Integer),
            field("priority", FieldType::Integer),
            field("title", FieldType::String),
        ]);
        assert_eq!(e.display_field_name(), "title");
        assert!(e.declares_primary_key());
    }

    #[test]
    fn test_display_field_falls_back_to_primary_key() {
        let e = entity(vec![field("amount", FieldType::Decimal)]);
        assert_eq!(e.display_field_name(), "id");
        assert!(!e.declares_primary_key());
    }

    #[test]
    fn test_foreign_key_owner() {
        let mut rel = RelationshipConfig {
            name: "project".to_string(),
            kind: RelationshipKind::ManyToOne,
            source_entity: "task".to_string(),
            target_entity: "project".to_string(),
            foreign_key: "project_id".to_string(),
            cascade_delete: false,
        };
        assert_eq!(rel.foreign_key_owner(), Some("task"));

        rel.kind = RelationshipKind::OneToMany;
        assert_eq!(rel.foreign_key_owner(), Some("project"));

        rel.kind = RelationshipKind::ManyToMany;
        assert_eq!(rel.foreign_key_owner(), None);
    }
}
