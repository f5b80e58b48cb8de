//! Structural and cross-reference validation of domain configs.
//!
//! Every defect is reported exactly once: a reference to an undeclared entity
//! does not additionally fail the checks that depend on that entity, so a
//! user fixing errors one by one never chases cascades.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::raw::{
    RawDashboardMetric, RawDomainConfig, RawEntity, RawField, RawNavigationItem,
    RawRelationship, RawWorkflow, ValidationRules,
};
use super::types::*;
use crate::codegen::utils::{pluralize, to_title_case};
use crate::error::{ValidationError, ValidationErrorKind as Kind};

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("name pattern is a valid regex"));

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("version pattern is a valid regex"));

/// Whether `name` is a valid domain, entity, field or relationship name
pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// Non-fatal finding, e.g. a self-referencing relationship
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationWarning {
    pub location: String,
    pub message: String,
}

/// Full outcome of a validation pass
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Present only when `errors` is empty
    pub config: Option<DomainConfig>,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a raw config, returning the verified IR or every error found.
///
/// Warnings are logged and otherwise dropped; use [`check`] to inspect them.
pub fn validate(raw: &RawDomainConfig) -> Result<DomainConfig, Vec<ValidationError>> {
    let report = check(raw);
    for warning in &report.warnings {
        tracing::warn!(location = %warning.location, "{}", warning.message);
    }
    match report.config {
        Some(config) if report.errors.is_empty() => Ok(config),
        _ => Err(report.errors),
    }
}

/// Run every check and return errors and warnings together
pub fn check(raw: &RawDomainConfig) -> ValidationReport {
    let mut validator = Validator::default();
    let config = validator.domain(raw);

    tracing::debug!(
        errors = validator.errors.len(),
        warnings = validator.warnings.len(),
        "validated domain config"
    );

    let config = if validator.errors.is_empty() { Some(config) } else { None };
    ValidationReport {
        config,
        errors: validator.errors,
        warnings: validator.warnings,
    }
}

#[derive(Default)]
struct Validator {
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationWarning>,
}

/// Names declared by the raw config, used to resolve references without
/// depending on whether each declaration was otherwise valid.
struct Declared<'a> {
    entities: Vec<&'a RawEntity>,
}

impl<'a> Declared<'a> {
    fn new(raw: &'a RawDomainConfig) -> Self {
        Self {
            entities: raw.entities.iter().filter(|e| e.name.is_some()).collect(),
        }
    }

    fn entity(&self, name: &str) -> Option<&'a RawEntity> {
        self.entities
            .iter()
            .copied()
            .find(|e| e.name.as_deref() == Some(name))
    }

    fn has_field(&self, entity: &RawEntity, field: &str) -> bool {
        entity.fields.iter().any(|f| f.name.as_deref() == Some(field))
    }
}

fn located(scope: &str, name: Option<&str>, index: usize) -> String {
    match name {
        Some(name) => format!("{}[{}]", scope, name),
        None => format!("{}[#{}]", scope, index),
    }
}

impl Validator {
    fn error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    fn warn(&mut self, location: String, message: String) {
        self.warnings.push(ValidationWarning { location, message });
    }

    /// Report a missing or malformed name, returning the name either way
    fn name(&mut self, value: Option<&str>, location: &str, what: &str, entity: Option<&str>) -> String {
        match value {
            None => {
                self.error(
                    ValidationError::new(Kind::MissingField, location, format!("{} is missing 'name'", what))
                        .with_entity(entity),
                );
                String::new()
            }
            Some(name) => {
                if !is_valid_name(name) {
                    self.error(
                        ValidationError::new(
                            Kind::InvalidPattern,
                            location,
                            format!("{} name '{}' must match ^[a-z][a-z0-9_]*$", what, name),
                        )
                        .with_entity(entity),
                    );
                }
                name.to_string()
            }
        }
    }

    fn domain(&mut self, raw: &RawDomainConfig) -> DomainConfig {
        let name = self.name(raw.name.as_deref(), "domain", "domain", None);

        let version = match raw.version.as_deref() {
            None => {
                self.error(ValidationError::new(Kind::MissingField, "domain", "domain is missing 'version'"));
                String::new()
            }
            Some(version) => {
                if !VERSION_PATTERN.is_match(version) {
                    self.error(ValidationError::new(
                        Kind::InvalidPattern,
                        "domain.version",
                        format!("version '{}' must be semver (MAJOR.MINOR.PATCH)", version),
                    ));
                }
                version.to_string()
            }
        };

        let declared = Declared::new(raw);

        let mut seen = HashSet::new();
        let mut entities = Vec::with_capacity(raw.entities.len());
        for (index, entity) in raw.entities.iter().enumerate() {
            if let Some(ref entity_name) = entity.name {
                if !seen.insert(entity_name.as_str()) {
                    self.error(
                        ValidationError::new(
                            Kind::DuplicateName,
                            located("entities", Some(entity_name), index),
                            format!("entity '{}' is declared more than once", entity_name),
                        )
                        .with_entity(Some(entity_name)),
                    );
                }
            }
            entities.push(self.entity(entity, index));
        }

        let mut relationship_keys = HashSet::new();
        let mut relationships = Vec::with_capacity(raw.relationships.len());
        for (index, relationship) in raw.relationships.iter().enumerate() {
            if let Some(rel) = self.relationship(relationship, index, &declared, &mut relationship_keys) {
                relationships.push(rel);
            }
        }
        self.foreign_key_collisions(&relationships);

        let navigation = raw
            .navigation
            .iter()
            .enumerate()
            .filter_map(|(index, item)| self.navigation_item(item, index, &declared))
            .collect();

        let dashboard_metrics = raw
            .dashboard_metrics
            .iter()
            .enumerate()
            .filter_map(|(index, metric)| self.metric(metric, index, &declared))
            .collect();

        let workflows = raw
            .workflows
            .iter()
            .enumerate()
            .filter_map(|(index, workflow)| self.workflow(workflow, index, &declared))
            .collect();

        DomainConfig {
            title: raw.title.clone().unwrap_or_else(|| to_title_case(&name)),
            name,
            version,
            description: raw.description.clone(),
            entities,
            relationships,
            navigation,
            dashboard_metrics,
            workflows,
        }
    }

    fn entity(&mut self, raw: &RawEntity, index: usize) -> EntityConfig {
        let location = located("entities", raw.name.as_deref(), index);
        let name = self.name(raw.name.as_deref(), &location, "entity", None);
        let entity_ref = raw.name.as_deref();

        let kind = match raw.kind.as_deref() {
            None => EntityKind::Core,
            Some(kind) => EntityKind::from_name(kind).unwrap_or_else(|| {
                self.error(
                    ValidationError::new(
                        Kind::InvalidValue,
                        format!("{}.type", location),
                        format!("entity type '{}' must be one of: core, lookup", kind),
                    )
                    .with_entity(entity_ref),
                );
                EntityKind::Core
            }),
        };

        if let Some(ref table) = raw.table_name {
            if !is_valid_name(table) {
                self.error(
                    ValidationError::new(
                        Kind::InvalidPattern,
                        format!("{}.table_name", location),
                        format!("table name '{}' must match ^[a-z][a-z0-9_]*$", table),
                    )
                    .with_entity(entity_ref),
                );
            }
        }

        if let Some(ref pk) = raw.primary_key {
            if !is_valid_name(pk) {
                self.error(
                    ValidationError::new(
                        Kind::InvalidPattern,
                        format!("{}.primary_key", location),
                        format!("primary key '{}' must match ^[a-z][a-z0-9_]*$", pk),
                    )
                    .with_entity(entity_ref),
                );
            }
        }

        if raw.fields.is_empty() {
            self.error(
                ValidationError::new(
                    Kind::EmptyEntity,
                    location.clone(),
                    format!("entity '{}' must declare at least one field", entity_ref.unwrap_or("?")),
                )
                .with_entity(entity_ref),
            );
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(raw.fields.len());
        for (field_index, field) in raw.fields.iter().enumerate() {
            if let Some(ref field_name) = field.name {
                if !seen.insert(field_name.as_str()) {
                    self.error(
                        ValidationError::new(
                            Kind::DuplicateName,
                            located(&format!("{}.fields", location), Some(field_name), field_index),
                            format!("field '{}' is declared more than once", field_name),
                        )
                        .with_entity(entity_ref)
                        .with_field(Some(field_name)),
                    );
                }
            }
            if let Some(field) = self.field(field, field_index, &location, entity_ref) {
                fields.push(field);
            }
        }

        if let Some(ref display) = raw.display_field {
            if !raw.fields.iter().any(|f| f.name.as_deref() == Some(display.as_str())) {
                self.error(
                    ValidationError::new(
                        Kind::UnknownReference,
                        format!("{}.display_field", location),
                        format!("display field '{}' is not a field of entity '{}'", display, name),
                    )
                    .with_entity(entity_ref)
                    .with_field(Some(display)),
                );
            }
        }

        EntityConfig {
            display_name: raw.display_name.clone().unwrap_or_else(|| to_title_case(&name)),
            table_name: raw.table_name.clone().unwrap_or_else(|| pluralize(&name)),
            primary_key: raw.primary_key.clone().unwrap_or_else(|| "id".to_string()),
            display_field: raw.display_field.clone(),
            timestamps: raw.timestamps.unwrap_or(true),
            kind,
            fields,
            description: raw.description.clone(),
            name,
        }
    }

    fn field(
        &mut self,
        raw: &RawField,
        index: usize,
        entity_location: &str,
        entity: Option<&str>,
    ) -> Option<FieldConfig> {
        let location = located(&format!("{}.fields", entity_location), raw.name.as_deref(), index);
        let name = self.name(raw.name.as_deref(), &location, "field", entity);
        let field_ref = raw.name.as_deref();

        let field_type = match raw.field_type.as_deref() {
            None => {
                self.error(
                    ValidationError::new(Kind::MissingField, location.clone(), "field is missing 'type'")
                        .with_entity(entity)
                        .with_field(field_ref),
                );
                None
            }
            Some(type_name) => {
                let parsed = FieldType::from_name(type_name);
                if parsed.is_none() {
                    self.error(
                        ValidationError::new(
                            Kind::InvalidValue,
                            format!("{}.type", location),
                            format!(
                                "unsupported field type '{}' (expected one of: {})",
                                type_name,
                                FieldType::ALL.map(|t| t.as_str()).join(", ")
                            ),
                        )
                        .with_entity(entity)
                        .with_field(field_ref),
                    );
                }
                parsed
            }
        }?;

        self.rules(&raw.validation, field_type, &location, entity, field_ref);
        self.default_value(raw, field_type, &location, entity, field_ref);

        Some(FieldConfig {
            title: raw.title.clone().unwrap_or_else(|| to_title_case(&name)),
            name,
            field_type,
            required: raw.required,
            unique: raw.unique,
            default_value: raw.default_value.clone(),
            validation: raw.validation.clone(),
            description: raw.description.clone(),
        })
    }

    fn rules(
        &mut self,
        rules: &ValidationRules,
        field_type: FieldType,
        location: &str,
        entity: Option<&str>,
        field: Option<&str>,
    ) {
        let invalid = |message: String| {
            ValidationError::new(Kind::InvalidRule, format!("{}.validation", location), message)
                .with_entity(entity)
                .with_field(field)
        };

        if field_type == FieldType::Enum && rules.choices.is_empty() {
            let err = invalid("enum field must declare a non-empty 'choices' list".to_string());
            self.error(err);
        }
        if let (Some(min), Some(max)) = (rules.min_length, rules.max_length) {
            if min > max {
                let err = invalid(format!("min_length {} exceeds max_length {}", min, max));
                self.error(err);
            }
        }
        if let (Some(min), Some(max)) = (rules.min, rules.max) {
            if min > max {
                let err = invalid(format!("min {} exceeds max {}", min, max));
                self.error(err);
            }
        }
        if let Some(ref pattern) = rules.pattern {
            if let Err(e) = Regex::new(pattern) {
                let err = invalid(format!("pattern '{}' is not a valid regular expression: {}", pattern, e));
                self.error(err);
            }
        }
    }

    fn default_value(
        &mut self,
        raw: &RawField,
        field_type: FieldType,
        location: &str,
        entity: Option<&str>,
        field: Option<&str>,
    ) {
        let Some(ref value) = raw.default_value else {
            return;
        };

        let problem = match field_type {
            FieldType::Boolean if !value.is_boolean() => Some("a boolean".to_string()),
            FieldType::Integer if !(value.is_i64() || value.is_u64()) => Some("an integer".to_string()),
            FieldType::Float | FieldType::Decimal if !value.is_number() => Some("a number".to_string()),
            FieldType::Enum => match value.as_str() {
                Some(choice) if raw.validation.choices.iter().any(|c| c == choice) => None,
                // An empty choice list is already reported by the rule checks
                _ if raw.validation.choices.is_empty() => None,
                _ => Some(format!("one of: {}", raw.validation.choices.join(", "))),
            },
            _ => None,
        };

        if let Some(expected) = problem {
            self.error(
                ValidationError::new(
                    Kind::InvalidValue,
                    format!("{}.default", location),
                    format!("default value {} must be {}", value, expected),
                )
                .with_entity(entity)
                .with_field(field),
            );
        }
    }

    fn relationship(
        &mut self,
        raw: &RawRelationship,
        index: usize,
        declared: &Declared<'_>,
        keys: &mut HashSet<(String, String)>,
    ) -> Option<RelationshipConfig> {
        let location = located("relationships", raw.name.as_deref(), index);
        let source_ref = raw.source_entity.as_deref();
        let name = self.name(raw.name.as_deref(), &location, "relationship", source_ref);

        let kind = match raw.kind.as_deref() {
            None => {
                self.error(
                    ValidationError::new(Kind::MissingField, location.clone(), "relationship is missing 'type'")
                        .with_entity(source_ref),
                );
                None
            }
            Some(kind) => {
                let parsed = RelationshipKind::from_name(kind);
                if parsed.is_none() {
                    self.error(
                        ValidationError::new(
                            Kind::InvalidValue,
                            format!("{}.type", location),
                            format!(
                                "relationship type '{}' must be one of: one_to_one, one_to_many, many_to_one, many_to_many",
                                kind
                            ),
                        )
                        .with_entity(source_ref),
                    );
                }
                parsed
            }
        };

        let source = self.entity_reference(raw.source_entity.as_deref(), &location, "source_entity", declared);
        let target = self.entity_reference(raw.target_entity.as_deref(), &location, "target_entity", declared);

        if let Some(ref fk) = raw.foreign_key {
            if !is_valid_name(fk) {
                self.error(
                    ValidationError::new(
                        Kind::InvalidPattern,
                        format!("{}.foreign_key", location),
                        format!("foreign key '{}' must match ^[a-z][a-z0-9_]*$", fk),
                    )
                    .with_entity(source_ref),
                );
            }
        }

        if let (Some(source_entity), Some(rel_name)) = (source, raw.name.as_deref()) {
            let key = (source_entity.name.clone().unwrap_or_default(), rel_name.to_string());
            if !keys.insert(key) {
                self.error(
                    ValidationError::new(
                        Kind::DuplicateName,
                        location.clone(),
                        format!("relationship '{}' is declared more than once on this entity", rel_name),
                    )
                    .with_entity(source_ref),
                );
            } else if declared.has_field(source_entity, rel_name) {
                self.error(
                    ValidationError::new(
                        Kind::DuplicateName,
                        location.clone(),
                        format!("relationship '{}' collides with a field of the same name", rel_name),
                    )
                    .with_entity(source_ref)
                    .with_field(Some(rel_name)),
                );
            }
        }

        let (kind, source, target) = (kind?, source?, target?);
        let source_name = source.name.clone().unwrap_or_default();
        let target_name = target.name.clone().unwrap_or_default();

        if source_name == target_name {
            self.warn(
                location,
                format!("relationship '{}' on '{}' references its own entity", name, source_name),
            );
        }

        let foreign_key = raw.foreign_key.clone().unwrap_or_else(|| match kind {
            RelationshipKind::ManyToOne | RelationshipKind::OneToOne => format!("{}_id", name),
            RelationshipKind::OneToMany | RelationshipKind::ManyToMany => format!("{}_id", source_name),
        });

        Some(RelationshipConfig {
            name,
            kind,
            source_entity: source_name,
            target_entity: target_name,
            foreign_key,
            cascade_delete: raw.cascade_delete,
        })
    }

    /// Two relationships may only share a key column when one is the inverse
    /// of the other: same holder table, same referenced entity, declared from
    /// opposite ends.
    fn foreign_key_collisions(&mut self, relationships: &[RelationshipConfig]) {
        // (holder, column) -> [(relationship, referenced, declared on holder)]
        let mut columns: HashMap<(&str, &str), Vec<(&str, &str, bool)>> = HashMap::new();
        for rel in relationships {
            let (holder, referenced) = match rel.kind {
                RelationshipKind::ManyToOne | RelationshipKind::OneToOne => (&rel.source_entity, &rel.target_entity),
                RelationshipKind::OneToMany => (&rel.target_entity, &rel.source_entity),
                RelationshipKind::ManyToMany => continue,
            };
            let on_holder = rel.kind != RelationshipKind::OneToMany;
            let users = columns.entry((holder.as_str(), rel.foreign_key.as_str())).or_default();
            let clash = users
                .iter()
                .find(|(_, other_referenced, other_on_holder)| {
                    *other_referenced != referenced.as_str() || *other_on_holder == on_holder
                })
                .map(|(other, _, _)| *other);
            match clash {
                Some(other) => self.error(
                    ValidationError::new(
                        Kind::ForeignKeyConflict,
                        format!("relationships[{}].foreign_key", rel.name),
                        format!(
                            "foreign key column '{}' on '{}' is already used by relationship '{}'; set a distinct foreign_key",
                            rel.foreign_key, holder, other
                        ),
                    )
                    .with_entity(Some(holder.as_str()))
                    .with_field(Some(rel.foreign_key.as_str())),
                ),
                None => users.push((rel.name.as_str(), referenced.as_str(), on_holder)),
            }
        }
    }

    /// Resolve an entity reference, reporting a missing key or undeclared entity
    fn entity_reference<'d>(
        &mut self,
        value: Option<&str>,
        location: &str,
        key: &str,
        declared: &Declared<'d>,
    ) -> Option<&'d RawEntity> {
        let Some(name) = value else {
            self.error(ValidationError::new(
                Kind::MissingField,
                location,
                format!("missing '{}'", key),
            ));
            return None;
        };

        let entity = declared.entity(name);
        if entity.is_none() {
            self.error(
                ValidationError::new(
                    Kind::UnknownReference,
                    format!("{}.{}", location, key),
                    format!("entity '{}' is not declared", name),
                )
                .with_entity(Some(name)),
            );
        }
        entity
    }

    fn navigation_item(
        &mut self,
        raw: &RawNavigationItem,
        index: usize,
        declared: &Declared<'_>,
    ) -> Option<NavigationItem> {
        let location = located("navigation", raw.label.as_deref().or(raw.entity.as_deref()), index);
        let entity = self.entity_reference(raw.entity.as_deref(), &location, "entity", declared)?;
        let entity_name = entity.name.clone().unwrap_or_default();

        let label = raw
            .label
            .clone()
            .or_else(|| entity.display_name.clone())
            .unwrap_or_else(|| to_title_case(&pluralize(&entity_name)));
        let table = entity.table_name.clone().unwrap_or_else(|| pluralize(&entity_name));

        Some(NavigationItem {
            label,
            path: raw.path.clone().unwrap_or_else(|| format!("/{}", table)),
            icon: raw.icon.clone(),
            entity: entity_name,
        })
    }

    fn metric(
        &mut self,
        raw: &RawDashboardMetric,
        index: usize,
        declared: &Declared<'_>,
    ) -> Option<DashboardMetric> {
        let location = located("dashboard_metrics", raw.name.as_deref(), index);
        let name = self.name(raw.name.as_deref(), &location, "dashboard metric", raw.entity.as_deref());

        let aggregation = match raw.aggregation.as_deref() {
            None => {
                self.error(ValidationError::new(
                    Kind::MissingField,
                    location.clone(),
                    "dashboard metric is missing 'aggregation'",
                ));
                None
            }
            Some(agg) => {
                let parsed = Aggregation::from_name(agg);
                if parsed.is_none() {
                    self.error(ValidationError::new(
                        Kind::InvalidValue,
                        format!("{}.aggregation", location),
                        format!("aggregation '{}' must be one of: count, sum, avg, min, max", agg),
                    ));
                }
                parsed
            }
        };

        let entity = self.entity_reference(raw.entity.as_deref(), &location, "entity", declared);

        if let (Some(entity), Some(aggregation)) = (entity, aggregation) {
            let entity_name = entity.name.as_deref();
            match raw.field.as_deref() {
                None if aggregation.requires_field() => {
                    self.error(
                        ValidationError::new(
                            Kind::MissingField,
                            location.clone(),
                            format!("'{}' aggregation requires a 'field'", aggregation.as_str()),
                        )
                        .with_entity(entity_name),
                    );
                }
                Some(field) if !declared.has_field(entity, field) => {
                    self.error(
                        ValidationError::new(
                            Kind::UnknownReference,
                            format!("{}.field", location),
                            format!(
                                "aggregation field '{}' is not a field of entity '{}'",
                                field,
                                entity_name.unwrap_or_default()
                            ),
                        )
                        .with_entity(entity_name)
                        .with_field(Some(field)),
                    );
                }
                _ => {}
            }
        }

        let (aggregation, entity) = (aggregation?, entity?);
        Some(DashboardMetric {
            title: raw.title.clone().unwrap_or_else(|| to_title_case(&name)),
            name,
            entity: entity.name.clone().unwrap_or_default(),
            aggregation,
            field: raw.field.clone(),
        })
    }

    fn workflow(&mut self, raw: &RawWorkflow, index: usize, declared: &Declared<'_>) -> Option<WorkflowConfig> {
        let location = located("workflows", raw.name.as_deref(), index);
        let name = self.name(raw.name.as_deref(), &location, "workflow", raw.entity.as_deref());
        let entity = self.entity_reference(raw.entity.as_deref(), &location, "entity", declared);

        let field = match raw.field.as_deref() {
            None => {
                self.error(ValidationError::new(
                    Kind::MissingField,
                    location.clone(),
                    "workflow is missing 'field'",
                ));
                None
            }
            Some(field) => {
                if let Some(entity) = entity {
                    if !declared.has_field(entity, field) {
                        self.error(
                            ValidationError::new(
                                Kind::UnknownReference,
                                format!("{}.field", location),
                                format!(
                                    "status field '{}' is not a field of entity '{}'",
                                    field,
                                    entity.name.as_deref().unwrap_or_default()
                                ),
                            )
                            .with_entity(entity.name.as_deref())
                            .with_field(Some(field)),
                        );
                    }
                }
                Some(field.to_string())
            }
        };

        if raw.states.is_empty() {
            self.error(ValidationError::new(
                Kind::InvalidRule,
                format!("{}.states", location),
                "workflow must declare at least one state",
            ));
        }

        let mut transitions = Vec::with_capacity(raw.transitions.len());
        for (t_index, transition) in raw.transitions.iter().enumerate() {
            let t_location = located(&format!("{}.transitions", location), transition.name.as_deref(), t_index);
            let mut endpoint = |key: &str, value: Option<&String>| -> Option<String> {
                match value {
                    None => {
                        self.error(ValidationError::new(
                            Kind::MissingField,
                            t_location.clone(),
                            format!("transition is missing '{}'", key),
                        ));
                        None
                    }
                    Some(state) if !raw.states.contains(state) => {
                        self.error(ValidationError::new(
                            Kind::UnknownReference,
                            format!("{}.{}", t_location, key),
                            format!("state '{}' is not declared by the workflow", state),
                        ));
                        None
                    }
                    Some(state) => Some(state.clone()),
                }
            };
            let from = endpoint("from", transition.from.as_ref());
            let to = endpoint("to", transition.to.as_ref());
            if let (Some(from), Some(to)) = (from, to) {
                transitions.push(WorkflowTransition {
                    name: transition.name.clone().unwrap_or_else(|| format!("{}_to_{}", from, to)),
                    from,
                    to,
                });
            }
        }

        Some(WorkflowConfig {
            name,
            entity: entity?.name.clone().unwrap_or_default(),
            field: field?,
            states: raw.states.clone(),
            transitions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> RawDomainConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    const VALID: &str = r#"
name: taskboard
version: 1.2.0
entities:
  - name: project
    fields:
      - { name: id, type: integer }
      - { name: name, type: string, required: true }
  - name: task
    display_field: title
    fields:
      - { name: id, type: integer }
      - { name: title, type: string, required: true, validation: { max_length: 200 } }
      - name: status
        type: enum
        default: todo
        validation: { choices: [todo, doing, done] }
relationships:
  - { name: project, type: many_to_one, source_entity: task, target_entity: project }
navigation:
  - { label: Tasks, entity: task }
dashboard_metrics:
  - { name: open_tasks, entity: task, aggregation: count }
workflows:
  - name: task_flow
    entity: task
    field: status
    states: [todo, doing, done]
    transitions:
      - { from: todo, to: doing }
      - { from: doing, to: done }
"#;

    #[test]
    fn test_valid_config_has_no_errors() {
        let report = check(&parse(VALID));
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        let config = report.config.unwrap();
        assert_eq!(config.title, "Taskboard");
        assert_eq!(config.entities[1].table_name, "tasks");
        assert_eq!(config.relationships[0].foreign_key, "project_id");
        assert_eq!(config.navigation[0].path, "/tasks");
        assert_eq!(config.workflows[0].transitions[0].name, "todo_to_doing");
    }

    fn single_error(yaml: &str) -> ValidationError {
        let errors = validate(&parse(yaml)).unwrap_err();
        assert_eq!(errors.len(), 1, "expected exactly one error, got {:?}", errors);
        errors.into_iter().next().unwrap()
    }

    #[test]
    fn test_unknown_relationship_target_is_one_error() {
        let yaml = VALID.replace("target_entity: project", "target_entity: sprint");
        let err = single_error(&yaml);
        assert_eq!(err.kind, Kind::UnknownReference);
        assert!(err.message.contains("sprint"));
    }

    #[test]
    fn test_unsupported_field_type_cites_field() {
        let yaml = VALID.replace("{ name: name, type: string", "{ name: name, type: unsupported_type");
        let err = single_error(&yaml);
        assert_eq!(err.kind, Kind::InvalidValue);
        assert_eq!(err.entity.as_deref(), Some("project"));
        assert_eq!(err.field.as_deref(), Some("name"));
        assert!(err.message.contains("unsupported_type"));
    }

    #[test]
    fn test_bad_version_and_name_are_both_reported() {
        let yaml = VALID.replace("name: taskboard", "name: Task-Board").replace("1.2.0", "\"1.2\"");
        let errors = validate(&parse(&yaml)).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.kind == Kind::InvalidPattern));
    }

    #[test]
    fn test_duplicate_field_is_one_error() {
        let yaml = VALID.replace("{ name: name, type: string", "{ name: id, type: string");
        let err = single_error(&yaml);
        assert_eq!(err.kind, Kind::DuplicateName);
    }

    #[test]
    fn test_entity_without_fields() {
        let yaml = r#"
name: empty
version: 0.1.0
entities:
  - name: ghost
"#;
        let err = single_error(yaml);
        assert_eq!(err.kind, Kind::EmptyEntity);
    }

    #[test]
    fn test_metric_with_unknown_entity_does_not_cascade() {
        let yaml = VALID.replace(
            "{ name: open_tasks, entity: task, aggregation: count }",
            "{ name: open_tasks, entity: ticket, aggregation: sum, field: points }",
        );
        let err = single_error(&yaml);
        assert_eq!(err.kind, Kind::UnknownReference);
    }

    #[test]
    fn test_metric_field_must_exist() {
        let yaml = VALID.replace(
            "{ name: open_tasks, entity: task, aggregation: count }",
            "{ name: open_tasks, entity: task, aggregation: sum, field: points }",
        );
        let err = single_error(&yaml);
        assert_eq!(err.field.as_deref(), Some("points"));
    }

    #[test]
    fn test_enum_default_must_be_a_choice() {
        let yaml = VALID.replace("default: todo", "default: blocked");
        let err = single_error(&yaml);
        assert_eq!(err.kind, Kind::InvalidValue);
    }

    #[test]
    fn test_invalid_pattern_rule() {
        let yaml = VALID.replace("validation: { max_length: 200 }", "validation: { pattern: \"[a-\" }");
        let err = single_error(&yaml);
        assert_eq!(err.kind, Kind::InvalidRule);
    }

    #[test]
    fn test_workflow_transition_to_unknown_state() {
        let yaml = VALID.replace("{ from: doing, to: done }", "{ from: doing, to: archived }");
        let err = single_error(&yaml);
        assert!(err.message.contains("archived"));
    }

    fn with_relationships(extra: &str) -> String {
        let head = VALID.split("navigation:").next().unwrap().replace(
            "  - name: task\n",
            "  - name: user\n    fields:\n      - { name: email, type: email }\n  - name: task\n",
        );
        format!("{}{}", head, extra)
    }

    #[test]
    fn test_default_foreign_key_follows_relationship_name() {
        let yaml = with_relationships(
            "  - { name: assignee, type: many_to_one, source_entity: task, target_entity: user }\n  - { name: reporter, type: many_to_one, source_entity: task, target_entity: user }\n",
        );
        let report = check(&parse(&yaml));
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        let keys: Vec<_> = report
            .config
            .unwrap()
            .relationships
            .iter()
            .map(|r| r.foreign_key.clone())
            .collect();
        assert_eq!(keys, vec!["project_id", "assignee_id", "reporter_id"]);
    }

    #[test]
    fn test_shared_foreign_key_column_is_one_error() {
        let yaml = with_relationships(
            "  - { name: assignee, type: many_to_one, source_entity: task, target_entity: user, foreign_key: user_id }\n  - { name: reporter, type: many_to_one, source_entity: task, target_entity: user, foreign_key: user_id }\n",
        );
        let err = single_error(&yaml);
        assert_eq!(err.kind, Kind::ForeignKeyConflict);
        assert_eq!(err.location, "relationships[reporter].foreign_key");
        assert_eq!(err.entity.as_deref(), Some("task"));
        assert_eq!(err.field.as_deref(), Some("user_id"));
        assert!(err.message.contains("assignee"));
    }

    #[test]
    fn test_inverse_relationship_may_share_its_column() {
        let yaml = with_relationships(
            "  - { name: tasks, type: one_to_many, source_entity: project, target_entity: task, foreign_key: project_id }\n",
        );
        let report = check(&parse(&yaml));
        assert!(report.errors.is_empty(), "{:?}", report.errors);
    }

    #[test]
    fn test_self_reference_is_a_warning() {
        let yaml = format!(
            "{}  - {{ name: parent, type: many_to_one, source_entity: task, target_entity: task, foreign_key: parent_id }}\n",
            VALID.split("navigation:").next().unwrap()
        );
        let report = check(&parse(&yaml));
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].message.contains("own entity"));
    }
}
