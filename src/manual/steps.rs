//! Adaptation manual: ordered steps that carry an application generated
//! from one domain config over to another.
//!
//! Every change in a [`ConfigDiff`] becomes one or more steps, each scoped
//! to a single [`StepCategory`]. Steps are emitted in diff order and then
//! stably sorted by category. Database steps are further ordered by
//! [`MigrationPhase`] so the migration file runs top to bottom: a table
//! exists before any key points at it, and no key points at a table when
//! it is dropped.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use super::effort::{estimate, ChangeKind, Difficulty};
use super::snippets::{SnippetRenderer, Structure};
use crate::codegen::binding::{
    foreign_keys_of, metric_binding, mint_names, EntityBinding, NameTable, NavigationBinding,
};
use crate::codegen::targets::{
    form_path, list_path, model_path, route_path, schema_path, service_path, COMPONENTS_INDEX_PATH,
    DASHBOARD_PATH, NAVIGATION_PATH,
};
use crate::codegen::Generator;
use crate::config::{
    DashboardMetric, DomainConfig, EntityConfig, NavigationItem, RelationshipConfig, RelationshipKind,
};
use crate::diff::{ConfigChange, ConfigDiff, EntityMatch, FieldChange, RelationshipChange};
use crate::error::{TemplateError, TemplateLoadError, TypeRegistryGap};

/// Area of the application a step touches, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCategory {
    Database,
    Model,
    Schema,
    Api,
    Frontend,
    Config,
}

impl StepCategory {
    pub const ALL: [StepCategory; 6] = [
        StepCategory::Database,
        StepCategory::Model,
        StepCategory::Schema,
        StepCategory::Api,
        StepCategory::Frontend,
        StepCategory::Config,
    ];

    pub fn rank(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepCategory::Database => "database",
            StepCategory::Model => "model",
            StepCategory::Schema => "schema",
            StepCategory::Api => "api",
            StepCategory::Frontend => "frontend",
            StepCategory::Config => "config",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            StepCategory::Database => "Database",
            StepCategory::Model => "Models",
            StepCategory::Schema => "Schemas",
            StepCategory::Api => "API",
            StepCategory::Frontend => "Frontend",
            StepCategory::Config => "Configuration",
        }
    }
}

/// Position of a database step within the migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MigrationPhase {
    /// Tables of matched entities take their new names
    Rename,
    /// New tables, referenced tables first
    Create,
    /// Columns, keys and association tables of surviving tables
    Alter,
    /// Keys on surviving tables that point into tables about to be dropped
    Detach,
    /// Dropped tables, referencing tables first
    Drop,
}

/// Edit to one file: what to look for and what to put in its place.
///
/// A missing `old_snippet` means insert, a missing `new_snippet` means
/// delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: String,
    pub old_snippet: Option<String>,
    pub new_snippet: Option<String>,
}

impl FileChange {
    pub fn new(path: impl Into<String>, old_snippet: Option<String>, new_snippet: Option<String>) -> Self {
        let keep = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        Self {
            path: path.into(),
            old_snippet: keep(old_snippet),
            new_snippet: keep(new_snippet),
        }
    }

    pub fn insert(path: impl Into<String>, snippet: String) -> Self {
        Self::new(path, None, Some(snippet))
    }

    pub fn delete(path: impl Into<String>, snippet: String) -> Self {
        Self::new(path, Some(snippet), None)
    }

    pub fn is_empty(&self) -> bool {
        self.old_snippet.is_none() && self.new_snippet.is_none()
    }

    /// Whether applying the change leaves the file as it was
    pub fn is_noop(&self) -> bool {
        self.old_snippet == self.new_snippet
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdaptationStep {
    pub step_number: usize,
    pub category: StepCategory,
    pub title: String,
    pub description: String,
    pub change_kind: ChangeKind,
    /// Entity the step belongs to, named as in the target config when it exists there
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub file_changes: Vec<FileChange>,
    pub estimated_minutes: u32,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdaptationManual {
    pub source_domain: String,
    pub source_version: String,
    pub target_domain: String,
    pub target_version: String,
    pub migration_path: String,
    pub steps: Vec<AdaptationStep>,
    pub warnings: Vec<String>,
    pub total_minutes: u32,
}

impl AdaptationManual {
    /// Step counts for every category that has at least one step
    pub fn category_counts(&self) -> Vec<(StepCategory, usize)> {
        StepCategory::ALL
            .iter()
            .map(|category| (*category, self.steps.iter().filter(|s| s.category == *category).count()))
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    pub fn steps_in(&self, category: StepCategory) -> impl Iterator<Item = &AdaptationStep> {
        self.steps.iter().filter(move |s| s.category == category)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum ManualError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    TemplateLoad(#[from] TemplateLoadError),

    #[error(transparent)]
    TypeRegistryGap(#[from] TypeRegistryGap),

    #[error("diff names entity '{entity}' which the {side} config does not declare")]
    UnknownEntity { entity: String, side: &'static str },

    #[error("relationship '{relationship}' of entity '{entity}' has no foreign key or association table")]
    UnknownRelationship { entity: String, relationship: String },
}

/// Build the manual with the built-in templates and type mappings
///
/// # Arguments
///
/// * `diff` - Diff from `source` to `target`
/// * `source` - Config the existing application was generated from
/// * `target` - Config the application should end up matching
///
/// # Example
///
/// ```ignore
/// use domaingen::config::load_config;
/// use domaingen::diff::{diff, MatchPolicy};
/// use domaingen::manual::{generate_manual, render_markdown};
///
/// let source = load_config("config/examples/taskboard.yaml")?;
/// let target = load_config("config/examples/property_management.yaml")?;
/// let diff = diff(&source, &target, &MatchPolicy::default());
/// let manual = generate_manual(&diff, &source, &target)?;
/// std::fs::write("ADAPTATION.md", render_markdown(&manual))?;
/// ```
pub fn generate_manual(
    diff: &ConfigDiff,
    source: &DomainConfig,
    target: &DomainConfig,
) -> Result<AdaptationManual, ManualError> {
    let generator = Generator::builtin()?;
    generate_manual_with(&generator, diff, source, target)
}

/// Build the manual with a caller-supplied generator, so template
/// overrides apply to snippets and full files alike.
pub fn generate_manual_with(
    generator: &Generator,
    diff: &ConfigDiff,
    source: &DomainConfig,
    target: &DomainConfig,
) -> Result<AdaptationManual, ManualError> {
    let mut builder = ManualBuilder::new(generator, diff, source, target);

    for entity_match in &diff.entity_matches {
        builder.visit_match(entity_match)?;
    }
    for name in dependency_order(&diff.unmatched_target, target) {
        builder.entity_added(&name)?;
    }
    for name in dependency_order(&diff.unmatched_source, source).iter().rev() {
        builder.entity_removed(name)?;
    }
    for change in &diff.config_changes {
        builder.config_change(change)?;
    }

    Ok(builder.finish())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Source,
    Target,
}

impl Side {
    fn label(&self) -> &'static str {
        match self {
            Side::Source => "source",
            Side::Target => "target",
        }
    }
}

struct ManualBuilder<'a> {
    generator: &'a Generator,
    snippets: SnippetRenderer<'a>,
    diff: &'a ConfigDiff,
    source: &'a DomainConfig,
    target: &'a DomainConfig,
    source_names: NameTable,
    target_names: NameTable,
    migration: String,
    steps: Vec<(MigrationPhase, AdaptationStep)>,
}

fn lookup<'c>(config: &'c DomainConfig, name: &str, side: Side) -> Result<&'c EntityConfig, ManualError> {
    config.entity(name).ok_or_else(|| ManualError::UnknownEntity {
        entity: name.to_string(),
        side: side.label(),
    })
}

/// Entities of `names` ordered so each comes after the entities its table
/// references. Cycles are broken at the first entity revisited.
fn dependency_order(names: &[String], config: &DomainConfig) -> Vec<String> {
    fn visit(
        name: &str,
        names: &[String],
        config: &DomainConfig,
        visited: &mut HashSet<String>,
        order: &mut Vec<String>,
    ) {
        if !visited.insert(name.to_string()) {
            return;
        }
        if let Some(entity) = config.entity(name) {
            let mut references: Vec<String> = foreign_keys_of(config, entity)
                .into_iter()
                .map(|fk| fk.referenced_entity)
                .collect();
            references.extend(
                config
                    .relationships_from(name)
                    .filter(|r| r.kind == RelationshipKind::ManyToMany)
                    .map(|r| r.target_entity.clone()),
            );
            for referenced in references {
                if referenced != name && names.contains(&referenced) {
                    visit(&referenced, names, config, visited, order);
                }
            }
        }
        order.push(name.to_string());
    }

    let mut visited = HashSet::new();
    let mut order = Vec::with_capacity(names.len());
    for name in names {
        visit(name, names, config, &mut visited, &mut order);
    }
    order
}

/// `backend/alembic/versions/<domain>_<version>_adaptation.py`
pub fn migration_path(target: &DomainConfig) -> String {
    format!(
        "backend/alembic/versions/{}_{}_adaptation.py",
        target.name,
        target.version.replace('.', "_")
    )
}

impl<'a> ManualBuilder<'a> {
    fn new(generator: &'a Generator, diff: &'a ConfigDiff, source: &'a DomainConfig, target: &'a DomainConfig) -> Self {
        Self {
            generator,
            snippets: SnippetRenderer::new(generator.renderer()),
            diff,
            source,
            target,
            source_names: mint_names(source),
            target_names: mint_names(target),
            migration: migration_path(target),
            steps: Vec::new(),
        }
    }

    fn config(&self, side: Side) -> (&'a DomainConfig, &NameTable) {
        match side {
            Side::Source => (self.source, &self.source_names),
            Side::Target => (self.target, &self.target_names),
        }
    }

    fn bind(&self, side: Side, name: &str) -> Result<EntityBinding, ManualError> {
        let (config, names) = self.config(side);
        let entity = lookup(config, name, side)?;
        Ok(self.generator.bind(config, entity, names)?)
    }

    /// Table a source entity lives in once earlier renames have run
    fn current_table(&self, source_entity: &EntityConfig) -> String {
        self.diff
            .match_for_source(&source_entity.name)
            .map(|m| m.target_table.clone())
            .unwrap_or_else(|| source_entity.table_name.clone())
    }

    /// Whether the target gains `field` on the matched entity `target_entity`
    fn field_added(&self, target_entity: &str, field: &str) -> bool {
        self.diff
            .entity_matches
            .iter()
            .filter(|m| m.target == target_entity)
            .filter_map(|m| self.diff.field_diff(&m.source))
            .flat_map(|d| d.changes.iter())
            .any(|c| matches!(c, FieldChange::Added { name, .. } if name == field))
    }

    /// A new key needs no statement of its own when its table is created
    /// in this migration or its declared column is added with the constraint.
    fn key_arrives_elsewhere(&self, rel: &RelationshipConfig, structure: &Structure) -> bool {
        let Some(owner) = rel.foreign_key_owner() else {
            return false;
        };
        if self.diff.unmatched_target.iter().any(|n| n == owner) {
            return true;
        }
        matches!(structure, Structure::ForeignKey { declared: true, column, .. } if self.field_added(owner, &column.name))
    }

    /// A key leaves with its table when that table is dropped
    fn key_leaves_with_table(&self, rel: &RelationshipConfig) -> bool {
        rel.foreign_key_owner()
            .is_some_and(|owner| self.diff.unmatched_source.iter().any(|n| n == owner))
    }

    fn push(
        &mut self,
        category: StepCategory,
        kind: ChangeKind,
        title: String,
        description: String,
        entity: Option<&str>,
        file_changes: Vec<FileChange>,
    ) {
        self.push_in(MigrationPhase::Alter, category, kind, title, description, entity, file_changes);
    }

    #[allow(clippy::too_many_arguments)]
    fn push_in(
        &mut self,
        phase: MigrationPhase,
        category: StepCategory,
        kind: ChangeKind,
        title: String,
        description: String,
        entity: Option<&str>,
        file_changes: Vec<FileChange>,
    ) {
        let file_changes: Vec<FileChange> = file_changes.into_iter().filter(|c| !c.is_empty()).collect();
        if file_changes.is_empty() {
            tracing::debug!(category = category.as_str(), %title, "skipping step without file changes");
            return;
        }
        let effort = estimate(kind, category);
        self.steps.push((phase, AdaptationStep {
            step_number: 0,
            category,
            title,
            description,
            change_kind: kind,
            entity: entity.map(str::to_string),
            file_changes,
            estimated_minutes: effort.minutes,
            difficulty: effort.difficulty,
        }));
    }

    fn visit_match(&mut self, entity_match: &EntityMatch) -> Result<(), ManualError> {
        let field_changes = self.diff.field_diff(&entity_match.source).map(|d| d.changes.as_slice());
        let relationship_changes = self
            .diff
            .relationship_diff(&entity_match.source)
            .map(|d| d.changes.as_slice());
        let renamed = entity_match.renamed || entity_match.table_renamed;
        if !renamed && field_changes.is_none() && relationship_changes.is_none() {
            return Ok(());
        }

        let before = self.bind(Side::Source, &entity_match.source)?;
        let after = self.bind(Side::Target, &entity_match.target)?;

        if renamed {
            self.entity_renamed(entity_match, &before, &after)?;
        }
        for change in field_changes.unwrap_or_default() {
            self.field_change(change, &before, &after)?;
        }
        for change in relationship_changes.unwrap_or_default() {
            self.relationship_change(change, &before, &after)?;
        }
        Ok(())
    }

    fn entity_renamed(
        &mut self,
        entity_match: &EntityMatch,
        before: &EntityBinding,
        after: &EntityBinding,
    ) -> Result<(), ManualError> {
        let (old, new) = (&before.names, &after.names);
        let entity = Some(entity_match.target.as_str());

        let mut database = Vec::new();
        if entity_match.table_renamed {
            database.push(FileChange::insert(
                &self.migration,
                self.snippets
                    .rename_table(&entity_match.source_table, &entity_match.target_table)?,
            ));
        }
        database.push(FileChange::new(
            model_path(new),
            Some(self.snippets.model_class(old)?),
            Some(self.snippets.model_class(new)?),
        ));
        let mut description = format!(
            "`{}` becomes `{}` (match score {:.2}).",
            entity_match.source, entity_match.target, entity_match.score
        );
        if model_path(old) != model_path(new) {
            description.push_str(&format!(
                " Move `{}` to `{}` and update imports of the model.",
                model_path(old),
                model_path(new)
            ));
        }
        if entity_match.table_renamed {
            description.push_str(&format!(
                " The table `{}` is renamed to `{}`.",
                entity_match.source_table, entity_match.target_table
            ));
        }
        self.push_in(
            MigrationPhase::Rename,
            StepCategory::Database,
            ChangeKind::EntityRenamed,
            format!("Rename {} to {}", old.class_name, new.class_name),
            description,
            entity,
            database,
        );

        self.push(
            StepCategory::Api,
            ChangeKind::EntityRenamed,
            format!("Rename the {} routes and service", old.display_name),
            format!(
                "Move `{}` to `{}` and `{}` to `{}`, then update the router prefix and the service class.",
                route_path(old),
                route_path(new),
                service_path(old),
                service_path(new)
            ),
            entity,
            vec![FileChange::new(
                route_path(new),
                Some(self.snippets.route_prefix(old)?),
                Some(self.snippets.route_prefix(new)?),
            )],
        );

        self.push(
            StepCategory::Frontend,
            ChangeKind::EntityRenamed,
            format!("Rename the {} components", old.display_name),
            format!(
                "Rename `{}` and `{}` to `{}` and `{}`.",
                old.component_form, old.component_list, new.component_form, new.component_list
            ),
            entity,
            vec![FileChange::new(
                COMPONENTS_INDEX_PATH,
                Some(self.snippets.component_names(old)?),
                Some(self.snippets.component_names(new)?),
            )],
        );
        Ok(())
    }

    fn field_change(
        &mut self,
        change: &FieldChange,
        before: &EntityBinding,
        after: &EntityBinding,
    ) -> Result<(), ManualError> {
        let snippets = &self.snippets;
        let table = after.entity.table.as_str();
        let class = after.names.class_name.as_str();
        let old_column = change.source_name().and_then(|n| before.column(n));
        let new_column = change.target_name().and_then(|n| after.column(n));
        let old_field = change.source_name().and_then(|n| before.field(n));
        let new_field = change.target_name().and_then(|n| after.field(n));

        let (kind, title, summary, migration) = match change {
            FieldChange::Added { name, field_type } => (
                ChangeKind::FieldAdded,
                format!("Add field `{}` to {}", name, class),
                format!("New {} field `{}`.", field_type, name),
                new_column.map(|c| snippets.add_column(table, c)).transpose()?,
            ),
            FieldChange::Removed { name, field_type } => (
                ChangeKind::FieldRemoved,
                format!("Remove field `{}` from {}", name, class),
                format!("The {} field `{}` no longer exists; its data is dropped.", field_type, name),
                Some(snippets.drop_column(table, name)?),
            ),
            FieldChange::Renamed {
                from,
                to,
                score,
                from_type,
                to_type,
            } => {
                let mut statements = vec![snippets.rename_column(table, from, to)?];
                if from_type != to_type {
                    if let (Some(old), Some(new)) = (old_column, new_column) {
                        statements.push(snippets.alter_type(table, old, new)?);
                    }
                }
                let mut summary = format!("`{}` is now `{}` (similarity {:.2}).", from, to, score);
                if from_type != to_type {
                    summary.push_str(&format!(" Its type changes from {} to {}.", from_type, to_type));
                }
                (
                    ChangeKind::FieldRenamed,
                    format!("Rename field `{}` to `{}` on {}", from, to, class),
                    summary,
                    Some(statements.join("\n")),
                )
            }
            FieldChange::TypeChanged { name, from, to } => (
                ChangeKind::FieldTypeChanged,
                format!("Change the type of `{}` on {}", name, class),
                format!(
                    "`{}` changes from {} to {}; check existing rows convert cleanly.",
                    name, from, to
                ),
                match (old_column, new_column) {
                    (Some(old), Some(new)) => Some(snippets.alter_type(table, old, new)?),
                    _ => None,
                },
            ),
            FieldChange::ConstraintChanged { name, required, unique } => {
                let mut parts = Vec::new();
                if let Some((was, now)) = required {
                    parts.push(format!("required {} -> {}", was, now));
                }
                if let Some((was, now)) = unique {
                    parts.push(format!("unique {} -> {}", was, now));
                }
                (
                    ChangeKind::FieldConstraintChanged,
                    format!("Update constraints of `{}` on {}", name, class),
                    format!("`{}`: {}.", name, parts.join(", ")),
                    match (old_column, new_column) {
                        (Some(old), Some(new)) => Some(snippets.alter_constraints(table, old, new)?),
                        _ => None,
                    },
                )
            }
        };

        let model = vec![
            FileChange::new(&self.migration, None, migration),
            FileChange::new(
                model_path(&after.names),
                old_column.map(|c| snippets.model_column(c)).transpose()?,
                new_column.map(|c| snippets.model_column(c)).transpose()?,
            ),
        ];
        let schema = vec![FileChange::new(
            schema_path(&after.names),
            old_field.map(|f| snippets.schema_field(f)).transpose()?,
            new_field.map(|f| snippets.schema_field(f)).transpose()?,
        )];
        let frontend = vec![FileChange::new(
            form_path(&after.names),
            old_field.map(|f| snippets.ui_input(f)).transpose()?,
            new_field.map(|f| snippets.ui_input(f)).transpose()?,
        )];

        let entity = Some(after.names.entity.as_str());
        self.push(
            StepCategory::Model,
            kind,
            title.clone(),
            format!("{} Update the model column and add the migration.", summary),
            entity,
            model,
        );
        self.push(
            StepCategory::Schema,
            kind,
            title.clone(),
            format!("{} Update the Pydantic schemas.", summary),
            entity,
            schema,
        );
        self.push(
            StepCategory::Frontend,
            kind,
            title,
            format!("{} Update the form input.", summary),
            entity,
            frontend,
        );
        Ok(())
    }

    /// Foreign key column or association table behind a relationship
    fn structure(&self, side: Side, rel: &RelationshipConfig) -> Result<Structure, ManualError> {
        let (config, _) = self.config(side);
        let missing = || ManualError::UnknownRelationship {
            entity: rel.source_entity.clone(),
            relationship: rel.name.clone(),
        };

        let Some(owner) = rel.foreign_key_owner() else {
            let binding = self.bind(side, &rel.source_entity)?;
            return binding
                .association(&rel.name)
                .cloned()
                .map(Structure::Association)
                .ok_or_else(missing);
        };

        let owner_entity = lookup(config, owner, side)?;
        let referenced_name = if owner == rel.source_entity.as_str() {
            &rel.target_entity
        } else {
            &rel.source_entity
        };
        let referenced = lookup(config, referenced_name, side)?;
        let binding = self.bind(side, owner)?;
        let column = binding.column(&rel.foreign_key).cloned().ok_or_else(missing)?;

        let (table, referent_table) = match side {
            Side::Source => (self.current_table(owner_entity), self.current_table(referenced)),
            Side::Target => (owner_entity.table_name.clone(), referenced.table_name.clone()),
        };
        Ok(Structure::ForeignKey {
            table,
            column,
            referent_table,
            referent_column: referenced.primary_key.clone(),
            declared: owner_entity.has_field(&rel.foreign_key),
        })
    }

    fn relationship_change(
        &mut self,
        change: &RelationshipChange,
        before: &EntityBinding,
        after: &EntityBinding,
    ) -> Result<(), ManualError> {
        let class = after.names.class_name.clone();
        let (kind, title, summary) = match change {
            RelationshipChange::Added { relationship } => (
                ChangeKind::RelationshipAdded,
                format!("Add relationship `{}` to {}", relationship.name, class),
                format!(
                    "New {} relationship `{}` to {}.",
                    relationship.kind.as_str(),
                    relationship.name,
                    relationship.target_entity
                ),
            ),
            RelationshipChange::Removed { relationship } => (
                ChangeKind::RelationshipRemoved,
                format!("Remove relationship `{}` from {}", relationship.name, class),
                format!(
                    "The {} relationship `{}` to {} no longer exists.",
                    relationship.kind.as_str(),
                    relationship.name,
                    relationship.target_entity
                ),
            ),
            RelationshipChange::Retargeted { before, after } => (
                ChangeKind::RelationshipRetargeted,
                format!("Point `{}` on {} at {}", after.name, class, after.target_entity),
                format!(
                    "`{}` referenced {} and now references {}; existing references must be remapped.",
                    after.name, before.target_entity, after.target_entity
                ),
            ),
            RelationshipChange::CardinalityChanged { before, after } => (
                ChangeKind::RelationshipCardinalityChanged,
                format!("Change cardinality of `{}` on {}", after.name, class),
                format!(
                    "`{}` changes from {} to {}; existing rows must be migrated to the new shape.",
                    after.name,
                    before.kind.as_str(),
                    after.kind.as_str()
                ),
            ),
            RelationshipChange::Renamed { before, after } => (
                ChangeKind::RelationshipRenamed,
                format!("Rename relationship `{}` to `{}` on {}", before.name, after.name, class),
                format!("`{}` is now `{}`.", before.name, after.name),
            ),
        };

        let snippets = &self.snippets;
        let old = change.before().and_then(|r| before.relationship(&r.name));
        let new = change.after().and_then(|r| after.relationship(&r.name));
        let model = vec![FileChange::new(
            model_path(&after.names),
            old.map(|r| snippets.relationship(r)).transpose()?,
            new.map(|r| snippets.relationship(r)).transpose()?,
        )];

        let statements = match change {
            RelationshipChange::Added { relationship } => {
                let structure = self.structure(Side::Target, relationship)?;
                if self.key_arrives_elsewhere(relationship, &structure) {
                    Vec::new()
                } else {
                    vec![snippets.create_structure(&structure)?]
                }
            }
            RelationshipChange::Removed { relationship } if self.key_leaves_with_table(relationship) => Vec::new(),
            RelationshipChange::Removed { relationship } => {
                vec![snippets.drop_structure(&self.structure(Side::Source, relationship)?)?]
            }
            RelationshipChange::Retargeted { before, after } | RelationshipChange::CardinalityChanged { before, after } => {
                let old = self.structure(Side::Source, before)?;
                let new = self.structure(Side::Target, after)?;
                if old == new {
                    Vec::new()
                } else {
                    vec![snippets.drop_structure(&old)?, snippets.create_structure(&new)?]
                }
            }
            RelationshipChange::Renamed { before, after } => {
                match (self.structure(Side::Source, before)?, self.structure(Side::Target, after)?) {
                    (Structure::Association(old), Structure::Association(new)) if old.name != new.name => {
                        vec![snippets.rename_table(&old.name, &new.name)?]
                    }
                    // declared key columns are renamed by their field change
                    (
                        Structure::ForeignKey {
                            table,
                            column: old,
                            declared: false,
                            ..
                        },
                        Structure::ForeignKey { column: new, .. },
                    ) if old.name != new.name => vec![snippets.rename_column(&table, &old.name, &new.name)?],
                    _ => Vec::new(),
                }
            }
        };

        let entity = Some(after.names.entity.as_str());
        self.push(
            StepCategory::Model,
            kind,
            title.clone(),
            format!("{} Update the relationship on the model.", summary),
            entity,
            model,
        );
        if !statements.is_empty() {
            self.push(
                StepCategory::Database,
                kind,
                title,
                format!("{} Migrate the foreign key or association table.", summary),
                entity,
                vec![FileChange::insert(&self.migration, statements.join("\n"))],
            );
        }
        Ok(())
    }

    fn entity_added(&mut self, name: &str) -> Result<(), ManualError> {
        let binding = self.bind(Side::Target, name)?;
        let renderer = self.generator.renderer();
        let full = |template: &str| renderer.render(template, &binding);
        let names = &binding.names;
        let entity = Some(name);

        let database = vec![
            FileChange::insert(&self.migration, self.snippets.create_table(&binding)?),
            FileChange::insert(model_path(names), full("model.py")?),
        ];
        let schema = vec![FileChange::insert(schema_path(names), full("schema.py")?)];
        let api = vec![
            FileChange::insert(service_path(names), full("service.py")?),
            FileChange::insert(route_path(names), full("route.py")?),
        ];
        let frontend = vec![
            FileChange::insert(form_path(names), full("ui/form.tsx")?),
            FileChange::insert(list_path(names), full("ui/list.tsx")?),
            FileChange::insert(COMPONENTS_INDEX_PATH, self.snippets.component_names(names)?),
        ];

        let class = names.class_name.clone();
        let table = names.table.clone();
        self.push_in(
            MigrationPhase::Create,
            StepCategory::Database,
            ChangeKind::EntityAdded,
            format!("Create the {} model and table", class),
            format!("Add the `{}` model and create the `{}` table.", class, table),
            entity,
            database,
        );
        self.push(
            StepCategory::Schema,
            ChangeKind::EntityAdded,
            format!("Add {} schemas", class),
            format!("Add the create, update and read schemas for `{}`.", class),
            entity,
            schema,
        );
        self.push(
            StepCategory::Api,
            ChangeKind::EntityAdded,
            format!("Add the {} service and routes", class),
            "Add the service and CRUD routes, then include the router in `app/api/router.py`.".to_string(),
            entity,
            api,
        );
        self.push(
            StepCategory::Frontend,
            ChangeKind::EntityAdded,
            format!("Add the {} components", class),
            format!("Add the form and list components for `{}` and export them.", class),
            entity,
            frontend,
        );
        self.attach_keys(name)
    }

    /// Key columns a new entity's one-to-many relationships put on
    /// surviving tables
    fn attach_keys(&mut self, name: &str) -> Result<(), ManualError> {
        let target = self.target;
        let class = self.target_names.get(name).map(|n| n.class_name.clone()).unwrap_or_default();
        for rel in target
            .relationships_from(name)
            .filter(|r| r.kind == RelationshipKind::OneToMany && r.target_entity != name)
        {
            let structure = self.structure(Side::Target, rel)?;
            if self.key_arrives_elsewhere(rel, &structure) {
                continue;
            }
            let statement = self.snippets.create_structure(&structure)?;
            self.push(
                StepCategory::Database,
                ChangeKind::RelationshipAdded,
                format!("Add the `{}` key for {}", rel.foreign_key, class),
                format!(
                    "`{}` on {} gains `{}`, referencing the new `{}` table.",
                    rel.name, rel.target_entity, rel.foreign_key, class
                ),
                Some(rel.target_entity.as_str()),
                vec![FileChange::insert(&self.migration, statement)],
            );
        }
        Ok(())
    }

    /// Key columns a removed entity's one-to-many relationships left on
    /// surviving tables; they go before the removed table does
    fn detach_keys(&mut self, name: &str) -> Result<(), ManualError> {
        let source = self.source;
        let class = self.source_names.get(name).map(|n| n.class_name.clone()).unwrap_or_default();
        for rel in source
            .relationships_from(name)
            .filter(|r| r.kind == RelationshipKind::OneToMany && r.target_entity != name)
        {
            if self.key_leaves_with_table(rel) {
                continue;
            }
            let statement = self.snippets.drop_structure(&self.structure(Side::Source, rel)?)?;
            let entity = self
                .diff
                .mapped_name(&rel.target_entity)
                .unwrap_or(rel.target_entity.as_str())
                .to_string();
            self.push_in(
                MigrationPhase::Detach,
                StepCategory::Database,
                ChangeKind::RelationshipRemoved,
                format!("Drop the `{}` key to {}", rel.foreign_key, class),
                format!(
                    "`{}` no longer references `{}`; drop the key before the table goes.",
                    rel.foreign_key, class
                ),
                Some(entity.as_str()),
                vec![FileChange::insert(&self.migration, statement)],
            );
        }
        Ok(())
    }

    fn entity_removed(&mut self, name: &str) -> Result<(), ManualError> {
        let binding = self.bind(Side::Source, name)?;
        let renderer = self.generator.renderer();
        let full = |template: &str| renderer.render(template, &binding);
        let names = &binding.names;
        let entity = Some(name);

        let mut statements = Vec::new();
        for association in &binding.association_tables {
            statements.push(self.snippets.drop_table(&association.name)?);
        }
        let table = match self.source.entity(name) {
            Some(source_entity) => self.current_table(source_entity),
            None => names.table.clone(),
        };
        statements.push(self.snippets.drop_table(&table)?);

        let database = vec![
            FileChange::insert(&self.migration, statements.join("\n")),
            FileChange::delete(model_path(names), full("model.py")?),
            FileChange::delete(schema_path(names), full("schema.py")?),
        ];
        let api = vec![
            FileChange::delete(service_path(names), full("service.py")?),
            FileChange::delete(route_path(names), full("route.py")?),
        ];
        let frontend = vec![
            FileChange::delete(form_path(names), full("ui/form.tsx")?),
            FileChange::delete(list_path(names), full("ui/list.tsx")?),
            FileChange::delete(COMPONENTS_INDEX_PATH, self.snippets.component_names(names)?),
        ];

        let class = names.class_name.clone();
        self.detach_keys(name)?;
        self.push_in(
            MigrationPhase::Drop,
            StepCategory::Database,
            ChangeKind::EntityRemoved,
            format!("Drop the {} model and table", class),
            format!(
                "Delete the `{}` model and schemas and drop `{}`. Back up the data first if it is still needed.",
                class, table
            ),
            entity,
            database,
        );
        self.push(
            StepCategory::Api,
            ChangeKind::EntityRemoved,
            format!("Remove the {} service and routes", class),
            "Delete the service and routes, then remove the router from `app/api/router.py`.".to_string(),
            entity,
            api,
        );
        self.push(
            StepCategory::Frontend,
            ChangeKind::EntityRemoved,
            format!("Remove the {} components", class),
            "Delete the form and list components and their exports.".to_string(),
            entity,
            frontend,
        );
        Ok(())
    }

    fn nav_snippet(&self, item: &NavigationItem, side: Side) -> Result<String, ManualError> {
        let (_, names) = self.config(side);
        let names = names.get(&item.entity).ok_or_else(|| ManualError::UnknownEntity {
            entity: item.entity.clone(),
            side: side.label(),
        })?;
        Ok(self.snippets.nav_item(&NavigationBinding::of(item, names))?)
    }

    fn metric_snippet(&self, metric: &DashboardMetric, side: Side) -> Result<String, ManualError> {
        let (_, names) = self.config(side);
        let names = names.get(&metric.entity).ok_or_else(|| ManualError::UnknownEntity {
            entity: metric.entity.clone(),
            side: side.label(),
        })?;
        Ok(self.snippets.dashboard_metric(&metric_binding(metric, names))?)
    }

    fn config_change(&mut self, change: &ConfigChange) -> Result<(), ManualError> {
        let (kind, title, entity, file_change) = match change {
            ConfigChange::NavigationAdded { item } => (
                ChangeKind::NavigationChanged,
                format!("Add navigation item \"{}\"", item.label),
                &item.entity,
                FileChange::insert(NAVIGATION_PATH, self.nav_snippet(item, Side::Target)?),
            ),
            ConfigChange::NavigationRemoved { item } => (
                ChangeKind::NavigationChanged,
                format!("Remove navigation item \"{}\"", item.label),
                &item.entity,
                FileChange::delete(NAVIGATION_PATH, self.nav_snippet(item, Side::Source)?),
            ),
            ConfigChange::NavigationChanged { before, after } => (
                ChangeKind::NavigationChanged,
                format!("Update navigation item \"{}\"", after.label),
                &after.entity,
                FileChange::new(
                    NAVIGATION_PATH,
                    Some(self.nav_snippet(before, Side::Source)?),
                    Some(self.nav_snippet(after, Side::Target)?),
                ),
            ),
            ConfigChange::MetricAdded { metric } => (
                ChangeKind::MetricChanged,
                format!("Add dashboard metric `{}`", metric.name),
                &metric.entity,
                FileChange::insert(DASHBOARD_PATH, self.metric_snippet(metric, Side::Target)?),
            ),
            ConfigChange::MetricRemoved { metric } => (
                ChangeKind::MetricChanged,
                format!("Remove dashboard metric `{}`", metric.name),
                &metric.entity,
                FileChange::delete(DASHBOARD_PATH, self.metric_snippet(metric, Side::Source)?),
            ),
            ConfigChange::MetricChanged { before, after } => (
                ChangeKind::MetricChanged,
                format!("Update dashboard metric `{}`", after.name),
                &after.entity,
                FileChange::new(
                    DASHBOARD_PATH,
                    Some(self.metric_snippet(before, Side::Source)?),
                    Some(self.metric_snippet(after, Side::Target)?),
                ),
            ),
        };
        if file_change.is_noop() {
            return Ok(());
        }
        let description = if change.is_navigation() {
            format!("Edit the navigation entries in `{}`.", NAVIGATION_PATH)
        } else {
            format!("Edit the dashboard metrics in `{}`.", DASHBOARD_PATH)
        };
        let entity = entity.clone();
        self.push(StepCategory::Config, kind, title, description, Some(entity.as_str()), vec![file_change]);
        Ok(())
    }

    fn finish(mut self) -> AdaptationManual {
        self.steps.sort_by_key(|(phase, step)| (step.category.rank(), *phase));
        let steps: Vec<AdaptationStep> = self
            .steps
            .into_iter()
            .enumerate()
            .map(|(index, (_, mut step))| {
                step.step_number = index + 1;
                step
            })
            .collect();
        let total_minutes = steps.iter().map(|s| s.estimated_minutes).sum();
        tracing::info!(
            source = %self.diff.source_domain,
            target = %self.diff.target_domain,
            steps = steps.len(),
            total_minutes,
            "adaptation manual built"
        );

        AdaptationManual {
            source_domain: self.diff.source_domain.clone(),
            source_version: self.diff.source_version.clone(),
            target_domain: self.diff.target_domain.clone(),
            target_version: self.diff.target_version.clone(),
            migration_path: self.migration,
            steps,
            warnings: self.diff.warnings.iter().map(ToString::to_string).collect(),
            total_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::from_yaml_str;
    use crate::diff::{diff, MatchPolicy};

    fn source() -> DomainConfig {
        from_yaml_str(
            r#"
name: taskboard
version: 1.0.0
entities:
  - name: project
    fields:
      - { name: name, type: string, required: true }
  - name: task
    fields:
      - { name: title, type: string, required: true }
      - { name: points, type: integer }
relationships:
  - { name: project, type: many_to_one, source_entity: task, target_entity: project }
navigation:
  - { label: Tasks, entity: task }
"#,
        )
        .unwrap()
    }

    fn target() -> DomainConfig {
        from_yaml_str(
            r#"
name: taskboard
version: 1.1.0
entities:
  - name: project
    fields:
      - { name: name, type: string, required: true }
  - name: task
    fields:
      - { name: title, type: string, required: true }
      - { name: points, type: integer }
      - { name: due_on, type: date }
  - name: label
    fields:
      - { name: name, type: string, required: true }
relationships:
  - { name: project, type: many_to_one, source_entity: task, target_entity: project }
navigation:
  - { label: Tasks, entity: task }
  - { label: Labels, entity: label }
"#,
        )
        .unwrap()
    }

    fn manual() -> AdaptationManual {
        let (source, target) = (source(), target());
        let diff = diff(&source, &target, &MatchPolicy::default());
        generate_manual(&diff, &source, &target).unwrap()
    }

    #[test]
    fn test_identical_configs_need_no_steps() {
        let config = source();
        let diff = diff(&config, &config, &MatchPolicy::default());
        let manual = generate_manual(&diff, &config, &config).unwrap();
        assert!(manual.is_empty());
        assert_eq!(manual.total_minutes, 0);
    }

    #[test]
    fn test_steps_are_ordered_and_numbered() {
        let manual = manual();
        let ranks: Vec<u8> = manual.steps.iter().map(|s| s.category.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort();
        assert_eq!(ranks, sorted);

        let numbers: Vec<usize> = manual.steps.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, (1..=manual.steps.len()).collect::<Vec<_>>());
        assert_eq!(
            manual.total_minutes,
            manual.steps.iter().map(|s| s.estimated_minutes).sum::<u32>()
        );
    }

    #[test]
    fn test_added_field_emits_model_schema_and_frontend_steps() {
        let manual = manual();
        let field_steps: Vec<&AdaptationStep> = manual
            .steps
            .iter()
            .filter(|s| s.change_kind == ChangeKind::FieldAdded)
            .collect();
        let categories: Vec<StepCategory> = field_steps.iter().map(|s| s.category).collect();
        assert_eq!(
            categories,
            vec![StepCategory::Model, StepCategory::Schema, StepCategory::Frontend]
        );

        let model = field_steps[0];
        assert_eq!(model.file_changes[0].path, "backend/alembic/versions/taskboard_1_1_0_adaptation.py");
        assert_eq!(
            model.file_changes[0].new_snippet.as_deref(),
            Some("op.add_column(\"tasks\", sa.Column(\"due_on\", sa.Date(), nullable=True))")
        );
        assert_eq!(model.file_changes[1].path, "backend/app/models/task.py");
        assert_eq!(model.file_changes[1].old_snippet, None);
        assert_eq!(
            model.file_changes[1].new_snippet.as_deref(),
            Some("due_on = Column(Date, nullable=True)")
        );
    }

    #[test]
    fn test_added_entity_carries_full_files() {
        let manual = manual();
        let added: Vec<&AdaptationStep> = manual
            .steps
            .iter()
            .filter(|s| s.change_kind == ChangeKind::EntityAdded)
            .collect();
        let categories: Vec<StepCategory> = added.iter().map(|s| s.category).collect();
        assert_eq!(
            categories,
            vec![
                StepCategory::Database,
                StepCategory::Schema,
                StepCategory::Api,
                StepCategory::Frontend
            ]
        );
        let model = added[0]
            .file_changes
            .iter()
            .find(|c| c.path == "backend/app/models/label.py")
            .unwrap();
        assert!(model.new_snippet.as_deref().unwrap().contains("class Label(Base):"));
        assert!(added[0].file_changes[0]
            .new_snippet
            .as_deref()
            .unwrap()
            .starts_with("op.create_table("));
    }

    #[test]
    fn test_navigation_addition_is_a_config_step() {
        let manual = manual();
        let last = manual.steps.last().unwrap();
        assert_eq!(last.category, StepCategory::Config);
        assert_eq!(last.file_changes[0].path, NAVIGATION_PATH);
        assert!(last.file_changes[0].new_snippet.as_deref().unwrap().contains("Labels"));
    }

    #[test]
    fn test_removed_entity_drops_table() {
        let (source, target) = (target(), source());
        let diff = diff(&source, &target, &MatchPolicy::default());
        let manual = generate_manual(&diff, &source, &target).unwrap();
        let database = manual
            .steps
            .iter()
            .find(|s| s.change_kind == ChangeKind::EntityRemoved && s.category == StepCategory::Database)
            .unwrap();
        assert_eq!(
            database.file_changes[0].new_snippet.as_deref(),
            Some("op.drop_table(\"labels\")")
        );
        assert!(database.file_changes[1].new_snippet.is_none());
        assert_eq!(
            manual
                .steps
                .iter()
                .filter(|s| s.change_kind == ChangeKind::EntityRemoved)
                .count(),
            3
        );
    }

    fn with(config: &str, extra_entities: &str, extra_relationships: &str) -> DomainConfig {
        let yaml = config
            .replace("relationships:\n", &format!("{}relationships:\n{}", extra_entities, extra_relationships));
        from_yaml_str(&yaml).unwrap()
    }

    const BASE: &str = r#"
name: taskboard
version: 1.0.0
entities:
  - name: project
    fields:
      - { name: name, type: string, required: true }
  - name: task
    fields:
      - { name: title, type: string, required: true }
relationships:
  - { name: project, type: many_to_one, source_entity: task, target_entity: project }
"#;

    const BOARD: &str = "  - name: board\n    fields:\n      - { name: motto, type: text }\n";

    /// Step holding the first migration statement that contains `needle`
    fn migration_step(manual: &AdaptationManual, needle: &str) -> usize {
        manual
            .steps
            .iter()
            .find(|s| {
                s.file_changes
                    .iter()
                    .any(|c| c.path == manual.migration_path && c.new_snippet.as_deref().is_some_and(|n| n.contains(needle)))
            })
            .map(|s| s.step_number)
            .unwrap_or_else(|| panic!("no migration statement contains {:?}", needle))
    }

    fn manual_between(source: &DomainConfig, target: &DomainConfig) -> AdaptationManual {
        let diff = diff(source, target, &MatchPolicy::default());
        generate_manual(&diff, source, target).unwrap()
    }

    #[test]
    fn test_new_table_is_created_before_keys_point_at_it() {
        let source = with(BASE, "", "");
        let target = with(
            BASE,
            "  - name: label\n    fields:\n      - { name: caption, type: string }\n",
            "  - { name: label, type: many_to_one, source_entity: task, target_entity: label }\n",
        );
        let manual = manual_between(&source, &target);

        let create = migration_step(&manual, "op.create_table(\n    \"labels\"");
        let key = migration_step(&manual, "op.create_foreign_key(\"fk_tasks_label_id\", \"tasks\", \"labels\"");
        assert!(create < key, "labels created in step {} but referenced in step {}", create, key);
    }

    #[test]
    fn test_new_one_to_many_adds_key_to_surviving_table() {
        let source = with(BASE, "", "");
        let target = with(
            BASE,
            BOARD,
            "  - { name: tasks, type: one_to_many, source_entity: board, target_entity: task }\n",
        );
        let manual = manual_between(&source, &target);

        let create = migration_step(&manual, "op.create_table(\n    \"boards\"");
        let column = migration_step(&manual, "op.add_column(\"tasks\", sa.Column(\"board_id\"");
        let key = migration_step(&manual, "op.create_foreign_key(\"fk_tasks_board_id\", \"tasks\", \"boards\"");
        assert!(create < column);
        assert_eq!(column, key);
    }

    #[test]
    fn test_keys_into_removed_table_are_dropped_first() {
        let source = with(
            BASE,
            BOARD,
            "  - { name: tasks, type: one_to_many, source_entity: board, target_entity: task }\n",
        );
        let target = with(BASE, "", "");
        let manual = manual_between(&source, &target);

        let detach = migration_step(&manual, "op.drop_constraint(\"fk_tasks_board_id\", \"tasks\", type_=\"foreignkey\")");
        let drop = migration_step(&manual, "op.drop_table(\"boards\")");
        assert!(detach < drop);
        let step = &manual.steps[detach - 1];
        assert_eq!(step.category, StepCategory::Database);
        assert_eq!(step.entity.as_deref(), Some("task"));
        assert!(step.file_changes[0]
            .new_snippet
            .as_deref()
            .unwrap()
            .contains("op.drop_column(\"tasks\", \"board_id\")"));
    }

    #[test]
    fn test_tables_are_created_in_reference_order() {
        let source = with(BASE, "", "");
        // sprint is declared after the board that references it
        let target = with(
            BASE,
            "  - name: board\n    fields:\n      - { name: motto, type: text }\n  - name: sprint\n    fields:\n      - { name: goal, type: text }\n",
            "  - { name: sprint, type: many_to_one, source_entity: board, target_entity: sprint }\n",
        );
        let manual = manual_between(&source, &target);

        let sprints = migration_step(&manual, "op.create_table(\n    \"sprints\"");
        let boards = migration_step(&manual, "op.create_table(\n    \"boards\"");
        assert!(sprints < boards);

        let reversed = manual_between(&target, &source);
        let drop_boards = migration_step(&reversed, "op.drop_table(\"boards\")");
        let drop_sprints = migration_step(&reversed, "op.drop_table(\"sprints\")");
        assert!(drop_boards < drop_sprints);
    }

    #[test]
    fn test_file_change_drops_blank_snippets() {
        let change = FileChange::new("a.py", Some("  \n".to_string()), None);
        assert!(change.is_empty());
    }
}
