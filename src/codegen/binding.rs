//! Template bindings: the data each template is rendered against.
//!
//! Identifiers are minted once per entity ([`EntityNames`]) and shared by
//! every stage, so the model class a route imports is the class the model
//! stage emitted. Relationship targets and foreign keys are resolved from
//! the config itself, never from previously emitted artifacts.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::Serialize;

use super::type_registry::{MappingTarget, TargetTypeDescriptor, TypeMappingRegistry};
use super::utils::*;
use crate::config::*;
use crate::error::TypeRegistryGap;

/// Identifiers derived from an entity name, shared across stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityNames {
    pub entity: String,
    /// `WorkOrder`
    pub class_name: String,
    /// `work_order`
    pub module_name: String,
    pub table: String,
    pub display_name: String,
    pub display_plural: String,
    pub base_schema: String,
    pub create_schema: String,
    pub update_schema: String,
    pub read_schema: String,
    pub service_class: String,
    pub service_module: String,
    pub route_module: String,
    /// `/work-orders`
    pub route_prefix: String,
    pub route_tag: String,
    /// `work_order_id`
    pub id_param: String,
    /// `/{work_order_id}`
    pub item_path: String,
    pub api_path: String,
    pub component_form: String,
    pub component_list: String,
    pub form_values: String,
    pub ts_interface: String,
}

impl EntityNames {
    pub fn mint(entity: &EntityConfig) -> Self {
        let class_name = to_pascal_case(&entity.name);
        let module_name = to_snake_case(&entity.name);
        let display_plural = pluralize(&entity.display_name);
        let route_prefix = format!("/{}", entity.table_name.replace('_', "-"));
        let id_param = format!("{}_id", module_name);

        Self {
            entity: entity.name.clone(),
            base_schema: format!("{}Base", class_name),
            create_schema: format!("{}Create", class_name),
            update_schema: format!("{}Update", class_name),
            read_schema: format!("{}Read", class_name),
            service_class: format!("{}Service", class_name),
            service_module: format!("{}_service", module_name),
            route_module: entity.table_name.clone(),
            api_path: format!("/api{}", route_prefix),
            item_path: format!("/{{{}}}", id_param),
            component_form: format!("{}Form", class_name),
            component_list: format!("{}List", class_name),
            form_values: format!("{}FormValues", class_name),
            ts_interface: class_name.clone(),
            route_tag: display_plural.clone(),
            table: entity.table_name.clone(),
            display_name: entity.display_name.clone(),
            display_plural,
            route_prefix,
            id_param,
            class_name,
            module_name,
        }
    }
}

/// Minted identifiers for every entity, in declaration order
pub type NameTable = IndexMap<String, EntityNames>;

pub fn mint_names(config: &DomainConfig) -> NameTable {
    config
        .entities
        .iter()
        .map(|e| (e.name.clone(), EntityNames::mint(e)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainSummary {
    pub name: String,
    pub title: String,
    pub version: String,
}

impl DomainSummary {
    fn of(config: &DomainConfig) -> Self {
        Self {
            name: config.name.clone(),
            title: escape_python_string(&config.title),
            version: config.version.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySummary {
    pub name: String,
    pub display_name: String,
    pub display_plural: String,
    pub table: String,
    pub primary_key: String,
    pub pk_py_type: String,
    pub pk_ts_type: String,
    pub timestamps: bool,
    pub display_field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One SQLAlchemy column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnBinding {
    pub name: String,
    /// `String(200)`
    pub type_expr: String,
    /// `sa.String(200)`, for migrations
    pub sa_type: String,
    /// `projects.id`
    pub foreign_key: Option<String>,
    pub ondelete: Option<String>,
    pub primary_key: bool,
    pub nullable: bool,
    pub unique: bool,
    pub index: bool,
    /// Python literal
    pub default: Option<String>,
}

/// One field as seen by schemas and UI components
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldBinding {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub unique: bool,
    /// `str`, `Literal["a", "b"]`
    pub py_type: String,
    /// `str | None` unless required
    pub annotation: String,
    /// Python literal; `None` for required fields without a default
    pub default: Option<String>,
    /// Pydantic `Field(...)` keyword arguments
    pub constraints: Vec<String>,
    pub ts_type: String,
    pub widget: String,
    pub choices: Vec<String>,
    /// Extra JSX attributes, each with a leading space
    pub input_attrs: String,
    /// Column added for a relationship rather than declared by the config
    pub implicit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipBinding {
    pub name: String,
    pub kind: RelationshipKind,
    pub target_class: String,
    pub target_module: String,
    pub secondary: Option<String>,
    pub foreign_keys: Option<String>,
    pub remote_side: Option<String>,
    pub cascade: Option<String>,
}

/// Association table backing a many-to-many relationship
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationBinding {
    pub name: String,
    pub relationship: String,
    pub source_column: String,
    pub source_type: String,
    pub source_sa_type: String,
    pub source_ref: String,
    pub target_column: String,
    pub target_type: String,
    pub target_sa_type: String,
    pub target_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListColumn {
    pub name: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniqueLookup {
    pub name: String,
    pub py_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricBinding {
    pub name: String,
    pub title: String,
    pub entity: String,
    pub aggregation: String,
    pub field: Option<String>,
    pub endpoint: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateBinding {
    pub name: String,
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowBinding {
    pub name: String,
    pub field: String,
    pub constant: String,
    pub method: String,
    pub states: Vec<StateBinding>,
}

/// Foreign key column held by an entity's table
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyRef {
    pub column: String,
    /// `projects.id`
    pub references: String,
    pub referenced_entity: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub field_type: FieldType,
    pub ondelete: Option<&'static str>,
    pub unique: bool,
}

/// Type of an entity's primary key; undeclared keys are integers
pub fn primary_key_type(entity: &EntityConfig) -> FieldType {
    entity
        .field(&entity.primary_key)
        .map(|f| f.field_type)
        .unwrap_or(FieldType::Integer)
}

/// Foreign key columns that live on `entity`'s table, first declaration wins
pub fn foreign_keys_of(config: &DomainConfig, entity: &EntityConfig) -> Vec<ForeignKeyRef> {
    let mut keys: Vec<ForeignKeyRef> = Vec::new();
    for rel in &config.relationships {
        let (holder, referenced) = match rel.kind {
            RelationshipKind::ManyToOne | RelationshipKind::OneToOne => (&rel.source_entity, &rel.target_entity),
            RelationshipKind::OneToMany => (&rel.target_entity, &rel.source_entity),
            RelationshipKind::ManyToMany => continue,
        };
        if *holder != entity.name || keys.iter().any(|k| k.column == rel.foreign_key) {
            continue;
        }
        let Some(referenced) = config.entity(referenced) else {
            continue;
        };
        keys.push(ForeignKeyRef {
            column: rel.foreign_key.clone(),
            references: format!("{}.{}", referenced.table_name, referenced.primary_key),
            referenced_entity: referenced.name.clone(),
            referenced_table: referenced.table_name.clone(),
            referenced_column: referenced.primary_key.clone(),
            field_type: primary_key_type(referenced),
            ondelete: rel.cascade_delete.then_some("CASCADE"),
            unique: rel.kind == RelationshipKind::OneToOne,
        });
    }
    keys
}

/// Association table name for a many-to-many relationship
pub fn association_table_name(rel: &RelationshipConfig) -> String {
    format!("{}_{}", rel.source_entity, rel.name)
}

fn sa_expression(type_expr: &str) -> String {
    if type_expr.contains('(') {
        format!("sa.{}", type_expr)
    } else {
        format!("sa.{}()", type_expr)
    }
}

fn sized_expression(descriptor: &TargetTypeDescriptor, max_length: Option<u32>) -> String {
    let length = descriptor.default_length.and(max_length);
    descriptor.expression(length)
}

fn format_bound(value: f64) -> String {
    format!("{}", value)
}

/// Resolve the SQLAlchemy column for a field
pub fn column_binding(
    registry: &TypeMappingRegistry,
    entity: &str,
    field: &FieldConfig,
    foreign_key: Option<&ForeignKeyRef>,
    primary_key: bool,
) -> Result<ColumnBinding, TypeRegistryGap> {
    let descriptor = registry
        .map_type(field.field_type, MappingTarget::Column)
        .map_err(|gap| gap.at(entity, &field.name))?;
    let type_expr = sized_expression(descriptor, field.validation.max_length);

    Ok(ColumnBinding {
        name: field.name.clone(),
        sa_type: sa_expression(&type_expr),
        type_expr,
        foreign_key: foreign_key.map(|fk| fk.references.clone()),
        ondelete: foreign_key.and_then(|fk| fk.ondelete).map(str::to_string),
        primary_key,
        nullable: !field.required && !primary_key,
        unique: !primary_key && (field.unique || foreign_key.map(|fk| fk.unique).unwrap_or(false)),
        index: !primary_key && foreign_key.is_some(),
        default: field.default_value.as_ref().map(python_literal),
    })
}

/// Resolve the schema and UI view of a field
pub fn field_binding(
    registry: &TypeMappingRegistry,
    entity: &str,
    field: &FieldConfig,
    implicit: bool,
) -> Result<FieldBinding, TypeRegistryGap> {
    let gap = |gap: TypeRegistryGap| gap.at(entity, &field.name);
    let schema = registry.map_type(field.field_type, MappingTarget::Schema).map_err(gap)?;
    let widget = registry.map_type(field.field_type, MappingTarget::Widget).map_err(gap)?;
    let typescript = registry
        .map_type(field.field_type, MappingTarget::TypeScript)
        .map_err(gap)?;

    let rules = &field.validation;
    let quoted = |quote: fn(&str) -> String| -> Vec<String> {
        rules.choices.iter().map(|c| format!("\"{}\"", quote(c))).collect()
    };

    let (py_type, ts_type) = if field.field_type == FieldType::Enum {
        (
            format!("Literal[{}]", quoted(escape_python_string).join(", ")),
            quoted(escape_ts_string).join(" | "),
        )
    } else {
        (schema.name.to_string(), typescript.name.to_string())
    };

    let annotation = if field.required {
        py_type.clone()
    } else {
        format!("{} | None", py_type)
    };

    let default = match (&field.default_value, field.required) {
        (Some(value), _) => Some(python_literal(value)),
        (None, false) => Some("None".to_string()),
        (None, true) => None,
    };

    let mut constraints = Vec::new();
    let mut attrs: Vec<String> = Vec::new();
    if field.required && widget.name != "checkbox" {
        attrs.push("required".to_string());
    }
    if matches!(field.field_type, FieldType::String | FieldType::Text) {
        if let Some(min) = rules.min_length {
            constraints.push(format!("min_length={}", min));
            attrs.push(format!("minLength={{{}}}", min));
        }
        if let Some(max) = rules.max_length {
            constraints.push(format!("max_length={}", max));
            attrs.push(format!("maxLength={{{}}}", max));
        }
        if let Some(ref pattern) = rules.pattern {
            constraints.push(format!("pattern=\"{}\"", escape_python_string(pattern)));
            attrs.push(format!("pattern={{\"{}\"}}", escape_ts_string(pattern)));
        }
    }
    if field.field_type.is_numeric() {
        if let Some(min) = rules.min {
            constraints.push(format!("ge={}", format_bound(min)));
            attrs.push(format!("min={{{}}}", format_bound(min)));
        }
        if let Some(max) = rules.max {
            constraints.push(format!("le={}", format_bound(max)));
            attrs.push(format!("max={{{}}}", format_bound(max)));
        }
        if field.field_type != FieldType::Integer {
            attrs.push("step=\"any\"".to_string());
        }
    }

    let input_attrs: String = attrs.iter().map(|attr| format!(" {}", attr)).collect();

    Ok(FieldBinding {
        name: field.name.clone(),
        label: escape_ts_string(&field.title),
        field_type: field.field_type,
        required: field.required,
        unique: field.unique,
        py_type,
        annotation,
        default,
        constraints,
        ts_type,
        widget: widget.name.to_string(),
        choices: rules.choices.iter().map(|c| escape_ts_string(c)).collect(),
        input_attrs,
        implicit,
    })
}

/// Field synthesized for a foreign key the config does not declare
fn implicit_field(fk: &ForeignKeyRef) -> FieldConfig {
    FieldConfig {
        name: fk.column.clone(),
        title: to_title_case(&fk.column),
        field_type: fk.field_type,
        required: false,
        unique: fk.unique,
        default_value: None,
        validation: ValidationRules::default(),
        description: None,
    }
}

/// Everything an entity-level template can reference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityBinding {
    pub domain: DomainSummary,
    pub entity: EntitySummary,
    pub names: EntityNames,
    /// Primary key, declared fields, then implicit foreign keys
    pub columns: Vec<ColumnBinding>,
    /// Non-key fields and implicit foreign keys
    pub fields: Vec<FieldBinding>,
    pub list_fields: Vec<ListColumn>,
    pub relationships: Vec<RelationshipBinding>,
    pub association_tables: Vec<AssociationBinding>,
    pub column_imports: Vec<String>,
    pub schema_imports: Vec<String>,
    pub pydantic_import: String,
    pub unique_fields: Vec<UniqueLookup>,
    pub metrics: Vec<MetricBinding>,
    pub workflows: Vec<WorkflowBinding>,
}

impl EntityBinding {
    /// Bind `entity` of `config` for rendering
    ///
    /// # Arguments
    ///
    /// * `config` - The validated domain config the entity belongs to
    /// * `entity` - The entity to bind
    /// * `names` - Identifiers minted for every entity of `config`
    /// * `registry` - Type mappings for columns, schemas and widgets
    pub fn build(
        config: &DomainConfig,
        entity: &EntityConfig,
        names: &NameTable,
        registry: &TypeMappingRegistry,
    ) -> Result<Self, TypeRegistryGap> {
        let own_names = names
            .get(&entity.name)
            .cloned()
            .unwrap_or_else(|| EntityNames::mint(entity));
        let name_of = |entity_name: &str| -> EntityNames {
            names.get(entity_name).cloned().unwrap_or_else(|| {
                config
                    .entity(entity_name)
                    .map(EntityNames::mint)
                    .unwrap_or_else(|| own_names.clone())
            })
        };

        let foreign_keys = foreign_keys_of(config, entity);
        let fk_for = |column: &str| foreign_keys.iter().find(|fk| fk.column == column);

        // Primary key first, declared or not
        let pk_type = primary_key_type(entity);
        let pk_field = entity.field(&entity.primary_key).cloned().unwrap_or_else(|| FieldConfig {
            name: entity.primary_key.clone(),
            title: to_title_case(&entity.primary_key),
            field_type: pk_type,
            required: true,
            unique: false,
            default_value: None,
            validation: ValidationRules::default(),
            description: None,
        });
        let mut columns = vec![column_binding(registry, &entity.name, &pk_field, None, true)?];
        let mut fields = Vec::new();

        for field in entity.fields.iter().filter(|f| f.name != entity.primary_key) {
            columns.push(column_binding(registry, &entity.name, field, fk_for(&field.name), false)?);
            fields.push(field_binding(registry, &entity.name, field, false)?);
        }
        for fk in foreign_keys.iter().filter(|fk| !entity.has_field(&fk.column)) {
            let field = implicit_field(fk);
            columns.push(column_binding(registry, &entity.name, &field, Some(fk), false)?);
            fields.push(field_binding(registry, &entity.name, &field, true)?);
        }

        let mut relationships = Vec::new();
        let mut association_tables = Vec::new();
        for rel in config.relationships_from(&entity.name) {
            let Some(target) = config.entity(&rel.target_entity) else {
                continue;
            };
            let target_names = name_of(&target.name);
            let mut binding = RelationshipBinding {
                name: rel.name.clone(),
                kind: rel.kind,
                target_class: target_names.class_name.clone(),
                target_module: target_names.module_name.clone(),
                secondary: None,
                foreign_keys: None,
                remote_side: None,
                cascade: None,
            };
            match rel.kind {
                RelationshipKind::ManyToOne | RelationshipKind::OneToOne => {
                    binding.foreign_keys = Some(format!("[{}]", rel.foreign_key));
                    if rel.is_self_reference() {
                        binding.remote_side = Some(format!("[{}]", entity.primary_key));
                    }
                }
                RelationshipKind::OneToMany => {
                    binding.foreign_keys = Some(format!("\"{}.{}\"", target_names.class_name, rel.foreign_key));
                    if rel.cascade_delete {
                        binding.cascade = Some("all, delete-orphan".to_string());
                    }
                }
                RelationshipKind::ManyToMany => {
                    let association = association_binding(registry, entity, target, rel)?;
                    binding.secondary = Some(association.name.clone());
                    association_tables.push(association);
                }
            }
            relationships.push(binding);
        }

        let mut column_imports = BTreeSet::from(["Column".to_string()]);
        for column in &columns {
            column_imports.insert(type_name(&column.type_expr));
            if column.foreign_key.is_some() {
                column_imports.insert("ForeignKey".to_string());
            }
        }
        for association in &association_tables {
            column_imports.extend(["Table".to_string(), "ForeignKey".to_string()]);
            column_imports.insert(type_name(&association.source_type));
            column_imports.insert(type_name(&association.target_type));
        }
        if entity.timestamps {
            column_imports.insert("DateTime".to_string());
        }

        let (schema_imports, pydantic_import) = schema_imports(registry, entity, pk_type, &fields)?;

        let schema_pk = registry
            .map_type(pk_type, MappingTarget::Schema)
            .map_err(|gap| gap.at(&entity.name, &entity.primary_key))?;
        let ts_pk = registry
            .map_type(pk_type, MappingTarget::TypeScript)
            .map_err(|gap| gap.at(&entity.name, &entity.primary_key))?;

        let unique_fields = fields
            .iter()
            .filter(|f| f.unique && !f.implicit)
            .map(|f| UniqueLookup {
                name: f.name.clone(),
                py_type: f.py_type.clone(),
            })
            .collect();

        let metrics = config
            .dashboard_metrics
            .iter()
            .filter(|m| m.entity == entity.name)
            .map(|m| metric_binding(m, &own_names))
            .collect();

        let workflows = config
            .workflows
            .iter()
            .filter(|w| w.entity == entity.name)
            .map(workflow_binding)
            .collect();

        Ok(Self {
            domain: DomainSummary::of(config),
            entity: EntitySummary {
                name: entity.name.clone(),
                display_name: escape_python_string(&entity.display_name),
                display_plural: escape_python_string(&own_names.display_plural),
                table: entity.table_name.clone(),
                primary_key: entity.primary_key.clone(),
                pk_py_type: schema_pk.name.to_string(),
                pk_ts_type: ts_pk.name.to_string(),
                timestamps: entity.timestamps,
                display_field: entity.display_field_name().to_string(),
                description: entity.description.as_deref().map(escape_python_string),
            },
            list_fields: list_columns(entity),
            names: own_names,
            columns,
            fields,
            relationships,
            association_tables,
            column_imports: column_imports.into_iter().collect(),
            schema_imports,
            pydantic_import,
            unique_fields,
            metrics,
            workflows,
        })
    }

    pub fn column(&self, name: &str) -> Option<&ColumnBinding> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldBinding> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipBinding> {
        self.relationships.iter().find(|r| r.name == name)
    }

    pub fn association(&self, relationship: &str) -> Option<&AssociationBinding> {
        self.association_tables.iter().find(|a| a.relationship == relationship)
    }
}

/// `String(200)` -> `String`
fn type_name(type_expr: &str) -> String {
    type_expr.split('(').next().unwrap_or(type_expr).to_string()
}

fn association_binding(
    registry: &TypeMappingRegistry,
    source: &EntityConfig,
    target: &EntityConfig,
    rel: &RelationshipConfig,
) -> Result<AssociationBinding, TypeRegistryGap> {
    let key_type = |entity: &EntityConfig| -> Result<String, TypeRegistryGap> {
        let field_type = primary_key_type(entity);
        let descriptor = registry
            .map_type(field_type, MappingTarget::Column)
            .map_err(|gap| gap.at(&entity.name, &entity.primary_key))?;
        let length = entity.field(&entity.primary_key).and_then(|f| f.validation.max_length);
        Ok(sized_expression(descriptor, length))
    };

    let source_type = key_type(source)?;
    let target_type = key_type(target)?;
    let mut target_column = format!("{}_id", target.name);
    if target_column == rel.foreign_key {
        target_column = format!("related_{}", target_column);
    }

    Ok(AssociationBinding {
        name: association_table_name(rel),
        relationship: rel.name.clone(),
        source_column: rel.foreign_key.clone(),
        source_sa_type: sa_expression(&source_type),
        source_type,
        source_ref: format!("{}.{}", source.table_name, source.primary_key),
        target_column,
        target_sa_type: sa_expression(&target_type),
        target_type,
        target_ref: format!("{}.{}", target.table_name, target.primary_key),
    })
}

fn schema_imports(
    registry: &TypeMappingRegistry,
    entity: &EntityConfig,
    pk_type: FieldType,
    fields: &[FieldBinding],
) -> Result<(Vec<String>, String), TypeRegistryGap> {
    let types = fields.iter().map(|f| f.field_type).chain([pk_type]);
    let mut modules: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (module, name) in registry.schema_imports(types)? {
        modules.entry(module).or_default().insert(name);
    }
    if entity.timestamps {
        modules.entry("datetime").or_default().insert("datetime");
    }
    if fields.iter().any(|f| f.field_type == FieldType::Enum) {
        modules.entry("typing").or_default().insert("Literal");
    }

    let mut pydantic = modules.remove("pydantic").unwrap_or_default();
    pydantic.extend(["BaseModel", "ConfigDict"]);
    if fields.iter().any(|f| !f.constraints.is_empty()) {
        pydantic.insert("Field");
    }

    let lines = modules
        .into_iter()
        .map(|(module, names)| format!("from {} import {}", module, names.into_iter().collect::<Vec<_>>().join(", ")))
        .collect();
    let pydantic = format!(
        "from pydantic import {}",
        pydantic.into_iter().collect::<Vec<_>>().join(", ")
    );
    Ok((lines, pydantic))
}

/// Up to five columns for list views, display field first
fn list_columns(entity: &EntityConfig) -> Vec<ListColumn> {
    let display = entity.display_field_name();
    let mut columns: Vec<&FieldConfig> = entity.field(display).into_iter().collect();
    columns.extend(entity.fields.iter().filter(|f| {
        f.name != display
            && !matches!(
                f.field_type,
                FieldType::Text | FieldType::Json | FieldType::Array | FieldType::File
            )
    }));
    columns
        .into_iter()
        .take(5)
        .map(|f| ListColumn {
            name: f.name.clone(),
            label: escape_ts_string(&f.title),
        })
        .collect()
}

pub fn metric_binding(metric: &DashboardMetric, names: &EntityNames) -> MetricBinding {
    MetricBinding {
        name: metric.name.clone(),
        title: escape_ts_string(&metric.title),
        entity: metric.entity.clone(),
        aggregation: metric.aggregation.as_str().to_string(),
        field: metric.field.clone(),
        endpoint: format!("{}/stats/{}", names.api_path, metric.name),
        color: entity_color(&metric.entity).to_string(),
    }
}

fn workflow_binding(workflow: &WorkflowConfig) -> WorkflowBinding {
    let states = workflow
        .states
        .iter()
        .map(|state| StateBinding {
            name: escape_python_string(state),
            targets: workflow
                .transitions
                .iter()
                .filter(|t| &t.from == state)
                .map(|t| escape_python_string(&t.to))
                .collect(),
        })
        .collect();

    WorkflowBinding {
        name: workflow.name.clone(),
        field: workflow.field.clone(),
        constant: format!("{}_TRANSITIONS", to_screaming_snake_case(&workflow.name)),
        method: format!("advance_{}", workflow.name),
        states,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationBinding {
    pub label: String,
    pub path: String,
    pub icon: String,
    pub entity: String,
    pub component: String,
}

impl NavigationBinding {
    pub fn of(item: &NavigationItem, names: &EntityNames) -> Self {
        Self {
            label: escape_ts_string(&item.label),
            path: escape_ts_string(&item.path),
            icon: item
                .icon
                .clone()
                .unwrap_or_else(|| entity_icon(&item.entity).to_string()),
            entity: item.entity.clone(),
            component: names.component_list.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelExport {
    pub module: String,
    pub exports: Vec<String>,
}

/// Everything a domain-level template can reference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainBinding {
    pub domain: DomainSummary,
    pub entities: Vec<EntityNames>,
    pub models: Vec<ModelExport>,
    pub navigation: Vec<NavigationBinding>,
    pub metrics: Vec<MetricBinding>,
}

impl DomainBinding {
    pub fn build(config: &DomainConfig, names: &NameTable) -> Self {
        let models = names
            .values()
            .map(|n| {
                let mut exports = vec![n.class_name.clone()];
                exports.extend(
                    config
                        .relationships_from(&n.entity)
                        .filter(|r| r.kind == RelationshipKind::ManyToMany)
                        .map(association_table_name),
                );
                ModelExport {
                    module: n.module_name.clone(),
                    exports,
                }
            })
            .collect();

        let navigation = config
            .navigation
            .iter()
            .filter_map(|item| Some(NavigationBinding::of(item, names.get(&item.entity)?)))
            .collect();

        let metrics = config
            .dashboard_metrics
            .iter()
            .filter_map(|m| Some(metric_binding(m, names.get(&m.entity)?)))
            .collect();

        Self {
            domain: DomainSummary::of(config),
            entities: names.values().cloned().collect(),
            models,
            navigation,
            metrics,
        }
    }
}
