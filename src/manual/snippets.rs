//! Code fragments for adaptation steps, rendered from `snippet/*` templates.

use serde::Serialize;
use serde_json::json;

use crate::codegen::binding::*;
use crate::codegen::TemplateRenderer;
use crate::error::TemplateError;

/// Renders diff-sized fragments rather than whole files
pub struct SnippetRenderer<'a> {
    renderer: &'a TemplateRenderer,
}

/// Migration-side shape of a relationship
#[derive(Debug, Clone, PartialEq)]
pub enum Structure {
    ForeignKey {
        table: String,
        column: ColumnBinding,
        referent_table: String,
        referent_column: String,
        /// The column is a declared field and outlives the constraint
        declared: bool,
    },
    Association(AssociationBinding),
}

pub fn foreign_key_constraint(table: &str, column: &str) -> String {
    format!("fk_{}_{}", table, column)
}

impl<'a> SnippetRenderer<'a> {
    pub fn new(renderer: &'a TemplateRenderer) -> Self {
        Self { renderer }
    }

    fn render<T: Serialize>(&self, template: &str, context: &T) -> Result<String, TemplateError> {
        let text = self.renderer.render(template, context)?;
        Ok(text.trim().to_string())
    }

    pub fn model_class(&self, names: &EntityNames) -> Result<String, TemplateError> {
        self.render(
            "snippet/model_class",
            &json!({"class_name": names.class_name, "table": names.table}),
        )
    }

    pub fn model_column(&self, column: &ColumnBinding) -> Result<String, TemplateError> {
        self.render("snippet/model_column", &json!({ "column": column }))
    }

    pub fn relationship(&self, relationship: &RelationshipBinding) -> Result<String, TemplateError> {
        self.render("snippet/relationship", &json!({ "relationship": relationship }))
    }

    pub fn schema_field(&self, field: &FieldBinding) -> Result<String, TemplateError> {
        self.render("snippet/schema_field", &json!({ "field": field }))
    }

    pub fn ui_input(&self, field: &FieldBinding) -> Result<String, TemplateError> {
        self.render("snippet/ui_input", &json!({ "field": field }))
    }

    pub fn route_prefix(&self, names: &EntityNames) -> Result<String, TemplateError> {
        self.render("snippet/route_prefix", &json!({ "names": names }))
    }

    pub fn component_names(&self, names: &EntityNames) -> Result<String, TemplateError> {
        self.render("snippet/component_names", &json!({ "names": names }))
    }

    pub fn nav_item(&self, item: &NavigationBinding) -> Result<String, TemplateError> {
        self.render("snippet/nav_item", &json!({ "item": item }))
    }

    pub fn dashboard_metric(&self, metric: &MetricBinding) -> Result<String, TemplateError> {
        self.render("snippet/dashboard_metric", &json!({ "metric": metric }))
    }

    pub fn add_column(&self, table: &str, column: &ColumnBinding) -> Result<String, TemplateError> {
        self.render("snippet/alembic/add_column", &json!({"table": table, "column": column}))
    }

    pub fn drop_column(&self, table: &str, column: &str) -> Result<String, TemplateError> {
        self.render("snippet/alembic/drop_column", &json!({"table": table, "column": column}))
    }

    pub fn rename_column(&self, table: &str, from: &str, to: &str) -> Result<String, TemplateError> {
        self.render(
            "snippet/alembic/rename_column",
            &json!({"table": table, "from": from, "to": to}),
        )
    }

    pub fn alter_type(&self, table: &str, before: &ColumnBinding, after: &ColumnBinding) -> Result<String, TemplateError> {
        self.render(
            "snippet/alembic/alter_type",
            &json!({"table": table, "before": before, "column": after}),
        )
    }

    pub fn alter_constraints(
        &self,
        table: &str,
        before: &ColumnBinding,
        after: &ColumnBinding,
    ) -> Result<String, TemplateError> {
        self.render(
            "snippet/alembic/alter_constraints",
            &json!({"table": table, "before": before, "column": after}),
        )
    }

    pub fn rename_table(&self, from: &str, to: &str) -> Result<String, TemplateError> {
        self.render("snippet/alembic/rename_table", &json!({"from": from, "to": to}))
    }

    pub fn create_table(&self, binding: &EntityBinding) -> Result<String, TemplateError> {
        let mut statements = vec![self.render(
            "snippet/alembic/create_table",
            &json!({
                "table": binding.entity.table,
                "columns": binding.columns,
                "timestamps": binding.entity.timestamps,
            }),
        )?];
        for association in &binding.association_tables {
            statements.push(self.create_association(association)?);
        }
        Ok(statements.join("\n"))
    }

    pub fn drop_table(&self, table: &str) -> Result<String, TemplateError> {
        self.render("snippet/alembic/drop_table", &json!({ "table": table }))
    }

    pub fn create_association(&self, association: &AssociationBinding) -> Result<String, TemplateError> {
        self.render("snippet/alembic/create_association", &json!({ "association": association }))
    }

    /// Statements that create a relationship's column, constraint or table
    pub fn create_structure(&self, structure: &Structure) -> Result<String, TemplateError> {
        match structure {
            Structure::ForeignKey {
                table,
                column,
                referent_table,
                referent_column,
                declared,
            } => {
                // the constraint is created separately, not inline
                let mut column = column.clone();
                column.foreign_key = None;
                self.render(
                    "snippet/alembic/create_foreign_key",
                    &json!({
                        "table": table,
                        "column": column,
                        "referent_table": referent_table,
                        "referent_column": referent_column,
                        "constraint": foreign_key_constraint(table, &column.name),
                        "add_column": !declared,
                    }),
                )
            }
            Structure::Association(association) => self.create_association(association),
        }
    }

    /// Statements that drop a relationship's constraint, column or table
    pub fn drop_structure(&self, structure: &Structure) -> Result<String, TemplateError> {
        match structure {
            Structure::ForeignKey {
                table, column, declared, ..
            } => self.render(
                "snippet/alembic/drop_foreign_key",
                &json!({
                    "table": table,
                    "column": column.name,
                    "constraint": foreign_key_constraint(table, &column.name),
                    "drop_column": !declared,
                }),
            ),
            Structure::Association(association) => self.drop_table(&association.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, nullable: bool, unique: bool) -> ColumnBinding {
        ColumnBinding {
            name: name.to_string(),
            type_expr: "Integer".to_string(),
            sa_type: "sa.Integer()".to_string(),
            foreign_key: None,
            ondelete: None,
            primary_key: false,
            nullable,
            unique,
            index: false,
            default: None,
        }
    }

    #[test]
    fn test_model_column_snippet() {
        let renderer = TemplateRenderer::builtin().unwrap();
        let snippets = SnippetRenderer::new(&renderer);
        assert_eq!(
            snippets.model_column(&column("owner_id", true, false)).unwrap(),
            "owner_id = Column(Integer, nullable=True)"
        );
    }

    #[test]
    fn test_alter_constraints_only_mentions_changes() {
        let renderer = TemplateRenderer::builtin().unwrap();
        let snippets = SnippetRenderer::new(&renderer);
        let text = snippets
            .alter_constraints("tasks", &column("points", true, false), &column("points", false, true))
            .unwrap();
        assert_eq!(
            text,
            "op.alter_column(\"tasks\", \"points\", existing_type=sa.Integer(), nullable=False)\n\
             op.create_unique_constraint(\"uq_tasks_points\", \"tasks\", [\"points\"])"
        );
    }

    #[test]
    fn test_foreign_key_structure_statements() {
        let renderer = TemplateRenderer::builtin().unwrap();
        let snippets = SnippetRenderer::new(&renderer);
        let mut fk = column("project_id", true, false);
        fk.foreign_key = Some("projects.id".to_string());
        let structure = Structure::ForeignKey {
            table: "tasks".to_string(),
            column: fk,
            referent_table: "projects".to_string(),
            referent_column: "id".to_string(),
            declared: false,
        };

        let create = snippets.create_structure(&structure).unwrap();
        assert_eq!(
            create,
            "op.add_column(\"tasks\", sa.Column(\"project_id\", sa.Integer(), nullable=True))\n\
             op.create_foreign_key(\"fk_tasks_project_id\", \"tasks\", \"projects\", [\"project_id\"], [\"id\"])"
        );

        let drop = snippets.drop_structure(&structure).unwrap();
        assert_eq!(
            drop,
            "op.drop_constraint(\"fk_tasks_project_id\", \"tasks\", type_=\"foreignkey\")\n\
             op.drop_column(\"tasks\", \"project_id\")"
        );
    }
}
