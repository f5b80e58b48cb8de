//! Generation targets and their static template dispatch table.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::binding::EntityNames;

/// Kind of artifact produced for an entity.
///
/// Declaration order is stage order: model, schema, service, route, then
/// UI components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum GenerationTarget {
    /// SQLAlchemy model
    Model,
    /// Pydantic schemas
    Schema,
    /// Service-layer CRUD class
    Service,
    /// FastAPI router
    Route,
    /// React form and list components
    #[value(name = "ui_component", alias = "ui-component")]
    UiComponent,
}

/// A per-entity template and where its output lands
#[derive(Debug, Clone, Copy)]
pub struct EntityTemplate {
    pub id: &'static str,
    pub path: fn(&EntityNames) -> String,
}

/// A once-per-domain template and where its output lands
#[derive(Debug, Clone, Copy)]
pub struct DomainTemplate {
    pub id: &'static str,
    pub path: &'static str,
}

pub fn model_path(names: &EntityNames) -> String {
    format!("backend/app/models/{}.py", names.module_name)
}

pub fn schema_path(names: &EntityNames) -> String {
    format!("backend/app/schemas/{}.py", names.module_name)
}

pub fn service_path(names: &EntityNames) -> String {
    format!("backend/app/services/{}.py", names.service_module)
}

pub fn route_path(names: &EntityNames) -> String {
    format!("backend/app/api/routes/{}.py", names.route_module)
}

pub fn form_path(names: &EntityNames) -> String {
    format!("frontend/src/components/{}/{}.tsx", names.class_name, names.component_form)
}

pub fn list_path(names: &EntityNames) -> String {
    format!("frontend/src/components/{}/{}.tsx", names.class_name, names.component_list)
}

pub const MODELS_INDEX_PATH: &str = "backend/app/models/__init__.py";
pub const API_ROUTER_PATH: &str = "backend/app/api/router.py";
pub const COMPONENTS_INDEX_PATH: &str = "frontend/src/components/index.ts";
pub const NAVIGATION_PATH: &str = "frontend/src/config/navigation.ts";
pub const DASHBOARD_PATH: &str = "frontend/src/config/dashboard.ts";

const MODEL_TEMPLATES: &[EntityTemplate] = &[EntityTemplate { id: "model.py", path: model_path }];
const SCHEMA_TEMPLATES: &[EntityTemplate] = &[EntityTemplate { id: "schema.py", path: schema_path }];
const SERVICE_TEMPLATES: &[EntityTemplate] = &[EntityTemplate { id: "service.py", path: service_path }];
const ROUTE_TEMPLATES: &[EntityTemplate] = &[EntityTemplate { id: "route.py", path: route_path }];
const UI_TEMPLATES: &[EntityTemplate] = &[
    EntityTemplate { id: "ui/form.tsx", path: form_path },
    EntityTemplate { id: "ui/list.tsx", path: list_path },
];

const MODEL_DOMAIN_TEMPLATES: &[DomainTemplate] = &[DomainTemplate {
    id: "domain/models_index.py",
    path: MODELS_INDEX_PATH,
}];
const ROUTE_DOMAIN_TEMPLATES: &[DomainTemplate] = &[DomainTemplate {
    id: "domain/api_router.py",
    path: API_ROUTER_PATH,
}];
const UI_DOMAIN_TEMPLATES: &[DomainTemplate] = &[
    DomainTemplate {
        id: "domain/components_index.ts",
        path: COMPONENTS_INDEX_PATH,
    },
    DomainTemplate {
        id: "domain/navigation.ts",
        path: NAVIGATION_PATH,
    },
    DomainTemplate {
        id: "domain/dashboard.ts",
        path: DASHBOARD_PATH,
    },
];

impl GenerationTarget {
    pub const ALL: [GenerationTarget; 5] = [
        GenerationTarget::Model,
        GenerationTarget::Schema,
        GenerationTarget::Service,
        GenerationTarget::Route,
        GenerationTarget::UiComponent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationTarget::Model => "model",
            GenerationTarget::Schema => "schema",
            GenerationTarget::Service => "service",
            GenerationTarget::Route => "route",
            GenerationTarget::UiComponent => "ui_component",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "model" | "models" => Some(GenerationTarget::Model),
            "schema" | "schemas" => Some(GenerationTarget::Schema),
            "service" | "services" => Some(GenerationTarget::Service),
            "route" | "routes" | "api" => Some(GenerationTarget::Route),
            "ui_component" | "ui-component" | "ui" | "frontend" => Some(GenerationTarget::UiComponent),
            _ => None,
        }
    }

    /// Templates rendered once per entity, in emission order
    pub fn templates(&self) -> &'static [EntityTemplate] {
        match self {
            GenerationTarget::Model => MODEL_TEMPLATES,
            GenerationTarget::Schema => SCHEMA_TEMPLATES,
            GenerationTarget::Service => SERVICE_TEMPLATES,
            GenerationTarget::Route => ROUTE_TEMPLATES,
            GenerationTarget::UiComponent => UI_TEMPLATES,
        }
    }

    /// Templates rendered once per domain after all entities
    pub fn domain_templates(&self) -> &'static [DomainTemplate] {
        match self {
            GenerationTarget::Model => MODEL_DOMAIN_TEMPLATES,
            GenerationTarget::Route => ROUTE_DOMAIN_TEMPLATES,
            GenerationTarget::UiComponent => UI_DOMAIN_TEMPLATES,
            GenerationTarget::Schema | GenerationTarget::Service => &[],
        }
    }

    /// Sort into stage order and drop duplicates
    pub fn normalize(targets: &[GenerationTarget]) -> Vec<GenerationTarget> {
        let mut targets = targets.to_vec();
        targets.sort();
        targets.dedup();
        targets
    }
}

impl fmt::Display for GenerationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_follows_declaration() {
        let targets = GenerationTarget::normalize(&[
            GenerationTarget::UiComponent,
            GenerationTarget::Model,
            GenerationTarget::Route,
            GenerationTarget::Model,
        ]);
        assert_eq!(
            targets,
            vec![GenerationTarget::Model, GenerationTarget::Route, GenerationTarget::UiComponent]
        );
    }

    #[test]
    fn test_parse_target_names() {
        use clap::ValueEnum;

        assert_eq!(GenerationTarget::from_str("ui_component", true), Ok(GenerationTarget::UiComponent));
        assert_eq!(GenerationTarget::from_str("ui-component", true), Ok(GenerationTarget::UiComponent));
        assert_eq!(GenerationTarget::from_str("Model", true), Ok(GenerationTarget::Model));
        assert!(GenerationTarget::from_str("widgets", true).is_err());

        let names: Vec<String> = GenerationTarget::value_variants()
            .iter()
            .filter_map(|t| t.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect();
        let expected: Vec<String> = GenerationTarget::ALL.iter().map(|t| t.as_str().to_string()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_every_target_has_entity_templates() {
        for target in GenerationTarget::ALL {
            assert!(!target.templates().is_empty(), "{} has no templates", target);
        }
    }
}
