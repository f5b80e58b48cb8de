//! Generation orchestrator.
//!
//! Walks entities in declaration order and renders each requested target's
//! templates in stage order, then the domain-level files. A template
//! failure is recorded against its artifact and generation moves on; a
//! [`TypeRegistryGap`] aborts the whole run.

use std::sync::Arc;

use tokio::task::JoinSet;

use super::artifact::{GeneratedArtifact, GenerationError, GenerationResult};
use super::binding::{mint_names, DomainBinding, EntityBinding, NameTable};
use super::targets::GenerationTarget;
use super::templates::TemplateRenderer;
use super::type_registry::TypeMappingRegistry;
use crate::config::{DomainConfig, EntityConfig};
use crate::error::{TemplateLoadError, TypeRegistryGap};

/// Artifacts and errors for a single entity
#[derive(Debug, Default)]
struct EntityOutput {
    artifacts: Vec<GeneratedArtifact>,
    errors: Vec<GenerationError>,
}

/// Shared, read-only generation machinery
#[derive(Debug, Clone)]
pub struct Generator {
    registry: Arc<TypeMappingRegistry>,
    renderer: Arc<TemplateRenderer>,
}

impl Generator {
    pub fn new(registry: TypeMappingRegistry, renderer: TemplateRenderer) -> Self {
        Self {
            registry: Arc::new(registry),
            renderer: Arc::new(renderer),
        }
    }

    /// Built-in type mappings and templates
    pub fn builtin() -> Result<Self, TemplateLoadError> {
        Ok(Self::new(TypeMappingRegistry::builtin(), TemplateRenderer::builtin()?))
    }

    pub fn registry(&self) -> &TypeMappingRegistry {
        &self.registry
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    /// Bind one entity of `config` against this generator's registry
    pub fn bind(
        &self,
        config: &DomainConfig,
        entity: &EntityConfig,
        names: &NameTable,
    ) -> Result<EntityBinding, TypeRegistryGap> {
        EntityBinding::build(config, entity, names, &self.registry)
    }

    /// Generate artifacts for `targets` from a validated config
    ///
    /// # Arguments
    ///
    /// * `config` - Validated domain config
    /// * `targets` - Requested targets; order and duplicates are ignored
    ///
    /// # Example
    ///
    /// ```ignore
    /// use domaingen::codegen::{GenerationTarget, Generator};
    /// use domaingen::config::load_config;
    ///
    /// let config = load_config("config/examples/taskboard.yaml")?;
    /// let result = Generator::builtin()?.generate(&config, &GenerationTarget::ALL)?;
    /// result.write_to("generated")?;
    /// ```
    pub fn generate(
        &self,
        config: &DomainConfig,
        targets: &[GenerationTarget],
    ) -> Result<GenerationResult, TypeRegistryGap> {
        self.registry.verify()?;
        let targets = GenerationTarget::normalize(targets);
        let names = mint_names(config);

        let mut output = EntityOutput::default();
        for entity in &config.entities {
            let entity_output = self.generate_entity(config, entity, &names, &targets)?;
            output.artifacts.extend(entity_output.artifacts);
            output.errors.extend(entity_output.errors);
        }
        self.generate_domain(config, &names, &targets, &mut output);

        Ok(self.finish(config, output))
    }

    /// Same output as [`Generator::generate`], with entities rendered on
    /// tokio's blocking pool.
    pub async fn generate_concurrent(
        &self,
        config: Arc<DomainConfig>,
        targets: &[GenerationTarget],
    ) -> Result<GenerationResult, TypeRegistryGap> {
        self.registry.verify()?;
        let targets = Arc::new(GenerationTarget::normalize(targets));
        let names = Arc::new(mint_names(&config));

        let mut tasks = JoinSet::new();
        for index in 0..config.entities.len() {
            let generator = self.clone();
            let config = Arc::clone(&config);
            let names = Arc::clone(&names);
            let targets = Arc::clone(&targets);
            tasks.spawn_blocking(move || {
                let entity = &config.entities[index];
                (index, generator.generate_entity(&config, entity, &names, &targets))
            });
        }

        let mut outputs: Vec<Option<Result<EntityOutput, TypeRegistryGap>>> =
            (0..config.entities.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, output) = match joined {
                Ok(value) => value,
                Err(err) => std::panic::resume_unwind(err.into_panic()),
            };
            outputs[index] = Some(output);
        }

        let mut output = EntityOutput::default();
        for entity_output in outputs.into_iter().flatten() {
            let entity_output = entity_output?;
            output.artifacts.extend(entity_output.artifacts);
            output.errors.extend(entity_output.errors);
        }
        self.generate_domain(&config, &names, &targets, &mut output);

        Ok(self.finish(&config, output))
    }

    fn generate_entity(
        &self,
        config: &DomainConfig,
        entity: &EntityConfig,
        names: &NameTable,
        targets: &[GenerationTarget],
    ) -> Result<EntityOutput, TypeRegistryGap> {
        let binding = self.bind(config, entity, names)?;
        let mut output = EntityOutput::default();

        for target in targets {
            for template in target.templates() {
                let path = (template.path)(&binding.names);
                match self.renderer.render(template.id, &binding) {
                    Ok(text) => output.artifacts.push(GeneratedArtifact::new(
                        path,
                        *target,
                        Some(entity.name.clone()),
                        template.id,
                        text,
                    )),
                    Err(cause) => {
                        tracing::warn!(entity = %entity.name, template = template.id, error = %cause, "template failed");
                        output.errors.push(GenerationError {
                            entity: Some(entity.name.clone()),
                            target: *target,
                            template: template.id.to_string(),
                            path,
                            cause,
                        });
                    }
                }
            }
        }

        tracing::debug!(entity = %entity.name, artifacts = output.artifacts.len(), "generated entity");
        Ok(output)
    }

    fn generate_domain(
        &self,
        config: &DomainConfig,
        names: &NameTable,
        targets: &[GenerationTarget],
        output: &mut EntityOutput,
    ) {
        let binding = DomainBinding::build(config, names);
        for target in targets {
            for template in target.domain_templates() {
                match self.renderer.render(template.id, &binding) {
                    Ok(text) => output.artifacts.push(GeneratedArtifact::new(
                        template.path.to_string(),
                        *target,
                        None,
                        template.id,
                        text,
                    )),
                    Err(cause) => output.errors.push(GenerationError {
                        entity: None,
                        target: *target,
                        template: template.id.to_string(),
                        path: template.path.to_string(),
                        cause,
                    }),
                }
            }
        }
    }

    fn finish(&self, config: &DomainConfig, output: EntityOutput) -> GenerationResult {
        tracing::info!(
            domain = %config.name,
            artifacts = output.artifacts.len(),
            errors = output.errors.len(),
            "generation finished"
        );
        GenerationResult {
            domain: config.name.clone(),
            version: config.version.clone(),
            template_version: self.renderer.template_version().to_string(),
            artifacts: output.artifacts,
            errors: output.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::type_registry::MappingTarget;
    use crate::config::{from_yaml_str, FieldType};

    fn config() -> DomainConfig {
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
      - { name: done, type: boolean, default: false }
relationships:
  - { name: project, type: many_to_one, source_entity: task, target_entity: project }
navigation:
  - { label: Tasks, entity: task }
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_artifacts_follow_entity_then_stage_order() {
        let generator = Generator::builtin().unwrap();
        let result = generator.generate(&config(), &GenerationTarget::ALL).unwrap();
        assert!(result.is_success(), "{:?}", result.errors);

        let paths: Vec<&str> = result.artifacts.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(
            &paths[..6],
            &[
                "backend/app/models/project.py",
                "backend/app/schemas/project.py",
                "backend/app/services/project_service.py",
                "backend/app/api/routes/projects.py",
                "frontend/src/components/Project/ProjectForm.tsx",
                "frontend/src/components/Project/ProjectList.tsx",
            ]
        );
        assert_eq!(paths.len(), 12 + 5);
        assert_eq!(paths.last(), Some(&"frontend/src/config/dashboard.ts"));
    }

    #[test]
    fn test_model_uses_minted_names_and_foreign_keys() {
        let generator = Generator::builtin().unwrap();
        let result = generator.generate(&config(), &[GenerationTarget::Model]).unwrap();
        let model = &result.artifact("backend/app/models/task.py").unwrap().source_text;
        assert!(model.contains("class Task(Base):"));
        assert!(model.contains("__tablename__ = \"tasks\""));
        assert!(model.contains("project_id = Column(Integer, ForeignKey(\"projects.id\"), nullable=True, index=True)"));
        assert!(model.contains("project = relationship(\"Project\", foreign_keys=[project_id])"));
        assert!(model.contains("done = Column(Boolean, nullable=True, default=False)"));
    }

    #[test]
    fn test_route_imports_service_from_same_names() {
        let generator = Generator::builtin().unwrap();
        let result = generator
            .generate(&config(), &[GenerationTarget::Service, GenerationTarget::Route])
            .unwrap();
        let route = &result.artifact("backend/app/api/routes/tasks.py").unwrap().source_text;
        assert!(route.contains("from app.services.task_service import TaskService"));
        assert!(route.contains("router = APIRouter(prefix=\"/tasks\", tags=[\"Tasks\"])"));
        assert!(result.artifact("backend/app/services/task_service.py").is_some());
    }

    #[test]
    fn test_template_failure_is_recorded_and_generation_continues() {
        let renderer = TemplateRenderer::with_overrides(vec![(
            "schema.py".to_string(),
            "{{ no_such_binding }}\n".to_string(),
        )])
        .unwrap();
        let generator = Generator::new(TypeMappingRegistry::builtin(), renderer);
        let result = generator
            .generate(&config(), &[GenerationTarget::Model, GenerationTarget::Schema])
            .unwrap();
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].entity.as_deref(), Some("project"));
        assert_eq!(result.errors[0].template, "schema.py");
        // both models and the models index still render
        assert_eq!(result.artifacts.len(), 3);
    }

    #[test]
    fn test_registry_gap_halts_generation() {
        let mut registry = TypeMappingRegistry::builtin();
        registry.unregister(FieldType::Boolean, MappingTarget::Widget);
        let generator = Generator::new(registry, TemplateRenderer::builtin().unwrap());
        let gap = generator.generate(&config(), &GenerationTarget::ALL).unwrap_err();
        assert_eq!(gap.field_type, FieldType::Boolean);
        assert_eq!(gap.target, MappingTarget::Widget);
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential() {
        let generator = Generator::builtin().unwrap();
        let config = Arc::new(config());
        let sequential = generator.generate(&config, &GenerationTarget::ALL).unwrap();
        let concurrent = generator
            .generate_concurrent(Arc::clone(&config), &GenerationTarget::ALL)
            .await
            .unwrap();
        assert_eq!(sequential, concurrent);
    }
}
