//! Integration tests for code generation from the example domain configs

use std::fs;
use std::sync::Arc;

use domaingen::codegen::{checksum, generate_from_file, GenerationTarget, Generator, TemplateRenderer, TypeMappingRegistry};
use domaingen::config::load_config;

const TASKBOARD: &str = "config/examples/taskboard.yaml";
const PROPERTY_MANAGEMENT: &str = "config/examples/property_management.yaml";

#[test]
fn test_taskboard_generates_every_artifact() {
    let config = load_config(TASKBOARD).unwrap();
    let result = Generator::builtin().unwrap().generate(&config, &GenerationTarget::ALL).unwrap();
    assert!(result.is_success(), "{:?}", result.errors);

    // 6 files per entity plus models index, API router and three UI files
    assert_eq!(result.artifacts.len(), config.entities.len() * 6 + 5);
    for artifact in &result.artifacts {
        assert_eq!(artifact.checksum, checksum(&artifact.source_text), "{}", artifact.path);
        assert!(!artifact.source_text.trim().is_empty(), "{} is empty", artifact.path);
    }

    let model = &result.artifact("backend/app/models/task.py").unwrap().source_text;
    assert!(model.contains("class Task(Base):"));
    assert!(model.contains("assignee_id = Column(Integer, ForeignKey(\"users.id\")"));
    assert!(model.contains("project = relationship(\"Project\""));

    let service = &result.artifact("backend/app/services/task_service.py").unwrap().source_text;
    assert!(service.contains("class TaskService"));
    assert!(service.contains("def advance_task_status("));

    let route = &result.artifact("backend/app/api/routes/tasks.py").unwrap().source_text;
    assert!(route.contains("prefix=\"/tasks\""));

    let form = &result
        .artifact("frontend/src/components/Task/TaskForm.tsx")
        .unwrap()
        .source_text;
    assert!(form.contains("TaskForm"));
    assert!(form.contains("<select"));

    let dashboard = &result.artifact("frontend/src/config/dashboard.ts").unwrap().source_text;
    assert!(dashboard.contains("average_priority"));
}

#[test]
fn test_generation_is_idempotent() {
    let config = load_config(PROPERTY_MANAGEMENT).unwrap();
    let generator = Generator::builtin().unwrap();
    let first = generator.generate(&config, &GenerationTarget::ALL).unwrap();
    let second = generator.generate(&config, &GenerationTarget::ALL).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.manifest(), second.manifest());
}

#[tokio::test]
async fn test_concurrent_generation_matches_sequential() {
    let config = Arc::new(load_config(PROPERTY_MANAGEMENT).unwrap());
    let generator = Generator::builtin().unwrap();
    let sequential = generator.generate(&config, &GenerationTarget::ALL).unwrap();
    let concurrent = generator
        .generate_concurrent(Arc::clone(&config), &GenerationTarget::ALL)
        .await
        .unwrap();
    assert_eq!(sequential, concurrent);
}

#[test]
fn test_generate_from_file_writes_artifacts_and_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = generate_from_file(TASKBOARD, dir.path(), &[GenerationTarget::Model, GenerationTarget::Schema]).unwrap();
    assert!(manifest.is_success());

    for entry in &manifest.files {
        let text = fs::read_to_string(dir.path().join(&entry.path)).unwrap();
        assert_eq!(checksum(&text), entry.checksum, "{}", entry.path);
    }
    assert!(dir.path().join("backend/app/schemas/project.py").exists());
    assert!(!dir.path().join("backend/app/api/routes/tasks.py").exists());

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("manifest.json")).unwrap()).unwrap();
    assert_eq!(written["domain"], "taskboard");
    assert_eq!(written["files"].as_array().unwrap().len(), manifest.files.len());
    assert_eq!(written["errors"].as_array().unwrap().len(), 0);
}

#[test]
fn test_template_override_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("schema.py.tera"),
        "# schemas for {{ names.class_name }}\n",
    )
    .unwrap();
    let renderer = TemplateRenderer::from_dir(dir.path()).unwrap();
    assert_ne!(renderer.template_version(), TemplateRenderer::builtin().unwrap().template_version());

    let generator = Generator::new(TypeMappingRegistry::builtin(), renderer);
    let config = load_config(TASKBOARD).unwrap();
    let result = generator.generate(&config, &[GenerationTarget::Schema]).unwrap();
    assert_eq!(
        result.artifact("backend/app/schemas/task.py").unwrap().source_text,
        "# schemas for Task\n"
    );
}

#[test]
fn test_failed_template_is_listed_in_manifest() {
    let renderer = TemplateRenderer::with_overrides(vec![(
        "route.py".to_string(),
        "{{ missing.value }}\n".to_string(),
    )])
    .unwrap();
    let generator = Generator::new(TypeMappingRegistry::builtin(), renderer);
    let config = load_config(TASKBOARD).unwrap();
    let result = generator.generate(&config, &GenerationTarget::ALL).unwrap();

    assert!(!result.is_success());
    assert_eq!(result.errors.len(), config.entities.len());
    assert!(result.artifact("backend/app/api/routes/tasks.py").is_none());
    assert!(result.artifact("backend/app/services/task_service.py").is_some());

    let manifest = result.manifest();
    assert_eq!(manifest.errors[0].path, "backend/app/api/routes/users.py");
}
