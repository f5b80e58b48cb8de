//! Integration tests for entity matching, diffing and adaptation manuals

use domaingen::config::{from_yaml_str, DomainConfig};
use domaingen::diff::{diff, diff_files, FieldChange, MatchPolicy};
use domaingen::manual::{
    generate_manual, render_manual_files, render_markdown, AdaptationManual, ChangeKind, StepCategory,
};

const TASKBOARD: &str = "config/examples/taskboard.yaml";
const PROPERTY_MANAGEMENT: &str = "config/examples/property_management.yaml";

fn task_config() -> DomainConfig {
    from_yaml_str(
        r#"
name: tasks
version: 1.0.0
entities:
  - name: task
    fields:
      - { name: id, type: integer }
      - { name: title, type: string }
      - { name: assignee_id, type: integer }
"#,
    )
    .unwrap()
}

fn property_config() -> DomainConfig {
    from_yaml_str(
        r#"
name: properties
version: 1.0.0
entities:
  - name: property
    fields:
      - { name: id, type: integer }
      - { name: title, type: string }
      - { name: owner_id, type: integer }
"#,
    )
    .unwrap()
}

#[test]
fn test_task_to_property_detects_field_rename() {
    let policy = MatchPolicy::default();
    let (source, target) = (task_config(), property_config());
    let diff = diff(&source, &target, &policy);

    assert_eq!(diff.entity_matches.len(), 1);
    let entity_match = &diff.entity_matches[0];
    assert_eq!(entity_match.source, "task");
    assert_eq!(entity_match.target, "property");
    assert!(entity_match.score >= policy.threshold, "score {}", entity_match.score);
    assert!(entity_match.renamed);

    let fields = diff.field_diff("task").unwrap();
    assert_eq!(fields.changes.len(), 1);
    match &fields.changes[0] {
        FieldChange::Renamed { from, to, .. } => {
            assert_eq!(from, "assignee_id");
            assert_eq!(to, "owner_id");
        }
        other => panic!("expected a rename, got {:?}", other),
    }
    assert!(!fields
        .changes
        .iter()
        .any(|c| matches!(c, FieldChange::Added { .. } | FieldChange::Removed { .. })));
}

#[test]
fn test_task_to_property_manual_has_one_model_step() {
    let (source, target) = (task_config(), property_config());
    let diff = diff(&source, &target, &MatchPolicy::default());
    let manual = generate_manual(&diff, &source, &target).unwrap();

    let model_steps: Vec<_> = manual.steps_in(StepCategory::Model).collect();
    assert_eq!(model_steps.len(), 1);
    let step = model_steps[0];
    assert_eq!(step.change_kind, ChangeKind::FieldRenamed);
    assert!(step.title.contains("assignee_id"));
    assert!(step.title.contains("owner_id"));

    let model_file = step
        .file_changes
        .iter()
        .find(|c| c.path == "backend/app/models/property.py")
        .unwrap();
    assert_eq!(
        model_file.old_snippet.as_deref(),
        Some("assignee_id = Column(Integer, nullable=True)")
    );
    assert_eq!(
        model_file.new_snippet.as_deref(),
        Some("owner_id = Column(Integer, nullable=True)")
    );

    let migration = step
        .file_changes
        .iter()
        .find(|c| c.path.starts_with("backend/alembic/versions/"))
        .unwrap();
    assert_eq!(
        migration.new_snippet.as_deref(),
        Some(r#"op.alter_column("properties", "assignee_id", new_column_name="owner_id")"#)
    );

    // The entity rename comes first and renames the table
    let first = &manual.steps[0];
    assert_eq!(first.category, StepCategory::Database);
    assert_eq!(first.change_kind, ChangeKind::EntityRenamed);
    assert_eq!(
        first.file_changes[0].new_snippet.as_deref(),
        Some(r#"op.rename_table("tasks", "properties")"#)
    );
}

#[test]
fn test_example_domains_produce_ordered_manual() {
    let (source, target, diff) = diff_files(TASKBOARD, PROPERTY_MANAGEMENT, &MatchPolicy::default()).unwrap();
    let manual = generate_manual(&diff, &source, &target).unwrap();
    assert!(!manual.is_empty());

    let ranks: Vec<u8> = manual.steps.iter().map(|s| s.category.rank()).collect();
    assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "{:?}", ranks);
    for (index, step) in manual.steps.iter().enumerate() {
        assert_eq!(step.step_number, index + 1);
        assert!(!step.file_changes.is_empty(), "step {} has no file changes", step.title);
    }

    assert_eq!(diff.unmatched_target, vec!["lease".to_string()]);
    assert!(manual
        .steps
        .iter()
        .any(|s| s.change_kind == ChangeKind::EntityAdded && s.entity.as_deref() == Some("lease")));
    assert!(manual.steps_in(StepCategory::Config).count() > 0);
}

#[test]
fn test_markdown_manual_for_example_domains() {
    let markdown = render_manual_files(TASKBOARD, PROPERTY_MANAGEMENT, &MatchPolicy::default()).unwrap();
    assert!(markdown.starts_with("# Adaptation manual: taskboard 1.0.0"));
    assert!(markdown.contains("## Summary"));
    assert!(markdown.contains("## Contents"));
    assert!(markdown.contains("<a id=\"step-1\"></a>"));
    assert!(markdown.contains("```diff\n"));
    assert!(markdown.contains("backend/app/models/lease.py"));
}

#[test]
fn test_identical_configs_produce_empty_diff_and_manual() {
    let config = task_config();
    let diff = diff(&config, &config, &MatchPolicy::default());
    assert!(diff.is_empty());
    let manual = generate_manual(&diff, &config, &config).unwrap();
    assert!(manual.is_empty());
    assert!(render_markdown(&manual).contains("structurally identical"));
}

#[test]
fn test_unrelated_entity_stays_unmatched() {
    let source = task_config();
    let target = from_yaml_str(
        r#"
name: billing
version: 2.0.0
entities:
  - name: invoice
    fields:
      - { name: amount, type: decimal }
      - { name: issued_on, type: date }
"#,
    )
    .unwrap();
    let diff = diff(&source, &target, &MatchPolicy::default());
    assert!(diff.entity_matches.is_empty());
    assert_eq!(diff.unmatched_source, vec!["task".to_string()]);
    assert_eq!(diff.unmatched_target, vec!["invoice".to_string()]);

    let manual = generate_manual(&diff, &source, &target).unwrap();
    let kinds: Vec<ChangeKind> = manual.steps.iter().map(|s| s.change_kind).collect();
    assert!(kinds.contains(&ChangeKind::EntityAdded));
    assert!(kinds.contains(&ChangeKind::EntityRemoved));
}

const BOARD: &str = r#"
name: board
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

/// Appends entities and relationships to the board domain.
fn board_with(entities: &str, relationships: &str) -> DomainConfig {
    let yaml = BOARD.replace("relationships:\n", &format!("{}relationships:\n{}", entities, relationships));
    from_yaml_str(&yaml).unwrap()
}

/// Number of the first step whose migration statement contains `needle`.
fn step_with(manual: &AdaptationManual, needle: &str) -> usize {
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

#[test]
fn test_keys_between_surviving_and_added_tables_follow_creation() {
    let source = board_with("", "");
    let target = board_with(
        "  - name: sprint\n    fields:\n      - { name: goal, type: string }\n  - name: milestone\n    fields:\n      - { name: due_on, type: date }\n",
        "  - { name: sprint, type: many_to_one, source_entity: task, target_entity: sprint }\n  - { name: project, type: many_to_one, source_entity: milestone, target_entity: project }\n",
    );
    let diff = diff(&source, &target, &MatchPolicy::default());
    assert_eq!(diff.unmatched_target, vec!["sprint".to_string(), "milestone".to_string()]);
    let manual = generate_manual(&diff, &source, &target).unwrap();

    let sprints = step_with(&manual, "op.create_table(\n    \"sprints\"");
    let task_key = step_with(&manual, "op.create_foreign_key(\"fk_tasks_sprint_id\", \"tasks\", \"sprints\"");
    assert!(sprints < task_key, "sprints created in step {} but referenced in step {}", sprints, task_key);

    // The added table carries its key to the surviving table inline.
    let milestones = step_with(&manual, "op.create_table(\n    \"milestones\"");
    assert_eq!(milestones, step_with(&manual, "sa.ForeignKey(\"projects.id\""));
    assert_eq!(manual.steps[task_key - 1].change_kind, ChangeKind::RelationshipAdded);
}

#[test]
fn test_keys_from_removed_table_leave_before_the_table() {
    let source = board_with(
        "  - name: board\n    fields:\n      - { name: motto, type: text }\n",
        "  - { name: tasks, type: one_to_many, source_entity: board, target_entity: task }\n",
    );
    let target = board_with("", "");
    let diff = diff(&source, &target, &MatchPolicy::default());
    assert_eq!(diff.unmatched_source, vec!["board".to_string()]);
    let manual = generate_manual(&diff, &source, &target).unwrap();

    let constraint = step_with(&manual, "op.drop_constraint(\"fk_tasks_board_id\", \"tasks\"");
    let column = step_with(&manual, "op.drop_column(\"tasks\", \"board_id\")");
    let table = step_with(&manual, "op.drop_table(\"boards\")");
    assert_eq!(constraint, column);
    assert!(column < table, "board_id dropped in step {} after boards in step {}", column, table);
    assert_eq!(manual.steps[column - 1].change_kind, ChangeKind::RelationshipRemoved);
}

#[test]
fn test_second_relationship_to_same_target_adds_its_own_column() {
    let people = "  - name: user\n    fields:\n      - { name: email, type: email }\n";
    let assignee = "  - { name: assignee, type: many_to_one, source_entity: task, target_entity: user }\n";
    let source = board_with(people, assignee);
    let target = board_with(
        people,
        &format!(
            "{}  - {{ name: reporter, type: many_to_one, source_entity: task, target_entity: user }}\n",
            assignee
        ),
    );
    let diff = diff(&source, &target, &MatchPolicy::default());
    let manual = generate_manual(&diff, &source, &target).unwrap();

    let column = step_with(&manual, "op.add_column(\"tasks\", sa.Column(\"reporter_id\"");
    assert_eq!(
        column,
        step_with(&manual, "op.create_foreign_key(\"fk_tasks_reporter_id\", \"tasks\", \"users\"")
    );
    // The existing relationship keeps its column untouched.
    assert!(!manual.steps.iter().any(|s| s.file_changes.iter().any(|c| c.path == manual.migration_path
        && c.new_snippet.as_deref().is_some_and(|n| n.contains("assignee_id")))));
}
