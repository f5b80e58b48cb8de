//! Markdown rendering of an [`AdaptationManual`].

use std::fmt::Write;

use similar::TextDiff;

use super::steps::{AdaptationManual, AdaptationStep, FileChange};

/// Code fence language for a file path
fn fence_language(path: &str) -> &'static str {
    match path.rsplit('.').next() {
        Some("py") => "python",
        Some("tsx") => "tsx",
        Some("ts") => "typescript",
        Some("yaml") | Some("yml") => "yaml",
        Some("json") => "json",
        _ => "text",
    }
}

fn anchor(step: &AdaptationStep) -> String {
    format!("step-{}", step.step_number)
}

/// Unified diff of a file change, empty when nothing changes
pub fn unified_diff(change: &FileChange) -> String {
    let old = change.old_snippet.as_deref().map(|s| format!("{}\n", s)).unwrap_or_default();
    let new = change.new_snippet.as_deref().map(|s| format!("{}\n", s)).unwrap_or_default();
    if old == new {
        return String::new();
    }
    let diff = TextDiff::from_lines(&old, &new);
    diff.unified_diff()
        .context_radius(3)
        .header(&format!("a/{}", change.path), &format!("b/{}", change.path))
        .to_string()
}

/// Render the manual as a self-contained Markdown document
pub fn render_markdown(manual: &AdaptationManual) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_manual(&mut out, manual);
    out
}

fn write_manual(out: &mut String, manual: &AdaptationManual) -> std::fmt::Result {
    writeln!(
        out,
        "# Adaptation manual: {} {} \u{2192} {} {}",
        manual.source_domain, manual.source_version, manual.target_domain, manual.target_version
    )?;
    writeln!(out)?;

    writeln!(out, "## Summary")?;
    writeln!(out)?;
    if manual.is_empty() {
        writeln!(out, "The two configurations are structurally identical; no changes are needed.")?;
        writeln!(out)?;
    } else {
        writeln!(out, "- **Steps:** {}", manual.steps.len())?;
        writeln!(
            out,
            "- **Estimated effort:** {} minutes ({:.1} hours)",
            manual.total_minutes,
            manual.total_minutes as f64 / 60.0
        )?;
        writeln!(out, "- **Migration file:** `{}`", manual.migration_path)?;
        writeln!(out)?;
        writeln!(out, "| Category | Steps |")?;
        writeln!(out, "|----------|-------|")?;
        for (category, count) in manual.category_counts() {
            writeln!(out, "| {} | {} |", category.title(), count)?;
        }
        writeln!(out)?;
    }

    if !manual.warnings.is_empty() {
        writeln!(out, "## Warnings")?;
        writeln!(out)?;
        for warning in &manual.warnings {
            writeln!(out, "- \u{26a0} {}", warning)?;
        }
        writeln!(out)?;
    }

    if manual.is_empty() {
        return Ok(());
    }

    writeln!(out, "## Contents")?;
    writeln!(out)?;
    for (category, _) in manual.category_counts() {
        writeln!(out, "- **{}**", category.title())?;
        for step in manual.steps_in(category) {
            writeln!(out, "  - [{}. {}](#{})", step.step_number, step.title, anchor(step))?;
        }
    }
    writeln!(out)?;

    writeln!(out, "## Steps")?;
    for step in &manual.steps {
        writeln!(out)?;
        write_step(out, step)?;
    }
    Ok(())
}

fn write_step(out: &mut String, step: &AdaptationStep) -> std::fmt::Result {
    writeln!(out, "<a id=\"{}\"></a>", anchor(step))?;
    writeln!(out, "### {}. {}", step.step_number, step.title)?;
    writeln!(out)?;
    writeln!(
        out,
        "**Category:** {} | **Difficulty:** {} | **Estimate:** {} min",
        step.category.title(),
        step.difficulty,
        step.estimated_minutes
    )?;
    writeln!(out)?;
    writeln!(out, "{}", step.description)?;

    for change in &step.file_changes {
        writeln!(out)?;
        write_file_change(out, change)?;
    }
    Ok(())
}

fn write_file_change(out: &mut String, change: &FileChange) -> std::fmt::Result {
    let language = fence_language(&change.path);
    let action = match (&change.old_snippet, &change.new_snippet) {
        (None, Some(_)) => "add to",
        (Some(_), None) => "remove from",
        _ => "edit",
    };
    writeln!(out, "#### `{}` ({})", change.path, action)?;

    if let Some(old) = &change.old_snippet {
        writeln!(out)?;
        writeln!(out, "Before:")?;
        writeln!(out)?;
        writeln!(out, "```{}\n{}\n```", language, old)?;
    }
    if let Some(new) = &change.new_snippet {
        writeln!(out)?;
        writeln!(out, "After:")?;
        writeln!(out)?;
        writeln!(out, "```{}\n{}\n```", language, new)?;
    }

    // Whole-file inserts and deletions are already shown in full.
    if change.old_snippet.is_some() && change.new_snippet.is_some() {
        let diff = unified_diff(change);
        if !diff.is_empty() {
            writeln!(out)?;
            writeln!(out, "```diff\n{}```", diff)?;
        }
    }
    Ok(())
}
