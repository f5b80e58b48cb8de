//! domaingen CLI - generate FastAPI/React applications from domain configs
//! and write adaptation manuals between two configs.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use domaingen::codegen::fs_utils::write_artifact;
use domaingen::codegen::{GenerationTarget, Generator, TemplateRenderer, TypeMappingRegistry};
use domaingen::config::{check, load_config, load_raw, GeneratorSettings};
use domaingen::diff::{diff_files, ConfigChange, ConfigDiff, FieldChange, RelationshipChange};
use domaingen::manual::{generate_manual_with, render_markdown};

#[derive(Parser)]
#[command(name = "domaingen")]
#[command(version, about = "Generate applications from domain configs and adapt them between domains", long_about = None)]
struct Cli {
    /// Settings file (default: domaingen.yaml if present)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a domain config without generating code
    Validate {
        /// Path to a YAML or JSON domain config
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Generate backend and frontend code from a domain config
    Generate {
        /// Path to a YAML or JSON domain config
        #[arg(short, long)]
        config: PathBuf,

        /// Output directory (overrides settings and DOMAINGEN_OUTPUT_DIR)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target to generate; repeat for several (default: all)
        #[arg(short, long = "target", value_enum, ignore_case = true)]
        targets: Vec<GenerationTarget>,

        /// Directory of template overrides (`<id>.tera`)
        #[arg(long)]
        templates: Option<PathBuf>,

        /// Render entities concurrently
        #[arg(long)]
        concurrent: bool,

        /// Exit with an error if any artifact failed to render
        #[arg(long)]
        strict: bool,
    },

    /// Show the structural diff between two domain configs
    Diff {
        /// Config the existing application was generated from
        #[arg(short, long)]
        source: PathBuf,

        /// Config to adapt to
        #[arg(short, long)]
        target: PathBuf,

        /// Print the full diff as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a Markdown adaptation manual from one domain config to another
    Manual {
        /// Config the existing application was generated from
        #[arg(short, long)]
        source: PathBuf,

        /// Config to adapt to
        #[arg(short, long)]
        target: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Resolve settings with precedence: ENV > settings file > defaults.
/// CLI flags are applied on top by each command.
fn load_settings(path: Option<&Path>) -> Result<GeneratorSettings, String> {
    let mut settings =
        GeneratorSettings::discover(path).map_err(|e| format!("Failed to load settings: {}", e))?;
    settings
        .apply_env()
        .map_err(|e| format!("Invalid environment override: {}", e))?;
    Ok(settings)
}

fn build_generator(templates: Option<&Path>) -> Result<Generator, String> {
    let renderer = match templates {
        Some(dir) => {
            let renderer = TemplateRenderer::from_dir(dir)
                .map_err(|e| format!("Failed to load templates from {}: {}", dir.display(), e))?;
            eprintln!("  ℹ Using template overrides from {}", dir.display());
            renderer
        }
        None => TemplateRenderer::builtin().map_err(|e| format!("Failed to load built-in templates: {}", e))?,
    };
    Ok(Generator::new(TypeMappingRegistry::builtin(), renderer))
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match load_settings(cli.settings.as_deref()) {
        Err(e) => Err(e),
        Ok(settings) => match cli.command {
            Commands::Validate { config } => validate_config(config),
            Commands::Generate {
                config,
                output,
                targets,
                templates,
                concurrent,
                strict,
            } => {
                let output = output.unwrap_or_else(|| settings.output.clone());
                let targets = if targets.is_empty() { settings.targets.clone() } else { targets };
                let templates = templates.or_else(|| settings.templates.clone());
                generate_code(
                    config,
                    output,
                    targets,
                    templates,
                    concurrent || settings.concurrent,
                    strict,
                )
                .await
            }
            Commands::Diff { source, target, json } => diff_configs(source, target, json, &settings),
            Commands::Manual { source, target, output } => write_manual(source, target, output, &settings),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Validate a domain config and report every error and warning
fn validate_config(config: PathBuf) -> Result<(), String> {
    println!("🔍 Validating {}...", config.display());

    let raw = load_raw(&config).map_err(|e| format!("Failed to load config: {}", e))?;
    let report = check(&raw);

    for warning in &report.warnings {
        println!("  ⚠ {}: {}", warning.location, warning.message);
    }
    if !report.is_valid() {
        for error in &report.errors {
            println!("  ✗ {}", error);
        }
        return Err(format!(
            "{} validation error(s) in {}",
            report.errors.len(),
            config.display()
        ));
    }

    if let Some(domain) = &report.config {
        println!(
            "  ✓ Domain '{}' v{}: {} entities, {} relationships",
            domain.name,
            domain.version,
            domain.entities.len(),
            domain.relationships.len()
        );
    }
    println!("✨ Configuration is valid!");
    Ok(())
}

/// Generate artifacts and manifest.json from a domain config
async fn generate_code(
    config: PathBuf,
    output: PathBuf,
    targets: Vec<GenerationTarget>,
    templates: Option<PathBuf>,
    concurrent: bool,
    strict: bool,
) -> Result<(), String> {
    println!("🔧 Generating code from {}...", config.display());

    let domain = load_config(&config).map_err(|e| format!("Failed to load config: {}", e))?;
    println!(
        "  ✓ Loaded domain '{}' with {} entities",
        domain.name,
        domain.entities.len()
    );

    let generator = build_generator(templates.as_deref())?;
    let target_names: Vec<&str> = GenerationTarget::normalize(&targets).iter().map(|t| t.as_str()).collect();
    println!("  ℹ Targets: {}", target_names.join(", "));

    let result = if concurrent {
        println!("  ℹ Rendering entities concurrently");
        generator.generate_concurrent(Arc::new(domain), &targets).await
    } else {
        generator.generate(&domain, &targets)
    }
    .map_err(|e| format!("Generation halted: {}", e))?;

    let manifest = result
        .write_to(&output)
        .map_err(|e| format!("Failed to write artifacts: {}", e))?;
    println!("  ✓ Wrote {} files to {}", manifest.files.len(), output.display());

    if !manifest.is_success() {
        for error in &manifest.errors {
            println!("  ✗ {}", error);
        }
        if strict {
            return Err(format!("{} artifact(s) failed to render", manifest.errors.len()));
        }
        println!("  ⚠ {} artifact(s) failed to render", manifest.errors.len());
    }

    println!("✨ Code generation complete!");
    Ok(())
}

/// Print a diff summary, or the whole diff as JSON
fn diff_configs(source: PathBuf, target: PathBuf, json: bool, settings: &GeneratorSettings) -> Result<(), String> {
    let (_, _, diff) =
        diff_files(&source, &target, &settings.matching).map_err(|e| format!("Failed to diff configs: {}", e))?;

    if json {
        let text = serde_json::to_string_pretty(&diff).map_err(|e| format!("Failed to serialize diff: {}", e))?;
        println!("{}", text);
        return Ok(());
    }

    print_diff_summary(&diff);
    Ok(())
}

fn describe_field_change(change: &FieldChange) -> String {
    match change {
        FieldChange::Added { name, field_type } => format!("+ {} ({})", name, field_type),
        FieldChange::Removed { name, field_type } => format!("- {} ({})", name, field_type),
        FieldChange::TypeChanged { name, from, to } => format!("~ {}: {} → {}", name, from, to),
        FieldChange::Renamed { from, to, score, .. } => format!("↪ {} → {} ({:.2})", from, to, score),
        FieldChange::ConstraintChanged { name, required, unique } => {
            let mut parts = Vec::new();
            if let Some((was, now)) = required {
                parts.push(format!("required {} → {}", was, now));
            }
            if let Some((was, now)) = unique {
                parts.push(format!("unique {} → {}", was, now));
            }
            format!("~ {}: {}", name, parts.join(", "))
        }
    }
}

fn describe_relationship_change(change: &RelationshipChange) -> String {
    match change {
        RelationshipChange::Added { relationship } => {
            format!("+ {} → {}", relationship.name, relationship.target_entity)
        }
        RelationshipChange::Removed { relationship } => {
            format!("- {} → {}", relationship.name, relationship.target_entity)
        }
        RelationshipChange::Retargeted { before, after } => {
            format!("~ {}: {} → {}", after.name, before.target_entity, after.target_entity)
        }
        RelationshipChange::CardinalityChanged { before, after } => {
            format!("~ {}: {} → {}", after.name, before.kind.as_str(), after.kind.as_str())
        }
        RelationshipChange::Renamed { before, after } => format!("↪ {} → {}", before.name, after.name),
    }
}

fn describe_config_change(change: &ConfigChange) -> String {
    match change {
        ConfigChange::NavigationAdded { item } => format!("+ navigation '{}'", item.label),
        ConfigChange::NavigationRemoved { item } => format!("- navigation '{}'", item.label),
        ConfigChange::NavigationChanged { after, .. } => format!("~ navigation '{}'", after.label),
        ConfigChange::MetricAdded { metric } => format!("+ metric '{}'", metric.name),
        ConfigChange::MetricRemoved { metric } => format!("- metric '{}'", metric.name),
        ConfigChange::MetricChanged { after, .. } => format!("~ metric '{}'", after.name),
    }
}

fn print_diff_summary(diff: &ConfigDiff) {
    println!(
        "🔍 {} {} → {} {}",
        diff.source_domain, diff.source_version, diff.target_domain, diff.target_version
    );
    if diff.is_empty() {
        println!("  ✓ No structural differences");
        return;
    }

    println!("\n📋 Entities:");
    for m in &diff.entity_matches {
        if m.renamed || m.table_renamed {
            println!("  ↪ {} → {} ({:.2})", m.source, m.target, m.score);
        } else {
            println!("  = {} ({:.2})", m.source, m.score);
        }
        if let Some(fields) = diff.field_diff(&m.source) {
            for change in &fields.changes {
                println!("      {}", describe_field_change(change));
            }
        }
        if let Some(relationships) = diff.relationship_diff(&m.source) {
            for change in &relationships.changes {
                println!("      {}", describe_relationship_change(change));
            }
        }
    }
    for name in &diff.unmatched_target {
        println!("  + {}", name);
    }
    for name in &diff.unmatched_source {
        println!("  - {}", name);
    }

    if !diff.config_changes.is_empty() {
        println!("\n🧭 Navigation and dashboard:");
        for change in &diff.config_changes {
            println!("  {}", describe_config_change(change));
        }
    }

    if !diff.warnings.is_empty() {
        println!("\n⚠ Warnings:");
        for warning in &diff.warnings {
            println!("  ⚠ {}", warning);
        }
    }
}

/// Write the adaptation manual to a file, or to stdout
fn write_manual(
    source: PathBuf,
    target: PathBuf,
    output: Option<PathBuf>,
    settings: &GeneratorSettings,
) -> Result<(), String> {
    let (source_config, target_config, diff) =
        diff_files(&source, &target, &settings.matching).map_err(|e| format!("Failed to diff configs: {}", e))?;
    let generator = build_generator(settings.templates.as_deref())?;
    let manual = generate_manual_with(&generator, &diff, &source_config, &target_config)
        .map_err(|e| format!("Failed to build manual: {}", e))?;
    let markdown = render_markdown(&manual);

    match output {
        Some(path) => {
            println!(
                "📖 Adapting {} → {}...",
                manual.source_domain, manual.target_domain
            );
            write_artifact(&path, &markdown).map_err(|e| format!("Failed to write manual: {}", e))?;
            println!(
                "  ✓ {} steps, about {} minutes",
                manual.steps.len(),
                manual.total_minutes
            );
            for warning in &manual.warnings {
                println!("  ⚠ {}", warning);
            }
            println!("✨ Manual written to {}", path.display());
        }
        None => print!("{}", markdown),
    }
    Ok(())
}
