use anyhow::{Context, Result};
use geopipe::cli::commands::{ListCommand, ValidateCommand};
use geopipe::cli::output::{format_validation_errors, style, CHECK, CROSS, INFO};
use geopipe::cli::{Cli, Command};
use geopipe::core::config::PipelineProcessConfig;
use geopipe::core::validation::Validator;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Validate(cmd) => validate_config(cmd)?,
        Command::List(cmd) => list_pipelines(cmd)?,
    }

    Ok(())
}

fn validate_config(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipeline configuration...", INFO);

    let config = PipelineProcessConfig::from_file(&cmd.file)?;

    // The deployed process set is an application property; the CLI checks
    // structure and references only.
    let result = Validator::new().validate(&config);

    if result.has_errors() {
        println!("{} Validation failed:", CROSS);
        println!("{}", format_validation_errors(result.errors()));

        if cmd.json {
            let data = serde_json::json!({ "errors": result.errors() });
            println!("\n{}", serde_json::to_string_pretty(&data)?);
        }
        std::process::exit(1);
    }

    println!("{} Pipeline configuration is valid!", CHECK);
    println!("  Processes: {}", style(config.processes.len()).cyan());
    println!("  Pipelines: {}", style(config.pipelines.len()).cyan());

    if cmd.json {
        let json = serde_json::to_string_pretty(&config)?;
        println!("\n{}", json);
    }
    Ok(())
}

fn list_pipelines(cmd: &ListCommand) -> Result<()> {
    let config = PipelineProcessConfig::from_file(&cmd.file)?;

    if config.pipelines.is_empty() {
        println!("{} No pipelines declared in {}", INFO, cmd.file);
        return Ok(());
    }

    if cmd.json {
        let data: Vec<_> = config
            .pipelines
            .iter()
            .map(|pipeline| {
                serde_json::json!({
                    "id": pipeline.id,
                    "displayName": pipeline.display_name,
                    "steps": pipeline.steps.len(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "pipelines": data }))?
        );
        return Ok(());
    }

    println!("{} Declared pipelines:", INFO);
    for pipeline in &config.pipelines {
        let name = pipeline
            .display_name
            .get(&cmd.lang)
            .or_else(|| pipeline.display_name.values().next())
            .cloned()
            .unwrap_or_else(|| pipeline.id.clone());
        println!(
            "  {} - {} ({} steps)",
            style(&pipeline.id).bold(),
            name,
            style(pipeline.steps.len()).cyan()
        );
    }

    Ok(())
}
