use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use processflow::utils::LoggingConfig;
use processflow::{
    EngineSettings, FormSubmission, ProcessEngine, ProcessEngineConfiguration, SubmitOutcome,
    SubmittedFormData,
};

#[derive(Parser)]
#[command(name = "processflow", version, about = "Process engine CLI", author)]
struct Cli {
    /// Engine settings file (JSON).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the definitions in a definitions file.
    Definitions {
        #[arg(long)]
        file: PathBuf,
    },
    /// Print the start form of a definition.
    Form {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        process_definition: String,
    },
    /// Submit a start form and print the resulting instance and its open tasks.
    Start {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        process_definition: String,
        #[arg(long)]
        business_key: Option<String>,
        /// Form property as `id=value`; repeatable.
        #[arg(long = "property", value_parser = parse_property)]
        properties: Vec<(String, String)>,
    },
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((id, value)) if !id.trim().is_empty() => {
            Ok((id.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected `id=value`, got `{raw}`")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    LoggingConfig::init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => EngineSettings::from_file(path)?,
        None => EngineSettings::default(),
    }
    .with_env_overrides()?;

    match cli.command {
        Command::Definitions { file } => handle_definitions(settings, file)?,
        Command::Form {
            file,
            process_definition,
        } => handle_form(settings, file, &process_definition).await?,
        Command::Start {
            file,
            process_definition,
            business_key,
            properties,
        } => handle_start(settings, file, &process_definition, business_key, properties).await?,
    }
    Ok(())
}

fn build_engine(settings: EngineSettings, file: PathBuf) -> anyhow::Result<ProcessEngine> {
    let engine = ProcessEngineConfiguration::from_settings(settings).build()?;
    engine
        .definitions()
        .deploy_file(&file)
        .with_context(|| format!("failed to deploy {}", file.display()))?;
    Ok(engine)
}

fn handle_definitions(settings: EngineSettings, file: PathBuf) -> anyhow::Result<()> {
    let engine = build_engine(settings, file)?;
    println!("{:<24} {:<20} {:<8} {}", "Id", "Key", "Version", "Name");
    for definition in engine.definitions().list() {
        println!(
            "{:<24} {:<20} {:<8} {}",
            definition.id,
            definition.key,
            definition.version,
            definition.name.clone().unwrap_or_default()
        );
    }
    Ok(())
}

async fn handle_form(
    settings: EngineSettings,
    file: PathBuf,
    process_definition: &str,
) -> anyhow::Result<()> {
    let engine = build_engine(settings, file)?;
    let form = engine
        .form_service()
        .get_form_data(None, Some(process_definition))
        .await?;
    println!("{}", serde_json::to_string_pretty(&form)?);
    Ok(())
}

async fn handle_start(
    settings: EngineSettings,
    file: PathBuf,
    process_definition: &str,
    business_key: Option<String>,
    properties: Vec<(String, String)>,
) -> anyhow::Result<()> {
    let engine = build_engine(settings, file)?;
    let properties: SubmittedFormData = properties
        .into_iter()
        .map(|(id, value)| (id, Some(value)))
        .collect();
    let submission = FormSubmission::for_start(process_definition, business_key, properties);

    let SubmitOutcome::Started(instance) = engine.form_service().submit_form(Some(submission)).await?
    else {
        bail!("start form submission did not create a process instance");
    };
    println!("{}", serde_json::to_string_pretty(&instance)?);

    let tasks = engine.tasks_for_process(&instance.id).await?;
    if !tasks.is_empty() {
        println!("{:<38} {:<20} {}", "Task", "Key", "Status");
        for task in tasks {
            println!(
                "{:<38} {:<20} {:?}",
                task.id, task.task_definition_key, task.status
            );
        }
    }
    engine.close()?;
    Ok(())
}
