use anyhow::{Context, Result};
use medallion::cli::commands::{IngestCommand, InspectCommand, SchemaArgs, SheetsCommand, SourceArgs, ValidateCommand};
use medallion::cli::output::*;
use medallion::cli::{Cli, Command};
use medallion::core::{Pipeline, PipelineBuilder, PipelineConfig, Step, TaskType};
use medallion::execution::{ExecutionInput, PipelineExecutor};
use medallion::ingest::{ExtractOptions, MetadataBuilder, SchemaConfig};
use medallion::steps::{CleanStep, ExportStep, LoadSourceStep};
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Ingest(cmd) => ingest(cmd)?,
        Command::Validate(cmd) => validate(cmd)?,
        Command::Inspect(cmd) => inspect(cmd)?,
        Command::Sheets(cmd) => list_sheets(cmd)?,
    }

    Ok(())
}

fn extract_options(source: &SourceArgs) -> ExtractOptions {
    let mut options = ExtractOptions::new();
    if let Some(sheet) = &source.sheet {
        options = options.with_sheet(sheet.clone());
    }
    if let Some(row) = source.header_row {
        options = options.with_header_row(row);
    }
    options
}

fn load_schema(cmd: &SchemaArgs) -> Result<SchemaConfig> {
    SchemaConfig::from_yaml_file(&cmd.schema, cmd.section.as_deref())
        .with_context(|| format!("Failed to load schema from {}", cmd.schema.display()))
}

fn ingest_pipeline(cmd: &IngestCommand, schema: SchemaConfig) -> Result<Pipeline> {
    let config = match &cmd.pipeline {
        Some(path) => PipelineConfig::from_file(path).context("Failed to load pipeline config")?,
        None => PipelineConfig::new("ingest", TaskType::Transform),
    };

    let mut options = extract_options(&cmd.source);
    if let Some(batch_id) = &cmd.batch_id {
        options = options.with_batch_id(batch_id.clone());
    }

    let load = LoadSourceStep::new(&cmd.source.file).with_options(options);
    let mut clean = CleanStep::new(schema);
    if cmd.no_validate {
        clean = clean.without_validation();
    }

    let mut builder = PipelineBuilder::from_config(config)
        .add_step(
            Step::task("load", load)
                .with_description("Read the source file and capture it as text")
                .with_retries(cmd.retries),
        )
        .add_step(Step::task("clean", clean).with_description("Map, cast and quality-check columns"));

    if let Some(output) = &cmd.output {
        builder = builder.add_step(Step::task("export", ExportStep::new(output)).with_description("Write the cleaned table"));
    }

    Ok(builder.build())
}

fn ingest(cmd: &IngestCommand) -> Result<()> {
    let schema = load_schema(&cmd.schema)?;
    let pipeline = ingest_pipeline(cmd, schema)?;
    let name = pipeline.name().to_string();

    if !cmd.json {
        println!(
            "{} Ingesting {} with pipeline {}",
            ROCKET,
            style(cmd.source.file.display()).bold(),
            style(&name).cyan()
        );
    }

    let mut executor = PipelineExecutor::new();
    executor.register_pipeline(pipeline);

    let mut input = ExecutionInput::new();
    for (key, value) in &cmd.variable {
        input = input.with_variable(key.clone(), value.clone());
    }
    let run = executor.execute_pipeline(&name, input)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&run.summary)?);
    } else {
        println!("{}", format_run_summary(&run.summary));
    }

    if run.summary.success {
        if !cmd.json {
            println!(
                "\n{} {} completed {} ({} rows)",
                CHECK,
                style(&name).bold(),
                style("successfully").green(),
                run.context.data().height()
            );
        }
    } else {
        if !cmd.json {
            println!("\n{} {} {}", CROSS, style(&name).bold(), style("failed").red());
        }
        error!("Pipeline {} failed", name);
        std::process::exit(1);
    }

    Ok(())
}

fn validate(cmd: &ValidateCommand) -> Result<()> {
    let schema = load_schema(&cmd.schema)?;
    let builder = MetadataBuilder::default();
    let raw = builder
        .extract(&cmd.source.file, &extract_options(&cmd.source))
        .with_context(|| format!("Failed to read {}", cmd.source.file.display()))?;

    let report = builder.validate(&raw, &schema);
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} Validating {} ({} rows)", INFO, style(cmd.source.file.display()).bold(), raw.height());
        println!("{}", format_validation_report(&report));
    }

    if !report.valid {
        std::process::exit(1);
    }
    Ok(())
}

fn inspect(cmd: &InspectCommand) -> Result<()> {
    let preview = MetadataBuilder::default()
        .preview(&cmd.source.file, &extract_options(&cmd.source), cmd.rows)
        .with_context(|| format!("Failed to read {}", cmd.source.file.display()))?;

    println!("{}", format_preview(&preview));
    Ok(())
}

fn list_sheets(cmd: &SheetsCommand) -> Result<()> {
    let sheets = MetadataBuilder::default()
        .sheet_names(&cmd.file)
        .with_context(|| format!("Failed to open {}", cmd.file.display()))?;

    if sheets.is_empty() {
        println!("{} No sheets found", WARN);
        return Ok(());
    }

    println!("{} Sheets in {}:", INFO, style(cmd.file.display()).bold());
    for (index, name) in sheets.iter().enumerate() {
        println!("  {} {}", style(index).dim(), style(name).bold());
    }
    Ok(())
}
