use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use todflow_core::{FailurePolicy, PipelineConfig};
use todflow_routines::{all_routine_descriptors, build_pipeline, build_routine};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "TOD pipeline runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the configured pipeline over its unit catalog
    Run(RunArgs),
    /// Parse the config and report what would run, without executing
    Check(CheckArgs),
    /// List the registered routine kinds
    Routines,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Pipeline configuration file
    #[arg(long, default_value = "todflow.toml")]
    config: PathBuf,
    /// Override the configured base data directory
    #[arg(long)]
    base_dir: Option<PathBuf>,
    /// Abort the whole run on the first routine failure instead of skipping
    /// the failing unit
    #[arg(long)]
    abort_on_error: bool,
    /// Override the catalog start pointer
    #[arg(long)]
    start: Option<usize>,
    /// Override the catalog end pointer
    #[arg(long)]
    end: Option<usize>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Pipeline configuration file
    #[arg(long, default_value = "todflow.toml")]
    config: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Check(args) => handle_check(args),
        Command::Routines => handle_routines(),
    }
}

fn handle_run(args: RunArgs) -> Result<()> {
    dotenvy::dotenv().ok();

    let mut config = load_config(&args.config)?;
    apply_overrides(&mut config, &args);

    let mut pipeline = build_pipeline(&config)?;
    info!(
        units = pipeline.unit_count(),
        routines = pipeline.routine_count(),
        base_dir = %config.base_dir.display(),
        "starting pipeline run"
    );

    let summary = pipeline.run()?;
    info!(
        completed = summary.completed(),
        vetoed = summary.vetoed(),
        failed = summary.failed(),
        "run complete"
    );
    Ok(())
}

fn handle_check(args: CheckArgs) -> Result<()> {
    dotenvy::dotenv().ok();

    let config = load_config(&args.config)?;
    let units = config.resolve_units()?;
    for spec in &config.routines {
        build_routine(&spec.kind, &spec.options)?;
    }

    println!(
        "config ok: {} routine(s) over {} unit(s), base dir {}",
        config.routines.len(),
        units.len(),
        config.base_dir.display()
    );
    for spec in &config.routines {
        println!("  {}", spec.kind);
    }
    Ok(())
}

fn handle_routines() -> Result<()> {
    for desc in all_routine_descriptors() {
        println!("{:<18} {}", desc.kind, desc.description);
    }
    Ok(())
}

fn load_config(path: &PathBuf) -> Result<PipelineConfig> {
    PipelineConfig::load(path)
        .with_context(|| format!("loading pipeline config {}", path.display()))
}

fn apply_overrides(config: &mut PipelineConfig, args: &RunArgs) {
    if let Some(dir) = &args.base_dir {
        config.base_dir = dir.clone();
    } else if let Ok(dir) = env::var("TODFLOW_DATA_DIR") {
        config.base_dir = PathBuf::from(dir);
    }
    if args.abort_on_error {
        config.failure_policy = FailurePolicy::AbortRun;
    }
    if args.start.is_some() {
        config.units.start = args.start;
    }
    if args.end.is_some() {
        config.units.end = args.end;
    }
}
