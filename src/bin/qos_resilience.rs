use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use qos_resilience::catalog::{SpecificationCatalog, SpecificationSource};
use qos_resilience::output::{create_timestamped_output_dir, write_analysis, write_series_csv};
use qos_resilience::sim::{generate_series, SimConfig};
use qos_resilience::{
    AnalysisConfig, EventDetector, MeasurementSeries, Specification, SpecificationOverlay,
};

#[derive(Debug, Parser)]
#[command(name = "qos-resilience")]
#[command(about = "Resilience-event detection and specification envelopes for QoS series")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Detect resilience events and build the specification envelope.
    Analyze(AnalyzeArgs),
    /// Generate a synthetic QoS series.
    Simulate(SimulateArgs),
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    /// Series file (.csv or .json).
    #[arg(long)]
    series: PathBuf,

    /// Analysis config (.toml or .json).
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, requires = "max_recovery_time")]
    max_initial_loss: Option<f64>,

    #[arg(long, requires = "max_initial_loss")]
    max_recovery_time: Option<f64>,

    /// Specification catalog (JSON), used with --service and --cause.
    #[arg(long, conflicts_with = "max_initial_loss", requires_all = ["service", "cause"])]
    catalog: Option<PathBuf>,

    #[arg(long)]
    service: Option<String>,

    #[arg(long)]
    cause: Option<String>,

    #[arg(long, default_value = "output-qos-resilience")]
    outdir: PathBuf,
}

#[derive(Debug, Args)]
struct SimulateArgs {
    /// Simulation config (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    out: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = try_main() {
        eprintln!("qos-resilience failed: {error:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    match Cli::parse().command {
        Command::Analyze(args) => analyze(args),
        Command::Simulate(args) => simulate(args),
    }
}

fn resolve_specification(args: &AnalyzeArgs) -> Result<Option<Specification>> {
    if let (Some(loss), Some(recovery)) = (args.max_initial_loss, args.max_recovery_time) {
        return Specification::new(loss, recovery)
            .map(Some)
            .context("invalid specification arguments");
    }

    let Some(path) = &args.catalog else {
        bail!("provide --max-initial-loss/--max-recovery-time or --catalog/--service/--cause");
    };
    let catalog = SpecificationCatalog::from_json_file(path)
        .with_context(|| format!("failed to load catalog: {}", path.display()))?;

    let (Some(service), Some(cause)) = (&args.service, &args.cause) else {
        bail!("--catalog requires --service and --cause");
    };
    Ok(catalog.fetch(service, cause)?)
}

fn analyze(args: AnalyzeArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("failed to load config: {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    let series = MeasurementSeries::from_file(&args.series)
        .with_context(|| format!("failed to load series: {}", args.series.display()))?;

    let Some(spec) = resolve_specification(&args)? else {
        info!(phase = "analyze", "no specification declared, nothing to overlay");
        return Ok(());
    };

    let detector = EventDetector::from_config(&config);
    let overlay = SpecificationOverlay::compute(series.as_slice(), &detector, spec);

    let output_dir = create_timestamped_output_dir(&args.outdir)?;
    write_analysis(&output_dir, series.len(), &config, &overlay)
        .with_context(|| format!("failed to write results to {}", output_dir.display()))?;

    for (event, assessment) in overlay.events.iter().zip(&overlay.assessments) {
        println!(
            "event at t={:.3}: qos={:.2} deadline={:.3} transient_end={:.3} compliant={}",
            event.initial_loss_time,
            event.initial_loss_qos,
            event.recovery_deadline,
            event.transient_end,
            assessment.is_compliant()
        );
    }
    println!("Output directory: {}", output_dir.display());
    Ok(())
}

fn simulate(args: SimulateArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SimConfig::from_toml_file(path)
            .with_context(|| format!("failed to load sim config: {}", path.display()))?,
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let series = generate_series(&config)?;
    write_series_csv(&args.out, series.as_slice())
        .with_context(|| format!("failed to write series: {}", args.out.display()))?;

    info!(phase = "simulate", samples = series.len(), seed = config.seed, "series written");
    println!("Series written to {}", args.out.display());
    Ok(())
}
