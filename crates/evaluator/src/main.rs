//! `bugeval`: score a bug detector's output against a ground truth catalog.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use bugeval_core::{Config, EmbeddingProviderKind};
use clap::{Parser, Subcommand};
use evaluator::{
  Evaluator, GroundTruthStore, parse_detections,
  reports::{ComparisonReport, generate_reports},
};
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bugeval")]
#[command(about = "Evaluate bug detection output against ground truth")]
#[command(version)]
struct Cli {
  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Config file (defaults to ./.bugeval.toml, then the user config)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Evaluate detector output and write JSON and Markdown reports
  Evaluate {
    /// Ground truth catalog (JSON); falls back to evaluation.ground_truth in config
    #[arg(short, long)]
    ground_truth: Option<PathBuf>,

    /// Detector output: a JSON array, an object with `bugs`, or a raw model response
    #[arg(short, long)]
    detections: PathBuf,

    /// Output directory for reports
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Name for this evaluation run
    #[arg(long)]
    name: Option<String>,

    /// Embedding provider override (ollama or hashing)
    #[arg(long)]
    provider: Option<EmbeddingProviderKind>,
  },

  /// Compare two evaluation reports for regressions
  Compare {
    /// Baseline report (JSON)
    baseline: PathBuf,

    /// Current report (JSON)
    current: PathBuf,

    /// Regression threshold percentage
    #[arg(short, long, default_value = "10")]
    threshold: f64,

    /// Output comparison report
    #[arg(short, long)]
    output: Option<PathBuf>,
  },

  /// Load a ground truth catalog and summarize it
  Validate {
    /// Ground truth catalog (JSON)
    ground_truth: PathBuf,
  },

  /// Write a commented default config file
  InitConfig {
    /// Destination (defaults to ./.bugeval.toml)
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(long)]
    force: bool,
  },
}

fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  // Setup logging (RUST_LOG overrides --verbose)
  let directives = std::env::var("RUST_LOG").unwrap_or_default();
  tracing_subscriber::fmt()
    .with_env_filter(log_filter(cli.verbose, &directives))
    .with_target(false)
    .init();

  match cli.command {
    Commands::Evaluate {
      ground_truth,
      detections,
      output,
      name,
      provider,
    } => {
      let config = load_config(cli.config.as_deref())?;
      evaluate(config, ground_truth, detections, output, name, provider)
    }
    Commands::Compare {
      baseline,
      current,
      threshold,
      output,
    } => compare(baseline, current, threshold, output),
    Commands::Validate { ground_truth } => validate(&ground_truth),
    Commands::InitConfig { path, force } => init_config(path, force),
  }
}

fn log_filter(verbose: bool, directives: &str) -> EnvFilter {
  let level = if verbose { Level::DEBUG } else { Level::INFO };
  EnvFilter::builder()
    .with_default_directive(level.into())
    .parse_lossy(directives)
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
  match explicit {
    Some(path) => Ok(Config::load_from(path)?),
    None => {
      let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
      Ok(Config::load_for_dir(&cwd))
    }
  }
}

fn evaluate(
  mut config: Config,
  ground_truth: Option<PathBuf>,
  detections: PathBuf,
  output: Option<PathBuf>,
  name: Option<String>,
  provider: Option<EmbeddingProviderKind>,
) -> anyhow::Result<()> {
  let Some(ground_truth) = ground_truth.or(config.evaluation.ground_truth.take()) else {
    bail!("No ground truth given: pass --ground-truth or set evaluation.ground_truth in config");
  };
  if let Some(kind) = provider {
    config.embedding.provider = kind;
  }

  let provider = embedding::provider_from_config(&config.embedding).context("Failed to create embedding provider")?;
  if !provider.is_available() {
    warn!(
      "Embedding provider {} is not reachable; semantic scores will fall back to 0.0",
      provider.identity()
    );
  }

  let evaluator = Evaluator::from_path(&ground_truth, provider)?;

  let raw = std::fs::read_to_string(&detections)
    .with_context(|| format!("Failed to read detections from {}", detections.display()))?;
  let issues = parse_detections(&raw).with_context(|| format!("Invalid detections in {}", detections.display()))?;
  info!("Parsed {} detections from {}", issues.len(), detections.display());

  let metrics = evaluator.evaluate(&issues);

  let output_dir = output.unwrap_or(config.evaluation.output_dir);
  let run_name = name.unwrap_or_else(|| chrono::Utc::now().format("eval-%Y%m%d-%H%M%S").to_string());
  let (json_path, md_path) = generate_reports(&metrics, &config.report, &output_dir, &run_name)?;

  info!("JSON report: {}", json_path.display());
  info!("Markdown report: {}", md_path.display());
  Ok(())
}

fn compare(baseline: PathBuf, current: PathBuf, threshold: f64, output: Option<PathBuf>) -> anyhow::Result<()> {
  info!(
    "Comparing {} vs {} (threshold: {:.0}%)",
    baseline.display(),
    current.display(),
    threshold
  );

  let comparison = ComparisonReport::from_files(&baseline, &current, threshold)?;
  if comparison.provider_mismatch {
    warn!(
      "Embedding providers differ ({} vs {}); scores are not directly comparable",
      comparison.baseline_provider, comparison.current_provider
    );
  }

  println!("{}", comparison.to_markdown());

  if let Some(output) = output {
    comparison.save(&output)?;
    info!("Comparison saved to: {}", output.display());
  }

  if !comparison.summary.passes {
    std::process::exit(1);
  }
  Ok(())
}

fn validate(path: &Path) -> anyhow::Result<()> {
  let store = GroundTruthStore::load(path)?;

  info!("{} bugs across {} files", store.len(), store.files_with_bugs());
  for (severity, count) in store.severities() {
    info!("  severity {}: {}", severity, count);
  }
  for (category, count) in store.categories() {
    info!("  category {}: {}", category, count);
  }
  Ok(())
}

fn init_config(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
  let path = match path {
    Some(path) => path,
    None => Config::project_config_path(&std::env::current_dir().context("Failed to resolve working directory")?),
  };

  if path.exists() && !force {
    bail!("{} already exists (use --force to overwrite)", path.display());
  }
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
  }

  std::fs::write(&path, Config::generate_template()).with_context(|| format!("Failed to write {}", path.display()))?;
  info!("Wrote config template to {}", path.display());
  Ok(())
}
