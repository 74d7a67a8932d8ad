//! Report generation for evaluation results.
//!
//! - JSON: machine-readable, stable shape for CI and comparison
//! - Markdown: human-readable summary
//! - Comparison: regression detection between runs

mod comparison;
mod json;
mod markdown;

use std::path::{Path, PathBuf};

use bugeval_core::ReportConfig;
pub use comparison::{ComparisonReport, ComparisonSummary, MetricChange};
pub use json::{EvaluationReport, ReportAnalysis, ReportConfidence, ReportMatch, ReportMetadata, ReportSummary, TruthSummary};
pub use markdown::MarkdownReport;

use crate::{EvalError, metrics::EvaluationMetrics};

/// Write `<run_name>.json` and `<run_name>.md` into `output_dir`.
pub fn generate_reports(
  metrics: &EvaluationMetrics,
  config: &ReportConfig,
  output_dir: &Path,
  run_name: &str,
) -> crate::Result<(PathBuf, PathBuf)> {
  if run_name.is_empty() || run_name.contains(['/', '\\']) {
    return Err(EvalError::Report(format!("Invalid run name: {:?}", run_name)));
  }

  std::fs::create_dir_all(output_dir)?;

  let report = EvaluationReport::from_metrics(metrics, Some(run_name));

  let json_path = output_dir.join(format!("{}.json", run_name));
  report.save(&json_path)?;

  let md_path = output_dir.join(format!("{}.md", run_name));
  MarkdownReport::from_report(&report, config).save(&md_path)?;

  Ok((json_path, md_path))
}
