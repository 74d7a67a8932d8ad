//! Comparison and regression detection between evaluation runs.

use std::{fmt::Write as _, path::Path};

use serde::{Deserialize, Serialize};

use super::json::EvaluationReport;
use crate::Result;

/// A metric that moved by at least the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricChange {
  pub metric: String,
  pub baseline: f64,
  pub current: f64,
  pub change_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
  pub metrics_compared: usize,
  pub regressed: usize,
  pub improved: usize,
  pub unchanged: usize,
  /// No metric regressed beyond the threshold
  pub passes: bool,
}

/// Comparison report between two evaluation runs. All compared metrics are higher-is-better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
  pub baseline_timestamp: String,
  pub current_timestamp: String,
  pub threshold_percent: f64,
  pub baseline_provider: String,
  pub current_provider: String,
  /// Scores from different embedding providers have different distributions
  pub provider_mismatch: bool,
  pub regressions: Vec<MetricChange>,
  pub improvements: Vec<MetricChange>,
  pub summary: ComparisonSummary,
}

impl ComparisonReport {
  pub fn compare(baseline: &EvaluationReport, current: &EvaluationReport, threshold_percent: f64) -> Self {
    let mut metrics = vec![
      ("precision".to_string(), baseline.summary.precision, current.summary.precision),
      ("recall".to_string(), baseline.summary.recall, current.summary.recall),
      ("f1_score".to_string(), baseline.summary.f1_score, current.summary.f1_score),
    ];
    for (category, now) in &current.by_category {
      if let Some(before) = baseline.by_category.get(category) {
        metrics.push((format!("category.{}.recall", category), before.recall, now.recall));
      }
    }

    let mut regressions = Vec::new();
    let mut improvements = Vec::new();
    for (metric, before, now) in &metrics {
      if let Some(change) = Self::compare_metric(metric, *before, *now, threshold_percent) {
        if change.change_percent < 0.0 {
          regressions.push(change);
        } else {
          improvements.push(change);
        }
      }
    }

    let baseline_provider = baseline.metadata.embedding_provider.clone();
    let current_provider = current.metadata.embedding_provider.clone();
    let compared = metrics.len();
    let changed = regressions.len() + improvements.len();

    Self {
      baseline_timestamp: baseline.metadata.timestamp.to_rfc3339(),
      current_timestamp: current.metadata.timestamp.to_rfc3339(),
      threshold_percent,
      provider_mismatch: baseline_provider != current_provider,
      baseline_provider,
      current_provider,
      summary: ComparisonSummary {
        metrics_compared: compared,
        regressed: regressions.len(),
        improved: improvements.len(),
        unchanged: compared.saturating_sub(changed),
        passes: regressions.is_empty(),
      },
      regressions,
      improvements,
    }
  }

  fn compare_metric(metric: &str, baseline: f64, current: f64, threshold: f64) -> Option<MetricChange> {
    if baseline == 0.0 && current == 0.0 {
      return None;
    }

    let change_percent = if baseline != 0.0 {
      ((current - baseline) / baseline) * 100.0
    } else {
      100.0
    };

    if change_percent.abs() < threshold {
      return None;
    }

    Some(MetricChange {
      metric: metric.to_string(),
      baseline,
      current,
      change_percent,
    })
  }

  /// Load comparison between two report files.
  pub fn from_files(baseline_path: &Path, current_path: &Path, threshold: f64) -> Result<Self> {
    let baseline = EvaluationReport::load(baseline_path)?;
    let current = EvaluationReport::load(current_path)?;
    Ok(Self::compare(&baseline, &current, threshold))
  }

  pub fn save(&self, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(self)?;
    std::fs::write(path, json)?;
    Ok(())
  }

  pub fn to_markdown(&self) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Evaluation Comparison");
    let _ = writeln!(out);
    let _ = writeln!(out, "**Baseline:** {} ({})", self.baseline_timestamp, self.baseline_provider);
    let _ = writeln!(out, "**Current:** {} ({})", self.current_timestamp, self.current_provider);
    let _ = writeln!(out, "**Threshold:** {:.1}%", self.threshold_percent);
    let _ = writeln!(out);

    if self.provider_mismatch {
      let _ = writeln!(
        out,
        "> ⚠️ Embedding providers differ; score changes may reflect the provider rather than the detector."
      );
      let _ = writeln!(out);
    }

    let status = if self.summary.passes { "✅ PASS" } else { "❌ FAIL" };
    let _ = writeln!(out, "## Summary: {}", status);
    let _ = writeln!(out);
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|--------|-------|");
    let _ = writeln!(out, "| Compared | {} |", self.summary.metrics_compared);
    let _ = writeln!(out, "| Regressed | {} |", self.summary.regressed);
    let _ = writeln!(out, "| Improved | {} |", self.summary.improved);
    let _ = writeln!(out, "| Unchanged | {} |", self.summary.unchanged);
    let _ = writeln!(out);

    Self::write_changes(&mut out, "Regressions ❌", &self.regressions);
    Self::write_changes(&mut out, "Improvements ✅", &self.improvements);

    out
  }

  fn write_changes(out: &mut String, title: &str, changes: &[MetricChange]) {
    if changes.is_empty() {
      return;
    }

    let _ = writeln!(out, "## {}", title);
    let _ = writeln!(out);
    let _ = writeln!(out, "| Metric | Baseline | Current | Change |");
    let _ = writeln!(out, "|--------|----------|---------|--------|");
    for c in changes {
      let _ = writeln!(
        out,
        "| {} | {:.3} | {:.3} | {:+.1}% |",
        c.metric, c.baseline, c.current, c.change_percent
      );
    }
    let _ = writeln!(out);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::reports::json::tests::sample_metrics;

  fn make_report(precision: f64, recall: f64, security_recall: f64) -> EvaluationReport {
    let mut report = EvaluationReport::from_metrics(&sample_metrics(), None);
    report.summary.precision = precision;
    report.summary.recall = recall;
    report.summary.f1_score = crate::metrics::f1_score(precision, recall);
    if let Some(bucket) = report.by_category.get_mut("security") {
      bucket.recall = security_recall;
    }
    report
  }

  #[test]
  fn test_no_regression() {
    let baseline = make_report(0.8, 0.5, 1.0);
    let current = make_report(0.8, 0.5, 1.0);

    let comparison = ComparisonReport::compare(&baseline, &current, 10.0);

    assert!(comparison.regressions.is_empty());
    assert!(comparison.improvements.is_empty());
    assert!(comparison.summary.passes);
    assert!(!comparison.provider_mismatch);
  }

  #[test]
  fn test_regression_detected() {
    let baseline = make_report(0.8, 0.5, 1.0);
    let current = make_report(0.6, 0.3, 0.5);

    let comparison = ComparisonReport::compare(&baseline, &current, 10.0);

    assert!(!comparison.summary.passes);
    let metrics: Vec<_> = comparison.regressions.iter().map(|r| r.metric.as_str()).collect();
    assert!(metrics.contains(&"precision"));
    assert!(metrics.contains(&"recall"));
    assert!(metrics.contains(&"f1_score"));
    assert!(metrics.contains(&"category.security.recall"));
  }

  #[test]
  fn test_improvement_detected() {
    let baseline = make_report(0.6, 0.3, 0.5);
    let current = make_report(0.8, 0.5, 1.0);

    let comparison = ComparisonReport::compare(&baseline, &current, 10.0);

    assert!(!comparison.improvements.is_empty());
    assert!(comparison.summary.passes);
  }

  #[test]
  fn test_threshold_filtering() {
    let baseline = make_report(0.80, 0.50, 1.0);
    let current = make_report(0.76, 0.50, 1.0); // precision 5% worse

    assert!(ComparisonReport::compare(&baseline, &current, 10.0).regressions.is_empty());
    let comparison = ComparisonReport::compare(&baseline, &current, 4.0);
    assert!(comparison.regressions.iter().any(|r| r.metric == "precision"));
  }

  #[test]
  fn test_from_zero_baseline() {
    let baseline = make_report(0.0, 0.0, 0.0);
    let current = make_report(0.5, 0.0, 0.0);

    let comparison = ComparisonReport::compare(&baseline, &current, 10.0);

    assert_eq!(comparison.improvements[0].metric, "precision");
    assert_eq!(comparison.improvements[0].change_percent, 100.0);
  }

  #[test]
  fn test_provider_mismatch() {
    let baseline = make_report(0.8, 0.5, 1.0);
    let mut current = make_report(0.8, 0.5, 1.0);
    current.metadata.embedding_provider = "ollama:nomic-embed-text".to_string();

    let comparison = ComparisonReport::compare(&baseline, &current, 10.0);

    assert!(comparison.provider_mismatch);
    assert!(comparison.to_markdown().contains("Embedding providers differ"));
  }

  #[test]
  fn test_markdown_output() {
    let baseline = make_report(0.8, 0.5, 1.0);
    let current = make_report(0.6, 0.3, 0.5);

    let md = ComparisonReport::compare(&baseline, &current, 10.0).to_markdown();

    assert!(md.contains("# Evaluation Comparison"));
    assert!(md.contains("FAIL"));
    assert!(md.contains("Regressions"));
  }
}
