//! Markdown report generation.

use std::{fmt::Write as _, path::Path};

use bugeval_core::ReportConfig;

use super::json::EvaluationReport;
use crate::{Result, metrics::BucketStats};

/// Performance is flagged when precision falls below this.
const PRECISION_CONCERN: f64 = 0.7;
/// Performance is flagged when recall falls below this.
const RECALL_CONCERN: f64 = 0.3;
const EXCERPT_CHARS: usize = 60;

/// Markdown report generator.
pub struct MarkdownReport {
  content: String,
}

impl MarkdownReport {
  pub fn from_report(report: &EvaluationReport, config: &ReportConfig) -> Self {
    let mut content = String::new();

    Self::write_header(&mut content, report);
    Self::write_summary(&mut content, report, config);
    Self::write_severity_table(&mut content, report);
    Self::write_category_table(&mut content, report);
    Self::write_sample_matches(&mut content, report, config);
    Self::write_missed_critical(&mut content, report, config);
    Self::write_false_positives(&mut content, report, config);

    Self { content }
  }

  fn write_header(out: &mut String, report: &EvaluationReport) {
    let meta = &report.metadata;
    let _ = writeln!(out, "# Bug Detection Evaluation Report");
    let _ = writeln!(out);
    if let Some(name) = &meta.run_name {
      let _ = writeln!(out, "**Run:** {}", name);
    }
    let _ = writeln!(out, "**Generated:** {}", meta.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "**Version:** {}", meta.version);
    let _ = writeln!(out, "**Embedding provider:** {}", meta.embedding_provider);
    let _ = writeln!(out);
  }

  fn write_summary(out: &mut String, report: &EvaluationReport, config: &ReportConfig) {
    let s = &report.summary;
    let a = &report.analysis;
    let ci = &report.confidence;

    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|--------|-------|");
    let _ = writeln!(out, "| Ground truth bugs | {} |", a.total_ground_truth);
    let _ = writeln!(out, "| Detected issues | {} |", a.total_detected);
    let _ = writeln!(out, "| Files with bugs | {} |", a.files_with_bugs);
    let _ = writeln!(out, "| True positives | {} |", s.true_positives);
    let _ = writeln!(out, "| False positives | {} |", s.false_positives);
    let _ = writeln!(out, "| False negatives | {} |", s.false_negatives);
    let _ = writeln!(
      out,
      "| **Precision** | {:.1}% (95% CI {:.1}%-{:.1}%) |",
      s.precision * 100.0,
      ci.precision.lower * 100.0,
      ci.precision.upper * 100.0
    );
    let _ = writeln!(
      out,
      "| **Recall** | {:.1}% (95% CI {:.1}%-{:.1}%) |",
      s.recall * 100.0,
      ci.recall.lower * 100.0,
      ci.recall.upper * 100.0
    );
    let _ = writeln!(out, "| **F1** | {:.1}% |", s.f1_score * 100.0);
    let _ = writeln!(out);

    if a.total_ground_truth < config.small_sample_warning {
      let _ = writeln!(
        out,
        "> ⚠️ Small sample size (n={}): results have high uncertainty.",
        a.total_ground_truth
      );
      let _ = writeln!(out);
    }
    if s.precision < PRECISION_CONCERN || s.recall < RECALL_CONCERN {
      let _ = writeln!(out, "> ⚠️ Performance concerns detected: consider reviewing the ground truth.");
      let _ = writeln!(out);
    }
    if report.metadata.embedding_failures > 0 {
      let _ = writeln!(
        out,
        "> ⚠️ {} texts could not be embedded; their semantic scores fell back to 0.",
        report.metadata.embedding_failures
      );
      let _ = writeln!(out);
    }
  }

  fn write_severity_table(out: &mut String, report: &EvaluationReport) {
    let _ = writeln!(out, "## By Severity");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Severity | Found | Total | Recall |");
    let _ = writeln!(out, "|----------|-------|-------|--------|");

    // Known levels first, most severe first, then anything else alphabetically
    let rank = |key: &str| match key {
      "critical" => 0,
      "major" => 1,
      "minor" => 2,
      _ => 3,
    };
    let mut rows: Vec<(&String, &BucketStats)> = report.by_severity.iter().collect();
    rows.sort_by_key(|(key, _)| rank(key.as_str()));

    for (severity, stats) in rows {
      Self::write_bucket_row(out, severity, stats);
    }
    let _ = writeln!(out);
  }

  fn write_category_table(out: &mut String, report: &EvaluationReport) {
    let _ = writeln!(out, "## By Category");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Category | Found | Total | Recall |");
    let _ = writeln!(out, "|----------|-------|-------|--------|");

    let mut rows: Vec<(&String, &BucketStats)> = report.by_category.iter().collect();
    rows.sort_by(|a, b| b.1.recall.total_cmp(&a.1.recall));

    for (category, stats) in rows {
      Self::write_bucket_row(out, category, stats);
    }
    let _ = writeln!(out);
  }

  fn write_bucket_row(out: &mut String, key: &str, stats: &BucketStats) {
    let _ = writeln!(
      out,
      "| {} | {} | {} | {:.1}% |",
      key,
      stats.found,
      stats.total,
      stats.recall * 100.0
    );
  }

  fn write_sample_matches(out: &mut String, report: &EvaluationReport, config: &ReportConfig) {
    if report.matches.is_empty() {
      return;
    }

    let _ = writeln!(out, "## Sample Matches");
    let _ = writeln!(out);
    for m in report.matches.iter().take(config.sample_matches) {
      let reasons: Vec<&str> = m.reasons.iter().map(|r| r.as_str()).collect();
      let _ = writeln!(out, "- **{}** → `{}`", or_placeholder(&m.detected.title, "No title"), m.ground_truth.bug_id);
      let _ = writeln!(out, "  - {}", excerpt(&m.ground_truth.description));
      let _ = writeln!(out, "  - Score: {:.3} ({})", m.match_score, m.match_type.as_str());
      let _ = writeln!(
        out,
        "  - Reasons: {}",
        if reasons.is_empty() { "none".to_string() } else { reasons.join(", ") }
      );
    }
    let _ = writeln!(out);
  }

  fn write_missed_critical(out: &mut String, report: &EvaluationReport, config: &ReportConfig) {
    let missed: Vec<_> = report
      .false_negatives
      .iter()
      .filter(|bug| bug.is_critical())
      .collect();
    if missed.is_empty() {
      return;
    }

    let _ = writeln!(out, "## Missed Critical Bugs ({})", missed.len());
    let _ = writeln!(out);
    for bug in missed.into_iter().take(config.missed_critical_limit) {
      let _ = writeln!(out, "- `{}`: {}", bug.bug_id, excerpt(&bug.description));
      let _ = writeln!(out, "  - File: {}, lines {}", bug.file_path, bug.line_range());
    }
    let _ = writeln!(out);
  }

  fn write_false_positives(out: &mut String, report: &EvaluationReport, config: &ReportConfig) {
    if report.false_positives.is_empty() {
      return;
    }

    let _ = writeln!(out, "## False Positives ({})", report.false_positives.len());
    let _ = writeln!(out);
    for issue in report.false_positives.iter().take(config.false_positive_limit) {
      let _ = writeln!(out, "- {}", or_placeholder(&issue.title, "No title"));
      let _ = writeln!(
        out,
        "  - File: {}, line: {}",
        or_placeholder(&issue.file, "unknown"),
        or_placeholder(&issue.line, "unknown")
      );
    }
    let _ = writeln!(out);
  }

  pub fn content(&self) -> &str {
    &self.content
  }

  pub fn save(&self, path: &Path) -> Result<()> {
    std::fs::write(path, &self.content)?;
    Ok(())
  }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
  if value.trim().is_empty() { placeholder } else { value }
}

/// First [`EXCERPT_CHARS`] characters, with an ellipsis when cut.
fn excerpt(text: &str) -> String {
  let mut chars = text.chars();
  let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
  if chars.next().is_some() { format!("{}...", head) } else { head }
}
