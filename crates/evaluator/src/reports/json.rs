//! JSON report format for evaluation results.

use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  detection::DetectedIssue,
  ground_truth::GroundTruthBug,
  matching::MatchType,
  metrics::{BucketStats, ConfidenceInterval, EvaluationMetrics},
  scoring::{Signal, SignalScores},
};

/// Complete evaluation report. Floats are rounded to three decimals; match
/// scores are truncated instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
  pub summary: ReportSummary,
  pub analysis: ReportAnalysis,
  pub confidence: ReportConfidence,
  pub by_severity: BTreeMap<String, BucketStats>,
  pub by_category: BTreeMap<String, BucketStats>,
  pub matches: Vec<ReportMatch>,
  pub false_positives: Vec<DetectedIssue>,
  pub false_negatives: Vec<GroundTruthBug>,
  pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
  pub precision: f64,
  pub recall: f64,
  pub f1_score: f64,
  pub true_positives: usize,
  pub false_positives: usize,
  pub false_negatives: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportAnalysis {
  pub total_ground_truth: usize,
  pub total_detected: usize,
  pub files_with_bugs: usize,
}

/// Wilson bounds at the stated confidence level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfidence {
  pub level: f64,
  pub precision: ConfidenceInterval,
  pub recall: ConfidenceInterval,
}

/// Ground truth fields worth showing next to a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruthSummary {
  pub bug_id: String,
  pub file_path: String,
  pub line_range: String,
  pub category: String,
  pub severity: String,
  pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMatch {
  pub detected: DetectedIssue,
  pub ground_truth: TruthSummary,
  pub match_score: f64,
  pub match_type: MatchType,
  pub reasons: Vec<Signal>,
  pub signals: SignalScores,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
  pub timestamp: DateTime<Utc>,
  pub version: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub run_name: Option<String>,
  /// Provider identity; scores from different providers are not comparable
  pub embedding_provider: String,
  /// Texts that fell back to a zero semantic score
  pub embedding_failures: usize,
}

pub(crate) fn round3(value: f64) -> f64 {
  (value * 1000.0).round() / 1000.0
}

/// Truncate to three decimals, so a reported score never rounds up past the
/// exact-match cutoff that its `match_type` was decided on.
pub(crate) fn floor3(value: f64) -> f64 {
  ((value * 1000.0) + 1e-6).floor() / 1000.0
}

fn round_interval(ci: ConfidenceInterval) -> ConfidenceInterval {
  ConfidenceInterval {
    lower: round3(ci.lower),
    upper: round3(ci.upper),
  }
}

fn round_buckets(buckets: &BTreeMap<String, BucketStats>) -> BTreeMap<String, BucketStats> {
  buckets
    .iter()
    .map(|(key, stats)| {
      (
        key.clone(),
        BucketStats {
          recall: round3(stats.recall),
          ..*stats
        },
      )
    })
    .collect()
}

fn round_signals(signals: &SignalScores) -> SignalScores {
  SignalScores {
    location: round3(signals.location),
    semantic: round3(signals.semantic),
    pattern: round3(signals.pattern),
    category: round3(signals.category),
    severity: round3(signals.severity),
  }
}

impl EvaluationReport {
  pub fn from_metrics(metrics: &EvaluationMetrics, run_name: Option<&str>) -> Self {
    let matches = metrics
      .matches
      .iter()
      .map(|m| ReportMatch {
        detected: m.detected.clone(),
        ground_truth: TruthSummary {
          bug_id: m.ground_truth.bug_id.clone(),
          file_path: m.ground_truth.file_path.clone(),
          line_range: m.ground_truth.line_range(),
          category: m.ground_truth.category.clone(),
          severity: m.ground_truth.severity.clone(),
          description: m.ground_truth.description.clone(),
        },
        match_score: floor3(m.score.total),
        match_type: m.match_type,
        reasons: m.score.reasons.clone(),
        signals: round_signals(&m.score.signals),
      })
      .collect();

    Self {
      summary: ReportSummary {
        precision: round3(metrics.precision),
        recall: round3(metrics.recall),
        f1_score: round3(metrics.f1_score),
        true_positives: metrics.true_positives,
        false_positives: metrics.false_positives,
        false_negatives: metrics.false_negatives,
      },
      analysis: ReportAnalysis {
        total_ground_truth: metrics.total_ground_truth,
        total_detected: metrics.total_detected,
        files_with_bugs: metrics.files_with_bugs,
      },
      confidence: ReportConfidence {
        level: 0.95,
        precision: round_interval(metrics.precision_ci),
        recall: round_interval(metrics.recall_ci),
      },
      by_severity: round_buckets(&metrics.by_severity),
      by_category: round_buckets(&metrics.by_category),
      matches,
      false_positives: metrics.unmatched_detections.clone(),
      false_negatives: metrics.missed_ground_truth.clone(),
      metadata: ReportMetadata {
        timestamp: metrics.evaluated_at,
        version: env!("CARGO_PKG_VERSION").to_string(),
        run_name: run_name.map(str::to_string),
        embedding_provider: metrics.embedding_provider.clone(),
        embedding_failures: metrics.embedding_failures,
      },
    }
  }

  /// Save report to a JSON file.
  pub fn save(&self, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(self)?;
    std::fs::write(path, json)?;
    Ok(())
  }

  /// Load report from a JSON file.
  pub fn load(path: &Path) -> Result<Self> {
    let json = std::fs::read_to_string(path)?;
    let report = serde_json::from_str(&json)?;
    Ok(report)
  }
}
