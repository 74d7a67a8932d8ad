//! Aggregate accuracy for one evaluation run.

mod accuracy;
mod confidence;

use std::collections::BTreeMap;

pub use accuracy::{f1_score, precision, recall};
use chrono::{DateTime, Utc};
pub use confidence::{ConfidenceInterval, Z_95, wilson_interval};
use serde::{Deserialize, Serialize};

use crate::{
  detection::DetectedIssue,
  ground_truth::{GroundTruthBug, GroundTruthStore, bucket_key},
  matching::{Assignment, MatchType},
  scoring::MatchScore,
};

/// A detection paired with the ground truth bug it was matched to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
  pub detected: DetectedIssue,
  pub ground_truth: GroundTruthBug,
  pub score: MatchScore,
  pub match_type: MatchType,
  /// Threshold the score had to clear
  pub threshold: f64,
}

/// Recall within one severity or category bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
  pub found: usize,
  pub total: usize,
  pub recall: f64,
}

/// Facts about the run that the assignment itself does not carry.
#[derive(Debug, Clone, Default)]
pub struct RunInfo {
  pub embedding_provider: String,
  pub embedding_failures: usize,
}

/// Immutable result of one evaluation. Built only by [`EvaluationMetrics::from_assignment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
  pub total_ground_truth: usize,
  pub total_detected: usize,
  pub true_positives: usize,
  pub false_positives: usize,
  pub false_negatives: usize,
  pub precision: f64,
  pub recall: f64,
  pub f1_score: f64,
  pub matches: Vec<MatchResult>,
  pub unmatched_detections: Vec<DetectedIssue>,
  pub missed_ground_truth: Vec<GroundTruthBug>,
  pub by_severity: BTreeMap<String, BucketStats>,
  pub by_category: BTreeMap<String, BucketStats>,
  pub precision_ci: ConfidenceInterval,
  pub recall_ci: ConfidenceInterval,
  pub files_with_bugs: usize,
  pub embedding_provider: String,
  pub embedding_failures: usize,
  pub evaluated_at: DateTime<Utc>,
}

impl EvaluationMetrics {
  /// Aggregate an assignment over `detections` against the full catalog in `store`.
  ///
  /// Indices in `assignment` refer to `detections` and `store.bugs()`.
  pub fn from_assignment(assignment: &Assignment, detections: &[DetectedIssue], store: &GroundTruthStore, run: RunInfo) -> Self {
    let truths = store.bugs();

    let matches: Vec<MatchResult> = assignment
      .pairs
      .iter()
      .map(|pair| MatchResult {
        detected: detections[pair.detection].clone(),
        ground_truth: truths[pair.truth].clone(),
        score: pair.score.clone(),
        match_type: pair.match_type(),
        threshold: pair.threshold,
      })
      .collect();
    let unmatched_detections: Vec<DetectedIssue> = assignment
      .unmatched_detections
      .iter()
      .map(|&i| detections[i].clone())
      .collect();
    let missed_ground_truth: Vec<GroundTruthBug> = assignment.unmatched_truths.iter().map(|&j| truths[j].clone()).collect();

    let tp = matches.len();
    let fp = unmatched_detections.len();
    let fn_ = missed_ground_truth.len();
    let precision = precision(tp, fp);
    let recall = recall(tp, fn_);

    let by_severity = breakdown(store.severities(), matches.iter().map(|m| m.ground_truth.severity.as_str()));
    let by_category = breakdown(store.categories(), matches.iter().map(|m| m.ground_truth.category.as_str()));

    Self {
      total_ground_truth: truths.len(),
      total_detected: detections.len(),
      true_positives: tp,
      false_positives: fp,
      false_negatives: fn_,
      precision,
      recall,
      f1_score: f1_score(precision, recall),
      matches,
      unmatched_detections,
      missed_ground_truth,
      by_severity,
      by_category,
      precision_ci: wilson_interval(tp, tp + fp),
      recall_ci: wilson_interval(tp, tp + fn_),
      files_with_bugs: store.files_with_bugs(),
      embedding_provider: run.embedding_provider,
      embedding_failures: run.embedding_failures,
      evaluated_at: Utc::now(),
    }
  }

  /// Missed bugs whose severity is critical.
  pub fn missed_critical(&self) -> impl Iterator<Item = &GroundTruthBug> {
    self
      .missed_ground_truth
      .iter()
      .filter(|bug| bug.is_critical())
  }
}

fn breakdown<'a>(totals: BTreeMap<String, usize>, found: impl Iterator<Item = &'a str>) -> BTreeMap<String, BucketStats> {
  let mut stats: BTreeMap<String, BucketStats> = totals
    .into_iter()
    .map(|(key, total)| {
      (
        key,
        BucketStats {
          total,
          ..Default::default()
        },
      )
    })
    .collect();

  for label in found {
    if let Some(bucket) = stats.get_mut(&bucket_key(label)) {
      bucket.found += 1;
    }
  }

  for bucket in stats.values_mut() {
    bucket.recall = accuracy::ratio(bucket.found, bucket.total);
  }
  stats
}
