use std::{collections::HashSet, path::Path, sync::Arc};

use embedding::EmbeddingProvider;
use tracing::{info, warn};

use crate::{
  Result,
  detection::DetectedIssue,
  ground_truth::GroundTruthStore,
  matching::assign,
  metrics::{EvaluationMetrics, RunInfo},
  scoring::SimilarityScorer,
};

/// Scores detector output against a loaded ground truth catalog.
///
/// The catalog is immutable and `evaluate` takes `&self`, so one evaluator can
/// serve concurrent evaluations as long as its provider is thread-safe.
#[derive(Debug, Clone)]
pub struct Evaluator {
  store: GroundTruthStore,
  scorer: SimilarityScorer,
}

impl Evaluator {
  pub fn new(store: GroundTruthStore, provider: Arc<dyn EmbeddingProvider>) -> Self {
    Self {
      store,
      scorer: SimilarityScorer::new(provider),
    }
  }

  /// Load the catalog at `path`. Fails before any scoring if it is missing or invalid.
  pub fn from_path(path: &Path, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
    let store = GroundTruthStore::load(path)?;
    Ok(Self::new(store, provider))
  }

  pub fn store(&self) -> &GroundTruthStore {
    &self.store
  }

  pub fn scorer(&self) -> &SimilarityScorer {
    &self.scorer
  }

  pub fn evaluate(&self, detections: &[DetectedIssue]) -> EvaluationMetrics {
    let provider = self.scorer.provider();
    info!(
      "Evaluating {} detections against {} ground truth bugs with {}",
      detections.len(),
      self.store.len(),
      provider.identity()
    );

    warn_on_duplicates(detections);

    let matrix = self.scorer.score_matrix(detections, self.store.bugs());
    if matrix.embedding_failures() > 0 {
      warn!(
        "{} texts could not be embedded; their semantic scores are 0.0",
        matrix.embedding_failures()
      );
    }

    let assignment = assign(&matrix, self.store.bugs());
    let metrics = EvaluationMetrics::from_assignment(
      &assignment,
      detections,
      &self.store,
      RunInfo {
        embedding_provider: provider.identity(),
        embedding_failures: matrix.embedding_failures(),
      },
    );

    info!(
      "Precision {:.3}, recall {:.3}, F1 {:.3} (tp={}, fp={}, fn={})",
      metrics.precision,
      metrics.recall,
      metrics.f1_score,
      metrics.true_positives,
      metrics.false_positives,
      metrics.false_negatives
    );
    for bug in metrics.missed_critical() {
      warn!("Missed critical bug {} in {} ({})", bug.bug_id, bug.file_path, bug.line_range());
    }
    metrics
  }
}

/// Warn when the same (file, line, title) is reported more than once.
fn warn_on_duplicates(detections: &[DetectedIssue]) {
  let mut seen = HashSet::new();
  for (idx, issue) in detections.iter().enumerate() {
    if !seen.insert((issue.file.as_str(), issue.line.as_str(), issue.title.as_str())) {
      warn!(
        "Detection {} duplicates an earlier report ({} line {}: {})",
        idx, issue.file, issue.line, issue.title
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use embedding::HashingProvider;
  use tempfile::TempDir;

  use super::*;
  use crate::EvalError;

  const CATALOG: &str = r#"{"bugs": [
    {"bug_id": "b1", "file_path": "app/db.py", "line_start": 40, "line_end": 42,
     "description": "SQL injection: user input concatenated into query", "category": "security", "severity": "critical"},
    {"bug_id": "b2", "file_path": "app/util.py", "line_start": 7,
     "description": "Unused helper function is dead code", "category": "dead_code", "severity": "minor"}
  ]}"#;

  fn evaluator() -> Evaluator {
    let store = GroundTruthStore::from_json_str(CATALOG).unwrap();
    Evaluator::new(store, Arc::new(HashingProvider::new(256)))
  }

  #[test]
  fn test_evaluate_matches_obvious_detection() {
    let detections = vec![DetectedIssue {
      title: "SQL injection".to_string(),
      description: "User input concatenated into query".to_string(),
      file: "./App/db.py".to_string(),
      line: "41".to_string(),
      severity: "critical".to_string(),
      category: "security".to_string(),
      recommendation: String::new(),
    }];

    let metrics = evaluator().evaluate(&detections);

    assert_eq!(metrics.true_positives, 1);
    assert_eq!(metrics.matches[0].ground_truth.bug_id, "b1");
    assert_eq!(metrics.false_negatives, 1);
    assert_eq!(metrics.embedding_provider, "hashing:feature-hash-256");
    assert_eq!(metrics.embedding_failures, 0);
  }

  #[test]
  fn test_evaluate_empty_detections() {
    let metrics = evaluator().evaluate(&[]);

    assert_eq!(metrics.precision, 0.0);
    assert_eq!(metrics.recall, 0.0);
    assert_eq!(metrics.false_negatives, 2);
    assert_eq!(metrics.missed_critical().map(|b| b.bug_id.as_str()).collect::<Vec<_>>(), vec!["b1"]);
  }

  #[test]
  fn test_from_path_missing_catalog() {
    let temp = TempDir::new().unwrap();
    let result = Evaluator::from_path(&temp.path().join("nope.json"), Arc::new(HashingProvider::new(8)));
    assert!(matches!(result, Err(EvalError::GroundTruth(_))));
  }
}
