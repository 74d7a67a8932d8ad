//! Evaluation engine for bug-detection tools.
//!
//! Scores a detector's reported issues against a curated ground truth
//! catalog and reports precision, recall, and F1 with per-severity and
//! per-category breakdowns.
//!
//! ## Pipeline
//!
//! - **Ground truth**: immutable catalog of known bugs, loaded once
//! - **Scoring**: five similarity signals per (detection, bug) pair
//! - **Matching**: adaptive thresholds and greedy one-to-one assignment
//! - **Metrics**: counts, ratios, bucket recall, and Wilson intervals
//! - **Reports**: JSON (machine-readable), Markdown, and run comparison

pub mod detection;
pub mod evaluator;
pub mod ground_truth;
pub mod matching;
pub mod metrics;
pub mod reports;
pub mod scoring;

pub use detection::{DetectedIssue, DetectionParseError, parse_detections};
pub use evaluator::Evaluator;
pub use ground_truth::{GroundTruthBug, GroundTruthStore, LoadError};
pub use matching::{Assignment, MatchType, adaptive_threshold, assign};
pub use metrics::{BucketStats, ConfidenceInterval, EvaluationMetrics, MatchResult};
pub use reports::{ComparisonReport, EvaluationReport, MarkdownReport};
pub use scoring::{MatchScore, ScoreMatrix, Signal, SignalScores, SimilarityScorer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
  #[error("Ground truth error: {0}")]
  GroundTruth(#[from] LoadError),

  #[error("Detection input error: {0}")]
  Detections(#[from] DetectionParseError),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("Report error: {0}")]
  Report(String),
}

pub type Result<T> = std::result::Result<T, EvalError>;
