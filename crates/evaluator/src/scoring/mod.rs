//! Pairwise similarity between detections and ground truth bugs.
//!
//! Five independent signals, each in `[0, 1]`, combined with fixed weights:
//!
//! | signal   | weight |
//! |----------|--------|
//! | location | 0.30   |
//! | semantic | 0.40   |
//! | pattern  | 0.15   |
//! | category | 0.10   |
//! | severity | 0.05   |

mod labels;
mod location;
mod patterns;
mod semantic;

use std::{collections::BTreeSet, fmt, sync::Arc};

use embedding::EmbeddingProvider;
pub use labels::{category_similarity, severity_level, severity_similarity};
pub use location::{LineSet, extract_line_numbers, location_similarity, min_line_distance, normalize_file_path, proximity_score};
pub use patterns::{CATEGORY_PATTERNS, PatternTable, VULNERABILITY_PATTERNS, matched_tags, pattern_similarity};
use serde::{Deserialize, Serialize};
pub use semantic::fold_synonyms;
use tracing::debug;

use crate::{detection::DetectedIssue, ground_truth::GroundTruthBug};

pub const LOCATION_WEIGHT: f64 = 0.30;
pub const SEMANTIC_WEIGHT: f64 = 0.40;
pub const PATTERN_WEIGHT: f64 = 0.15;
pub const CATEGORY_WEIGHT: f64 = 0.10;
pub const SEVERITY_WEIGHT: f64 = 0.05;

/// Signals at or above this value are listed as match reasons.
pub const REASON_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
  Location,
  Semantic,
  Pattern,
  Category,
  Severity,
}

impl Signal {
  pub const ALL: [Signal; 5] = [
    Signal::Location,
    Signal::Semantic,
    Signal::Pattern,
    Signal::Category,
    Signal::Severity,
  ];

  pub fn weight(self) -> f64 {
    match self {
      Signal::Location => LOCATION_WEIGHT,
      Signal::Semantic => SEMANTIC_WEIGHT,
      Signal::Pattern => PATTERN_WEIGHT,
      Signal::Category => CATEGORY_WEIGHT,
      Signal::Severity => SEVERITY_WEIGHT,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Signal::Location => "location",
      Signal::Semantic => "semantic",
      Signal::Pattern => "pattern",
      Signal::Category => "category",
      Signal::Severity => "severity",
    }
  }
}

impl fmt::Display for Signal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Individual signal values for one pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalScores {
  pub location: f64,
  pub semantic: f64,
  pub pattern: f64,
  pub category: f64,
  pub severity: f64,
}

impl SignalScores {
  pub fn get(&self, signal: Signal) -> f64 {
    match signal {
      Signal::Location => self.location,
      Signal::Semantic => self.semantic,
      Signal::Pattern => self.pattern,
      Signal::Category => self.category,
      Signal::Severity => self.severity,
    }
  }

  /// Weighted sum, clamped to `[0, 1]`.
  pub fn weighted_total(&self) -> f64 {
    Signal::ALL
      .iter()
      .map(|&s| s.weight() * self.get(s).clamp(0.0, 1.0))
      .sum::<f64>()
      .clamp(0.0, 1.0)
  }

  pub fn reasons(&self) -> Vec<Signal> {
    Signal::ALL
      .into_iter()
      .filter(|&s| self.get(s) >= REASON_THRESHOLD)
      .collect()
  }
}

/// Combined score for one detection/ground truth pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
  pub total: f64,
  pub signals: SignalScores,
  pub reasons: Vec<Signal>,
}

impl MatchScore {
  pub fn from_signals(signals: SignalScores) -> Self {
    Self {
      total: signals.weighted_total(),
      reasons: signals.reasons(),
      signals,
    }
  }
}

/// Per-item features computed once per evaluation and reused for every pair.
struct Features {
  lines: LineSet,
  tags: BTreeSet<&'static str>,
  embedding: Option<Vec<f32>>,
}

/// Scores for every (detection, truth) pair of one evaluation, row-major by detection.
#[derive(Debug, Clone, Default)]
pub struct ScoreMatrix {
  scores: Vec<MatchScore>,
  detections: usize,
  truths: usize,
  embedding_failures: usize,
}

impl ScoreMatrix {
  /// Build from precomputed rows, one per detection. Rows shorter than the
  /// first are padded with zero scores.
  pub fn from_rows(rows: Vec<Vec<MatchScore>>) -> Self {
    let detections = rows.len();
    let truths = rows.first().map_or(0, Vec::len);
    let mut scores = Vec::with_capacity(detections * truths);
    for row in rows {
      let len = row.len();
      scores.extend(row.into_iter().take(truths));
      scores.extend((len..truths).map(|_| MatchScore::from_signals(SignalScores::default())));
    }

    Self {
      scores,
      detections,
      truths,
      embedding_failures: 0,
    }
  }

  pub fn get(&self, detection: usize, truth: usize) -> Option<&MatchScore> {
    if detection >= self.detections || truth >= self.truths {
      return None;
    }
    self.scores.get(detection * self.truths + truth)
  }

  pub fn detections(&self) -> usize {
    self.detections
  }

  pub fn truths(&self) -> usize {
    self.truths
  }

  /// Texts the provider failed to embed while building this matrix.
  pub fn embedding_failures(&self) -> usize {
    self.embedding_failures
  }
}

/// Computes the five similarity signals and their weighted combination.
///
/// Holds no state besides the injected provider; the provider's lifetime
/// belongs to the caller.
#[derive(Clone)]
pub struct SimilarityScorer {
  provider: Arc<dyn EmbeddingProvider>,
}

impl SimilarityScorer {
  pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
    Self { provider }
  }

  pub fn provider(&self) -> &dyn EmbeddingProvider {
    self.provider.as_ref()
  }

  /// Score a single pair. Embeds both texts; prefer [`Self::score_matrix`] for batches.
  pub fn calculate_match_score(&self, detected: &DetectedIssue, truth: &GroundTruthBug) -> MatchScore {
    let d = self.detection_features(detected);
    let t = self.truth_features(truth);
    combine(detected, &d, truth, &t)
  }

  /// Score every pair, embedding each text once.
  pub fn score_matrix(&self, detections: &[DetectedIssue], truths: &[GroundTruthBug]) -> ScoreMatrix {
    let detection_features: Vec<Features> = detections.iter().map(|d| self.detection_features(d)).collect();
    let truth_features: Vec<Features> = truths.iter().map(|t| self.truth_features(t)).collect();

    let embedding_failures = detection_features
      .iter()
      .chain(truth_features.iter())
      .filter(|f| f.embedding.is_none())
      .count();

    let mut scores = Vec::with_capacity(detections.len() * truths.len());
    for (i, (detected, d)) in detections.iter().zip(&detection_features).enumerate() {
      for (j, (truth, t)) in truths.iter().zip(&truth_features).enumerate() {
        let score = combine(detected, d, truth, t);
        debug!(
          "Pair ({}, {}) [{}]: total={:.3} signals={:?}",
          i, j, truth.bug_id, score.total, score.signals
        );
        scores.push(score);
      }
    }

    ScoreMatrix {
      scores,
      detections: detections.len(),
      truths: truths.len(),
      embedding_failures,
    }
  }

  fn detection_features(&self, issue: &DetectedIssue) -> Features {
    let pattern_text = format!("{} {}", issue.description, issue.title);
    Features {
      lines: extract_line_numbers(&issue.line),
      tags: matched_tags(&pattern_text),
      embedding: semantic::embed_or_warn(self.provider(), &semantic::detection_text(issue)),
    }
  }

  fn truth_features(&self, bug: &GroundTruthBug) -> Features {
    let pattern_text = format!("{} {}", bug.description, bug.code_snippet.as_deref().unwrap_or_default());
    Features {
      lines: extract_line_numbers(&bug.line_range()),
      tags: matched_tags(&pattern_text),
      embedding: semantic::embed_or_warn(self.provider(), &semantic::truth_text(bug)),
    }
  }
}

impl fmt::Debug for SimilarityScorer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SimilarityScorer")
      .field("provider", &self.provider.identity())
      .finish()
  }
}

fn combine(detected: &DetectedIssue, d: &Features, truth: &GroundTruthBug, t: &Features) -> MatchScore {
  MatchScore::from_signals(SignalScores {
    location: location_similarity(&detected.file, &d.lines, &truth.file_path, &t.lines),
    semantic: semantic::vector_similarity(d.embedding.as_deref(), t.embedding.as_deref()),
    pattern: pattern_similarity(&d.tags, &t.tags),
    category: category_similarity(&detected.category, &truth.category),
    severity: severity_similarity(&detected.severity, &truth.severity),
  })
}
