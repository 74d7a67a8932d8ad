//! One-to-one assignment of detections to ground truth bugs.
//!
//! Greedy: the highest remaining pair that clears the truth's adaptive
//! threshold is taken, both sides are retired, and the scan repeats. This is
//! not a maximum-weight matching.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
  ground_truth::GroundTruthBug,
  scoring::{MatchScore, ScoreMatrix},
};

pub const DEFAULT_THRESHOLD: f64 = 0.60;
/// Scores at or above this are reported as exact matches.
pub const EXACT_MATCH_SCORE: f64 = 0.95;

const SEVERITY_SHIFT: f64 = 0.03;

/// Minimum combined score a detection needs to match `bug`.
///
/// Keyed by category, then loosened for critical bugs and tightened for minor ones.
pub fn adaptive_threshold(bug: &GroundTruthBug) -> f64 {
  let base = match bug.category.trim().to_lowercase().as_str() {
    "security" | "authorization" => 0.62,
    "dead_code" => 0.65,
    _ => DEFAULT_THRESHOLD,
  };

  match bug.severity.trim().to_lowercase().as_str() {
    "critical" => base - SEVERITY_SHIFT,
    "minor" => base + SEVERITY_SHIFT,
    _ => base,
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
  Exact,
  Partial,
}

impl MatchType {
  pub fn from_score(score: f64) -> Self {
    if score >= EXACT_MATCH_SCORE {
      MatchType::Exact
    } else {
      MatchType::Partial
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      MatchType::Exact => "exact",
      MatchType::Partial => "partial",
    }
  }
}

/// An accepted pair, by index into the evaluated slices.
#[derive(Debug, Clone, PartialEq)]
pub struct Pairing {
  pub detection: usize,
  pub truth: usize,
  pub score: MatchScore,
  pub threshold: f64,
}

impl Pairing {
  pub fn match_type(&self) -> MatchType {
    MatchType::from_score(self.score.total)
  }
}

/// Outcome of one assignment run. Every index appears exactly once across
/// `pairs` and the matching unmatched list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assignment {
  /// In the order they were accepted (descending score)
  pub pairs: Vec<Pairing>,
  pub unmatched_detections: Vec<usize>,
  pub unmatched_truths: Vec<usize>,
}

/// Greedily assign detections to truths using precomputed scores.
///
/// Ties go to the lowest detection index, then the lowest truth index.
pub fn assign(matrix: &ScoreMatrix, truths: &[GroundTruthBug]) -> Assignment {
  let thresholds: Vec<f64> = truths.iter().map(adaptive_threshold).collect();
  let mut detection_used = vec![false; matrix.detections()];
  let mut truth_used = vec![false; truths.len()];
  let mut pairs = Vec::new();

  loop {
    let mut best: Option<(usize, usize, &MatchScore)> = None;

    for (i, _) in detection_used.iter().enumerate().filter(|(_, used)| !**used) {
      for (j, _) in truth_used.iter().enumerate().filter(|(_, used)| !**used) {
        let Some(score) = matrix.get(i, j) else {
          continue;
        };
        if score.total < thresholds[j] {
          continue;
        }
        if best.is_none_or(|(_, _, b)| score.total > b.total) {
          best = Some((i, j, score));
        }
      }
    }

    let Some((i, j, score)) = best else {
      break;
    };

    debug!(
      "Matched detection {} to {} (score {:.3}, threshold {:.2})",
      i, truths[j].bug_id, score.total, thresholds[j]
    );
    pairs.push(Pairing {
      detection: i,
      truth: j,
      score: score.clone(),
      threshold: thresholds[j],
    });
    detection_used[i] = true;
    truth_used[j] = true;
  }

  Assignment {
    pairs,
    unmatched_detections: unused(&detection_used),
    unmatched_truths: unused(&truth_used),
  }
}

fn unused(flags: &[bool]) -> Vec<usize> {
  flags
    .iter()
    .enumerate()
    .filter(|(_, used)| !**used)
    .map(|(idx, _)| idx)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scoring::SignalScores;

  fn bug(id: &str, category: &str, severity: &str) -> GroundTruthBug {
    GroundTruthBug {
      bug_id: id.to_string(),
      project: String::new(),
      file_path: "a.py".to_string(),
      line_start: 1,
      line_end: None,
      description: String::new(),
      category: category.to_string(),
      severity: severity.to_string(),
      commit_buggy: String::new(),
      commit_fixed: String::new(),
      code_snippet: None,
      recommendation: None,
    }
  }

  /// A score whose total is `semantic * 0.4`.
  fn score(semantic: f64) -> MatchScore {
    MatchScore::from_signals(SignalScores {
      semantic,
      ..Default::default()
    })
  }

  fn semantic_only(rows: &[&[f64]]) -> ScoreMatrix {
    ScoreMatrix::from_rows(
      rows
        .iter()
        .map(|row| row.iter().map(|&s| score(s)).collect())
        .collect(),
    )
  }

  #[test]
  fn test_adaptive_threshold() {
    let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
    assert!(close(adaptive_threshold(&bug("x", "security", "critical")), 0.59));
    assert!(close(adaptive_threshold(&bug("x", "Authorization", "major")), 0.62));
    assert!(close(adaptive_threshold(&bug("x", "dead_code", "minor")), 0.68));
    assert!(close(adaptive_threshold(&bug("x", "performance", "minor")), 0.63));
    assert!(close(adaptive_threshold(&bug("x", "", "")), 0.60));
  }

  #[test]
  fn test_match_type() {
    assert_eq!(MatchType::from_score(0.95), MatchType::Exact);
    assert_eq!(MatchType::from_score(0.949), MatchType::Partial);
  }

  #[test]
  fn test_greedy_takes_best_pair_first() {
    let matrix = ScoreMatrix::from_rows(vec![
      vec![
        MatchScore::from_signals(SignalScores { location: 1.0, semantic: 1.0, ..Default::default() }),
        MatchScore::from_signals(SignalScores { location: 1.0, semantic: 0.9, ..Default::default() }),
      ],
      vec![
        MatchScore::from_signals(SignalScores { location: 1.0, semantic: 0.8, ..Default::default() }),
        MatchScore::from_signals(SignalScores { location: 0.0, ..Default::default() }),
      ],
    ]);
    let truths = [bug("t0", "performance", "major"), bug("t1", "performance", "major")];

    let result = assign(&matrix, &truths);

    // (0,0)=0.70 wins; (1,1)=0.0 cannot clear the threshold
    assert_eq!(result.pairs.len(), 1);
    assert_eq!((result.pairs[0].detection, result.pairs[0].truth), (0, 0));
    assert_eq!(result.unmatched_detections, vec![1]);
    assert_eq!(result.unmatched_truths, vec![1]);
  }

  #[test]
  fn test_greedy_is_not_globally_optimal() {
    // Optimal would pair (0,1) and (1,0); greedy grabs (0,0) first.
    let row = |a: f64, b: f64| {
      vec![
        MatchScore::from_signals(SignalScores { location: 1.0, semantic: a, ..Default::default() }),
        MatchScore::from_signals(SignalScores { location: 1.0, semantic: b, ..Default::default() }),
      ]
    };
    let matrix = ScoreMatrix::from_rows(vec![row(1.0, 0.9), row(0.9, 0.0)]);
    let truths = [bug("t0", "performance", "major"), bug("t1", "performance", "major")];

    let result = assign(&matrix, &truths);

    assert_eq!(result.pairs.len(), 1);
    assert_eq!((result.pairs[0].detection, result.pairs[0].truth), (0, 0));
  }

  #[test]
  fn test_ties_resolve_to_lowest_index() {
    let row = || {
      vec![
        MatchScore::from_signals(SignalScores { location: 1.0, semantic: 1.0, ..Default::default() }),
        MatchScore::from_signals(SignalScores { location: 1.0, semantic: 1.0, ..Default::default() }),
      ]
    };
    let matrix = ScoreMatrix::from_rows(vec![row(), row()]);
    let truths = [bug("t0", "performance", "major"), bug("t1", "performance", "major")];

    let result = assign(&matrix, &truths);

    let pairs: Vec<_> = result.pairs.iter().map(|p| (p.detection, p.truth)).collect();
    assert_eq!(pairs, vec![(0, 0), (1, 1)]);
    assert!(result.unmatched_detections.is_empty());
    assert!(result.unmatched_truths.is_empty());
  }

  #[test]
  fn test_nothing_clears_threshold() {
    let matrix = semantic_only(&[&[1.0, 1.0], &[1.0, 1.0]]);
    let truths = [bug("t0", "security", "critical"), bug("t1", "dead_code", "minor")];

    let result = assign(&matrix, &truths);

    assert!(result.pairs.is_empty());
    assert_eq!(result.unmatched_detections, vec![0, 1]);
    assert_eq!(result.unmatched_truths, vec![0, 1]);
  }

  #[test]
  fn test_empty_inputs() {
    let result = assign(&ScoreMatrix::default(), &[]);
    assert_eq!(result, Assignment::default());

    let truths = [bug("t0", "security", "critical")];
    let result = assign(&ScoreMatrix::from_rows(Vec::new()), &truths);
    assert_eq!(result.unmatched_truths, vec![0]);
  }
}
