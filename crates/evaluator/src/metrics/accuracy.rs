//! Zero-safe accuracy ratios. An empty denominator yields `0.0`, never NaN.

pub fn precision(true_positives: usize, false_positives: usize) -> f64 {
  ratio(true_positives, true_positives + false_positives)
}

pub fn recall(true_positives: usize, false_negatives: usize) -> f64 {
  ratio(true_positives, true_positives + false_negatives)
}

pub fn f1_score(precision: f64, recall: f64) -> f64 {
  let sum = precision + recall;
  if sum > 0.0 { 2.0 * precision * recall / sum } else { 0.0 }
}

pub(crate) fn ratio(part: usize, whole: usize) -> f64 {
  if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}
