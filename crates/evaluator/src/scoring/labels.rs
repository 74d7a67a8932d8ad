//! Category and severity agreement.

/// One side did not report a label.
pub const NEUTRAL_LABEL: f64 = 0.5;

/// Category families whose members count as near-matches of the family head.
const RELATED_CATEGORIES: &[(&str, &[&str])] = &[
  ("security", &["authentication", "authorization", "injection", "crypto"]),
  ("validation", &["input validation", "sanitization", "verification"]),
  ("error_handling", &["exception", "error handling", "fault tolerance"]),
];

const RELATED_CATEGORY_SCORE: f64 = 0.7;

/// Numeric rank of a severity label; unknown labels rank 0.
pub fn severity_level(severity: &str) -> u8 {
  match severity.trim().to_lowercase().as_str() {
    "critical" => 3,
    "major" => 2,
    "minor" => 1,
    _ => 0,
  }
}

pub fn category_similarity(detected: &str, truth: &str) -> f64 {
  let detected = detected.trim().to_lowercase();
  let truth = truth.trim().to_lowercase();

  if detected.is_empty() || truth.is_empty() {
    return NEUTRAL_LABEL;
  }

  if detected == truth {
    return 1.0;
  }

  let related = RELATED_CATEGORIES.iter().any(|(head, members)| {
    (detected == *head && members.contains(&truth.as_str())) || (truth == *head && members.contains(&detected.as_str()))
  });

  if related { RELATED_CATEGORY_SCORE } else { 0.0 }
}

pub fn severity_similarity(detected: &str, truth: &str) -> f64 {
  if detected.trim().is_empty() || truth.trim().is_empty() {
    return NEUTRAL_LABEL;
  }

  match severity_level(detected).abs_diff(severity_level(truth)) {
    0 => 1.0,
    1 => 0.7,
    _ => 0.3,
  }
}
