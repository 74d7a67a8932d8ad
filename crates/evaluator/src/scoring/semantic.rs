//! Free-text similarity through an injected embedding provider.

use embedding::{EmbeddingProvider, cosine_similarity};
use tracing::warn;

use crate::{detection::DetectedIssue, ground_truth::GroundTruthBug};

/// Canonical term ← variants. Applied in order, on lower-cased text, as plain
/// substring replacement. Both sides go through the same folding.
const SYNONYMS: &[(&str, &[&str])] = &[
  ("url parameters", &["query parameters", "get parameters", "url params"]),
  ("exposed", &["leaked", "visible", "accessible", "logged"]),
  ("api key", &["authentication token", "auth key", "access token"]),
  ("hardcoded", &["hard-coded", "hard coded", "embedded", "static"]),
  ("password", &["credential", "secret", "auth"]),
  ("injection", &["command injection", "code injection", "script injection"]),
  ("timeout", &["hang", "hanging", "blocking", "freeze"]),
  ("validation", &["sanitization", "verification", "checking"]),
  ("exception", &["error", "failure", "crash"]),
  ("resource", &["handle", "connection", "memory", "file"]),
  ("cleanup", &["close", "release", "free"]),
  ("authorization", &["permission", "access control", "privilege"]),
  ("performance", &["efficiency", "optimization", "speed"]),
  ("dead code", &["unused", "unreachable", "obsolete"]),
  ("n+1", &["loop query", "per request", "inefficient loop"]),
  ("broad exception", &["generic exception", "catch all", "bare except"]),
];

/// Lower-case `text` and fold known variants onto their canonical term.
pub fn fold_synonyms(text: &str) -> String {
  let mut folded = text.to_lowercase();
  for (canonical, variants) in SYNONYMS {
    for variant in *variants {
      if folded.contains(variant) {
        folded = folded.replace(variant, canonical);
      }
    }
  }
  folded
}

fn join_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
  parts
    .into_iter()
    .map(str::trim)
    .filter(|p| !p.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Text embedded for a detection, after synonym folding.
pub fn detection_text(issue: &DetectedIssue) -> String {
  let severity = format!("severity: {}", issue.severity);
  let category = format!("category: {}", issue.category);
  fold_synonyms(&join_parts([
    issue.title.as_str(),
    issue.description.as_str(),
    issue.recommendation.as_str(),
    severity.as_str(),
    category.as_str(),
  ]))
}

/// Text embedded for a ground truth bug, after synonym folding.
pub fn truth_text(bug: &GroundTruthBug) -> String {
  let severity = format!("severity: {}", bug.severity);
  let category = format!("category: {}", bug.category);
  fold_synonyms(&join_parts([
    bug.description.as_str(),
    bug.code_snippet.as_deref().unwrap_or_default(),
    bug.recommendation.as_deref().unwrap_or_default(),
    severity.as_str(),
    category.as_str(),
  ]))
}

/// Embed one text, logging and swallowing provider failures.
pub fn embed_or_warn(provider: &dyn EmbeddingProvider, text: &str) -> Option<Vec<f32>> {
  match provider.embed(text) {
    Ok(vector) => Some(vector),
    Err(e) => {
      warn!("Embedding failed with {}: {}", provider.identity(), e);
      None
    }
  }
}

/// Cosine similarity clamped to `[0, 1]`. Missing or incomparable vectors score zero.
pub fn vector_similarity(a: Option<&[f32]>, b: Option<&[f32]>) -> f64 {
  let (Some(a), Some(b)) = (a, b) else {
    return 0.0;
  };

  match cosine_similarity(a, b) {
    Some(sim) => sim.clamp(0.0, 1.0),
    None => {
      warn!("Cosine similarity undefined for vectors of length {} and {}", a.len(), b.len());
      0.0
    }
  }
}
