//! Shared fixtures for evaluator integration tests.

#![allow(dead_code)]

use embedding::{EmbeddingError, EmbeddingProvider};
use evaluator::{DetectedIssue, GroundTruthBug};

/// Returns the same vector for every text, forcing semantic similarity to 1.0.
pub struct ConstantProvider;

impl EmbeddingProvider for ConstantProvider {
  fn name(&self) -> &str {
    "constant"
  }

  fn model_id(&self) -> &str {
    "stub"
  }

  fn dimensions(&self) -> usize {
    4
  }

  fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
    Ok(vec![0.5; 4])
  }
}

/// Always fails, as an unreachable embedding server would.
pub struct FailingProvider;

impl EmbeddingProvider for FailingProvider {
  fn name(&self) -> &str {
    "failing"
  }

  fn model_id(&self) -> &str {
    "stub"
  }

  fn dimensions(&self) -> usize {
    4
  }

  fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
    Err(EmbeddingError::ProviderError("model not loaded".to_string()))
  }

  fn is_available(&self) -> bool {
    false
  }
}

pub fn bug(id: &str, file: &str, lines: (u32, Option<u32>), category: &str, severity: &str) -> GroundTruthBug {
  GroundTruthBug {
    bug_id: id.to_string(),
    project: "fixture".to_string(),
    file_path: file.to_string(),
    line_start: lines.0,
    line_end: lines.1,
    description: String::new(),
    category: category.to_string(),
    severity: severity.to_string(),
    commit_buggy: String::new(),
    commit_fixed: String::new(),
    code_snippet: None,
    recommendation: None,
  }
}

pub fn issue(file: &str, line: &str, category: &str, severity: &str, title: &str) -> DetectedIssue {
  DetectedIssue {
    title: title.to_string(),
    file: file.to_string(),
    line: line.to_string(),
    category: category.to_string(),
    severity: severity.to_string(),
    ..Default::default()
  }
}

pub fn close(a: f64, b: f64) -> bool {
  (a - b).abs() < 1e-9
}
