//! Offline embedding by feature hashing.
//!
//! Each lower-cased alphanumeric token is hashed with SHA-256; the first
//! eight bytes pick a bucket and the next byte picks a sign. The resulting
//! count vector is L2-normalised. Texts sharing vocabulary land close
//! together, which is enough for a deterministic baseline without a model.

use sha2::{Digest, Sha256};

use crate::{EmbeddingError, EmbeddingProvider};

const DEFAULT_DIMENSIONS: usize = 256;

#[derive(Debug, Clone)]
pub struct HashingProvider {
  dimensions: usize,
  model_id: String,
}

impl Default for HashingProvider {
  fn default() -> Self {
    Self::new(DEFAULT_DIMENSIONS)
  }
}

impl HashingProvider {
  /// Zero dimensions is bumped to one so every text maps to a real vector.
  pub fn new(dimensions: usize) -> Self {
    let dimensions = dimensions.max(1);
    Self {
      dimensions,
      model_id: format!("feature-hash-{}", dimensions),
    }
  }

  fn bucket(&self, token: &str) -> (usize, f32) {
    let digest = Sha256::digest(token.as_bytes());
    let mut index_bytes = [0u8; 8];
    index_bytes.copy_from_slice(&digest[..8]);
    let index = (u64::from_le_bytes(index_bytes) % self.dimensions as u64) as usize;
    let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
    (index, sign)
  }
}

impl EmbeddingProvider for HashingProvider {
  fn name(&self) -> &str {
    "hashing"
  }

  fn model_id(&self) -> &str {
    &self.model_id
  }

  fn dimensions(&self) -> usize {
    self.dimensions
  }

  fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
    let mut vector = vec![0.0f32; self.dimensions];

    for token in text
      .split(|c: char| !c.is_alphanumeric())
      .filter(|t| !t.is_empty())
      .map(str::to_lowercase)
    {
      let (index, sign) = self.bucket(&token);
      vector[index] += sign;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
      for v in &mut vector {
        *v /= norm;
      }
    }

    Ok(vector)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cosine_similarity;

  #[test]
  fn test_deterministic() {
    let provider = HashingProvider::new(128);
    let a = provider.embed("SQL injection in login query").unwrap();
    let b = provider.embed("SQL injection in login query").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 128);
  }

  #[test]
  fn test_case_and_punctuation_insensitive() {
    let provider = HashingProvider::default();
    let a = provider.embed("Hardcoded password!").unwrap();
    let b = provider.embed("hardcoded, PASSWORD").unwrap();
    assert!((cosine_similarity(&a, &b).unwrap() - 1.0).abs() < 1e-6);
  }

  #[test]
  fn test_shared_vocabulary_scores_higher() {
    let provider = HashingProvider::new(512);
    let base = provider.embed("missing timeout on network request").unwrap();
    let close = provider.embed("network request has no timeout").unwrap();
    let far = provider.embed("unused import of pickle module").unwrap();

    let close_sim = cosine_similarity(&base, &close).unwrap();
    let far_sim = cosine_similarity(&base, &far).unwrap();
    assert!(close_sim > far_sim);
  }

  #[test]
  fn test_empty_text_is_zero_vector() {
    let provider = HashingProvider::new(16);
    let v = provider.embed("   ").unwrap();
    assert!(v.iter().all(|x| *x == 0.0));
  }

  #[test]
  fn test_zero_dimensions_clamped() {
    let provider = HashingProvider::new(0);
    assert_eq!(provider.dimensions(), 1);
    assert_eq!(provider.embed("anything").unwrap().len(), 1);
  }
}
