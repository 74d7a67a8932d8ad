pub mod hashing;
pub mod ollama;
pub mod provider;

use std::sync::Arc;

use bugeval_core::{EmbeddingConfig, EmbeddingProviderKind};
pub use hashing::HashingProvider;
pub use ollama::{OllamaHealthStatus, OllamaProvider};
pub use provider::{EmbeddingError, EmbeddingProvider};

/// Build the provider described by `config`.
pub fn provider_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
  match config.provider {
    EmbeddingProviderKind::Ollama => {
      let provider = OllamaProvider::new()
        .with_url(&config.ollama_url)
        .with_model(&config.model, config.dimensions)
        .with_timeout(std::time::Duration::from_secs(config.timeout_secs))?;
      Ok(Arc::new(provider))
    }
    EmbeddingProviderKind::Hashing => Ok(Arc::new(HashingProvider::new(config.dimensions))),
  }
}

/// Cosine similarity of two vectors.
///
/// Returns `None` when the lengths differ or either vector has zero magnitude,
/// since the similarity is undefined there.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
  if a.len() != b.len() || a.is_empty() {
    return None;
  }

  let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
  for (&x, &y) in a.iter().zip(b) {
    let (x, y) = (x as f64, y as f64);
    dot += x * y;
    norm_a += x * x;
    norm_b += y * y;
  }

  if norm_a == 0.0 || norm_b == 0.0 {
    return None;
  }

  let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
  similarity.is_finite().then_some(similarity)
}
