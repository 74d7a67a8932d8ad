/// A text embedding capability.
///
/// Implementations must be deterministic for identical input text: the
/// evaluator relies on this to cache vectors and to reproduce match results.
/// The provider is owned by the caller and shared across evaluations, so it
/// must be safe to use from several threads at once.
pub trait EmbeddingProvider: Send + Sync {
  fn name(&self) -> &str;
  fn model_id(&self) -> &str;
  fn dimensions(&self) -> usize;

  fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

  fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    texts.iter().map(|text| self.embed(text)).collect()
  }

  fn is_available(&self) -> bool {
    true
  }

  /// Identity recorded alongside results. Scores from different identities are not comparable.
  fn identity(&self) -> String {
    format!("{}:{}", self.name(), self.model_id())
  }
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
  #[error("Provider not available")]
  NotAvailable,
  #[error("Request failed: {0}")]
  Request(#[from] reqwest::Error),
  #[error("Provider error: {0}")]
  ProviderError(String),
  #[error("Dimension mismatch: expected {expected}, got {actual}")]
  DimensionMismatch { expected: usize, actual: usize },
  #[error("Request timed out")]
  Timeout,
}
