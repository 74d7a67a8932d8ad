use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{EmbeddingError, EmbeddingProvider};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "nomic-embed-text";
const DEFAULT_DIMENSIONS: usize = 768;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking Ollama embedding client.
///
/// The evaluator scores synchronously, so this uses `reqwest::blocking`
/// rather than an async client. Construct it once and share it.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
  client: reqwest::blocking::Client,
  base_url: String,
  model: String,
  dimensions: usize,
}

impl Default for OllamaProvider {
  fn default() -> Self {
    Self::new()
  }
}

impl OllamaProvider {
  pub fn new() -> Self {
    Self {
      client: reqwest::blocking::Client::new(),
      base_url: DEFAULT_OLLAMA_URL.to_string(),
      model: DEFAULT_MODEL.to_string(),
      dimensions: DEFAULT_DIMENSIONS,
    }
  }

  pub fn with_url(mut self, url: impl Into<String>) -> Self {
    self.base_url = url.into().trim_end_matches('/').to_string();
    self
  }

  pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
    self.model = model.into();
    self.dimensions = dimensions;
    self
  }

  /// Rebuild the HTTP client with a per-request timeout.
  pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, EmbeddingError> {
    self.client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
    Ok(self)
  }

  fn embeddings_url(&self) -> String {
    format!("{}/api/embeddings", self.base_url)
  }

  /// Check server reachability and whether the configured model is pulled.
  pub fn check_health(&self) -> OllamaHealthStatus {
    let tags = self
      .client
      .get(format!("{}/api/tags", self.base_url))
      .timeout(DEFAULT_TIMEOUT)
      .send();

    let (available, models) = match tags {
      Ok(response) if response.status().is_success() => {
        #[derive(Deserialize)]
        struct TagsResponse {
          models: Vec<ModelInfo>,
        }
        #[derive(Deserialize)]
        struct ModelInfo {
          name: String,
        }
        let models = response
          .json::<TagsResponse>()
          .map(|t| t.models.into_iter().map(|m| m.name).collect())
          .unwrap_or_default();
        (true, models)
      }
      _ => (false, vec![]),
    };

    let configured_model_available = models
      .iter()
      .any(|m: &String| m.starts_with(&self.model) || self.model.starts_with(m.as_str()));

    OllamaHealthStatus {
      available,
      models,
      configured_model: self.model.clone(),
      configured_model_available,
    }
  }
}

/// Health status for Ollama
#[derive(Debug, Clone, serde::Serialize)]
pub struct OllamaHealthStatus {
  pub available: bool,
  pub models: Vec<String>,
  pub configured_model: String,
  pub configured_model_available: bool,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
  embedding: Vec<f32>,
}

impl EmbeddingProvider for OllamaProvider {
  fn name(&self) -> &str {
    "ollama"
  }

  fn model_id(&self) -> &str {
    &self.model
  }

  fn dimensions(&self) -> usize {
    self.dimensions
  }

  fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
    let request = EmbeddingRequest {
      model: &self.model,
      prompt: text,
    };

    debug!("Embedding text with Ollama: {} chars", text.len());

    let response = self
      .client
      .post(self.embeddings_url())
      .json(&request)
      .send()
      .map_err(|e| if e.is_timeout() { EmbeddingError::Timeout } else { e.into() })?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().unwrap_or_default();
      warn!("Ollama embedding failed: {} - {}", status, body);
      return Err(EmbeddingError::ProviderError(format!(
        "Ollama returned {}: {}",
        status, body
      )));
    }

    let result: EmbeddingResponse = response.json()?;

    if result.embedding.len() != self.dimensions {
      warn!(
        "Unexpected embedding dimensions: got {}, expected {}",
        result.embedding.len(),
        self.dimensions
      );
    }

    if result.embedding.is_empty() {
      return Err(EmbeddingError::DimensionMismatch {
        expected: self.dimensions,
        actual: 0,
      });
    }

    Ok(result.embedding)
  }

  fn is_available(&self) -> bool {
    let health = self.check_health();
    if health.available && !health.configured_model_available {
      warn!(
        "Ollama is reachable but model {} is not pulled (have: {})",
        health.configured_model,
        health.models.join(", ")
      );
    }
    health.available && health.configured_model_available
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_provider_defaults() {
    let provider = OllamaProvider::new();
    assert_eq!(provider.name(), "ollama");
    assert_eq!(provider.model_id(), DEFAULT_MODEL);
    assert_eq!(provider.dimensions(), DEFAULT_DIMENSIONS);
    assert_eq!(provider.identity(), "ollama:nomic-embed-text");
  }

  #[test]
  fn test_provider_customization() {
    let provider = OllamaProvider::new()
      .with_url("http://custom:8080/")
      .with_model("all-minilm", 384);

    assert_eq!(provider.base_url, "http://custom:8080");
    assert_eq!(provider.model_id(), "all-minilm");
    assert_eq!(provider.dimensions(), 384);
  }

  #[test]
  fn test_embeddings_url() {
    let provider = OllamaProvider::new();
    assert_eq!(provider.embeddings_url(), "http://localhost:11434/api/embeddings");
  }

  #[test]
  fn test_unreachable_server_errors() {
    // Port 9 (discard) is not an HTTP server; the request must fail rather than hang.
    let provider = OllamaProvider::new()
      .with_url("http://127.0.0.1:9")
      .with_timeout(Duration::from_millis(500))
      .unwrap();

    assert!(provider.embed("hello").is_err());
    assert!(!provider.is_available());
  }
}
