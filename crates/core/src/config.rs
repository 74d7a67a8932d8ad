//! Configuration for bug-detection evaluation runs.
//!
//! Config priority: explicit path > project-relative (./.bugeval.toml) > user (~/.config/bugeval/config.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Project-relative config file name
pub const PROJECT_CONFIG_FILE: &str = ".bugeval.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to parse config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
}

// ============================================================================
// Embedding Configuration
// ============================================================================

/// Embedding provider options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
  #[default]
  Ollama,
  /// Offline, deterministic feature hashing. No model required.
  Hashing,
}

impl std::str::FromStr for EmbeddingProviderKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "ollama" => Ok(Self::Ollama),
      "hashing" => Ok(Self::Hashing),
      other => Err(format!("unknown embedding provider '{}' (expected ollama or hashing)", other)),
    }
  }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
  /// Which embedding provider to use
  pub provider: EmbeddingProviderKind,

  /// Model name (e.g., "nomic-embed-text", "all-minilm")
  pub model: String,

  /// Embedding dimensions. For the hashing provider this is the bucket count.
  pub dimensions: usize,

  /// Ollama server URL (only used when provider = ollama)
  pub ollama_url: String,

  /// Per-request timeout in seconds
  pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
  fn default() -> Self {
    Self {
      provider: EmbeddingProviderKind::Ollama,
      model: "nomic-embed-text".to_string(),
      dimensions: 768,
      ollama_url: "http://localhost:11434".to_string(),
      timeout_secs: 30,
    }
  }
}

// ============================================================================
// Evaluation Configuration
// ============================================================================

/// Evaluation run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
  /// Default ground truth catalog, used when the CLI is not given one
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ground_truth: Option<PathBuf>,

  /// Directory that reports are written to
  pub output_dir: PathBuf,
}

impl Default for EvaluationConfig {
  fn default() -> Self {
    Self {
      ground_truth: None,
      output_dir: PathBuf::from("./eval-results"),
    }
  }
}

// ============================================================================
// Report Configuration
// ============================================================================

/// Human-readable report settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
  /// Number of sample matches shown with their reasons
  pub sample_matches: usize,

  /// Number of missed critical bugs listed
  pub missed_critical_limit: usize,

  /// Number of false positives listed
  pub false_positive_limit: usize,

  /// Ground truth sizes below this get a sample-size warning
  pub small_sample_warning: usize,
}

impl Default for ReportConfig {
  fn default() -> Self {
    Self {
      sample_matches: 3,
      missed_critical_limit: 5,
      false_positive_limit: 3,
      small_sample_warning: 20,
    }
  }
}

// ============================================================================
// Main Configuration
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub embedding: EmbeddingConfig,

  #[serde(default)]
  pub evaluation: EvaluationConfig,

  #[serde(default)]
  pub report: ReportConfig,
}

impl Config {
  /// Load config from an explicit path. Errors are returned, not swallowed.
  pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Load config for a working directory, with fallback to user config
  pub fn load_for_dir(dir: &Path) -> Self {
    if let Some(config) = Self::load_if_present(&Self::project_config_path(dir), "project") {
      return config;
    }

    Self::user_config_path()
      .and_then(|path| Self::load_if_present(&path, "user"))
      .unwrap_or_default()
  }

  /// Load `path` if it exists. A file that exists but cannot be loaded is
  /// logged and skipped.
  fn load_if_present(path: &Path, scope: &str) -> Option<Self> {
    if !path.exists() {
      return None;
    }

    match Self::load_from(path) {
      Ok(config) => {
        debug!("Loaded {} config from {}", scope, path.display());
        Some(config)
      }
      Err(e) => {
        warn!("Ignoring {} config: {}", scope, e);
        None
      }
    }
  }

  /// Get the user-level config path
  pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("BUGEVAL_CONFIG_DIR") {
      return Some(PathBuf::from(path).join("config.toml"));
    }

    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
      return Some(PathBuf::from(path).join("bugeval").join("config.toml"));
    }

    dirs::config_dir().map(|p: PathBuf| p.join("bugeval").join("config.toml"))
  }

  /// Get the project-relative config path
  pub fn project_config_path(dir: &Path) -> PathBuf {
    dir.join(PROJECT_CONFIG_FILE)
  }

  /// Generate a default config file as a string
  pub fn generate_template() -> String {
    let defaults = Self::default();

    format!(
      r#"# Bug detection evaluation configuration
# Place in ./{project_file} (project) or ~/.config/bugeval/config.toml (user)

# ============================================================================
# Embedding
# ============================================================================
# Changing the provider or model changes semantic score distributions.
# Reports record the provider identity so runs stay comparable.

[embedding]
# Provider: ollama or hashing (offline, deterministic)
provider = "ollama"
model = "{model}"
dimensions = {dimensions}
ollama_url = "{ollama_url}"
timeout_secs = {timeout_secs}

# ============================================================================
# Evaluation
# ============================================================================

[evaluation]
# ground_truth = "evals/dataset/ground_truth.json"
output_dir = "{output_dir}"

# ============================================================================
# Reports
# ============================================================================

[report]
sample_matches = {sample_matches}
missed_critical_limit = {missed_critical_limit}
false_positive_limit = {false_positive_limit}
small_sample_warning = {small_sample_warning}
"#,
      project_file = PROJECT_CONFIG_FILE,
      model = defaults.embedding.model,
      dimensions = defaults.embedding.dimensions,
      ollama_url = defaults.embedding.ollama_url,
      timeout_secs = defaults.embedding.timeout_secs,
      output_dir = defaults.evaluation.output_dir.display(),
      sample_matches = defaults.report.sample_matches,
      missed_critical_limit = defaults.report.missed_critical_limit,
      false_positive_limit = defaults.report.false_positive_limit,
      small_sample_warning = defaults.report.small_sample_warning,
    )
  }
}
