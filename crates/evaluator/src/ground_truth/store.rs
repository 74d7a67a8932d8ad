use std::{
  collections::{BTreeMap, HashMap},
  path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::scoring::normalize_file_path;

/// A curated, known defect used as the reference standard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruthBug {
  pub bug_id: String,
  #[serde(default)]
  pub project: String,
  pub file_path: String,
  pub line_start: u32,
  /// Defaults to `line_start` when absent
  #[serde(default)]
  pub line_end: Option<u32>,
  #[serde(default)]
  pub description: String,
  pub category: String,
  pub severity: String,
  #[serde(default)]
  pub commit_buggy: String,
  #[serde(default)]
  pub commit_fixed: String,
  /// Offending code, when curated. Feeds the semantic and pattern signals.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub code_snippet: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub recommendation: Option<String>,
}

impl GroundTruthBug {
  pub fn line_end_or_start(&self) -> u32 {
    self.line_end.unwrap_or(self.line_start)
  }

  /// `start-end`, with the end defaulted to the start.
  pub fn line_range(&self) -> String {
    format!("{}-{}", self.line_start, self.line_end_or_start())
  }

  pub fn is_critical(&self) -> bool {
    bucket_key(&self.severity) == "critical"
  }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
  #[error("Ground truth file not found: {0}")]
  NotFound(PathBuf),
  #[error("Failed to read ground truth {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Invalid ground truth {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
  #[error("Duplicate bug_id in ground truth: {0}")]
  DuplicateBugId(String),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
  bugs: Vec<GroundTruthBug>,
}

/// Immutable, validated ground truth catalog.
#[derive(Debug, Clone, Default)]
pub struct GroundTruthStore {
  bugs: Vec<GroundTruthBug>,
  by_id: HashMap<String, usize>,
}

impl GroundTruthStore {
  /// Load and validate a catalog of shape `{"bugs": [...]}`.
  pub fn load(path: &Path) -> Result<Self, LoadError> {
    if !path.exists() {
      return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
      path: path.to_path_buf(),
      source,
    })?;

    let store = Self::from_json_str(&content).map_err(|e| match e {
      LoadError::Parse { source, .. } => LoadError::Parse {
        path: path.to_path_buf(),
        source,
      },
      other => other,
    })?;

    info!("Loaded {} ground truth bugs from {}", store.len(), path.display());
    Ok(store)
  }

  /// Parse a catalog from a JSON string. A missing required field fails the whole catalog.
  pub fn from_json_str(content: &str) -> Result<Self, LoadError> {
    let catalog: CatalogFile = serde_json::from_str(content).map_err(|source| LoadError::Parse {
      path: PathBuf::from("<inline>"),
      source,
    })?;
    Self::from_bugs(catalog.bugs)
  }

  /// Build a store from already-parsed bugs, enforcing `bug_id` uniqueness.
  pub fn from_bugs(bugs: Vec<GroundTruthBug>) -> Result<Self, LoadError> {
    let mut by_id = HashMap::with_capacity(bugs.len());
    for (idx, bug) in bugs.iter().enumerate() {
      if by_id.insert(bug.bug_id.clone(), idx).is_some() {
        return Err(LoadError::DuplicateBugId(bug.bug_id.clone()));
      }
    }

    debug!("Indexed {} ground truth bugs", bugs.len());
    Ok(Self { bugs, by_id })
  }

  pub fn bugs(&self) -> &[GroundTruthBug] {
    &self.bugs
  }

  pub fn len(&self) -> usize {
    self.bugs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bugs.is_empty()
  }

  pub fn get(&self, bug_id: &str) -> Option<&GroundTruthBug> {
    self.by_id.get(bug_id).map(|&idx| &self.bugs[idx])
  }

  /// All bugs in a file. Paths are compared after normalization.
  pub fn bugs_in_file(&self, file_path: &str) -> Vec<&GroundTruthBug> {
    let wanted = normalize_file_path(file_path);
    self
      .bugs
      .iter()
      .filter(|bug| normalize_file_path(&bug.file_path) == wanted)
      .collect()
  }

  /// Number of distinct (normalized) files with at least one bug.
  pub fn files_with_bugs(&self) -> usize {
    let mut files: Vec<String> = self.bugs.iter().map(|b| normalize_file_path(&b.file_path)).collect();
    files.sort();
    files.dedup();
    files.len()
  }

  /// Bug counts per category bucket.
  pub fn categories(&self) -> BTreeMap<String, usize> {
    count_buckets(self.bugs.iter().map(|b| b.category.as_str()))
  }

  /// Bug counts per severity bucket.
  pub fn severities(&self) -> BTreeMap<String, usize> {
    count_buckets(self.bugs.iter().map(|b| b.severity.as_str()))
  }
}

/// Bucket key for an open-vocabulary label: trimmed, lower-cased, `unknown` when blank.
pub(crate) fn bucket_key(label: &str) -> String {
  let key = label.trim().to_lowercase();
  if key.is_empty() { "unknown".to_string() } else { key }
}

fn count_buckets<'a>(labels: impl Iterator<Item = &'a str>) -> BTreeMap<String, usize> {
  let mut counts = BTreeMap::new();
  for label in labels {
    *counts.entry(bucket_key(label)).or_insert(0) += 1;
  }
  counts
}
