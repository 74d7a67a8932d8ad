//! Shared configuration for the bug-detection evaluator.

pub mod config;

pub use config::{Config, ConfigError, EmbeddingConfig, EmbeddingProviderKind, EvaluationConfig, ReportConfig};
