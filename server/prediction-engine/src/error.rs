//! Structured error types for the prediction engine.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },

  #[error("config: {0}")]
  Config(String),

  #[error("artifact: {0}")]
  Artifact(#[from] ArtifactError),

  #[error("dimension mismatch: {what}: expected {expected}, got {actual}")]
  DimensionMismatch {
    what: &'static str,
    expected: usize,
    actual: usize,
  },

  #[error("scoring: {0}")]
  Scoring(String),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl EngineError {
  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn config(msg: impl Into<String>) -> Self {
    Self::Config(msg.into())
  }

  /// Fatal errors mean the engine cannot produce a meaningful score at all
  /// (missing/inconsistent artifacts). Callers surface these as service-unavailable.
  pub fn is_fatal(&self) -> bool {
    matches!(
      self,
      Self::Artifact(_) | Self::DimensionMismatch { .. } | Self::Scoring(_)
    )
  }
}

/// Errors raised while loading or validating classifier/vectorizer artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
  #[error("read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("decode {path}: {source}")]
  Decode {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("encoding version {found:?} does not match engine encoding {expected:?}")]
  EncodingVersion { expected: String, found: String },

  #[error("classifier expects {classifier} inputs but features provide {numeric} numeric + {text} text")]
  Width {
    classifier: usize,
    numeric: usize,
    text: usize,
  },

  #[error("invalid artifact: {0}")]
  Invalid(String),
}

impl ArtifactError {
  pub fn invalid(msg: impl Into<String>) -> Self {
    Self::Invalid(msg.into())
  }
}
