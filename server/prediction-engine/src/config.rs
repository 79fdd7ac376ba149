//! Engine configuration with sane defaults.

use std::path::PathBuf;

use crate::error::EngineError;
use crate::policy::DEFAULT_NOTIFICATION_THRESHOLD;

const DEFAULT_MODEL_PATH: &str = "artifacts/model.json";
const DEFAULT_VECTORIZER_PATH: &str = "artifacts/vectorizer.json";

/// Tunable engine settings. Only `notification_threshold` affects scoring output.
#[derive(Debug, Clone)]
pub struct Config {
  /// Failure probability at or above which a notification should be sent (0..=1).
  pub notification_threshold: f64,
  /// Classifier artifact (JSON).
  pub model_path: PathBuf,
  /// Text vectorizer artifact (JSON).
  pub vectorizer_path: PathBuf,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      notification_threshold: DEFAULT_NOTIFICATION_THRESHOLD,
      model_path: PathBuf::from(DEFAULT_MODEL_PATH),
      vectorizer_path: PathBuf::from(DEFAULT_VECTORIZER_PATH),
    }
  }
}

impl Config {
  /// Read `NOTIFICATION_THRESHOLD`, `MODEL_PATH` and `VECTORIZER_PATH`, falling back to defaults.
  ///
  /// A threshold that is present but unparseable is an error rather than a silent default.
  pub fn from_env() -> Result<Self, EngineError> {
    let defaults = Self::default();

    let notification_threshold = match std::env::var("NOTIFICATION_THRESHOLD") {
      Ok(raw) => raw.trim().parse::<f64>().map_err(|e| {
        EngineError::config(format!("NOTIFICATION_THRESHOLD {:?}: {}", raw, e))
      })?,
      Err(_) => defaults.notification_threshold,
    };

    let model_path = std::env::var("MODEL_PATH")
      .map(PathBuf::from)
      .unwrap_or(defaults.model_path);
    let vectorizer_path = std::env::var("VECTORIZER_PATH")
      .map(PathBuf::from)
      .unwrap_or(defaults.vectorizer_path);

    let config = Self {
      notification_threshold,
      model_path,
      vectorizer_path,
    };
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), EngineError> {
    let t = self.notification_threshold;
    if !t.is_finite() || !(0.0..=1.0).contains(&t) {
      return Err(EngineError::config(format!(
        "notification_threshold must be within 0..=1, got {}",
        t
      )));
    }
    Ok(())
  }
}
