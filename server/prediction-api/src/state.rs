//! Shared application state.

use std::sync::Arc;

use prediction_engine::policy::RiskPolicy;
use prediction_engine::Engine;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::history::JsonLines;

pub struct AppState {
  /// `None` when artifacts failed to load; prediction routes answer 503.
  pub engine: Option<Arc<Engine>>,
  pub policy: RiskPolicy,
  pub history: JsonLines,
  pub outbox: JsonLines,
}

impl AppState {
  pub fn new(engine: Option<Arc<Engine>>, config: &ApiConfig) -> Self {
    Self {
      engine,
      policy: RiskPolicy::new(config.engine.notification_threshold),
      history: JsonLines::new(&config.history_path),
      outbox: JsonLines::new(&config.outbox_path),
    }
  }

  pub fn engine(&self) -> Result<Arc<Engine>, ApiError> {
    self.engine.clone().ok_or(ApiError::ModelUnavailable)
  }
}
