//! Core engine: file or form input in, `PredictionResult` out.
//!
//! Stateless per request. The only shared state is the read-only artifact bundle,
//! so one `Engine` can serve any number of threads behind an `Arc`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::artifact::{ArtifactBundle, ArtifactInfo};
use crate::config::Config;
use crate::error::EngineError;
use crate::features;
use crate::parser;
use crate::policy::RiskPolicy;
use crate::scorer::Scorer;
use crate::types::*;

/// What the engine is running with, for health/introspection endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
  #[serde(flatten)]
  pub artifacts: ArtifactInfo,
  pub notification_threshold: f64,
  pub providers: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct Engine {
  config: Config,
  scorer: Scorer,
  policy: RiskPolicy,
}

impl Engine {
  pub fn new(config: Config, artifacts: Arc<ArtifactBundle>) -> Result<Self, EngineError> {
    config.validate()?;
    let policy = RiskPolicy::new(config.notification_threshold);
    Ok(Self {
      config,
      scorer: Scorer::new(artifacts),
      policy,
    })
  }

  /// Load artifacts from the configured paths. Startup-only.
  pub fn load(config: Config) -> Result<Self, EngineError> {
    config.validate()?;
    let bundle = ArtifactBundle::load(&config.model_path, &config.vectorizer_path)?;
    Self::new(config, Arc::new(bundle))
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn predict_file(
    &self,
    content: &[u8],
    filename: Option<&str>,
  ) -> Result<PredictionResult, EngineError> {
    self.predict_file_at(content, filename, Utc::now())
  }

  pub fn predict_file_at(
    &self,
    content: &[u8],
    filename: Option<&str>,
    timestamp: DateTime<Utc>,
  ) -> Result<PredictionResult, EngineError> {
    let signals = parser::parse(content, filename);
    let fv = features::from_signals(&signals);
    let probability = self.scorer.score(&fv)?;
    tracing::debug!(
      provider = signals.provider.as_str(),
      steps = signals.step_count,
      probability,
      "scored pipeline file"
    );
    Ok(PredictionResult::new(
      probability,
      self.policy.assess(probability),
      signals.provider,
      timestamp,
    ))
  }

  pub fn predict_manual(&self, input: &ManualFeatureInput) -> Result<PredictionResult, EngineError> {
    self.predict_manual_at(input, Utc::now())
  }

  pub fn predict_manual_at(
    &self,
    input: &ManualFeatureInput,
    timestamp: DateTime<Utc>,
  ) -> Result<PredictionResult, EngineError> {
    input.validate()?;
    let fv = features::from_manual(input);
    let probability = self.scorer.score(&fv)?;
    tracing::debug!(
      provider = input.pipeline_tool.as_str(),
      probability,
      "scored manual input"
    );
    Ok(PredictionResult::new(
      probability,
      self.policy.assess(probability),
      input.pipeline_tool,
      timestamp,
    ))
  }

  /// Dispatch one request (stdin binary entry point).
  pub fn process(&self, request: &PredictionRequest) -> Result<PredictionResult, EngineError> {
    self.process_at(request, Utc::now())
  }

  pub fn process_at(
    &self,
    request: &PredictionRequest,
    timestamp: DateTime<Utc>,
  ) -> Result<PredictionResult, EngineError> {
    match request {
      PredictionRequest::File { filename, content } => {
        self.predict_file_at(content.as_bytes(), filename.as_deref(), timestamp)
      }
      PredictionRequest::Form(input) => self.predict_manual_at(input, timestamp),
    }
  }

  pub fn model_info(&self) -> ModelInfo {
    ModelInfo {
      artifacts: self.scorer.artifacts().info().clone(),
      notification_threshold: self.policy.notification_threshold,
      providers: Provider::ALL
        .iter()
        .filter(|p| **p != Provider::Unknown)
        .map(|p| p.as_str())
        .collect(),
    }
  }
}
