//! Request/response types for the prediction API.

use chrono::{DateTime, Utc};
use prediction_engine::types::{AlertType, PredictionLabel, RiskLevel};
use prediction_engine::{ModelInfo, PredictionResult, Provider};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
  pub status: &'static str,
  pub timestamp: DateTime<Utc>,
  /// `ready` or `not available`.
  pub ml_processor: &'static str,
  pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ModelInfoResponse {
  #[serde(flatten)]
  pub model: ModelInfo,
  pub supported_formats: Vec<&'static str>,
  pub max_file_size: usize,
}

/// `/notify` body. Fields are optional so a missing one is reported by name.
#[derive(Debug, Default, Deserialize)]
pub struct NotifyRequest {
  pub prediction: Option<String>,
  pub probability: Option<f64>,
  pub email: Option<String>,
  /// Recommendation shown to the user; the policy's text is used when absent.
  pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotifyResponse {
  pub success: bool,
  pub message: String,
}

/// Queued notification, consumed by an external mailer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
  pub id: Uuid,
  pub queued_at: DateTime<Utc>,
  pub email: String,
  pub prediction: String,
  pub probability: f64,
  pub alert_type: AlertType,
  pub alert_message: String,
  pub recommendation: String,
}

/// One line of the prediction history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub timestamp: DateTime<Utc>,
  /// Uploaded file name, or `Manual` for form predictions.
  pub filename: String,
  pub prediction: PredictionLabel,
  pub probability: f64,
  pub risk_level: RiskLevel,
  pub provider: Provider,
}

impl HistoryEntry {
  pub fn from_result(result: &PredictionResult, filename: Option<&str>) -> Self {
    Self {
      timestamp: result.timestamp,
      filename: filename.unwrap_or("Manual").to_string(),
      prediction: result.prediction,
      probability: result.probability,
      risk_level: result.risk_level,
      provider: result.provider,
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
  pub history: Vec<HistoryEntry>,
}
