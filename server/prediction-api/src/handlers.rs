//! HTTP handlers for the prediction API.

use std::sync::Arc;

use axum::{
  body::Bytes,
  extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
  http::StatusCode,
  Json,
};
use chrono::Utc;
use prediction_engine::{ManualFeatureInput, PredictionResult};
use uuid::Uuid;

use crate::config::{allowed_file, ALLOWED_EXTENSIONS, MAX_UPLOAD_BYTES};
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::*;

/// History entries scanned from the tail of the log, and how many of those are returned.
const HISTORY_SCAN: usize = 50;
const HISTORY_LIMIT: usize = 20;

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
  Json(HealthResponse {
    status: "healthy",
    timestamp: Utc::now(),
    ml_processor: if state.engine.is_some() {
      "ready"
    } else {
      "not available"
    },
    version: env!("CARGO_PKG_VERSION"),
  })
}

pub async fn predict_file(
  State(state): State<Arc<AppState>>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
  state.engine()?;
  let mut multipart = multipart?;

  let mut upload = None;
  while let Some(field) = multipart.next_field().await? {
    if field.name() == Some("file") {
      let filename = field.file_name().map(str::to_string);
      let bytes = field.bytes().await?;
      upload = Some((filename, bytes));
      break;
    }
  }
  let (filename, bytes) = upload.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
  predict_upload(&state, filename, bytes).await.map(Json)
}

/// Validate an uploaded file, score it off the async runtime, and record it in history.
pub async fn predict_upload(
  state: &AppState,
  filename: Option<String>,
  bytes: Bytes,
) -> Result<PredictionResult, ApiError> {
  let engine = state.engine()?;
  let filename = filename
    .map(|f| f.trim().to_string())
    .filter(|f| !f.is_empty())
    .ok_or_else(|| ApiError::bad_request("No file selected"))?;
  if !allowed_file(&filename) {
    return Err(ApiError::bad_request(
      "Invalid file type. Please upload a .yml or .yaml file.",
    ));
  }

  let hint = filename.clone();
  let result = tokio::task::spawn_blocking(move || engine.predict_file(&bytes, Some(&hint)))
    .await
    .map_err(|e| ApiError::Internal(format!("prediction task: {}", e)))??;

  record(state, &result, Some(display_name(&filename))).await;
  Ok(result)
}

pub async fn predict_form(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<ManualFeatureInput>, JsonRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
  let engine = state.engine()?;
  let Json(input) = payload?;
  let result = engine.predict_manual(&input)?;
  record(&state, &result, None).await;
  Ok(Json(result))
}

/// Queue a notification for an external mailer when the probability clears the threshold.
pub async fn notify(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<NotifyRequest>, JsonRejection>,
) -> Result<Json<NotifyResponse>, ApiError> {
  let Json(req) = payload?;
  let prediction = req.prediction.ok_or_else(|| missing("prediction"))?;
  let probability = req.probability.ok_or_else(|| missing("probability"))?;
  let email = req.email.ok_or_else(|| missing("email"))?;

  if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
    return Err(ApiError::bad_request("probability must be within 0..=1"));
  }

  let assessment = state.policy.assess(probability);
  if !assessment.notification.should_notify {
    return Ok(Json(NotifyResponse {
      success: false,
      message: format!(
        "Probability ({:.1}%) below notification threshold ({:.1}%)",
        probability * 100.0,
        state.policy.notification_threshold * 100.0
      ),
    }));
  }

  let email = email.trim().to_string();
  if !looks_like_email(&email) {
    return Err(ApiError::bad_request("Recipient email address is required."));
  }

  let entry = OutboxEntry {
    id: Uuid::new_v4(),
    queued_at: Utc::now(),
    email,
    prediction,
    probability,
    alert_type: assessment.notification.alert_type,
    alert_message: assessment.notification.alert_message,
    recommendation: req.message.unwrap_or(assessment.message),
  };
  state.outbox.append(&entry).await?;
  tracing::info!(id = %entry.id, alert = ?entry.alert_type, "notification queued");

  Ok(Json(NotifyResponse {
    success: true,
    message: format!("Notification queued for {}", entry.email),
  }))
}

pub async fn model_info(
  State(state): State<Arc<AppState>>,
) -> Result<Json<ModelInfoResponse>, ApiError> {
  let engine = state.engine()?;
  Ok(Json(ModelInfoResponse {
    model: engine.model_info(),
    supported_formats: ALLOWED_EXTENSIONS.to_vec(),
    max_file_size: MAX_UPLOAD_BYTES,
  }))
}

pub async fn upload_history(
  State(state): State<Arc<AppState>>,
) -> Result<Json<HistoryResponse>, ApiError> {
  let mut history: Vec<HistoryEntry> = state.history.tail(HISTORY_SCAN).await?;
  let start = history.len().saturating_sub(HISTORY_LIMIT);
  Ok(Json(HistoryResponse {
    history: history.split_off(start),
  }))
}

pub async fn not_found() -> ApiError {
  ApiError::Rejected {
    status: StatusCode::NOT_FOUND,
    message: "Endpoint not found".into(),
  }
}

/// History is best-effort; a failed write never fails the prediction.
async fn record(state: &AppState, result: &PredictionResult, filename: Option<&str>) {
  let entry = HistoryEntry::from_result(result, filename);
  if let Err(e) = state.history.append(&entry).await {
    tracing::warn!(path = %state.history.path().display(), error = %e, "could not record prediction");
  }
}

fn missing(field: &str) -> ApiError {
  ApiError::bad_request(format!("Missing required field: {}", field))
}

/// Last path component, so client-side directories never reach the log.
fn display_name(filename: &str) -> &str {
  filename.rsplit(['/', '\\']).next().unwrap_or(filename)
}

fn looks_like_email(s: &str) -> bool {
  match s.split_once('@') {
    Some((local, domain)) => !local.is_empty() && domain.contains('.') && !s.contains(char::is_whitespace),
    None => false,
  }
}
