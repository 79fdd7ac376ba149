//! API errors and their JSON responses (`{"error": code, "message": text}`).

use axum::{
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use prediction_engine::EngineError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),

  /// Extractor rejections (multipart, JSON body); keeps axum's status, e.g. 413 past the body limit.
  #[error("{message}")]
  Rejected { status: StatusCode, message: String },

  #[error("ML model not available. Please check server configuration.")]
  ModelUnavailable,

  #[error(transparent)]
  Engine(#[from] EngineError),

  #[error("io: {0}")]
  Io(#[from] std::io::Error),

  #[error("config: {0}")]
  Config(String),

  #[error("internal: {0}")]
  Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
  error: &'static str,
  message: String,
}

impl ApiError {
  pub fn bad_request(msg: impl Into<String>) -> Self {
    Self::BadRequest(msg.into())
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Rejected { status, .. } => *status,
      Self::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
      Self::Engine(EngineError::Validation { .. }) => StatusCode::BAD_REQUEST,
      Self::Engine(e) if e.is_fatal() => StatusCode::SERVICE_UNAVAILABLE,
      Self::Engine(_) | Self::Io(_) | Self::Config(_) | Self::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn code(&self) -> &'static str {
    match self.status() {
      StatusCode::BAD_REQUEST => "bad_request",
      StatusCode::NOT_FOUND => "not_found",
      StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
      StatusCode::SERVICE_UNAVAILABLE => "model_unavailable",
      s if s.is_client_error() => "invalid_request",
      _ => "internal_error",
    }
  }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
  fn from(e: axum::extract::multipart::MultipartError) -> Self {
    Self::Rejected {
      status: e.status(),
      message: e.body_text(),
    }
  }
}

impl From<axum::extract::multipart::MultipartRejection> for ApiError {
  fn from(e: axum::extract::multipart::MultipartRejection) -> Self {
    Self::Rejected {
      status: e.status(),
      message: e.body_text(),
    }
  }
}

/// Well-formed JSON of the wrong shape is a bad request, not axum's default 422.
impl From<JsonRejection> for ApiError {
  fn from(e: JsonRejection) -> Self {
    match e {
      JsonRejection::JsonDataError(e) => Self::BadRequest(e.body_text()),
      other => Self::Rejected {
        status: other.status(),
        message: other.body_text(),
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, status = status.as_u16(), "request failed");
    } else {
      tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
    }
    let body = ErrorBody {
      error: self.code(),
      message: self.to_string(),
    };
    (status, Json(body)).into_response()
  }
}
