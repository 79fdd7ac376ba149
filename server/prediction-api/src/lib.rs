//! CI/CD Failure Prediction API
//!
//! HTTP boundary around the prediction engine: file upload or manual form in,
//! PredictionResult JSON out. Bind to 127.0.0.1 by default (internal only).

mod config;
mod error;
mod handlers;
mod history;
mod state;
mod types;

use std::sync::Arc;

use axum::{
  extract::DefaultBodyLimit,
  routing::{get, post},
  Router,
};
use tower_http::cors::CorsLayer;

pub use config::{ApiConfig, MAX_UPLOAD_BYTES};
pub use error::ApiError;
pub use handlers::{health, model_info, notify, predict_file, predict_form, upload_history};
pub use state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/health", get(health))
    .route("/predict-file", post(predict_file))
    .route("/predict-form", post(predict_form))
    .route("/notify", post(notify))
    .route("/model-info", get(model_info))
    .route("/upload-history", get(upload_history))
    .fallback(handlers::not_found)
    .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
    .layer(CorsLayer::permissive())
    .with_state(state)
}
