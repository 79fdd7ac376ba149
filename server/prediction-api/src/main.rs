//! Binary entrypoint for the prediction API.

use std::sync::Arc;

use prediction_api::{ApiConfig, AppState};
use prediction_engine::Engine;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let config = ApiConfig::from_env()?;

  // The API still starts without artifacts; prediction routes answer 503 until fixed.
  let engine = match Engine::load(config.engine.clone()) {
    Ok(engine) => Some(Arc::new(engine)),
    Err(e) => {
      tracing::error!(error = %e, "prediction artifacts unavailable");
      None
    }
  };
  tracing::info!(
    threshold = config.engine.notification_threshold,
    ready = engine.is_some(),
    "prediction engine initialized"
  );

  let state = Arc::new(AppState::new(engine, &config));
  let app = prediction_api::app(state);

  let addr = config.addr();
  tracing::info!("prediction-api listening on http://{}", addr);

  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app).await?;

  Ok(())
}
