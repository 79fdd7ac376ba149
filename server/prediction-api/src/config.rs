//! API configuration from environment variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use prediction_engine::Config as EngineConfig;

use crate::error::ApiError;

/// Upload ceiling enforced before the engine sees any bytes.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub host: IpAddr,
  pub port: u16,
  pub history_path: PathBuf,
  pub outbox_path: PathBuf,
  pub engine: EngineConfig,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      host: IpAddr::V4(Ipv4Addr::LOCALHOST),
      port: 5000,
      history_path: PathBuf::from("logs/predictions.jsonl"),
      outbox_path: PathBuf::from("logs/notifications.jsonl"),
      engine: EngineConfig::default(),
    }
  }
}

impl ApiConfig {
  /// `HOST`, `PORT`, `HISTORY_PATH`, `OUTBOX_PATH` plus the engine's own variables.
  pub fn from_env() -> Result<Self, ApiError> {
    let defaults = Self::default();
    let engine = EngineConfig::from_env().map_err(|e| ApiError::Config(e.to_string()))?;

    let host = match std::env::var("HOST") {
      Ok(raw) => raw
        .parse()
        .map_err(|e| ApiError::Config(format!("HOST {:?}: {}", raw, e)))?,
      Err(_) => defaults.host,
    };
    let port = match std::env::var("PORT") {
      Ok(raw) => raw
        .parse()
        .map_err(|e| ApiError::Config(format!("PORT {:?}: {}", raw, e)))?,
      Err(_) => defaults.port,
    };

    Ok(Self {
      host,
      port,
      history_path: std::env::var("HISTORY_PATH")
        .map(PathBuf::from)
        .unwrap_or(defaults.history_path),
      outbox_path: std::env::var("OUTBOX_PATH")
        .map(PathBuf::from)
        .unwrap_or(defaults.outbox_path),
      engine,
    })
  }

  pub fn addr(&self) -> SocketAddr {
    SocketAddr::new(self.host, self.port)
  }
}

/// Case-insensitive `.yml` / `.yaml` check on the uploaded file name.
pub fn allowed_file(filename: &str) -> bool {
  filename
    .rsplit_once('.')
    .map(|(_, ext)| {
      ALLOWED_EXTENSIONS
        .iter()
        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
    })
    .unwrap_or(false)
}
