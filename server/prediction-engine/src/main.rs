//! Binary entrypoint: read JSON lines from stdin, write JSON lines to stdout.
//!
//! Each input line is a PredictionRequest (`{"kind":"file",...}` or `{"kind":"form",...}`).
//! Output lines are either:
//! - A PredictionResult
//! - An ErrorOutput (when the line is not valid JSON or fails validation)
//!
//! Artifact failures are fatal: the process logs to stderr and exits 1.

use std::io::{self, BufRead, Write};

use prediction_engine::types::ErrorOutput;
use prediction_engine::{Config, Engine, EngineError, PredictionRequest};
use tracing_subscriber::EnvFilter;

fn main() {
  // stdout carries results only; logs go to stderr.
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let engine = match Config::from_env().and_then(Engine::load) {
    Ok(e) => e,
    Err(e) => {
      tracing::error!(error = %e, "prediction-engine: startup failed");
      std::process::exit(1);
    }
  };

  let stdin = io::stdin();
  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());

  for line in stdin.lock().lines() {
    let line = match line {
      Ok(l) => l,
      Err(e) => {
        tracing::error!(error = %e, "prediction-engine: read error");
        std::process::exit(1);
      }
    };

    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    let request: PredictionRequest = match serde_json::from_str(trimmed) {
      Ok(v) => v,
      Err(e) => {
        emit(&mut out, &ErrorOutput::new(format!("json parse: {}", e)));
        continue;
      }
    };

    match engine.process(&request) {
      Ok(result) => emit(&mut out, &result),
      Err(e) if e.is_fatal() => {
        let _ = out.flush();
        tracing::error!(error = %e, "prediction-engine: fatal scoring error");
        std::process::exit(1);
      }
      Err(EngineError::Validation { field, reason }) => {
        emit(&mut out, &ErrorOutput::new(reason).with_field(field));
      }
      Err(e) => emit(&mut out, &ErrorOutput::new(e.to_string())),
    }
  }

  let _ = out.flush();
}

fn emit<W: Write, T: serde::Serialize>(out: &mut W, value: &T) {
  let _ = serde_json::to_writer(&mut *out, value);
  let _ = writeln!(out);
}
