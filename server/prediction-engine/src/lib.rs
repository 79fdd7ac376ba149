//! CI/CD Failure Prediction Engine: deterministic feature extraction + risk policy
//! around a pre-trained classifier.
//!
//! Accepts either a CI configuration document (five provider dialects, detected
//! structurally) or manually entered pipeline metrics, builds one fixed-shape
//! feature row for both, scores it, and maps the failure probability to a
//! prediction, risk tier, confidence level, and notification decision.
//!
//! No DB, no network; artifacts are loaded once and shared read-only.

pub mod artifact;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod parser;
pub mod policy;
pub mod scorer;
pub mod types;
pub mod vectorizer;

pub use artifact::ArtifactBundle;
pub use config::Config;
pub use engine::{Engine, ModelInfo};
pub use error::{ArtifactError, EngineError};
pub use types::{ManualFeatureInput, PredictionRequest, PredictionResult, Provider};
