//! Core types for the prediction engine (JSON contracts + internal models).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Categorical enums (normalized)
// ---------------------------------------------------------------------------
//
// Every categorical is total: unrecognized strings, null, and non-string values collapse
// to the default member instead of failing deserialization. `code()` is the training-time
// ordinal encoding.

fn loose<T: Default>(v: serde_json::Value, parse: fn(&str) -> T) -> T {
  match v {
    serde_json::Value::String(s) => parse(&s),
    _ => T::default(),
  }
}

/// CI/CD platform whose configuration dialect produced the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "serde_json::Value")]
pub enum Provider {
  GithubActions,
  GitlabCi,
  AzureDevops,
  Circleci,
  TravisCi,
  #[default]
  Unknown,
}

impl Provider {
  pub const ALL: [Provider; 6] = [
    Self::GithubActions,
    Self::GitlabCi,
    Self::AzureDevops,
    Self::Circleci,
    Self::TravisCi,
    Self::Unknown,
  ];

  pub fn from_str_loose(s: &str) -> Self {
    match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
      "github_actions" | "github" => Self::GithubActions,
      "gitlab_ci" | "gitlab" => Self::GitlabCi,
      "azure_devops" | "azure" | "azure_pipelines" => Self::AzureDevops,
      "circleci" | "circle_ci" | "circle" => Self::Circleci,
      "travis_ci" | "travis" => Self::TravisCi,
      _ => Self::Unknown,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::GithubActions => "github_actions",
      Self::GitlabCi => "gitlab_ci",
      Self::AzureDevops => "azure_devops",
      Self::Circleci => "circleci",
      Self::TravisCi => "travis_ci",
      Self::Unknown => "unknown",
    }
  }

  pub fn code(self) -> f64 {
    match self {
      Self::GithubActions => 4.0,
      Self::GitlabCi => 3.0,
      Self::AzureDevops => 2.0,
      Self::Circleci => 1.0,
      Self::TravisCi => 0.0,
      Self::Unknown => -1.0,
    }
  }
}

impl From<serde_json::Value> for Provider {
  fn from(v: serde_json::Value) -> Self {
    loose(v, Self::from_str_loose)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "serde_json::Value")]
pub enum EnvironmentType {
  Production,
  Staging,
  Development,
  #[default]
  Unknown,
}

impl EnvironmentType {
  pub fn from_str_loose(s: &str) -> Self {
    match s.trim().to_ascii_lowercase().as_str() {
      "production" | "prod" => Self::Production,
      "staging" | "stage" => Self::Staging,
      "development" | "dev" => Self::Development,
      _ => Self::Unknown,
    }
  }

  pub fn code(self) -> f64 {
    match self {
      Self::Production => 2.0,
      Self::Staging => 1.0,
      Self::Development => 0.0,
      Self::Unknown => -1.0,
    }
  }
}

impl From<serde_json::Value> for EnvironmentType {
  fn from(v: serde_json::Value) -> Self {
    loose(v, Self::from_str_loose)
  }
}

/// What starts the pipeline. `Manual` is the default member and shares the
/// encoding of an unrecognized trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "serde_json::Value")]
pub enum TriggerType {
  Push,
  PullRequest,
  Scheduled,
  #[default]
  Manual,
}

impl TriggerType {
  pub fn from_str_loose(s: &str) -> Self {
    match s.trim().to_ascii_lowercase().as_str() {
      "push" => Self::Push,
      "pull_request" | "pull_request_target" | "pr" | "merge_request" => Self::PullRequest,
      "scheduled" | "schedule" | "cron" => Self::Scheduled,
      _ => Self::Manual,
    }
  }

  pub fn code(self) -> f64 {
    match self {
      Self::Push => 2.0,
      Self::PullRequest => 1.0,
      Self::Scheduled => 0.0,
      Self::Manual => -1.0,
    }
  }
}

impl From<serde_json::Value> for TriggerType {
  fn from(v: serde_json::Value) -> Self {
    loose(v, Self::from_str_loose)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "serde_json::Value")]
pub enum BuildStatus {
  Success,
  Failure,
  #[default]
  Unknown,
}

impl BuildStatus {
  pub fn from_str_loose(s: &str) -> Self {
    match s.trim().to_ascii_lowercase().as_str() {
      "success" | "passed" => Self::Success,
      "failure" | "failed" => Self::Failure,
      _ => Self::Unknown,
    }
  }

  pub fn code(self) -> f64 {
    match self {
      Self::Success => 1.0,
      Self::Failure => 0.0,
      Self::Unknown => -1.0,
    }
  }
}

impl From<serde_json::Value> for BuildStatus {
  fn from(v: serde_json::Value) -> Self {
    loose(v, Self::from_str_loose)
  }
}

// ---------------------------------------------------------------------------
// Parser output
// ---------------------------------------------------------------------------

/// Provider-agnostic signals extracted from one configuration document.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RawPipelineSignals {
  pub provider: Provider,
  pub step_count: u32,
  pub job_text: String,
  pub trigger_type: TriggerType,
  pub environment_type: EnvironmentType,
  pub dependency_count: u32,
  pub structure_complexity: u32,
  pub has_test_stage: bool,
  pub has_deploy_stage: bool,
  /// Why the document degraded to `unknown`, when it could not be read as a mapping.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub parse_error: Option<String>,
}

// ---------------------------------------------------------------------------
// Inbound types (JSON contract: what the caller sends)
// ---------------------------------------------------------------------------

/// Manually entered pipeline metrics. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualFeatureInput {
  pub build_duration: f64,
  pub number_of_dependencies: f64,
  pub lines_of_code_changed: f64,
  pub commit_frequency: f64,
  pub test_coverage: f64,
  pub number_of_build_steps: f64,
  pub environment_type: EnvironmentType,
  pub build_trigger_type: TriggerType,
  pub previous_build_status: BuildStatus,
  pub code_complexity_score: f64,
  pub pipeline_tool: Provider,
}

impl Default for ManualFeatureInput {
  fn default() -> Self {
    Self {
      build_duration: 0.0,
      number_of_dependencies: 0.0,
      lines_of_code_changed: 0.0,
      commit_frequency: 0.0,
      test_coverage: 0.0,
      number_of_build_steps: 0.0,
      environment_type: EnvironmentType::Unknown,
      build_trigger_type: TriggerType::Manual,
      previous_build_status: BuildStatus::Unknown,
      code_complexity_score: 0.0,
      pipeline_tool: Provider::Unknown,
    }
  }
}

impl ManualFeatureInput {
  /// Numeric invariants: finite, non-negative, coverage within 0..=100.
  pub fn validate(&self) -> Result<(), EngineError> {
    let numeric = [
      ("build_duration", self.build_duration),
      ("number_of_dependencies", self.number_of_dependencies),
      ("lines_of_code_changed", self.lines_of_code_changed),
      ("commit_frequency", self.commit_frequency),
      ("test_coverage", self.test_coverage),
      ("number_of_build_steps", self.number_of_build_steps),
      ("code_complexity_score", self.code_complexity_score),
    ];
    for (field, value) in numeric {
      if !value.is_finite() {
        return Err(EngineError::validation(field, "must be a finite number"));
      }
      if value < 0.0 {
        return Err(EngineError::validation(field, "must be >= 0"));
      }
    }
    if self.test_coverage > 100.0 {
      return Err(EngineError::validation(
        "test_coverage",
        "must be within 0..=100",
      ));
    }
    Ok(())
  }
}

/// One request for the engine binary / `Engine::process`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionRequest {
  File {
    #[serde(default)]
    filename: Option<String>,
    content: String,
  },
  Form(ManualFeatureInput),
}

// ---------------------------------------------------------------------------
// Output types (JSON contract: what we emit)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionLabel {
  Success,
  Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLevel {
  Low,
  Medium,
  High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
  Low,
  Medium,
  High,
  Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
  Critical,
  Warning,
  Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
  pub should_notify: bool,
  pub threshold: f64,
  pub alert_type: AlertType,
  pub alert_message: String,
}

/// Policy decision for one probability (everything in the result except identity/time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
  pub prediction: PredictionLabel,
  pub confidence_level: ConfidenceLevel,
  pub risk_level: RiskLevel,
  pub message: String,
  pub notification: Notification,
}

/// Immutable engine output for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
  pub prediction: PredictionLabel,
  /// Probability of the `Fail` class.
  pub probability: f64,
  pub confidence_level: ConfidenceLevel,
  pub risk_level: RiskLevel,
  pub message: String,
  pub timestamp: DateTime<Utc>,
  pub provider: Provider,
  pub notification: Notification,
}

impl PredictionResult {
  pub fn new(
    probability: f64,
    assessment: RiskAssessment,
    provider: Provider,
    timestamp: DateTime<Utc>,
  ) -> Self {
    Self {
      prediction: assessment.prediction,
      probability,
      confidence_level: assessment.confidence_level,
      risk_level: assessment.risk_level,
      message: assessment.message,
      timestamp,
      provider,
      notification: assessment.notification,
    }
  }
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// Structured error output for invalid input lines.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}
