//! Build the canonical feature row from parsed signals or manual input.
//!
//! Both entry paths produce the same column layout, so a classifier trained on one
//! scores the other. Numeric values are passed through unscaled; categoricals use
//! the fixed ordinal table on the `code()` methods of the enums in `types`.

use serde::Serialize;

use crate::types::{BuildStatus, ManualFeatureInput, RawPipelineSignals};

/// Identifier of the column layout + categorical encoding. Artifacts must declare the same.
pub const ENCODING_VERSION: &str = "v1";

/// Column names in row order.
pub const COLUMNS: [&str; 14] = [
  "build_duration",
  "number_of_dependencies",
  "lines_of_code_changed",
  "commit_frequency",
  "test_coverage",
  "number_of_build_steps",
  "code_complexity_score",
  "structure_complexity",
  "has_test_stage",
  "has_deploy_stage",
  "environment_type",
  "build_trigger_type",
  "previous_build_status",
  "pipeline_tool",
];

pub const NUMERIC_FEATURES: usize = COLUMNS.len();

/// Fixed-width numeric row plus the normalized text blob for the vectorizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
  pub numeric: [f64; NUMERIC_FEATURES],
  pub text: String,
}

impl FeatureVector {
  /// Column value by name (test and inspection helper).
  pub fn get(&self, column: &str) -> Option<f64> {
    COLUMNS
      .iter()
      .position(|c| *c == column)
      .map(|i| self.numeric[i])
  }
}

/// File path: hints the document did not provide stay at their defaults.
pub fn from_signals(signals: &RawPipelineSignals) -> FeatureVector {
  let numeric = [
    0.0,
    f64::from(signals.dependency_count),
    0.0,
    0.0,
    0.0,
    f64::from(signals.step_count),
    0.0,
    f64::from(signals.structure_complexity),
    flag(signals.has_test_stage),
    flag(signals.has_deploy_stage),
    signals.environment_type.code(),
    signals.trigger_type.code(),
    BuildStatus::Unknown.code(),
    signals.provider.code(),
  ];
  FeatureVector {
    numeric,
    text: normalize_text(&signals.job_text),
  }
}

/// Form path: the manual form carries no document, so text and structural columns are empty.
pub fn from_manual(input: &ManualFeatureInput) -> FeatureVector {
  let numeric = [
    input.build_duration,
    input.number_of_dependencies,
    input.lines_of_code_changed,
    input.commit_frequency,
    input.test_coverage,
    input.number_of_build_steps,
    input.code_complexity_score,
    0.0,
    0.0,
    0.0,
    input.environment_type.code(),
    input.build_trigger_type.code(),
    input.previous_build_status.code(),
    input.pipeline_tool.code(),
  ];
  FeatureVector {
    numeric,
    text: String::new(),
  }
}

/// Lower-case and collapse every whitespace run to a single space.
pub fn normalize_text(text: &str) -> String {
  text
    .split_whitespace()
    .map(str::to_lowercase)
    .collect::<Vec<_>>()
    .join(" ")
}

fn flag(b: bool) -> f64 {
  if b {
    1.0
  } else {
    0.0
  }
}
