//! Integration tests for the prediction engine, using the JSON artifacts in `tests/fixtures`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, TimeZone, Utc};
use prediction_engine::features::{self, NUMERIC_FEATURES};
use prediction_engine::parser;
use prediction_engine::types::{AlertType, PredictionLabel, RiskLevel};
use prediction_engine::{
  ArtifactBundle, ArtifactError, Config, Engine, EngineError, ManualFeatureInput,
  PredictionRequest, Provider,
};

fn fixture(name: &str) -> PathBuf {
  Path::new(env!("CARGO_MANIFEST_DIR"))
    .join("tests/fixtures")
    .join(name)
}

fn read_fixture(name: &str) -> Vec<u8> {
  std::fs::read(fixture(name)).unwrap()
}

fn config_with(model: &str) -> Config {
  Config {
    model_path: fixture(model),
    vectorizer_path: fixture("vectorizer.json"),
    ..Config::default()
  }
}

fn engine() -> Engine {
  Engine::load(config_with("model.json")).unwrap()
}

fn ts() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap()
}

#[test]
fn default_form_is_low_risk_without_notification() {
  let result = engine()
    .predict_manual(&ManualFeatureInput::default())
    .unwrap();

  assert_eq!(result.prediction, PredictionLabel::Success);
  assert_eq!(result.risk_level, RiskLevel::Low);
  assert!(!result.notification.should_notify);
  assert_eq!(result.notification.alert_type, AlertType::Info);
  assert_eq!(result.provider, Provider::Unknown);
  // z = -2.0 + 0.3 * -1 + -0.8 * -1
  let expected = 1.0 / (1.0 + 1.5f64.exp());
  assert!((result.probability - expected).abs() < 1e-12);
}

#[test]
fn risky_release_workflow_is_critical() {
  let engine = engine();
  let result = engine
    .predict_file(&read_fixture("pipelines/release.yml"), Some("release.yml"))
    .unwrap();

  assert_eq!(result.provider, Provider::GithubActions);
  assert_eq!(result.prediction, PredictionLabel::Fail);
  assert_eq!(result.risk_level, RiskLevel::Critical);
  assert!(result.notification.should_notify);
  assert_eq!(result.notification.alert_type, AlertType::Critical);
}

#[test]
fn plain_gitlab_pipeline_is_low_risk() {
  let engine = engine();
  let result = engine
    .predict_file(
      &read_fixture("pipelines/.gitlab-ci.yml"),
      Some(".gitlab-ci.yml"),
    )
    .unwrap();

  assert_eq!(result.provider, Provider::GitlabCi);
  assert_eq!(result.risk_level, RiskLevel::Low);
  assert!(!result.notification.should_notify);
}

#[test]
fn binary_yaml_upload_degrades_to_unknown_provider() {
  let garbage: Vec<u8> = (0u8..=255).cycle().skip(7).step_by(13).take(512).collect();
  let result = engine().predict_file(&garbage, Some("pipeline.yaml")).unwrap();

  assert_eq!(result.provider, Provider::Unknown);
  assert!((0.0..=1.0).contains(&result.probability));
}

#[test]
fn empty_file_scores_like_defaults() {
  let result = engine().predict_file(b"", Some("empty.yml")).unwrap();
  assert_eq!(result.provider, Provider::Unknown);
  assert_eq!(result.risk_level, RiskLevel::Low);
}

#[test]
fn repeated_scoring_is_identical() {
  let engine = engine();
  let content = read_fixture("pipelines/release.yml");

  let a = engine.predict_file_at(&content, None, ts()).unwrap();
  let b = engine.predict_file_at(&content, None, ts()).unwrap();
  assert_eq!(a, b);

  let input = ManualFeatureInput {
    build_duration: 300.0,
    test_coverage: 72.5,
    ..ManualFeatureInput::default()
  };
  assert_eq!(
    engine.predict_manual_at(&input, ts()).unwrap(),
    engine.predict_manual_at(&input, ts()).unwrap()
  );
}

#[test]
fn file_and_form_rows_have_the_same_width() {
  for name in ["pipelines/release.yml", "pipelines/.gitlab-ci.yml"] {
    let signals = parser::parse(&read_fixture(name), Some(name));
    assert_eq!(features::from_signals(&signals).numeric.len(), NUMERIC_FEATURES);
  }
  let form = features::from_manual(&ManualFeatureInput::default());
  assert_eq!(form.numeric.len(), NUMERIC_FEATURES);
}

#[test]
fn process_handles_json_requests() {
  let engine = engine();
  let file: PredictionRequest = serde_json::from_str(
    r#"{"kind":"file","filename":".travis.yml","content":"language: node_js\nscript:\n  - npm test\n"}"#,
  )
  .unwrap();
  let result = engine.process_at(&file, ts()).unwrap();
  assert_eq!(result.provider, Provider::TravisCi);

  let json = serde_json::to_value(&result).unwrap();
  assert_eq!(json["timestamp"], "2025-01-15T10:30:00Z");
  assert_eq!(json["provider"], "travis_ci");
  assert!(json["notification"]["threshold"].is_number());

  let form: PredictionRequest =
    serde_json::from_str(r#"{"kind":"form","test_coverage":250}"#).unwrap();
  let err = engine.process(&form).unwrap_err();
  assert!(matches!(err, EngineError::Validation { .. }));
}

#[test]
fn tree_ensemble_artifact_scores_deploy_stage() {
  let engine = Engine::load(config_with("tree_model.json")).unwrap();
  assert_eq!(engine.model_info().artifacts.classifier_kind, "tree_ensemble");

  let deploy = engine
    .predict_file(&read_fixture("pipelines/release.yml"), None)
    .unwrap();
  assert!((deploy.probability - 1.0 / (1.0 + (-1.5f64).exp())).abs() < 1e-12);
  assert_eq!(deploy.risk_level, RiskLevel::Critical);

  let form = engine
    .predict_manual(&ManualFeatureInput::default())
    .unwrap();
  assert!((form.probability - 1.0 / (1.0 + 1.0f64.exp())).abs() < 1e-12);
  assert_eq!(form.risk_level, RiskLevel::Low);
}

#[test]
fn model_info_carries_digests() {
  let info = engine().model_info();
  assert_eq!(info.artifacts.input_width, NUMERIC_FEATURES + 6);
  assert_eq!(info.artifacts.vocabulary_size, Some(6));
  assert!(info.artifacts.model_digest.is_some());
  assert!(info.artifacts.vectorizer_digest.is_some());
  assert_ne!(
    info.artifacts.model_digest,
    info.artifacts.vectorizer_digest
  );
}

#[test]
fn narrow_classifier_is_rejected_at_load() {
  let mut model = tempfile::NamedTempFile::new().unwrap();
  let weights = vec!["0.1"; NUMERIC_FEATURES].join(",");
  write!(
    model,
    r#"{{"encoding_version":"v1","classifier":{{"kind":"logistic","weights":[{}],"intercept":0.0}}}}"#,
    weights
  )
  .unwrap();

  let err = ArtifactBundle::load(model.path(), &fixture("vectorizer.json")).unwrap_err();
  assert!(matches!(
    err,
    ArtifactError::Width {
      classifier: 14,
      numeric: 14,
      text: 6
    }
  ));
}

#[test]
fn missing_artifacts_are_fatal() {
  let config = Config {
    model_path: PathBuf::from("/nonexistent/model.json"),
    ..config_with("model.json")
  };
  let err = Engine::load(config).unwrap_err();
  assert!(err.is_fatal());
}

#[test]
fn engine_is_shared_across_threads() {
  let engine = Arc::new(engine());
  let content = Arc::new(read_fixture("pipelines/release.yml"));
  let expected = engine.predict_file_at(&content, None, ts()).unwrap();

  let handles: Vec<_> = (0..8)
    .map(|i| {
      let engine = Arc::clone(&engine);
      let content = Arc::clone(&content);
      thread::spawn(move || {
        if i % 2 == 0 {
          engine.predict_file_at(&content, None, ts()).unwrap()
        } else {
          engine
            .predict_manual_at(&ManualFeatureInput::default(), ts())
            .unwrap()
        }
      })
    })
    .collect();

  for (i, handle) in handles.into_iter().enumerate() {
    let result = handle.join().unwrap();
    if i % 2 == 0 {
      assert_eq!(result, expected);
    } else {
      assert_eq!(result.risk_level, RiskLevel::Low);
    }
  }
}
