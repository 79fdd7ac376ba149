//! Feature row + text vector → failure probability.

use std::sync::Arc;

use crate::artifact::ArtifactBundle;
use crate::error::EngineError;
use crate::features::FeatureVector;
use crate::vectorizer::vectorize;

/// Stateless wrapper over the shared artifacts; cheap to clone across workers.
#[derive(Debug, Clone)]
pub struct Scorer {
  artifacts: Arc<ArtifactBundle>,
}

impl Scorer {
  pub fn new(artifacts: Arc<ArtifactBundle>) -> Self {
    Self { artifacts }
  }

  pub fn artifacts(&self) -> &ArtifactBundle {
    &self.artifacts
  }

  /// Concatenate numeric columns with the text vector and ask the classifier.
  pub fn score(&self, features: &FeatureVector) -> Result<f64, EngineError> {
    let classifier = self.artifacts.classifier();
    let text = vectorize(self.artifacts.vectorizer(), &features.text)?;

    let mut row = Vec::with_capacity(features.numeric.len() + text.len());
    row.extend_from_slice(&features.numeric);
    row.extend(text);

    if row.len() != classifier.input_width() {
      return Err(EngineError::DimensionMismatch {
        what: "classifier input",
        expected: classifier.input_width(),
        actual: row.len(),
      });
    }

    let p = classifier.predict_proba(&row);
    if !p.is_finite() {
      tracing::error!(classifier = classifier.kind(), "classifier returned non-finite probability");
      return Err(EngineError::Scoring(format!(
        "{} returned non-finite probability",
        classifier.kind()
      )));
    }
    Ok(p.clamp(0.0, 1.0))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::artifact::{Classifier, LogisticModel};
  use crate::features::{from_manual, NUMERIC_FEATURES};
  use crate::types::ManualFeatureInput;
  use crate::vectorizer::TfidfVectorizer;
  use std::collections::HashMap;

  struct Fixed(f64);

  impl Classifier for Fixed {
    fn input_width(&self) -> usize {
      NUMERIC_FEATURES + 1
    }
    fn predict_proba(&self, _row: &[f64]) -> f64 {
      self.0
    }
    fn kind(&self) -> &'static str {
      "fixed"
    }
  }

  fn vectorizer() -> Box<TfidfVectorizer> {
    let vocab: HashMap<String, usize> = [("deploy".to_string(), 0)].into_iter().collect();
    Box::new(TfidfVectorizer::new(vocab, vec![1.0]).unwrap())
  }

  fn scorer_with(classifier: Box<dyn Classifier>) -> Scorer {
    Scorer::new(Arc::new(
      ArtifactBundle::from_parts(classifier, vectorizer()).unwrap(),
    ))
  }

  #[test]
  fn logistic_probability_uses_text_columns() {
    let mut weights = vec![0.0; NUMERIC_FEATURES + 1];
    weights[NUMERIC_FEATURES] = 2.0;
    let scorer = scorer_with(Box::new(LogisticModel::new(weights, 0.0).unwrap()));

    let mut fv = from_manual(&ManualFeatureInput::default());
    assert!((scorer.score(&fv).unwrap() - 0.5).abs() < 1e-12);

    fv.text = "deploy".into();
    let expected = 1.0 / (1.0 + (-2.0f64).exp());
    assert!((scorer.score(&fv).unwrap() - expected).abs() < 1e-12);
  }

  #[test]
  fn out_of_range_probability_is_clamped() {
    let scorer = scorer_with(Box::new(Fixed(1.3)));
    let fv = from_manual(&ManualFeatureInput::default());
    assert_eq!(scorer.score(&fv).unwrap(), 1.0);
  }

  #[test]
  fn nan_probability_is_scoring_error() {
    let scorer = scorer_with(Box::new(Fixed(f64::NAN)));
    let fv = from_manual(&ManualFeatureInput::default());
    let err = scorer.score(&fv).unwrap_err();
    assert!(matches!(err, EngineError::Scoring(_)));
    assert!(err.is_fatal());
  }
}
