//! Text vectorization: the adapter around the offline-trained TF-IDF artifact.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{ArtifactError, EngineError};
use crate::features::normalize_text;

/// Text → fixed-width numeric vector. Implementations are immutable after load.
pub trait TextVectorizer: Send + Sync {
  /// Output width; fixed for the lifetime of the artifact.
  fn dimension(&self) -> usize;

  /// Pure transform. Must return exactly `dimension()` values.
  fn transform(&self, text: &str) -> Vec<f64>;

  fn kind(&self) -> &'static str;

  fn vocabulary_size(&self) -> Option<usize> {
    None
  }
}

/// Normalize text, vectorize it, and check the width before it reaches the scorer.
pub fn vectorize(vectorizer: &dyn TextVectorizer, text: &str) -> Result<Vec<f64>, EngineError> {
  let normalized = normalize_text(text);
  let expected = vectorizer.dimension();
  if normalized.is_empty() {
    return Ok(vec![0.0; expected]);
  }

  let vector = vectorizer.transform(&normalized);
  if vector.len() != expected {
    tracing::error!(
      expected,
      actual = vector.len(),
      "vectorizer output width does not match declared dimension"
    );
    return Err(EngineError::DimensionMismatch {
      what: "text vector",
      expected,
      actual: vector.len(),
    });
  }
  Ok(vector)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
  #[default]
  L2,
  None,
}

fn default_ngram_range() -> (usize, usize) {
  (1, 1)
}

/// TF-IDF weights exported from the training pipeline.
///
/// Tokens are runs of two or more word characters; n-grams are joined with a
/// single space, matching the exporter's vocabulary keys.
#[derive(Debug, Clone, Deserialize)]
pub struct TfidfVectorizer {
  vocabulary: HashMap<String, usize>,
  idf: Vec<f64>,
  #[serde(default = "default_ngram_range")]
  ngram_range: (usize, usize),
  #[serde(default)]
  sublinear_tf: bool,
  #[serde(default)]
  norm: Norm,
}

impl TfidfVectorizer {
  pub fn new(vocabulary: HashMap<String, usize>, idf: Vec<f64>) -> Result<Self, ArtifactError> {
    let v = Self {
      vocabulary,
      idf,
      ngram_range: default_ngram_range(),
      sublinear_tf: false,
      norm: Norm::L2,
    };
    v.validate()?;
    Ok(v)
  }

  pub fn with_ngram_range(mut self, min_n: usize, max_n: usize) -> Result<Self, ArtifactError> {
    self.ngram_range = (min_n, max_n);
    self.validate()?;
    Ok(self)
  }

  pub fn with_norm(mut self, norm: Norm) -> Self {
    self.norm = norm;
    self
  }

  pub fn with_sublinear_tf(mut self, sublinear_tf: bool) -> Self {
    self.sublinear_tf = sublinear_tf;
    self
  }

  pub fn validate(&self) -> Result<(), ArtifactError> {
    let (min_n, max_n) = self.ngram_range;
    if min_n == 0 || min_n > max_n {
      return Err(ArtifactError::invalid(format!(
        "tfidf: bad ngram_range ({}, {})",
        min_n, max_n
      )));
    }
    if let Some((term, &col)) = self.vocabulary.iter().find(|(_, &c)| c >= self.idf.len()) {
      return Err(ArtifactError::invalid(format!(
        "tfidf: term {:?} maps to column {} but idf has {} entries",
        term,
        col,
        self.idf.len()
      )));
    }
    if self.idf.iter().any(|w| !w.is_finite()) {
      return Err(ArtifactError::invalid("tfidf: idf contains non-finite weights"));
    }
    Ok(())
  }

  fn terms(&self, text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let (min_n, max_n) = self.ngram_range;
    let mut terms = Vec::new();
    for n in min_n..=max_n.min(tokens.len()) {
      for window in tokens.windows(n) {
        terms.push(window.join(" "));
      }
    }
    terms
  }
}

impl TextVectorizer for TfidfVectorizer {
  fn dimension(&self) -> usize {
    self.idf.len()
  }

  fn transform(&self, text: &str) -> Vec<f64> {
    let mut counts: HashMap<usize, f64> = HashMap::new();
    for term in self.terms(&text.to_lowercase()) {
      if let Some(&col) = self.vocabulary.get(&term) {
        *counts.entry(col).or_insert(0.0) += 1.0;
      }
    }

    let mut out = vec![0.0; self.idf.len()];
    for (col, tf) in counts {
      let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
      out[col] = tf * self.idf[col];
    }

    if self.norm == Norm::L2 {
      let length = out.iter().map(|v| v * v).sum::<f64>().sqrt();
      if length > 0.0 {
        out.iter_mut().for_each(|v| *v /= length);
      }
    }
    out
  }

  fn kind(&self) -> &'static str {
    "tfidf"
  }

  fn vocabulary_size(&self) -> Option<usize> {
    Some(self.vocabulary.len())
  }
}

/// Runs of two or more word characters (alphanumeric or `_`).
fn tokenize(text: &str) -> Vec<&str> {
  text
    .split(|c: char| !(c.is_alphanumeric() || c == '_'))
    .filter(|t| t.chars().count() >= 2)
    .collect()
}
