//! Pre-trained artifacts: classifier + vectorizer, loaded once and shared read-only.
//!
//! Both are JSON exports of the offline training run. The bundle is the only place that
//! enforces the artifact contract: matching encoding version and
//! `classifier width == NUMERIC_FEATURES + vectorizer dimension`.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;
use crate::features::{ENCODING_VERSION, NUMERIC_FEATURES};
use crate::vectorizer::{TextVectorizer, TfidfVectorizer};

/// Probability scoring over a fixed-width row.
pub trait Classifier: Send + Sync {
  fn input_width(&self) -> usize;

  /// Probability of the `Fail` class. Callers validate finiteness.
  fn predict_proba(&self, row: &[f64]) -> f64;

  fn kind(&self) -> &'static str;
}

fn sigmoid(z: f64) -> f64 {
  1.0 / (1.0 + (-z).exp())
}

// ---------------------------------------------------------------------------
// Logistic regression
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LogisticModel {
  weights: Vec<f64>,
  intercept: f64,
}

impl LogisticModel {
  pub fn new(weights: Vec<f64>, intercept: f64) -> Result<Self, ArtifactError> {
    let m = Self { weights, intercept };
    m.validate()?;
    Ok(m)
  }

  fn validate(&self) -> Result<(), ArtifactError> {
    if self.weights.is_empty() {
      return Err(ArtifactError::invalid("logistic: no weights"));
    }
    if !self.intercept.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
      return Err(ArtifactError::invalid("logistic: non-finite coefficient"));
    }
    Ok(())
  }
}

impl Classifier for LogisticModel {
  fn input_width(&self) -> usize {
    self.weights.len()
  }

  fn predict_proba(&self, row: &[f64]) -> f64 {
    let z = self
      .weights
      .iter()
      .zip(row)
      .fold(self.intercept, |acc, (w, x)| acc + w * x);
    sigmoid(z)
  }

  fn kind(&self) -> &'static str {
    "logistic"
  }
}

// ---------------------------------------------------------------------------
// Gradient-boosted tree ensemble
// ---------------------------------------------------------------------------

/// Node of a boosted tree: `row[split] < threshold` goes to `yes`, otherwise `no`.
/// Missing (NaN) values follow `missing`, defaulting to `yes`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
  Split {
    split: usize,
    threshold: f64,
    yes: usize,
    no: usize,
    #[serde(default)]
    missing: Option<usize>,
  },
  Leaf {
    leaf: f64,
  },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
  nodes: Vec<TreeNode>,
}

impl Tree {
  pub fn new(nodes: Vec<TreeNode>) -> Self {
    Self { nodes }
  }

  fn margin(&self, row: &[f64]) -> f64 {
    let mut idx = 0;
    // Children always point forward (checked at load), so this terminates.
    loop {
      match &self.nodes[idx] {
        TreeNode::Leaf { leaf } => return *leaf,
        TreeNode::Split {
          split,
          threshold,
          yes,
          no,
          missing,
        } => {
          let x = row.get(*split).copied().unwrap_or(f64::NAN);
          idx = if x.is_nan() {
            missing.unwrap_or(*yes)
          } else if x < *threshold {
            *yes
          } else {
            *no
          };
        }
      }
    }
  }

  fn validate(&self, tree: usize, n_features: usize) -> Result<(), ArtifactError> {
    if self.nodes.is_empty() {
      return Err(ArtifactError::invalid(format!("tree {}: no nodes", tree)));
    }
    for (i, node) in self.nodes.iter().enumerate() {
      match node {
        TreeNode::Leaf { leaf } if !leaf.is_finite() => {
          return Err(ArtifactError::invalid(format!(
            "tree {} node {}: non-finite leaf",
            tree, i
          )));
        }
        TreeNode::Leaf { .. } => {}
        TreeNode::Split {
          split,
          threshold,
          yes,
          no,
          missing,
        } => {
          if *split >= n_features {
            return Err(ArtifactError::invalid(format!(
              "tree {} node {}: split feature {} out of range (n_features {})",
              tree, i, split, n_features
            )));
          }
          if threshold.is_nan() {
            return Err(ArtifactError::invalid(format!(
              "tree {} node {}: NaN threshold",
              tree, i
            )));
          }
          for child in [Some(*yes), Some(*no), *missing].into_iter().flatten() {
            if child <= i || child >= self.nodes.len() {
              return Err(ArtifactError::invalid(format!(
                "tree {} node {}: child {} must point forward within {} nodes",
                tree,
                i,
                child,
                self.nodes.len()
              )));
            }
          }
        }
      }
    }
    Ok(())
  }
}

/// Boosted trees with a logistic link: `p = sigmoid(logit(base_score) + Σ leaf)`.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEnsemble {
  n_features: usize,
  #[serde(default = "default_base_score")]
  base_score: f64,
  trees: Vec<Tree>,
}

fn default_base_score() -> f64 {
  0.5
}

impl TreeEnsemble {
  pub fn new(n_features: usize, base_score: f64, trees: Vec<Tree>) -> Result<Self, ArtifactError> {
    let e = Self {
      n_features,
      base_score,
      trees,
    };
    e.validate()?;
    Ok(e)
  }

  fn validate(&self) -> Result<(), ArtifactError> {
    if !(self.base_score > 0.0 && self.base_score < 1.0) {
      return Err(ArtifactError::invalid(format!(
        "tree_ensemble: base_score {} must be within (0, 1)",
        self.base_score
      )));
    }
    if self.trees.is_empty() {
      return Err(ArtifactError::invalid("tree_ensemble: no trees"));
    }
    for (i, tree) in self.trees.iter().enumerate() {
      tree.validate(i, self.n_features)?;
    }
    Ok(())
  }
}

impl Classifier for TreeEnsemble {
  fn input_width(&self) -> usize {
    self.n_features
  }

  fn predict_proba(&self, row: &[f64]) -> f64 {
    let base = (self.base_score / (1.0 - self.base_score)).ln();
    let margin = self.trees.iter().fold(base, |acc, t| acc + t.margin(row));
    sigmoid(margin)
  }

  fn kind(&self) -> &'static str {
    "tree_ensemble"
  }
}

// ---------------------------------------------------------------------------
// Artifact files
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ClassifierDef {
  Logistic(LogisticModel),
  TreeEnsemble(TreeEnsemble),
}

#[derive(Debug, Deserialize)]
struct ModelFile {
  encoding_version: String,
  classifier: ClassifierDef,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum VectorizerFile {
  Tfidf(TfidfVectorizer),
}

/// Descriptive metadata about the loaded artifacts.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
  pub classifier_kind: &'static str,
  pub vectorizer_kind: &'static str,
  pub input_width: usize,
  pub numeric_features: usize,
  pub text_features: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub vocabulary_size: Option<usize>,
  pub encoding_version: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub model_digest: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub vectorizer_digest: Option<String>,
}

/// Classifier + vectorizer pair that satisfies the width contract.
pub struct ArtifactBundle {
  classifier: Box<dyn Classifier>,
  vectorizer: Box<dyn TextVectorizer>,
  info: ArtifactInfo,
}

impl fmt::Debug for ArtifactBundle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ArtifactBundle")
      .field("info", &self.info)
      .finish_non_exhaustive()
  }
}

impl ArtifactBundle {
  /// Inject already-constructed artifacts (fakes included) under the same width check.
  pub fn from_parts(
    classifier: Box<dyn Classifier>,
    vectorizer: Box<dyn TextVectorizer>,
  ) -> Result<Self, ArtifactError> {
    let text = vectorizer.dimension();
    if classifier.input_width() != NUMERIC_FEATURES + text {
      return Err(ArtifactError::Width {
        classifier: classifier.input_width(),
        numeric: NUMERIC_FEATURES,
        text,
      });
    }
    let info = ArtifactInfo {
      classifier_kind: classifier.kind(),
      vectorizer_kind: vectorizer.kind(),
      input_width: classifier.input_width(),
      numeric_features: NUMERIC_FEATURES,
      text_features: text,
      vocabulary_size: vectorizer.vocabulary_size(),
      encoding_version: ENCODING_VERSION.to_string(),
      model_digest: None,
      vectorizer_digest: None,
    };
    Ok(Self {
      classifier,
      vectorizer,
      info,
    })
  }

  /// Read and validate both artifact files. Startup-only; never on the request path.
  pub fn load(model_path: &Path, vectorizer_path: &Path) -> Result<Self, ArtifactError> {
    let (model_bytes, model_digest) = read_with_digest(model_path)?;
    let (vectorizer_bytes, vectorizer_digest) = read_with_digest(vectorizer_path)?;

    let model: ModelFile =
      serde_json::from_slice(&model_bytes).map_err(|source| ArtifactError::Decode {
        path: model_path.to_path_buf(),
        source,
      })?;
    if model.encoding_version != ENCODING_VERSION {
      return Err(ArtifactError::EncodingVersion {
        expected: ENCODING_VERSION.to_string(),
        found: model.encoding_version,
      });
    }
    let classifier: Box<dyn Classifier> = match model.classifier {
      ClassifierDef::Logistic(m) => {
        m.validate()?;
        Box::new(m)
      }
      ClassifierDef::TreeEnsemble(e) => {
        e.validate()?;
        Box::new(e)
      }
    };

    let vectorizer_file: VectorizerFile =
      serde_json::from_slice(&vectorizer_bytes).map_err(|source| ArtifactError::Decode {
        path: vectorizer_path.to_path_buf(),
        source,
      })?;
    let vectorizer: Box<dyn TextVectorizer> = match vectorizer_file {
      VectorizerFile::Tfidf(v) => {
        v.validate()?;
        Box::new(v)
      }
    };

    let mut bundle = Self::from_parts(classifier, vectorizer)?;
    bundle.info.model_digest = Some(model_digest);
    bundle.info.vectorizer_digest = Some(vectorizer_digest);

    tracing::info!(
      classifier = bundle.info.classifier_kind,
      vectorizer = bundle.info.vectorizer_kind,
      input_width = bundle.info.input_width,
      model = %model_path.display(),
      "loaded prediction artifacts"
    );
    Ok(bundle)
  }

  pub fn classifier(&self) -> &dyn Classifier {
    self.classifier.as_ref()
  }

  pub fn vectorizer(&self) -> &dyn TextVectorizer {
    self.vectorizer.as_ref()
  }

  pub fn info(&self) -> &ArtifactInfo {
    &self.info
  }
}

/// File contents plus a short blake3 digest identifying the artifact version.
fn read_with_digest(path: &Path) -> Result<(Vec<u8>, String), ArtifactError> {
  let bytes = std::fs::read(path).map_err(|source| ArtifactError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  let hex = blake3::hash(&bytes).to_hex();
  Ok((bytes, hex[..16].to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;
  use std::io::Write;

  fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f
  }

  fn tiny_vectorizer() -> TfidfVectorizer {
    let vocab: HashMap<String, usize> = [("deploy".to_string(), 0)].into_iter().collect();
    TfidfVectorizer::new(vocab, vec![1.0]).unwrap()
  }

  #[test]
  fn logistic_matches_hand_computation() {
    let m = LogisticModel::new(vec![1.0, -2.0], 0.5).unwrap();
    // z = 0.5 + 1*2 - 2*1 = 0.5
    let p = m.predict_proba(&[2.0, 1.0]);
    assert!((p - sigmoid(0.5)).abs() < 1e-12);
    assert_eq!(m.input_width(), 2);
  }

  #[test]
  fn tree_ensemble_routes_and_sums_margins() {
    let stump = |leaf_yes: f64, leaf_no: f64| {
      Tree::new(vec![
        TreeNode::Split {
          split: 0,
          threshold: 5.0,
          yes: 1,
          no: 2,
          missing: None,
        },
        TreeNode::Leaf { leaf: leaf_yes },
        TreeNode::Leaf { leaf: leaf_no },
      ])
    };
    let e = TreeEnsemble::new(1, 0.5, vec![stump(-1.0, 1.0), stump(-0.5, 0.5)]).unwrap();
    // base margin logit(0.5) = 0
    assert!((e.predict_proba(&[1.0]) - sigmoid(-1.5)).abs() < 1e-12);
    assert!((e.predict_proba(&[9.0]) - sigmoid(1.5)).abs() < 1e-12);
    // NaN follows the default (yes) branch.
    assert!((e.predict_proba(&[f64::NAN]) - sigmoid(-1.5)).abs() < 1e-12);
  }

  #[test]
  fn tree_with_backward_child_rejected() {
    let tree = Tree::new(vec![
      TreeNode::Split {
        split: 0,
        threshold: 1.0,
        yes: 0,
        no: 1,
        missing: None,
      },
      TreeNode::Leaf { leaf: 0.0 },
    ]);
    let err = TreeEnsemble::new(1, 0.5, vec![tree]).unwrap_err();
    assert!(err.to_string().contains("point forward"));
  }

  #[test]
  fn tree_with_out_of_range_feature_rejected() {
    let tree = Tree::new(vec![
      TreeNode::Split {
        split: 3,
        threshold: 1.0,
        yes: 1,
        no: 2,
        missing: None,
      },
      TreeNode::Leaf { leaf: 0.0 },
      TreeNode::Leaf { leaf: 1.0 },
    ]);
    let err = TreeEnsemble::new(2, 0.5, vec![tree]).unwrap_err();
    assert!(err.to_string().contains("out of range"));
  }

  #[test]
  fn from_parts_enforces_width() {
    let classifier = LogisticModel::new(vec![0.0; NUMERIC_FEATURES], 0.0).unwrap();
    let err = ArtifactBundle::from_parts(Box::new(classifier), Box::new(tiny_vectorizer()))
      .unwrap_err();
    assert!(matches!(err, ArtifactError::Width { classifier: 14, numeric: 14, text: 1 }));

    let classifier = LogisticModel::new(vec![0.0; NUMERIC_FEATURES + 1], 0.0).unwrap();
    let bundle =
      ArtifactBundle::from_parts(Box::new(classifier), Box::new(tiny_vectorizer())).unwrap();
    assert_eq!(bundle.info().input_width, NUMERIC_FEATURES + 1);
    assert_eq!(bundle.info().vocabulary_size, Some(1));
    assert!(bundle.info().model_digest.is_none());
  }

  #[test]
  fn load_reads_files_and_records_digests() {
    let weights = vec!["0.0"; NUMERIC_FEATURES + 1].join(",");
    let model = write_temp(&format!(
      r#"{{"encoding_version":"v1","classifier":{{"kind":"logistic","weights":[{}],"intercept":-1.0}}}}"#,
      weights
    ));
    let vectorizer = write_temp(r#"{"kind":"tfidf","vocabulary":{"deploy":0},"idf":[1.0]}"#);

    let bundle = ArtifactBundle::load(model.path(), vectorizer.path()).unwrap();
    assert_eq!(bundle.info().classifier_kind, "logistic");
    assert_eq!(bundle.info().vectorizer_kind, "tfidf");
    let digest = bundle.info().model_digest.clone().unwrap();
    assert_eq!(digest.len(), 16);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
  }

  #[test]
  fn load_rejects_encoding_mismatch() {
    let model = write_temp(
      r#"{"encoding_version":"v0","classifier":{"kind":"logistic","weights":[1.0],"intercept":0.0}}"#,
    );
    let vectorizer = write_temp(r#"{"kind":"tfidf","vocabulary":{},"idf":[]}"#);
    let err = ArtifactBundle::load(model.path(), vectorizer.path()).unwrap_err();
    assert!(matches!(err, ArtifactError::EncodingVersion { .. }));
  }

  #[test]
  fn load_missing_file_is_io_error() {
    let vectorizer = write_temp(r#"{"kind":"tfidf","vocabulary":{},"idf":[]}"#);
    let err =
      ArtifactBundle::load(Path::new("/nonexistent/model.json"), vectorizer.path()).unwrap_err();
    assert!(matches!(err, ArtifactError::Io { .. }));
    assert!(err.to_string().contains("/nonexistent/model.json"));
  }

  #[test]
  fn load_garbage_is_decode_error() {
    let model = write_temp("not json");
    let vectorizer = write_temp(r#"{"kind":"tfidf","vocabulary":{},"idf":[]}"#);
    let err = ArtifactBundle::load(model.path(), vectorizer.path()).unwrap_err();
    assert!(matches!(err, ArtifactError::Decode { .. }));
  }
}
