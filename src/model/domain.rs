//! Domain types for the pre-trained classifier.
//!
//! The gateway only ever sees a [`ModelHandle`]: an immutable wrapper around
//! some [`Classifier`] that maps one feature slice to one class id. Two
//! artefact formats are understood, a linear model and a tree ensemble.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// Model families the artefact loader understands.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ModelKind {
    Linear,
    TreeEnsemble,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::TreeEnsemble => "tree_ensemble",
        }
    }
}

/// Metadata for the artefact behind a handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelVersion {
    pub name: String,
    pub version: String,
    pub kind: ModelKind,
    pub artefact_path: PathBuf,
}

/// Failure raised by a classifier while scoring one vector.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },
    #[error("feature {0} is not a finite number")]
    NonFinite(usize),
    #[error("tree {tree} has no usable node at index {node}")]
    BrokenTree { tree: usize, node: usize },
    #[error("{0}")]
    Backend(String),
}

/// Failure raised while turning an artefact into a handle.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("cannot read model artefact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse model artefact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("model expects {found} features but requests provide {expected}")]
    FeatureCount { expected: usize, found: usize },
    #[error("invalid model artefact: {0}")]
    Invalid(String),
}

/// Opaque single-vector classifier.
pub trait Classifier: Send + Sync + fmt::Debug {
    fn kind(&self) -> ModelKind;

    /// Width of the vectors this classifier accepts.
    fn n_features(&self) -> usize;

    /// Class id for one feature vector.
    fn predict(&self, features: &[f64]) -> Result<i64, ModelError>;
}

/// Loaded-once, read-only model shared by every request.
#[derive(Debug)]
pub struct ModelHandle {
    info: ModelVersion,
    classifier: Box<dyn Classifier>,
}

impl ModelHandle {
    pub fn new(info: ModelVersion, classifier: Box<dyn Classifier>) -> Self {
        Self { info, classifier }
    }

    pub fn info(&self) -> &ModelVersion {
        &self.info
    }

    pub fn n_features(&self) -> usize {
        self.classifier.n_features()
    }

    pub fn predict(&self, features: &[f64]) -> Result<i64, ModelError> {
        self.classifier.predict(features)
    }
}

/// Source of the one model the gateway serves.
pub trait ModelRepo {
    fn load_model(&self) -> Result<ModelHandle, ModelLoadError>;
}

fn check_input(features: &[f64], expected: usize) -> Result<(), ModelError> {
    if features.len() != expected {
        return Err(ModelError::FeatureCount {
            expected,
            actual: features.len(),
        });
    }
    match features.iter().position(|v| !v.is_finite()) {
        Some(idx) => Err(ModelError::NonFinite(idx)),
        None => Ok(()),
    }
}

/// Pick a class from raw scores: one score means binary (positive iff > 0),
/// otherwise the first highest score wins.
fn decide(scores: &[f64], classes: &[i64]) -> Result<i64, ModelError> {
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(ModelError::Backend("model produced a non-finite score".into()));
    }
    if let [score] = scores {
        return Ok(if *score > 0.0 { classes[1] } else { classes[0] });
    }
    let mut best = 0;
    for (idx, score) in scores.iter().enumerate().skip(1) {
        if *score > scores[best] {
            best = idx;
        }
    }
    Ok(classes[best])
}

/// Number of score outputs a model with `classes` may declare.
fn check_outputs(outputs: usize, classes: &[i64]) -> Result<(), ModelLoadError> {
    if classes.len() < 2 {
        return Err(ModelLoadError::Invalid(
            "at least two classes are required".into(),
        ));
    }
    let binary = outputs == 1 && classes.len() == 2;
    if binary || outputs == classes.len() {
        Ok(())
    } else {
        Err(ModelLoadError::Invalid(format!(
            "{outputs} score outputs cannot label {} classes",
            classes.len()
        )))
    }
}

/// One-vs-rest linear scores: `coef · x + intercept` per output.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LinearModel {
    pub classes: Vec<i64>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
    #[serde(skip)]
    n_features: usize,
}

impl LinearModel {
    pub fn new(
        n_features: usize,
        classes: Vec<i64>,
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    ) -> Result<Self, ModelLoadError> {
        let model = Self {
            classes,
            coef,
            intercept,
            n_features,
        };
        model.validate()?;
        Ok(model)
    }

    pub(crate) fn with_width(mut self, n_features: usize) -> Result<Self, ModelLoadError> {
        self.n_features = n_features;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ModelLoadError> {
        check_outputs(self.coef.len(), &self.classes)?;
        if self.intercept.len() != self.coef.len() {
            return Err(ModelLoadError::Invalid(format!(
                "{} intercepts for {} coefficient rows",
                self.intercept.len(),
                self.coef.len()
            )));
        }
        if let Some(row) = self.coef.iter().position(|r| r.len() != self.n_features) {
            return Err(ModelLoadError::Invalid(format!(
                "coefficient row {row} does not have {} entries",
                self.n_features
            )));
        }
        Ok(())
    }
}

impl Classifier for LinearModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Linear
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f64]) -> Result<i64, ModelError> {
        check_input(features, self.n_features)?;
        let scores: Vec<f64> = self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| row.iter().zip(features).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect();
        decide(&scores, &self.classes)
    }
}

/// Node of a decision tree: a split on `feature <= threshold` or a leaf.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// One additive tree contributing to the score of output `class_index`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Tree {
    #[serde(default)]
    pub class_index: usize,
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn leaf_value(&self, tree: usize, features: &[f64]) -> Result<f64, ModelError> {
        let mut idx = 0;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = features
                        .get(*feature)
                        .ok_or(ModelError::BrokenTree { tree, node: idx })?;
                    idx = if *x <= *threshold { *left } else { *right };
                }
                None => break,
            }
        }
        Err(ModelError::BrokenTree { tree, node: idx })
    }
}

/// Sum of tree outputs per class plus an optional base score.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TreeEnsemble {
    pub classes: Vec<i64>,
    pub trees: Vec<Tree>,
    #[serde(default)]
    pub base_score: Vec<f64>,
    #[serde(skip)]
    n_features: usize,
}

impl TreeEnsemble {
    pub fn new(
        n_features: usize,
        classes: Vec<i64>,
        trees: Vec<Tree>,
        base_score: Vec<f64>,
    ) -> Result<Self, ModelLoadError> {
        let model = Self {
            classes,
            trees,
            base_score,
            n_features,
        };
        model.validate()?;
        Ok(model)
    }

    pub(crate) fn with_width(mut self, n_features: usize) -> Result<Self, ModelLoadError> {
        self.n_features = n_features;
        self.validate()?;
        Ok(self)
    }

    fn outputs(&self) -> usize {
        if self.classes.len() == 2 && self.trees.iter().all(|t| t.class_index == 0) {
            1
        } else {
            self.classes.len()
        }
    }

    fn validate(&self) -> Result<(), ModelLoadError> {
        let outputs = self.outputs();
        check_outputs(outputs, &self.classes)?;
        if self.trees.is_empty() {
            return Err(ModelLoadError::Invalid("ensemble has no trees".into()));
        }
        if !self.base_score.is_empty() && self.base_score.len() != outputs {
            return Err(ModelLoadError::Invalid(format!(
                "{} base scores for {outputs} outputs",
                self.base_score.len()
            )));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.class_index >= outputs {
                return Err(ModelLoadError::Invalid(format!(
                    "tree {t} targets output {} of {outputs}",
                    tree.class_index
                )));
            }
            if tree.nodes.is_empty() {
                return Err(ModelLoadError::Invalid(format!("tree {t} has no nodes")));
            }
            for node in &tree.nodes {
                if let TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } = node
                {
                    if *feature >= self.n_features
                        || *left >= tree.nodes.len()
                        || *right >= tree.nodes.len()
                    {
                        return Err(ModelLoadError::Invalid(format!(
                            "tree {t} has a split pointing outside its bounds"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Classifier for TreeEnsemble {
    fn kind(&self) -> ModelKind {
        ModelKind::TreeEnsemble
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f64]) -> Result<i64, ModelError> {
        check_input(features, self.n_features)?;
        let mut scores = if self.base_score.is_empty() {
            vec![0.0; self.outputs()]
        } else {
            self.base_score.clone()
        };
        for (t, tree) in self.trees.iter().enumerate() {
            scores[tree.class_index] += tree.leaf_value(t, features)?;
        }
        decide(&scores, &self.classes)
    }
}
