//! Filesystem loader for pre-trained model artefacts.
//!
//! Artefacts are JSON documents:
//!
//! ```json
//! {"format": "linear", "name": "cycle_clf", "version": "3",
//!  "n_features": 41, "classes": [0, 1], "coef": [[...]], "intercept": [0.1]}
//! ```
//!
//! or `"format": "tree_ensemble"` with `trees` and an optional `base_score`.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use super::domain::{
    Classifier, LinearModel, ModelHandle, ModelKind, ModelLoadError, ModelRepo, ModelVersion,
    TreeEnsemble,
};

#[derive(Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
enum ArtefactBody {
    Linear(LinearModel),
    TreeEnsemble(TreeEnsemble),
}

#[derive(Deserialize)]
struct Artefact {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    n_features: usize,
    #[serde(flatten)]
    body: ArtefactBody,
}

/// Reads a single artefact from disk and checks it against the vector width.
pub struct FsModelRepo {
    path: PathBuf,
    expected_features: usize,
}

impl FsModelRepo {
    pub fn new(path: impl Into<PathBuf>, expected_features: usize) -> Self {
        Self {
            path: path.into(),
            expected_features,
        }
    }

    fn default_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string())
    }
}

impl ModelRepo for FsModelRepo {
    fn load_model(&self) -> Result<ModelHandle, ModelLoadError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| ModelLoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        let artefact: Artefact =
            serde_json::from_str(&raw).map_err(|source| ModelLoadError::Parse {
                path: self.path.clone(),
                source,
            })?;

        if artefact.n_features != self.expected_features {
            return Err(ModelLoadError::FeatureCount {
                expected: self.expected_features,
                found: artefact.n_features,
            });
        }

        let classifier: Box<dyn Classifier> = match artefact.body {
            ArtefactBody::Linear(model) => Box::new(model.with_width(artefact.n_features)?),
            ArtefactBody::TreeEnsemble(model) => Box::new(model.with_width(artefact.n_features)?),
        };
        let kind: ModelKind = classifier.kind();

        let info = ModelVersion {
            name: artefact.name.unwrap_or_else(|| self.default_name()),
            version: artefact.version.unwrap_or_else(|| "unversioned".to_string()),
            kind,
            artefact_path: self.path.clone(),
        };
        Ok(ModelHandle::new(info, classifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn artefact_file(body: serde_json::Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{body}").unwrap();
        file
    }

    #[test]
    fn loads_linear_artefact() {
        let file = artefact_file(json!({
            "format": "linear",
            "name": "cycle_clf",
            "version": "3",
            "n_features": 3,
            "classes": [0, 1],
            "coef": [[1.0, 0.0, 0.0]],
            "intercept": [-20.0]
        }));
        let handle = FsModelRepo::new(file.path(), 3).load_model().unwrap();

        assert_eq!(handle.info().name, "cycle_clf");
        assert_eq!(handle.info().version, "3");
        assert_eq!(handle.info().kind, ModelKind::Linear);
        assert_eq!(handle.n_features(), 3);
        assert_eq!(handle.predict(&[25.0, 0.0, 0.0]), Ok(1));
        assert_eq!(handle.predict(&[15.0, 0.0, 0.0]), Ok(0));
    }

    #[test]
    fn loads_tree_ensemble_artefact() {
        let file = artefact_file(json!({
            "format": "tree_ensemble",
            "n_features": 2,
            "classes": [1, 2],
            "trees": [{
                "nodes": [
                    {"feature": 1, "threshold": 22.5, "left": 1, "right": 2},
                    {"value": -1.0},
                    {"value": 1.0}
                ]
            }]
        }));
        let handle = FsModelRepo::new(file.path(), 2).load_model().unwrap();

        assert_eq!(handle.info().kind, ModelKind::TreeEnsemble);
        assert_eq!(handle.info().version, "unversioned");
        assert_eq!(handle.predict(&[0.0, 21.0]), Ok(1));
        assert_eq!(handle.predict(&[0.0, 30.0]), Ok(2));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsModelRepo::new(dir.path().join("absent.json"), 41)
            .load_model()
            .unwrap_err();
        assert!(matches!(err, ModelLoadError::Io { .. }));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"\x80\x03cjoblib").unwrap();
        let err = FsModelRepo::new(file.path(), 41).load_model().unwrap_err();
        // Non UTF-8 bytes fail before JSON parsing even starts.
        assert!(matches!(
            err,
            ModelLoadError::Io { .. } | ModelLoadError::Parse { .. }
        ));

        let file = artefact_file(json!({"format": "svm", "n_features": 41}));
        let err = FsModelRepo::new(file.path(), 41).load_model().unwrap_err();
        assert!(matches!(err, ModelLoadError::Parse { .. }));
    }

    #[test]
    fn width_mismatch_is_refused() {
        let file = artefact_file(json!({
            "format": "linear",
            "n_features": 43,
            "classes": [0, 1],
            "coef": [vec![0.0; 43]],
            "intercept": [0.0]
        }));
        let err = FsModelRepo::new(file.path(), 41).load_model().unwrap_err();
        assert!(matches!(
            err,
            ModelLoadError::FeatureCount {
                expected: 41,
                found: 43
            }
        ));
    }

    #[test]
    fn inconsistent_shapes_are_invalid() {
        let file = artefact_file(json!({
            "format": "linear",
            "n_features": 2,
            "classes": [0, 1],
            "coef": [[1.0]],
            "intercept": [0.0]
        }));
        let err = FsModelRepo::new(file.path(), 2).load_model().unwrap_err();
        assert!(matches!(err, ModelLoadError::Invalid(_)));
    }
}
