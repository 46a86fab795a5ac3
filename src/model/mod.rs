//! Model domain: the opaque pre-trained classifier and how it is loaded.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{
    Classifier, ModelError, ModelHandle, ModelKind, ModelLoadError, ModelRepo, ModelVersion,
};
pub use repo_fs::FsModelRepo;
