//! Inference domain: request validation, feature assembly and the gateway
//! that drives one prediction end to end.

pub mod domain;
pub mod features;
pub mod service;
pub mod validate;

pub use domain::{FeatureVector, Prediction, PredictionRequest, ValidationFailure};
pub use service::{Gateway, HealthReport};
