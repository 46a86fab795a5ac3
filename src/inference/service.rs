//! Prediction orchestration: availability, validation, assembly, invocation.

use std::sync::Arc;
use std::time::Instant;

use log::Level;
use serde_json::Value;

use crate::common::error::{GatewayCode, GatewayError, GatewayResult};
use crate::common::log::{log_failure, log_json};
use crate::model::domain::{ModelHandle, ModelVersion};

use super::domain::{Prediction, PLACEHOLDER_CONFIDENCE};
use super::{features, validate};

/// Snapshot reported by the health operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HealthReport {
    pub status: &'static str,
    pub model_loaded: bool,
}

/// Front door for predictions, holding the model loaded at startup.
#[derive(Clone, Debug, Default)]
pub struct Gateway {
    model: Option<Arc<ModelHandle>>,
}

impl Gateway {
    pub fn new(model: Option<Arc<ModelHandle>>) -> Self {
        Self { model }
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_info(&self) -> Option<&ModelVersion> {
        self.model.as_deref().map(ModelHandle::info)
    }

    /// Never fails, whatever the model state.
    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "healthy",
            model_loaded: self.model_loaded(),
        }
    }

    /// Run one prediction for an untyped JSON payload.
    pub fn predict(&self, raw: &Value) -> GatewayResult<Prediction> {
        let start = Instant::now();
        let outcome = self.run(raw);
        match &outcome {
            Ok(_) => log_json(
                Level::Info,
                "inference",
                "predict_ok",
                GatewayCode::Ok.as_u32(),
                start.elapsed(),
            ),
            Err(err) => log_failure("inference", "predict_failed", err, start.elapsed()),
        }
        outcome
    }

    fn run(&self, raw: &Value) -> GatewayResult<Prediction> {
        let model = self.model.as_deref().ok_or(GatewayError::ModelMissing)?;

        let request = validate::validate(raw).map_err(|failure| {
            log::debug!("Rejected prediction input: {failure}");
            failure
        })?;
        let vector = features::assemble(&request);

        let label = model.predict(vector.as_slice()).map_err(|err| {
            log::error!("Prediction error for input {request:?}: {err}");
            GatewayError::internal(err.to_string())
        })?;

        log::info!("Prediction successful for input: {request:?} -> {label}");
        Ok(Prediction {
            label,
            confidence: PLACEHOLDER_CONFIDENCE,
        })
    }
}
