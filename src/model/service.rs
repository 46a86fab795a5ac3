//! Startup-time model loading.

use std::sync::Arc;
use std::time::Instant;

use log::Level;

use crate::common::error::GatewayCode;
use crate::common::log::log_json;

use super::domain::{ModelHandle, ModelRepo};

/// Load the model once. A failed load is logged and yields `None` so the
/// gateway can still serve health checks and answer predictions with 503.
pub fn load_or_none(repo: &dyn ModelRepo) -> Option<Arc<ModelHandle>> {
    let start = Instant::now();
    match repo.load_model() {
        Ok(handle) => {
            log::info!(
                "ML model loaded: {} v{} ({}, {} features) from {}",
                handle.info().name,
                handle.info().version,
                handle.info().kind.as_str(),
                handle.n_features(),
                handle.info().artefact_path.display()
            );
            log_json(Level::Info, "model", "load_ok", GatewayCode::Ok.as_u32(), start.elapsed());
            Some(Arc::new(handle))
        }
        Err(err) => {
            log::error!("Failed to load ML model: {err}");
            log_json(
                Level::Error,
                "model",
                "load_failed",
                GatewayCode::ModelMissing.as_u32(),
                start.elapsed(),
            );
            None
        }
    }
}
