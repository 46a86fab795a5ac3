// lib.rs - prediction gateway for the Foresee Cycles classifier
pub mod api;
pub mod common;
pub mod inference;
pub mod model;

pub use api::{build_app, create_router, AppState, RouteLimits};
pub use inference::Gateway;
