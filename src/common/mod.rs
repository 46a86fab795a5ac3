//! Shared utilities that glue the different domains together.
pub mod config;
pub mod error;
pub mod log;
pub mod quota;
pub mod time;

pub use error::{GatewayCode, GatewayError, GatewayResult};
