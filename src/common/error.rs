//! Error handling primitives shared across the gateway.
//!
//! Every failure a caller can observe is one of the [`GatewayError`] variants.
//! The HTTP layer maps them onto status codes in `api::http`.

use crate::inference::domain::ValidationFailure;

/// Stable error codes attached to log events and error bodies.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GatewayCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// Input failed validation.
    InvalidInput = 1,
    /// No model artefact was loaded at startup.
    ModelMissing = 2,
    /// Caller exceeded its request quota.
    RateLimited = 3,
    /// Model invocation failed or another unexpected fault.
    Internal = 4,
}

impl GatewayCode {
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Canonical error type for the gateway.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// Missing, mistyped or out-of-range request fields.
    #[error("invalid input: {0}")]
    Validation(ValidationFailure),

    /// The process started without a usable model.
    #[error("ML model not available")]
    ModelMissing,

    /// The caller's quota for the current window is spent.
    #[error("Rate limit exceeded: {limit}")]
    RateLimited {
        /// Human readable description of the quota that was hit.
        limit: String,
        /// Seconds until the exhausted window resets.
        retry_after_secs: u64,
    },

    /// Unexpected failure. The detail is for server logs only.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used throughout the crate.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// Internal error helper.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }

    /// Machine parsable code for this error.
    pub fn code(&self) -> GatewayCode {
        match self {
            GatewayError::Validation(_) => GatewayCode::InvalidInput,
            GatewayError::ModelMissing => GatewayCode::ModelMissing,
            GatewayError::RateLimited { .. } => GatewayCode::RateLimited,
            GatewayError::Internal(_) => GatewayCode::Internal,
        }
    }

    /// Whether the failure is the server's fault rather than the caller's.
    pub fn is_server_fault(&self) -> bool {
        matches!(self, GatewayError::Internal(_))
    }
}

impl From<ValidationFailure> for GatewayError {
    fn from(failure: ValidationFailure) -> Self {
        GatewayError::Validation(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(GatewayCode::Ok as u32, 0);
        assert_eq!(GatewayCode::InvalidInput as u32, 1);
        assert_eq!(GatewayCode::ModelMissing as u32, 2);
        assert_eq!(GatewayCode::RateLimited as u32, 3);
        assert_eq!(GatewayCode::Internal as u32, 4);
    }

    #[test]
    fn only_internal_errors_are_server_faults() {
        assert!(GatewayError::internal("boom").is_server_fault());
        assert!(!GatewayError::ModelMissing.is_server_fault());
        assert!(!GatewayError::Validation(ValidationFailure::default()).is_server_fault());
        let limited = GatewayError::RateLimited {
            limit: "10 per 1 minute".into(),
            retry_after_secs: 30,
        };
        assert!(!limited.is_server_fault());
        assert_eq!(limited.code(), GatewayCode::RateLimited);
    }

    #[test]
    fn rate_limited_message_names_the_quota() {
        let err = GatewayError::RateLimited {
            limit: "10 per 1 minute".into(),
            retry_after_secs: 12,
        };
        assert_eq!(err.to_string(), "Rate limit exceeded: 10 per 1 minute");
    }
}
