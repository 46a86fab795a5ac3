//! Runtime configuration loaded from the process environment.
//!
//! All settings are read once at startup; nothing here is reloaded while the
//! server runs.

use std::env;
use std::path::PathBuf;

use super::quota::{parse_quotas, Quota, QuotaParseError};

const DEFAULT_MODEL_PATH: &str = "models/classifier.json";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_RATELIMIT: &str = "100 per hour";
const DEFAULT_PREDICT_RATELIMIT: &str = "10 per minute";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("invalid rate limit in {key}: {source}")]
    InvalidRateLimit {
        key: &'static str,
        #[source]
        source: QuotaParseError,
    },
}

/// Snapshot of configuration values consumed by the gateway.
#[derive(Clone, Debug, PartialEq)]
pub struct AppCfg {
    pub model_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    /// `*` alone means any origin.
    pub cors_origins: Vec<String>,
    /// Quotas for routes without their own limit.
    pub ratelimit_default: Vec<Quota>,
    /// Quotas for `/predict`; these replace the defaults on that route.
    pub ratelimit_predict: Vec<Quota>,
}

impl AppCfg {
    /// Create a configuration snapshot from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a snapshot from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_or = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let port_raw = env_or("PORT", &DEFAULT_PORT.to_string());
        let port = port_raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
            key: "PORT",
            value: port_raw.clone(),
        })?;

        let cors_origins = env_or("CORS_ORIGINS", "*")
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let ratelimit_default = parse_quotas(&env_or("RATELIMIT_DEFAULT", DEFAULT_RATELIMIT))
            .map_err(|source| ConfigError::InvalidRateLimit {
                key: "RATELIMIT_DEFAULT",
                source,
            })?;
        let ratelimit_predict =
            parse_quotas(&env_or("RATELIMIT_PREDICT", DEFAULT_PREDICT_RATELIMIT)).map_err(
                |source| ConfigError::InvalidRateLimit {
                    key: "RATELIMIT_PREDICT",
                    source,
                },
            )?;

        Ok(Self {
            model_path: PathBuf::from(env_or("MODEL_PATH", DEFAULT_MODEL_PATH)),
            host: env_or("HOST", DEFAULT_HOST),
            port,
            debug: env_or("DEBUG", "false").eq_ignore_ascii_case("true"),
            cors_origins,
            ratelimit_default,
            ratelimit_predict,
        })
    }

    /// `host:port` string suitable for binding a listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether CORS should accept any origin.
    pub fn cors_allows_any(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}
