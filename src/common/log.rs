//! Logging utilities emitting JSON lines through the `log` facade.

use std::time::Duration;

use log::Level;
use serde_json::json;

use super::error::GatewayError;

/// Emit one JSON event line: `{"ts","level","mod","ev","code","dur_ms"}`.
pub fn log_json(level: Level, module: &str, event: &str, code: u32, dur: Duration) {
    if !log::log_enabled!(target: "foresee_gateway::events", level) {
        return;
    }
    let line = json!({
        "ts": crate::common::time::now_ms(),
        "level": level.as_str().to_ascii_lowercase(),
        "mod": module,
        "ev": event,
        "code": code,
        "dur_ms": dur.as_millis() as u64,
    });
    log::log!(target: "foresee_gateway::events", level, "{line}");
}

/// Level for a failed operation: only server faults are logged as errors,
/// and bad input never rises above debug.
pub fn failure_level(err: &GatewayError) -> Level {
    match err {
        _ if err.is_server_fault() => Level::Error,
        GatewayError::Validation(_) => Level::Debug,
        _ => Level::Info,
    }
}

/// Emit the event for a failed operation, tagged with the error's code.
pub fn log_failure(module: &str, event: &str, err: &GatewayError, dur: Duration) {
    log_json(failure_level(err), module, event, err.code().as_u32(), dur);
}

/// Install the process-wide logger. `RUST_LOG` wins over the derived default.
pub fn init(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_millis()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::domain::ValidationFailure;

    #[test]
    fn caller_errors_never_log_as_errors() {
        assert_eq!(failure_level(&GatewayError::internal("nan in output")), Level::Error);
        assert_eq!(
            failure_level(&ValidationFailure::schema("Invalid input type.").into()),
            Level::Debug
        );
        assert_eq!(failure_level(&GatewayError::ModelMissing), Level::Info);
        let limited = GatewayError::RateLimited {
            limit: "10 per 1 minute".into(),
            retry_after_secs: 5,
        };
        assert_eq!(failure_level(&limited), Level::Info);
    }
}
