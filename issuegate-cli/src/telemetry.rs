use std::{env, io, time::Duration};

use tracing::info;
use tracing_subscriber::{filter::Directive, EnvFilter};

const LOG_ENV: &str = "ISSUEGATE_LOG";
const TELEMETRY_ENV: &str = "ISSUEGATE_TELEMETRY";
const DEFAULT_LOG_FILTER: &str = "warn";
const TELEMETRY_DIRECTIVE: &str = "issuegate_telemetry=info";

/// Per-operation timing events, switched on by `ISSUEGATE_TELEMETRY`.
#[derive(Clone, Copy, Debug)]
pub struct Telemetry {
    enabled: bool,
}

impl Telemetry {
    pub fn from_env() -> Self {
        let value = env::var(TELEMETRY_ENV).unwrap_or_default();
        Self {
            enabled: parse_bool_flag(value.as_str()),
        }
    }

    pub fn emit_success(&self, op: &str, elapsed: Duration) {
        if !self.enabled {
            return;
        }
        info!(
            target: "issuegate_telemetry",
            op,
            status = "ok",
            duration_ms = duration_ms(elapsed),
            "operation finished"
        );
    }

    pub fn emit_failure(&self, op: &str, elapsed: Duration, error: &str) {
        if !self.enabled {
            return;
        }
        info!(
            target: "issuegate_telemetry",
            op,
            status = "error",
            duration_ms = duration_ms(elapsed),
            error,
            "operation failed"
        );
    }
}

pub fn init_logging(telemetry: Telemetry) {
    let mut filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if telemetry.enabled {
        if let Ok(directive) = TELEMETRY_DIRECTIVE.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn parse_bool_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
