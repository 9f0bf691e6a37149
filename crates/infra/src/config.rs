//! Service configuration, read from the environment once at startup.

use std::time::Duration;

use tracing::warn;

pub const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 5_000;

const GATEWAY_TIMEOUT_VAR: &str = "STOCKTRACK_GATEWAY_TIMEOUT_MS";
const DATABASE_URL_VAR: &str = "DATABASE_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Deadline applied to every gateway call.
    pub gateway_timeout: Duration,
    /// Postgres connection string; the in-memory gateway is used when absent.
    pub database_url: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            gateway_timeout: Duration::from_millis(DEFAULT_GATEWAY_TIMEOUT_MS),
            database_url: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source (the process environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let gateway_timeout = match lookup(GATEWAY_TIMEOUT_VAR) {
            None => Duration::from_millis(DEFAULT_GATEWAY_TIMEOUT_MS),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    warn!(
                        value = %raw,
                        "{GATEWAY_TIMEOUT_VAR} is not a positive integer; using {DEFAULT_GATEWAY_TIMEOUT_MS}ms"
                    );
                    Duration::from_millis(DEFAULT_GATEWAY_TIMEOUT_MS)
                }
            },
        };

        let database_url = lookup(DATABASE_URL_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Self {
            gateway_timeout,
            database_url,
        }
    }
}
