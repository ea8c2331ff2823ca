//! Signaling service configuration.
//!
//! Configuration is loaded from environment variables. Numeric values that
//! are present but unparseable are rejected rather than silently defaulted.

use common::config::ObservabilityConfig;
use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Default bind address for the HTTP/WebSocket listener.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

/// Default browser origin allowed by CORS.
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";

/// Default router mailbox capacity.
pub const DEFAULT_ROUTER_CHANNEL_BUFFER: usize = 1000;

/// Default maximum inbound WebSocket message size in bytes.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1_000_000;

/// Default interval between server-initiated WebSocket pings.
pub const DEFAULT_PING_INTERVAL_SECONDS: u64 = 25;

/// Default silence after which a connection is considered dead.
pub const DEFAULT_PING_TIMEOUT_SECONDS: u64 = 60;

/// Default sampling period for candidate forwarding log lines.
pub const DEFAULT_CANDIDATE_LOG_EVERY: u64 = 10;

/// Default time allowed for in-flight work to finish on shutdown.
pub const DEFAULT_SHUTDOWN_GRACE_SECONDS: u64 = 5;

/// Signaling service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listener address for `/ws`, `/health`, `/ready`, `/status`, `/metrics`.
    pub bind_address: SocketAddr,

    /// Browser origin allowed by the CORS layer.
    pub frontend_url: String,

    /// Router actor mailbox capacity.
    pub router_channel_buffer: usize,

    /// Maximum inbound WebSocket message size.
    pub max_message_bytes: usize,

    /// Interval between server pings on each socket.
    pub ping_interval: Duration,

    /// Inbound silence after which the socket is treated as dead.
    pub ping_timeout: Duration,

    /// Log one candidate forwarding line per this many candidates.
    pub candidate_log_every: u64,

    /// Grace period for shutdown.
    pub shutdown_grace: Duration,

    /// Logging configuration.
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8000)),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            router_channel_buffer: DEFAULT_ROUTER_CHANNEL_BUFFER,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            ping_interval: Duration::from_secs(DEFAULT_PING_INTERVAL_SECONDS),
            ping_timeout: Duration::from_secs(DEFAULT_PING_TIMEOUT_SECONDS),
            candidate_log_every: DEFAULT_CANDIDATE_LOG_EVERY,
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECONDS),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

/// Parse an optional numeric variable, rejecting zero and garbage.
fn parse_positive<T>(
    vars: &HashMap<String, String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let Some(raw) = vars.get(var) else {
        return Ok(default);
    };

    let value: T = raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var,
        reason: e.to_string(),
    })?;

    if value == T::default() {
        return Err(ConfigError::InvalidValue {
            var,
            reason: "must be greater than zero".to_string(),
        });
    }

    Ok(value)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("SIGNALING_BIND_ADDRESS")
            .map_or(DEFAULT_BIND_ADDRESS, String::as_str)
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                var: "SIGNALING_BIND_ADDRESS",
                reason: e.to_string(),
            })?;

        let frontend_url = vars
            .get("FRONTEND_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string());

        let router_channel_buffer = parse_positive(
            vars,
            "SIGNALING_ROUTER_CHANNEL_BUFFER",
            DEFAULT_ROUTER_CHANNEL_BUFFER,
        )?;

        let max_message_bytes =
            parse_positive(vars, "SIGNALING_MAX_MESSAGE_BYTES", DEFAULT_MAX_MESSAGE_BYTES)?;

        let ping_interval_seconds = parse_positive(
            vars,
            "SIGNALING_PING_INTERVAL_SECONDS",
            DEFAULT_PING_INTERVAL_SECONDS,
        )?;

        let ping_timeout_seconds = parse_positive(
            vars,
            "SIGNALING_PING_TIMEOUT_SECONDS",
            DEFAULT_PING_TIMEOUT_SECONDS,
        )?;

        if ping_timeout_seconds <= ping_interval_seconds {
            return Err(ConfigError::InvalidValue {
                var: "SIGNALING_PING_TIMEOUT_SECONDS",
                reason: format!(
                    "must exceed SIGNALING_PING_INTERVAL_SECONDS ({ping_interval_seconds})"
                ),
            });
        }

        let candidate_log_every = parse_positive(
            vars,
            "SIGNALING_CANDIDATE_LOG_EVERY",
            DEFAULT_CANDIDATE_LOG_EVERY,
        )?;

        let shutdown_grace_seconds = parse_positive(
            vars,
            "SIGNALING_SHUTDOWN_GRACE_SECONDS",
            DEFAULT_SHUTDOWN_GRACE_SECONDS,
        )?;

        Ok(Config {
            bind_address,
            frontend_url,
            router_channel_buffer,
            max_message_bytes,
            ping_interval: Duration::from_secs(ping_interval_seconds),
            ping_timeout: Duration::from_secs(ping_timeout_seconds),
            candidate_log_every,
            shutdown_grace: Duration::from_secs(shutdown_grace_seconds),
            observability: ObservabilityConfig::from_vars(vars),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&HashMap::new()).expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), DEFAULT_BIND_ADDRESS);
        assert_eq!(config.frontend_url, DEFAULT_FRONTEND_URL);
        assert_eq!(config.router_channel_buffer, DEFAULT_ROUTER_CHANNEL_BUFFER);
        assert_eq!(config.max_message_bytes, DEFAULT_MAX_MESSAGE_BYTES);
        assert_eq!(config.ping_interval, Duration::from_secs(25));
        assert_eq!(config.ping_timeout, Duration::from_secs(60));
        assert_eq!(config.candidate_log_every, DEFAULT_CANDIDATE_LOG_EVERY);
        assert_eq!(config.shutdown_grace, Duration::from_secs(5));
        assert!(!config.observability.json_logs);
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let vars = HashMap::from([
            (
                "SIGNALING_BIND_ADDRESS".to_string(),
                "127.0.0.1:9000".to_string(),
            ),
            (
                "FRONTEND_URL".to_string(),
                "https://app.example.com".to_string(),
            ),
            (
                "SIGNALING_ROUTER_CHANNEL_BUFFER".to_string(),
                "64".to_string(),
            ),
            (
                "SIGNALING_MAX_MESSAGE_BYTES".to_string(),
                "65536".to_string(),
            ),
            (
                "SIGNALING_PING_INTERVAL_SECONDS".to_string(),
                "10".to_string(),
            ),
            (
                "SIGNALING_PING_TIMEOUT_SECONDS".to_string(),
                "30".to_string(),
            ),
            ("SIGNALING_CANDIDATE_LOG_EVERY".to_string(), "1".to_string()),
            ("SIGNALING_LOG_JSON".to_string(), "true".to_string()),
        ]);

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:9000");
        assert_eq!(config.frontend_url, "https://app.example.com");
        assert_eq!(config.router_channel_buffer, 64);
        assert_eq!(config.max_message_bytes, 65536);
        assert_eq!(config.ping_interval, Duration::from_secs(10));
        assert_eq!(config.ping_timeout, Duration::from_secs(30));
        assert_eq!(config.candidate_log_every, 1);
        assert!(config.observability.json_logs);
    }

    #[test]
    fn test_invalid_bind_address_is_rejected() {
        let vars = HashMap::from([(
            "SIGNALING_BIND_ADDRESS".to_string(),
            "not-an-address".to_string(),
        )]);

        let result = Config::from_vars(&vars);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { var, .. }) if var == "SIGNALING_BIND_ADDRESS"
        ));
    }

    #[test]
    fn test_unparseable_number_is_rejected() {
        let vars = HashMap::from([(
            "SIGNALING_ROUTER_CHANNEL_BUFFER".to_string(),
            "lots".to_string(),
        )]);

        let result = Config::from_vars(&vars);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { var, .. }) if var == "SIGNALING_ROUTER_CHANNEL_BUFFER"
        ));
    }

    #[test]
    fn test_zero_is_rejected() {
        let vars = HashMap::from([("SIGNALING_CANDIDATE_LOG_EVERY".to_string(), "0".to_string())]);

        let result = Config::from_vars(&vars);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { var, .. }) if var == "SIGNALING_CANDIDATE_LOG_EVERY"
        ));
    }

    #[test]
    fn test_ping_timeout_must_exceed_interval() {
        let vars = HashMap::from([
            (
                "SIGNALING_PING_INTERVAL_SECONDS".to_string(),
                "30".to_string(),
            ),
            (
                "SIGNALING_PING_TIMEOUT_SECONDS".to_string(),
                "30".to_string(),
            ),
        ]);

        let result = Config::from_vars(&vars);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { var, .. }) if var == "SIGNALING_PING_TIMEOUT_SECONDS"
        ));
    }
}
