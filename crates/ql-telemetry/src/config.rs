//! Telemetry configuration from environment variables.

use std::env;

/// Logging and metrics settings.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line.
    pub service_name: String,

    /// Node identifier, added to the service name when set.
    pub node_id: Option<String>,

    /// Log level filter (trace, debug, info, warn, error), or a full
    /// `EnvFilter` directive.
    pub log_level: String,

    /// Whether to write logs to stdout at all.
    pub console_output: bool,

    /// JSON lines instead of human-readable output.
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "quorum-ledger".to_string(),
            node_id: None,
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QL_SERVICE_NAME`: Service name (default: quorum-ledger)
    /// - `QL_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `QL_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `QL_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("QL_SERVICE_NAME")
                .unwrap_or_else(|_| "quorum-ledger".to_string()),

            node_id: None,

            log_level: env::var("QL_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("QL_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v, true))
                .unwrap_or(true),

            json_logs: env::var("QL_JSON_LOGS")
                .map(|v| parse_flag(&v, false))
                .unwrap_or(is_container),
        }
    }

    /// Same as [`TelemetryConfig::from_env`], tagged with a node id.
    pub fn for_node(node_id: &str) -> Self {
        let mut config = Self::from_env();
        config.node_id = Some(node_id.to_string());
        config
    }

    /// Service name including the node id, if any.
    pub fn full_service_name(&self) -> String {
        match &self.node_id {
            Some(id) => format!("{}-{}", self.service_name, id),
            None => self.service_name.clone(),
        }
    }
}

fn parse_flag(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "quorum-ledger");
        assert_eq!(config.log_level, "info");
        assert!(config.console_output);
    }

    #[test]
    fn test_full_service_name() {
        let mut config = TelemetryConfig::default();
        assert_eq!(config.full_service_name(), "quorum-ledger");

        config.node_id = Some("N1".to_string());
        assert_eq!(config.full_service_name(), "quorum-ledger-N1");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE", false));
        assert!(parse_flag(" 1 ", false));
        assert!(!parse_flag("off", true));
        assert!(parse_flag("maybe", true));
    }
}
