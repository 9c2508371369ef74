use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::engine::{ErrorPolicy, ExecutionMode, DEFAULT_MAX_CONCURRENCY};

/// Validation service configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "ruleval")]
#[command(about = "Rule-driven JSON validation service")]
pub struct Config {
    /// HTTP server listen address
    #[arg(long, default_value = "0.0.0.0:8000", env = "RULEVAL_LISTEN_ADDR")]
    pub listen_addr: String,

    /// Path to the rule definition file (JSON array, or YAML for .yaml/.yml)
    #[arg(long, default_value = "rules.json", env = "RULEVAL_RULES_PATH")]
    pub rules_path: PathBuf,

    /// How matched rules are executed for each request
    #[arg(long, value_enum, default_value_t = ExecutionMode::Concurrent, env = "RULEVAL_EXECUTION_MODE")]
    pub execution_mode: ExecutionMode,

    /// Maximum rule evaluations in flight per request (concurrent mode)
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY, env = "RULEVAL_MAX_CONCURRENCY")]
    pub max_concurrency: usize,

    /// Whether rules that fail to evaluate are ignored or counted as violations
    #[arg(long, value_enum, default_value_t = ErrorPolicy::Ignore, env = "RULEVAL_ERROR_POLICY")]
    pub error_policy: ErrorPolicy,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value = "5000", env = "RULEVAL_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, default_value = "false", env = "RULEVAL_LOG_JSON")]
    pub log_json: bool,

    /// Enable graceful shutdown
    #[arg(long, default_value = "true", env = "RULEVAL_GRACEFUL_SHUTDOWN")]
    pub graceful_shutdown: bool,
}

impl Config {
    /// Get request timeout as Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: "0.0.0.0:8000".to_string(),
            rules_path: PathBuf::from("rules.json"),
            execution_mode: ExecutionMode::Concurrent,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            error_policy: ErrorPolicy::Ignore,
            request_timeout_ms: 5000,
            log_level: "info".to_string(),
            log_json: false,
            graceful_shutdown: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.listen_addr, "0.0.0.0:8000");
        assert_eq!(config.execution_mode, ExecutionMode::Concurrent);
        assert_eq!(config.error_policy, ErrorPolicy::Ignore);
    }

    #[test]
    fn test_parse_args() {
        let config = Config::try_parse_from([
            "ruleval",
            "--rules-path",
            "/etc/ruleval/rules.yaml",
            "--execution-mode",
            "sequential",
            "--error-policy",
            "fail",
            "--max-concurrency",
            "8",
        ])
        .unwrap();

        assert_eq!(config.rules_path, PathBuf::from("/etc/ruleval/rules.yaml"));
        assert_eq!(config.execution_mode, ExecutionMode::Sequential);
        assert_eq!(config.error_policy, ErrorPolicy::Fail);
        assert_eq!(config.max_concurrency, 8);
    }

    #[test]
    fn test_duration_helpers() {
        let config = Config {
            request_timeout_ms: 250,
            ..Default::default()
        };

        assert_eq!(config.request_timeout(), Duration::from_millis(250));
    }
}
