//! Layered configuration for the supervisor.
//!
//! Settings are resolved in order:
//! - Built-in defaults
//! - `rewatch.toml` in the working directory
//! - Environment variable overrides
//! - CLI argument overrides (applied by `main`)
//!
//! # Environment Variables
//!
//! Environment variables are prefixed with `REWATCH_` and use double
//! underscores to separate nested levels:
//! - `REWATCH_WATCH__MAX_DEPTH=4` sets `watch.max_depth`
//! - `REWATCH_RETRY__MAX_ATTEMPTS=10` sets `retry.max_attempts`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of the optional configuration file, looked up in the working directory.
pub const CONFIG_FILE: &str = "rewatch.toml";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Watch registration settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Top-level retry driver settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// How many directory hops below the working directory to register.
    /// Depth 0 watches only the working directory itself.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Directory names excluded from watching and descent.
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetryConfig {
    /// How many failed supervisor runs before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles per failure.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound on the backoff delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `"rewatch::supervisor" = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_max_depth() -> u32 {
    10
}
fn default_ignore_dirs() -> Vec<String> {
    vec![
        ".git".to_string(),
        "target".to_string(),
        "node_modules".to_string(),
    ]
}
fn default_max_attempts() -> u32 {
    5
}
fn default_initial_backoff_ms() -> u64 {
    500
}
fn default_max_backoff_ms() -> u64 {
    30_000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            ignore_dirs: default_ignore_dirs(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(CONFIG_FILE)
    }

    /// Load configuration layered over a specific file.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path))
            // Layer in environment variables with REWATCH_ prefix.
            // Double underscore becomes the nesting separator.
            .merge(Env::prefixed("REWATCH_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
            .map_err(Box::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.watch.max_depth, 10);
        assert!(settings.watch.ignore_dirs.contains(&".git".to_string()));
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.initial_backoff_ms, 500);
        assert_eq!(settings.logging.default, "info");
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rewatch.toml");
        std::fs::write(
            &path,
            "[watch]\nmax_depth = 3\nignore_dirs = [\"dist\"]\n\n[retry]\nmax_attempts = 2\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.watch.max_depth, 3);
        assert_eq!(settings.watch.ignore_dirs, vec!["dist"]);
        assert_eq!(settings.retry.max_attempts, 2);
        // Untouched sections keep their defaults
        assert_eq!(settings.retry.initial_backoff_ms, 500);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(dir.path().join("does-not-exist.toml")).unwrap();
        assert_eq!(settings.watch.max_depth, 10);
    }
}
