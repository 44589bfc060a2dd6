// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the webhook relay.
//!
//! Values come from the environment (optionally seeded from a `.env` file).
//! Every field has a default except the operator webhook, which must be
//! supplied out-of-band.

use crate::validator::is_allowed_webhook;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPERATOR_WEBHOOK_URL is not set")]
    MissingOperatorWebhook,

    #[error("OPERATOR_WEBHOOK_URL is not an allowed webhook URL: {0}")]
    InvalidOperatorWebhook(String),

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Configuration for the relay service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:5000)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Operator endpoint that receives every submission
    pub operator_webhook_url: String,

    /// Base URL for page links when the request carries no `Origin`
    #[serde(default)]
    pub public_url: Option<String>,

    #[serde(default)]
    pub throttle: ThrottleConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Per-client submission cooldown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Minimum interval between accepted submissions (default: 25000)
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Entries idle for longer than this are swept (default: 3600)
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// How often the sweep runs (default: 60)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// Outbound notification delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Per-request timeout in milliseconds (default: 10000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Static site and application shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Directory holding built assets (default: dist)
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Shell file name inside `static_dir` (default: index.html)
    #[serde(default = "default_shell_file")]
    pub shell_file: String,

    /// Title prefix used on directory pages
    #[serde(default = "default_site_title")]
    pub title: String,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_cooldown_ms() -> u64 {
    25_000
}

fn default_retention_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_shell_file() -> String {
    "index.html".to_string()
}

fn default_site_title() -> String {
    "Webhook Relay".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            retention_secs: default_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            static_dir: default_static_dir(),
            shell_file: default_shell_file(),
            title: default_site_title(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl ThrottleConfig {
    /// Get the cooldown duration
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Get the retention window, never shorter than the cooldown.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs).max(self.cooldown())
    }

    /// Get the sweep interval
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl DeliveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl SiteConfig {
    /// Full path of the application shell.
    pub fn shell_path(&self) -> PathBuf {
        self.static_dir.join(&self.shell_file)
    }
}

impl Config {
    /// Build a configuration around an operator endpoint, defaults elsewhere.
    pub fn with_operator(operator_webhook_url: impl Into<String>) -> Self {
        Self {
            bind_addr: default_bind_addr(),
            operator_webhook_url: operator_webhook_url.into(),
            public_url: None,
            throttle: ThrottleConfig::default(),
            delivery: DeliveryConfig::default(),
            site: SiteConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let operator = lookup("OPERATOR_WEBHOOK_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingOperatorWebhook)?;
        if !is_allowed_webhook(&operator) {
            return Err(ConfigError::InvalidOperatorWebhook(operator));
        }

        let mut config = Self::with_operator(operator);

        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr;
        }
        config.public_url = lookup("PUBLIC_URL").map(|u| u.trim_end_matches('/').to_string());

        config.throttle.cooldown_ms = parse_or(&lookup, "COOLDOWN_MS", config.throttle.cooldown_ms)?;
        config.throttle.retention_secs =
            parse_or(&lookup, "RETENTION_SECS", config.throttle.retention_secs)?;
        config.throttle.sweep_interval_secs =
            parse_or(&lookup, "SWEEP_INTERVAL_SECS", config.throttle.sweep_interval_secs)?;
        config.delivery.timeout_ms =
            parse_or(&lookup, "DELIVERY_TIMEOUT_MS", config.delivery.timeout_ms)?;

        if let Some(dir) = lookup("STATIC_DIR") {
            config.site.static_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup("SHELL_FILE") {
            config.site.shell_file = file;
        }
        if let Some(title) = lookup("SITE_TITLE") {
            config.site.title = title;
        }

        config.metrics.enabled = parse_or(&lookup, "METRICS_ENABLED", config.metrics.enabled)?;
        if let Some(path) = lookup("METRICS_PATH") {
            config.metrics.path = path;
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const OPERATOR: &str = "https://discord.com/api/webhooks/1/operator";

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("OPERATOR_WEBHOOK_URL", OPERATOR)])).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:5000");
        assert_eq!(config.throttle.cooldown(), Duration::from_secs(25));
        assert_eq!(config.throttle.retention(), Duration::from_secs(3600));
        assert_eq!(config.site.shell_path(), PathBuf::from("dist/index.html"));
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_operator_webhook_required() {
        let result = Config::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::MissingOperatorWebhook)));
    }

    #[test]
    fn test_operator_webhook_must_be_allowed() {
        let result = Config::from_lookup(lookup_from(&[(
            "OPERATOR_WEBHOOK_URL",
            "https://evil.example.com/hook",
        )]));
        assert!(matches!(result, Err(ConfigError::InvalidOperatorWebhook(_))));
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPERATOR_WEBHOOK_URL", OPERATOR),
            ("COOLDOWN_MS", "1000"),
            ("PUBLIC_URL", "https://relay.example.org/"),
        ]))
        .unwrap();
        assert_eq!(config.throttle.cooldown_ms, 1000);
        assert_eq!(config.public_url.as_deref(), Some("https://relay.example.org"));

        let result = Config::from_lookup(lookup_from(&[
            ("OPERATOR_WEBHOOK_URL", OPERATOR),
            ("COOLDOWN_MS", "soon"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { var: "COOLDOWN_MS", .. })
        ));
    }

    #[test]
    fn test_retention_never_below_cooldown() {
        let throttle = ThrottleConfig {
            cooldown_ms: 120_000,
            retention_secs: 10,
            ..Default::default()
        };
        assert_eq!(throttle.retention(), Duration::from_secs(120));
    }
}
