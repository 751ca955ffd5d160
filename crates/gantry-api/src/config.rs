//! Server configuration.

use serde::{Deserialize, Serialize};

use gantry_core::{Error, Result};
use gantry_stats::StatsPolicy;

/// Configuration for the Gantry API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server port.
    pub http_port: u16,

    /// Enable debug mode (pretty logs, relaxed startup checks).
    pub debug: bool,

    /// Optional shared secret required to access `/metrics`.
    ///
    /// When set to a non-empty value, callers must provide either:
    /// - `X-Metrics-Secret: <secret>`, or
    /// - `Authorization: Bearer <secret>`
    ///
    /// Empty/whitespace values are treated as unset.
    #[serde(default)]
    pub metrics_secret: Option<String>,

    /// Machine health reporting policy.
    #[serde(default)]
    pub stats: StatsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8080,
            debug: false,
            metrics_secret: None,
            stats: StatsConfig::default(),
        }
    }
}

/// Health reporting knobs, surfaced as deployment configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Defects-per-hour rate at which a machine flips to `Warning`.
    pub warning_threshold: f64,
    /// Floor, in hours, for the rate window denominator.
    pub min_window_hours: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        let policy = StatsPolicy::default();
        Self {
            warning_threshold: policy.warning_threshold,
            min_window_hours: policy.min_window_hours,
        }
    }
}

impl StatsConfig {
    /// Converts to the aggregator's policy type.
    #[must_use]
    pub fn to_policy(self) -> StatsPolicy {
        StatsPolicy {
            warning_threshold: self.warning_threshold,
            min_window_hours: self.min_window_hours,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Supported env vars:
    /// - `GANTRY_HTTP_PORT`
    /// - `GANTRY_DEBUG`
    /// - `GANTRY_METRICS_SECRET`
    /// - `GANTRY_STATS_WARNING_THRESHOLD`
    /// - `GANTRY_STATS_MIN_WINDOW_HOURS`
    ///
    /// # Errors
    ///
    /// Returns an error if any environment variable is present but cannot
    /// be parsed, or if a policy value is out of range.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = env_u16("GANTRY_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(debug) = env_bool("GANTRY_DEBUG")? {
            config.debug = debug;
        }
        config.metrics_secret = env_string("GANTRY_METRICS_SECRET");

        if let Some(threshold) = env_f64("GANTRY_STATS_WARNING_THRESHOLD")? {
            config.stats.warning_threshold = threshold;
        }
        if let Some(hours) = env_f64("GANTRY_STATS_MIN_WINDOW_HOURS")? {
            config.stats.min_window_hours = hours;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates policy values.
    ///
    /// # Errors
    ///
    /// Returns an error when a stats policy value is non-finite or
    /// non-positive.
    pub fn validate(&self) -> Result<()> {
        if !self.stats.warning_threshold.is_finite() || self.stats.warning_threshold <= 0.0 {
            return Err(Error::InvalidInput(
                "GANTRY_STATS_WARNING_THRESHOLD must be a positive number".to_string(),
            ));
        }
        if !self.stats.min_window_hours.is_finite() || self.stats.min_window_hours <= 0.0 {
            return Err(Error::InvalidInput(
                "GANTRY_STATS_MIN_WINDOW_HOURS must be a positive number".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u16(name: &str) -> Result<Option<u16>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u16>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u16: {e}")))
}

fn env_f64(name: &str) -> Result<Option<f64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<f64>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a number: {e}")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be a boolean (true/false/1/0)"
        ))),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    parse_bool(name, &v).map(Some)
}
