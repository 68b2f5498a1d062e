//! Run configuration for the ticket generation pipeline.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! `TICKET_FORGE_*` environment variables, then command-line flags (applied
//! by the CLI through the builder methods).

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::llm::providers::openrouter::DEFAULT_MODEL;
use crate::tickets::{DateWindow, DEFAULT_FALLBACK_START};

/// Default number of tickets written per run.
pub const DEFAULT_TARGET_COUNT: usize = 10_000;

/// Default number of tickets requested per batch.
pub const DEFAULT_BATCH_SIZE: usize = 15;

/// Default half-width of the creation date window, in days.
pub const DEFAULT_DATE_RANGE_DAYS: u32 = 365;

/// Default output file.
pub const DEFAULT_OUTPUT_PATH: &str = "./data/generated_tickets.txt";

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "TICKET_FORGE_";

fn default_reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 18).unwrap_or_default()
}

/// Configuration for one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForgeConfig {
    // Dataset shape
    /// Number of tickets to write before stopping.
    pub target_count: usize,
    /// Number of tickets requested from the model per batch.
    pub batch_size: usize,
    /// Centre of the creation date window.
    pub reference_date: NaiveDate,
    /// Days on either side of `reference_date` that tickets may be dated.
    pub date_range_days: u32,
    /// First value probed when an identifier collision needs a fallback.
    pub fallback_start_id: u64,
    /// Dataset file, truncated at the start of every run.
    pub output_path: PathBuf,

    // LLM settings
    /// Model identifier passed to the provider.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,

    // Loop pacing
    /// Pause after each successful batch, in milliseconds.
    pub pacing_delay_ms: u64,
    /// Pause after each failed batch, in milliseconds.
    pub failure_delay_ms: u64,
    /// Abort after this many failed batches in a row. `None` retries forever.
    pub max_consecutive_failures: Option<u32>,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            target_count: DEFAULT_TARGET_COUNT,
            batch_size: DEFAULT_BATCH_SIZE,
            reference_date: default_reference_date(),
            date_range_days: DEFAULT_DATE_RANGE_DAYS,
            fallback_start_id: DEFAULT_FALLBACK_START,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),

            model: DEFAULT_MODEL.to_string(),
            temperature: 0.9,

            pacing_delay_ms: 500,
            failure_delay_ms: 5_000,
            max_consecutive_failures: None,
        }
    }
}

impl ForgeConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a YAML file. Missing keys take defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Parses a configuration from YAML text.
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Creates configuration from defaults overridden by environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TICKET_FORGE_TARGET_COUNT`: Tickets to generate (default: 10000)
    /// - `TICKET_FORGE_BATCH_SIZE`: Tickets per batch (default: 15)
    /// - `TICKET_FORGE_REFERENCE_DATE`: Window centre, `YYYY-MM-DD` (default: 2025-06-18)
    /// - `TICKET_FORGE_DATE_RANGE_DAYS`: Window half-width (default: 365)
    /// - `TICKET_FORGE_FALLBACK_START_ID`: Fallback cursor seed (default: 10000)
    /// - `TICKET_FORGE_OUTPUT_PATH`: Output file (default: ./data/generated_tickets.txt)
    /// - `TICKET_FORGE_MODEL`: Model identifier
    /// - `TICKET_FORGE_TEMPERATURE`: Sampling temperature (default: 0.9)
    /// - `TICKET_FORGE_PACING_DELAY_MS`: Pause between batches (default: 500)
    /// - `TICKET_FORGE_FAILURE_DELAY_MS`: Pause after a failed batch (default: 5000)
    /// - `TICKET_FORGE_MAX_CONSECUTIVE_FAILURES`: Give-up threshold (default: unset)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Applies `TICKET_FORGE_*` environment overrides on top of `self`.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup (environment-shaped keys).
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            let key = format!("{}{}", ENV_PREFIX, name);
            lookup(&key).map(|value| (key, value))
        };

        if let Some((key, val)) = get("TARGET_COUNT") {
            self.target_count = parse_env_value(&val, &key)?;
        }
        if let Some((key, val)) = get("BATCH_SIZE") {
            self.batch_size = parse_env_value(&val, &key)?;
        }
        if let Some((key, val)) = get("REFERENCE_DATE") {
            self.reference_date = parse_env_value(&val, &key)?;
        }
        if let Some((key, val)) = get("DATE_RANGE_DAYS") {
            self.date_range_days = parse_env_value(&val, &key)?;
        }
        if let Some((key, val)) = get("FALLBACK_START_ID") {
            self.fallback_start_id = parse_env_value(&val, &key)?;
        }
        if let Some((_, val)) = get("OUTPUT_PATH") {
            self.output_path = PathBuf::from(val);
        }
        if let Some((_, val)) = get("MODEL") {
            self.model = val;
        }
        if let Some((key, val)) = get("TEMPERATURE") {
            self.temperature = parse_env_value(&val, &key)?;
        }
        if let Some((key, val)) = get("PACING_DELAY_MS") {
            self.pacing_delay_ms = parse_env_value(&val, &key)?;
        }
        if let Some((key, val)) = get("FAILURE_DELAY_MS") {
            self.failure_delay_ms = parse_env_value(&val, &key)?;
        }
        if let Some((key, val)) = get("MAX_CONSECUTIVE_FAILURES") {
            self.max_consecutive_failures = if val.trim().is_empty() {
                None
            } else {
                Some(parse_env_value(&val, &key)?)
            };
        }

        Ok(self)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_count == 0 {
            return Err(ConfigError::ValidationFailed(
                "target_count must be greater than 0".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "model cannot be empty".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationFailed(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "output_path cannot be empty".to_string(),
            ));
        }

        if self.max_consecutive_failures == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "max_consecutive_failures must be at least 1 when set".to_string(),
            ));
        }

        // Each accepted record advances the fallback cursor once, and probing
        // can skip at most one used value per accepted record.
        let cursor_span = u64::try_from(self.target_count)
            .ok()
            .and_then(|count| count.checked_mul(2));
        if cursor_span
            .and_then(|span| self.fallback_start_id.checked_add(span))
            .is_none()
        {
            return Err(ConfigError::ValidationFailed(format!(
                "fallback_start_id {} leaves no room for {} fallback ids",
                self.fallback_start_id, self.target_count
            )));
        }

        self.date_window()?;
        Ok(())
    }

    /// Date window tickets are asked to fall into.
    pub fn date_window(&self) -> Result<DateWindow, ConfigError> {
        DateWindow::around(self.reference_date, self.date_range_days).ok_or_else(|| {
            ConfigError::ValidationFailed(format!(
                "date window of {} days around {} is out of range",
                self.date_range_days, self.reference_date
            ))
        })
    }

    /// Pause after a successful batch.
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }

    /// Pause after a failed batch.
    pub fn failure_delay(&self) -> Duration {
        Duration::from_millis(self.failure_delay_ms)
    }

    /// Builder method to set the target ticket count.
    pub fn with_target_count(mut self, count: usize) -> Self {
        self.target_count = count;
        self
    }

    /// Builder method to set the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Builder method to set the reference date.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }

    /// Builder method to set the date range half-width.
    pub fn with_date_range_days(mut self, days: u32) -> Self {
        self.date_range_days = days;
        self
    }

    /// Builder method to set the fallback identifier seed.
    pub fn with_fallback_start_id(mut self, start: u64) -> Self {
        self.fallback_start_id = start;
        self
    }

    /// Builder method to set the output path.
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Builder method to set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Builder method to set the temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Builder method to set both loop delays.
    pub fn with_delays(mut self, pacing: Duration, failure: Duration) -> Self {
        self.pacing_delay_ms = u64::try_from(pacing.as_millis()).unwrap_or(u64::MAX);
        self.failure_delay_ms = u64::try_from(failure.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Builder method to set the consecutive failure ceiling.
    pub fn with_max_consecutive_failures(mut self, max: Option<u32>) -> Self {
        self.max_consecutive_failures = max;
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ForgeConfig::default();
        assert_eq!(config.target_count, 10_000);
        assert_eq!(config.batch_size, 15);
        assert_eq!(config.reference_date.to_string(), "2025-06-18");
        assert_eq!(config.date_range_days, 365);
        assert_eq!(config.fallback_start_id, 10_000);
        assert_eq!(config.output_path, PathBuf::from("./data/generated_tickets.txt"));
        assert!((config.temperature - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.pacing_delay(), Duration::from_millis(500));
        assert_eq!(config.failure_delay(), Duration::from_secs(5));
        assert_eq!(config.max_consecutive_failures, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ForgeConfig::new()
            .with_target_count(3)
            .with_batch_size(5)
            .with_date_range_days(10)
            .with_fallback_start_id(20_000)
            .with_output_path("/tmp/out.txt")
            .with_model("test-model")
            .with_temperature(0.2)
            .with_delays(Duration::ZERO, Duration::from_millis(10))
            .with_max_consecutive_failures(Some(4));

        assert_eq!(config.target_count, 3);
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.date_range_days, 10);
        assert_eq!(config.fallback_start_id, 20_000);
        assert_eq!(config.output_path, PathBuf::from("/tmp/out.txt"));
        assert_eq!(config.model, "test-model");
        assert_eq!(config.pacing_delay_ms, 0);
        assert_eq!(config.failure_delay_ms, 10);
        assert_eq!(config.max_consecutive_failures, Some(4));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let cases = [
            ForgeConfig::new().with_target_count(0),
            ForgeConfig::new().with_batch_size(0),
            ForgeConfig::new().with_model("  "),
            ForgeConfig::new().with_temperature(2.5),
            ForgeConfig::new().with_output_path(""),
            ForgeConfig::new().with_max_consecutive_failures(Some(0)),
            ForgeConfig::new().with_reference_date(NaiveDate::MAX),
            ForgeConfig::new().with_fallback_start_id(u64::MAX),
        ];

        for config in cases {
            assert!(
                matches!(config.validate(), Err(ConfigError::ValidationFailed(_))),
                "expected validation failure for {config:?}"
            );
        }
    }

    #[test]
    fn test_fallback_start_headroom_boundary() {
        let config = ForgeConfig::new().with_target_count(100);

        let highest = u64::MAX - 200;
        assert!(config.clone().with_fallback_start_id(highest).validate().is_ok());
        assert!(matches!(
            config.with_fallback_start_id(highest + 1).validate(),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_yaml_partial_uses_defaults() {
        let config = ForgeConfig::from_yaml_str(
            "target_count: 50\nreference_date: 2024-01-15\nmax_consecutive_failures: 3\n",
        )
        .expect("valid yaml");

        assert_eq!(config.target_count, 50);
        assert_eq!(config.reference_date.to_string(), "2024-01-15");
        assert_eq!(config.max_consecutive_failures, Some(3));
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_yaml_empty_is_default() {
        assert_eq!(
            ForgeConfig::from_yaml_str("  \n").expect("empty yaml"),
            ForgeConfig::default()
        );
    }

    #[test]
    fn test_yaml_unknown_key_rejected() {
        let err = ForgeConfig::from_yaml_str("tickets: 5\n").expect_err("unknown key");
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_yaml_file_missing() {
        let err = ForgeConfig::from_yaml_file("/definitely/not/here.yaml").expect_err("missing");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = ForgeConfig::default()
            .with_overrides_from(lookup(&[
                ("TICKET_FORGE_TARGET_COUNT", "42"),
                ("TICKET_FORGE_BATCH_SIZE", " 7 "),
                ("TICKET_FORGE_REFERENCE_DATE", "2025-01-01"),
                ("TICKET_FORGE_OUTPUT_PATH", "out/t.txt"),
                ("TICKET_FORGE_MAX_CONSECUTIVE_FAILURES", "9"),
            ]))
            .expect("valid overrides");

        assert_eq!(config.target_count, 42);
        assert_eq!(config.batch_size, 7);
        assert_eq!(config.reference_date.to_string(), "2025-01-01");
        assert_eq!(config.output_path, PathBuf::from("out/t.txt"));
        assert_eq!(config.max_consecutive_failures, Some(9));
    }

    #[test]
    fn test_overrides_invalid_value() {
        let err = ForgeConfig::default()
            .with_overrides_from(lookup(&[("TICKET_FORGE_BATCH_SIZE", "many")]))
            .expect_err("invalid number");

        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "TICKET_FORGE_BATCH_SIZE"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
