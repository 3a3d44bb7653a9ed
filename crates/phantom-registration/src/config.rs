//! Configuration for the registration core.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Registration core configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Detector notification configuration
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Registration table configuration
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Liveness probe configuration
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Pub/sub endpoint the detector listens on
    #[serde(default = "default_detector_url")]
    pub url: String,

    /// Channel new phantoms are announced on
    #[serde(default = "default_detector_channel")]
    pub channel: String,

    /// Disable to skip detector notifications entirely
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Upper bound on one connect-and-publish
    #[serde(default = "default_detector_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// How long a registration stays valid
    #[serde(default = "default_retention", with = "humantime_serde")]
    pub retention: Duration,

    /// How often expired registrations are swept
    #[serde(default = "default_sweep_interval", with = "humantime_serde")]
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Parallel connection attempts per probe
    #[serde(default = "default_probe_width")]
    pub width: usize,

    /// Decision deadline for a probe
    #[serde(default = "default_statistical_timeout", with = "humantime_serde")]
    pub statistical_timeout: Duration,

    /// Upper bound on a single connection attempt
    #[serde(default = "default_attempt_timeout", with = "humantime_serde")]
    pub attempt_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            url: default_detector_url(),
            channel: default_detector_channel(),
            enabled: true,
            timeout: default_detector_timeout(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            retention: default_retention(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            width: default_probe_width(),
            statistical_timeout: default_statistical_timeout(),
            attempt_timeout: default_attempt_timeout(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_detector_url() -> String {
    "redis://127.0.0.1:6379".into()
}

fn default_detector_channel() -> String {
    detector_client::DETECTOR_REG_CHANNEL.into()
}

fn default_detector_timeout() -> Duration {
    detector_client::DEFAULT_PUBLISH_TIMEOUT
}

fn default_true() -> bool {
    true
}

fn default_retention() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_sweep_interval() -> Duration {
    default_retention() / 2
}

fn default_probe_width() -> usize {
    8
}

fn default_statistical_timeout() -> Duration {
    Duration::from_millis(750)
}

fn default_attempt_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.detector.channel, "dark_decoy_map");
        assert!(config.detector.enabled);
        assert_eq!(config.detector.timeout, Duration::from_secs(2));
        assert_eq!(config.registry.retention, Duration::from_secs(300));
        assert_eq!(config.registry.sweep_interval, Duration::from_secs(150));
        assert_eq!(config.probe.width, 8);
        assert_eq!(config.probe.statistical_timeout, Duration::from_millis(750));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_humantime_durations() {
        let config: Config = config::Config::builder()
            .set_override("registry.retention", "10m")
            .unwrap()
            .set_override("probe.statistical_timeout", "500ms")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.registry.retention, Duration::from_secs(600));
        assert_eq!(config.probe.statistical_timeout, Duration::from_millis(500));
        // Untouched sections keep their defaults
        assert_eq!(config.probe.width, 8);
        assert_eq!(config.detector.url, "redis://127.0.0.1:6379");
    }
}
