//! Configuration for caches and degradation trackers.
//!
//! Everything here can be built in code or loaded from YAML/JSON. Durations
//! are written in human-readable form (`"30s"`, `"5m"`, `"1h 30m"`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::{ConfigError, Level};

/// Configuration for a fallback cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a computed value stays fresh
    #[serde(with = "humantime_duration")]
    pub ttl: Duration,

    /// Serve a stale value when a refresh fails
    #[serde(default)]
    pub stale_while_revalidate: bool,

    /// Upper bound on stored keys (unbounded when absent)
    ///
    /// A bounded store evicts by its admission policy, which may drop a
    /// last known value or decline to store a new one. Stale values are then
    /// no longer guaranteed for stale-while-revalidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<u64>,
}

impl CacheConfig {
    /// Create a config with the given freshness window.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            stale_while_revalidate: false,
            max_entries: None,
        }
    }

    /// Enable or disable stale-while-revalidate.
    pub fn stale_while_revalidate(mut self, enabled: bool) -> Self {
        self.stale_while_revalidate = enabled;
        self
    }

    /// Bound the number of stored keys. A bounded store may evict the last
    /// known value that stale-while-revalidate would otherwise serve.
    pub fn max_entries(mut self, max: u64) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Validate the cache configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl.is_zero() {
            return Err(ConfigError::Invalid("cache.ttl must be greater than zero".into()));
        }
        if self.max_entries == Some(0) {
            return Err(ConfigError::Invalid(
                "cache.max_entries must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

/// Failure counts at which each degraded level is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub degraded: u32,
    pub minimal: u32,
    pub offline: u32,
}

impl Thresholds {
    /// Create a threshold triple. Call [`Thresholds::validate`] before use.
    pub fn new(degraded: u32, minimal: u32, offline: u32) -> Self {
        Self {
            degraded,
            minimal,
            offline,
        }
    }

    /// Map an accumulated failure count to a level.
    ///
    /// The highest threshold met or exceeded wins.
    pub fn level_for(&self, failure_count: u32) -> Level {
        if failure_count >= self.offline {
            Level::Offline
        } else if failure_count >= self.minimal {
            Level::Minimal
        } else if failure_count >= self.degraded {
            Level::Degraded
        } else {
            Level::Normal
        }
    }

    /// Thresholds must be a strictly increasing triple starting at 1 or more.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.degraded == 0 {
            return Err(ConfigError::Invalid(
                "thresholds.degraded must be at least 1".into(),
            ));
        }
        if !(self.degraded < self.minimal && self.minimal < self.offline) {
            return Err(ConfigError::Invalid(format!(
                "thresholds must be strictly increasing (degraded < minimal < offline), got {} / {} / {}",
                self.degraded, self.minimal, self.offline
            )));
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::new(2, 5, 10)
    }
}

/// Configuration for a degradation tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradationConfig {
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Consecutive successes needed to return to normal
    #[serde(default = "default_recovery_threshold")]
    pub recovery_threshold: u32,
}

fn default_recovery_threshold() -> u32 {
    2
}

impl DegradationConfig {
    pub fn new(thresholds: Thresholds, recovery_threshold: u32) -> Self {
        Self {
            thresholds,
            recovery_threshold,
        }
    }

    /// Validate thresholds and recovery threshold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate()?;
        if self.recovery_threshold == 0 {
            return Err(ConfigError::Invalid(
                "recovery_threshold must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for DegradationConfig {
    fn default() -> Self {
        Self::new(Thresholds::default(), default_recovery_threshold())
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifelineConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub degradation: DegradationConfig,
}

impl LifelineConfig {
    /// Parse a config from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: LifelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: LifelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, choosing the format from its extension.
    ///
    /// `.json` is parsed as JSON; anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loading lifeline config");

        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.degradation.validate()?;
        Ok(())
    }
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_CONFIG: &str = r#"
cache:
  ttl: 5m
  stale_while_revalidate: true
degradation:
  thresholds:
    degraded: 2
    minimal: 5
    offline: 10
  recovery_threshold: 3
"#;

    #[test]
    fn test_parse_valid_yaml() {
        let config = LifelineConfig::from_yaml(VALID_CONFIG).unwrap();
        assert_eq!(config.cache.ttl, Duration::from_secs(300));
        assert!(config.cache.stale_while_revalidate);
        assert_eq!(config.cache.max_entries, None);
        assert_eq!(config.degradation.thresholds, Thresholds::new(2, 5, 10));
        assert_eq!(config.degradation.recovery_threshold, 3);
    }

    #[test]
    fn test_parse_json_with_defaults() {
        let json = r#"{ "cache": { "ttl": "1h 30m" } }"#;
        let config = LifelineConfig::from_json(json).unwrap();
        assert_eq!(config.cache.ttl, Duration::from_secs(5400));
        assert!(!config.cache.stale_while_revalidate);
        assert_eq!(config.degradation, DegradationConfig::default());
    }

    #[test]
    fn test_rejects_non_increasing_thresholds() {
        let yaml = r#"
degradation:
  thresholds:
    degraded: 5
    minimal: 5
    offline: 10
"#;
        let result = LifelineConfig::from_yaml(yaml);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_zero_recovery_threshold() {
        let config = DegradationConfig::new(Thresholds::default(), 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_duration() {
        let yaml = "cache:\n  ttl: soon\n";
        assert!(matches!(
            LifelineConfig::from_yaml(yaml),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_rejects_zero_ttl() {
        assert!(CacheConfig::new(Duration::ZERO).validate().is_err());
        assert!(CacheConfig::default().max_entries(0).validate().is_err());
    }

    #[test]
    fn test_level_for_picks_highest_threshold() {
        let thresholds = Thresholds::new(2, 5, 10);
        assert_eq!(thresholds.level_for(0), Level::Normal);
        assert_eq!(thresholds.level_for(1), Level::Normal);
        assert_eq!(thresholds.level_for(2), Level::Degraded);
        assert_eq!(thresholds.level_for(4), Level::Degraded);
        assert_eq!(thresholds.level_for(5), Level::Minimal);
        assert_eq!(thresholds.level_for(10), Level::Offline);
        assert_eq!(thresholds.level_for(u32::MAX), Level::Offline);
    }

    #[test]
    fn test_round_trip_keeps_human_durations() {
        let config = LifelineConfig {
            cache: CacheConfig::new(Duration::from_secs(90)).stale_while_revalidate(true),
            degradation: DegradationConfig::default(),
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("1m 30s"));
        assert_eq!(LifelineConfig::from_yaml(&yaml).unwrap(), config);
    }
}
