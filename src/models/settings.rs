// Settings data models
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use super::target::SYSTEM_TARGET_NAME;

pub const MIN_INTERVAL_SECONDS: f64 = 0.1;
pub const MAX_INTERVAL_SECONDS: f64 = 10.0;
pub const DEFAULT_INTERVAL_SECONDS: f64 = 1.0;
pub const MIN_HISTORY_CAPACITY: usize = 10;
pub const MAX_HISTORY_CAPACITY: usize = 1000;
pub const DEFAULT_HISTORY_CAPACITY: usize = 60;

/// User-editable settings, stored as JSON
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorSettings {
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default = "default_interval")]
    pub interval_seconds: f64,
    #[serde(default = "default_capacity")]
    pub history_capacity: usize,
    #[serde(default)]
    pub include_system: bool,
    #[serde(default)]
    pub export_dir: Option<String>,
}

fn default_interval() -> f64 {
    DEFAULT_INTERVAL_SECONDS
}

fn default_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            include_system: false,
            export_dir: None,
        }
    }
}

impl MonitorSettings {
    pub fn validate(&self) -> Result<MonitorConfig, ConfigError> {
        let config = MonitorConfig {
            targets: self.targets.iter().map(|t| t.trim().to_string()).collect(),
            interval_seconds: self.interval_seconds,
            include_system: self.include_system,
            history_capacity: self.history_capacity,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Validated arguments for `ResourceMonitor::start`
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub targets: Vec<String>,
    pub interval_seconds: f64,
    pub include_system: bool,
    pub history_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            include_system: false,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_interval(self.interval_seconds)?;
        validate_capacity(self.history_capacity)?;

        let mut seen = HashSet::new();
        for name in &self.targets {
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::EmptyTargetName);
            }
            if !seen.insert(name) || (self.include_system && name == SYSTEM_TARGET_NAME) {
                return Err(ConfigError::DuplicateTarget(name.to_string()));
            }
        }

        if self.targets.is_empty() && !self.include_system {
            return Err(ConfigError::NothingToMonitor);
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_seconds)
    }
}

pub fn validate_interval(seconds: f64) -> Result<(), ConfigError> {
    if !seconds.is_finite() || !(MIN_INTERVAL_SECONDS..=MAX_INTERVAL_SECONDS).contains(&seconds) {
        return Err(ConfigError::IntervalOutOfRange(seconds));
    }
    Ok(())
}

pub fn validate_capacity(capacity: usize) -> Result<(), ConfigError> {
    if !(MIN_HISTORY_CAPACITY..=MAX_HISTORY_CAPACITY).contains(&capacity) {
        return Err(ConfigError::CapacityOutOfRange(capacity));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(targets: &[&str]) -> MonitorConfig {
        MonitorConfig {
            targets: targets.iter().map(|t| t.to_string()).collect(),
            ..MonitorConfig::default()
        }
    }

    #[test]
    fn test_defaults_are_valid_once_a_target_exists() {
        assert!(config(&["firefox"]).validate().is_ok());
        assert_eq!(MonitorConfig::default().validate(), Err(ConfigError::NothingToMonitor));
    }

    #[test]
    fn test_interval_bounds() {
        assert!(validate_interval(0.1).is_ok());
        assert!(validate_interval(10.0).is_ok());
        assert_eq!(validate_interval(0.05), Err(ConfigError::IntervalOutOfRange(0.05)));
        assert!(validate_interval(f64::NAN).is_err());
    }

    #[test]
    fn test_capacity_bounds() {
        assert!(validate_capacity(10).is_ok());
        assert!(validate_capacity(1000).is_ok());
        assert_eq!(validate_capacity(9), Err(ConfigError::CapacityOutOfRange(9)));
    }

    #[test]
    fn test_duplicate_and_empty_names() {
        assert_eq!(
            config(&["code", "code"]).validate(),
            Err(ConfigError::DuplicateTarget("code".into()))
        );
        assert_eq!(config(&["  "]).validate(), Err(ConfigError::EmptyTargetName));

        let mut with_system = config(&["System"]);
        with_system.include_system = true;
        assert!(with_system.validate().is_err());
    }

    #[test]
    fn test_settings_missing_fields_use_defaults() {
        let settings: MonitorSettings = serde_json::from_str(r#"{"targets":["chrome"]}"#).unwrap();
        assert_eq!(settings.interval_seconds, DEFAULT_INTERVAL_SECONDS);
        assert_eq!(settings.history_capacity, DEFAULT_HISTORY_CAPACITY);
        assert!(settings.validate().is_ok());
    }
}
