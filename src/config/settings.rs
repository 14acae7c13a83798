use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::utils::error::DxmError;
use crate::utils::format::validate_unit_id;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Connection settings
    pub host: String,
    pub port: u16,
    pub timeout_secs: f64,
    pub retry_attempts: u32,

    // Discovery and polling settings
    pub max_scan_units: u8,
    pub poll_interval_secs: f64,

    // Output settings
    pub output_format: String,
    pub distance_unit: String,
    pub show_timestamps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "192.168.0.1".to_string(),
            port: 502,
            timeout_secs: 5.0,
            retry_attempts: 3,
            max_scan_units: 8,
            poll_interval_secs: 1.0,
            output_format: "console".to_string(),
            distance_unit: "mm".to_string(),
            show_timestamps: true,
        }
    }
}

impl Config {
    /// Build a config from CLI arguments, starting from defaults. `host` is
    /// required by the argument parser; the rest are optional overrides.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, DxmError> {
        let mut config = if let Some(path) = matches.get_one::<String>("config") {
            Self::from_file(path)?
        } else {
            Self::default()
        };

        if let Some(host) = matches.get_one::<String>("host") {
            config.host = host.clone();
        }
        if let Some(port) = matches.get_one::<String>("port") {
            config.port = port
                .parse()
                .map_err(|_| DxmError::Config(format!("Invalid port: {}", port)))?;
        }
        if let Some(timeout) = matches.get_one::<String>("timeout") {
            config.timeout_secs = timeout
                .parse()
                .map_err(|_| DxmError::Config(format!("Invalid timeout: {}", timeout)))?;
        }
        if let Some(retries) = matches.get_one::<String>("retries") {
            config.retry_attempts = retries
                .parse()
                .map_err(|_| DxmError::Config(format!("Invalid retry count: {}", retries)))?;
        }
        if let Some(interval) = matches.get_one::<String>("interval") {
            config.poll_interval_secs = interval
                .parse()
                .map_err(|_| DxmError::Config(format!("Invalid interval: {}", interval)))?;
        }
        if let Some(unit) = matches.get_one::<String>("unit") {
            config.distance_unit = unit.clone();
        }
        if let Some(format) = matches.get_one::<String>("format") {
            config.output_format = format.clone();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DxmError> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            DxmError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| DxmError::Config(format!("Invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), DxmError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DxmError::Config(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| DxmError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&path, content).map_err(|e| {
            DxmError::Config(format!(
                "Failed to write config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), DxmError> {
        if self.host.is_empty() {
            return Err(DxmError::Config("Host must not be empty".to_string()));
        }
        if self.timeout_secs <= 0.0 {
            return Err(DxmError::Config(format!(
                "Timeout must be positive, got {}",
                self.timeout_secs
            )));
        }
        if self.retry_attempts == 0 {
            return Err(DxmError::Config(
                "Retry attempts must be at least 1".to_string(),
            ));
        }
        if !validate_unit_id(self.max_scan_units) {
            return Err(DxmError::Config(format!(
                "Max scan units must be 1-247, got {}",
                self.max_scan_units
            )));
        }
        if self.poll_interval_secs <= 0.0 {
            return Err(DxmError::Config(format!(
                "Poll interval must be positive, got {}",
                self.poll_interval_secs
            )));
        }
        match self.distance_unit.as_str() {
            "mm" | "cm" | "m" | "in" | "ft" => {}
            other => {
                return Err(DxmError::Config(format!(
                    "Unknown distance unit: {} (expected mm, cm, m, in, or ft)",
                    other
                )));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 502);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.max_scan_units, 8);
    }

    #[test]
    fn rejects_invalid_values() {
        let mut config = Config::default();
        config.timeout_secs = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.max_scan_units = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.distance_unit = "furlong".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip_preserves_settings() {
        let mut config = Config::default();
        config.host = "10.0.0.42".to_string();
        config.poll_interval_secs = 2.5;

        let serialized = toml::to_string_pretty(&config).unwrap();
        let restored: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(restored.host, "10.0.0.42");
        assert_eq!(restored.poll_interval_secs, 2.5);
        assert_eq!(restored.port, config.port);
    }

    #[test]
    fn save_and_reload_from_disk() {
        let path = std::env::temp_dir()
            .join("dxm_radar_settings_test")
            .join("roundtrip.toml");
        let mut config = Config::default();
        config.host = "10.1.2.3".to_string();
        config.save_to_file(&path).unwrap();

        let restored = Config::from_file(&path).unwrap();
        assert_eq!(restored.host, "10.1.2.3");
    }

    #[test]
    fn save_failure_is_a_config_error() {
        let dir = std::env::temp_dir().join("dxm_radar_settings_test");
        std::fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        // the parent path is a plain file, so directory creation must fail
        let err = Config::default()
            .save_to_file(blocker.join("sub").join("config.toml"))
            .unwrap_err();
        assert!(matches!(err, DxmError::Config(_)));
    }

    #[test]
    fn duration_helpers_convert_seconds() {
        let config = Config::default();
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }
}
