//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::mapping::{ActionMap, PinPattern};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub journal: JournalConfig,

    /// Gesture bindings; the built-in default table is used when absent
    #[serde(default)]
    pub gestures: Option<HashMap<String, PinPattern>>,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Device path; empty means auto-detect
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Detector feed configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DetectorConfig {
    /// Event feed source: "stdin" or a FIFO/socket path
    #[serde(default = "default_feed")]
    pub feed: String,

    /// Pre-trained gesture database, passed through to the SDK process
    #[serde(default = "default_database")]
    pub database: String,

    /// Detections below this confidence count as not detected (0.0-1.0)
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
}

/// Dispatch journal configuration
#[derive(Debug, Deserialize, Clone)]
pub struct JournalConfig {
    #[serde(default = "default_journal_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

// Default value functions
fn default_baud_rate() -> u32 { 57_600 }
fn default_timeout_ms() -> u64 { 100 }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_feed() -> String { "stdin".to_string() }
fn default_database() -> String { "gestures/controller.gbd".to_string() }
fn default_min_confidence() -> f32 { 0.0 }

fn default_journal_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            feed: default_feed(),
            database: default_database(),
            min_confidence: default_min_confidence(),
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: default_journal_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            detector: DetectorConfig::default(),
            journal: JournalConfig::default(),
            gestures: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gesture_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the validated gesture dispatch table.
    ///
    /// Configured bindings win; the built-in default table covers the
    /// no-configuration case.
    pub fn action_map(&self) -> Result<ActionMap> {
        match &self.gestures {
            Some(bindings) => ActionMap::from_bindings(bindings.clone()),
            None => Ok(ActionMap::default_table()),
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Validate timing fields
        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(crate::error::GestureBridgeError::Config(
                toml::de::Error::custom("timeout_ms must be between 1 and 10000")
            ));
        }

        if self.serial.reconnect_interval_ms == 0 || self.serial.reconnect_interval_ms > 60000 {
            return Err(crate::error::GestureBridgeError::Config(
                toml::de::Error::custom("reconnect_interval_ms must be between 1 and 60000")
            ));
        }

        // Validate baud rate
        if ![9600, 19200, 38400, 57600, 115200].contains(&self.serial.baud_rate) {
            return Err(crate::error::GestureBridgeError::Config(
                toml::de::Error::custom("baud_rate must be one of: 9600, 19200, 38400, 57600, 115200")
            ));
        }

        // Validate detector configuration
        if self.detector.feed.is_empty() {
            return Err(crate::error::GestureBridgeError::Config(
                toml::de::Error::custom("detector feed cannot be empty (use \"stdin\" or a path)")
            ));
        }

        if self.detector.database.is_empty() {
            return Err(crate::error::GestureBridgeError::Config(
                toml::de::Error::custom("detector database path cannot be empty")
            ));
        }

        if !(0.0..=1.0).contains(&self.detector.min_confidence) {
            return Err(crate::error::GestureBridgeError::Config(
                toml::de::Error::custom("min_confidence must be between 0.0 and 1.0")
            ));
        }

        // Validate journal configuration
        if self.journal.enabled && self.journal.log_dir.is_empty() {
            return Err(crate::error::GestureBridgeError::Config(
                toml::de::Error::custom("journal log_dir cannot be empty when enabled")
            ));
        }

        if self.journal.max_records_per_file == 0 {
            return Err(crate::error::GestureBridgeError::Config(
                toml::de::Error::custom("max_records_per_file must be greater than 0")
            ));
        }

        if self.journal.max_files_to_keep == 0 {
            return Err(crate::error::GestureBridgeError::Config(
                toml::de::Error::custom("max_files_to_keep must be greater than 0")
            ));
        }

        // Validate gesture bindings by building the table
        self.action_map()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::DEFAULT_TAP_HOLD_MS;

    fn create_valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_uses_default_gesture_table() {
        let config = Config::default();
        let map = config.action_map().unwrap();
        assert!(map.lookup("punch_right").is_some());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "/dev/ttyUSB0"

[detector]

[journal]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let result = Config::load(temp_file.path());
        assert!(result.is_ok());
        assert_eq!(result.unwrap().serial.port, "/dev/ttyUSB0");
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"").unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.baud_rate, 57_600);
        assert_eq!(config.detector.feed, "stdin");
        assert!(config.gestures.is_none());
    }

    #[test]
    fn test_load_config_with_gesture_bindings() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[gestures.wave]
pattern = "tap"
pin = 9

[gestures.stance]
pattern = "hold"
pin = 10
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        let map = config.action_map().unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(
            map.lookup("wave"),
            Some(&PinPattern::Tap { pin: 9, hold_ms: DEFAULT_TAP_HOLD_MS })
        );
        // Configured bindings replace the default table entirely
        assert!(map.lookup("punch_right").is_none());
    }

    #[test]
    fn test_load_config_with_invalid_binding_fails() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[gestures.wave]
pattern = "tap"
pin = 200
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_timeout_ms_zero() {
        let mut config = create_valid_config();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_ms_too_high() {
        let mut config = create_valid_config();
        config.serial.timeout_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reconnect_interval_zero() {
        let mut config = create_valid_config();
        config.serial.reconnect_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reconnect_interval_too_high() {
        let mut config = create_valid_config();
        config.serial.reconnect_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = create_valid_config();
        config.serial.baud_rate = 420_000; // Not in the allowed list
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &[9600, 19200, 38400, 57600, 115200] {
            let mut config = create_valid_config();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_empty_feed() {
        let mut config = create_valid_config();
        config.detector.feed = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_database() {
        let mut config = create_valid_config();
        config.detector.database = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_min_confidence_negative() {
        let mut config = create_valid_config();
        config.detector.min_confidence = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_min_confidence_too_high() {
        let mut config = create_valid_config();
        config.detector.min_confidence = 1.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_min_confidence_bounds_are_valid() {
        for &value in &[0.0, 0.5, 1.0] {
            let mut config = create_valid_config();
            config.detector.min_confidence = value;
            assert!(config.validate().is_ok(), "min_confidence {} should be valid", value);
        }
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = create_valid_config();
        config.journal.enabled = true;
        config.journal.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = create_valid_config();
        config.journal.enabled = false;
        config.journal.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_records_per_file_zero() {
        let mut config = create_valid_config();
        config.journal.max_records_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_files_to_keep_zero() {
        let mut config = create_valid_config();
        config.journal.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_hold_pins_rejected() {
        let mut bindings = HashMap::new();
        bindings.insert("guard".to_string(), PinPattern::Hold { pin: 7 });
        bindings.insert("crouch".to_string(), PinPattern::Hold { pin: 7 });

        let mut config = create_valid_config();
        config.gestures = Some(bindings);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_baud_rate(), 57_600);
        assert_eq!(default_timeout_ms(), 100);
        assert_eq!(default_reconnect_interval_ms(), 1000);
        assert_eq!(default_feed(), "stdin");
        assert_eq!(default_database(), "gestures/controller.gbd");
        assert_eq!(default_min_confidence(), 0.0);
        assert_eq!(default_journal_enabled(), true);
        assert_eq!(default_log_dir(), "./logs");
        assert_eq!(default_max_records_per_file(), 10000);
        assert_eq!(default_max_files_to_keep(), 10);
    }
}
