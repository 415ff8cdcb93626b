//! Configuration loading and parsing
//!
//! All keys are optional: a missing config file (or an empty one) yields
//! the built-in defaults, and everything is fixed at startup - there is no
//! runtime reconfiguration. The optional `[[signals]]` array replaces the
//! built-in signal catalog wholesale, which is how deployments on firmware
//! with a different wire layout are handled.

use anyhow::{Context, Result};
use can_telemetry_decoder::{LoopConfig, SignalCatalog, SignalSpec, SnapshotSchema};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main daemon configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Full signal catalog override; empty means the built-in rev-B layout
    #[serde(default)]
    pub signals: Vec<SignalSpec>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BusConfig {
    /// CAN interface name
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Receive timeout per acquisition cycle, in seconds
    #[serde(default = "default_recv_timeout_secs")]
    pub recv_timeout_secs: f64,
    /// Pause after a bus-level error, in seconds
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Snapshot file path
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    /// Snapshot column schema
    #[serde(default)]
    pub schema: SnapshotSchema,
}

fn default_channel() -> String {
    "can0".to_string()
}

fn default_recv_timeout_secs() -> f64 {
    10.0
}

fn default_error_backoff_secs() -> f64 {
    1.0
}

fn default_output_path() -> PathBuf {
    PathBuf::from("telemetry_data.csv")
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            recv_timeout_secs: default_recv_timeout_secs(),
            error_backoff_secs: default_error_backoff_secs(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            schema: SnapshotSchema::default(),
        }
    }
}

impl AppConfig {
    /// The signal catalog this deployment uses
    pub fn catalog(&self) -> can_telemetry_decoder::Result<SignalCatalog> {
        if self.signals.is_empty() {
            Ok(SignalCatalog::default())
        } else {
            SignalCatalog::from_specs(self.signals.clone())
        }
    }

    /// Loop timing derived from the bus section
    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            recv_timeout: Duration::from_secs_f64(self.bus.recv_timeout_secs),
            error_backoff: Duration::from_secs_f64(self.bus.error_backoff_secs),
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_yields_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.bus.channel, "can0");
        assert_eq!(config.bus.recv_timeout_secs, 10.0);
        assert_eq!(config.output.path, PathBuf::from("telemetry_data.csv"));
        assert_eq!(config.output.schema, SnapshotSchema::Celsius);
        assert_eq!(config.catalog().unwrap().num_signals(), 5);
    }

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [bus]
            channel = "can1"
            recv_timeout_secs = 2.5

            [output]
            path = "/run/telemetry/latest.csv"
            schema = "fahrenheit"
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.bus.channel, "can1");
        assert_eq!(config.loop_config().recv_timeout, Duration::from_millis(2500));
        assert_eq!(config.bus.error_backoff_secs, 1.0);
        assert_eq!(config.output.schema, SnapshotSchema::Fahrenheit);
    }

    #[test]
    fn test_signal_catalog_override() {
        let toml_content = r#"
            [[signals]]
            frame_id = 0x2A0
            name = "coolant_temp_celsius"
            kind = "temperature"
            start_byte = 2
            byte_order = "little_endian"
            scale = 0.1
            offset = -273.15
            unit = "°C"

            [[signals]]
            frame_id = 0x2A4
            name = "abs_error"
            kind = "flag"
            start_byte = 0
            bit_mask = 0x01
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.num_signals(), 2);
        assert_eq!(catalog.frame_ids(), vec![0x2A0, 0x2A4]);
        assert!(catalog.specs_for(0x3E0).is_none());
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        // flag without a bit mask
        let toml_content = r#"
            [[signals]]
            frame_id = 0x2A4
            name = "abs_error"
            kind = "flag"
            start_byte = 0
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert!(config.catalog().is_err());
    }
}
