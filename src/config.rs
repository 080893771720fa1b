//! Bridge configuration
//!
//! Settings come from three layers: built-in defaults, an optional YAML
//! file, and command-line overrides applied by the binary.
//!
//! ```yaml
//! host: 172.31.1.1
//! montage: 0
//! stream_name: F1-Lab2
//! status_interval_secs: 30
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::montage::Montage;
use crate::transports::MqttSettings;
use crate::{BridgeError, Result};

/// Complete bridge configuration. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Broker host; the amplifier's access point address by default
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
    /// Montage ID, see [`crate::montage::MONTAGES`]
    pub montage: u32,
    pub stream_name: String,
    pub stream_type: String,
    pub source_id: String,
    pub poll_interval_ms: u64,
    pub status_interval_secs: u64,
    /// Delay between the sampling-stop command and disconnecting
    pub stop_grace_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "172.31.1.1".to_string(),
            port: 1883,
            client_id: "f1stream".to_string(),
            keep_alive_secs: 5,
            montage: 1,
            stream_name: "F1-Stream".to_string(),
            stream_type: "EEG".to_string(),
            source_id: "F1data".to_string(),
            poll_interval_ms: 1,
            status_interval_secs: 10,
            stop_grace_ms: 1000,
        }
    }
}

/// Foreground loop timing derived from a [`BridgeConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeTiming {
    pub poll_interval: Duration,
    pub status_interval: Duration,
    pub stop_grace: Duration,
}

impl Default for BridgeTiming {
    fn default() -> Self {
        BridgeConfig::default().timing()
    }
}

impl BridgeConfig {
    /// Parse and validate a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(BridgeError::config_error("host must not be empty"));
        }
        if self.port == 0 {
            return Err(BridgeError::config_error("port must be non-zero"));
        }
        if self.keep_alive_secs < 5 {
            return Err(BridgeError::config_error("keep_alive_secs must be at least 5"));
        }
        if self.poll_interval_ms == 0 {
            return Err(BridgeError::config_error("poll_interval_ms must be non-zero"));
        }
        if self.status_interval_secs == 0 {
            return Err(BridgeError::config_error("status_interval_secs must be non-zero"));
        }
        if self.stream_name.is_empty() {
            return Err(BridgeError::config_error("stream_name must not be empty"));
        }
        Montage::by_id(self.montage)?;
        Ok(())
    }

    /// The configured montage.
    pub fn montage(&self) -> Result<&'static Montage> {
        Montage::by_id(self.montage)
    }

    pub fn timing(&self) -> BridgeTiming {
        BridgeTiming {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            status_interval: Duration::from_secs(self.status_interval_secs),
            stop_grace: Duration::from_millis(self.stop_grace_ms),
        }
    }

    pub fn mqtt_settings(&self) -> MqttSettings {
        MqttSettings {
            port: self.port,
            client_id: self.client_id.clone(),
            keep_alive: Duration::from_secs(self.keep_alive_secs),
            ..MqttSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = BridgeConfig::default();
        config.validate().unwrap();
        assert_eq!(config.montage().unwrap().channel_count(), 2);
        assert_eq!(config.timing().stop_grace, Duration::from_secs(1));
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = BridgeConfig::from_yaml_str("montage: 0\nstream_name: Lab\n").unwrap();
        assert_eq!(config.montage, 0);
        assert_eq!(config.stream_name, "Lab");
        assert_eq!(config.host, "172.31.1.1");
        assert_eq!(config.port, 1883);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for yaml in [
            "port: 0",
            "poll_interval_ms: 0",
            "montage: 7",
            "host: ''",
            "keep_alive_secs: 1",
        ] {
            let err = BridgeConfig::from_yaml_str(yaml).unwrap_err();
            assert!(matches!(err, BridgeError::Config { .. }), "{yaml}: {err}");
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(BridgeConfig::from_yaml_str("hots: 10.0.0.1").is_err());
    }

    #[test]
    fn load_reads_yaml_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host: 10.0.0.7\nport: 11883\nclient_id: bench").unwrap();

        let config = BridgeConfig::load(file.path()).unwrap();
        assert_eq!(config.host, "10.0.0.7");

        let mqtt = config.mqtt_settings();
        assert_eq!(mqtt.port, 11883);
        assert_eq!(mqtt.client_id, "bench");
    }

    #[test]
    fn missing_file_reports_its_path() {
        let err = BridgeConfig::load("/nonexistent/f1stream.yaml").unwrap_err();
        match err {
            BridgeError::File { path, .. } => assert!(path.ends_with("f1stream.yaml")),
            other => panic!("expected file error, got {other}"),
        }
    }

    #[test]
    fn round_trips_through_yaml() {
        let config = BridgeConfig { montage: 0, ..BridgeConfig::default() };
        let yaml = serde_yaml_ng::to_string(&config).unwrap();
        assert_eq!(BridgeConfig::from_yaml_str(&yaml).unwrap(), config);
    }
}
