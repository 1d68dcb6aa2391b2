//! Configuration for the Deye bridge.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use solarsight_bridge_framework::{
    BridgeConfig, BridgeError, LoggingConfig, MqttConfig, Result, apply_mqtt_env, parse_env,
    validate_mqtt,
};

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeyeBridgeConfig {
    /// MQTT broker settings
    #[serde(default)]
    pub mqtt: MqttConfig,

    /// Inverter data logger settings
    #[serde(default)]
    pub logger: LoggerConfig,

    /// Seconds between the end of one cycle and the start of the next
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Sensor groups to read and publish (default: ["micro"])
    #[serde(default = "default_metric_groups")]
    pub metric_groups: Vec<String>,

    /// Replace inverter reads with a fixed register map
    #[serde(default)]
    pub simulate: bool,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_poll_interval() -> u64 {
    60
}

fn default_metric_groups() -> Vec<String> {
    vec!["micro".to_string()]
}

impl Default for DeyeBridgeConfig {
    /// Every field at its default. Broker host, device id and logger host
    /// are empty and must be set before the configuration validates.
    fn default() -> Self {
        Self {
            mqtt: MqttConfig::default(),
            logger: LoggerConfig::default(),
            poll_interval_secs: default_poll_interval(),
            metric_groups: default_metric_groups(),
            simulate: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl DeyeBridgeConfig {
    /// Time between cycles.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Inverter data logger (Modbus server) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Connection type and address
    pub connection: ConnectionConfig,

    /// Modbus unit/slave ID (1-247)
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,

    /// Connect and read timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_unit_id() -> u8 {
    1
}

fn default_timeout_ms() -> u64 {
    1000
}

impl LoggerConfig {
    /// Logger reachable over Modbus TCP with default settings.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self {
            connection: ConnectionConfig::Tcp {
                host: host.into(),
                port,
            },
            unit_id: default_unit_id(),
            timeout_ms: default_timeout_ms(),
        }
    }

    /// Connect and read timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::tcp("", default_modbus_port())
    }
}

/// Connection configuration (TCP or RTU).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionConfig {
    /// Modbus TCP connection
    Tcp {
        /// Host address (IP or hostname)
        host: String,
        /// TCP port (default: 502)
        #[serde(default = "default_modbus_port")]
        port: u16,
    },
    /// Modbus RTU (serial) connection
    Rtu {
        /// Serial port path (e.g., "/dev/ttyUSB0")
        port: String,
        /// Baud rate (default: 9600)
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
        /// Data bits (default: 8)
        #[serde(default = "default_data_bits")]
        data_bits: u8,
        /// Parity: "none", "even", or "odd" (default: "none")
        #[serde(default = "default_parity")]
        parity: String,
        /// Stop bits: 1 or 2 (default: 1)
        #[serde(default = "default_stop_bits")]
        stop_bits: u8,
    },
}

fn default_modbus_port() -> u16 {
    502
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_data_bits() -> u8 {
    8
}

fn default_parity() -> String {
    "none".to_string()
}

fn default_stop_bits() -> u8 {
    1
}

impl BridgeConfig for DeyeBridgeConfig {
    fn mqtt(&self) -> &MqttConfig {
        &self.mqtt
    }

    fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        apply_mqtt_env(&mut self.mqtt, &lookup)?;

        if let Some(address) = lookup("DEYE_LOGGER_IP_ADDRESS") {
            match &mut self.logger.connection {
                ConnectionConfig::Tcp { host, .. } => *host = address,
                ConnectionConfig::Rtu { .. } => {
                    self.logger.connection = ConnectionConfig::Tcp {
                        host: address,
                        port: default_modbus_port(),
                    };
                }
            }
        }
        if let Some(value) = lookup("DEYE_LOGGER_PORT") {
            let new_port: u16 = parse_env("DEYE_LOGGER_PORT", &value)?;
            match &mut self.logger.connection {
                ConnectionConfig::Tcp { port, .. } => *port = new_port,
                ConnectionConfig::Rtu { .. } => {
                    return Err(BridgeError::config(
                        "DEYE_LOGGER_PORT requires a TCP logger connection",
                    ));
                }
            }
        }
        if let Some(value) = lookup("DEYE_DATA_READ_INTERVAL") {
            self.poll_interval_secs = parse_env("DEYE_DATA_READ_INTERVAL", &value)?;
        }
        if let Some(value) = lookup("DEYE_METRIC_GROUPS") {
            self.metric_groups = value
                .split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = lookup("DEYE_LOGGER_SIMULATE") {
            self.simulate = value.trim().eq_ignore_ascii_case("true");
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        validate_mqtt(&self.mqtt)?;

        if self.poll_interval_secs == 0 {
            return Err(BridgeError::validation(
                "poll_interval_secs must be at least 1",
            ));
        }

        if self.metric_groups.is_empty() {
            return Err(BridgeError::validation(
                "At least one metric group must be configured",
            ));
        }

        if !(1..=247).contains(&self.logger.unit_id) {
            return Err(BridgeError::validation(format!(
                "logger.unit_id must be 1-247, got {}",
                self.logger.unit_id
            )));
        }

        match &self.logger.connection {
            ConnectionConfig::Tcp { host, .. } if host.is_empty() && !self.simulate => {
                return Err(BridgeError::validation("logger host cannot be empty"));
            }
            ConnectionConfig::Rtu { parity, .. } => match parity.to_lowercase().as_str() {
                "none" | "even" | "odd" => {}
                _ => {
                    return Err(BridgeError::validation(format!(
                        "invalid parity '{}' (use none, even, or odd)",
                        parity
                    )));
                }
            },
            ConnectionConfig::Tcp { .. } => {}
        }

        Ok(())
    }

    fn fallback() -> Option<Self> {
        Some(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r#"{
        mqtt: { host: "broker.local", device_id: "device123" },
        logger: { connection: { type: "tcp", host: "192.168.1.50" } },
    }"#;

    fn parse(json: &str) -> DeyeBridgeConfig {
        json5::from_str(json).unwrap()
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = parse(MINIMAL);

        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.metric_groups, ["micro"]);
        assert!(!config.simulate);
        assert_eq!(config.logger.unit_id, 1);
        assert_eq!(config.logger.timeout(), Duration::from_secs(1));
        assert_eq!(
            config.logger.connection,
            ConnectionConfig::Tcp {
                host: "192.168.1.50".to_string(),
                port: 502
            }
        );
        assert_eq!(config.mqtt.port, 8883);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_rtu_config() {
        let config = parse(
            r#"{
                mqtt: { host: "broker.local", device_id: "device123" },
                logger: {
                    connection: { type: "rtu", port: "/dev/ttyUSB0", baud_rate: 19200, parity: "even" },
                    unit_id: 2,
                },
                metric_groups: ["string", "micro"],
            }"#,
        );

        if let ConnectionConfig::Rtu {
            port,
            baud_rate,
            parity,
            data_bits,
            stop_bits,
        } = &config.logger.connection
        {
            assert_eq!(port, "/dev/ttyUSB0");
            assert_eq!(*baud_rate, 19200);
            assert_eq!(parity, "even");
            assert_eq!(*data_bits, 8);
            assert_eq!(*stop_bits, 1);
        } else {
            panic!("Expected RTU connection");
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = parse(MINIMAL);
        config
            .apply_env(env(&[
                ("MQTT_HOST", "mqtt.example.com"),
                ("MQTT_DEVICE_ID", "inverter-7"),
                ("DEYE_LOGGER_IP_ADDRESS", "10.0.0.9"),
                ("DEYE_LOGGER_PORT", "8899"),
                ("DEYE_DATA_READ_INTERVAL", "30"),
                ("DEYE_METRIC_GROUPS", "string, micro,"),
                ("DEYE_LOGGER_SIMULATE", "True"),
            ]))
            .unwrap();

        assert_eq!(config.mqtt.host, "mqtt.example.com");
        assert_eq!(config.mqtt.device_id, "inverter-7");
        assert_eq!(
            config.logger.connection,
            ConnectionConfig::Tcp {
                host: "10.0.0.9".to_string(),
                port: 8899
            }
        );
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.metric_groups, ["string", "micro"]);
        assert!(config.simulate);
    }

    #[test]
    fn test_load_without_file() {
        let config = DeyeBridgeConfig::load_with_env(
            "/nonexistent/deye.json5",
            env(&[
                ("MQTT_HOST", "mqtt.example.com"),
                ("MQTT_PORT", "1883"),
                ("MQTT_DEVICE_ID", "deyesun600"),
                ("DEYE_LOGGER_IP_ADDRESS", "192.168.1.50"),
                ("DEYE_METRIC_GROUPS", "string"),
            ]),
        )
        .unwrap();

        assert_eq!(config.mqtt.host, "mqtt.example.com");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.device_id, "deyesun600");
        assert_eq!(
            config.logger.connection,
            ConnectionConfig::Tcp {
                host: "192.168.1.50".to_string(),
                port: 502
            }
        );
        assert_eq!(config.metric_groups, ["string"]);
        assert_eq!(config.poll_interval_secs, 60);
    }

    #[test]
    fn test_load_without_file_or_env() {
        let result = DeyeBridgeConfig::load_with_env("/nonexistent/deye.json5", env(&[]));
        assert!(matches!(result, Err(BridgeError::ConfigValidation(_))));
    }

    #[test]
    fn test_file_may_leave_addresses_to_env() {
        let mut config = parse(r#"{ poll_interval_secs: 15 }"#);
        assert!(config.validate().is_err());

        config
            .apply_env(env(&[
                ("MQTT_HOST", "broker.local"),
                ("MQTT_DEVICE_ID", "device123"),
                ("DEYE_LOGGER_IP_ADDRESS", "10.0.0.9"),
            ]))
            .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_secs(15));
    }

    #[test]
    fn test_simulate_needs_exact_true() {
        let mut config = parse(MINIMAL);
        config.apply_env(env(&[("DEYE_LOGGER_SIMULATE", "yes")])).unwrap();
        assert!(!config.simulate);
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = parse(MINIMAL);
        let err = config
            .apply_env(env(&[("DEYE_DATA_READ_INTERVAL", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("DEYE_DATA_READ_INTERVAL"));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = parse(MINIMAL);
        config.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = parse(MINIMAL);
        config.metric_groups.clear();
        assert!(config.validate().is_err());

        let mut config = parse(MINIMAL);
        config.logger.unit_id = 0;
        assert!(config.validate().is_err());

        let mut config = parse(MINIMAL);
        config.logger.unit_id = 248;
        assert!(config.validate().is_err());

        let mut config = parse(MINIMAL);
        config.logger.connection = ConnectionConfig::Rtu {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            data_bits: 8,
            parity: "mark".to_string(),
            stop_bits: 1,
        };
        assert!(config.validate().is_err());

        let mut config = parse(MINIMAL);
        config.mqtt.device_id.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_logger_host_allowed_when_simulating() {
        let mut config = parse(MINIMAL);
        config.logger = LoggerConfig::tcp("", 502);
        assert!(config.validate().is_err());

        config.simulate = true;
        assert!(config.validate().is_ok());
    }
}
