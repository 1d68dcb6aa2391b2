use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// MQTT broker connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker hostname or IP address.
    ///
    /// May be left out of the file and supplied through the environment;
    /// bridges reject it when still empty after overrides.
    #[serde(default)]
    pub host: String,

    /// Broker port (default: 8883, MQTT over TLS).
    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    /// Username for broker authentication.
    #[serde(default)]
    pub username: Option<String>,

    /// Password for broker authentication.
    #[serde(default)]
    pub password: Option<String>,

    /// PEM encoded CA certificate used to verify the broker.
    ///
    /// When absent the connection is made over plain TCP.
    #[serde(default)]
    pub ca_cert_path: Option<PathBuf>,

    /// Device identifier. Used as MQTT client id and as a topic level.
    #[serde(default)]
    pub device_id: String,

    /// First topic level (default: "deye").
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,

    /// Last topic level for shared routing (default: "events").
    #[serde(default = "default_topic_suffix")]
    pub topic_suffix: String,

    /// How observations are mapped to topics.
    #[serde(default)]
    pub routing: TopicRouting,

    /// MQTT keep alive in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    /// Per-message acknowledgment timeout in milliseconds.
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
}

fn default_mqtt_port() -> u16 {
    8883
}

fn default_topic_prefix() -> String {
    "deye".to_string()
}

fn default_topic_suffix() -> String {
    "events".to_string()
}

fn default_keep_alive() -> u64 {
    30
}

fn default_ack_timeout_ms() -> u64 {
    3000
}

impl MqttConfig {
    /// Create a configuration with defaults for everything but host and device id.
    pub fn new(host: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_mqtt_port(),
            username: None,
            password: None,
            ca_cert_path: None,
            device_id: device_id.into(),
            topic_prefix: default_topic_prefix(),
            topic_suffix: default_topic_suffix(),
            routing: TopicRouting::default(),
            keep_alive_secs: default_keep_alive(),
            ack_timeout_ms: default_ack_timeout_ms(),
        }
    }

    /// How long to wait for a PUBACK before giving up on one message.
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

impl Default for MqttConfig {
    /// Defaults with an empty host and device id.
    fn default() -> Self {
        Self::new("", "")
    }
}

/// Topic routing strategy for published observations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicRouting {
    /// Every observation goes to `{prefix}/{device_id}/{topic_suffix}`.
    #[default]
    Shared,
    /// Each observation goes to `{prefix}/{device_id}/{metric}`.
    PerSensor,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Common logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Load a configuration from a JSON5 string.
pub fn parse_config<T: for<'de> Deserialize<'de>>(content: &str) -> Result<T> {
    json5::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
}
