//! Configuration traits and utilities.

use std::path::Path;
use std::str::FromStr;

use serde::de::DeserializeOwned;

use crate::error::{BridgeError, Result};
use crate::{LoggingConfig, MqttConfig};

/// Trait for bridge configuration types.
///
/// Implement this trait for your bridge's configuration struct to get
/// automatic loading, environment overrides, validation, and access to
/// common config fields.
///
/// # Example
///
/// ```ignore
/// use serde::Deserialize;
/// use solarsight_bridge_framework::{BridgeConfig, MqttConfig, LoggingConfig};
///
/// #[derive(Debug, Deserialize)]
/// pub struct MyBridgeConfig {
///     pub mqtt: MqttConfig,
///     pub logging: LoggingConfig,
///     pub poll_interval_secs: u64,
/// }
///
/// impl BridgeConfig for MyBridgeConfig {
///     fn mqtt(&self) -> &MqttConfig {
///         &self.mqtt
///     }
///
///     fn logging(&self) -> &LoggingConfig {
///         &self.logging
///     }
///
///     fn validate(&self) -> Result<()> {
///         if self.poll_interval_secs == 0 {
///             return Err(BridgeError::validation("poll interval must be positive"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait BridgeConfig: Sized + DeserializeOwned {
    /// Get the MQTT configuration.
    fn mqtt(&self) -> &MqttConfig;

    /// Get the logging configuration.
    fn logging(&self) -> &LoggingConfig;

    /// Apply overrides from environment variables.
    ///
    /// `lookup` returns the value of a variable, if set. The default
    /// implementation ignores the environment.
    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let _ = lookup;
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// Called automatically after loading. Override to add custom validation.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Configuration to start from when the file does not exist.
    ///
    /// Returning `Some` lets a bridge run from environment variables alone;
    /// the result still goes through [`apply_env`](Self::apply_env) and
    /// [`validate`](Self::validate). The default makes a missing file an
    /// error.
    fn fallback() -> Option<Self> {
        None
    }

    /// Load configuration from a file path and the process environment.
    ///
    /// Supports JSON5 format. Environment overrides are applied before
    /// [`validate`](Self::validate) is called. A missing file falls back to
    /// [`fallback`](Self::fallback) when the bridge provides one.
    fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Load configuration from a file path with an explicit environment.
    fn load_with_env<F>(path: impl AsRef<Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path.as_ref();

        let mut config: Self = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            json5::from_str(&content)?
        } else {
            Self::fallback().ok_or_else(|| BridgeError::ConfigNotFound {
                path: path.display().to_string(),
            })?
        };

        config.apply_env(lookup)?;
        config.validate()?;

        Ok(config)
    }
}

/// Parse an environment value, naming the variable on failure.
pub fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| BridgeError::config(format!("Invalid value for {}: '{}' ({})", key, value, e)))
}

/// Apply the standard `MQTT_*` environment overrides to an MQTT configuration.
pub fn apply_mqtt_env<F>(mqtt: &mut MqttConfig, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("MQTT_HOST") {
        mqtt.host = host;
    }
    if let Some(port) = lookup("MQTT_PORT") {
        mqtt.port = parse_env("MQTT_PORT", &port)?;
    }
    if let Some(username) = lookup("MQTT_USERNAME") {
        mqtt.username = Some(username);
    }
    if let Some(password) = lookup("MQTT_PASSWORD") {
        mqtt.password = Some(password);
    }
    if let Some(path) = lookup("MQTT_CA_CERT_PATH") {
        mqtt.ca_cert_path = Some(path.into());
    }
    if let Some(device_id) = lookup("MQTT_DEVICE_ID") {
        mqtt.device_id = device_id;
    }
    if let Some(prefix) = lookup("MQTT_TOPIC_PREFIX") {
        mqtt.topic_prefix = prefix;
    }
    if let Some(suffix) = lookup("MQTT_TOPIC_SUFFIX") {
        mqtt.topic_suffix = suffix;
    }
    Ok(())
}

/// Validate the MQTT section shared by all bridges.
pub fn validate_mqtt(mqtt: &MqttConfig) -> Result<()> {
    if mqtt.host.is_empty() {
        return Err(BridgeError::validation("mqtt.host cannot be empty"));
    }
    if mqtt.port == 0 {
        return Err(BridgeError::validation("mqtt.port must be 1-65535"));
    }
    if mqtt.device_id.is_empty() {
        return Err(BridgeError::validation("mqtt.device_id cannot be empty"));
    }
    if mqtt.ack_timeout_ms == 0 {
        return Err(BridgeError::validation("mqtt.ack_timeout_ms must be positive"));
    }
    solarsight_common::validate_topic(&format!(
        "{}/{}/{}",
        mqtt.topic_prefix, mqtt.device_id, mqtt.topic_suffix
    ))
    .map_err(|e| BridgeError::validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, Deserialize)]
    struct TestConfig {
        mqtt: MqttConfig,
        #[serde(default)]
        logging: LoggingConfig,
    }

    impl BridgeConfig for TestConfig {
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
            apply_mqtt_env(&mut self.mqtt, &lookup)
        }

        fn validate(&self) -> Result<()> {
            validate_mqtt(&self.mqtt)
        }
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "solarsight-framework-{}-{}.json5",
            name,
            std::process::id()
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_config_not_found() {
        let result = TestConfig::load("/nonexistent/path.json5");
        assert!(matches!(result, Err(BridgeError::ConfigNotFound { .. })));
    }

    #[derive(Debug, Deserialize)]
    struct EnvOnlyConfig {
        #[serde(default)]
        mqtt: MqttConfig,
        #[serde(default)]
        logging: LoggingConfig,
    }

    impl BridgeConfig for EnvOnlyConfig {
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
            apply_mqtt_env(&mut self.mqtt, &lookup)
        }

        fn validate(&self) -> Result<()> {
            validate_mqtt(&self.mqtt)
        }

        fn fallback() -> Option<Self> {
            Some(Self {
                mqtt: MqttConfig::default(),
                logging: LoggingConfig::default(),
            })
        }
    }

    #[test]
    fn test_missing_file_uses_env() {
        let config = EnvOnlyConfig::load_with_env(
            "/nonexistent/path.json5",
            env(&[("MQTT_HOST", "broker"), ("MQTT_DEVICE_ID", "roof")]),
        )
        .unwrap();

        assert_eq!(config.mqtt.host, "broker");
        assert_eq!(config.mqtt.device_id, "roof");
        assert_eq!(config.mqtt.port, 8883);
    }

    #[test]
    fn test_missing_file_still_validated() {
        let result = EnvOnlyConfig::load_with_env(
            "/nonexistent/path.json5",
            env(&[("MQTT_HOST", "broker")]),
        );
        assert!(matches!(result, Err(BridgeError::ConfigValidation(_))));
    }

    #[test]
    fn test_env_overrides_file() {
        let path = write_config(
            "env",
            r#"{ mqtt: { host: "from-file", device_id: "dev" } }"#,
        );

        let config = TestConfig::load_with_env(
            &path,
            env(&[("MQTT_HOST", "from-env"), ("MQTT_PORT", "1883")]),
        )
        .unwrap();

        assert_eq!(config.mqtt.host, "from-env");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.device_id, "dev");
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_invalid_env_value() {
        let path = write_config(
            "badport",
            r#"{ mqtt: { host: "h", device_id: "dev" } }"#,
        );

        let result = TestConfig::load_with_env(&path, env(&[("MQTT_PORT", "eighty")]));

        assert!(matches!(result, Err(BridgeError::Config(_))));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_validation_runs_after_env() {
        let path = write_config(
            "validate",
            r#"{ mqtt: { host: "h", device_id: "dev" } }"#,
        );

        let result = TestConfig::load_with_env(&path, env(&[("MQTT_DEVICE_ID", "")]));

        assert!(matches!(result, Err(BridgeError::ConfigValidation(_))));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_parse_error() {
        let path = write_config("parse", "{ mqtt: ");
        let result = TestConfig::load_with_env(&path, env(&[]));
        assert!(matches!(result, Err(BridgeError::ConfigParse(_))));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_wildcard_topic_rejected() {
        let mut mqtt = MqttConfig::new("h", "dev");
        mqtt.topic_suffix = "events/#".to_string();
        assert!(validate_mqtt(&mqtt).is_err());
    }
}
