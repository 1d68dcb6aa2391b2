use std::time::Duration;

use rumqttc::{MqttOptions, TlsConfiguration, Transport};

use crate::config::MqttConfig;
use crate::error::{Error, Result};

/// Build MQTT connection options from the provided configuration.
///
/// Credentials and TLS are configured here once; the options are reused for
/// every connection the bridge opens.
pub fn mqtt_options(config: &MqttConfig) -> Result<MqttOptions> {
    if config.host.is_empty() {
        return Err(Error::Config("MQTT host must not be empty".to_string()));
    }
    if config.device_id.is_empty() {
        return Err(Error::Config("MQTT device id must not be empty".to_string()));
    }

    let mut options = MqttOptions::new(&config.device_id, &config.host, config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));
    options.set_clean_session(true);

    match (&config.username, &config.password) {
        (Some(username), password) => {
            options.set_credentials(username, password.clone().unwrap_or_default());
        }
        (None, Some(_)) => {
            return Err(Error::Config(
                "MQTT password is set but username is missing".to_string(),
            ));
        }
        (None, None) => {}
    }

    if let Some(path) = &config.ca_cert_path {
        let ca = std::fs::read(path).map_err(|e| {
            Error::Tls(format!(
                "Failed to read CA certificate '{}': {}",
                path.display(),
                e
            ))
        })?;

        options.set_transport(Transport::tls_with_config(TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth: None,
        }));
    }

    tracing::info!(
        host = %config.host,
        port = config.port,
        client_id = %config.device_id,
        tls = config.ca_cert_path.is_some(),
        "Prepared MQTT connection options"
    );

    Ok(options)
}
