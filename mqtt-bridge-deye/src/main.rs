//! MQTT bridge for Deye solar inverters.
//!
//! Reads the inverter over Modbus at a fixed interval and publishes the
//! decoded sensors to an MQTT broker.

use anyhow::{Context, Result};
use mqtt_bridge_deye::registry::{enabled_sensors, known_groups};
use mqtt_bridge_deye::{Acquisition, DeyeBridgeConfig, DeyeDaemon, ModbusReader};
use solarsight_bridge_framework::{
    BridgeArgs, BridgeConfig, BridgeRunner, MqttBroker, Publisher, TopicBuilder,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = BridgeArgs::parse_with_default("deye.json5");

    let config = DeyeBridgeConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    let runner = BridgeRunner::new_with_args("mqtt-bridge-deye", config, Some(&args))?;
    let config = runner.config();

    if args.config.exists() {
        info!("Loaded configuration from {:?}", args.config);
    } else {
        info!("No configuration file at {:?}, using defaults and environment", args.config);
    }

    let known = known_groups();
    for group in &config.metric_groups {
        if !known.contains(&group.as_str()) {
            warn!(group = %group, known = ?known, "Unknown metric group");
        }
    }

    let sensors = enabled_sensors(&config.metric_groups);
    if sensors.is_empty() {
        warn!(groups = ?config.metric_groups, "No sensor matches the configured metric groups");
    }

    let acquisition = Acquisition::new(
        ModbusReader::new(config.logger.clone()),
        sensors,
        tracing::info_span!("acquisition"),
    )
    .with_simulate(config.simulate);

    info!(
        sensors = acquisition.sensors().len(),
        reads = acquisition.ranges().len(),
        simulate = config.simulate,
        "Acquisition prepared"
    );

    let options = solarsight_common::mqtt_options(&config.mqtt)
        .map_err(|e| anyhow::anyhow!("Invalid MQTT settings: {}", e))?;
    let publisher = Publisher::new(
        MqttBroker::new(options),
        TopicBuilder::new(&config.mqtt.topic_prefix, &config.mqtt.device_id),
        tracing::info_span!("publisher", device_id = %config.mqtt.device_id),
    )
    .with_ack_timeout(config.mqtt.ack_timeout());

    let mut daemon = DeyeDaemon::new(
        acquisition,
        publisher,
        config.mqtt.routing,
        &config.mqtt.topic_suffix,
    );

    runner
        .run_periodic(&mut daemon, config.poll_interval())
        .await?;

    info!("Deye bridge stopped");
    Ok(())
}
