//! SolarSight Bridge Framework
//!
//! Common abstractions for building bridges that poll a device and publish
//! its readings to an MQTT broker.
//!
//! # Overview
//!
//! This framework provides:
//! - [`BridgeConfig`] trait for configuration loading, environment overrides and validation
//! - [`BridgeRunner`] for running a [`Worker`] at a fixed interval until shutdown
//! - [`Publisher`] for publishing batches of metrics with per-item isolation
//! - [`BrokerClient`] as the seam between the publisher and the MQTT client ([`MqttBroker`])
//! - [`BridgeArgs`] for common CLI argument parsing
//!
//! # Example
//!
//! ```ignore
//! use solarsight_bridge_framework::{BridgeArgs, BridgeConfig, BridgeRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = BridgeArgs::parse_with_default("mybridge.json5");
//!     let config = MyBridgeConfig::load(&args.config)?;
//!
//!     let runner = BridgeRunner::new_with_args("mybridge", config, Some(&args))?;
//!     let mut worker = MyWorker::new(runner.config())?;
//!
//!     // Run until Ctrl+C
//!     runner.run_periodic(&mut worker, Duration::from_secs(60)).await?;
//!     Ok(())
//! }
//! ```

mod args;
mod broker;
mod config;
mod error;
mod publisher;
mod runner;

pub use args::BridgeArgs;
pub use broker::{BrokerClient, MqttBroker};
pub use config::{BridgeConfig, apply_mqtt_env, parse_env, validate_mqtt};
pub use error::{BridgeError, Result};
pub use publisher::{DEFAULT_ACK_TIMEOUT, PublishStats, Publisher};
pub use runner::{BridgeRunner, DaemonState, Worker};

// Re-export commonly used types from solarsight-common
pub use solarsight_common::{
    LogFormat, LoggingConfig, MetricEvent, MqttConfig, TopicBuilder, TopicRouting,
};
