//! MQTT bridge for Deye solar inverters.
//!
//! This bridge polls the inverter's data logger over Modbus (TCP or
//! RTU/serial), decodes the enabled sensors and publishes each reading to
//! an MQTT broker.
//!
//! # Topics
//!
//! ```text
//! <topic_prefix>/<device_id>/<topic_suffix>   (shared routing)
//! <topic_prefix>/<device_id>/<metric>         (per-sensor routing)
//! ```
//!
//! Every message carries `{"metric": "<metric>", "value": <number>}`.

pub mod config;
pub mod cycle;
pub mod daemon;
pub mod observation;
pub mod range;
pub mod reader;
pub mod registers;
pub mod registry;
pub mod sensor;

pub use config::{ConnectionConfig, DeyeBridgeConfig, LoggerConfig};
pub use cycle::{Acquisition, CycleError};
pub use daemon::DeyeDaemon;
pub use observation::Observation;
pub use range::{RegisterRange, merge_ranges};
pub use reader::{ModbusReader, ReadError, RegisterReader};
pub use registers::RegisterMap;
pub use sensor::{DecodedValue, Sensor};
