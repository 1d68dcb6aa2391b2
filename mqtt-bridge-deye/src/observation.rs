//! Decoded readings of one cycle.

use chrono::{DateTime, Utc};
use solarsight_common::MetricEvent;

use crate::sensor::{DecodedValue, Sensor};

/// One sensor's value at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub sensor: &'static Sensor,
    pub timestamp: DateTime<Utc>,
    pub value: DecodedValue,
}

impl Observation {
    pub fn new(sensor: &'static Sensor, timestamp: DateTime<Utc>, value: DecodedValue) -> Self {
        Self {
            sensor,
            timestamp,
            value,
        }
    }

    /// Canonical string rendering of the value.
    pub fn value_as_str(&self) -> String {
        self.value.to_string()
    }

    /// Payload for publishing, or `None` for decode-only sensors.
    pub fn to_event(&self) -> Option<MetricEvent> {
        self.sensor
            .metric
            .map(|metric| MetricEvent::new(metric, self.value.as_f64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static VOLTAGE: Sensor = Sensor::unsigned("Grid voltage", 0x3c, 0.1, 1).metric("grid_voltage");
    static FAN: Sensor = Sensor::flag("Fan warning", 0x65, 1);

    #[test]
    fn test_event_from_published_sensor() {
        let value = DecodedValue::Number {
            value: 214.8,
            decimals: 1,
        };
        let observation = Observation::new(&VOLTAGE, Utc::now(), value);

        assert_eq!(observation.value_as_str(), "214.8");
        assert_eq!(
            observation.to_event(),
            Some(MetricEvent::new("grid_voltage", 214.8))
        );
    }

    #[test]
    fn test_decode_only_sensor_has_no_event() {
        let observation = Observation::new(&FAN, Utc::now(), DecodedValue::Flag(true));

        assert_eq!(observation.value_as_str(), "true");
        assert_eq!(observation.to_event(), None);
    }
}
