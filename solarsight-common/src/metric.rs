use serde::{Deserialize, Serialize};

/// A single metric reading as it travels over MQTT.
///
/// Serialized as `{"metric": "<name>", "value": <number>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvent {
    /// Metric name (e.g., "day_energy", "ac/l1/voltage").
    pub metric: String,

    /// The measured value.
    pub value: f64,
}

impl MetricEvent {
    /// Create a new metric event.
    pub fn new(metric: impl Into<String>, value: f64) -> Self {
        Self {
            metric: metric.into(),
            value,
        }
    }
}
