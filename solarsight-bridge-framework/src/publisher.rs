//! Batch publisher for MQTT.

use std::time::Duration;

use tracing::Instrument;

use solarsight_common::{MetricEvent, TopicBuilder, encode};

use crate::broker::BrokerClient;
use crate::error::{BridgeError, Result};

/// Default time to wait for a broker acknowledgment per message.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(3);

/// Publisher for sending metric events to the broker.
///
/// Owns the connection lifecycle for one batch at a time: connect, start
/// the network loop, publish every item, stop the loop and disconnect.
/// Teardown runs on every path, and a failing item never stops the rest
/// of the batch.
pub struct Publisher<B> {
    broker: B,
    topics: TopicBuilder,
    ack_timeout: Duration,
    span: tracing::Span,
}

impl<B: BrokerClient> Publisher<B> {
    /// Create a new publisher.
    pub fn new(broker: B, topics: TopicBuilder, span: tracing::Span) -> Self {
        Self {
            broker,
            topics,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            span,
        }
    }

    /// Set the per-message acknowledgment timeout.
    pub fn with_ack_timeout(mut self, ack_timeout: Duration) -> Self {
        self.ack_timeout = ack_timeout;
        self
    }

    /// Get the topic builder.
    pub fn topics(&self) -> &TopicBuilder {
        &self.topics
    }

    /// Get the acknowledgment timeout.
    pub fn ack_timeout(&self) -> Duration {
        self.ack_timeout
    }

    /// Get a reference to the broker client.
    pub fn broker(&self) -> &B {
        &self.broker
    }

    /// Publish a batch of metric events.
    ///
    /// Each item is a topic suffix and the event to send under
    /// `{prefix}/{device_id}/{suffix}`. Returns per-item statistics, or an
    /// error if the broker could not be reached at all.
    pub async fn publish_batch<'a, I>(&mut self, items: I) -> Result<PublishStats>
    where
        I: IntoIterator<Item = (&'a str, &'a MetricEvent)>,
    {
        let span = self.span.clone();
        async move {
            let result = match self.broker.connect().await {
                Ok(()) => match self.broker.start_loop() {
                    Ok(()) => Ok(self.publish_items(items).await),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };

            if let Err(e) = &result {
                tracing::error!(error = %e, "MQTT connection error");
            }

            self.teardown().await;
            result
        }
        .instrument(span)
        .await
    }

    async fn publish_items<'a, I>(&mut self, items: I) -> PublishStats
    where
        I: IntoIterator<Item = (&'a str, &'a MetricEvent)>,
    {
        let mut stats = PublishStats::default();

        for (suffix, event) in items {
            match self.publish_one(suffix, event).await {
                Ok(()) => stats.success += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::error!(metric = %event.metric, error = %e, "Failed to publish metric");
                }
            }
        }

        tracing::info!(
            success = stats.success,
            failed = stats.failed,
            success_rate = stats.success_rate(),
            "Published batch"
        );
        stats
    }

    async fn publish_one(&mut self, suffix: &str, event: &MetricEvent) -> Result<()> {
        let topic = self.topics.build(suffix)?;
        let payload = encode(event).map_err(|e| BridgeError::Serialization(e.to_string()))?;

        tracing::debug!(topic = %topic, metric = %event.metric, value = event.value, "Publishing message");

        self.broker.publish(&topic, payload).await?;
        self.broker.wait_for_ack(&topic, self.ack_timeout).await
    }

    async fn teardown(&mut self) {
        if let Err(e) = self.broker.stop_loop().await {
            tracing::error!(error = %e, "Failed to stop MQTT network loop");
        }
        if let Err(e) = self.broker.disconnect().await {
            tracing::error!(error = %e, "MQTT disconnect error");
        }
    }
}

/// Statistics from a batch publish operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishStats {
    /// Number of acknowledged messages.
    pub success: usize,
    /// Number of failed publishes.
    pub failed: usize,
}

impl PublishStats {
    /// Total number of attempted publishes.
    pub fn total(&self) -> usize {
        self.success + self.failed
    }

    /// Success rate as a percentage.
    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            100.0
        } else {
            (self.success as f64 / self.total() as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_stats() {
        let mut stats = PublishStats::default();
        assert_eq!(stats.total(), 0);
        assert_eq!(stats.success_rate(), 100.0);

        stats.success = 8;
        stats.failed = 2;
        assert_eq!(stats.total(), 10);
        assert_eq!(stats.success_rate(), 80.0);
    }
}
