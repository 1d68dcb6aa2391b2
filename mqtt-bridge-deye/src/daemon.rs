//! The acquire-then-publish worker driven by the bridge runner.

use chrono::Utc;
use solarsight_bridge_framework::{
    BridgeError, BrokerClient, MetricEvent, PublishStats, Publisher, Result, TopicRouting, Worker,
};

use crate::cycle::Acquisition;
use crate::observation::Observation;
use crate::reader::RegisterReader;

/// Worker running one full cycle per tick.
pub struct DeyeDaemon<R, B> {
    acquisition: Acquisition<R>,
    publisher: Publisher<B>,
    routing: TopicRouting,
    topic_suffix: String,
}

impl<R: RegisterReader, B: BrokerClient> DeyeDaemon<R, B> {
    pub fn new(
        acquisition: Acquisition<R>,
        publisher: Publisher<B>,
        routing: TopicRouting,
        topic_suffix: impl Into<String>,
    ) -> Self {
        Self {
            acquisition,
            publisher,
            routing,
            topic_suffix: topic_suffix.into(),
        }
    }

    pub fn publisher(&self) -> &Publisher<B> {
        &self.publisher
    }

    /// Acquire observations and publish them.
    ///
    /// Returns `None` when the cycle had nothing to publish.
    pub async fn run_cycle(&mut self) -> Result<Option<PublishStats>> {
        let observations = self
            .acquisition
            .acquire(Utc::now())
            .await
            .map_err(|e| BridgeError::worker(e.to_string()))?;

        let items = publish_items(self.routing, &self.topic_suffix, &observations);
        if items.is_empty() {
            tracing::info!("No observations to publish");
            return Ok(None);
        }

        let stats = self
            .publisher
            .publish_batch(items.iter().map(|(suffix, event)| (*suffix, event)))
            .await?;
        Ok(Some(stats))
    }
}

impl<R: RegisterReader, B: BrokerClient> Worker for DeyeDaemon<R, B> {
    async fn tick(&mut self) -> Result<()> {
        self.run_cycle().await.map(|_| ())
    }
}

/// Topic suffix and payload for every publishable observation.
///
/// Decode-only sensors are skipped.
pub fn publish_items<'a>(
    routing: TopicRouting,
    topic_suffix: &'a str,
    observations: &[Observation],
) -> Vec<(&'a str, MetricEvent)> {
    observations
        .iter()
        .filter_map(|observation| {
            let event = observation.to_event()?;
            let suffix = match routing {
                TopicRouting::Shared => topic_suffix,
                TopicRouting::PerSensor => observation.sensor.metric?,
            };
            Some((suffix, event))
        })
        .collect()
}
