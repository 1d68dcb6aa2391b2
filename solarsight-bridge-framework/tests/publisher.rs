//! Publisher lifecycle tests against a scripted broker.

use std::time::Duration;

use solarsight_bridge_framework::{
    BridgeError, BrokerClient, MetricEvent, PublishStats, Publisher, Result, TopicBuilder,
};

/// Broker that records every call and fails where told to.
#[derive(Default)]
struct ScriptedBroker {
    calls: Vec<String>,
    published: Vec<(String, serde_json::Value)>,
    refuse_connect: bool,
    /// Zero-based index of the message whose acknowledgment never comes.
    timeout_on: Option<usize>,
    /// Zero-based index of the message rejected by the client queue.
    reject_on: Option<usize>,
}

impl BrokerClient for ScriptedBroker {
    async fn connect(&mut self) -> Result<()> {
        self.calls.push("connect".to_string());
        if self.refuse_connect {
            return Err(BridgeError::connection("connection refused"));
        }
        Ok(())
    }

    fn start_loop(&mut self) -> Result<()> {
        self.calls.push("start_loop".to_string());
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let index = self.published.len();
        self.calls.push(format!("publish {}", topic));
        self.published
            .push((topic.to_string(), serde_json::from_slice(&payload).unwrap()));

        if self.reject_on == Some(index) {
            return Err(BridgeError::Publish {
                topic: topic.to_string(),
                message: "request queue full".to_string(),
            });
        }
        Ok(())
    }

    async fn wait_for_ack(&mut self, topic: &str, timeout: Duration) -> Result<()> {
        self.calls.push("wait_for_ack".to_string());
        if self.timeout_on == Some(self.published.len() - 1) {
            return Err(BridgeError::AckTimeout {
                topic: topic.to_string(),
                timeout,
            });
        }
        Ok(())
    }

    async fn stop_loop(&mut self) -> Result<()> {
        self.calls.push("stop_loop".to_string());
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.calls.push("disconnect".to_string());
        Ok(())
    }
}

fn events() -> Vec<MetricEvent> {
    vec![
        MetricEvent::new("day_energy", 0.3),
        MetricEvent::new("uptime", 1440.0),
        MetricEvent::new("ac/freq", 50.01),
        MetricEvent::new("ac/l1/voltage", 231.4),
    ]
}

fn publisher(broker: ScriptedBroker) -> Publisher<ScriptedBroker> {
    Publisher::new(
        broker,
        TopicBuilder::new("prefix", "device123"),
        tracing::Span::none(),
    )
}

#[tokio::test]
async fn test_lifecycle_order() {
    let mut publisher = publisher(ScriptedBroker::default());
    let events = events();

    let stats = publisher
        .publish_batch(events.iter().map(|e| ("suffix", e)))
        .await
        .unwrap();

    assert_eq!(
        stats,
        PublishStats {
            success: 4,
            failed: 0
        }
    );

    let calls = &publisher.broker().calls;
    assert_eq!(calls.first().map(String::as_str), Some("connect"));
    assert_eq!(calls[1], "start_loop");
    assert_eq!(&calls[calls.len() - 2..], ["stop_loop", "disconnect"]);
    assert_eq!(
        calls.iter().filter(|c| c.starts_with("publish")).count(),
        4
    );
}

#[tokio::test]
async fn test_ack_timeout_isolated_to_one_item() {
    let mut publisher = publisher(ScriptedBroker {
        timeout_on: Some(1),
        ..Default::default()
    });
    let events = events();

    let stats = publisher
        .publish_batch(events.iter().map(|e| ("suffix", e)))
        .await
        .unwrap();

    assert_eq!(stats.success, 3);
    assert_eq!(stats.failed, 1);

    let broker = publisher.broker();
    let metrics: Vec<_> = broker
        .published
        .iter()
        .map(|(_, payload)| payload["metric"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(metrics, ["day_energy", "uptime", "ac/freq", "ac/l1/voltage"]);
    assert_eq!(broker.calls.last().map(String::as_str), Some("disconnect"));
}

#[tokio::test]
async fn test_rejected_item_skips_ack_wait() {
    let mut publisher = publisher(ScriptedBroker {
        reject_on: Some(0),
        ..Default::default()
    });
    let events = events();

    let stats = publisher
        .publish_batch(events.iter().map(|e| ("suffix", e)))
        .await
        .unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.success, 3);
    let waits = publisher
        .broker()
        .calls
        .iter()
        .filter(|c| *c == "wait_for_ack")
        .count();
    assert_eq!(waits, 3);
}

#[tokio::test]
async fn test_connect_failure_still_tears_down() {
    let mut publisher = publisher(ScriptedBroker {
        refuse_connect: true,
        ..Default::default()
    });
    let events = events();

    let result = publisher
        .publish_batch(events.iter().map(|e| ("suffix", e)))
        .await;

    assert!(matches!(result, Err(BridgeError::Connection(_))));
    assert_eq!(
        publisher.broker().calls,
        ["connect", "stop_loop", "disconnect"]
    );
    assert!(publisher.broker().published.is_empty());
}

#[tokio::test]
async fn test_topics_and_payloads() {
    let mut publisher = publisher(ScriptedBroker::default());
    let voltage = MetricEvent::new("grid_voltage", 214.8);

    publisher
        .publish_batch([("suffix", &voltage)])
        .await
        .unwrap();

    let (topic, payload) = &publisher.broker().published[0];
    assert_eq!(topic, "prefix/device123/suffix");
    assert_eq!(
        *payload,
        serde_json::json!({"metric": "grid_voltage", "value": 214.8})
    );
}

#[tokio::test]
async fn test_invalid_topic_is_an_item_failure() {
    let mut publisher = publisher(ScriptedBroker::default());
    let events = events();

    let stats = publisher
        .publish_batch([("bad/#", &events[0]), ("ok", &events[1])])
        .await
        .unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.success, 1);
    assert_eq!(publisher.broker().published.len(), 1);
}

#[test]
fn test_default_ack_timeout() {
    let publisher = publisher(ScriptedBroker::default());
    assert_eq!(publisher.ack_timeout(), Duration::from_secs(3));

    let publisher = publisher.with_ack_timeout(Duration::from_millis(500));
    assert_eq!(publisher.ack_timeout(), Duration::from_millis(500));
}
