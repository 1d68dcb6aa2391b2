//! Broker client abstraction and its rumqttc implementation.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{BridgeError, Result};

/// Upper bound for flushing the DISCONNECT packet on teardown.
const DISCONNECT_FLUSH: Duration = Duration::from_secs(1);

/// Capacity of the client request queue.
const REQUEST_CAPACITY: usize = 64;

/// Operations the [`Publisher`](crate::Publisher) needs from a broker.
///
/// Calls happen in a fixed order for each batch: `connect`, `start_loop`,
/// any number of `publish` + `wait_for_ack` pairs, `stop_loop`, `disconnect`.
/// `stop_loop` and `disconnect` may also be called after a failed `connect`
/// and must tolerate that.
pub trait BrokerClient: Send {
    /// Open the connection to the broker.
    fn connect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Start the background network processing loop.
    fn start_loop(&mut self) -> Result<()>;

    /// Enqueue a message with at-least-once delivery.
    fn publish(&mut self, topic: &str, payload: Vec<u8>) -> impl Future<Output = Result<()>> + Send;

    /// Wait until the last published message has been acknowledged.
    fn wait_for_ack(
        &mut self,
        topic: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Stop the background network processing loop.
    fn stop_loop(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Close the connection.
    fn disconnect(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// What the network loop reports back while it runs.
#[derive(Debug)]
enum LoopEvent {
    /// A PUBLISH packet left with this packet id.
    Sent(u16),
    /// The broker acknowledged this packet id.
    Acked(u16),
    /// The connection failed; the loop has exited.
    Failed(String),
}

/// [`BrokerClient`] backed by a rumqttc connection.
///
/// A fresh client and event loop are created on every [`connect`](BrokerClient::connect),
/// so each batch runs on its own connection.
pub struct MqttBroker {
    options: MqttOptions,
    client: Option<AsyncClient>,
    eventloop: Option<EventLoop>,
    events: Option<mpsc::UnboundedReceiver<LoopEvent>>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<EventLoop>>,
    /// Number of messages published on the current connection.
    published: usize,
    /// Number of `Sent` events consumed on the current connection.
    sent: usize,
    /// Packet ids reported sent and not acknowledged yet.
    unacked: HashSet<u16>,
    /// Packet ids acknowledged before their `Sent` event was consumed.
    early_acks: HashSet<u16>,
}

impl MqttBroker {
    /// Create a broker client from prepared connection options.
    pub fn new(options: MqttOptions) -> Self {
        Self {
            options,
            client: None,
            eventloop: None,
            events: None,
            stop: None,
            task: None,
            published: 0,
            sent: 0,
            unacked: HashSet::new(),
            early_acks: HashSet::new(),
        }
    }

    fn reset_counters(&mut self) {
        self.published = 0;
        self.sent = 0;
        self.unacked.clear();
        self.early_acks.clear();
    }
}

impl BrokerClient for MqttBroker {
    async fn connect(&mut self) -> Result<()> {
        let (host, port) = self.options.broker_address();
        let (client, mut eventloop) = AsyncClient::new(self.options.clone(), REQUEST_CAPACITY);
        self.reset_counters();

        tracing::info!(host = %host, port, "Connecting to MQTT broker");

        // rumqttc connects lazily on the first poll; drive it until CONNACK.
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    tracing::debug!(code = ?ack.code, "Connection acknowledged");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    return Err(BridgeError::connection(format!(
                        "{}:{}: {}",
                        host, port, e
                    )));
                }
            }
        }

        self.client = Some(client);
        self.eventloop = Some(eventloop);
        Ok(())
    }

    fn start_loop(&mut self) -> Result<()> {
        let mut eventloop = self
            .eventloop
            .take()
            .ok_or_else(|| BridgeError::connection("start_loop called without a connection"))?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    polled = eventloop.poll() => match polled {
                        Ok(Event::Outgoing(Outgoing::Publish(pkid))) => {
                            let _ = event_tx.send(LoopEvent::Sent(pkid));
                        }
                        Ok(Event::Incoming(Packet::PubAck(ack))) => {
                            let _ = event_tx.send(LoopEvent::Acked(ack.pkid));
                        }
                        Ok(event) => tracing::trace!(?event, "MQTT event"),
                        Err(e) => {
                            tracing::error!(error = %e, "MQTT connection error");
                            let _ = event_tx.send(LoopEvent::Failed(e.to_string()));
                            break;
                        }
                    },
                }
            }
            eventloop
        });

        self.events = Some(event_rx);
        self.stop = Some(stop_tx);
        self.task = Some(task);
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| BridgeError::connection("publish called without a connection"))?;

        // try_publish fails immediately when the request queue is full.
        client
            .try_publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| BridgeError::Publish {
                topic: topic.to_string(),
                message: e.to_string(),
            })?;

        self.published += 1;
        Ok(())
    }

    async fn wait_for_ack(&mut self, topic: &str, timeout: Duration) -> Result<()> {
        let target = self.published;
        let events = self
            .events
            .as_mut()
            .ok_or_else(|| BridgeError::connection("network loop is not running"))?;
        let sent = &mut self.sent;
        let unacked = &mut self.unacked;
        let early_acks = &mut self.early_acks;

        // Packet ids are recycled, so an ack only counts for the message whose
        // `Sent` it follows. Acks for messages an earlier wait gave up on are
        // dropped here instead of lingering.
        let wait = async {
            let mut pkid = None;
            while let Some(event) = events.recv().await {
                match event {
                    LoopEvent::Sent(id) => {
                        *sent += 1;
                        let acked = early_acks.remove(&id);
                        if *sent == target {
                            if acked {
                                return Ok(());
                            }
                            pkid = Some(id);
                        }
                        if !acked {
                            unacked.insert(id);
                        }
                    }
                    LoopEvent::Acked(id) => {
                        if !unacked.remove(&id) {
                            early_acks.insert(id);
                        } else if pkid == Some(id) {
                            return Ok(());
                        }
                    }
                    LoopEvent::Failed(message) => {
                        return Err(BridgeError::Publish {
                            topic: topic.to_string(),
                            message,
                        });
                    }
                }
            }
            Err(BridgeError::Publish {
                topic: topic.to_string(),
                message: "network loop stopped".to_string(),
            })
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| BridgeError::AckTimeout {
                topic: topic.to_string(),
                timeout,
            })?
    }

    async fn stop_loop(&mut self) -> Result<()> {
        self.events = None;
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            let eventloop = task
                .await
                .map_err(|e| BridgeError::worker(format!("MQTT network loop panicked: {}", e)))?;
            self.eventloop = Some(eventloop);
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };
        let eventloop = self.eventloop.take();

        client
            .try_disconnect()
            .map_err(|e| BridgeError::connection(format!("disconnect request failed: {}", e)))?;

        // The loop is stopped, so flush the DISCONNECT packet ourselves.
        if let Some(mut eventloop) = eventloop {
            let flush = async {
                loop {
                    match eventloop.poll().await {
                        Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
            };
            if tokio::time::timeout(DISCONNECT_FLUSH, flush).await.is_err() {
                tracing::debug!("Timed out flushing MQTT disconnect");
            }
        }

        tracing::info!("Disconnected from MQTT broker");
        Ok(())
    }
}
