//! MQTT client wrapper for the node bus.

use crate::config::MqttConfig;
use crate::error::{ClimateError, Result};
use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// How long a node waits for the broker's CONNACK before giving up.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Message received from MQTT broker.
#[derive(Debug, Clone)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: String,
}

/// MQTT client for one node.
///
/// Sessions are clean, so the broker forgets subscriptions whenever the
/// connection drops. `topics` are subscribed again on every CONNACK.
pub struct MqttClient {
    client: AsyncClient,
    event_loop: EventLoop,
    topics: Vec<String>,
}

impl MqttClient {
    /// Create a new MQTT client from configuration.
    pub fn new(config: &MqttConfig, topics: &[&str]) -> Self {
        let mut options =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(30));

        // Set credentials if provided
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, 100);

        Self {
            client,
            event_loop,
            topics: topics.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Queue a SUBSCRIBE for every topic. Returns how many were queued.
    ///
    /// Called from inside the event loop, so it must not wait on the request
    /// channel the loop itself drains.
    fn subscribe_all(&self) -> usize {
        let mut queued = 0;
        for topic in &self.topics {
            match self.client.try_subscribe(topic.as_str(), QoS::AtLeastOnce) {
                Ok(()) => {
                    info!("[MQTT] Subscribing to topic: {}", topic);
                    queued += 1;
                }
                Err(e) => error!("[MQTT] Failed to subscribe to {}: {}", topic, e),
            }
        }
        queued
    }

    fn on_connack(&self, connected: &mut Option<oneshot::Sender<()>>) -> usize {
        info!("[MQTT] Connected to broker");
        let queued = self.subscribe_all();
        if let Some(signal) = connected.take() {
            let _ = signal.send(());
        }
        queued
    }

    /// Run the MQTT event loop and forward messages to the provided channel.
    ///
    /// `connected` fires on the first CONNACK, after the subscriptions are
    /// queued. Runs until the receiving side
    /// of `tx` is dropped.
    pub async fn run(
        mut self,
        tx: mpsc::Sender<MqttMessage>,
        mut connected: Option<oneshot::Sender<()>>,
    ) {
        info!("[MQTT] Starting event loop");

        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    self.on_connack(&mut connected);
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let topic = publish.topic.clone();
                    let payload = match String::from_utf8(publish.payload.to_vec()) {
                        Ok(s) => s,
                        Err(e) => {
                            warn!("[MQTT] Invalid UTF-8 in payload: {}", e);
                            continue;
                        }
                    };

                    debug!("[MQTT] Received on {}: {}", topic, payload);

                    let msg = MqttMessage { topic, payload };
                    if tx.send(msg).await.is_err() {
                        error!("[MQTT] Message channel closed");
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!("[MQTT] Connection error: {:?}", e);
                    // Wait before rumqttc reconnects on the next poll
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    /// Get a clone of the async client for publishing from other tasks.
    pub fn client(&self) -> AsyncClient {
        self.client.clone()
    }
}

/// A node's live bus connection.
pub struct BusConnection {
    pub client: AsyncClient,
    pub messages: mpsc::Receiver<MqttMessage>,
    pub event_loop: JoinHandle<()>,
}

/// Connect to the broker and keep `topics` subscribed across reconnects.
///
/// Failure to connect within [`CONNECT_TIMEOUT`] is returned as an error;
/// nodes treat it as fatal and exit. After that the event loop reconnects on
/// its own and subscribes again on each CONNACK.
pub async fn connect(config: &MqttConfig, topics: &[&str]) -> Result<BusConnection> {
    info!(
        "[MQTT] Connecting to {}:{} as {}",
        config.broker_host, config.broker_port, config.client_id
    );

    let mqtt_client = MqttClient::new(config, topics);
    let client = mqtt_client.client();

    let (msg_tx, msg_rx) = mpsc::channel::<MqttMessage>(64);
    let (connected_tx, connected_rx) = oneshot::channel();

    // Event loop must run for the connection to be established
    let event_loop = tokio::spawn(async move {
        mqtt_client.run(msg_tx, Some(connected_tx)).await;
    });

    match tokio::time::timeout(CONNECT_TIMEOUT, connected_rx).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => {
            event_loop.abort();
            return Err(ClimateError::EventLoopStopped);
        }
        Err(_) => {
            event_loop.abort();
            return Err(ClimateError::BrokerUnreachable(format!(
                "{}:{}",
                config.broker_host, config.broker_port
            )));
        }
    }

    Ok(BusConnection {
        client,
        messages: msg_rx,
        event_loop,
    })
}
