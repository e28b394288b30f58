//! Outbound side of the bus.

use super::message::BusMessage;
use crate::error::Result;
use async_trait::async_trait;
use log::debug;
use rumqttc::{AsyncClient, QoS};
use std::sync::Arc;

/// Anything that can put a [`BusMessage`] on the bus.
#[async_trait]
pub trait BusPublisher: Send + Sync {
    async fn publish(&self, message: BusMessage) -> Result<()>;
}

#[async_trait]
impl<T: BusPublisher + ?Sized> BusPublisher for Arc<T> {
    async fn publish(&self, message: BusMessage) -> Result<()> {
        self.as_ref().publish(message).await
    }
}

/// Publishes through a connected rumqttc client.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BusPublisher for MqttPublisher {
    async fn publish(&self, message: BusMessage) -> Result<()> {
        let topic = message.topic();
        let payload = message.payload()?;
        debug!("[MQTT] Publishing to {}: {}", topic, payload);
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload.into_bytes())
            .await?;
        Ok(())
    }
}
