//! Publish/subscribe bus shared by all nodes.
//!
//! MQTT transport plumbing lives in `client`, the topic table and payload
//! codec in `message`, and the outbound seam used by node logic in
//! `publisher`.

mod client;
mod message;
mod publisher;

pub use client::{BusConnection, CONNECT_TIMEOUT, MqttClient, MqttMessage, connect};
pub use message::{
    AC_CONTROL_TOPIC, BusMessage, CONTROL_MODE_TOPIC, CommandKind, HEATING_CONTROL_TOPIC,
    HEATING_MANUAL_TEMP_TOPIC, ROOM_TEMPERATURE_TOPIC,
};
pub use publisher::{BusPublisher, MqttPublisher};
