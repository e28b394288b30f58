//! Bus topics and the tagged message type decoded at the bus boundary.
//!
//! Every payload on the bus is a flat JSON object. Incoming payloads are
//! decoded exactly once into a [`BusMessage`]; a payload that lacks the field
//! its topic requires decodes to `None` and is dropped by the caller.

use crate::control::OperatingMode;
use log::debug;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub const AC_CONTROL_TOPIC: &str = "ac_control";
pub const HEATING_CONTROL_TOPIC: &str = "heating_control";
pub const ROOM_TEMPERATURE_TOPIC: &str = "room_temperature";
pub const HEATING_MANUAL_TEMP_TOPIC: &str = "heating_manual_temp";
pub const CONTROL_MODE_TOPIC: &str = "control_mode";

/// Actuator instruction. Idempotent: applying one twice has no further effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommandKind {
    StartCooling,
    StopCooling,
    StartHeating,
    StopHeating,
}

impl CommandKind {
    /// Control topic of the node that executes this command.
    pub fn control_topic(self) -> &'static str {
        match self {
            CommandKind::StartCooling | CommandKind::StopCooling => AC_CONTROL_TOPIC,
            CommandKind::StartHeating | CommandKind::StopHeating => HEATING_CONTROL_TOPIC,
        }
    }

    /// Whether the command switches its actuator on.
    pub fn is_start(self) -> bool {
        matches!(self, CommandKind::StartCooling | CommandKind::StartHeating)
    }
}

/// Every message that travels on the bus.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BusMessage {
    /// Measured room temperature in °C from the AC node
    RoomTemperature(f32),
    /// Manual setpoint in °C from the heating node
    ManualTemperature(f32),
    Command(CommandKind),
    ModeChange(OperatingMode),
}

#[derive(Serialize, Deserialize)]
struct CommandPayload {
    command: CommandKind,
}

#[derive(Serialize, Deserialize)]
struct RoomTemperaturePayload {
    room_temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ManualTemperaturePayload {
    manual_temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ModePayload {
    mode: OperatingMode,
}

impl BusMessage {
    /// Topic this message is published on.
    pub fn topic(&self) -> &'static str {
        match self {
            BusMessage::RoomTemperature(_) => ROOM_TEMPERATURE_TOPIC,
            BusMessage::ManualTemperature(_) => HEATING_MANUAL_TEMP_TOPIC,
            BusMessage::Command(kind) => kind.control_topic(),
            BusMessage::ModeChange(_) => CONTROL_MODE_TOPIC,
        }
    }

    /// Decode a payload received on `topic`.
    pub fn decode(topic: &str, payload: &str) -> Option<Self> {
        let decoded = match topic {
            AC_CONTROL_TOPIC | HEATING_CONTROL_TOPIC => {
                serde_json::from_str::<CommandPayload>(payload)
                    .map(|p| BusMessage::Command(p.command))
            }
            ROOM_TEMPERATURE_TOPIC => serde_json::from_str::<RoomTemperaturePayload>(payload)
                .map(|p| BusMessage::RoomTemperature(p.room_temperature)),
            HEATING_MANUAL_TEMP_TOPIC => {
                serde_json::from_str::<ManualTemperaturePayload>(payload)
                    .map(|p| BusMessage::ManualTemperature(p.manual_temperature))
            }
            CONTROL_MODE_TOPIC => {
                serde_json::from_str::<ModePayload>(payload).map(|p| BusMessage::ModeChange(p.mode))
            }
            _ => {
                debug!("[MQTT] No decoder for topic {}", topic);
                return None;
            }
        };

        match decoded {
            Ok(msg) => Some(msg),
            Err(e) => {
                debug!("[MQTT] Dropping malformed payload on {}: {}", topic, e);
                None
            }
        }
    }

    /// Encode the JSON payload for this message.
    pub fn payload(&self) -> serde_json::Result<String> {
        match *self {
            BusMessage::RoomTemperature(room_temperature) => {
                serde_json::to_string(&RoomTemperaturePayload { room_temperature })
            }
            BusMessage::ManualTemperature(manual_temperature) => {
                serde_json::to_string(&ManualTemperaturePayload { manual_temperature })
            }
            BusMessage::Command(command) => serde_json::to_string(&CommandPayload { command }),
            BusMessage::ModeChange(mode) => serde_json::to_string(&ModePayload { mode }),
        }
    }
}
