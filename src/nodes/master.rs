//! Master node: identity, mode and the comfort controller.
//!
//! The master runs one cooperative loop. Each iteration it drains pending
//! telemetry from the bus, picks up users identified by the card reader and
//! mode changes accepted by the [`ModeArbiter`](crate::control::ModeArbiter),
//! and, when the evaluation period has elapsed, publishes the controller's
//! decision.

use crate::bus::{
    BusMessage, BusPublisher, CommandKind, HEATING_MANUAL_TEMP_TOPIC, MqttMessage,
    ROOM_TEMPERATURE_TOPIC,
};
use crate::config::MasterConfig;
use crate::control::{ComfortController, OperatingMode, Season};
use crate::identity::UserPreference;
use log::{debug, info, warn};
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TryRecvError};

/// Topics the master subscribes to.
pub const MASTER_SUBSCRIPTIONS: &[&str] = &[ROOM_TEMPERATURE_TOPIC, HEATING_MANUAL_TEMP_TOPIC];

/// Asynchronous inputs feeding the master loop.
pub struct MasterInputs {
    pub bus: mpsc::Receiver<MqttMessage>,
    pub users: mpsc::Receiver<UserPreference>,
    pub modes: mpsc::UnboundedReceiver<OperatingMode>,
}

pub struct MasterNode<P> {
    controller: ComfortController,
    publisher: P,
}

impl<P: BusPublisher> MasterNode<P> {
    pub fn new(season: Season, publisher: P) -> Self {
        Self {
            controller: ComfortController::new(season),
            publisher,
        }
    }

    pub fn controller(&self) -> &ComfortController {
        &self.controller
    }

    async fn publish(&self, message: BusMessage) {
        if let Err(e) = self.publisher.publish(message).await {
            warn!("Failed to publish {:?}: {}", message, e);
        }
    }

    /// Broadcast the current mode so the heating node starts in sync.
    pub async fn announce_mode(&self) {
        self.publish(BusMessage::ModeChange(self.controller.state().mode))
            .await;
    }

    /// Decode and apply one raw bus message.
    pub fn on_bus_message(&mut self, msg: &MqttMessage) {
        match BusMessage::decode(&msg.topic, &msg.payload) {
            Some(message) => {
                self.controller.apply(&message);
            }
            None => debug!("Ignoring payload on {}", msg.topic),
        }
    }

    pub fn on_user_identified(&mut self, user: UserPreference) {
        self.controller.identify(user);
    }

    /// Adopt a mode accepted by the button arbiter and broadcast it.
    pub async fn on_mode_change(&mut self, mode: OperatingMode) {
        self.controller.set_mode(mode);
        self.publish(BusMessage::ModeChange(mode)).await;
    }

    /// Run one evaluation cycle and publish its command, if any.
    pub async fn evaluate(&mut self) -> Option<CommandKind> {
        let command = self.controller.evaluate()?;
        debug!(
            "Evaluated {:?} against target {:?}: {}",
            self.controller.state().measured,
            self.controller.target(),
            command
        );
        self.publish(BusMessage::Command(command)).await;
        Some(command)
    }

    /// Run the master loop until the bus channel closes.
    pub async fn run(mut self, mut inputs: MasterInputs, config: &MasterConfig) {
        info!(
            "Master loop started ({} season, evaluating every {:?})",
            self.controller.state().season,
            config.evaluation_interval
        );
        let mut last_evaluation = Instant::now();

        loop {
            let connected = loop {
                match inputs.bus.try_recv() {
                    Ok(msg) => self.on_bus_message(&msg),
                    Err(TryRecvError::Empty) => break true,
                    Err(TryRecvError::Disconnected) => break false,
                }
            };

            while let Ok(user) = inputs.users.try_recv() {
                self.on_user_identified(user);
            }

            while let Ok(mode) = inputs.modes.try_recv() {
                self.on_mode_change(mode).await;
            }

            if last_evaluation.elapsed() >= config.evaluation_interval {
                self.evaluate().await;
                last_evaluation = Instant::now();
            }

            if !connected {
                warn!("Bus message channel closed, stopping master loop");
                break;
            }

            tokio::time::sleep(config.loop_interval).await;
        }
    }
}
