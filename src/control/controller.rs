//! Hysteretic setpoint evaluation on the master node.
//!
//! The controller is evaluated on a timer rather than on message arrival, so
//! a lost telemetry message only delays a decision. Every evaluation that
//! produces a decision re-issues its command even if nothing changed; the
//! actuators treat repeated commands as no-ops.

use super::mode::OperatingMode;
use super::season::Season;
use crate::bus::{BusMessage, CommandKind};
use crate::identity::UserPreference;
use log::{debug, info};

/// Everything the controller decides from.
#[derive(Clone, Debug, PartialEq)]
pub struct ControllerState {
    pub mode: OperatingMode,
    pub season: Season,
    /// Last identified user. Only a new successful scan replaces it.
    pub active_user: Option<UserPreference>,
    /// Last room temperature from the AC node
    pub measured: Option<f32>,
    /// Last manual setpoint from the heating node
    pub manual_setpoint: Option<f32>,
}

impl ControllerState {
    pub fn new(season: Season) -> Self {
        Self {
            mode: OperatingMode::Automatic,
            season,
            active_user: None,
            measured: None,
            manual_setpoint: None,
        }
    }
}

/// Start/stop decision for the given season.
///
/// Summer cools while `measured > target`; winter heats while
/// `measured < target`. Equality stops the actuator.
pub fn decide(season: Season, measured: f32, target: f32) -> CommandKind {
    match season {
        Season::Summer if measured > target => CommandKind::StartCooling,
        Season::Summer => CommandKind::StopCooling,
        Season::Winter if measured < target => CommandKind::StartHeating,
        Season::Winter => CommandKind::StopHeating,
    }
}

pub struct ComfortController {
    state: ControllerState,
}

impl ComfortController {
    pub fn new(season: Season) -> Self {
        Self {
            state: ControllerState::new(season),
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn set_mode(&mut self, mode: OperatingMode) {
        self.state.mode = mode;
    }

    pub fn identify(&mut self, user: UserPreference) {
        info!(
            "Active user {} ({} setpoint {:.1}°C)",
            user.card_id,
            self.state.season,
            user.setpoint_for(self.state.season)
        );
        self.state.active_user = Some(user);
    }

    /// Fold a telemetry message into the state. Returns `false` for messages
    /// the controller does not consume.
    pub fn apply(&mut self, message: &BusMessage) -> bool {
        match *message {
            BusMessage::RoomTemperature(celsius) => {
                debug!("Room temperature {:.2}°C", celsius);
                self.state.measured = Some(celsius);
                true
            }
            BusMessage::ManualTemperature(celsius) => {
                debug!("Manual setpoint {:.2}°C", celsius);
                self.state.manual_setpoint = Some(celsius);
                true
            }
            BusMessage::Command(_) | BusMessage::ModeChange(_) => false,
        }
    }

    /// Setpoint in force, if any.
    pub fn target(&self) -> Option<f32> {
        match self.state.mode {
            OperatingMode::Manual => self.state.manual_setpoint,
            OperatingMode::Automatic => self
                .state
                .active_user
                .map(|user| user.setpoint_for(self.state.season)),
        }
    }

    /// One evaluation cycle.
    ///
    /// Nothing is decided while no user is active in automatic mode, or while
    /// the inputs the decision needs have not arrived yet.
    pub fn evaluate(&self) -> Option<CommandKind> {
        let target = self.target()?;
        let measured = self.state.measured?;
        Some(decide(self.state.season, measured, target))
    }
}
