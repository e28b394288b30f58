//! Climate decision logic: season, operating mode and the comfort controller.

pub mod controller;
pub mod mode;
pub mod season;

pub use controller::{ComfortController, ControllerState, decide};
pub use mode::{ArbiterPhase, Edge, ModeArbiter, OperatingMode};
pub use season::Season;
