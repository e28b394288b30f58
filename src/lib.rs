//! Climate coordinator library.
//!
//! Three cooperating nodes share one MQTT bus: a master that identifies
//! occupants by card and decides what the room needs, an air conditioner and
//! a heating system that act on its commands and report temperatures back.

pub mod bus;
pub mod config;
pub mod control;
pub mod error;
pub mod identity;
pub mod input;
pub mod instance_lock;
pub mod nodes;
pub mod sensors;
