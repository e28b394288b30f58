//! Node runtimes: the master coordinator and the two actuator units.

pub mod actuator;
pub mod master;

pub use actuator::{ActuatorNode, ActuatorRole, AirConditioner, HeatingSystem, serve};
pub use master::{MASTER_SUBSCRIPTIONS, MasterInputs, MasterNode};
