//! Stand-ins for the node hardware inputs.

pub mod console;

pub use console::{
    MasterCommand, parse_master_command, run_actuator_console, run_master_console,
    spawn_actuator_console, spawn_master_console,
};
