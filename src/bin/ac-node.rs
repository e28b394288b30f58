//! Air conditioner node.
//!
//! Follows the master's commands on its control topic and reports the
//! temperature read from its potentiometer. Type a value in °C on stdin to
//! turn the simulated knob.

use climate_coordinator::config::{Config, load_dotenv};
use climate_coordinator::instance_lock::InstanceLock;
use climate_coordinator::nodes::{AirConditioner, serve};
use log::{error, info};

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    // Environment must be complete before any runtime thread exists
    load_dotenv();
    init_logger();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };
    runtime.block_on(run());
}

async fn run() {
    info!("Starting air conditioner node");

    let _lock = match InstanceLock::acquire("ac") {
        Ok(lock) => lock,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let config = Config::from_env("pico_ac_board");
    if let Err(e) = serve::<AirConditioner>(config).await {
        error!("Air conditioner node failed: {}", e);
        std::process::exit(1);
    }
    info!("Air conditioner node stopped");
}
