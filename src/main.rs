use climate_coordinator::bus::{self, MqttPublisher};
use climate_coordinator::config::{Config, load_dotenv};
use climate_coordinator::control::ModeArbiter;
use climate_coordinator::identity::{IdentityResolver, PreferenceStore};
use climate_coordinator::input::spawn_master_console;
use climate_coordinator::instance_lock::InstanceLock;
use climate_coordinator::nodes::{MASTER_SUBSCRIPTIONS, MasterInputs, MasterNode};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;

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
    info!("Starting climate master");

    let _lock = match InstanceLock::acquire("master") {
        Ok(lock) => lock,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let config = Config::from_env("pico_master_board");
    let season = config.season();
    info!("Configuration loaded:");
    info!(
        "  Broker: {}:{}",
        config.mqtt.broker_host, config.mqtt.broker_port
    );
    info!("  Preferences: {}", config.master.preferences_path.display());
    info!("  Season: {}", season);

    let store = Arc::new(PreferenceStore::open(
        config.master.preferences_path.clone(),
    ));
    info!("  Known cards: {}", store.table().len());

    let bus = match bus::connect(&config.mqtt, MASTER_SUBSCRIPTIONS).await {
        Ok(bus) => bus,
        Err(e) => {
            error!("Failed to connect to MQTT broker: {}", e);
            std::process::exit(1);
        }
    };
    info!("Connected to MQTT broker");

    let (mode_tx, mode_rx) = mpsc::unbounded_channel();
    let (user_tx, user_rx) = mpsc::channel(8);
    let arbiter = Arc::new(ModeArbiter::new(config.master.debounce).with_notifier(mode_tx));

    if let Err(e) = spawn_master_console(
        IdentityResolver::new(store),
        arbiter,
        user_tx,
        config.master.button_hold,
    ) {
        warn!("Console unavailable, no cards can be scanned: {}", e);
    }

    let node = MasterNode::new(season, MqttPublisher::new(bus.client.clone()));
    node.announce_mode().await;

    let inputs = MasterInputs {
        bus: bus.messages,
        users: user_rx,
        modes: mode_rx,
    };

    tokio::select! {
        _ = node.run(inputs, &config.master) => {
            warn!("Master loop ended");
        }
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        },
    }

    bus.event_loop.abort();
    info!("Climate master stopped");
}
