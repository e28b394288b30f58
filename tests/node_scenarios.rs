//! Master and actuator nodes wired together through in-memory channels in
//! place of the broker.

use async_trait::async_trait;
use climate_coordinator::bus::{BusMessage, BusPublisher, CommandKind, MqttMessage};
use climate_coordinator::config::MasterConfig;
use climate_coordinator::control::{Edge, ModeArbiter, OperatingMode, Season};
use climate_coordinator::error::Result;
use climate_coordinator::identity::{ConsolePrompt, IdentityResolver, PreferenceStore};
use climate_coordinator::nodes::{ActuatorNode, HeatingSystem, MasterInputs, MasterNode};
use climate_coordinator::sensors::{AnalogInput, IndicatorState, celsius_to_adc};
use parking_lot::Mutex;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

#[derive(Default)]
struct Recording(Mutex<Vec<BusMessage>>);

#[async_trait]
impl BusPublisher for Recording {
    async fn publish(&self, message: BusMessage) -> Result<()> {
        self.0.lock().push(message);
        Ok(())
    }
}

impl Recording {
    fn messages(&self) -> Vec<BusMessage> {
        self.0.lock().clone()
    }

    async fn wait_for(&self, expected: BusMessage) {
        let found = tokio::time::timeout(Duration::from_secs(2), async {
            while !self.messages().contains(&expected) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(
            found.is_ok(),
            "{:?} never published, got {:?}",
            expected,
            self.messages()
        );
    }
}

struct Fixed(u16);

impl AnalogInput for Fixed {
    fn read_u16(&mut self) -> u16 {
        self.0
    }
}

fn master_config(dir: &TempDir) -> MasterConfig {
    MasterConfig {
        preferences_path: dir.path().join("users.json"),
        season: None,
        evaluation_interval: Duration::from_millis(10),
        debounce: Duration::from_millis(200),
        button_hold: Duration::from_millis(0),
        loop_interval: Duration::from_millis(2),
    }
}

fn wire(message: BusMessage) -> MqttMessage {
    MqttMessage {
        topic: message.topic().to_string(),
        payload: message.payload().unwrap(),
    }
}

#[tokio::test]
async fn test_winter_user_heats_until_setpoint() {
    let dir = TempDir::new().unwrap();
    let config = master_config(&dir);
    let store = Arc::new(PreferenceStore::open(config.preferences_path.clone()));
    store.upsert(42, 21.0, 25.0).unwrap();

    let resolver = IdentityResolver::new(store);
    let mut prompt = ConsolePrompt::new(Cursor::new(Vec::new()), Vec::new());
    let user = resolver.scan(42, &mut prompt).unwrap();

    let (bus_tx, bus_rx) = mpsc::channel(16);
    let (user_tx, user_rx) = mpsc::channel(8);
    let (_mode_tx, mode_rx) = mpsc::unbounded_channel();
    let publisher = Arc::new(Recording::default());
    let node = MasterNode::new(Season::Winter, publisher.clone());

    let master = tokio::spawn(async move {
        let inputs = MasterInputs {
            bus: bus_rx,
            users: user_rx,
            modes: mode_rx,
        };
        node.run(inputs, &config).await;
    });

    user_tx.send(user).await.unwrap();
    bus_tx
        .send(wire(BusMessage::RoomTemperature(19.0)))
        .await
        .unwrap();
    publisher
        .wait_for(BusMessage::Command(CommandKind::StartHeating))
        .await;

    bus_tx
        .send(wire(BusMessage::RoomTemperature(22.0)))
        .await
        .unwrap();
    publisher
        .wait_for(BusMessage::Command(CommandKind::StopHeating))
        .await;

    // Closing the bus channel ends the loop
    drop(bus_tx);
    tokio::time::timeout(Duration::from_secs(2), master)
        .await
        .unwrap()
        .unwrap();

    // Heating unit obeys what the master sent
    let mut heating: ActuatorNode<HeatingSystem, _> = ActuatorNode::new(Fixed(0));
    for message in publisher.messages() {
        heating.handle_message(&message);
    }
    assert_eq!(heating.indicator().state(), IndicatorState::Inactive);
    assert!(
        !publisher
            .messages()
            .iter()
            .any(|m| matches!(m, BusMessage::Command(CommandKind::StartCooling))),
        "no cooling commands in winter"
    );
}

#[tokio::test]
async fn test_automatic_mode_without_user_stays_silent() {
    let dir = TempDir::new().unwrap();
    let config = master_config(&dir);

    let (bus_tx, bus_rx) = mpsc::channel(16);
    let (_user_tx, user_rx) = mpsc::channel(8);
    let (_mode_tx, mode_rx) = mpsc::unbounded_channel();
    let publisher = Arc::new(Recording::default());
    let node = MasterNode::new(Season::Summer, publisher.clone());

    let master = tokio::spawn(async move {
        let inputs = MasterInputs {
            bus: bus_rx,
            users: user_rx,
            modes: mode_rx,
        };
        node.run(inputs, &config).await;
    });

    bus_tx
        .send(wire(BusMessage::RoomTemperature(35.0)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(bus_tx);
    master.await.unwrap();

    assert!(publisher.messages().is_empty());
}

#[tokio::test]
async fn test_button_switches_to_heating_knob_setpoint() {
    let dir = TempDir::new().unwrap();
    let config = master_config(&dir);

    let (bus_tx, bus_rx) = mpsc::channel(16);
    let (_user_tx, user_rx) = mpsc::channel(8);
    let (mode_tx, mode_rx) = mpsc::unbounded_channel();
    let arbiter = ModeArbiter::new(config.debounce).with_notifier(mode_tx);
    let publisher = Arc::new(Recording::default());
    let node = MasterNode::new(Season::Summer, publisher.clone());

    let master = tokio::spawn(async move {
        let inputs = MasterInputs {
            bus: bus_rx,
            users: user_rx,
            modes: mode_rx,
        };
        node.run(inputs, &config).await;
    });

    // Press with a bouncy release, then the real release
    assert_eq!(
        arbiter.on_edge_at(Edge::Rising, 1000),
        Some(OperatingMode::Manual)
    );
    assert_eq!(arbiter.on_edge_at(Edge::Falling, 1050), None);
    assert_eq!(arbiter.on_edge_at(Edge::Falling, 1300), None);
    publisher
        .wait_for(BusMessage::ModeChange(OperatingMode::Manual))
        .await;

    // The heating unit picks up the broadcast and starts reporting its knob
    let mut heating: ActuatorNode<HeatingSystem, _> =
        ActuatorNode::new(Fixed(celsius_to_adc(24.0)));
    for message in publisher.messages() {
        heating.handle_message(&message);
    }
    assert_eq!(heating.mode(), OperatingMode::Manual);
    for _ in 0..60 {
        heating.sample();
    }
    let telemetry = heating.telemetry().unwrap();
    let BusMessage::ManualTemperature(setpoint) = telemetry else {
        panic!("expected a manual setpoint, got {:?}", telemetry);
    };
    assert!((setpoint - 24.0).abs() < 0.01, "setpoint {}", setpoint);

    bus_tx.send(wire(telemetry)).await.unwrap();
    bus_tx
        .send(wire(BusMessage::RoomTemperature(26.0)))
        .await
        .unwrap();
    publisher
        .wait_for(BusMessage::Command(CommandKind::StartCooling))
        .await;

    drop(bus_tx);
    master.await.unwrap();
    assert_eq!(
        publisher
            .messages()
            .iter()
            .filter(|m| matches!(m, BusMessage::ModeChange(_)))
            .count(),
        1,
        "bounces must not toggle again"
    );
}
