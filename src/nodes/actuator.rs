//! Actuator node shared by the air-conditioning and heating units.
//!
//! Both units run the same cooperative loop: apply pending bus commands to the
//! indicator lamps, sample the setpoint potentiometer through the
//! [`SignalFilter`], and publish telemetry on a fixed period. What differs is
//! captured by [`ActuatorRole`]: which commands the unit obeys, whether it
//! follows the master's operating mode, and what telemetry it reports.

use crate::bus::{
    AC_CONTROL_TOPIC, BusMessage, BusPublisher, CONTROL_MODE_TOPIC, CommandKind,
    HEATING_CONTROL_TOPIC, MqttMessage, MqttPublisher,
};
use crate::config::{ActuatorConfig, Config};
use crate::control::OperatingMode;
use crate::error::Result;
use crate::input::console;
use crate::sensors::{
    AnalogInput, Indicator, IndicatorState, KnobPosition, SignalFilter, SimulatedPotentiometer,
    adc_to_celsius, celsius_to_adc,
};
use log::{debug, info, warn};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TryRecvError};

/// Amplitude of the simulated potentiometer noise in raw ADC units.
const SIMULATED_NOISE: u16 = 300;

/// Per-unit behaviour of an [`ActuatorNode`].
pub trait ActuatorRole: Send + Sync + 'static {
    /// Short name used in logs and the instance lock
    const NAME: &'static str;
    const START: CommandKind;
    const STOP: CommandKind;
    /// Whether the unit tracks `control_mode` broadcasts
    const FOLLOWS_MODE: bool;
    /// Knob position at startup (°C)
    const INITIAL_KNOB_CELSIUS: f64;
    /// What the published reading means, for logs
    const TELEMETRY_LABEL: &'static str;

    fn subscriptions() -> &'static [&'static str];

    /// Telemetry for the latest filtered reading, if any is due in `mode`.
    fn telemetry(celsius: f32, mode: OperatingMode) -> Option<BusMessage>;
}

/// Air-conditioning unit: its knob stands in for the room thermometer.
pub struct AirConditioner;

impl ActuatorRole for AirConditioner {
    const NAME: &'static str = "AC";
    const START: CommandKind = CommandKind::StartCooling;
    const STOP: CommandKind = CommandKind::StopCooling;
    const FOLLOWS_MODE: bool = false;
    const INITIAL_KNOB_CELSIUS: f64 = 25.0;
    const TELEMETRY_LABEL: &'static str = "Room temperature";

    fn subscriptions() -> &'static [&'static str] {
        &[AC_CONTROL_TOPIC]
    }

    fn telemetry(celsius: f32, _mode: OperatingMode) -> Option<BusMessage> {
        Some(BusMessage::RoomTemperature(celsius))
    }
}

/// Heating unit: its knob is the manual setpoint, reported only in manual mode.
pub struct HeatingSystem;

impl ActuatorRole for HeatingSystem {
    const NAME: &'static str = "Heating";
    const START: CommandKind = CommandKind::StartHeating;
    const STOP: CommandKind = CommandKind::StopHeating;
    const FOLLOWS_MODE: bool = true;
    const INITIAL_KNOB_CELSIUS: f64 = 22.0;
    const TELEMETRY_LABEL: &'static str = "Set temperature";

    fn subscriptions() -> &'static [&'static str] {
        &[HEATING_CONTROL_TOPIC, CONTROL_MODE_TOPIC]
    }

    fn telemetry(celsius: f32, mode: OperatingMode) -> Option<BusMessage> {
        match mode {
            OperatingMode::Manual => Some(BusMessage::ManualTemperature(celsius)),
            OperatingMode::Automatic => None,
        }
    }
}

pub struct ActuatorNode<R, A> {
    input: A,
    filter: SignalFilter,
    indicator: Arc<Indicator>,
    mode: OperatingMode,
    reading: f32,
    role: PhantomData<R>,
}

impl<R: ActuatorRole, A: AnalogInput> ActuatorNode<R, A> {
    pub fn new(input: A) -> Self {
        Self {
            input,
            filter: SignalFilter::new(),
            indicator: Arc::new(Indicator::new(R::NAME)),
            mode: OperatingMode::Automatic,
            reading: adc_to_celsius(0.0) as f32,
            role: PhantomData,
        }
    }

    pub fn indicator(&self) -> &Arc<Indicator> {
        &self.indicator
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Latest filtered reading in °C.
    pub fn reading(&self) -> f32 {
        self.reading
    }

    /// Apply one decoded bus message. Returns `false` if it was not meant
    /// for this unit.
    pub fn handle_message(&mut self, message: &BusMessage) -> bool {
        match *message {
            BusMessage::Command(kind) if kind == R::START => {
                self.indicator.set(IndicatorState::Active);
                true
            }
            BusMessage::Command(kind) if kind == R::STOP => {
                self.indicator.set(IndicatorState::Inactive);
                true
            }
            BusMessage::ModeChange(mode) if R::FOLLOWS_MODE => {
                if mode != self.mode {
                    info!("[{}] Mode is now {}", R::NAME, mode);
                }
                self.mode = mode;
                true
            }
            _ => {
                debug!("[{}] Ignoring {:?}", R::NAME, message);
                false
            }
        }
    }

    /// Read the potentiometer once and update the filtered reading.
    pub fn sample(&mut self) -> f32 {
        let raw = self.input.read_u16();
        let smoothed = self.filter.sample(raw);
        self.reading = adc_to_celsius(smoothed) as f32;
        self.reading
    }

    pub fn telemetry(&self) -> Option<BusMessage> {
        R::telemetry(self.reading, self.mode)
    }

    /// Handle everything already queued without waiting. Returns `false` once
    /// the bus side has gone away.
    fn drain(&mut self, messages: &mut mpsc::Receiver<MqttMessage>) -> bool {
        loop {
            match messages.try_recv() {
                Ok(msg) => {
                    if let Some(decoded) = BusMessage::decode(&msg.topic, &msg.payload) {
                        self.handle_message(&decoded);
                    }
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// Run the node loop until the bus channel closes.
    pub async fn run<P: BusPublisher>(
        mut self,
        publisher: P,
        mut messages: mpsc::Receiver<MqttMessage>,
        config: &ActuatorConfig,
    ) {
        info!(
            "[{}] Node loop started (telemetry every {:?})",
            R::NAME,
            config.publish_interval
        );
        let mut last_publish = Instant::now();

        loop {
            let connected = self.drain(&mut messages);

            let celsius = self.sample();

            if last_publish.elapsed() >= config.publish_interval {
                if let Some(telemetry) = self.telemetry() {
                    match publisher.publish(telemetry).await {
                        Ok(()) => info!(
                            "[{}] {}: {:.2} °C",
                            R::NAME,
                            R::TELEMETRY_LABEL,
                            celsius
                        ),
                        Err(e) => warn!("[{}] Failed to publish telemetry: {}", R::NAME, e),
                    }
                }
                last_publish = Instant::now();
            }

            if !connected {
                warn!("[{}] Bus message channel closed, stopping", R::NAME);
                break;
            }

            tokio::time::sleep(config.loop_interval).await;
        }
    }
}

/// Run an actuator node against the configured broker until the bus closes.
///
/// The potentiometer is simulated and can be turned from stdin by typing a
/// temperature in °C.
pub async fn serve<R: ActuatorRole>(config: Config) -> Result<()> {
    let bus = crate::bus::connect(&config.mqtt, R::subscriptions()).await?;

    let knob = KnobPosition::new(celsius_to_adc(R::INITIAL_KNOB_CELSIUS));
    let console = console::spawn_actuator_console(R::NAME, knob.clone());
    if let Err(e) = &console {
        warn!("[{}] Console unavailable: {}", R::NAME, e);
    }

    let node: ActuatorNode<R, _> =
        ActuatorNode::new(SimulatedPotentiometer::new(knob, SIMULATED_NOISE));
    node.run(
        MqttPublisher::new(bus.client.clone()),
        bus.messages,
        &config.actuator,
    )
    .await;

    bus.event_loop.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    struct Fixed(u16);

    impl AnalogInput for Fixed {
        fn read_u16(&mut self) -> u16 {
            self.0
        }
    }

    #[derive(Default)]
    struct Recording(Mutex<Vec<BusMessage>>);

    #[async_trait]
    impl BusPublisher for Recording {
        async fn publish(&self, message: BusMessage) -> Result<()> {
            self.0.lock().push(message);
            Ok(())
        }
    }

    fn mqtt(topic: &str, payload: &str) -> MqttMessage {
        MqttMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
        }
    }

    #[test]
    fn test_ac_commands_drive_indicator() {
        let mut node: ActuatorNode<AirConditioner, _> = ActuatorNode::new(Fixed(0));
        assert!(node.handle_message(&BusMessage::Command(CommandKind::StartCooling)));
        assert_eq!(node.indicator().state(), IndicatorState::Active);
        assert!(node.handle_message(&BusMessage::Command(CommandKind::StartCooling)));
        assert_eq!(node.indicator().version(), 1, "repeat start is a no-op");
        assert!(node.handle_message(&BusMessage::Command(CommandKind::StopCooling)));
        assert_eq!(node.indicator().state(), IndicatorState::Inactive);
    }

    #[test]
    fn test_ac_ignores_heating_commands_and_mode() {
        let mut node: ActuatorNode<AirConditioner, _> = ActuatorNode::new(Fixed(0));
        assert!(!node.handle_message(&BusMessage::Command(CommandKind::StartHeating)));
        assert!(!node.handle_message(&BusMessage::ModeChange(OperatingMode::Manual)));
        assert_eq!(node.indicator().state(), IndicatorState::Inactive);
        assert_eq!(node.mode(), OperatingMode::Automatic);
    }

    #[test]
    fn test_ac_always_reports_room_temperature() {
        let mut node: ActuatorNode<AirConditioner, _> = ActuatorNode::new(Fixed(65535));
        let celsius = node.sample();
        assert!(celsius > 15.0 && celsius < 40.0);
        assert_eq!(node.telemetry(), Some(BusMessage::RoomTemperature(celsius)));
    }

    #[test]
    fn test_telemetry_labels_match_reading() {
        assert_eq!(AirConditioner::TELEMETRY_LABEL, "Room temperature");
        assert_eq!(HeatingSystem::TELEMETRY_LABEL, "Set temperature");
    }

    #[test]
    fn test_heating_reports_only_in_manual_mode() {
        let mut node: ActuatorNode<HeatingSystem, _> = ActuatorNode::new(Fixed(32768));
        node.sample();
        assert_eq!(node.telemetry(), None);

        assert!(node.handle_message(&BusMessage::ModeChange(OperatingMode::Manual)));
        assert_eq!(
            node.telemetry(),
            Some(BusMessage::ManualTemperature(node.reading()))
        );

        node.handle_message(&BusMessage::ModeChange(OperatingMode::Automatic));
        assert_eq!(node.telemetry(), None);
    }

    #[test]
    fn test_reading_settles_on_knob_position() {
        let mut node: ActuatorNode<AirConditioner, _> =
            ActuatorNode::new(Fixed(celsius_to_adc(24.0)));
        for _ in 0..200 {
            node.sample();
        }
        assert!((node.reading() - 24.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_run_applies_queued_commands_and_publishes() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(mqtt("heating_control", r#"{"command":"start_heating"}"#))
            .await
            .unwrap();
        tx.send(mqtt("control_mode", r#"{"mode":"manual"}"#))
            .await
            .unwrap();
        tx.send(mqtt("heating_control", r#"{"broken":true}"#))
            .await
            .unwrap();
        drop(tx);

        let node: ActuatorNode<HeatingSystem, _> = ActuatorNode::new(Fixed(0));
        let indicator = node.indicator().clone();
        let publisher = Arc::new(Recording::default());
        let config = ActuatorConfig {
            publish_interval: Duration::ZERO,
            loop_interval: Duration::from_millis(1),
        };

        node.run(publisher.clone(), rx, &config).await;

        assert_eq!(indicator.state(), IndicatorState::Active);
        let published = publisher.0.lock().clone();
        assert_eq!(published.len(), 1);
        assert!(matches!(published[0], BusMessage::ManualTemperature(_)));
    }
}
