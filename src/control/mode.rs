//! Operating mode and the debounced mode button.
//!
//! The button edge handler may run from an interrupt-like context (a GPIO
//! callback or the operator console thread) while the master loop is in the
//! middle of an iteration. All arbiter state is therefore kept in atomics, and
//! an accepted toggle is handed to the master loop through an unbounded
//! channel, which never blocks the sender.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use strum::{Display, EnumString};
use tokio::sync::mpsc;

/// Who picks the target temperature.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperatingMode {
    /// Target comes from the identified user's seasonal preference.
    #[default]
    Automatic,
    /// Target comes from the heating node's manual setpoint knob.
    Manual,
}

impl OperatingMode {
    pub fn toggled(self) -> Self {
        match self {
            OperatingMode::Automatic => OperatingMode::Manual,
            OperatingMode::Manual => OperatingMode::Automatic,
        }
    }

    fn encode(self) -> u8 {
        match self {
            OperatingMode::Automatic => 0,
            OperatingMode::Manual => 1,
        }
    }

    fn decode(value: u8) -> Self {
        if value & 1 == 1 {
            OperatingMode::Manual
        } else {
            OperatingMode::Automatic
        }
    }
}

/// Direction of a signal transition on the mode button line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

/// Sentinel for "no edge accepted yet".
const NEVER: u64 = u64::MAX;

/// Whether the arbiter is currently ignoring edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArbiterPhase {
    Idle,
    Debouncing,
}

/// Debounced automatic/manual toggle driven by button edges.
///
/// Every accepted edge is paired: the first one after a mode change flips the
/// mode and sets `pressed`, the next one only clears `pressed`. Edges arriving
/// within the debounce window of the last accepted edge are dropped.
pub struct ModeArbiter {
    mode: AtomicU8,
    pressed: AtomicBool,
    /// Milliseconds since `origin` of the last accepted edge, or [`NEVER`]
    last_accepted_ms: AtomicU64,
    debounce_ms: u64,
    origin: Instant,
    notifier: Option<mpsc::UnboundedSender<OperatingMode>>,
}

impl ModeArbiter {
    /// Create an arbiter in automatic mode.
    pub fn new(debounce: Duration) -> Self {
        Self {
            mode: AtomicU8::new(OperatingMode::Automatic.encode()),
            pressed: AtomicBool::new(false),
            last_accepted_ms: AtomicU64::new(NEVER),
            debounce_ms: debounce.as_millis() as u64,
            origin: Instant::now(),
            notifier: None,
        }
    }

    /// Forward every mode change to the given channel.
    pub fn with_notifier(mut self, tx: mpsc::UnboundedSender<OperatingMode>) -> Self {
        self.notifier = Some(tx);
        self
    }

    pub fn mode(&self) -> OperatingMode {
        OperatingMode::decode(self.mode.load(Ordering::SeqCst))
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed.load(Ordering::SeqCst)
    }

    pub fn phase_at(&self, now_ms: u64) -> ArbiterPhase {
        let last = self.last_accepted_ms.load(Ordering::SeqCst);
        if last == NEVER || now_ms.saturating_sub(last) > self.debounce_ms {
            ArbiterPhase::Idle
        } else {
            ArbiterPhase::Debouncing
        }
    }

    /// Handle an edge at the current time.
    pub fn on_edge(&self, edge: Edge) -> Option<OperatingMode> {
        let now_ms = self.origin.elapsed().as_millis() as u64;
        self.on_edge_at(edge, now_ms)
    }

    /// Handle an edge observed `now_ms` milliseconds after the arbiter was
    /// created. Returns the new mode when this edge toggled it.
    pub fn on_edge_at(&self, edge: Edge, now_ms: u64) -> Option<OperatingMode> {
        if self.phase_at(now_ms) == ArbiterPhase::Debouncing {
            debug!("Mode button {:?} edge at {}ms ignored (bounce)", edge, now_ms);
            return None;
        }
        self.last_accepted_ms.store(now_ms, Ordering::SeqCst);

        if self.pressed.swap(false, Ordering::SeqCst) {
            // Paired release of the edge that last toggled
            debug!("Mode button released at {}ms", now_ms);
            return None;
        }

        let previous = OperatingMode::decode(self.mode.fetch_xor(1, Ordering::SeqCst));
        self.pressed.store(true, Ordering::SeqCst);
        let mode = previous.toggled();
        info!("Mode changed to: {}", mode);

        if let Some(tx) = &self.notifier
            && tx.send(mode).is_err()
        {
            warn!("Mode change channel closed");
        }
        Some(mode)
    }
}
