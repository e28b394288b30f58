//! Two-state actuator indicator.
//!
//! Each actuator node drives a pair of lamps: the active lamp is lit while the
//! actuator runs and the inactive lamp otherwise. The pair is modelled as one
//! flag so the two lamps can never be lit together.

use log::info;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Which lamp of the pair is lit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndicatorState {
    Active,
    Inactive,
}

/// Thread-safe indicator state.
///
/// The version is incremented each time the lit lamp changes; setting the
/// same state again is a no-op.
pub struct Indicator {
    label: &'static str,
    active: AtomicBool,
    version: AtomicU32,
}

impl Indicator {
    /// Create an indicator showing the inactive lamp.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            active: AtomicBool::new(false),
            version: AtomicU32::new(0),
        }
    }

    pub fn state(&self) -> IndicatorState {
        if self.active.load(Ordering::SeqCst) {
            IndicatorState::Active
        } else {
            IndicatorState::Inactive
        }
    }

    /// Light one lamp and switch off the other. Returns `true` if the lit
    /// lamp changed.
    pub fn set(&self, state: IndicatorState) -> bool {
        let active = state == IndicatorState::Active;
        let old = self.active.swap(active, Ordering::SeqCst);
        if old == active {
            return false;
        }
        self.version.fetch_add(1, Ordering::SeqCst);
        if active {
            info!("[{}] active lamp on, inactive lamp off", self.label);
        } else {
            info!("[{}] inactive lamp on, active lamp off", self.label);
        }
        true
    }

    pub fn version(&self) -> u32 {
        self.version.load(Ordering::SeqCst)
    }
}
