//! Analog input abstraction for the setpoint potentiometer.
//!
//! On the bench there is no ADC, so the node binaries read a simulated
//! potentiometer whose position can be moved from the operator console.

use super::filter::{ADC_MAX, celsius_to_adc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

/// A 16-bit analog input. Reading never fails.
pub trait AnalogInput: Send {
    fn read_u16(&mut self) -> u16;
}

/// Shared knob position of a [`SimulatedPotentiometer`].
#[derive(Clone, Debug)]
pub struct KnobPosition(Arc<AtomicU16>);

impl KnobPosition {
    pub fn new(raw: u16) -> Self {
        Self(Arc::new(AtomicU16::new(raw)))
    }

    pub fn get(&self) -> u16 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, raw: u16) {
        self.0.store(raw, Ordering::Relaxed);
    }

    /// Turn the knob to the position that reads as `celsius`.
    pub fn set_celsius(&self, celsius: f64) {
        self.set(celsius_to_adc(celsius));
    }
}

/// Potentiometer with uniform electrical noise around the knob position.
pub struct SimulatedPotentiometer {
    position: KnobPosition,
    noise: u16,
    rng: StdRng,
}

impl SimulatedPotentiometer {
    pub fn new(position: KnobPosition, noise: u16) -> Self {
        Self {
            position,
            noise,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn position(&self) -> &KnobPosition {
        &self.position
    }
}

impl AnalogInput for SimulatedPotentiometer {
    fn read_u16(&mut self) -> u16 {
        let center = i32::from(self.position.get());
        let noise = i32::from(self.noise);
        let jitter = if noise == 0 {
            0
        } else {
            self.rng.gen_range(-noise..=noise)
        };
        (center + jitter).clamp(0, i32::from(ADC_MAX)) as u16
    }
}
