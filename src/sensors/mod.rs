//! Local hardware on the actuator nodes: the setpoint potentiometer, its
//! smoothing filter, and the indicator lamps.

pub mod analog;
pub mod filter;
pub mod indicator;

pub use analog::{AnalogInput, KnobPosition, SimulatedPotentiometer};
pub use filter::{SignalFilter, adc_to_celsius, celsius_to_adc, map_range};
pub use indicator::{Indicator, IndicatorState};
