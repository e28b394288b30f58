//! Two-stage smoothing of the setpoint potentiometer.
//!
//! Stage one is a moving average over the last [`SAMPLE_WINDOW`] raw ADC
//! readings; stage two is an exponential moving average of that mean. The
//! window starts zero-filled, so the first readings after boot are biased low
//! until it fills.

/// Number of raw samples in the moving-average window.
pub const SAMPLE_WINDOW: usize = 10;
/// Weight of the newest mean in the exponential moving average.
pub const SMOOTHING_ALPHA: f64 = 0.3;

/// Full-scale reading of the 16-bit ADC.
pub const ADC_MAX: u16 = 65535;
/// Temperature at ADC zero (°C)
pub const MIN_CELSIUS: f64 = 15.0;
/// Temperature at ADC full scale (°C)
pub const MAX_CELSIUS: f64 = 40.0;

#[derive(Clone, Debug)]
pub struct SignalFilter {
    buffer: [u16; SAMPLE_WINDOW],
    index: usize,
    ema: f64,
}

impl Default for SignalFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalFilter {
    pub fn new() -> Self {
        Self {
            buffer: [0; SAMPLE_WINDOW],
            index: 0,
            ema: 0.0,
        }
    }

    /// Feed one raw reading and return the updated smoothed value (raw units).
    pub fn sample(&mut self, raw: u16) -> f64 {
        self.buffer[self.index] = raw;
        self.index = (self.index + 1) % SAMPLE_WINDOW;

        let mean = self.mean();
        self.ema = SMOOTHING_ALPHA * mean + (1.0 - SMOOTHING_ALPHA) * self.ema;
        self.ema
    }

    /// Arithmetic mean of the whole window, empty slots included.
    pub fn mean(&self) -> f64 {
        let sum: u32 = self.buffer.iter().map(|&v| u32::from(v)).sum();
        f64::from(sum) / SAMPLE_WINDOW as f64
    }

    /// Last smoothed value.
    pub fn value(&self) -> f64 {
        self.ema
    }
}

/// Linearly map `value` from `[from_low, from_high]` onto `[to_low, to_high]`.
///
/// The input range must not be empty.
pub fn map_range(value: f64, from_low: f64, from_high: f64, to_low: f64, to_high: f64) -> f64 {
    to_low + ((value - from_low) / (from_high - from_low)) * (to_high - to_low)
}

/// Convert a smoothed ADC value to degrees Celsius.
pub fn adc_to_celsius(value: f64) -> f64 {
    map_range(value, 0.0, f64::from(ADC_MAX), MIN_CELSIUS, MAX_CELSIUS)
}

/// Raw ADC reading that maps to `celsius`, clamped to the ADC range.
pub fn celsius_to_adc(celsius: f64) -> u16 {
    let raw = map_range(celsius, MIN_CELSIUS, MAX_CELSIUS, 0.0, f64::from(ADC_MAX));
    raw.round().clamp(0.0, f64::from(ADC_MAX)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_range_endpoints() {
        assert_eq!(adc_to_celsius(0.0), 15.0);
        assert_eq!(adc_to_celsius(65535.0), 40.0);
        assert!((adc_to_celsius(32767.5) - 27.5).abs() < 1e-9);
    }

    #[test]
    fn test_celsius_to_adc_inverts_and_clamps() {
        assert_eq!(celsius_to_adc(15.0), 0);
        assert_eq!(celsius_to_adc(40.0), ADC_MAX);
        assert_eq!(celsius_to_adc(-5.0), 0);
        assert_eq!(celsius_to_adc(80.0), ADC_MAX);
        assert!((adc_to_celsius(f64::from(celsius_to_adc(22.0))) - 22.0).abs() < 0.001);
    }

    #[test]
    fn test_startup_transient_is_biased_low() {
        let mut filter = SignalFilter::new();
        let first = filter.sample(10_000);
        // mean of one sample in a zeroed window of ten, weighted by alpha
        assert!((first - 0.3 * 1_000.0).abs() < 1e-9);
        assert!(first < 10_000.0);
    }

    #[test]
    fn test_full_window_mean_equals_constant_input() {
        let mut filter = SignalFilter::new();
        for _ in 0..SAMPLE_WINDOW {
            filter.sample(40_000);
        }
        assert_eq!(filter.mean(), 40_000.0);
    }

    #[test]
    fn test_window_drops_oldest_sample() {
        let mut filter = SignalFilter::new();
        for _ in 0..SAMPLE_WINDOW {
            filter.sample(1_000);
        }
        filter.sample(11_000);
        assert_eq!(filter.mean(), 2_000.0);
    }

    #[test]
    fn test_converges_monotonically() {
        let mut filter = SignalFilter::new();
        let mut previous = filter.value();
        for _ in 0..100 {
            let next = filter.sample(50_000);
            assert!(next >= previous);
            assert!(next <= 50_000.0);
            previous = next;
        }
        assert!((previous - 50_000.0).abs() < 1.0);
    }
}
