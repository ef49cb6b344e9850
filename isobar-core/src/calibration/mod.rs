//! Calibration engine
//!
//! Pure functions mapping raw sensor samples to corrected physical values.
//! A sample is either turned into a corrected value or discarded with a
//! reason; discarding is normal steady-state behaviour, not an error.

pub mod engine;

pub use engine::{
    correct, correct_light, Correction, DiscardReason, LightCorrection, DENOMINATOR_EPSILON,
    GAS_CONSTANT_DRY_AIR, STANDARD_GRAVITY,
};

/// Default temperature offset (°C)
///
/// Compensates the self-heating of a USB-powered enclosure.
pub const DEFAULT_TEMPERATURE_OFFSET: f32 = -7.5;

/// Default sensor altitude above the reference point (m)
pub const DEFAULT_ALTITUDE_M: f32 = 75.0;

/// How the corrected humidity is bounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HumidityPolicy {
    /// Report the formula result as-is, even outside 0-100 %
    #[default]
    Unclamped,
    /// Clamp the result to 0-100 %
    Clamped,
}

/// Calibration constants, fixed for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationConfig {
    /// Additive temperature correction (°C)
    pub temperature_offset: f32,
    /// Sensor altitude above the reference point (m)
    pub altitude_m: f32,
    /// Humidity bounding policy
    pub humidity_policy: HumidityPolicy,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            temperature_offset: DEFAULT_TEMPERATURE_OFFSET,
            altitude_m: DEFAULT_ALTITUDE_M,
            humidity_policy: HumidityPolicy::Unclamped,
        }
    }
}

impl CalibrationConfig {
    /// Create a calibration with the default humidity policy
    pub const fn new(temperature_offset: f32, altitude_m: f32) -> Self {
        Self {
            temperature_offset,
            altitude_m,
            humidity_policy: HumidityPolicy::Unclamped,
        }
    }

    /// Check that the constants are usable
    pub fn is_valid(&self) -> bool {
        self.temperature_offset.is_finite() && self.altitude_m.is_finite()
    }
}
