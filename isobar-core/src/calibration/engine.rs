//! Correction formulas
//!
//! Three corrections are applied to every fresh environmental sample:
//!
//! - Temperature: constant additive offset for enclosure self-heating
//! - Pressure: barometric reduction from the sensor altitude to the
//!   reference point, using the already corrected temperature
//! - Humidity: re-expressed against the corrected temperature through the
//!   implied dew point
//!
//! Light is passed through unchanged once it passes the freshness check.

use super::{CalibrationConfig, HumidityPolicy};
use crate::reading::{CorrectedEnvironment, LightSample, RawSample};
use crate::traits::SensorError;

/// Standard gravity (m/s²)
pub const STANDARD_GRAVITY: f32 = 9.80665;

/// Specific gas constant of dry air, rounded (J/(kg·K))
pub const GAS_CONSTANT_DRY_AIR: f32 = 287.0;

/// Smallest pressure-reduction denominator magnitude still accepted
///
/// Anything closer to zero is treated as a degenerate sample.
pub const DENOMINATOR_EPSILON: f32 = 1e-3;

/// Why a sample was thrown away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiscardReason {
    /// Freshness flag not set (register echo of an old measurement)
    Stale,
    /// Raw value or intermediate result was NaN or infinite
    NonFinite,
    /// Pressure reduction denominator too close to zero
    DegenerateDenominator,
    /// Driver failed to produce a sample at all
    Sensor(SensorError),
}

/// Result of correcting one environmental sample
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Correction {
    /// Sample accepted
    Valid(CorrectedEnvironment),
    /// Sample discarded; previous reading must be kept
    Discarded(DiscardReason),
}

impl Correction {
    /// Correct the outcome of a driver read
    pub fn from_read(read: Result<RawSample, SensorError>, config: &CalibrationConfig) -> Self {
        match read {
            Ok(raw) => correct(&raw, config),
            Err(e) => Correction::Discarded(DiscardReason::Sensor(e)),
        }
    }

    /// Check if the sample was accepted
    pub fn is_valid(&self) -> bool {
        matches!(self, Correction::Valid(_))
    }

    /// Get the corrected values, if accepted
    pub fn environment(&self) -> Option<CorrectedEnvironment> {
        match self {
            Correction::Valid(env) => Some(*env),
            Correction::Discarded(_) => None,
        }
    }

    /// Get the discard reason, if discarded
    pub fn discard_reason(&self) -> Option<DiscardReason> {
        match self {
            Correction::Valid(_) => None,
            Correction::Discarded(reason) => Some(*reason),
        }
    }
}

/// Result of validating one light sample
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LightCorrection {
    /// Sample accepted (lux)
    Valid(f32),
    /// Sample discarded; previous lux must be kept
    Discarded(DiscardReason),
}

impl LightCorrection {
    /// Validate the outcome of a driver read
    pub fn from_read(read: Result<LightSample, SensorError>) -> Self {
        match read {
            Ok(sample) => correct_light(&sample),
            Err(e) => LightCorrection::Discarded(DiscardReason::Sensor(e)),
        }
    }

    /// Get the lux value, if accepted
    pub fn lux(&self) -> Option<f32> {
        match self {
            LightCorrection::Valid(lux) => Some(*lux),
            LightCorrection::Discarded(_) => None,
        }
    }
}

/// Correct one environmental sample
///
/// Stale and numerically degenerate samples are discarded; nothing else
/// happens to them.
pub fn correct(raw: &RawSample, config: &CalibrationConfig) -> Correction {
    if !raw.data_valid {
        return Correction::Discarded(DiscardReason::Stale);
    }
    if !raw.is_finite() {
        return Correction::Discarded(DiscardReason::NonFinite);
    }

    let temperature = correct_temperature(raw.temperature, config.temperature_offset);

    let pressure = match reduce_pressure(raw.pressure / 100.0, temperature, config.altitude_m) {
        Ok(p) => p,
        Err(reason) => return Correction::Discarded(reason),
    };

    let humidity = correct_humidity(
        raw.temperature,
        raw.humidity,
        temperature,
        config.humidity_policy,
    );
    if !temperature.is_finite() || !humidity.is_finite() {
        return Correction::Discarded(DiscardReason::NonFinite);
    }

    Correction::Valid(CorrectedEnvironment {
        temperature,
        pressure,
        humidity,
    })
}

/// Validate one light sample
pub fn correct_light(sample: &LightSample) -> LightCorrection {
    if !sample.data_valid {
        return LightCorrection::Discarded(DiscardReason::Stale);
    }
    if !sample.lux.is_finite() {
        return LightCorrection::Discarded(DiscardReason::NonFinite);
    }
    LightCorrection::Valid(sample.lux)
}

/// Apply the additive temperature offset
pub fn correct_temperature(raw_temperature: f32, offset: f32) -> f32 {
    raw_temperature + offset
}

/// Reduce station pressure (hPa) to the reference altitude
///
/// `p + (p · g · h) / (287 · T + h / 400)` with `T` the corrected
/// temperature in °C.
pub fn reduce_pressure(
    pressure_hpa: f32,
    corrected_temperature: f32,
    altitude_m: f32,
) -> Result<f32, DiscardReason> {
    let denominator = GAS_CONSTANT_DRY_AIR * corrected_temperature + altitude_m / 400.0;
    if !denominator.is_finite() {
        return Err(DiscardReason::NonFinite);
    }
    if denominator > -DENOMINATOR_EPSILON && denominator < DENOMINATOR_EPSILON {
        return Err(DiscardReason::DegenerateDenominator);
    }

    let reduced = pressure_hpa + (pressure_hpa * STANDARD_GRAVITY * altitude_m) / denominator;
    if !reduced.is_finite() {
        return Err(DiscardReason::DegenerateDenominator);
    }
    Ok(reduced)
}

/// Dew point implied by the raw temperature and humidity (°C)
pub fn dew_point(raw_temperature: f32, raw_humidity: f32) -> f32 {
    raw_temperature - (100.0 - raw_humidity) / 5.0
}

/// Re-express humidity against the corrected temperature
pub fn correct_humidity(
    raw_temperature: f32,
    raw_humidity: f32,
    corrected_temperature: f32,
    policy: HumidityPolicy,
) -> f32 {
    let dewpoint = dew_point(raw_temperature, raw_humidity);
    let humidity = 100.0 - 5.0 * (corrected_temperature - dewpoint);
    match policy {
        HumidityPolicy::Unclamped => humidity,
        HumidityPolicy::Clamped => humidity.clamp(0.0, 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config() -> CalibrationConfig {
        CalibrationConfig::new(-7.5, 75.0)
    }

    fn close(a: f32, b: f32, tolerance: f32) -> bool {
        a - b < tolerance && b - a < tolerance
    }

    #[test]
    fn test_temperature_offset() {
        let result = correct(&RawSample::new(22.0, 101_325.0, 45.0), &config());
        assert_eq!(result.environment().unwrap().temperature, 14.5);
    }

    #[test]
    fn test_pressure_reduction() {
        let env = correct(&RawSample::new(22.0, 101_325.0, 45.0), &config())
            .environment()
            .unwrap();

        let expected = 1013.25 + (1013.25 * 9.80665 * 75.0) / (287.0 * 14.5 + 75.0 / 400.0);
        assert!(close(env.pressure, expected, 1e-3));
        assert!(close(env.pressure, 1192.32, 0.01));
    }

    #[test]
    fn test_humidity_via_dewpoint() {
        assert_eq!(dew_point(22.0, 45.0), 11.0);

        let env = correct(&RawSample::new(22.0, 101_325.0, 45.0), &config())
            .environment()
            .unwrap();
        assert_eq!(env.humidity, 82.5);
    }

    #[test]
    fn test_humidity_unclamped_by_default() {
        // A large negative offset pushes the result above saturation
        let cfg = CalibrationConfig::new(-20.0, 0.0);
        let env = correct(&RawSample::new(30.0, 100_000.0, 50.0), &cfg)
            .environment()
            .unwrap();
        assert!(env.humidity > 100.0);

        // Very dry air at a positive offset drives it below zero
        let cfg = CalibrationConfig::new(10.0, 0.0);
        let env = correct(&RawSample::new(30.0, 100_000.0, 5.0), &cfg)
            .environment()
            .unwrap();
        assert!(env.humidity < 0.0);
    }

    #[test]
    fn test_humidity_clamped_policy() {
        let cfg = CalibrationConfig {
            humidity_policy: HumidityPolicy::Clamped,
            ..CalibrationConfig::new(10.0, 0.0)
        };
        let env = correct(&RawSample::new(30.0, 100_000.0, 5.0), &cfg)
            .environment()
            .unwrap();
        assert_eq!(env.humidity, 0.0);

        let cfg = CalibrationConfig {
            humidity_policy: HumidityPolicy::Clamped,
            ..CalibrationConfig::new(-20.0, 0.0)
        };
        let env = correct(&RawSample::new(30.0, 100_000.0, 50.0), &cfg)
            .environment()
            .unwrap();
        assert_eq!(env.humidity, 100.0);
    }

    #[test]
    fn test_stale_sample_discarded() {
        let result = correct(&RawSample::stale(22.0, 101_325.0, 45.0), &config());
        assert_eq!(result, Correction::Discarded(DiscardReason::Stale));
    }

    #[test]
    fn test_non_finite_sample_discarded() {
        let result = correct(&RawSample::new(f32::NAN, 101_325.0, 45.0), &config());
        assert_eq!(result, Correction::Discarded(DiscardReason::NonFinite));

        let result = correct(&RawSample::new(22.0, f32::INFINITY, 45.0), &config());
        assert_eq!(result, Correction::Discarded(DiscardReason::NonFinite));
    }

    #[test]
    fn test_degenerate_denominator_discarded() {
        // Corrected temperature of exactly -h / (287 * 400) zeroes the denominator
        let cfg = CalibrationConfig::new(0.0, 0.0);
        let result = correct(&RawSample::new(0.0, 101_325.0, 45.0), &cfg);
        assert_eq!(
            result,
            Correction::Discarded(DiscardReason::DegenerateDenominator)
        );

        let cfg = CalibrationConfig::new(0.0, 114.8);
        let result = correct(&RawSample::new(-0.001, 101_325.0, 45.0), &cfg);
        assert_eq!(
            result,
            Correction::Discarded(DiscardReason::DegenerateDenominator)
        );
    }

    #[test]
    fn test_sensor_error_discarded() {
        let result = Correction::from_read(Err(SensorError::Bus), &config());
        assert_eq!(
            result.discard_reason(),
            Some(DiscardReason::Sensor(SensorError::Bus))
        );
    }

    #[test]
    fn test_light_passthrough() {
        assert_eq!(
            correct_light(&LightSample::new(312.5)),
            LightCorrection::Valid(312.5)
        );
        assert_eq!(
            correct_light(&LightSample::stale(312.5)),
            LightCorrection::Discarded(DiscardReason::Stale)
        );
        assert_eq!(
            correct_light(&LightSample::new(f32::NAN)),
            LightCorrection::Discarded(DiscardReason::NonFinite)
        );
        assert_eq!(
            LightCorrection::from_read(Err(SensorError::Timeout)),
            LightCorrection::Discarded(DiscardReason::Sensor(SensorError::Timeout))
        );
    }

    proptest! {
        #[test]
        fn prop_temperature_is_raw_plus_offset(
            raw in -40.0f32..85.0,
            offset in -15.0f32..15.0,
            pressure in 30_000.0f32..110_000.0,
            humidity in 0.0f32..100.0,
            altitude in 0.0f32..3000.0,
        ) {
            let cfg = CalibrationConfig::new(offset, altitude);
            let result = correct(&RawSample::new(raw, pressure, humidity), &cfg);
            if let Correction::Valid(env) = result {
                prop_assert_eq!(env.temperature, raw + offset);
            } else {
                let denominator = 287.0 * (raw + offset) + altitude / 400.0;
                prop_assert!(close(denominator, 0.0, DENOMINATOR_EPSILON));
            }
        }

        #[test]
        fn prop_stale_always_discarded(
            raw in -40.0f32..85.0,
            pressure in 30_000.0f32..110_000.0,
            humidity in 0.0f32..100.0,
        ) {
            let result = correct(&RawSample::stale(raw, pressure, humidity), &config());
            prop_assert_eq!(result, Correction::Discarded(DiscardReason::Stale));
        }

        #[test]
        fn prop_pressure_monotonic_in_altitude(
            temperature in 1.0f32..45.0,
            pressure_hpa in 300.0f32..1100.0,
            low in 0.0f32..2000.0,
            delta in 1.0f32..1000.0,
        ) {
            let high = low + delta;
            let p_low = reduce_pressure(pressure_hpa, temperature, low).unwrap();
            let p_high = reduce_pressure(pressure_hpa, temperature, high).unwrap();
            prop_assert!(p_low <= p_high);
            prop_assert!(p_low >= pressure_hpa);
        }
    }
}
