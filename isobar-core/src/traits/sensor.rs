//! Sensor traits

use crate::reading::{LightSample, RawSample};

/// Errors that can occur while talking to a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Bus transaction failed (NACK, arbitration loss)
    Bus,
    /// Device answered with an unexpected chip id
    WrongChipId(u8),
    /// Measurement did not complete in time
    Timeout,
    /// Sensor reported an internal error state
    Fault,
}

/// Trait for the combined temperature / pressure / humidity sensor
///
/// Implementations return whatever the device reports, including samples
/// whose freshness flag is clear. Deciding what to do with those is the
/// calibration engine's job.
pub trait EnvironmentSensor {
    /// Take one sample
    ///
    /// May block for the duration of a single measurement but never longer.
    fn read_raw(&mut self) -> Result<RawSample, SensorError>;
}

/// Trait for the ambient light sensor
pub trait LightSensor {
    /// Read the latest illuminance value
    fn read_light(&mut self) -> Result<LightSample, SensorError>;
}

impl<T: EnvironmentSensor + ?Sized> EnvironmentSensor for &mut T {
    fn read_raw(&mut self) -> Result<RawSample, SensorError> {
        (**self).read_raw()
    }
}

impl<T: LightSensor + ?Sized> LightSensor for &mut T {
    fn read_light(&mut self) -> Result<LightSample, SensorError> {
        (**self).read_light()
    }
}
