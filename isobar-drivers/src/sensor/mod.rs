//! Sensor drivers

pub mod bme68x;
pub mod ltr559;

#[cfg(test)]
pub(crate) mod fake;

pub use bme68x::{Bme68x, Bme68xConfig, Oversampling};
pub use ltr559::{AlsGain, Ltr559};

use isobar_core::traits::SensorError;

/// Map any bus error onto the sensor error
pub(crate) fn bus_error<E>(_: E) -> SensorError {
    SensorError::Bus
}
