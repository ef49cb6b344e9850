//! Sample and reading types
//!
//! Raw samples come straight from the sensor drivers and are thrown away
//! once processed. The corrected reading is what the rest of the node sees.

/// One environmental sample as reported by the sensor driver
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// Uncorrected temperature (°C)
    pub temperature: f32,
    /// Pressure (Pa)
    pub pressure: f32,
    /// Uncorrected relative humidity (%RH)
    pub humidity: f32,
    /// Sensor reported new data since the last read
    pub data_valid: bool,
}

impl RawSample {
    /// Create a fresh sample
    pub const fn new(temperature: f32, pressure: f32, humidity: f32) -> Self {
        Self {
            temperature,
            pressure,
            humidity,
            data_valid: true,
        }
    }

    /// Create a sample whose freshness flag is not set
    pub const fn stale(temperature: f32, pressure: f32, humidity: f32) -> Self {
        Self {
            temperature,
            pressure,
            humidity,
            data_valid: false,
        }
    }

    /// Check that every channel holds a finite number
    pub fn is_finite(&self) -> bool {
        self.temperature.is_finite() && self.pressure.is_finite() && self.humidity.is_finite()
    }
}

/// One light sample as reported by the light sensor driver
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LightSample {
    /// Illuminance (lux), already converted by the driver
    pub lux: f32,
    /// Sensor reported new data since the last read
    pub data_valid: bool,
}

impl LightSample {
    /// Create a fresh light sample
    pub const fn new(lux: f32) -> Self {
        Self {
            lux,
            data_valid: true,
        }
    }

    /// Create a light sample whose freshness flag is not set
    pub const fn stale(lux: f32) -> Self {
        Self {
            lux,
            data_valid: false,
        }
    }
}

/// Environmental channels after calibration
///
/// Produced by the calibration engine as one unit so the three values
/// always come from the same raw sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CorrectedEnvironment {
    /// Temperature (°C)
    pub temperature: f32,
    /// Pressure reduced to the reference altitude (hPa)
    pub pressure: f32,
    /// Relative humidity (%RH)
    pub humidity: f32,
}

/// The canonical reading set shown on the display and published
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CorrectedReading {
    /// Temperature (°C)
    pub temperature: f32,
    /// Pressure (hPa)
    pub pressure: f32,
    /// Relative humidity (%RH)
    pub humidity: f32,
    /// Illuminance (lux)
    pub lux: f32,
}

impl CorrectedReading {
    /// The zeroed reading the node starts with
    pub const fn zeroed() -> Self {
        Self {
            temperature: 0.0,
            pressure: 0.0,
            humidity: 0.0,
            lux: 0.0,
        }
    }

    /// Return a copy with the environmental channels replaced
    pub const fn with_environment(self, env: CorrectedEnvironment) -> Self {
        Self {
            temperature: env.temperature,
            pressure: env.pressure,
            humidity: env.humidity,
            lux: self.lux,
        }
    }

    /// Return a copy with the light channel replaced
    pub const fn with_lux(self, lux: f32) -> Self {
        Self { lux, ..self }
    }
}
