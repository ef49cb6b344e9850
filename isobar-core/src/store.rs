//! Reading store
//!
//! Holds the canonical last-valid reading set. The store is written only by
//! the control loop, and every write replaces the whole reading in one
//! assignment, so a reader never sees a half-updated set.

use crate::calibration::{Correction, LightCorrection};
use crate::reading::CorrectedReading;

/// Outcome of one acquisition pass over both sensors
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Acquisition {
    /// Temperature / pressure / humidity channel
    pub environment: Correction,
    /// Light channel
    pub light: LightCorrection,
}

/// Last known good reading set
#[derive(Debug, Clone)]
pub struct ReadingStore {
    current: CorrectedReading,
    has_environment: bool,
    has_light: bool,
}

impl Default for ReadingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadingStore {
    /// Create a store holding the zeroed reading
    pub const fn new() -> Self {
        Self {
            current: CorrectedReading::zeroed(),
            has_environment: false,
            has_light: false,
        }
    }

    /// Replace the whole reading
    pub fn set(&mut self, reading: CorrectedReading) {
        self.current = reading;
        self.has_environment = true;
        self.has_light = true;
    }

    /// Get a snapshot of the current reading
    pub fn get(&self) -> CorrectedReading {
        self.current
    }

    /// Apply the valid parts of an acquisition
    ///
    /// The environmental triple is taken as a unit, the lux value as
    /// another; discarded parts leave their fields untouched. Returns true
    /// if the stored reading changed.
    pub fn apply(&mut self, acquisition: &Acquisition) -> bool {
        let mut next = self.current;
        let mut changed = false;

        if let Some(env) = acquisition.environment.environment() {
            next = next.with_environment(env);
            self.has_environment = true;
            changed = true;
        }

        if let Some(lux) = acquisition.light.lux() {
            next = next.with_lux(lux);
            self.has_light = true;
            changed = true;
        }

        if changed {
            self.current = next;
        }
        changed
    }

    /// Check if any valid environmental sample has been stored
    pub fn has_valid_reading(&self) -> bool {
        self.has_environment
    }

    /// Check if any valid light sample has been stored
    pub fn has_light(&self) -> bool {
        self.has_light
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::DiscardReason;
    use crate::reading::CorrectedEnvironment;

    fn env(temperature: f32) -> CorrectedEnvironment {
        CorrectedEnvironment {
            temperature,
            pressure: 1000.0,
            humidity: 50.0,
        }
    }

    #[test]
    fn test_starts_zeroed() {
        let store = ReadingStore::new();
        assert_eq!(store.get(), CorrectedReading::zeroed());
        assert!(!store.has_valid_reading());
    }

    #[test]
    fn test_apply_valid_environment_keeps_lux() {
        let mut store = ReadingStore::new();
        store.set(CorrectedReading {
            lux: 120.0,
            ..CorrectedReading::zeroed()
        });

        let changed = store.apply(&Acquisition {
            environment: Correction::Valid(env(14.5)),
            light: LightCorrection::Discarded(DiscardReason::Stale),
        });

        assert!(changed);
        let reading = store.get();
        assert_eq!(reading.temperature, 14.5);
        assert_eq!(reading.pressure, 1000.0);
        assert_eq!(reading.humidity, 50.0);
        assert_eq!(reading.lux, 120.0);
    }

    #[test]
    fn test_discarded_acquisition_is_noop() {
        let mut store = ReadingStore::new();
        store.apply(&Acquisition {
            environment: Correction::Valid(env(20.0)),
            light: LightCorrection::Valid(80.0),
        });
        let before = store.get();

        let changed = store.apply(&Acquisition {
            environment: Correction::Discarded(DiscardReason::Stale),
            light: LightCorrection::Discarded(DiscardReason::NonFinite),
        });

        assert!(!changed);
        assert_eq!(store.get(), before);
    }

    #[test]
    fn test_light_only_update() {
        let mut store = ReadingStore::new();
        store.apply(&Acquisition {
            environment: Correction::Discarded(DiscardReason::DegenerateDenominator),
            light: LightCorrection::Valid(42.0),
        });

        assert_eq!(store.get().lux, 42.0);
        assert_eq!(store.get().temperature, 0.0);
        assert!(!store.has_valid_reading());
        assert!(store.has_light());
    }
}
