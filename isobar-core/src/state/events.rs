//! Events that trigger state transitions

use super::machine::FaultKind;

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Hardware and configuration came up
    BootComplete,
    /// Unrecoverable fault
    Fault(FaultKind),
    /// External request to stop the control loop
    Shutdown,
}

impl Event {
    /// Check if this event indicates a fault
    pub fn is_fault(&self) -> bool {
        matches!(self, Event::Fault(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_events() {
        assert!(Event::Fault(FaultKind::SensorInit).is_fault());
        assert!(!Event::Shutdown.is_fault());
        assert!(!Event::BootComplete.is_fault());
    }
}
