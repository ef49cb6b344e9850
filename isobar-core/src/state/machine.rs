//! State machine definition

use super::events::Event;

/// Node states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NodeState {
    /// Power-on, hardware and configuration bring-up
    Boot,
    /// Control loop ticking
    Running,
    /// Fatal fault; no further ticks
    Halted(FaultKind),
    /// Shut down on request
    Stopped,
}

/// Faults that halt the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// Environmental or light sensor failed to initialise
    SensorInit,
    /// Display failed to initialise
    DisplayInit,
    /// Embedded configuration rejected
    Config,
}

impl NodeState {
    /// Check if ticks may execute in this state
    pub fn is_running(&self) -> bool {
        matches!(self, NodeState::Running)
    }

    /// Check if this state can never be left
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeState::Halted(_) | NodeState::Stopped)
    }

    /// Process an event and return the next state
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use NodeState::*;

        match (self, event) {
            (Boot, BootComplete) => Running,
            (Boot, Fault(kind)) => Halted(kind),

            (Running, Fault(kind)) => Halted(kind),
            (Running, Shutdown) => Stopped,

            // Terminal states and unexpected events stay put
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boot_to_running() {
        assert_eq!(NodeState::Boot.transition(Event::BootComplete), NodeState::Running);
    }

    #[test]
    fn test_init_fault_halts() {
        for kind in [FaultKind::SensorInit, FaultKind::DisplayInit, FaultKind::Config] {
            let next = NodeState::Boot.transition(Event::Fault(kind));
            assert_eq!(next, NodeState::Halted(kind));
            assert!(next.is_terminal());
        }
    }

    #[test]
    fn test_shutdown_stops_running() {
        let next = NodeState::Running.transition(Event::Shutdown);
        assert_eq!(next, NodeState::Stopped);
        assert!(!next.is_running());
    }

    #[test]
    fn test_terminal_states_ignore_events() {
        let halted = NodeState::Halted(FaultKind::DisplayInit);
        assert_eq!(halted.transition(Event::BootComplete), halted);
        assert_eq!(halted.transition(Event::Shutdown), halted);
        assert_eq!(NodeState::Stopped.transition(Event::BootComplete), NodeState::Stopped);
    }

    #[test]
    fn test_boot_ignores_shutdown() {
        assert_eq!(NodeState::Boot.transition(Event::Shutdown), NodeState::Boot);
    }
}
