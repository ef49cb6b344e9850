//! Button and status LED traits

use crate::throttle::LinkStatus;

/// Front panel buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    A,
    B,
    X,
    Y,
}

/// Trait for polling the buttons
pub trait InputSource {
    /// Return a newly pressed button, if any
    ///
    /// Must not block.
    fn poll(&mut self) -> Option<Button>;
}

/// Trait for the status LED
pub trait StatusIndicator {
    /// Show the current link status
    fn show(&mut self, status: LinkStatus);
}

/// Input source for boards without buttons
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInput;

impl InputSource for NoInput {
    fn poll(&mut self) -> Option<Button> {
        None
    }
}

/// Status indicator for boards without an LED
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIndicator;

impl StatusIndicator for NoIndicator {
    fn show(&mut self, _status: LinkStatus) {}
}
