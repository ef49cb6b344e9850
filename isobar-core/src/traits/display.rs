//! Display renderer trait

use crate::clock::CivilTime;
use crate::reading::CorrectedReading;
use crate::throttle::LinkStatus;

/// Errors that can occur while rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Communication with the panel failed
    Communication,
    /// Panel not initialized
    NotInitialized,
    /// Text did not fit the line buffer
    BufferOverflow,
}

/// Everything the renderer may show besides the reading itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RenderContext {
    /// Milliseconds since boot
    pub uptime_ms: u64,
    /// Local wall time, once the clock has been synchronised
    pub wall_time: Option<CivilTime>,
    /// Outcome of the most recent publish attempt
    pub link: LinkStatus,
    /// At least one valid environmental sample has been stored
    pub has_reading: bool,
}

/// Trait for the local display
///
/// Receives a read-only snapshot once per tick. Failures are reported but
/// never stop the control loop.
pub trait DisplayRenderer {
    /// Draw the reading
    fn render(&mut self, reading: &CorrectedReading, ctx: &RenderContext)
        -> Result<(), DisplayError>;
}
