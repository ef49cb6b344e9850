//! Telemetry payload encoding
//!
//! Readings are published as a flat JSON object:
//!
//! ```text
//! {"temperature":14.50,"pressure":1192.32,"humidity":82.50,"lux":0.00}
//! ```

use core::fmt::Write;

use heapless::String;

use crate::reading::CorrectedReading;

/// Maximum encoded payload length
pub const MAX_PAYLOAD_LEN: usize = 128;

/// Encoded payload buffer
pub type Payload = String<MAX_PAYLOAD_LEN>;

/// Payload encoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadError {
    /// Encoded record did not fit the buffer
    Overflow,
    /// A field was NaN or infinite (not representable in JSON)
    NonFinite,
}

/// Encode a reading as a flat JSON record
pub fn encode(reading: &CorrectedReading) -> Result<Payload, PayloadError> {
    let fields = [
        ("temperature", reading.temperature),
        ("pressure", reading.pressure),
        ("humidity", reading.humidity),
        ("lux", reading.lux),
    ];

    let mut out = Payload::new();
    out.push('{').map_err(|_| PayloadError::Overflow)?;
    for (i, (name, value)) in fields.iter().enumerate() {
        if !value.is_finite() {
            return Err(PayloadError::NonFinite);
        }
        if i > 0 {
            out.push(',').map_err(|_| PayloadError::Overflow)?;
        }
        write!(out, "\"{}\":{:.2}", name, value).map_err(|_| PayloadError::Overflow)?;
    }
    out.push('}').map_err(|_| PayloadError::Overflow)?;

    Ok(out)
}
