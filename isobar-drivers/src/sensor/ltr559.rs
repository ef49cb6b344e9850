//! LTR-559 ambient light sensor (I2C)
//!
//! Only the ambient light channel is used; the proximity half of the chip
//! stays in standby. The sensor measures continuously, `read_light` picks
//! up the latest result.
//!
//! # Lux conversion
//!
//! Lux is computed from the two photodiode channels with the vendor's
//! piecewise formula, selected by the ratio CH1 / (CH0 + CH1), then scaled
//! by the integration time and gain.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use isobar_core::reading::LightSample;
use isobar_core::traits::{LightSensor, SensorError};

use super::bus_error;

/// Fixed I2C address
pub const ADDRESS: u8 = 0x23;

/// Expected part id (part number 0x9, revision 0x2)
pub const PART_ID: u8 = 0x92;

/// Register addresses
pub mod reg {
    /// ALS mode, gain and software reset
    pub const ALS_CONTR: u8 = 0x80;
    /// ALS integration time and repeat rate
    pub const ALS_MEAS_RATE: u8 = 0x85;
    /// Part number and revision
    pub const PART_ID: u8 = 0x86;
    /// Channel 1 low byte, followed by CH1 high, CH0 low, CH0 high
    pub const ALS_DATA_CH1_0: u8 = 0x88;
    /// ALS / PS status
    pub const ALS_PS_STATUS: u8 = 0x8C;
}

const SW_RESET: u8 = 0x02;
const ALS_ACTIVE: u8 = 0x01;
const STATUS_ALS_INVALID: u8 = 0x80;
const STATUS_ALS_NEW_DATA: u8 = 0x04;

/// Integration time 50 ms (bits 5:3 = 1), repeat rate 50 ms (bits 2:0 = 0)
const MEAS_RATE_50MS: u8 = 0x08;
const INTEGRATION_MS: f32 = 50.0;

/// Channel coefficients per ratio band (×10000)
const CH0_COEFF: [i64; 4] = [17743, 42785, 5926, 0];
const CH1_COEFF: [i64; 4] = [-11059, 19548, -1185, 0];

/// ALS gain setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlsGain {
    X1 = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X48 = 6,
    X96 = 7,
}

impl AlsGain {
    /// Multiplication factor
    pub fn factor(self) -> f32 {
        match self {
            AlsGain::X1 => 1.0,
            AlsGain::X2 => 2.0,
            AlsGain::X4 => 4.0,
            AlsGain::X8 => 8.0,
            AlsGain::X48 => 48.0,
            AlsGain::X96 => 96.0,
        }
    }
}

/// Convert raw channel counts to lux
pub fn lux(ch0: u16, ch1: u16, gain: AlsGain, integration_ms: f32) -> f32 {
    let total = ch0 as u32 + ch1 as u32;
    let ratio = if total > 0 {
        ch1 as u32 * 1000 / total
    } else {
        1000
    };

    let band = match ratio {
        r if r < 450 => 0,
        r if r < 640 => 1,
        r if r < 850 => 2,
        _ => 3,
    };

    let raw = ch0 as i64 * CH0_COEFF[band] - ch1 as i64 * CH1_COEFF[band];
    raw as f32 / (integration_ms / 100.0) / gain.factor() / 10000.0
}

/// LTR-559 driver
pub struct Ltr559<I2C, D> {
    i2c: I2C,
    delay: D,
    gain: AlsGain,
}

impl<I2C: I2c, D: DelayNs> Ltr559<I2C, D> {
    /// Create a driver; call [`init`](Self::init) before reading
    pub fn new(i2c: I2C, delay: D, gain: AlsGain) -> Self {
        Self { i2c, delay, gain }
    }

    /// Check the part id, reset, and start continuous ALS measurement
    pub fn init(&mut self) -> Result<(), SensorError> {
        let id = self.read_reg(reg::PART_ID)?;
        if id != PART_ID {
            return Err(SensorError::WrongChipId(id));
        }

        self.write_reg(reg::ALS_CONTR, SW_RESET)?;
        self.delay.delay_ms(10);

        self.write_reg(reg::ALS_MEAS_RATE, MEAS_RATE_50MS)?;
        self.write_reg(reg::ALS_CONTR, ((self.gain as u8) << 2) | ALS_ACTIVE)?;
        Ok(())
    }

    /// Release the bus and delay
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, SensorError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(ADDRESS, &[reg], &mut buf)
            .map_err(bus_error)?;
        Ok(buf[0])
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), SensorError> {
        self.i2c.write(ADDRESS, &[reg, value]).map_err(bus_error)
    }
}

impl<I2C: I2c, D: DelayNs> LightSensor for Ltr559<I2C, D> {
    fn read_light(&mut self) -> Result<LightSample, SensorError> {
        let status = self.read_reg(reg::ALS_PS_STATUS)?;

        let mut data = [0u8; 4];
        self.i2c
            .write_read(ADDRESS, &[reg::ALS_DATA_CH1_0], &mut data)
            .map_err(bus_error)?;
        let ch1 = u16::from_le_bytes([data[0], data[1]]);
        let ch0 = u16::from_le_bytes([data[2], data[3]]);

        let fresh = status & STATUS_ALS_NEW_DATA != 0 && status & STATUS_ALS_INVALID == 0;
        Ok(LightSample {
            lux: lux(ch0, ch1, self.gain, INTEGRATION_MS),
            data_valid: fresh,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::fake::{FakeBus, NoDelay};

    fn close(a: f32, b: f32, tol: f32) -> bool {
        a - b < tol && b - a < tol
    }

    fn bus_with(ch0: u16, ch1: u16, status: u8) -> FakeBus {
        let mut bus = FakeBus::new(ADDRESS);
        bus.regs[reg::PART_ID as usize] = PART_ID;
        bus.regs[reg::ALS_PS_STATUS as usize] = status;
        let [c1l, c1h] = ch1.to_le_bytes();
        let [c0l, c0h] = ch0.to_le_bytes();
        bus.regs[0x88] = c1l;
        bus.regs[0x89] = c1h;
        bus.regs[0x8A] = c0l;
        bus.regs[0x8B] = c0h;
        bus
    }

    #[test]
    fn test_lux_low_ratio_band() {
        // ratio 166: 1.7743 * ch0 + 1.1059 * ch1
        let value = lux(1000, 200, AlsGain::X4, 50.0);
        assert!(close(value, 997.74, 0.01));
    }

    #[test]
    fn test_lux_mid_ratio_band() {
        // ratio 500: 4.2785 * ch0 - 1.9548 * ch1 at 1x / 100 ms
        let value = lux(1000, 1000, AlsGain::X1, 100.0);
        assert!(close(value, 2323.7, 0.01));
    }

    #[test]
    fn test_lux_dark_and_ir_only() {
        assert_eq!(lux(0, 0, AlsGain::X4, 50.0), 0.0);
        assert_eq!(lux(10, 1000, AlsGain::X4, 50.0), 0.0);
    }

    #[test]
    fn test_init_configures_als() {
        let mut ltr = Ltr559::new(bus_with(0, 0, 0), NoDelay, AlsGain::X4);
        ltr.init().unwrap();

        let (bus, _) = ltr.release();
        assert_eq!(bus.written(reg::ALS_MEAS_RATE), Some(0x08));
        assert_eq!(bus.written(reg::ALS_CONTR), Some((2 << 2) | 0x01));
    }

    #[test]
    fn test_wrong_part_id() {
        let mut bus = bus_with(0, 0, 0);
        bus.regs[reg::PART_ID as usize] = 0x00;
        let mut ltr = Ltr559::new(bus, NoDelay, AlsGain::X4);
        assert_eq!(ltr.init(), Err(SensorError::WrongChipId(0x00)));
    }

    #[test]
    fn test_read_new_data() {
        let mut ltr = Ltr559::new(bus_with(1000, 200, STATUS_ALS_NEW_DATA), NoDelay, AlsGain::X4);
        ltr.init().unwrap();

        let sample = ltr.read_light().unwrap();
        assert!(sample.data_valid);
        assert!(close(sample.lux, 997.74, 0.01));
    }

    #[test]
    fn test_read_without_new_data_is_stale() {
        let mut ltr = Ltr559::new(bus_with(1000, 200, 0x00), NoDelay, AlsGain::X4);
        ltr.init().unwrap();
        assert!(!ltr.read_light().unwrap().data_valid);

        let mut ltr = Ltr559::new(
            bus_with(1000, 200, STATUS_ALS_NEW_DATA | STATUS_ALS_INVALID),
            NoDelay,
            AlsGain::X4,
        );
        ltr.init().unwrap();
        assert!(!ltr.read_light().unwrap().data_valid);
    }
}
