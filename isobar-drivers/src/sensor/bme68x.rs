//! BME68x environmental sensor (I2C)
//!
//! Runs the sensor in forced mode with the gas heater disabled: every
//! `read_raw` triggers one temperature / pressure / humidity conversion,
//! waits for it, and reads field 0 back.
//!
//! # Freshness
//!
//! Bit 7 of `MEAS_STATUS_0` is the new-data flag. It is passed through as
//! `RawSample::data_valid` untouched; the calibration engine decides what
//! to do with stale samples.
//!
//! # Compensation
//!
//! Raw ADC values are compensated with the vendor's floating point
//! formulas using the factory calibration read at `init`.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use isobar_core::reading::RawSample;
use isobar_core::traits::{EnvironmentSensor, SensorError};

use super::bus_error;

/// Primary I2C address (SDO low)
pub const ADDRESS_PRIMARY: u8 = 0x76;

/// Secondary I2C address (SDO high), used by the Enviro pack
pub const ADDRESS_SECONDARY: u8 = 0x77;

/// Expected chip id
pub const CHIP_ID: u8 = 0x61;

/// Register addresses
pub mod reg {
    /// Field 0 status, followed by pressure, temperature and humidity data
    pub const MEAS_STATUS_0: u8 = 0x1D;
    /// Gas heater control
    pub const CTRL_GAS_0: u8 = 0x70;
    /// Gas conversion control
    pub const CTRL_GAS_1: u8 = 0x71;
    /// Humidity oversampling
    pub const CTRL_HUM: u8 = 0x72;
    /// Temperature / pressure oversampling and mode
    pub const CTRL_MEAS: u8 = 0x74;
    /// IIR filter
    pub const CONFIG: u8 = 0x75;
    /// Chip id
    pub const CHIP_ID: u8 = 0xD0;
    /// Soft reset
    pub const RESET: u8 = 0xE0;
    /// Calibration block 1
    pub const COEFF_1: u8 = 0x8A;
    /// Calibration block 2
    pub const COEFF_2: u8 = 0xE1;
    /// Calibration block 3
    pub const COEFF_3: u8 = 0x00;
}

const SOFT_RESET_CMD: u8 = 0xB6;
const HEAT_OFF: u8 = 0x08;
const MODE_FORCED: u8 = 0x01;
const NEW_DATA: u8 = 0x80;

const COEFF_1_LEN: usize = 23;
const COEFF_2_LEN: usize = 14;
const COEFF_3_LEN: usize = 5;
const COEFF_LEN: usize = COEFF_1_LEN + COEFF_2_LEN + COEFF_3_LEN;

/// Bytes read from `MEAS_STATUS_0`: status, index, pressure, temperature, humidity
const FIELD_LEN: usize = 10;

/// Oversampling setting for one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Oversampling {
    Skip = 0,
    X1 = 1,
    X2 = 2,
    X4 = 3,
    X8 = 4,
    X16 = 5,
}

impl Oversampling {
    /// Number of conversion cycles
    fn cycles(self) -> u32 {
        match self {
            Oversampling::Skip => 0,
            Oversampling::X1 => 1,
            Oversampling::X2 => 2,
            Oversampling::X4 => 4,
            Oversampling::X8 => 8,
            Oversampling::X16 => 16,
        }
    }
}

/// BME68x measurement configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bme68xConfig {
    pub temperature: Oversampling,
    pub pressure: Oversampling,
    pub humidity: Oversampling,
    /// IIR filter coefficient code (0 = off, 7 = 127)
    pub filter: u8,
}

impl Default for Bme68xConfig {
    fn default() -> Self {
        Self {
            temperature: Oversampling::X2,
            pressure: Oversampling::X16,
            humidity: Oversampling::X1,
            filter: 0,
        }
    }
}

impl Bme68xConfig {
    /// Duration of one forced-mode conversion (µs)
    pub fn measurement_duration_us(&self) -> u32 {
        let cycles = self.temperature.cycles() + self.pressure.cycles() + self.humidity.cycles();
        // Conversion cycles, TPH switching, gas stage and wake-up
        cycles * 1963 + 477 * 4 + 477 * 5 + 1000
    }
}

/// Factory calibration
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    pub par_t1: u16,
    pub par_t2: i16,
    pub par_t3: i8,
    pub par_p1: u16,
    pub par_p2: i16,
    pub par_p3: i8,
    pub par_p4: i16,
    pub par_p5: i16,
    pub par_p6: i8,
    pub par_p7: i8,
    pub par_p8: i16,
    pub par_p9: i16,
    pub par_p10: u8,
    pub par_h1: u16,
    pub par_h2: u16,
    pub par_h3: i8,
    pub par_h4: i8,
    pub par_h5: i8,
    pub par_h6: u8,
    pub par_h7: i8,
}

impl Calibration {
    /// Decode the concatenated calibration blocks
    fn from_bytes(c: &[u8; COEFF_LEN]) -> Self {
        let u16_at = |lsb: usize| u16::from_le_bytes([c[lsb], c[lsb + 1]]);
        let i16_at = |lsb: usize| i16::from_le_bytes([c[lsb], c[lsb + 1]]);

        Self {
            par_t1: u16_at(31),
            par_t2: i16_at(0),
            par_t3: c[2] as i8,
            par_p1: u16_at(4),
            par_p2: i16_at(6),
            par_p3: c[8] as i8,
            par_p4: i16_at(10),
            par_p5: i16_at(12),
            par_p6: c[15] as i8,
            par_p7: c[14] as i8,
            par_p8: i16_at(18),
            par_p9: i16_at(20),
            par_p10: c[22],
            par_h1: ((c[25] as u16) << 4) | (c[24] & 0x0F) as u16,
            par_h2: ((c[23] as u16) << 4) | (c[24] >> 4) as u16,
            par_h3: c[26] as i8,
            par_h4: c[27] as i8,
            par_h5: c[28] as i8,
            par_h6: c[29],
            par_h7: c[30] as i8,
        }
    }

    /// Compensate temperature, returning (°C, t_fine)
    pub fn temperature(&self, adc: u32) -> (f32, f32) {
        let adc = adc as f32;
        let t1 = self.par_t1 as f32;
        let var1 = (adc / 16384.0 - t1 / 1024.0) * self.par_t2 as f32;
        let d = adc / 131072.0 - t1 / 8192.0;
        let var2 = d * d * (self.par_t3 as f32 * 16.0);
        let t_fine = var1 + var2;
        (t_fine / 5120.0, t_fine)
    }

    /// Compensate pressure (Pa)
    pub fn pressure(&self, adc: u32, t_fine: f32) -> f32 {
        let mut var1 = t_fine / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * (self.par_p6 as f32 / 131072.0);
        var2 += var1 * self.par_p5 as f32 * 2.0;
        var2 = var2 / 4.0 + self.par_p4 as f32 * 65536.0;
        var1 = (self.par_p3 as f32 * var1 * var1 / 16384.0 + self.par_p2 as f32 * var1) / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * self.par_p1 as f32;

        if var1 as i32 == 0 {
            return 0.0;
        }

        let mut p = 1048576.0 - adc as f32;
        p = ((p - var2 / 4096.0) * 6250.0) / var1;
        let var1 = self.par_p9 as f32 * p * p / 2147483648.0;
        let var2 = p * (self.par_p8 as f32 / 32768.0);
        let s = p / 256.0;
        let var3 = s * s * s * (self.par_p10 as f32 / 131072.0);
        p + (var1 + var2 + var3 + self.par_p7 as f32 * 128.0) / 16.0
    }

    /// Compensate relative humidity (%RH, clamped by the sensor model)
    pub fn humidity(&self, adc: u16, t_fine: f32) -> f32 {
        let temp = t_fine / 5120.0;
        let var1 =
            adc as f32 - (self.par_h1 as f32 * 16.0 + (self.par_h3 as f32 / 2.0) * temp);
        let var2 = var1
            * (self.par_h2 as f32 / 262144.0)
            * (1.0
                + (self.par_h4 as f32 / 16384.0) * temp
                + (self.par_h5 as f32 / 1048576.0) * temp * temp);
        let var3 = self.par_h6 as f32 / 16384.0;
        let var4 = self.par_h7 as f32 / 2097152.0;
        let h = var2 + (var3 + var4 * temp) * var2 * var2;
        h.clamp(0.0, 100.0)
    }
}

/// BME68x driver
pub struct Bme68x<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    config: Bme68xConfig,
    calibration: Calibration,
}

impl<I2C: I2c, D: DelayNs> Bme68x<I2C, D> {
    /// Create a driver; call [`init`](Self::init) before reading
    pub fn new(i2c: I2C, delay: D, address: u8, config: Bme68xConfig) -> Self {
        Self {
            i2c,
            delay,
            address,
            config,
            calibration: Calibration::default(),
        }
    }

    /// Check the chip id, reset, and load the factory calibration
    pub fn init(&mut self) -> Result<(), SensorError> {
        let id = self.read_reg(reg::CHIP_ID)?;
        if id != CHIP_ID {
            return Err(SensorError::WrongChipId(id));
        }

        self.write_reg(reg::RESET, SOFT_RESET_CMD)?;
        self.delay.delay_ms(10);

        let mut coeff = [0u8; COEFF_LEN];
        let (c1, rest) = coeff.split_at_mut(COEFF_1_LEN);
        let (c2, c3) = rest.split_at_mut(COEFF_2_LEN);
        self.read_regs(reg::COEFF_1, c1)?;
        self.read_regs(reg::COEFF_2, c2)?;
        self.read_regs(reg::COEFF_3, c3)?;
        self.calibration = Calibration::from_bytes(&coeff);

        self.write_reg(reg::CTRL_GAS_0, HEAT_OFF)?;
        self.write_reg(reg::CTRL_GAS_1, 0)?;
        self.write_reg(reg::CONFIG, (self.config.filter & 0x07) << 2)?;
        self.write_reg(reg::CTRL_HUM, self.config.humidity as u8)?;
        Ok(())
    }

    /// Loaded factory calibration
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Release the bus and delay
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn trigger(&mut self) -> Result<(), SensorError> {
        let ctrl_meas = ((self.config.temperature as u8) << 5)
            | ((self.config.pressure as u8) << 2)
            | MODE_FORCED;
        self.write_reg(reg::CTRL_MEAS, ctrl_meas)
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, SensorError> {
        let mut buf = [0u8; 1];
        self.read_regs(reg, &mut buf)?;
        Ok(buf[0])
    }

    fn read_regs(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), SensorError> {
        self.i2c
            .write_read(self.address, &[reg], buf)
            .map_err(bus_error)
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &[reg, value])
            .map_err(bus_error)
    }
}

impl<I2C: I2c, D: DelayNs> EnvironmentSensor for Bme68x<I2C, D> {
    fn read_raw(&mut self) -> Result<RawSample, SensorError> {
        self.trigger()?;
        self.delay.delay_us(self.config.measurement_duration_us());

        let mut field = [0u8; FIELD_LEN];
        self.read_regs(reg::MEAS_STATUS_0, &mut field)?;

        let status = field[0];
        let pressure_adc = adc20(field[2], field[3], field[4]);
        let temperature_adc = adc20(field[5], field[6], field[7]);
        let humidity_adc = u16::from_be_bytes([field[8], field[9]]);

        let (temperature, t_fine) = self.calibration.temperature(temperature_adc);
        let pressure = self.calibration.pressure(pressure_adc, t_fine);
        let humidity = self.calibration.humidity(humidity_adc, t_fine);

        Ok(RawSample {
            temperature,
            pressure,
            humidity,
            data_valid: status & NEW_DATA != 0,
        })
    }
}

/// Assemble a 20-bit ADC value from msb, lsb and the xlsb high nibble
fn adc20(msb: u8, lsb: u8, xlsb: u8) -> u32 {
    ((msb as u32) << 12) | ((lsb as u32) << 4) | ((xlsb as u32) >> 4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::fake::{FakeBus, NoDelay};

    fn close(a: f32, b: f32, tol: f32) -> bool {
        a - b < tol && b - a < tol
    }

    fn put_u16(bus: &mut FakeBus, lsb_reg: u8, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        bus.regs[lsb_reg as usize] = lo;
        bus.regs[lsb_reg as usize + 1] = hi;
    }

    fn put_adc20(bus: &mut FakeBus, msb_reg: u8, value: u32) {
        bus.regs[msb_reg as usize] = (value >> 12) as u8;
        bus.regs[msb_reg as usize + 1] = (value >> 4) as u8;
        bus.regs[msb_reg as usize + 2] = ((value & 0x0F) << 4) as u8;
    }

    /// Sensor with plausible factory calibration at 26.7 °C / 952 hPa / 43 %RH
    fn calibrated_bus() -> FakeBus {
        let mut bus = FakeBus::new(ADDRESS_SECONDARY);
        bus.regs[reg::CHIP_ID as usize] = CHIP_ID;

        put_u16(&mut bus, 0xE9, 25938); // T1
        put_u16(&mut bus, 0x8A, 26334); // T2
        bus.regs[0x8C] = 3; // T3
        put_u16(&mut bus, 0x8E, 36477); // P1
        put_u16(&mut bus, 0x90, (-10427i16) as u16); // P2
        bus.regs[0x92] = 88; // P3
        put_u16(&mut bus, 0x94, 7120); // P4
        put_u16(&mut bus, 0x96, (-120i16) as u16); // P5
        bus.regs[0x99] = 30; // P6
        bus.regs[0x98] = 44; // P7
        put_u16(&mut bus, 0x9C, (-2950i16) as u16); // P8
        put_u16(&mut bus, 0x9E, (-2340i16) as u16); // P9
        bus.regs[0xA0] = 30; // P10

        // H1 = 784 (0x310), H2 = 1006 (0x3EE) share 0xE2
        bus.regs[0xE1] = 0x3E;
        bus.regs[0xE2] = 0xE0;
        bus.regs[0xE3] = 0x31;
        bus.regs[0xE4] = 0; // H3
        bus.regs[0xE5] = 45; // H4
        bus.regs[0xE6] = 20; // H5
        bus.regs[0xE7] = 120; // H6
        bus.regs[0xE8] = (-100i8) as u8; // H7

        bus.regs[reg::MEAS_STATUS_0 as usize] = NEW_DATA;
        put_adc20(&mut bus, 0x1F, 380_000);
        put_adc20(&mut bus, 0x22, 500_000);
        bus.regs[0x25] = 0x52;
        bus.regs[0x26] = 0x08; // 21000

        bus
    }

    fn sensor(bus: FakeBus) -> Bme68x<FakeBus, NoDelay> {
        Bme68x::new(bus, NoDelay, ADDRESS_SECONDARY, Bme68xConfig::default())
    }

    #[test]
    fn test_calibration_decoding() {
        let mut bme = sensor(calibrated_bus());
        bme.init().unwrap();

        let cal = bme.calibration();
        assert_eq!(cal.par_t1, 25938);
        assert_eq!(cal.par_t2, 26334);
        assert_eq!(cal.par_p2, -10427);
        assert_eq!(cal.par_p6, 30);
        assert_eq!(cal.par_p7, 44);
        assert_eq!(cal.par_h1, 784);
        assert_eq!(cal.par_h2, 1006);
        assert_eq!(cal.par_h7, -100);
    }

    #[test]
    fn test_init_disables_heater() {
        let mut bme = sensor(calibrated_bus());
        bme.init().unwrap();

        let (bus, _) = bme.release();
        assert_eq!(bus.written(reg::RESET), Some(SOFT_RESET_CMD));
        assert_eq!(bus.written(reg::CTRL_GAS_0), Some(HEAT_OFF));
        assert_eq!(bus.written(reg::CTRL_GAS_1), Some(0));
        assert_eq!(bus.written(reg::CTRL_HUM), Some(Oversampling::X1 as u8));
    }

    #[test]
    fn test_wrong_chip_id() {
        let mut bus = calibrated_bus();
        bus.regs[reg::CHIP_ID as usize] = 0x60;
        let mut bme = sensor(bus);
        assert_eq!(bme.init(), Err(SensorError::WrongChipId(0x60)));
    }

    #[test]
    fn test_bus_failure() {
        let mut bus = calibrated_bus();
        bus.fail = true;
        let mut bme = sensor(bus);
        assert_eq!(bme.init(), Err(SensorError::Bus));
    }

    #[test]
    fn test_forced_read_compensates() {
        let mut bme = sensor(calibrated_bus());
        bme.init().unwrap();

        let sample = bme.read_raw().unwrap();
        assert!(sample.data_valid);
        assert!(close(sample.temperature, 26.685, 0.01));
        assert!(close(sample.pressure, 95_230.19, 1.0));
        assert!(close(sample.humidity, 42.798, 0.05));

        let (bus, _) = bme.release();
        let ctrl_meas = bus.written(reg::CTRL_MEAS).unwrap();
        assert_eq!(ctrl_meas & 0x03, MODE_FORCED);
        assert_eq!(ctrl_meas >> 5, Oversampling::X2 as u8);
        assert_eq!((ctrl_meas >> 2) & 0x07, Oversampling::X16 as u8);
    }

    #[test]
    fn test_missing_new_data_flag_is_stale() {
        let mut bus = calibrated_bus();
        bus.regs[reg::MEAS_STATUS_0 as usize] = 0x20; // measuring
        let mut bme = sensor(bus);
        bme.init().unwrap();

        let sample = bme.read_raw().unwrap();
        assert!(!sample.data_valid);
    }

    #[test]
    fn test_measurement_duration() {
        // 19 cycles of oversampling plus fixed overhead
        assert_eq!(Bme68xConfig::default().measurement_duration_us(), 42_590);
    }

    #[test]
    fn test_adc20() {
        assert_eq!(adc20(0x7A, 0x12, 0x00), 500_000);
        assert_eq!(adc20(0xFF, 0xFF, 0xF0), 0xF_FFFF);
    }
}
