//! Reading screen layout
//!
//! ```text
//! 0  12:34:56 29/02/24        (or "Up 0d 00:01:01" before sync)
//! 1  Temp   21.4 C            (band marker " COLD" / " HOT", inverted)
//! 2  Hum    45.2 %
//! 3  Press  1013 hPa
//! 4  Light   352 lux
//! 5  Link OK
//! ```
//!
//! Every channel shows `--` until the first valid reading has been stored.

use core::fmt::Write;

use heapless::String;
use isobar_core::reading::CorrectedReading;
use isobar_core::throttle::LinkStatus;
use isobar_core::traits::{DisplayError, RenderContext};

use crate::screen::{Screen, LINE_LEN};

pub const ROW_CLOCK: usize = 0;
pub const ROW_TEMPERATURE: usize = 1;
pub const ROW_HUMIDITY: usize = 2;
pub const ROW_PRESSURE: usize = 3;
pub const ROW_LIGHT: usize = 4;
pub const ROW_LINK: usize = 5;

/// Below this the temperature is shown as cold (°C)
pub const COLD_BELOW_C: f32 = 10.0;

/// Above this the temperature is shown as hot (°C)
pub const HOT_ABOVE_C: f32 = 30.0;

/// Coarse temperature band used to flag the temperature row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TemperatureBand {
    Cold,
    Comfortable,
    Hot,
}

impl TemperatureBand {
    /// Classify a corrected temperature
    pub fn from_celsius(temperature: f32) -> Self {
        if temperature > HOT_ABOVE_C {
            TemperatureBand::Hot
        } else if temperature < COLD_BELOW_C {
            TemperatureBand::Cold
        } else {
            TemperatureBand::Comfortable
        }
    }

    /// Marker appended to the temperature row
    pub fn marker(self) -> &'static str {
        match self {
            TemperatureBand::Cold => " COLD",
            TemperatureBand::Comfortable => "",
            TemperatureBand::Hot => " HOT",
        }
    }
}

type Line = String<LINE_LEN>;

fn overflow(_: core::fmt::Error) -> DisplayError {
    DisplayError::BufferOverflow
}

/// Lay out one frame of the reading screen
pub fn compose(
    screen: &mut Screen,
    reading: &CorrectedReading,
    ctx: &RenderContext,
) -> Result<(), DisplayError> {
    screen.set_line(ROW_CLOCK, &clock_line(ctx)?);

    let mut line = Line::new();
    let mut highlight = None;
    if ctx.has_reading {
        write!(line, "Temp  {:5.1} C", reading.temperature).map_err(overflow)?;
        let band = TemperatureBand::from_celsius(reading.temperature);
        if band != TemperatureBand::Comfortable {
            line.push_str(band.marker()).map_err(|_| DisplayError::BufferOverflow)?;
            highlight = Some((0, line.len() as u8));
        }
    } else {
        let _ = line.push_str("Temp     -- C");
    }
    screen.set_line(ROW_TEMPERATURE, &line);
    screen.set_highlight(ROW_TEMPERATURE, highlight);

    screen.set_line(
        ROW_HUMIDITY,
        &channel_line(ctx, "Hum   ", |l| write!(l, "{:5.1} %", reading.humidity))?,
    );
    screen.set_line(
        ROW_PRESSURE,
        &channel_line(ctx, "Press ", |l| write!(l, "{:5.0} hPa", reading.pressure))?,
    );
    screen.set_line(
        ROW_LIGHT,
        &channel_line(ctx, "Light ", |l| write!(l, "{:5.0} lux", reading.lux))?,
    );

    let link = match ctx.link {
        LinkStatus::NotYetPublished => "Link --",
        LinkStatus::Published => "Link OK",
        LinkStatus::Failing => "Link FAIL",
    };
    screen.set_line(ROW_LINK, link);

    Ok(())
}

/// Wall time once synchronised, uptime before that
fn clock_line(ctx: &RenderContext) -> Result<Line, DisplayError> {
    let mut line = Line::new();
    match ctx.wall_time {
        Some(t) => write!(
            line,
            "{:02}:{:02}:{:02} {:02}/{:02}/{:02}",
            t.hour,
            t.minute,
            t.second,
            t.day,
            t.month,
            t.year % 100
        )
        .map_err(overflow)?,
        None => {
            let secs = ctx.uptime_ms / 1000;
            write!(
                line,
                "Up {}d {:02}:{:02}:{:02}",
                secs / 86_400,
                (secs / 3600) % 24,
                (secs / 60) % 60,
                secs % 60
            )
            .map_err(overflow)?
        }
    }
    Ok(line)
}

fn channel_line(
    ctx: &RenderContext,
    label: &str,
    value: impl FnOnce(&mut Line) -> core::fmt::Result,
) -> Result<Line, DisplayError> {
    let mut line = Line::new();
    line.push_str(label).map_err(|_| DisplayError::BufferOverflow)?;
    if ctx.has_reading {
        value(&mut line).map_err(overflow)?;
    } else {
        line.push_str("   --").map_err(|_| DisplayError::BufferOverflow)?;
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use isobar_core::clock::CivilTime;

    fn reading() -> CorrectedReading {
        CorrectedReading {
            temperature: 21.43,
            pressure: 1013.2,
            humidity: 45.18,
            lux: 352.4,
        }
    }

    fn ctx(has_reading: bool) -> RenderContext {
        RenderContext {
            uptime_ms: 61_000,
            wall_time: None,
            link: LinkStatus::NotYetPublished,
            has_reading,
        }
    }

    #[test]
    fn test_temperature_bands() {
        assert_eq!(TemperatureBand::from_celsius(9.9), TemperatureBand::Cold);
        assert_eq!(TemperatureBand::from_celsius(10.0), TemperatureBand::Comfortable);
        assert_eq!(TemperatureBand::from_celsius(30.0), TemperatureBand::Comfortable);
        assert_eq!(TemperatureBand::from_celsius(30.1), TemperatureBand::Hot);
    }

    #[test]
    fn test_placeholders_before_first_reading() {
        let mut screen = Screen::new();
        compose(&mut screen, &CorrectedReading::zeroed(), &ctx(false)).unwrap();

        assert_eq!(screen.get_line(ROW_CLOCK), Some("Up 0d 00:01:01"));
        assert_eq!(screen.get_line(ROW_TEMPERATURE), Some("Temp     -- C"));
        assert_eq!(screen.get_line(ROW_HUMIDITY), Some("Hum      --"));
        assert_eq!(screen.get_line(ROW_PRESSURE), Some("Press    --"));
        assert_eq!(screen.get_line(ROW_LIGHT), Some("Light    --"));
        assert_eq!(screen.get_line(ROW_LINK), Some("Link --"));
        assert_eq!(screen.get_highlight(ROW_TEMPERATURE), None);
    }

    #[test]
    fn test_reading_rows() {
        let mut screen = Screen::new();
        compose(&mut screen, &reading(), &ctx(true)).unwrap();

        assert_eq!(screen.get_line(ROW_TEMPERATURE), Some("Temp   21.4 C"));
        assert_eq!(screen.get_line(ROW_HUMIDITY), Some("Hum    45.2 %"));
        assert_eq!(screen.get_line(ROW_PRESSURE), Some("Press  1013 hPa"));
        assert_eq!(screen.get_line(ROW_LIGHT), Some("Light   352 lux"));
    }

    #[test]
    fn test_hot_reading_is_marked() {
        let mut screen = Screen::new();
        let hot = CorrectedReading {
            temperature: 31.0,
            ..reading()
        };
        compose(&mut screen, &hot, &ctx(true)).unwrap();

        assert_eq!(screen.get_line(ROW_TEMPERATURE), Some("Temp   31.0 C HOT"));
        assert_eq!(screen.get_highlight(ROW_TEMPERATURE), Some((0, 17)));

        let cold = CorrectedReading {
            temperature: -2.5,
            ..reading()
        };
        compose(&mut screen, &cold, &ctx(true)).unwrap();
        assert_eq!(screen.get_line(ROW_TEMPERATURE), Some("Temp   -2.5 C COLD"));
    }

    #[test]
    fn test_wall_clock_row() {
        let mut screen = Screen::new();
        let mut context = ctx(true);
        context.wall_time = Some(CivilTime {
            year: 2024,
            month: 2,
            day: 29,
            hour: 12,
            minute: 34,
            second: 56,
        });
        context.link = LinkStatus::Failing;
        compose(&mut screen, &reading(), &context).unwrap();

        assert_eq!(screen.get_line(ROW_CLOCK), Some("12:34:56 29/02/24"));
        assert_eq!(screen.get_line(ROW_LINK), Some("Link FAIL"));
    }

    #[test]
    fn test_uptime_rolls_into_days() {
        let mut screen = Screen::new();
        let mut context = ctx(false);
        context.uptime_ms = (86_400 + 3_723) * 1000;
        compose(&mut screen, &reading(), &context).unwrap();
        assert_eq!(screen.get_line(ROW_CLOCK), Some("Up 1d 01:02:03"));
    }

    #[test]
    fn test_absurd_value_overflows() {
        let mut screen = Screen::new();
        let huge = CorrectedReading {
            pressure: 1.0e30,
            ..reading()
        };
        assert_eq!(
            compose(&mut screen, &huge, &ctx(true)),
            Err(DisplayError::BufferOverflow)
        );
    }
}
