//! SSD1306 OLED backend
//!
//! 128x64 panel on the shared I2C bus, driven through the `ssd1306` crate
//! in buffered graphics mode. Text uses the 6x10 font: 21 columns by
//! 6 rows, matching the core screen buffer.

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use embedded_hal::i2c::I2c;
use heapless::String;
use isobar_core::traits::DisplayError;
use isobar_display::{DisplayBackend, LINE_LEN, SCREEN_COLS, SCREEN_ROWS};
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

const CHAR_WIDTH: i32 = 6;
const ROW_HEIGHT: i32 = 10;
const TOP_MARGIN: i32 = 2;

type Panel<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// Character backend over an SSD1306 frame buffer
pub struct OledBackend<I2C> {
    panel: Panel<I2C>,
    /// Text drawn this frame, needed to redraw inverted regions
    rows: [String<LINE_LEN>; SCREEN_ROWS],
    ready: bool,
}

fn communication<E>(_: E) -> DisplayError {
    DisplayError::Communication
}

impl<I2C: I2c> OledBackend<I2C> {
    /// Create the backend; call [`init`](Self::init) before drawing
    pub fn new(i2c: I2C) -> Self {
        let interface = I2CDisplayInterface::new(i2c);
        let panel = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        Self {
            panel,
            rows: core::array::from_fn(|_| String::new()),
            ready: false,
        }
    }

    /// Initialize the panel and blank it
    pub fn init(&mut self) -> Result<(), DisplayError> {
        self.panel.init().map_err(communication)?;
        self.panel.clear_buffer();
        self.panel.flush().map_err(communication)?;
        self.ready = true;
        Ok(())
    }

    fn style(color: BinaryColor) -> MonoTextStyle<'static, BinaryColor> {
        MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(color)
            .build()
    }

    fn origin(row: u8, col: u8) -> Point {
        Point::new(col as i32 * CHAR_WIDTH, TOP_MARGIN + row as i32 * ROW_HEIGHT)
    }
}

impl<I2C: I2c> DisplayBackend for OledBackend<I2C> {
    fn clear(&mut self) -> Result<(), DisplayError> {
        self.panel.clear_buffer();
        for row in &mut self.rows {
            row.clear();
        }
        Ok(())
    }

    fn draw_text(&mut self, row: u8, col: u8, text: &str) -> Result<(), DisplayError> {
        let line = self
            .rows
            .get_mut(row as usize)
            .ok_or(DisplayError::BufferOverflow)?;
        line.clear();
        for _ in 0..col {
            line.push(' ').map_err(|_| DisplayError::BufferOverflow)?;
        }
        line.push_str(text).map_err(|_| DisplayError::BufferOverflow)?;

        let style = Self::style(BinaryColor::On);
        Text::with_baseline(text, Self::origin(row, col), style, Baseline::Top)
            .draw(&mut self.panel)
            .map_err(communication)?;
        Ok(())
    }

    fn invert_region(&mut self, row: u8, start_col: u8, end_col: u8) -> Result<(), DisplayError> {
        let line = self
            .rows
            .get(row as usize)
            .ok_or(DisplayError::BufferOverflow)?;
        let end_col = end_col.min(SCREEN_COLS as u8);
        if start_col >= end_col {
            return Ok(());
        }

        let top_left = Self::origin(row, start_col);
        let size = Size::new(
            (end_col - start_col) as u32 * CHAR_WIDTH as u32,
            ROW_HEIGHT as u32,
        );
        Rectangle::new(top_left, size)
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut self.panel)
            .map_err(communication)?;

        let text = line
            .get(start_col as usize..(end_col as usize).min(line.len()))
            .unwrap_or("");
        Text::with_baseline(text, top_left, Self::style(BinaryColor::Off), Baseline::Top)
            .draw(&mut self.panel)
            .map_err(communication)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.panel.flush().map_err(communication)
    }

    fn dimensions(&self) -> (u8, u8) {
        (SCREEN_COLS as u8, SCREEN_ROWS as u8)
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}
