//! Front panel buttons and RGB status LED

use embassy_rp::gpio::{Input, Level, Output};
use isobar_core::throttle::LinkStatus;
use isobar_core::traits::{Button, InputSource, StatusIndicator};

/// The four buttons (active low, pulled up)
pub struct Buttons<'d> {
    a: Input<'d>,
    b: Input<'d>,
    x: Input<'d>,
    y: Input<'d>,
    held: Option<Button>,
}

impl<'d> Buttons<'d> {
    pub fn new(a: Input<'d>, b: Input<'d>, x: Input<'d>, y: Input<'d>) -> Self {
        Self {
            a,
            b,
            x,
            y,
            held: None,
        }
    }

    fn pressed(&self) -> Option<Button> {
        [
            (&self.a, Button::A),
            (&self.b, Button::B),
            (&self.x, Button::X),
            (&self.y, Button::Y),
        ]
        .into_iter()
        .find(|(pin, _)| pin.is_low())
        .map(|(_, button)| button)
    }
}

impl InputSource for Buttons<'_> {
    /// Report a button once, on the tick it goes down
    fn poll(&mut self) -> Option<Button> {
        let now = self.pressed();
        let edge = match now {
            Some(button) if self.held != Some(button) => Some(button),
            _ => None,
        };
        self.held = now;
        edge
    }
}

/// Common-anode RGB LED (low = lit)
pub struct RgbLed<'d> {
    red: Output<'d>,
    green: Output<'d>,
    blue: Output<'d>,
}

impl<'d> RgbLed<'d> {
    /// Take the three pins; the LED starts dark
    pub fn new(red: Output<'d>, green: Output<'d>, blue: Output<'d>) -> Self {
        let mut led = Self { red, green, blue };
        led.set(false, false, false);
        led
    }

    fn set(&mut self, red: bool, green: bool, blue: bool) {
        self.red.set_level(Level::from(!red));
        self.green.set_level(Level::from(!green));
        self.blue.set_level(Level::from(!blue));
    }
}

impl StatusIndicator for RgbLed<'_> {
    fn show(&mut self, status: LinkStatus) {
        match status {
            LinkStatus::NotYetPublished => self.set(false, false, false),
            LinkStatus::Published => self.set(false, true, false),
            LinkStatus::Failing => self.set(true, false, false),
        }
    }
}
