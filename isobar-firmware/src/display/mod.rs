//! Panel backends for the reading screen

pub mod ssd1306;

pub use self::ssd1306::OledBackend;
