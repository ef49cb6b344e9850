//! Display abstraction and reading screen for Isobar
//!
//! This crate provides:
//! - `DisplayBackend` trait for character-addressed panels (OLED, LCD, ...)
//! - `Screen`, a character buffer with per-row highlights
//! - The fixed reading layout (clock, temperature band, channels, link)
//! - `ScreenRenderer`, which implements the core `DisplayRenderer` on top
//!   of any backend
//!
//! # Architecture
//!
//! The control loop only sees `DisplayRenderer`. The firmware wraps its
//! panel driver in a `DisplayBackend` and hands a `ScreenRenderer` to the
//! loop, so the layout can be tested on the host without hardware.

#![no_std]
#![deny(unsafe_code)]

pub mod backend;
pub mod layout;
pub mod renderer;
pub mod screen;

// Re-export key types
pub use backend::DisplayBackend;
pub use layout::{compose, TemperatureBand};
pub use renderer::ScreenRenderer;
pub use screen::{Screen, LINE_LEN, SCREEN_COLS, SCREEN_ROWS};
