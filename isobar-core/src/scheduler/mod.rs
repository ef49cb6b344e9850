//! Control loop scheduler
//!
//! Drives acquisition, display refresh and publishing from a single tick
//! source. Publishing runs at its own, slower cadence gated by the publish
//! throttle.

pub mod control;

pub use control::{ControlLoop, Hardware, TickReport, TickSource};
