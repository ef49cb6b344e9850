//! Board-agnostic core logic for the Isobar telemetry node
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Calibration engine (raw sample → corrected reading)
//! - Reading store (last known good reading set)
//! - Publish throttle and resilience policy
//! - Wireless link supervision (join backoff, clock resync)
//! - Control loop scheduler and node state machine
//! - Collaborator traits (sensors, display, network, input, status LED)
//! - Configuration types and the embedded TOML parser
//! - Telemetry payload encoding and wall clock conversion

#![no_std]
#![deny(unsafe_code)]

pub mod calibration;
pub mod clock;
pub mod config;
pub mod link;
pub mod reading;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod throttle;
pub mod traits;
