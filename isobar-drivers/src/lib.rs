//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the sensor traits
//! defined in isobar-core, written against `embedded-hal` I2C:
//!
//! - BME68x temperature / pressure / humidity sensor (forced mode, heater off)
//! - LTR-559 ambient light sensor

#![no_std]
#![deny(unsafe_code)]

pub mod sensor;
