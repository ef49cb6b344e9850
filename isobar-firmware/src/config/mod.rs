//! Configuration loading
//!
//! The node configuration is compiled in from node.toml and parsed at boot
//! by the core's no_std TOML subset parser. build.rs has already run the
//! same parser, so a failure here means the image was built without it.

use defmt::*;
use isobar_core::config::{parse_config, ConfigError, NodeConfig, ParseError};

/// Embedded configuration (compiled into firmware)
/// Edit node.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../../node.toml");

/// Configuration loading errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum LoadError {
    /// TOML could not be parsed
    Parse(ParseError),
    /// Parsed values were rejected
    Invalid(ConfigError),
}

impl From<ParseError> for LoadError {
    fn from(e: ParseError) -> Self {
        LoadError::Parse(e)
    }
}

impl From<ConfigError> for LoadError {
    fn from(e: ConfigError) -> Self {
        LoadError::Invalid(e)
    }
}

/// Parse and validate the embedded configuration
pub fn load_config() -> Result<NodeConfig, LoadError> {
    let config = parse_config(EMBEDDED_CONFIG)?;
    config.validate()?;

    info!(
        "Config: tick={}ms, publish every {}s (timeout {}ms), offset={}C, altitude={}m",
        config.schedule.tick_ms,
        config.schedule.publish_interval_s,
        config.schedule.publish_timeout_ms,
        config.calibration.temperature_offset,
        config.calibration.altitude_m
    );
    if config.clamps_humidity() {
        info!("Humidity clamped to 0..100 %RH");
    }

    Ok(config)
}
