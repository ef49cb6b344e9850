//! Minimal TOML parser for the node configuration
//!
//! Handles only the subset the node configuration uses. It does NOT
//! support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer, float, boolean)
//! - [section] headers
//! - Comments (# ...), including trailing comments
//!
//! NOT supported:
//! - Multi-line strings or escape sequences
//! - Arrays and inline tables
//! - Dotted keys

use heapless::String;

use super::types::NodeConfig;
use crate::calibration::HumidityPolicy;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Unknown key in a known section
    UnknownKey,
    /// Value of the wrong type or out of range
    InvalidValue,
    /// Line is neither a header nor a key = value pair
    InvalidLine,
    /// String longer than its buffer
    TooLong,
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Calibration,
    Schedule,
    Clock,
    Wifi,
    Mqtt,
}

/// Parse TOML text into a NodeConfig
///
/// Missing keys keep their defaults. The result is not validated; call
/// [`NodeConfig::validate`] afterwards.
pub fn parse_config(input: &str) -> Result<NodeConfig, ParseError> {
    let mut config = NodeConfig::new();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            let header = strip_comment(line);
            if !header.ends_with(']') {
                return Err(ParseError::InvalidSection);
            }
            section = parse_section_header(&header[1..header.len() - 1])?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidLine)?;
        apply_value(section, key, value, &mut config)?;
    }

    Ok(config)
}

/// Parse a section header like "calibration"
fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "calibration" => Ok(Section::Calibration),
        "schedule" => Ok(Section::Schedule),
        "clock" => Ok(Section::Clock),
        "wifi" => Ok(Section::Wifi),
        "mqtt" => Ok(Section::Mqtt),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Drop a trailing comment that is not inside a string
fn strip_comment(value: &str) -> &str {
    let mut in_string = false;
    for (i, c) in value.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return value[..i].trim(),
            _ => {}
        }
    }
    value
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = strip_comment(line[eq_pos + 1..].trim());

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> Result<&str, ParseError> {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        Ok(&value[1..value.len() - 1])
    } else {
        Err(ParseError::InvalidValue)
    }
}

/// Parse a string value into a bounded buffer
fn parse_bounded<const N: usize>(value: &str) -> Result<String<N>, ParseError> {
    String::try_from(parse_string(value)?).map_err(|_| ParseError::TooLong)
}

/// Parse an integer value
fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

/// Parse a float value (integers are accepted too)
fn parse_float(value: &str) -> Result<f32, ParseError> {
    let v: f32 = value.parse().map_err(|_| ParseError::InvalidValue)?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ParseError::InvalidValue)
    }
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut NodeConfig,
) -> Result<(), ParseError> {
    match section {
        Section::Root => return Err(ParseError::UnknownKey),
        Section::Calibration => {
            let c = &mut config.calibration;
            match key {
                "temperature_offset" => c.temperature_offset = parse_float(value)?,
                "altitude_m" => c.altitude_m = parse_float(value)?,
                "clamp_humidity" => {
                    c.humidity_policy = if parse_bool(value)? {
                        HumidityPolicy::Clamped
                    } else {
                        HumidityPolicy::Unclamped
                    }
                }
                _ => return Err(ParseError::UnknownKey),
            }
        }
        Section::Schedule => {
            let s = &mut config.schedule;
            match key {
                "tick_ms" => s.tick_ms = parse_int(value)?,
                "publish_interval_s" => s.publish_interval_s = parse_int(value)?,
                "publish_timeout_ms" => s.publish_timeout_ms = parse_int(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
        }
        Section::Clock => {
            let c = &mut config.clock;
            match key {
                "utc_offset_minutes" => c.utc_offset_minutes = parse_int(value)?,
                "ntp_server" => c.ntp_server = parse_bounded(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
        }
        Section::Wifi => {
            let w = &mut config.wifi;
            match key {
                "ssid" => w.ssid = parse_bounded(value)?,
                "password" => w.password = parse_bounded(value)?,
                "country" => w.country = parse_bounded(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
        }
        Section::Mqtt => {
            let m = &mut config.mqtt;
            match key {
                "broker" => m.broker = parse_bounded(value)?,
                "port" => m.port = parse_int(value)?,
                "client_id" => m.client_id = parse_bounded(value)?,
                "username" => m.username = parse_bounded(value)?,
                "password" => m.password = parse_bounded(value)?,
                "topic" => m.topic = parse_bounded(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
        }
    }

    Ok(())
}
