//! Configuration type definitions
//!
//! The node configuration is embedded in the firmware image as TOML and
//! parsed once at boot. It never changes while the node runs.

use heapless::String;

use crate::calibration::{CalibrationConfig, HumidityPolicy};
use crate::throttle::DEFAULT_PUBLISH_INTERVAL_S;

/// Maximum Wi-Fi SSID length
pub const MAX_SSID_LEN: usize = 32;

/// Maximum secret length (Wi-Fi passphrase, broker password)
pub const MAX_SECRET_LEN: usize = 64;

/// Maximum host name length
pub const MAX_HOST_LEN: usize = 64;

/// Maximum broker user / client id length
pub const MAX_NAME_LEN: usize = 32;

/// Maximum topic length
pub const MAX_TOPIC_LEN: usize = 64;

/// Default control loop tick (ms)
pub const DEFAULT_TICK_MS: u32 = 1000;

/// Default MQTT client id
pub const DEFAULT_CLIENT_ID: &str = "EnviroPlusPack";

/// Default publish topic
pub const DEFAULT_TOPIC: &str = "enviro/readings";

/// Default network time server
pub const DEFAULT_NTP_SERVER: &str = "pool.ntp.org";

/// Control loop cadences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScheduleConfig {
    /// Control loop period (ms)
    pub tick_ms: u32,
    /// Minimum spacing of publish attempts (s)
    pub publish_interval_s: u32,
    /// Bound on one publish attempt (ms)
    pub publish_timeout_ms: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            publish_interval_s: DEFAULT_PUBLISH_INTERVAL_S,
            publish_timeout_ms: DEFAULT_TICK_MS,
        }
    }
}

/// Wall clock settings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// Local time offset from UTC (minutes)
    pub utc_offset_minutes: i32,
    /// Network time server host
    pub ntp_server: String<MAX_HOST_LEN>,
}

impl Default for ClockConfig {
    fn default() -> Self {
        let mut ntp_server = String::new();
        let _ = ntp_server.push_str(DEFAULT_NTP_SERVER);
        Self {
            utc_offset_minutes: 0,
            ntp_server,
        }
    }
}

/// Wireless network credentials
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WifiConfig {
    pub ssid: String<MAX_SSID_LEN>,
    pub password: String<MAX_SECRET_LEN>,
    /// ISO 3166 country code for the radio regulatory domain
    pub country: String<2>,
}

/// Telemetry sink settings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MqttConfig {
    /// Broker host name or dotted IPv4 address
    pub broker: String<MAX_HOST_LEN>,
    pub port: u16,
    pub client_id: String<MAX_NAME_LEN>,
    /// Empty means anonymous
    pub username: String<MAX_NAME_LEN>,
    pub password: String<MAX_SECRET_LEN>,
    pub topic: String<MAX_TOPIC_LEN>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        let mut client_id = String::new();
        let _ = client_id.push_str(DEFAULT_CLIENT_ID);
        let mut topic = String::new();
        let _ = topic.push_str(DEFAULT_TOPIC);
        Self {
            broker: String::new(),
            port: 1883,
            client_id,
            username: String::new(),
            password: String::new(),
            topic,
        }
    }
}

/// Complete node configuration
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeConfig {
    pub calibration: CalibrationConfig,
    pub schedule: ScheduleConfig,
    pub clock: ClockConfig,
    pub wifi: WifiConfig,
    pub mqtt: MqttConfig,
}

/// Semantic configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Calibration offset or altitude not finite
    InvalidCalibration,
    /// Tick period is zero
    ZeroTick,
    /// Publish interval is zero
    ZeroInterval,
    /// Publish timeout is zero or longer than one tick
    InvalidTimeout,
    /// UTC offset outside -12:00..=+14:00
    InvalidUtcOffset,
    /// Wi-Fi SSID missing
    MissingSsid,
    /// Broker address missing
    MissingBroker,
    /// Topic missing
    MissingTopic,
    /// Client id missing
    MissingClientId,
    /// Broker port is zero
    InvalidPort,
}

impl NodeConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the configuration for values the node cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.calibration.is_valid() {
            return Err(ConfigError::InvalidCalibration);
        }

        let schedule = &self.schedule;
        if schedule.tick_ms == 0 {
            return Err(ConfigError::ZeroTick);
        }
        if schedule.publish_interval_s == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if schedule.publish_timeout_ms == 0 || schedule.publish_timeout_ms > schedule.tick_ms {
            return Err(ConfigError::InvalidTimeout);
        }

        if !(-720..=840).contains(&self.clock.utc_offset_minutes) {
            return Err(ConfigError::InvalidUtcOffset);
        }

        if self.wifi.ssid.is_empty() {
            return Err(ConfigError::MissingSsid);
        }

        let mqtt = &self.mqtt;
        if mqtt.broker.is_empty() {
            return Err(ConfigError::MissingBroker);
        }
        if mqtt.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if mqtt.client_id.is_empty() {
            return Err(ConfigError::MissingClientId);
        }
        if mqtt.topic.is_empty() {
            return Err(ConfigError::MissingTopic);
        }

        Ok(())
    }

    /// Check if humidity output is clamped to 0..=100
    pub fn clamps_humidity(&self) -> bool {
        self.calibration.humidity_policy == HumidityPolicy::Clamped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> NodeConfig {
        let mut config = NodeConfig::new();
        config.wifi.ssid.push_str("lab").unwrap();
        config.mqtt.broker.push_str("192.168.1.10").unwrap();
        config
    }

    #[test]
    fn test_defaults() {
        let config = NodeConfig::new();
        assert_eq!(config.calibration.temperature_offset, -7.5);
        assert_eq!(config.calibration.altitude_m, 75.0);
        assert_eq!(config.schedule.tick_ms, 1000);
        assert_eq!(config.schedule.publish_interval_s, 60);
        assert_eq!(config.mqtt.client_id.as_str(), "EnviroPlusPack");
        assert_eq!(config.mqtt.port, 1883);
        assert!(!config.clamps_humidity());
    }

    #[test]
    fn test_valid_config_passes() {
        assert_eq!(valid().validate(), Ok(()));
    }

    #[test]
    fn test_missing_credentials_rejected() {
        assert_eq!(NodeConfig::new().validate(), Err(ConfigError::MissingSsid));

        let mut config = valid();
        config.mqtt.broker.clear();
        assert_eq!(config.validate(), Err(ConfigError::MissingBroker));
    }

    #[test]
    fn test_schedule_rules() {
        let mut config = valid();
        config.schedule.tick_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroTick));

        let mut config = valid();
        config.schedule.publish_interval_s = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval));

        let mut config = valid();
        config.schedule.publish_timeout_ms = 1001;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTimeout));
    }

    #[test]
    fn test_non_finite_calibration_rejected() {
        let mut config = valid();
        config.calibration.altitude_m = f32::NAN;
        assert_eq!(config.validate(), Err(ConfigError::InvalidCalibration));
    }

    #[test]
    fn test_utc_offset_range() {
        let mut config = valid();
        config.clock.utc_offset_minutes = 841;
        assert_eq!(config.validate(), Err(ConfigError::InvalidUtcOffset));
        config.clock.utc_offset_minutes = -720;
        assert_eq!(config.validate(), Ok(()));
    }
}
