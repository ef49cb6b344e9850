//! Network traits
//!
//! Both traits are async: a publish attempt is the only place the control
//! loop may suspend mid-tick. The throttle runs each attempt under the
//! publish timeout and drops the future when it expires, so calls must be
//! safe to cancel at any await point.

use crate::clock::TimeSync;

/// Errors from bringing up the wireless link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetworkError {
    /// Link is down and has not been re-established yet
    LinkDown,
    /// Association with the access point failed
    JoinFailed,
    /// Link is up but no address was assigned
    NoAddress,
    /// Operation did not finish within the allowed time
    Timeout,
}

/// Errors from publishing to the telemetry sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishError {
    /// Broker address could not be resolved or reached
    Unreachable,
    /// Broker rejected the connection (credentials, client id)
    Rejected,
    /// Transport failed mid-operation
    Transport,
    /// Operation did not finish within the allowed time
    Timeout,
}

/// Trait for the wireless link
#[allow(async_fn_in_trait)]
pub trait NetworkManager {
    /// Check that the link is up and can carry a publish
    async fn ensure_connected(&mut self) -> Result<(), NetworkError>;

    /// Take a network time sample obtained since the last call, if any
    fn take_time_sync(&mut self) -> Option<TimeSync> {
        None
    }
}

/// Trait for the telemetry sink client
#[allow(async_fn_in_trait)]
pub trait TelemetryPublisher {
    /// Publish one payload to a topic
    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError>;
}
