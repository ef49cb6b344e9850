//! Publish throttle and resilience policy
//!
//! Decides, once per tick, whether a publish attempt is due. Every attempt
//! moves the last-attempt time forward whether it succeeds or not, so a
//! broker that stays unreachable is retried at the publish interval and
//! never faster.
//!
//! Each attempt (link check, encode, publish) runs under one timeout. A call
//! that overruns it is dropped and the attempt fails with
//! [`PublishFailure::Timeout`], so a stuck broker cannot stall the tick.

use embassy_time::{with_timeout, Duration};

use crate::reading::CorrectedReading;
use crate::telemetry::{self, PayloadError};
use crate::traits::{NetworkError, NetworkManager, PublishError, TelemetryPublisher};

/// Default publish interval (seconds)
pub const DEFAULT_PUBLISH_INTERVAL_S: u32 = 60;

/// Why a publish attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishFailure {
    /// Wireless link could not be brought up
    Network(NetworkError),
    /// Broker connection or publish failed
    Publish(PublishError),
    /// Reading could not be encoded
    Payload(PayloadError),
    /// Attempt did not finish within the publish timeout
    Timeout,
}

impl From<NetworkError> for PublishFailure {
    fn from(e: NetworkError) -> Self {
        PublishFailure::Network(e)
    }
}

impl From<PublishError> for PublishFailure {
    fn from(e: PublishError) -> Self {
        PublishFailure::Publish(e)
    }
}

impl From<PayloadError> for PublishFailure {
    fn from(e: PayloadError) -> Self {
        PublishFailure::Payload(e)
    }
}

/// What the throttle did this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishOutcome {
    /// Interval not yet elapsed
    Skipped,
    /// An attempt was made
    Attempted(Result<(), PublishFailure>),
}

impl PublishOutcome {
    /// Check if an attempt was made
    pub fn is_attempt(&self) -> bool {
        matches!(self, PublishOutcome::Attempted(_))
    }

    /// Check if an attempt was made and failed
    pub fn is_failure(&self) -> bool {
        matches!(self, PublishOutcome::Attempted(Err(_)))
    }
}

/// Link status as seen by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkStatus {
    /// No attempt has succeeded yet and none has failed
    NotYetPublished,
    /// Last attempt succeeded
    Published,
    /// Last attempt failed
    Failing,
}

/// Throttle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PublishState {
    /// Time of the last attempt (ms since boot), None before the first
    pub last_attempt_ms: Option<u64>,
    /// Minimum spacing between attempts (seconds)
    pub interval_s: u32,
    /// Whether the last attempt succeeded
    pub last_succeeded: bool,
}

impl PublishState {
    /// Create a state whose first check is immediately due
    pub const fn new(interval_s: u32) -> Self {
        Self {
            last_attempt_ms: None,
            interval_s,
            last_succeeded: false,
        }
    }

    /// Check if an attempt is due at `now_ms`
    pub fn is_due(&self, now_ms: u64) -> bool {
        match self.last_attempt_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms(),
        }
    }

    /// Publish interval in milliseconds
    pub fn interval_ms(&self) -> u64 {
        self.interval_s as u64 * 1000
    }
}

/// Publish counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PublishStats {
    /// Attempts made
    pub attempts: u32,
    /// Attempts that succeeded
    pub successes: u32,
    /// Attempts that failed
    pub failures: u32,
    /// Failures since the last success
    pub consecutive_failures: u32,
}

/// Network collaborators used for one publish attempt
pub struct Uplink<'a, N, P> {
    /// Wireless link manager
    pub network: &'a mut N,
    /// Telemetry sink client
    pub publisher: &'a mut P,
    /// Topic readings are published to
    pub topic: &'a str,
}

/// Publish throttle
#[derive(Debug, Clone)]
pub struct PublishThrottle {
    state: PublishState,
    stats: PublishStats,
    timeout_ms: u32,
}

impl PublishThrottle {
    /// Create a throttle with the given interval and per-attempt timeout
    pub const fn new(interval_s: u32, timeout_ms: u32) -> Self {
        Self {
            timeout_ms,
            state: PublishState::new(interval_s),
            stats: PublishStats {
                attempts: 0,
                successes: 0,
                failures: 0,
                consecutive_failures: 0,
            },
        }
    }

    /// Publish the reading if the interval has elapsed
    ///
    /// At most one attempt per call, never retried within the call.
    pub async fn maybe_publish<N, P>(
        &mut self,
        reading: &CorrectedReading,
        now_ms: u64,
        uplink: &mut Uplink<'_, N, P>,
    ) -> PublishOutcome
    where
        N: NetworkManager,
        P: TelemetryPublisher,
    {
        if !self.state.is_due(now_ms) {
            return PublishOutcome::Skipped;
        }

        // Spacing is enforced from the start of the attempt, not its outcome
        self.state.last_attempt_ms = Some(now_ms);

        let timeout = Duration::from_millis(self.timeout_ms as u64);
        let result = match with_timeout(timeout, attempt(reading, uplink)).await {
            Ok(result) => result,
            Err(_) => Err(PublishFailure::Timeout),
        };
        self.record(result);
        PublishOutcome::Attempted(result)
    }

    fn record(&mut self, result: Result<(), PublishFailure>) {
        self.stats.attempts = self.stats.attempts.saturating_add(1);
        match result {
            Ok(()) => {
                self.state.last_succeeded = true;
                self.stats.successes = self.stats.successes.saturating_add(1);
                self.stats.consecutive_failures = 0;
            }
            Err(_) => {
                self.state.last_succeeded = false;
                self.stats.failures = self.stats.failures.saturating_add(1);
                self.stats.consecutive_failures = self.stats.consecutive_failures.saturating_add(1);
            }
        }
    }

    /// Get the throttle state
    pub fn state(&self) -> &PublishState {
        &self.state
    }

    /// Get the publish counters
    pub fn stats(&self) -> &PublishStats {
        &self.stats
    }

    /// Bound on one attempt (ms)
    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Get the user-facing link status
    pub fn link_status(&self) -> LinkStatus {
        match (self.stats.attempts, self.state.last_succeeded) {
            (0, _) => LinkStatus::NotYetPublished,
            (_, true) => LinkStatus::Published,
            (_, false) => LinkStatus::Failing,
        }
    }
}

async fn attempt<N, P>(
    reading: &CorrectedReading,
    uplink: &mut Uplink<'_, N, P>,
) -> Result<(), PublishFailure>
where
    N: NetworkManager,
    P: TelemetryPublisher,
{
    uplink.network.ensure_connected().await?;
    let payload = telemetry::encode(reading)?;
    uplink
        .publisher
        .publish(uplink.topic, payload.as_bytes())
        .await?;
    Ok(())
}
