//! Tick source for the control loop
//!
//! Ticks come from an embassy `Ticker`, so a slow tick (a publish that
//! used its whole budget) does not shift later ticks. Timestamps are
//! milliseconds since boot.

use embassy_time::{Duration, Instant, Ticker};
use isobar_core::scheduler::TickSource;

/// Periodic tick source
pub struct TickerSource {
    ticker: Ticker,
}

impl TickerSource {
    pub fn new(tick_ms: u32) -> Self {
        Self {
            ticker: Ticker::every(Duration::from_millis(tick_ms as u64)),
        }
    }
}

impl TickSource for TickerSource {
    async fn next(&mut self) -> Option<u64> {
        self.ticker.next().await;
        Some(Instant::now().as_millis())
    }
}
