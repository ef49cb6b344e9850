//! Wireless link supervision policy
//!
//! Decides what the background link task does next: join the network,
//! resynchronise the clock, or wait. Joins back off exponentially after
//! failures; once the link is up the clock is synchronised immediately and
//! then again every resync interval.
//!
//! The policy is time-driven by `now_ms` and owns no hardware, so the
//! firmware task only has to execute the returned [`LinkAction`] and report
//! the result back.

/// First delay after a failed join (ms)
pub const DEFAULT_JOIN_BACKOFF_MIN_MS: u64 = 2_000;

/// Longest delay between join attempts (ms)
pub const DEFAULT_JOIN_BACKOFF_MAX_MS: u64 = 60_000;

/// Clock resynchronisation period (ms)
pub const DEFAULT_RESYNC_INTERVAL_MS: u64 = 15 * 60_000;

/// Delay before retrying a failed clock sync (ms)
pub const DEFAULT_SYNC_RETRY_MS: u64 = 30_000;

/// Link timing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkPolicy {
    /// First delay after a failed join (ms)
    pub join_backoff_min_ms: u64,
    /// Cap on the join delay (ms)
    pub join_backoff_max_ms: u64,
    /// Period between successful clock syncs (ms)
    pub resync_interval_ms: u64,
    /// Delay before retrying a failed clock sync (ms)
    pub sync_retry_ms: u64,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self {
            join_backoff_min_ms: DEFAULT_JOIN_BACKOFF_MIN_MS,
            join_backoff_max_ms: DEFAULT_JOIN_BACKOFF_MAX_MS,
            resync_interval_ms: DEFAULT_RESYNC_INTERVAL_MS,
            sync_retry_ms: DEFAULT_SYNC_RETRY_MS,
        }
    }
}

/// Next step for the link task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkAction {
    /// Nothing to do until the next check
    Wait,
    /// Associate and obtain an address
    Join,
    /// Query the network time server
    Sync,
}

/// Link supervisor state
#[derive(Debug, Clone)]
pub struct LinkSupervisor {
    policy: LinkPolicy,
    up: bool,
    next_join_ms: u64,
    backoff_ms: u64,
    next_sync_ms: u64,
    join_failures: u32,
    drops: u32,
}

impl LinkSupervisor {
    /// Create a supervisor whose first join is immediately due
    pub fn new(policy: LinkPolicy) -> Self {
        Self {
            policy,
            up: false,
            next_join_ms: 0,
            backoff_ms: policy.join_backoff_min_ms,
            next_sync_ms: 0,
            join_failures: 0,
            drops: 0,
        }
    }

    /// Decide the next action given the current link state
    pub fn next_action(&mut self, now_ms: u64, link_up: bool) -> LinkAction {
        if link_up {
            if !self.up {
                self.up = true;
                self.reset_backoff();
            }
            if now_ms >= self.next_sync_ms {
                return LinkAction::Sync;
            }
            return LinkAction::Wait;
        }

        if self.up {
            // Dropped link: rejoin right away, then back off
            self.up = false;
            self.drops = self.drops.saturating_add(1);
            self.next_join_ms = now_ms;
            self.reset_backoff();
        }

        if now_ms >= self.next_join_ms {
            LinkAction::Join
        } else {
            LinkAction::Wait
        }
    }

    /// Record the result of a join attempt finished at `now_ms`
    pub fn record_join(&mut self, now_ms: u64, ok: bool) {
        if ok {
            self.join_failures = 0;
            self.reset_backoff();
            return;
        }

        self.join_failures = self.join_failures.saturating_add(1);
        self.next_join_ms = now_ms.saturating_add(self.backoff_ms);
        self.backoff_ms = self
            .backoff_ms
            .saturating_mul(2)
            .min(self.policy.join_backoff_max_ms);
    }

    /// Record the result of a clock sync finished at `now_ms`
    pub fn record_sync(&mut self, now_ms: u64, ok: bool) {
        let delay = if ok {
            self.policy.resync_interval_ms
        } else {
            self.policy.sync_retry_ms
        };
        self.next_sync_ms = now_ms.saturating_add(delay);
    }

    /// Check if the link was up at the last decision
    pub fn is_up(&self) -> bool {
        self.up
    }

    /// Failed joins since the last success
    pub fn join_failures(&self) -> u32 {
        self.join_failures
    }

    /// Times an established link was lost
    pub fn drops(&self) -> u32 {
        self.drops
    }

    /// Delay that will follow the next failed join (ms)
    pub fn backoff_ms(&self) -> u64 {
        self.backoff_ms
    }

    fn reset_backoff(&mut self) {
        self.backoff_ms = self.policy.join_backoff_min_ms;
    }
}
