//! Control loop
//!
//! One tick acquires, corrects, stores, renders and (when due) publishes,
//! in that order. No step can stop a later one: sensor failures become
//! discarded samples, render failures are counted, publish failures are
//! recorded by the throttle.

use crate::calibration::{CalibrationConfig, Correction, LightCorrection};
use crate::clock::WallClock;
use crate::config::NodeConfig;
use crate::reading::CorrectedReading;
use crate::state::{Event, NodeState};
use crate::store::{Acquisition, ReadingStore};
use crate::throttle::{LinkStatus, PublishOutcome, PublishStats, PublishThrottle, Uplink};
use crate::traits::{
    Button, DisplayError, DisplayRenderer, EnvironmentSensor, InputSource, LightSensor,
    NetworkManager, RenderContext, StatusIndicator, TelemetryPublisher,
};

/// Source of tick instants
///
/// `next` waits for the next tick and returns its time in ms since boot.
/// `None` is the external shutdown request.
#[allow(async_fn_in_trait)]
pub trait TickSource {
    /// Wait for the next tick
    async fn next(&mut self) -> Option<u64>;
}

/// Local hardware collaborators
pub struct Hardware<'a, E, L, D, I, S> {
    /// Temperature, pressure and humidity sensor
    pub environment: &'a mut E,
    /// Ambient light sensor
    pub light: &'a mut L,
    /// Screen the reading is rendered to
    pub display: &'a mut D,
    /// Front panel buttons
    pub input: &'a mut I,
    /// Link status LED
    pub indicator: &'a mut S,
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// Tick time (ms since boot)
    pub now_ms: u64,
    /// Button pressed since the previous tick
    pub button: Option<Button>,
    /// Correction results for both sensors
    pub acquisition: Acquisition,
    /// Reading store changed
    pub stored: bool,
    /// Display result
    pub render: Result<(), DisplayError>,
    /// Throttle decision and attempt result
    pub publish: PublishOutcome,
    /// Wall clock was synchronised this tick
    pub clock_synced: bool,
    /// Publish counters after this tick
    pub stats: PublishStats,
}

/// The node control loop
#[derive(Debug, Clone)]
pub struct ControlLoop {
    calibration: CalibrationConfig,
    store: ReadingStore,
    throttle: PublishThrottle,
    clock: WallClock,
    state: NodeState,
    render_failures: u32,
}

impl ControlLoop {
    /// Create a control loop in the boot state
    pub const fn new(
        calibration: CalibrationConfig,
        publish_interval_s: u32,
        publish_timeout_ms: u32,
        utc_offset_minutes: i32,
    ) -> Self {
        Self {
            calibration,
            store: ReadingStore::new(),
            throttle: PublishThrottle::new(publish_interval_s, publish_timeout_ms),
            clock: WallClock::new(utc_offset_minutes),
            state: NodeState::Boot,
            render_failures: 0,
        }
    }

    /// Create a control loop from the node configuration
    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(
            config.calibration,
            config.schedule.publish_interval_s,
            config.schedule.publish_timeout_ms,
            config.clock.utc_offset_minutes,
        )
    }

    /// Feed a lifecycle event to the state machine
    pub fn handle(&mut self, event: Event) -> NodeState {
        self.state = self.state.transition(event);
        self.state
    }

    /// Current lifecycle state
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Snapshot of the stored reading
    pub fn reading(&self) -> CorrectedReading {
        self.store.get()
    }

    /// Reading store
    pub fn store(&self) -> &ReadingStore {
        &self.store
    }

    /// Publish throttle
    pub fn throttle(&self) -> &PublishThrottle {
        &self.throttle
    }

    /// Link status shown to the user
    pub fn link_status(&self) -> LinkStatus {
        self.throttle.link_status()
    }

    /// Number of failed renders since boot
    pub fn render_failures(&self) -> u32 {
        self.render_failures
    }

    /// Run one tick
    ///
    /// Returns `None` without touching any collaborator unless the node is
    /// running.
    pub async fn tick<E, L, D, I, S, N, P>(
        &mut self,
        now_ms: u64,
        hw: &mut Hardware<'_, E, L, D, I, S>,
        uplink: &mut Uplink<'_, N, P>,
    ) -> Option<TickReport>
    where
        E: EnvironmentSensor,
        L: LightSensor,
        D: DisplayRenderer,
        I: InputSource,
        S: StatusIndicator,
        N: NetworkManager,
        P: TelemetryPublisher,
    {
        if !self.state.is_running() {
            return None;
        }

        let button = hw.input.poll();

        let sync = uplink.network.take_time_sync();
        if let Some(sample) = sync {
            self.clock.sync(sample);
        }

        let acquisition = Acquisition {
            environment: Correction::from_read(hw.environment.read_raw(), &self.calibration),
            light: LightCorrection::from_read(hw.light.read_light()),
        };
        let stored = self.store.apply(&acquisition);

        let reading = self.store.get();
        let ctx = RenderContext {
            uptime_ms: now_ms,
            wall_time: self.clock.local_time(now_ms),
            link: self.throttle.link_status(),
            has_reading: self.store.has_valid_reading(),
        };
        let render = hw.display.render(&reading, &ctx);
        if render.is_err() {
            self.render_failures = self.render_failures.saturating_add(1);
        }

        let publish = self.throttle.maybe_publish(&reading, now_ms, uplink).await;
        if publish.is_attempt() {
            hw.indicator.show(self.throttle.link_status());
        }

        Some(TickReport {
            now_ms,
            button,
            acquisition,
            stored,
            render,
            publish,
            clock_synced: sync.is_some(),
            stats: *self.throttle.stats(),
        })
    }

    /// Drive ticks until shutdown or fault
    ///
    /// Marks boot complete if still booting. Each finished tick is handed to
    /// `on_tick`. Returns the terminal state.
    pub async fn run<T, E, L, D, I, S, N, P, F>(
        &mut self,
        ticks: &mut T,
        hw: &mut Hardware<'_, E, L, D, I, S>,
        uplink: &mut Uplink<'_, N, P>,
        mut on_tick: F,
    ) -> NodeState
    where
        T: TickSource,
        E: EnvironmentSensor,
        L: LightSensor,
        D: DisplayRenderer,
        I: InputSource,
        S: StatusIndicator,
        N: NetworkManager,
        P: TelemetryPublisher,
        F: FnMut(&TickReport),
    {
        if self.state == NodeState::Boot {
            self.handle(Event::BootComplete);
        }
        if self.state.is_running() {
            hw.indicator.show(self.throttle.link_status());
        }

        while self.state.is_running() {
            match ticks.next().await {
                Some(now_ms) => {
                    if let Some(report) = self.tick(now_ms, hw, uplink).await {
                        on_tick(&report);
                    }
                }
                None => {
                    self.handle(Event::Shutdown);
                }
            }
        }

        self.state
    }
}
