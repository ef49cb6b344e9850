//! Wi-Fi link
//!
//! The link task owns the cyw43 control handle. It joins, rejoins after a
//! drop and resynchronises the clock, paced by [`LinkSupervisor`]. The
//! control loop only holds a [`WifiLink`], whose link check never waits.

use cyw43::JoinOptions;
use defmt::*;
use embassy_net::Stack;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{with_timeout, Duration, Instant, Timer};
use isobar_core::clock::TimeSync;
use isobar_core::config::{ClockConfig, WifiConfig};
use isobar_core::link::{LinkAction, LinkPolicy, LinkSupervisor};
use isobar_core::traits::{NetworkError, NetworkManager};

use super::sntp;

const JOIN_TIMEOUT: Duration = Duration::from_secs(20);
const LINK_TIMEOUT: Duration = Duration::from_secs(10);
const DHCP_TIMEOUT: Duration = Duration::from_secs(15);
const SNTP_TIMEOUT: Duration = Duration::from_secs(3);
const POLL_PERIOD: Duration = Duration::from_millis(500);

/// Latest network time sample, taken by the control loop
static TIME_SYNC: Signal<CriticalSectionRawMutex, TimeSync> = Signal::new();

/// Control loop view of the link
pub struct WifiLink {
    stack: Stack<'static>,
}

impl WifiLink {
    pub fn new(stack: Stack<'static>) -> Self {
        Self { stack }
    }
}

impl NetworkManager for WifiLink {
    async fn ensure_connected(&mut self) -> Result<(), NetworkError> {
        if !self.stack.is_link_up() {
            return Err(NetworkError::LinkDown);
        }
        if self.stack.config_v4().is_none() {
            return Err(NetworkError::NoAddress);
        }
        Ok(())
    }

    fn take_time_sync(&mut self) -> Option<TimeSync> {
        TIME_SYNC.try_take()
    }
}

fn is_up(stack: Stack<'static>) -> bool {
    stack.is_link_up() && stack.config_v4().is_some()
}

/// Keep the link up and the clock fresh
pub async fn maintain(
    mut control: cyw43::Control<'static>,
    stack: Stack<'static>,
    wifi: &WifiConfig,
    clock: &ClockConfig,
) -> ! {
    let mut supervisor = LinkSupervisor::new(LinkPolicy::default());

    loop {
        let drops = supervisor.drops();
        let action = supervisor.next_action(Instant::now().as_millis(), is_up(stack));
        if supervisor.drops() != drops {
            warn!("Wi-Fi link lost, rejoining");
        }

        match action {
            LinkAction::Join => {
                info!("Joining Wi-Fi network {}", wifi.ssid.as_str());
                let result = join(&mut control, stack, wifi).await;
                supervisor.record_join(Instant::now().as_millis(), result.is_ok());
                if let Err(e) = result {
                    warn!(
                        "Wi-Fi join failed: {} ({} in a row)",
                        e,
                        supervisor.join_failures()
                    );
                    control.leave().await;
                }
            }
            LinkAction::Sync => {
                let ok = sync_clock(stack, clock).await;
                supervisor.record_sync(Instant::now().as_millis(), ok);
            }
            LinkAction::Wait => Timer::after(POLL_PERIOD).await,
        }
    }
}

/// Associate, then wait for the link and a DHCP lease
async fn join(
    control: &mut cyw43::Control<'static>,
    stack: Stack<'static>,
    wifi: &WifiConfig,
) -> Result<(), NetworkError> {
    let options = JoinOptions::new(wifi.password.as_bytes());
    match with_timeout(JOIN_TIMEOUT, control.join(wifi.ssid.as_str(), options)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            debug!("Wi-Fi join status={}", e.status);
            return Err(NetworkError::JoinFailed);
        }
        Err(_) => return Err(NetworkError::Timeout),
    }

    with_timeout(LINK_TIMEOUT, stack.wait_link_up())
        .await
        .map_err(|_| NetworkError::Timeout)?;
    with_timeout(DHCP_TIMEOUT, stack.wait_config_up())
        .await
        .map_err(|_| NetworkError::NoAddress)?;

    if let Some(config) = stack.config_v4() {
        info!("Wi-Fi up, address {}", config.address);
    }
    Ok(())
}

/// Query the configured NTP server once and hand the sample over
async fn sync_clock(stack: Stack<'static>, clock: &ClockConfig) -> bool {
    let server = clock.ntp_server.as_str();
    match with_timeout(SNTP_TIMEOUT, sntp::query(stack, server)).await {
        Ok(Ok(sample)) => {
            info!("SNTP: unix time {}", sample.unix_secs);
            TIME_SYNC.signal(sample);
            true
        }
        Ok(Err(e)) => {
            warn!("SNTP failed: {}", e);
            false
        }
        Err(_) => {
            warn!("SNTP: no reply from {}", server);
            false
        }
    }
}
