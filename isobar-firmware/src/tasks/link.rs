//! Wi-Fi link supervision task

use embassy_net::Stack;
use isobar_core::config::NodeConfig;

use crate::net::wifi;

/// Join, rejoin and clock resync, independent of the control loop tick
#[embassy_executor::task]
pub async fn link_task(
    control: cyw43::Control<'static>,
    stack: Stack<'static>,
    config: &'static NodeConfig,
) -> ! {
    wifi::maintain(control, stack, &config.wifi, &config.clock).await
}
