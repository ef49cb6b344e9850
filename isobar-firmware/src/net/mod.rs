//! Network collaborators
//!
//! - `wifi::maintain`: cyw43 association, DHCP and SNTP resync, run by the
//!   link task
//! - `WifiLink`: non-blocking link check (`NetworkManager`)
//! - `MqttPublisher`: one MQTT session per publish (`TelemetryPublisher`)
//!
//! The control loop bounds each publish attempt with `publish_timeout_ms`.

pub mod mqtt;
pub mod sntp;
pub mod wifi;

use defmt::*;
use embassy_net::dns::DnsQueryType;
use embassy_net::{IpAddress, Ipv4Address, Stack};

pub use mqtt::MqttPublisher;
pub use wifi::WifiLink;

/// Resolve a host name or dotted IPv4 literal
pub async fn resolve(stack: Stack<'static>, host: &str) -> Option<IpAddress> {
    if let Ok(address) = host.parse::<Ipv4Address>() {
        return Some(IpAddress::Ipv4(address));
    }

    match stack.dns_query(host, DnsQueryType::A).await {
        Ok(addresses) => addresses.first().copied(),
        Err(e) => {
            warn!("DNS lookup for {} failed: {:?}", host, Debug2Format(&e));
            None
        }
    }
}
