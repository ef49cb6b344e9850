//! SNTP client
//!
//! One request, one response. Packet layout and validation live in
//! `isobar_core::clock`; this module only moves bytes over UDP.

use defmt::*;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::Stack;
use embassy_time::Instant;
use isobar_core::clock::{parse_sntp_response, sntp_request, ClockError, TimeSync, NTP_PACKET_LEN};

use super::resolve;

const NTP_PORT: u16 = 123;

/// SNTP query failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum SntpError {
    /// Server name did not resolve
    Resolve,
    /// Socket could not be bound or the request not sent
    Socket,
    /// Reply was rejected
    Reply(ClockError),
}

/// Ask `server` for the current time
///
/// The caller bounds the wait with a timeout.
pub async fn query(stack: Stack<'static>, server: &str) -> Result<TimeSync, SntpError> {
    let address = resolve(stack, server).await.ok_or(SntpError::Resolve)?;

    let mut rx_meta = [PacketMetadata::EMPTY; 1];
    let mut rx_buffer = [0u8; 128];
    let mut tx_meta = [PacketMetadata::EMPTY; 1];
    let mut tx_buffer = [0u8; 128];
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );
    socket.bind(0).map_err(|_| SntpError::Socket)?;

    socket
        .send_to(&sntp_request(), (address, NTP_PORT))
        .await
        .map_err(|_| SntpError::Socket)?;

    let mut packet = [0u8; NTP_PACKET_LEN];
    let (len, _) = socket
        .recv_from(&mut packet)
        .await
        .map_err(|_| SntpError::Socket)?;

    let unix_secs = parse_sntp_response(&packet[..len]).map_err(SntpError::Reply)?;
    debug!("SNTP: {} says {}", server, unix_secs);

    Ok(TimeSync {
        unix_secs,
        uptime_ms: Instant::now().as_millis(),
    })
}
