//! MQTT telemetry publisher
//!
//! Each publish opens a TCP connection, runs an MQTT v5 CONNECT, sends one
//! QoS 0 message and disconnects. The control loop drops the exchange when
//! the publish timeout expires.

use defmt::*;
use embassy_net::tcp::TcpSocket;
use embassy_net::Stack;
use embassy_time::Duration;
use isobar_core::config::MqttConfig;
use isobar_core::traits::{PublishError, TelemetryPublisher};
use rust_mqtt::client::client::MqttClient;
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion};
use rust_mqtt::packet::v5::publish_packet::QualityOfService;
use rust_mqtt::utils::rng_generator::CountingRng;

use super::resolve;

const TCP_BUFFER_LEN: usize = 1024;
const MQTT_BUFFER_LEN: usize = 256;
const MAX_PROPERTIES: usize = 5;
const SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// rust-mqtt backed telemetry publisher
pub struct MqttPublisher<'a> {
    stack: Stack<'static>,
    config: &'a MqttConfig,
}

impl<'a> MqttPublisher<'a> {
    pub fn new(stack: Stack<'static>, config: &'a MqttConfig) -> Self {
        Self { stack, config }
    }
}

impl TelemetryPublisher for MqttPublisher<'_> {
    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let broker = self.config.broker.as_str();
        let address = resolve(self.stack, broker)
            .await
            .ok_or(PublishError::Unreachable)?;

        let mut rx_buffer = [0u8; TCP_BUFFER_LEN];
        let mut tx_buffer = [0u8; TCP_BUFFER_LEN];
        let mut socket = TcpSocket::new(self.stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(SOCKET_TIMEOUT));
        socket
            .connect((address, self.config.port))
            .await
            .map_err(|e| {
                warn!("MQTT: TCP connect to {} failed: {:?}", broker, e);
                PublishError::Unreachable
            })?;

        let mut client_config = ClientConfig::new(MqttVersion::MQTTv5, CountingRng(20000));
        client_config.add_client_id(self.config.client_id.as_str());
        if !self.config.username.is_empty() {
            client_config.add_username(self.config.username.as_str());
            client_config.add_password(self.config.password.as_str());
        }
        client_config.max_packet_size = MQTT_BUFFER_LEN as u32;

        let mut write_buffer = [0u8; MQTT_BUFFER_LEN];
        let mut recv_buffer = [0u8; MQTT_BUFFER_LEN];
        let mut client = MqttClient::<_, MAX_PROPERTIES, _>::new(
            socket,
            &mut write_buffer,
            MQTT_BUFFER_LEN,
            &mut recv_buffer,
            MQTT_BUFFER_LEN,
            client_config,
        );

        client.connect_to_broker().await.map_err(|code| {
            warn!("MQTT: broker refused connection: {:?}", Debug2Format(&code));
            PublishError::Rejected
        })?;

        client
            .send_message(topic, payload, QualityOfService::QoS0, false)
            .await
            .map_err(|code| {
                warn!("MQTT: publish failed: {:?}", Debug2Format(&code));
                PublishError::Transport
            })?;

        // The message is out; a failed DISCONNECT does not undo it
        if client.disconnect().await.is_err() {
            debug!("MQTT: disconnect not acknowledged");
        }
        Ok(())
    }
}
