//! MQTT gateway task
//!
//! Owns the broker session. Routes inbound commands to the controller,
//! drains queued status publishes and keeps the retained availability
//! heartbeat going. Any transport error drops the session and reconnects
//! after [`RECONNECT_DELAY_MS`].
//!
//! The session loop only waits for the socket to become readable; it never
//! races a packet read against other work. Once bytes are waiting, a whole
//! packet is read before anything else is sent, so an MQTT packet is never
//! abandoned half-read.

use core::cell::RefCell;

use defmt::*;
use embassy_futures::select::{select3, Either3};
use embassy_net::tcp::{Error as TcpError, TcpSocket};
use embassy_net::{IpAddress, IpEndpoint, Ipv4Address, Stack};
use embassy_time::{Duration, Instant, Ticker, Timer};
use embedded_io_async::{ErrorType, Read, Write};
use rust_mqtt::client::client::MqttClient;
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion};
use rust_mqtt::packet::v5::publish_packet::QualityOfService;
use rust_mqtt::utils::rng_generator::CountingRng;

use barback_core::config::MqttConfig;
use barback_core::gateway::Gateway;
use barback_protocol::Command;

use crate::channels::{
    DispensePayload, Inbound, QueuePublisher, COMMAND_CHANNEL, EMERGENCY_STOP, OUTBOUND_CHANNEL,
};

/// Fixed delay between connection attempts
pub const RECONNECT_DELAY_MS: u64 = 2_000;

/// How often the heartbeat deadline is checked
const HEARTBEAT_POLL_MS: u64 = 1_000;

/// TCP socket timeout
const SOCKET_TIMEOUT_S: u64 = 10;

/// MQTT packet buffer sizes
const TX_BUFFER_LEN: usize = 512;
const RX_BUFFER_LEN: usize = 1024;

/// Maximum MQTT v5 properties per packet
const MAX_PROPERTIES: usize = 5;

/// Session failure, logged before reconnecting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum SessionError {
    /// TCP connect failed
    Connect,
    /// Broker refused or dropped the session
    Broker,
}

/// MQTT task - broker session with automatic reconnect
#[embassy_executor::task]
pub async fn mqtt_task(
    stack: Stack<'static>,
    settings: &'static MqttConfig,
    client_id: &'static str,
    mut gateway: Gateway,
) {
    info!("MQTT task started, client id {}", client_id);

    let broker = match settings.host_octets() {
        Ok([a, b, c, d]) => {
            IpEndpoint::new(IpAddress::Ipv4(Ipv4Address::new(a, b, c, d)), settings.port)
        }
        Err(e) => {
            error!("Broker address unusable: {:?}", e);
            return;
        }
    };

    loop {
        stack.wait_config_up().await;

        match run_session(stack, broker, settings, client_id, &mut gateway).await {
            Ok(()) => {}
            Err(e) => warn!("MQTT session ended: {:?}", e),
        }

        gateway.on_disconnected();
        info!("Reconnecting in {} ms", RECONNECT_DELAY_MS);
        Timer::after_millis(RECONNECT_DELAY_MS).await;
    }
}

async fn run_session(
    stack: Stack<'static>,
    broker: IpEndpoint,
    settings: &'static MqttConfig,
    client_id: &'static str,
    gateway: &mut Gateway,
) -> Result<(), SessionError> {
    let mut socket_rx = [0u8; RX_BUFFER_LEN];
    let mut socket_tx = [0u8; TX_BUFFER_LEN];
    let mut socket = TcpSocket::new(stack, &mut socket_rx, &mut socket_tx);
    socket.set_timeout(Some(Duration::from_secs(SOCKET_TIMEOUT_S)));

    if let Err(e) = socket.connect(broker).await {
        warn!("TCP connect to broker failed: {:?}", e);
        return Err(SessionError::Connect);
    }
    let socket = RefCell::new(socket);

    let will = gateway.last_will();
    let mut config: ClientConfig<'_, MAX_PROPERTIES, _> =
        ClientConfig::new(MqttVersion::MQTTv5, CountingRng(20_000));
    config.add_max_subscribe_qos(QualityOfService::QoS1);
    config.add_client_id(client_id);
    if !settings.user.is_empty() {
        config.add_username(&settings.user);
        config.add_password(&settings.password);
    }
    config.keep_alive = settings.keep_alive_s;
    config.max_packet_size = RX_BUFFER_LEN as u32;
    config.add_will(&will.topic, will.payload.as_bytes(), will.retained);

    let mut write_buffer = [0u8; TX_BUFFER_LEN];
    let mut recv_buffer = [0u8; RX_BUFFER_LEN];
    let mut client = MqttClient::<_, MAX_PROPERTIES, _>::new(
        SharedSocket(&socket),
        &mut write_buffer,
        TX_BUFFER_LEN,
        &mut recv_buffer,
        RX_BUFFER_LEN,
        config,
    );

    if let Err(e) = client.connect_to_broker().await {
        warn!("Broker refused connection: {:?}", Debug2Format(&e));
        return Err(SessionError::Broker);
    }
    info!("MQTT connected");

    for topic in gateway.topics().subscriptions() {
        if let Err(e) = client.subscribe_to_topic(topic).await {
            warn!("Subscribe to {} failed: {:?}", topic, Debug2Format(&e));
            return Err(SessionError::Broker);
        }
        info!("Subscribed to {}", topic);
    }

    let mut publisher = QueuePublisher;
    let mut heartbeat_poll = Ticker::every(Duration::from_millis(HEARTBEAT_POLL_MS));
    if let Err(e) = gateway.on_connected(&mut publisher, Instant::now().as_millis()) {
        warn!("Failed to queue connect announcement: {:?}", e);
    }

    loop {
        // Readiness only borrows the socket; dropping it loses nothing
        let readable = async { socket.borrow().wait_read_ready().await };

        match select3(readable, OUTBOUND_CHANNEL.receive(), heartbeat_poll.next()).await {
            Either3::First(()) => match client.receive_message().await {
                Ok((topic, payload)) => match gateway.route(topic, payload) {
                    Some(Command::EmergencyStop) => {
                        warn!("Emergency stop received");
                        EMERGENCY_STOP.signal(());
                        COMMAND_CHANNEL.send(Inbound::EmergencyStop).await;
                    }
                    Some(Command::MakeCocktail(payload)) => forward_dispense(payload).await,
                    None => debug!("Ignoring message on {}", topic),
                },
                Err(e) => {
                    warn!("Receive failed: {:?}", Debug2Format(&e));
                    return Err(SessionError::Broker);
                }
            },

            Either3::Second(message) => {
                if let Err(e) = client
                    .send_message(
                        &message.topic,
                        &message.payload,
                        QualityOfService::QoS0,
                        message.retained,
                    )
                    .await
                {
                    warn!("Publish to {} failed: {:?}", message.topic, Debug2Format(&e));
                    return Err(SessionError::Broker);
                }
                debug!("Published on {}", message.topic);
            }

            Either3::Third(()) => {
                match gateway.poll_heartbeat(&mut publisher, Instant::now().as_millis()) {
                    Ok(true) => trace!("Heartbeat queued"),
                    Ok(false) => {}
                    Err(e) => warn!("Failed to queue heartbeat: {:?}", e),
                }
            }
        }
    }
}

/// Copy a dispense payload out of the MQTT buffer and hand it to the controller
async fn forward_dispense(payload: &[u8]) {
    match DispensePayload::from_slice(payload) {
        Ok(payload) => {
            debug!("Dispense command ({} bytes)", payload.len());
            COMMAND_CHANNEL.send(Inbound::MakeCocktail(payload)).await;
        }
        Err(()) => warn!("Dispense command too long ({} bytes), dropped", payload.len()),
    }
}

/// TCP socket shared between the MQTT client and the readiness wait
///
/// The session loop never holds a readiness borrow while the client reads
/// or writes.
struct SharedSocket<'s, 'd>(&'s RefCell<TcpSocket<'d>>);

impl ErrorType for SharedSocket<'_, '_> {
    type Error = TcpError;
}

impl Read for SharedSocket<'_, '_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TcpError> {
        self.0.borrow_mut().read(buf).await
    }
}

impl Write for SharedSocket<'_, '_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, TcpError> {
        self.0.borrow_mut().write(buf).await
    }

    async fn flush(&mut self) -> Result<(), TcpError> {
        self.0.borrow_mut().flush().await
    }
}
