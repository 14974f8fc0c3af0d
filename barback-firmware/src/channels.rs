//! Inter-task communication channels
//!
//! Defines the static channels used for communication between Embassy tasks.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use heapless::Vec;

use barback_core::traits::StatusPublisher;
use barback_protocol::Topic;

/// Largest dispense payload forwarded to the controller
pub const MAX_PAYLOAD_LEN: usize = 512;

/// Largest outbound payload (status and availability strings)
pub const MAX_OUTBOUND_LEN: usize = 32;

/// Channel capacity for inbound commands
const COMMAND_CHANNEL_SIZE: usize = 4;

/// Channel capacity for outbound publishes
const OUTBOUND_CHANNEL_SIZE: usize = 8;

/// Raw make-cocktail payload
pub type DispensePayload = Vec<u8, MAX_PAYLOAD_LEN>;

/// A routed command, queued in arrival order
#[derive(Debug, Clone)]
pub enum Inbound {
    MakeCocktail(DispensePayload),
    EmergencyStop,
}

/// A publish waiting for the MQTT task
#[derive(Debug, Clone)]
pub struct Outbound {
    pub topic: Topic,
    pub payload: Vec<u8, MAX_OUTBOUND_LEN>,
    pub retained: bool,
}

/// Commands from the MQTT task to the controller, in arrival order
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, Inbound, COMMAND_CHANNEL_SIZE> =
    Channel::new();

/// Emergency stop raised ahead of the queue
///
/// Every stop is also queued on [`COMMAND_CHANNEL`] so it keeps its place
/// relative to dispense commands.
pub static EMERGENCY_STOP: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Publishes queued for the broker
pub static OUTBOUND_CHANNEL: Channel<CriticalSectionRawMutex, Outbound, OUTBOUND_CHANNEL_SIZE> =
    Channel::new();

/// Why a publish could not be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueError {
    /// Topic or payload longer than the queue entry
    TooLong,
    /// Outbound queue is full
    Full,
}

/// [`StatusPublisher`] that queues onto [`OUTBOUND_CHANNEL`]
pub struct QueuePublisher;

impl StatusPublisher for QueuePublisher {
    type Error = QueueError;

    fn publish(&mut self, topic: &str, payload: &[u8], retained: bool) -> Result<(), QueueError> {
        let message = Outbound {
            topic: Topic::try_from(topic).map_err(|_| QueueError::TooLong)?,
            payload: Vec::from_slice(payload).map_err(|_| QueueError::TooLong)?,
            retained,
        };
        OUTBOUND_CHANNEL
            .try_send(message)
            .map_err(|_| QueueError::Full)
    }
}
