//! Test doubles shared by the unit tests

use heapless::{String, Vec};

use crate::traits::{PumpActuator, StatusPublisher};

/// Pump that remembers its state and how often it was switched on
#[derive(Debug, Default)]
pub struct MockPump {
    on: bool,
    pub energize_count: u32,
}

impl MockPump {
    pub fn on() -> Self {
        Self {
            on: true,
            energize_count: 0,
        }
    }
}

impl PumpActuator for MockPump {
    fn energize(&mut self) {
        self.on = true;
        self.energize_count += 1;
    }

    fn deenergize(&mut self) {
        self.on = false;
    }

    fn is_energized(&self) -> bool {
        self.on
    }
}

/// One captured publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String<64>,
    pub payload: String<32>,
    pub retained: bool,
}

/// Publisher that records everything, optionally failing
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    pub sent: Vec<Published, 16>,
    pub fail: bool,
}

impl RecordingPublisher {
    pub fn payloads(&self) -> Vec<&str, 16> {
        self.sent.iter().map(|p| p.payload.as_str()).collect()
    }
}

impl StatusPublisher for RecordingPublisher {
    type Error = ();

    fn publish(&mut self, topic: &str, payload: &[u8], retained: bool) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        let payload = core::str::from_utf8(payload).map_err(|_| ())?;
        self.sent
            .push(Published {
                topic: String::try_from(topic)?,
                payload: String::try_from(payload)?,
                retained,
            })
            .map_err(|_| ())
    }
}
