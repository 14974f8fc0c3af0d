//! Messaging gateway helpers
//!
//! Transport-independent half of the MQTT gateway: which topic and payload
//! each outbound message uses, the connect announcement and the availability
//! heartbeat. The firmware supplies a [`StatusPublisher`] over its broker
//! session and calls into this module.

use barback_protocol::{Availability, Command, Topic, Topics, HELLO_MESSAGE};

use crate::session::SessionEvent;
use crate::traits::StatusPublisher;

/// Default availability heartbeat period
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u32 = 30_000;

/// Broker last-will registration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LastWill {
    pub topic: Topic,
    pub payload: &'static str,
    pub retained: bool,
}

/// Publish the status message for a session event
pub fn publish_event<P: StatusPublisher>(
    publisher: &mut P,
    topics: &Topics,
    event: SessionEvent,
) -> Result<(), P::Error> {
    let status = event.status();
    publisher.publish(
        &topics.status,
        status.payload().as_bytes(),
        status.retained(),
    )
}

/// Periodic deadline for the availability heartbeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeartbeatTimer {
    interval_ms: u32,
    last_ms: Option<u64>,
}

impl HeartbeatTimer {
    /// Create a timer that is due immediately
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    /// Configured period
    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Check if a heartbeat should be sent
    pub fn is_due(&self, now_ms: u64) -> bool {
        match self.last_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= u64::from(self.interval_ms),
        }
    }

    /// Record a heartbeat sent at `now_ms`
    pub fn mark(&mut self, now_ms: u64) {
        self.last_ms = Some(now_ms);
    }

    /// Forget the last heartbeat (e.g. after a disconnect)
    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

/// Gateway state for one device
#[derive(Debug, Clone)]
pub struct Gateway {
    topics: Topics,
    heartbeat: HeartbeatTimer,
}

impl Gateway {
    /// Create a gateway over an expanded topic layout
    pub fn new(topics: Topics, heartbeat_interval_ms: u32) -> Self {
        Self {
            topics,
            heartbeat: HeartbeatTimer::new(heartbeat_interval_ms),
        }
    }

    /// Topic layout
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Route an inbound publish
    pub fn route<'a>(&self, topic: &str, payload: &'a [u8]) -> Option<Command<'a>> {
        self.topics.route(topic, payload)
    }

    /// Last will to register when connecting
    pub fn last_will(&self) -> LastWill {
        LastWill {
            topic: self.topics.availability.clone(),
            payload: Availability::Offline.payload(),
            retained: Availability::Offline.retained(),
        }
    }

    /// Announce a fresh connection
    ///
    /// Publishes retained `online` and the hello message, and restarts the
    /// heartbeat period.
    pub fn on_connected<P: StatusPublisher>(
        &mut self,
        publisher: &mut P,
        now_ms: u64,
    ) -> Result<(), P::Error> {
        self.publish_availability(publisher, now_ms)?;
        publisher.publish(&self.topics.message, HELLO_MESSAGE.as_bytes(), false)
    }

    /// Mark the session as gone; the next connect announces again
    pub fn on_disconnected(&mut self) {
        self.heartbeat.reset();
    }

    /// Publish the heartbeat if it is due
    ///
    /// Returns `true` if a heartbeat was sent.
    pub fn poll_heartbeat<P: StatusPublisher>(
        &mut self,
        publisher: &mut P,
        now_ms: u64,
    ) -> Result<bool, P::Error> {
        if !self.heartbeat.is_due(now_ms) {
            return Ok(false);
        }
        self.publish_availability(publisher, now_ms)?;
        Ok(true)
    }

    /// Publish the status message for a session event
    pub fn publish_event<P: StatusPublisher>(
        &self,
        publisher: &mut P,
        event: SessionEvent,
    ) -> Result<(), P::Error> {
        publish_event(publisher, &self.topics, event)
    }

    fn publish_availability<P: StatusPublisher>(
        &mut self,
        publisher: &mut P,
        now_ms: u64,
    ) -> Result<(), P::Error> {
        let online = Availability::Online;
        publisher.publish(
            &self.topics.availability,
            online.payload().as_bytes(),
            online.retained(),
        )?;
        self.heartbeat.mark(now_ms);
        Ok(())
    }
}
