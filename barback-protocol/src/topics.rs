//! Topic layout and inbound routing
//!
//! Commands arrive on shared topics under the controller's base topic, while
//! everything the rig publishes lives under its own device id:
//!
//! ```text
//! <base>/MakeCocktail            inbound dispense batch
//! <base>/EmergencyStop           inbound stop (payload ignored)
//! <group>/<device_id>/status     outbound status
//! <group>/<device_id>/availability  outbound retained online/offline
//! <group>/<device_id>/message    outbound informational text
//! ```

use core::fmt::Write;

use heapless::String;

/// Maximum topic length
pub const MAX_TOPIC_LEN: usize = 64;

/// A fully-expanded topic name
pub type Topic = String<MAX_TOPIC_LEN>;

/// Suffix of the dispense command topic
pub const MAKE_COCKTAIL_SUFFIX: &str = "MakeCocktail";

/// Suffix of the emergency stop topic
pub const EMERGENCY_STOP_SUFFIX: &str = "EmergencyStop";

/// Topic construction errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TopicError {
    /// Expanded topic exceeds [`MAX_TOPIC_LEN`]
    TooLong,
    /// Base, group or device id was empty
    EmptySegment,
}

/// A routed inbound command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command<'a> {
    /// Dispense batch payload, still undecoded
    MakeCocktail(&'a [u8]),
    /// Stop every pump now
    EmergencyStop,
}

/// All topics the rig uses
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Topics {
    pub make_cocktail: Topic,
    pub emergency_stop: Topic,
    pub status: Topic,
    pub availability: Topic,
    pub message: Topic,
}

impl Topics {
    /// Expand the topic layout
    ///
    /// # Arguments
    /// - `base`: command base topic, e.g. `Group5/ReactNative`
    /// - `group`: device topic prefix, e.g. `Group5`
    /// - `device_id`: e.g. `bar_A1B2C3`
    pub fn new(base: &str, group: &str, device_id: &str) -> Result<Self, TopicError> {
        if base.is_empty() || group.is_empty() || device_id.is_empty() {
            return Err(TopicError::EmptySegment);
        }

        Ok(Self {
            make_cocktail: join(&[base, MAKE_COCKTAIL_SUFFIX])?,
            emergency_stop: join(&[base, EMERGENCY_STOP_SUFFIX])?,
            status: join(&[group, device_id, "status"])?,
            availability: join(&[group, device_id, "availability"])?,
            message: join(&[group, device_id, "message"])?,
        })
    }

    /// Map an inbound publish to a command
    ///
    /// Returns `None` for topics the rig does not handle.
    pub fn route<'a>(&self, topic: &str, payload: &'a [u8]) -> Option<Command<'a>> {
        if topic == self.make_cocktail.as_str() {
            Some(Command::MakeCocktail(payload))
        } else if topic == self.emergency_stop.as_str() {
            Some(Command::EmergencyStop)
        } else {
            None
        }
    }

    /// Topics to subscribe to after connecting
    pub fn subscriptions(&self) -> [&str; 2] {
        [self.make_cocktail.as_str(), self.emergency_stop.as_str()]
    }
}

fn join(segments: &[&str]) -> Result<Topic, TopicError> {
    let mut topic = Topic::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            topic.push('/').map_err(|_| TopicError::TooLong)?;
        }
        write!(topic, "{}", segment.trim_matches('/')).map_err(|_| TopicError::TooLong)?;
    }
    Ok(topic)
}
