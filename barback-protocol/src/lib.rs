//! Barback MQTT protocol
//!
//! This crate defines everything that crosses the broker boundary between the
//! cocktail rig and its controllers (mobile app, backend):
//!
//! - Inbound dispense batches, a JSON array of pump instructions:
//!   ```text
//!   [{"pump": 1, "seconds": 2.5}, {"pump": 3, "seconds": 1}]
//!   ```
//! - Inbound emergency stop, a separate topic with an ignored payload
//! - Outbound status (`cocktail_completed`, `emergency_stop_executed`)
//! - Outbound retained availability (`online` / last-will `offline`)
//!
//! Pump numbers on the wire are 1-based. Range checking against the configured
//! pump count happens in the scheduler, not here.

#![no_std]
#![deny(unsafe_code)]

pub mod decode;
pub mod device;
pub mod instruction;
pub mod messages;
pub mod topics;

pub use decode::{decode, DecodeError, DecodeIssue, DecodedBatch, IssueKind};
pub use device::{device_id_from_mac, DeviceId, DEFAULT_ID_PREFIX};
pub use instruction::{seconds_to_millis, Instruction, MAX_INSTRUCTIONS};
pub use messages::{Availability, StatusMessage, HELLO_MESSAGE};
pub use topics::{Command, Topic, TopicError, Topics, MAX_TOPIC_LEN};
