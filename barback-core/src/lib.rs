//! Board-agnostic core logic for the cocktail rig firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware or on the network stack:
//!
//! - Pump actuator and status publisher traits
//! - Pump scheduler (independent, non-blocking run deadlines)
//! - Dispense session controller (edge-triggered completion, emergency stop)
//! - Command dispatch from routed MQTT messages
//! - Gateway helpers (status publishing, availability heartbeat)
//! - Device configuration types and parser
//!
//! Nothing here logs. Operations return reports and events, and the firmware
//! decides what to log and publish.

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod gateway;
pub mod pump;
pub mod session;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;
