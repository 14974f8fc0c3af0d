//! Hardware and transport abstraction traits
//!
//! These traits define the interface between the application logic
//! and the concrete relay drivers and MQTT client.

pub mod gateway;
pub mod pump;

pub use gateway::StatusPublisher;
pub use pump::PumpActuator;
