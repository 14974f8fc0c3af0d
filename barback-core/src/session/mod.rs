//! Dispense session
//!
//! The controller owns the pumps for the lifetime of the firmware and turns
//! batches, ticks and emergency stops into state changes and events.

pub mod controller;
pub mod dispatch;
pub mod events;
pub mod machine;

pub use controller::{BatchReport, DispenseController, Rejection, TickOutcome};
pub use dispatch::Dispatch;
pub use events::SessionEvent;
pub use machine::{SessionInput, SessionState};
