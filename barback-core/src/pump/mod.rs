//! Pump scheduling
//!
//! Non-blocking timed control of several pumps at once.

pub mod scheduler;
pub mod state;

pub use scheduler::{ExpiryEvents, PumpScheduler, SchedulerError, StartedRun, DEFAULT_MAX_RUN_MS};
pub use state::{PumpId, PumpState, MAX_PUMPS};
