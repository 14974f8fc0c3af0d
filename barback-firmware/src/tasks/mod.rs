//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod controller;
pub mod mqtt;
pub mod net;
pub mod tick;

pub use controller::controller_task;
pub use mqtt::mqtt_task;
pub use net::{net_task, wifi_task};
pub use tick::tick_task;
