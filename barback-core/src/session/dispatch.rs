//! Routed command handling
//!
//! Ties the wire decoder to the controller so the firmware only has to hand
//! over a routed [`Command`] and act on the returned [`Dispatch`].

use barback_protocol::{decode, Command, DecodeError, DecodedBatch};

use super::controller::{BatchReport, DispenseController};
use super::events::SessionEvent;
use crate::traits::PumpActuator;

/// What handling a command did
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dispatch {
    /// Batch decoded and handed to the controller
    Accepted {
        decoded: DecodedBatch,
        report: BatchReport,
    },
    /// Payload rejected; the controller was not touched
    Dropped(DecodeError),
    /// Emergency stop executed
    Stopped(SessionEvent),
    /// Batch queued before a stop that was already executed
    Cancelled,
    /// Queued stop that was already executed ahead of the queue
    StopSettled,
}

impl Dispatch {
    /// Event to publish, if any
    pub fn event(&self) -> Option<SessionEvent> {
        match self {
            Dispatch::Stopped(event) => Some(*event),
            _ => None,
        }
    }
}

impl<A: PumpActuator> DispenseController<A> {
    /// Handle a routed command
    ///
    /// Commands must be handed over in arrival order.
    pub fn handle(&mut self, command: Command<'_>, now_ms: u64) -> Dispatch {
        match command {
            Command::MakeCocktail(_) if self.is_stop_pending() => Dispatch::Cancelled,
            Command::EmergencyStop if self.is_stop_pending() => {
                self.stops_ahead -= 1;
                Dispatch::StopSettled
            }
            Command::MakeCocktail(payload) => match decode(payload) {
                Ok(decoded) => {
                    let report = self.accept_batch(&decoded.instructions, now_ms);
                    Dispatch::Accepted { decoded, report }
                }
                Err(error) => Dispatch::Dropped(error),
            },
            Command::EmergencyStop => Dispatch::Stopped(self.emergency_stop()),
        }
    }
}
