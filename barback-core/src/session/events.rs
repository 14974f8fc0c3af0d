//! Session events reported to the outside world

use barback_protocol::StatusMessage;

/// Events emitted by the dispense controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionEvent {
    /// Every pump of the accepted batch has finished
    BatchCompleted,
    /// All pumps were stopped on request
    EmergencyStopExecuted,
}

impl SessionEvent {
    /// Status message announcing this event
    pub const fn status(self) -> StatusMessage {
        match self {
            SessionEvent::BatchCompleted => StatusMessage::CocktailCompleted,
            SessionEvent::EmergencyStopExecuted => StatusMessage::EmergencyStopExecuted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_payloads() {
        assert_eq!(
            SessionEvent::BatchCompleted.status().payload(),
            "cocktail_completed"
        );
        assert_eq!(
            SessionEvent::EmergencyStopExecuted.status().payload(),
            "emergency_stop_executed"
        );
    }
}
