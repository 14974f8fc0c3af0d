//! Dispense session state machine
//!
//! Whether pumps may be running is a function of the session state, and the
//! state only moves through [`SessionState::transition`].

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    /// No batch in progress, every pump off
    #[default]
    Idle,
    /// A batch was accepted and has not yet drained or been stopped
    Dispensing,
}

/// Inputs that drive the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionInput {
    /// A batch was processed; `started_any` if at least one pump was started
    BatchAccepted { started_any: bool },
    /// An armed session observed every pump off
    Drained,
    /// Emergency stop requested
    EmergencyStop,
}

impl SessionState {
    /// Check if pumps may be running in this state
    pub fn pumps_allowed(&self) -> bool {
        matches!(self, SessionState::Dispensing)
    }

    /// Process an input and return the next state
    pub fn transition(self, input: SessionInput) -> Self {
        use SessionInput::*;
        use SessionState::*;

        match (self, input) {
            (Idle, BatchAccepted { started_any: true }) => Dispensing,
            // Nothing started and nothing was running
            (Idle, BatchAccepted { started_any: false }) => Idle,
            (Idle, Drained) => Idle,

            // Merged into the running session
            (Dispensing, BatchAccepted { .. }) => Dispensing,
            (Dispensing, Drained) => Idle,

            (_, EmergencyStop) => Idle,
        }
    }
}
