//! Outbound message payloads
//!
//! Payloads are plain ASCII strings, matching what the mobile app and the
//! Home Assistant integration already listen for.

/// Informational text published on the message topic after connecting
pub const HELLO_MESSAGE: &str = "hello from device";

/// Status published on the status topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusMessage {
    /// Every pump of the batch has finished
    CocktailCompleted,
    /// An emergency stop was received and all pumps are off
    EmergencyStopExecuted,
}

impl StatusMessage {
    /// Wire payload
    pub const fn payload(self) -> &'static str {
        match self {
            StatusMessage::CocktailCompleted => "cocktail_completed",
            StatusMessage::EmergencyStopExecuted => "emergency_stop_executed",
        }
    }

    /// Status messages are never retained
    pub const fn retained(self) -> bool {
        false
    }

    /// Parse a wire payload (used by tools and tests)
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        match payload {
            b"cocktail_completed" => Some(StatusMessage::CocktailCompleted),
            b"emergency_stop_executed" => Some(StatusMessage::EmergencyStopExecuted),
            _ => None,
        }
    }
}

/// Device presence, published retained on the availability topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Availability {
    Online,
    /// Sent by the broker as the last will
    Offline,
}

impl Availability {
    /// Wire payload
    pub const fn payload(self) -> &'static str {
        match self {
            Availability::Online => "online",
            Availability::Offline => "offline",
        }
    }

    /// Availability is always retained so late subscribers see it
    pub const fn retained(self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_payloads() {
        assert_eq!(StatusMessage::CocktailCompleted.payload(), "cocktail_completed");
        assert_eq!(
            StatusMessage::EmergencyStopExecuted.payload(),
            "emergency_stop_executed"
        );
        assert!(!StatusMessage::CocktailCompleted.retained());
    }

    #[test]
    fn test_status_from_payload() {
        for status in [
            StatusMessage::CocktailCompleted,
            StatusMessage::EmergencyStopExecuted,
        ] {
            assert_eq!(
                StatusMessage::from_payload(status.payload().as_bytes()),
                Some(status)
            );
        }
        assert_eq!(StatusMessage::from_payload(b"online"), None);
    }

    #[test]
    fn test_availability_is_retained() {
        assert_eq!(Availability::Online.payload(), "online");
        assert_eq!(Availability::Offline.payload(), "offline");
        assert!(Availability::Online.retained());
        assert!(Availability::Offline.retained());
    }
}
