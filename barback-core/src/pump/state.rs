//! Per-pump identity and timing state

/// Maximum pump channels one scheduler can own
pub const MAX_PUMPS: usize = 8;

/// 1-based pump number
///
/// Pump 1 is the first configured channel. A `PumpId` says nothing about
/// whether the pump exists; the scheduler checks the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PumpId(u8);

impl PumpId {
    /// Create from a 1-based number
    ///
    /// Returns `None` for 0.
    pub const fn new(number: u8) -> Option<Self> {
        if number == 0 {
            None
        } else {
            Some(Self(number))
        }
    }

    /// Create from a raw wire number
    ///
    /// Returns `None` if the number cannot name any pump (zero, negative or
    /// above `u8::MAX`).
    pub fn from_wire(raw: i32) -> Option<Self> {
        u8::try_from(raw).ok().and_then(Self::new)
    }

    /// Create from a 0-based channel index
    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u8 + 1)
    }

    /// The 1-based number
    pub const fn number(self) -> u8 {
        self.0
    }

    /// The 0-based channel index
    pub const fn index(self) -> usize {
        self.0 as usize - 1
    }
}

/// Timing state of one pump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PumpState {
    /// Pump is running
    pub active: bool,
    /// Monotonic start time of the current run
    pub started_at_ms: u64,
    /// Length of the current run
    pub duration_ms: u32,
}

impl PumpState {
    /// An inactive pump
    pub const fn idle() -> Self {
        Self {
            active: false,
            started_at_ms: 0,
            duration_ms: 0,
        }
    }

    /// A pump running from `now_ms` for `duration_ms`
    pub const fn running(now_ms: u64, duration_ms: u32) -> Self {
        Self {
            active: true,
            started_at_ms: now_ms,
            duration_ms,
        }
    }

    /// Time run so far
    ///
    /// A clock reading earlier than the start counts as zero elapsed.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.started_at_ms)
    }

    /// Check if the run has reached its deadline
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.active && self.elapsed_ms(now_ms) >= u64::from(self.duration_ms)
    }

    /// Time left in the current run (0 if inactive or expired)
    pub fn remaining_ms(&self, now_ms: u64) -> u32 {
        if !self.active {
            return 0;
        }
        let remaining = u64::from(self.duration_ms).saturating_sub(self.elapsed_ms(now_ms));
        // Bounded by duration_ms
        remaining as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pump_id_from_wire() {
        assert_eq!(PumpId::from_wire(1).map(PumpId::index), Some(0));
        assert_eq!(PumpId::from_wire(4).map(PumpId::number), Some(4));
        assert_eq!(PumpId::from_wire(0), None);
        assert_eq!(PumpId::from_wire(-1), None);
        assert_eq!(PumpId::from_wire(256), None);
    }

    #[test]
    fn test_expiry_boundary() {
        let state = PumpState::running(1_000, 500);
        assert!(!state.is_expired(1_499));
        assert!(state.is_expired(1_500));
        assert!(state.is_expired(9_999));
    }

    #[test]
    fn test_clock_before_start_is_zero_elapsed() {
        let state = PumpState::running(1_000, 500);
        assert_eq!(state.elapsed_ms(10), 0);
        assert!(!state.is_expired(10));
        assert_eq!(state.remaining_ms(10), 500);
    }

    #[test]
    fn test_zero_duration_expires_immediately() {
        let state = PumpState::running(42, 0);
        assert!(state.is_expired(42));
    }

    #[test]
    fn test_idle_never_expires() {
        let state = PumpState::idle();
        assert!(!state.is_expired(u64::MAX));
        assert_eq!(state.remaining_ms(0), 0);
    }
}
