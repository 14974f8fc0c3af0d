//! Pump instructions
//!
//! One instruction asks for one pump to run for a number of seconds.

/// Maximum instructions accepted in a single batch
pub const MAX_INSTRUCTIONS: usize = 16;

/// A single decoded pump instruction
///
/// `pump` is the raw wire number. It may be out of range (or zero, when the
/// field was missing); the scheduler rejects such pumps individually.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Instruction {
    /// 1-based pump number
    pub pump: i32,
    /// Run time in seconds (fractional)
    pub seconds: f32,
}

impl Instruction {
    /// Create an instruction
    pub const fn new(pump: i32, seconds: f32) -> Self {
        Self { pump, seconds }
    }

    /// Run time rounded to whole milliseconds
    pub fn duration_ms(&self) -> u32 {
        seconds_to_millis(self.seconds)
    }
}

/// Convert fractional seconds to milliseconds
///
/// Rounds to the nearest millisecond. Negative and NaN inputs give 0, values
/// beyond `u32::MAX` ms saturate.
pub fn seconds_to_millis(seconds: f32) -> u32 {
    let ms = seconds * 1000.0;
    if ms.is_nan() || ms <= 0.0 {
        return 0;
    }
    // Float-to-int `as` saturates
    (ms + 0.5) as u32
}
