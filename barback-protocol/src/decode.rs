//! Dispense batch decoder
//!
//! Turns the JSON payload of a make-cocktail command into an ordered list of
//! [`Instruction`]s.
//!
//! Field handling is permissive in the same places the rig has always been:
//! a missing or `null` `pump`/`seconds` becomes `0`, and negative `seconds`
//! becomes `0`. Every such coercion is recorded as a [`DecodeIssue`] so the
//! caller can log it. Two things are stricter: an array element that is not
//! an object, or a field holding the wrong JSON type, rejects the whole
//! payload as [`DecodeError::MalformedPayload`].
//!
//! `pump` is any JSON number with a whole value that fits an `i32`, so `1`
//! and `1.0` are the same pump. A fractional pump such as `1.5` counts as a
//! wrong type.

use core::fmt;

use heapless::Vec;
use serde::de::{Deserializer, SeqAccess, Visitor};
use serde::Deserialize;

use crate::instruction::{Instruction, MAX_INSTRUCTIONS};

/// Upper bound on recorded issues (two possible per element)
pub const MAX_ISSUES: usize = MAX_INSTRUCTIONS * 2;

/// Reasons a whole payload is dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Not well-formed JSON, or an element of the wrong shape
    MalformedPayload,
    /// Well-formed JSON, but the top level is not an array
    NotABatch,
    /// More elements than [`MAX_INSTRUCTIONS`]
    TooManyInstructions,
}

/// What was coerced on an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IssueKind {
    /// `pump` missing or null, coerced to 0
    MissingPump,
    /// `seconds` missing or null, coerced to 0
    MissingSeconds,
    /// `seconds` below zero, coerced to 0
    NegativeSeconds,
}

/// A per-element coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodeIssue {
    /// Index of the element in the payload array
    pub index: u8,
    pub kind: IssueKind,
}

/// Result of a successful decode
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodedBatch {
    /// Instructions in payload order
    pub instructions: Vec<Instruction, MAX_INSTRUCTIONS>,
    /// Coercions applied while decoding
    pub issues: Vec<DecodeIssue, MAX_ISSUES>,
}

impl DecodedBatch {
    /// True if no coercion was needed
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Decode a make-cocktail payload
pub fn decode(payload: &[u8]) -> Result<DecodedBatch, DecodeError> {
    let first = payload
        .iter()
        .copied()
        .find(|b| !b.is_ascii_whitespace())
        .ok_or(DecodeError::MalformedPayload)?;

    if first != b'[' {
        return if is_well_formed_document(first, payload) {
            Err(DecodeError::NotABatch)
        } else {
            Err(DecodeError::MalformedPayload)
        };
    }

    let (wire, _) = serde_json_core::from_slice::<WireBatch>(payload)
        .map_err(|_| DecodeError::MalformedPayload)?;

    if wire.overflow {
        return Err(DecodeError::TooManyInstructions);
    }

    let mut batch = DecodedBatch::default();
    for (index, element) in wire.elements.iter().enumerate() {
        // Both vectors are sized for the element cap checked above
        let index = index as u8;

        let pump = match element.pump {
            Some(number) => whole_pump(number).ok_or(DecodeError::MalformedPayload)?,
            None => {
                let _ = batch.issues.push(DecodeIssue {
                    index,
                    kind: IssueKind::MissingPump,
                });
                0
            }
        };

        let seconds = match element.seconds {
            Some(seconds) if seconds < 0.0 => {
                let _ = batch.issues.push(DecodeIssue {
                    index,
                    kind: IssueKind::NegativeSeconds,
                });
                0.0
            }
            Some(seconds) => seconds,
            None => {
                let _ = batch.issues.push(DecodeIssue {
                    index,
                    kind: IssueKind::MissingSeconds,
                });
                0.0
            }
        };

        let _ = batch.instructions.push(Instruction::new(pump, seconds));
    }

    Ok(batch)
}

/// Pump number from a JSON number, if it is a whole `i32`
fn whole_pump(number: f64) -> Option<i32> {
    let in_range = number >= f64::from(i32::MIN) && number <= f64::from(i32::MAX);
    // NaN fails the range check
    if in_range && number == (number as i32) as f64 {
        Some(number as i32)
    } else {
        None
    }
}

/// Check that a non-array payload is still valid JSON
fn is_well_formed_document(first: u8, payload: &[u8]) -> bool {
    match first {
        b'{' => serde_json_core::from_slice::<AnyObject>(payload).is_ok(),
        b'"' => serde_json_core::from_slice::<&str>(payload).is_ok(),
        b't' | b'f' => serde_json_core::from_slice::<bool>(payload).is_ok(),
        b'n' => matches!(serde_json_core::from_slice::<Option<u8>>(payload), Ok((None, _))),
        b'-' | b'0'..=b'9' => serde_json_core::from_slice::<f64>(payload).is_ok(),
        _ => false,
    }
}

/// Accepts any JSON object, discarding its members
#[derive(Deserialize)]
struct AnyObject {}

/// One array element as it appears on the wire
#[derive(Deserialize)]
struct WireInstruction {
    #[serde(default)]
    pump: Option<f64>,
    #[serde(default)]
    seconds: Option<f32>,
}

/// The payload array, bounded to [`MAX_INSTRUCTIONS`]
struct WireBatch {
    elements: Vec<WireInstruction, MAX_INSTRUCTIONS>,
    overflow: bool,
}

impl<'de> Deserialize<'de> for WireBatch {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(WireBatchVisitor)
    }
}

struct WireBatchVisitor;

impl<'de> Visitor<'de> for WireBatchVisitor {
    type Value = WireBatch;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array of pump instructions")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut batch = WireBatch {
            elements: Vec::new(),
            overflow: false,
        };

        // Keep consuming past the cap so the document is still fully validated
        while let Some(element) = seq.next_element::<WireInstruction>()? {
            if batch.elements.push(element).is_err() {
                batch.overflow = true;
            }
        }

        Ok(batch)
    }
}
