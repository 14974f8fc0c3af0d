//! Device configuration
//!
//! Pump wiring, timing, broker and Wi-Fi settings, plus the parser for the
//! device file.

pub mod parse;
pub mod types;

pub use parse::parse_config;
pub use types::*;
