//! Barback Hardware Abstraction Layer
//!
//! This crate defines the small set of hardware traits the pump drivers are
//! written against, so the same driver code runs on the RP2040 firmware and
//! in host tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  barback-drivers (relay pump channels)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  barback-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ embedded-hal  │       │  host mocks   │
//! │ (embassy-rp)  │       │   (tests)     │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Digital output driving a relay coil

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;

pub use gpio::{EhOutput, Level, OutputPin};
