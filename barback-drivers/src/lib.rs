//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in barback-core:
//!
//! - Relay-switched pumps on a digital output (active-high or active-low)

#![no_std]
#![deny(unsafe_code)]

pub mod pump;
