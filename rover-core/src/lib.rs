//! Command interpretation and servo actuation core for a two-channel RC rover
//! on no-std embedded platforms.
//!
//! For a runnable host simulation, see the `mock-mcu` crate.
#![no_std]

pub mod utils;
