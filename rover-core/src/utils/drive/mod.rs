//! Module Exports
//!
//! This file exports the drive logic of the vehicle.
//!
//! # Modules
//! - `interpreter`: maps received command frames to servo pulses and an
//!   indicator color.

/// Module for interpreting command frames into actuation decisions.
pub mod interpreter;
