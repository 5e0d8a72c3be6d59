//! Utility re-exports and helper macros for the rover.
//!
//! This module re-exports the command link, actuation controllers, timing,
//! and the drive interpreter:
//!
//! - `connection`: command frame intake and dispatch from the radio link
//! - `controllers`: servo and status LED controllers for the vehicle hardware
//! - `drive`: interpretation of command frames into pulse widths and colors
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod connection;
pub mod controllers;
pub mod drive;

pub use connection::link::{push_frame, CommandLink};
pub use controllers::SystemController;
pub use drive::interpreter::{interpret, Actuation, CommandPacket, DriveState, StatusColor};
pub use embassy_time::*;

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
