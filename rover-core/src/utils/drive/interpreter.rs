//! Interpretation of 3-byte command frames.
//!
//! Each frame received from the transmitter carries two stick bytes and a
//! mode byte. `interpret` turns one decoded frame into a complete actuation
//! decision: the operating mode, one pulse width per servo channel, and the
//! status indicator color. `DriveState` carries the single piece of session
//! state (engaged or not) between frames.
//!
//! # Example
//! ```rust
//! use rover_core::utils::drive::interpreter::{interpret, CommandPacket};
//! let act = interpret(CommandPacket::from_bytes([1, 0, 1]));
//! assert!(act.engaged);
//! assert_eq!(act.left_pulse, 1800);
//! ```

use serde::{Deserialize, Serialize};

/// Neutral pulse width, the 90 degree point for an SG90-class servo.
pub const CENTER_PULSE_US: u16 = 1500;
/// Full throw of the left channel, in microseconds from center.
pub const LEFT_THROW_US: u16 = 300;
/// Full throw of the right channel. Trimmed per servo; the two channels
/// are calibrated independently.
pub const RIGHT_THROW_US: u16 = 290;

/// Per-stick drive input decoded from one command byte.
///
/// Any byte outside the known set decodes to `Neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveCommand {
    Neutral,
    Forward,
    Reverse,
}

impl DriveCommand {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => DriveCommand::Forward,
            2 => DriveCommand::Reverse,
            _ => DriveCommand::Neutral,
        }
    }
}

/// Operating mode decoded from the third command byte.
///
/// `FollowLeft` and `FollowRight` select which stick drives the right
/// channel. Unknown bytes still engage the vehicle but match neither
/// steering source, so the right channel holds center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeCommand {
    Stop,
    FollowLeft,
    FollowRight,
    Unknown,
}

impl ModeCommand {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => ModeCommand::Stop,
            1 => ModeCommand::FollowLeft,
            2 => ModeCommand::FollowRight,
            _ => ModeCommand::Unknown,
        }
    }

    pub fn is_engaged(self) -> bool {
        !matches!(self, ModeCommand::Stop)
    }
}

/// Status indicator states shown on the single status pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusColor {
    /// Disengaged, stick input ignored.
    Orange,
    /// Engaged with the left channel neutral.
    Green,
    /// Left channel driving forward.
    Blue,
    /// Left channel driving in reverse.
    Pink,
    /// Engaged, but the right channel matched neither direction.
    Black,
}

/// Decoded three-byte command frame from the transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPacket {
    pub left: DriveCommand,
    pub right: DriveCommand,
    pub mode: ModeCommand,
}

impl CommandPacket {
    /// Decode a raw frame. Total: every byte triple yields a packet.
    pub fn from_bytes(data: [u8; 3]) -> Self {
        CommandPacket {
            left: DriveCommand::from_byte(data[0]),
            right: DriveCommand::from_byte(data[1]),
            mode: ModeCommand::from_byte(data[2]),
        }
    }
}

/// Complete actuation decision for one received frame.
///
/// Both pulse widths and the indicator color are derived together from the
/// same frame; there is no partial application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actuation {
    pub engaged: bool,
    pub left_pulse: u16,
    pub right_pulse: u16,
    pub status: StatusColor,
}

/// Map one decoded frame to servo pulses and an indicator color.
///
/// `Stop` forces both channels to center and the indicator to orange, no
/// matter what the sticks say. When engaged, the left channel follows the
/// left stick alone, while the right channel follows whichever stick the
/// mode selects; if that stick is not driving, the right channel holds
/// center and the indicator goes dark, overriding the left channel's color.
pub fn interpret(packet: CommandPacket) -> Actuation {
    if !packet.mode.is_engaged() {
        return Actuation {
            engaged: false,
            left_pulse: CENTER_PULSE_US,
            right_pulse: CENTER_PULSE_US,
            status: StatusColor::Orange,
        };
    }

    let (left_pulse, mut status) = match packet.left {
        DriveCommand::Forward => (CENTER_PULSE_US + LEFT_THROW_US, StatusColor::Blue),
        DriveCommand::Reverse => (CENTER_PULSE_US - LEFT_THROW_US, StatusColor::Pink),
        DriveCommand::Neutral => (CENTER_PULSE_US, StatusColor::Green),
    };

    let steering = match packet.mode {
        ModeCommand::FollowLeft => Some(packet.left),
        ModeCommand::FollowRight => Some(packet.right),
        ModeCommand::Stop | ModeCommand::Unknown => None,
    };

    // The right servo is mirror mounted: forward sits below center.
    let right_pulse = match steering {
        Some(DriveCommand::Forward) => CENTER_PULSE_US - RIGHT_THROW_US,
        Some(DriveCommand::Reverse) => CENTER_PULSE_US + RIGHT_THROW_US,
        _ => {
            status = StatusColor::Black;
            CENTER_PULSE_US
        }
    };

    Actuation {
        engaged: true,
        left_pulse,
        right_pulse,
        status,
    }
}

/// Session mode carried between frames.
///
/// Holds the single engaged flag; everything else is recomputed per frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriveState {
    engaged: bool,
}

impl DriveState {
    /// Start disengaged, as the vehicle boots.
    pub const fn new() -> Self {
        DriveState { engaged: false }
    }

    pub fn engaged(&self) -> bool {
        self.engaged
    }

    /// Interpret one frame and record the resulting mode.
    pub fn apply(&mut self, packet: CommandPacket) -> Actuation {
        let actuation = interpret(packet);
        self.engaged = actuation.engaged;
        actuation
    }
}
