//! Status indicator control for the rover.
//!
//! Manages the single status pixel via `SmartLedsWrite` and dispatches
//! commands received over `LED_CHANNEL`.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Timer};
use serde::{Deserialize, Serialize};
use smart_leds_trait::{SmartLedsWrite, RGB8};

use crate::utils::drive::interpreter::StatusColor;

/// Channel used to receive LED commands (`LedCommand` messages).
pub static LED_CHANNEL: embassy_sync::channel::Channel<CriticalSectionRawMutex, LedCommand, 16> =
    embassy_sync::channel::Channel::new();

/// Number of pixels in the indicator.
const LED_COUNT: usize = 1;

/// Global brightness applied to every color written out (0-255 scale).
/// A full-scale status pixel is blinding at close range.
const BRIGHTNESS: u8 = 5;

/// LED command variants for switching on/off or showing a vehicle state.
///
/// Serialized as JSON with tag `"lc"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(tag = "lc", rename_all = "snake_case")]
pub enum LedCommand {
    /// Turn the indicator on (last color or white).
    On,
    /// Turn the indicator off.
    Off,
    /// Show the given vehicle status.
    Status { color: StatusColor },
}

impl From<StatusColor> for RGB8 {
    fn from(color: StatusColor) -> Self {
        match color {
            StatusColor::Orange => RGB8 { r: 255, g: 165, b: 0 },
            StatusColor::Green => RGB8 { r: 0, g: 128, b: 0 },
            StatusColor::Blue => RGB8 { r: 0, g: 0, b: 255 },
            StatusColor::Pink => RGB8 { r: 255, g: 192, b: 203 },
            StatusColor::Black => RGB8 { r: 0, g: 0, b: 0 },
        }
    }
}

/// High-level controller for the status pixel.
///
/// Maintains the on/off state and last selected color.
pub struct LedModule<Driver> {
    driver: Driver,
    is_on: bool,
    last_color: Option<RGB8>,
}

impl<Driver, E> LedModule<Driver>
where
    Driver: SmartLedsWrite<Color = RGB8, Error = E>,
{
    /// Create a new `LedModule` over the given LED driver.
    ///
    /// The indicator is initially off with no last color.
    pub fn new(driver: Driver) -> Self {
        Self {
            driver,
            is_on: false,
            last_color: None,
        }
    }

    /// Boot indication: blink red three times, then settle on the
    /// disengaged color with the indicator left on.
    pub async fn startup_sequence(&mut self) -> Result<(), E> {
        for _ in 0..3 {
            self.set_all(RGB8 { r: 255, g: 0, b: 0 })?;
            Timer::after(Duration::from_millis(500)).await;
            self.set_all(RGB8 { r: 0, g: 0, b: 0 })?;
            Timer::after(Duration::from_millis(500)).await;
        }
        self.is_on = true;
        let boot_color = RGB8::from(StatusColor::Orange);
        self.last_color = Some(boot_color);
        self.set_all(boot_color)
    }

    /// Execute an incoming `LedCommand`, updating internal state and pixel.
    ///
    /// - `On`: enable the indicator with the last color or white.
    /// - `Off`: disable the indicator.
    /// - `Status { color }`: show a new state, applied immediately if on.
    pub fn ex_command(
        &mut self,
        cmd: LedCommand,
    ) -> Result<(), E> {
        match cmd {
            LedCommand::On => {
                self.is_on = true;
                let color = self.last_color.unwrap_or(RGB8 {
                    r: 255,
                    g: 255,
                    b: 255,
                });
                self.set_all(color)?;
            }
            LedCommand::Off => {
                self.is_on = false;
                self.set_all(RGB8 { r: 0, g: 0, b: 0 })?;
            }
            LedCommand::Status { color } => {
                let new_color = RGB8::from(color);
                self.last_color = Some(new_color);
                if self.is_on {
                    self.set_all(new_color)?;
                }
            }
        }
        Ok(())
    }

    /// Write the given color to every pixel, brightness-capped.
    fn set_all(&mut self, color: RGB8) -> Result<(), E> {
        let data = core::iter::repeat(scale(color)).take(LED_COUNT);
        self.driver.write(data)
    }
}

/// Scale a color down to the global brightness cap.
fn scale(color: RGB8) -> RGB8 {
    RGB8 {
        r: (color.r as u16 * BRIGHTNESS as u16 / 255) as u8,
        g: (color.g as u16 * BRIGHTNESS as u16 / 255) as u8,
        b: (color.b as u16 * BRIGHTNESS as u16 / 255) as u8,
    }
}
