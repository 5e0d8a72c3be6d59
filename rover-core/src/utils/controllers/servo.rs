//! Servo actuation for the rover's two drive channels.
//!
//! This module provides abstractions for initializing and controlling the
//! PWM servo driver over a shared I2C bus. Commands are received via
//! `SERVO_CHANNEL` and applied one frame at a time.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::i2c::I2c;
use embedded_hal_bus::i2c::RefCellDevice;
use pwm_pca9685::{Address as PwmAddress, Channel, Error as PwmError, Pca9685};
use serde::{Deserialize, Serialize};

use crate::utils::drive::interpreter::CENTER_PULSE_US;

/// Channel used to receive servo commands (`ServoCommand` messages).
pub static SERVO_CHANNEL: embassy_sync::channel::Channel<CriticalSectionRawMutex, ServoCommand, 16> =
    embassy_sync::channel::Channel::new();

/// I2C address of the PWM servo driver.
const PWM_I2C_ADDRESS: u8 = 0x40;
/// PCA9685 prescale for a 50Hz servo frame (25MHz internal oscillator).
const PRESCALE_50HZ: u8 = 121;
/// Servo frame period at 50Hz, in microseconds.
const SERVO_FRAME_US: u32 = 20_000;
/// Counts per frame of the 12-bit PWM counter.
const PWM_RESOLUTION: u32 = 4096;

/// Errors that can occur when interacting with the servo driver.
#[derive(Debug)]
pub enum DeviceError<E: core::fmt::Debug> {
    PwmError(PwmError<E>),
    PwmNotInitialized,
}

/// The two drive channels of the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoChannel {
    Left,
    Right,
}

impl ServoChannel {
    /// Physical channel on the driver board: the right servo sits on the S1
    /// header (channel 0), the left servo on S2 (channel 1).
    const fn pca_channel(self) -> Channel {
        match self {
            ServoChannel::Left => Channel::C1,
            ServoChannel::Right => Channel::C0,
        }
    }
}

/// Servo command variants for drive actuation and device management.
///
/// Serialized as JSON with tag `"sc"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(tag = "sc", rename_all = "snake_case")]
pub enum ServoCommand {
    /// Apply one interpreted frame: both channel pulses together.
    Drive { left: u16, right: u16 },
    /// Force both channels to their center pulse.
    Center,
    /// Enable the PWM driver outputs.
    Enable,
    /// Disable the PWM driver outputs.
    Disable,
}

/// High-level driver for the two-channel servo board on a shared I2C bus.
pub struct ServoDevices<'a, I2C: 'static> {
    i2c: &'a RefCell<I2C>,
    pub pwm: Option<Pca9685<RefCellDevice<'a, I2C>>>,
}

impl<'a, I2C, E> ServoDevices<'a, I2C>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    /// Create a new servo device manager over the given bus.
    pub fn new(i2c_bus: &'a RefCell<I2C>) -> Self {
        ServoDevices {
            i2c: i2c_bus,
            pwm: None,
        }
    }

    /// Initialize the PWM servo driver on the I2C bus.
    ///
    /// On success `self.pwm` is set. Returns an error if the driver cannot
    /// be constructed.
    pub fn init_devices(&mut self) -> Result<(), DeviceError<E>> {
        let pwm = Pca9685::new(RefCellDevice::new(self.i2c), PwmAddress::from(PWM_I2C_ADDRESS))
            .map_err(DeviceError::PwmError)?;

        self.pwm = Some(pwm);
        Ok(())
    }

    /// Scan the I2C bus for devices and log any found addresses.
    pub fn scan_bus(&self) {
        let mut bus = self.i2c.borrow_mut();
        for addr in 0x03..0x78 {
            if bus.write(addr, &[]).is_ok() {
                tracing::warn!("I2C device found at 0x{:02X}", addr);
            }
        }
    }

    /// Configure and enable the PWM servo driver (prescale to 50Hz).
    pub fn configure_pwm(&mut self) -> Result<(), DeviceError<E>> {
        let pca = self.pwm.as_mut().ok_or(DeviceError::PwmNotInitialized)?;
        pca.enable().map_err(DeviceError::PwmError)?;
        pca.set_prescale(PRESCALE_50HZ).map_err(DeviceError::PwmError)?;
        tracing::info!("servo PWM enabled at 50Hz");
        Ok(())
    }

    /// Program one channel to the given pulse width in microseconds.
    pub fn set_pulse(
        &mut self,
        channel: ServoChannel,
        pulse_us: u16,
    ) -> Result<(), DeviceError<E>> {
        let pca = self.pwm.as_mut().ok_or(DeviceError::PwmNotInitialized)?;
        let counts = (pulse_us as u32 * PWM_RESOLUTION / SERVO_FRAME_US) as u16;
        pca.set_channel_on_off(channel.pca_channel(), 0, counts)
            .map_err(DeviceError::PwmError)
    }

    /// Force both channels to the neutral pulse.
    pub fn center(&mut self) -> Result<(), DeviceError<E>> {
        self.set_pulse(ServoChannel::Left, CENTER_PULSE_US)?;
        self.set_pulse(ServoChannel::Right, CENTER_PULSE_US)
    }

    /// Execute a high-level `ServoCommand`.
    pub fn execute_command(
        &mut self,
        command: ServoCommand,
    ) -> Result<(), DeviceError<E>> {
        match command {
            ServoCommand::Drive { left, right } => {
                self.set_pulse(ServoChannel::Left, left)?;
                self.set_pulse(ServoChannel::Right, right)
            }
            ServoCommand::Center => self.center(),
            ServoCommand::Enable => self.enable(),
            ServoCommand::Disable => self.disable(),
        }
    }

    /// Enable the PWM outputs.
    pub fn enable(&mut self) -> Result<(), DeviceError<E>> {
        let pca = self.pwm.as_mut().ok_or(DeviceError::PwmNotInitialized)?;
        pca.enable().map_err(DeviceError::PwmError)
    }

    /// Disable the PWM outputs, putting the driver to sleep.
    pub fn disable(&mut self) -> Result<(), DeviceError<E>> {
        let pca = self.pwm.as_mut().ok_or(DeviceError::PwmNotInitialized)?;
        pca.disable().map_err(DeviceError::PwmError)
    }
}
