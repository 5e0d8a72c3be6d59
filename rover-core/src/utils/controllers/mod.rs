//! Module Exports
//!
//! This file exports the actuation controllers of the vehicle.
//!
//! - `servo`: drives the two-channel servo board over the shared I2C bus.
//! - `leds`: drives the status indicator pixel.

/// Module for managing the I2C-connected servo driver.
pub mod servo;
pub mod leds;

use core::cell::RefCell;
use serde::{Deserialize, Serialize};

pub use leds::LED_CHANNEL;
pub use servo::SERVO_CHANNEL;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "ct", rename_all = "snake_case")] // ct = command type
pub enum SystemCommand {
    S(servo::ServoCommand),
    L(leds::LedCommand),
}

pub struct SystemController<I2C: 'static> {
    pub servos: Option<servo::ServoDevices<'static, I2C>>,
}

impl<I2C> SystemController<I2C>
where
    I2C: embedded_hal::i2c::I2c + 'static,
{
    pub fn new(i2c_bus: &'static RefCell<I2C>) -> Self {
        let mut devs = servo::ServoDevices::new(i2c_bus);

        let servos = match devs.init_devices() {
            Ok(()) => {
                if let Err(e) = devs.configure_pwm() {
                    tracing::warn!("servo PWM configuration failed: {:?}", e);
                }
                // Boot posture is disengaged: hold both channels at neutral.
                if let Err(e) = devs.center() {
                    tracing::warn!("failed to center servos at boot: {:?}", e);
                }
                Some(devs)
            }
            Err(e) => {
                tracing::warn!("servo driver init failed, scanning instead: {:?}", e);
                devs.scan_bus();
                None
            }
        };

        SystemController { servos }
    }

    pub async fn servo_ch(&mut self) -> ! {
        loop {
            let command = servo::SERVO_CHANNEL.receiver().receive().await;
            tracing::info!("Received servo command: {:?}", command);
            if let Some(devs) = self.servos.as_mut() {
                if let Err(e) = devs.execute_command(command) {
                    tracing::error!("servo command failed: {:?}", e);
                }
            } else {
                tracing::warn!(
                    "servo command received but driver not initialized: {:?}",
                    command
                );
            }
        }
    }
}
