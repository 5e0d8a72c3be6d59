use core::cell::RefCell;

use embedded_hal_bus::i2c::RefCellDevice;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};
use pwm_pca9685::{Address as PwmAddress, Pca9685};
use rover_core::utils::controllers::servo::{
    DeviceError, ServoChannel, ServoCommand, ServoDevices,
};
use rover_core::utils::drive::interpreter::{interpret, CommandPacket};

/// Default I2C address for the PWM servo driver.
pub const PWM_ADDRESS: u8 = 0x40;

/// Create a write transaction for the given I2C address and data payload.
pub fn write(
    addr: u8,
    data: Vec<u8>,
) -> I2cTrans {
    I2cTrans::write(addr, data)
}

#[test]
fn test_init_devices() {
    // Constructing the driver touches no registers.
    let expectations: [I2cTrans; 0] = [];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut devs = ServoDevices::new(&i2c_bus);
    devs.init_devices().unwrap();
    assert!(devs.pwm.is_some());
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_set_pulse_without_init_fails() {
    let expectations: [I2cTrans; 0] = [];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut devs = ServoDevices::new(&i2c_bus);
    assert!(matches!(
        devs.set_pulse(ServoChannel::Left, 1500),
        Err(DeviceError::PwmNotInitialized)
    ));
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_configure_pwm() {
    // Expected transactions for enabling PWM and setting the 50Hz prescale
    // (includes sleep handling around the prescale write).
    let expectations = [
        write(PWM_ADDRESS, vec![0x00, 0x01]),
        write(PWM_ADDRESS, vec![0x00, 0x11]),
        write(PWM_ADDRESS, vec![0xFE, 121]),
        write(PWM_ADDRESS, vec![0x00, 0x01]),
    ];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut devs = ServoDevices::new(&i2c_bus);
    let pwm = Pca9685::new(RefCellDevice::new(&i2c_bus), PwmAddress::from(PWM_ADDRESS)).unwrap();
    devs.pwm = Some(pwm);
    devs.configure_pwm().unwrap();
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_drive_applies_both_pulses() {
    // Left-forward frame under the left-stick steering mode: left channel
    // goes to 1800us, the mirror-mounted right channel to 1210us. At a
    // 20ms frame that is 368 and 247 counts. The first channel write also
    // flips the auto-increment bit in MODE1.
    let expectations = [
        write(PWM_ADDRESS, vec![0x00, 0x31]),
        write(PWM_ADDRESS, vec![0x0A, 0x00, 0x00, 0x70, 0x01]),
        write(PWM_ADDRESS, vec![0x06, 0x00, 0x00, 0xF7, 0x00]),
    ];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut devs = ServoDevices::new(&i2c_bus);
    let pwm = Pca9685::new(RefCellDevice::new(&i2c_bus), PwmAddress::from(PWM_ADDRESS)).unwrap();
    devs.pwm = Some(pwm);

    let act = interpret(CommandPacket::from_bytes([1, 0, 1]));
    devs.execute_command(ServoCommand::Drive {
        left: act.left_pulse,
        right: act.right_pulse,
    })
    .unwrap();
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_center_holds_both_channels_neutral() {
    // 1500us on both channels is 307 counts.
    let expectations = [
        write(PWM_ADDRESS, vec![0x00, 0x31]),
        write(PWM_ADDRESS, vec![0x0A, 0x00, 0x00, 0x33, 0x01]),
        write(PWM_ADDRESS, vec![0x06, 0x00, 0x00, 0x33, 0x01]),
    ];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut devs = ServoDevices::new(&i2c_bus);
    let pwm = Pca9685::new(RefCellDevice::new(&i2c_bus), PwmAddress::from(PWM_ADDRESS)).unwrap();
    devs.pwm = Some(pwm);
    devs.execute_command(ServoCommand::Center).unwrap();
    i2c_bus.borrow_mut().done();
}

#[test]
fn test_enable_then_disable() {
    let expectations = [
        write(PWM_ADDRESS, vec![0x00, 0x01]),
        write(PWM_ADDRESS, vec![0x00, 0x11]),
    ];

    let mock = I2cMock::new(&expectations);
    let i2c_bus = RefCell::new(mock);
    let mut devs = ServoDevices::new(&i2c_bus);
    let pwm = Pca9685::new(RefCellDevice::new(&i2c_bus), PwmAddress::from(PWM_ADDRESS)).unwrap();
    devs.pwm = Some(pwm);
    devs.execute_command(ServoCommand::Enable).unwrap();
    devs.execute_command(ServoCommand::Disable).unwrap();
    i2c_bus.borrow_mut().done();
}
