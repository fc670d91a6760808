pub mod buzzer;
pub mod imu;
pub mod lcd;
pub mod ldr;
pub mod sensors;

use std::sync::Mutex;

use esp_idf_hal::i2c::I2cDriver;

/// Thread-safe handle to a shared I2C bus.
pub type SharedBus = &'static Mutex<I2cDriver<'static>>;
