// VibraWatch — MPU6050 IMU Driver
//
// Register-level driver over the shared I2C bus.  Besides acceleration and
// rotation it exposes the die temperature, which is the monitor's
// temperature metric.

use esp_idf_hal::delay::FreeRtos;

use crate::config::*;
use crate::drivers::SharedBus;

// MPU6050 register addresses
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_CONFIG: u8 = 0x1A;
const REG_GYRO_CONFIG: u8 = 0x1B;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B; // Start of 14-byte sensor burst
const REG_WHO_AM_I: u8 = 0x75;
const WHO_AM_I_EXPECTED: u8 = 0x68;

/// One burst read converted to physical units.
#[derive(Debug, Clone, Copy)]
pub struct ImuSample {
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
    pub temperature: f32,
    pub gx: f32,
    pub gy: f32,
    pub gz: f32,
}

pub struct Mpu6050 {
    bus: SharedBus,
}

impl Mpu6050 {
    pub fn new(bus: SharedBus) -> Self {
        Self { bus }
    }

    /// Verify the device is reachable on the I2C bus.
    pub fn is_connected(&self) -> bool {
        let Ok(mut bus) = self.bus.lock() else {
            return false;
        };
        let mut buf = [0u8; 1];
        match bus.write_read(I2C_ADDR_MPU6050, &[REG_WHO_AM_I], &mut buf, I2C_TIMEOUT_TICKS) {
            Ok(()) => buf[0] == WHO_AM_I_EXPECTED,
            Err(_) => false,
        }
    }

    /// Wake the sensor and configure accel (±2 g), gyro (±250 °/s), DLPF 21 Hz.
    pub fn init(&self) -> anyhow::Result<()> {
        if !self.is_connected() {
            anyhow::bail!("MPU6050 not found at 0x{:02X}", I2C_ADDR_MPU6050);
        }

        let mut bus = self.bus.lock().map_err(|_| anyhow::anyhow!("I2C bus poisoned"))?;

        // Wake up (clear SLEEP bit)
        bus.write(I2C_ADDR_MPU6050, &[REG_PWR_MGMT_1, 0x00], I2C_TIMEOUT_TICKS)?;

        // DLPF bandwidth 21 Hz
        bus.write(I2C_ADDR_MPU6050, &[REG_CONFIG, 0x04], I2C_TIMEOUT_TICKS)?;

        // Gyroscope: ±250 °/s
        bus.write(I2C_ADDR_MPU6050, &[REG_GYRO_CONFIG, 0x00], I2C_TIMEOUT_TICKS)?;

        // Accelerometer: ±2 g
        bus.write(I2C_ADDR_MPU6050, &[REG_ACCEL_CONFIG, 0x00], I2C_TIMEOUT_TICKS)?;

        log::info!("MPU6050 initialised (±2g, ±250°/s, DLPF 21Hz)");
        Ok(())
    }

    /// Burst-read all 7 channels and convert to physical units.
    pub fn read_sample(&self) -> anyhow::Result<ImuSample> {
        let mut bus = self.bus.lock().map_err(|_| anyhow::anyhow!("I2C bus poisoned"))?;
        let mut raw = [0u8; 14];
        bus.write_read(
            I2C_ADDR_MPU6050,
            &[REG_ACCEL_XOUT_H],
            &mut raw,
            I2C_TIMEOUT_TICKS,
        )?;

        let word = |i: usize| i16::from_be_bytes([raw[i], raw[i + 1]]) as f32;

        Ok(ImuSample {
            ax: word(0) / ACCEL_SCALE_2G,
            ay: word(2) / ACCEL_SCALE_2G,
            az: word(4) / ACCEL_SCALE_2G,
            temperature: word(6) / TEMP_SCALE + TEMP_OFFSET_C,
            gx: word(8) / GYRO_SCALE_250,
            gy: word(10) / GYRO_SCALE_250,
            gz: word(12) / GYRO_SCALE_250,
        })
    }

    /// Collect `count` acceleration samples `delay_ms` apart (blocks the
    /// caller for roughly `count * delay_ms`).  Failed reads are skipped.
    pub fn sample_acceleration(&self, count: usize, delay_ms: u32) -> Vec<(f64, f64, f64)> {
        let mut samples = Vec::with_capacity(count);
        for _ in 0..count {
            match self.read_sample() {
                Ok(s) => samples.push((f64::from(s.ax), f64::from(s.ay), f64::from(s.az))),
                Err(e) => log::debug!("IMU sample dropped: {}", e),
            }
            if delay_ms > 0 {
                FreeRtos::delay_ms(delay_ms);
            }
        }
        samples
    }
}
