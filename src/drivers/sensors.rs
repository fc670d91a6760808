// VibraWatch — Sensor Suite
//
// Combines the IMU and the LDR into one snapshot per primary pass.  A failed
// read leaves the affected fields NaN instead of aborting the pass.

use crate::config::*;
use crate::drivers::imu::Mpu6050;
use crate::drivers::ldr::Ldr;
use crate::reading::{vibration_from_samples, SensorReading, SensorSource};

pub struct SensorSuite {
    imu: Mpu6050,
    ldr: Option<Ldr>,
}

impl SensorSuite {
    pub fn new(imu: Mpu6050, ldr: Option<Ldr>) -> Self {
        Self { imu, ldr }
    }
}

impl SensorSource for SensorSuite {
    fn read(&mut self) -> SensorReading {
        let mut reading = SensorReading::UNAVAILABLE;

        match self.imu.read_sample() {
            Ok(s) => {
                reading.temperature = f64::from(s.temperature);
                reading.accel_x = f64::from(s.ax);
                reading.accel_y = f64::from(s.ay);
                reading.accel_z = f64::from(s.az);
                reading.gyro_x = f64::from(s.gx);
                reading.gyro_y = f64::from(s.gy);
                reading.gyro_z = f64::from(s.gz);
            }
            Err(e) => log::warn!("IMU read error: {}", e),
        }

        if let Some(ldr) = &self.ldr {
            reading.lux = ldr.read_lux();
        }

        // Blocks for ~VIBRATION_SAMPLES * VIBRATION_SAMPLE_DELAY_MS.
        reading.vibration = vibration_from_samples(
            self.imu
                .sample_acceleration(VIBRATION_SAMPLES, VIBRATION_SAMPLE_DELAY_MS),
        );

        reading
    }
}
