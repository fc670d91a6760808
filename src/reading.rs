// VibraWatch — Sensor Snapshot & Conversions
//
// NaN in any field means "sensor unavailable" and is carried through to the
// display and the report untouched.

/// One primary-pass snapshot.  Units: °C, lux, g, °/s, g.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature: f64,
    pub lux: f64,
    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
    pub vibration: f64,
}

impl SensorReading {
    /// A snapshot where every sensor is unavailable.
    pub const UNAVAILABLE: Self = Self {
        temperature: f64::NAN,
        lux: f64::NAN,
        accel_x: f64::NAN,
        accel_y: f64::NAN,
        accel_z: f64::NAN,
        gyro_x: f64::NAN,
        gyro_y: f64::NAN,
        gyro_z: f64::NAN,
        vibration: f64::NAN,
    };
}

impl Default for SensorReading {
    fn default() -> Self {
        Self::UNAVAILABLE
    }
}

/// Anything that can produce a fresh snapshot (blocking).
pub trait SensorSource {
    fn read(&mut self) -> SensorReading;
}

/// Mean deviation of the acceleration magnitude from 1 g.
///
/// Each sample is `(ax, ay, az)` in g.  Samples containing NaN are skipped;
/// returns NaN when no usable sample remains.
pub fn vibration_from_samples<I>(samples: I) -> f64
where
    I: IntoIterator<Item = (f64, f64, f64)>,
{
    let (sum, count) = samples
        .into_iter()
        .filter(|(x, y, z)| !(x.is_nan() || y.is_nan() || z.is_nan()))
        .map(|(x, y, z)| ((x * x + y * y + z * z).sqrt() - 1.0).abs())
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));

    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Electrical model of the LDR voltage divider.
#[derive(Debug, Clone, Copy)]
pub struct LdrModel {
    pub vcc: f64,
    pub resistor_ohms: f64,
    pub lux_coefficient: f64,
    pub gamma: f64,
    pub adc_full_scale: u16,
}

impl LdrModel {
    /// Estimated illuminance for a raw ADC count, NaN when the divider output
    /// is railed (0 or full scale).
    pub fn lux_from_adc(&self, adc: u16) -> f64 {
        if adc == 0 {
            return f64::NAN;
        }
        let vout = f64::from(adc) / f64::from(self.adc_full_scale) * self.vcc;
        if vout <= 0.0 || vout >= self.vcc {
            return f64::NAN;
        }
        let r_ldr = self.resistor_ohms * (self.vcc / vout - 1.0);
        (self.lux_coefficient / r_ldr).powf(1.0 / self.gamma)
    }
}

impl Default for LdrModel {
    fn default() -> Self {
        use crate::config::*;
        Self {
            vcc: LDR_VCC,
            resistor_ohms: LDR_RESISTOR_OHMS,
            lux_coefficient: LDR_LUX_COEFFICIENT,
            gamma: LDR_GAMMA,
            adc_full_scale: ADC_FULL_SCALE,
        }
    }
}

/// Device serial: the factory MAC packed little-endian into a `u64`, printed
/// as 16 upper-case hex digits.
pub fn format_serial(mac: [u8; 6]) -> String {
    let mut packed = [0u8; 8];
    packed[..6].copy_from_slice(&mac);
    format!("{:016X}", u64::from_le_bytes(packed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resting_sensor_has_no_vibration() {
        let v = vibration_from_samples(std::iter::repeat((0.0, 0.0, 1.0)).take(10));
        assert!(v.abs() < 1e-12);
    }

    #[test]
    fn vibration_is_mean_deviation() {
        // |a| = 2 g and |a| = 0.5 g -> deviations 1.0 and 0.5
        let v = vibration_from_samples([(0.0, 0.0, 2.0), (0.0, 0.5, 0.0)]);
        assert!((v - 0.75).abs() < 1e-12);
    }

    #[test]
    fn vibration_without_samples_is_nan() {
        assert!(vibration_from_samples(Vec::<(f64, f64, f64)>::new()).is_nan());
        assert!(vibration_from_samples([(f64::NAN, 0.0, 1.0)]).is_nan());
    }

    #[test]
    fn lux_rails_are_nan() {
        let ldr = LdrModel::default();
        assert!(ldr.lux_from_adc(0).is_nan());
        assert!(ldr.lux_from_adc(4095).is_nan());
    }

    #[test]
    fn lux_increases_with_adc() {
        let ldr = LdrModel::default();
        let dim = ldr.lux_from_adc(1000);
        let bright = ldr.lux_from_adc(3000);
        assert!(dim.is_finite() && bright.is_finite());
        assert!(bright > dim);
    }

    #[test]
    fn lux_midpoint_matches_model() {
        // vout = vcc/2 -> r_ldr = R -> lux = (500000/10000)^(1/0.7)
        let ldr = LdrModel { adc_full_scale: 100, ..LdrModel::default() };
        let expected = 50f64.powf(1.0 / 0.7);
        assert!((ldr.lux_from_adc(50) - expected).abs() < 1e-9);
    }

    #[test]
    fn serial_is_little_endian_hex() {
        let serial = format_serial([0x24, 0x0A, 0xC4, 0x12, 0x34, 0x56]);
        assert_eq!(serial, "0000563412C40A24");
        assert_eq!(serial.len(), 16);
    }

    #[test]
    fn default_reading_is_unavailable() {
        let r = SensorReading::default();
        assert!(r.temperature.is_nan() && r.lux.is_nan() && r.vibration.is_nan());
    }
}
