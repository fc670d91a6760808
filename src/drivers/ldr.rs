// VibraWatch — Photoresistor (LDR) Driver
//
// One-shot ADC read of the LDR divider through raw ESP-IDF calls; the count
// is turned into lux by `LdrModel`.

use crate::reading::LdrModel;

// GPIO34 is ADC1 channel 6 on the ESP32.
const LDR_ADC_CHANNEL: esp_idf_sys::adc_channel_t = esp_idf_sys::adc_channel_t_ADC_CHANNEL_6;

pub struct Ldr {
    handle: esp_idf_sys::adc_oneshot_unit_handle_t,
    model: LdrModel,
}

impl Ldr {
    /// Claim ADC unit 1 and configure the LDR channel (12 dB, 12 bit).
    pub fn new(model: LdrModel) -> anyhow::Result<Self> {
        let mut handle: esp_idf_sys::adc_oneshot_unit_handle_t = core::ptr::null_mut();
        unsafe {
            let unit_cfg = esp_idf_sys::adc_oneshot_unit_init_cfg_t {
                unit_id: esp_idf_sys::adc_unit_t_ADC_UNIT_1,
                ulp_mode: esp_idf_sys::adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..core::mem::zeroed()
            };
            esp_idf_sys::esp!(esp_idf_sys::adc_oneshot_new_unit(&unit_cfg, &mut handle))?;

            let chan_cfg = esp_idf_sys::adc_oneshot_chan_cfg_t {
                atten: esp_idf_sys::adc_atten_t_ADC_ATTEN_DB_12,
                bitwidth: esp_idf_sys::adc_bitwidth_t_ADC_BITWIDTH_12,
            };
            esp_idf_sys::esp!(esp_idf_sys::adc_oneshot_config_channel(
                handle,
                LDR_ADC_CHANNEL,
                &chan_cfg
            ))?;
        }

        log::info!("LDR initialised on ADC1 channel 6");
        Ok(Self { handle, model })
    }

    pub fn read_raw(&self) -> anyhow::Result<u16> {
        let mut raw: i32 = 0;
        unsafe {
            esp_idf_sys::esp!(esp_idf_sys::adc_oneshot_read(self.handle, LDR_ADC_CHANNEL, &mut raw))?;
        }
        Ok(raw.clamp(0, i32::from(u16::MAX)) as u16)
    }

    /// Estimated illuminance, NaN if the ADC read fails or the divider is railed.
    pub fn read_lux(&self) -> f64 {
        match self.read_raw() {
            Ok(raw) => self.model.lux_from_adc(raw),
            Err(e) => {
                log::warn!("LDR read error: {}", e);
                f64::NAN
            }
        }
    }
}
