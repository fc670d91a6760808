// VibraWatch — Buzzer, Alarm LED & Relay Driver
//
// The buzzer is driven by LEDC PWM (50 % duty square wave) through raw
// ESP-IDF calls; LED and relay are plain GPIO outputs.

use std::thread;
use std::time::Duration;

use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};

use crate::alert::{AlertPattern, AlertSink};
use crate::config::PIN_BUZZER;

const LEDC_MODE: esp_idf_sys::ledc_mode_t = esp_idf_sys::ledc_mode_t_LEDC_LOW_SPEED_MODE;
const LEDC_TIMER: esp_idf_sys::ledc_timer_t = esp_idf_sys::ledc_timer_t_LEDC_TIMER_0;
const LEDC_CHANNEL: esp_idf_sys::ledc_channel_t = esp_idf_sys::ledc_channel_t_LEDC_CHANNEL_0;
const LEDC_HALF_DUTY: u32 = 128; // of 256 at 8-bit resolution
const LEDC_BASE_FREQ_HZ: u32 = 2000;

pub struct BuzzerLed<'d> {
    led: PinDriver<'d, AnyOutputPin, Output>,
    relay: PinDriver<'d, AnyOutputPin, Output>,
    relay_on: bool,
}

impl<'d> BuzzerLed<'d> {
    /// Configure the PWM channel and park every output low.
    pub fn new(
        mut led: PinDriver<'d, AnyOutputPin, Output>,
        mut relay: PinDriver<'d, AnyOutputPin, Output>,
    ) -> anyhow::Result<Self> {
        unsafe {
            let timer_cfg = esp_idf_sys::ledc_timer_config_t {
                speed_mode: LEDC_MODE,
                timer_num: LEDC_TIMER,
                freq_hz: LEDC_BASE_FREQ_HZ,
                clk_cfg: esp_idf_sys::soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
                duty_resolution: esp_idf_sys::ledc_timer_bit_t_LEDC_TIMER_8_BIT,
                ..core::mem::zeroed()
            };
            esp_idf_sys::esp!(esp_idf_sys::ledc_timer_config(&timer_cfg))?;

            let channel_cfg = esp_idf_sys::ledc_channel_config_t {
                gpio_num: PIN_BUZZER,
                speed_mode: LEDC_MODE,
                channel: LEDC_CHANNEL,
                timer_sel: LEDC_TIMER,
                duty: 0,
                hpoint: 0,
                ..core::mem::zeroed()
            };
            esp_idf_sys::esp!(esp_idf_sys::ledc_channel_config(&channel_cfg))?;
        }

        led.set_low()?;
        relay.set_low()?;
        log::info!("Buzzer/LED/relay ready");
        Ok(Self { led, relay, relay_on: false })
    }

    pub fn play_tone(&mut self, frequency_hz: u32) {
        unsafe {
            let ret = esp_idf_sys::ledc_set_freq(LEDC_MODE, LEDC_TIMER, frequency_hz);
            if ret != esp_idf_sys::ESP_OK {
                log::warn!("LEDC set_freq({} Hz) failed ({})", frequency_hz, ret);
                return;
            }
            esp_idf_sys::ledc_set_duty(LEDC_MODE, LEDC_CHANNEL, LEDC_HALF_DUTY);
            esp_idf_sys::ledc_update_duty(LEDC_MODE, LEDC_CHANNEL);
        }
    }

    pub fn stop_tone(&mut self) {
        unsafe {
            esp_idf_sys::ledc_set_duty(LEDC_MODE, LEDC_CHANNEL, 0);
            esp_idf_sys::ledc_update_duty(LEDC_MODE, LEDC_CHANNEL);
        }
    }
}

impl AlertSink for BuzzerLed<'_> {
    fn alert(&mut self, pattern: AlertPattern) {
        let on_time = Duration::from_millis(u64::from(pattern.duration_ms));
        for i in 0..pattern.repeat {
            let _ = self.led.set_high();
            self.play_tone(pattern.frequency_hz);
            thread::sleep(on_time);
            let _ = self.led.set_low();
            self.stop_tone();

            // Pause between cycles, not after the last one.
            if i + 1 < pattern.repeat {
                thread::sleep(on_time);
            }
        }
    }

    fn silence(&mut self) {
        let _ = self.led.set_low();
        self.stop_tone();
    }

    fn set_relay(&mut self, on: bool) {
        if on == self.relay_on {
            return;
        }
        let result = if on { self.relay.set_high() } else { self.relay.set_low() };
        match result {
            Ok(()) => {
                self.relay_on = on;
                log::info!("Relay {}", if on { "on" } else { "off" });
            }
            Err(e) => log::error!("Relay GPIO error: {}", e),
        }
    }
}
