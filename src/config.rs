// VibraWatch — Hardware & System Configuration
// Target: ESP32 DevKit (Xtensa), Wokwi-compatible wiring

use crate::thresholds::ThresholdSet;

// ---------------------------------------------------------------------------
// GPIO Pin Definitions
// ---------------------------------------------------------------------------
pub const PIN_I2C_SDA: i32 = 21;
pub const PIN_I2C_SCL: i32 = 22;
pub const PIN_LDR: i32 = 34;   // ADC1 channel 6 — photoresistor divider
pub const PIN_BUZZER: i32 = 25; // LEDC PWM output
pub const PIN_LED: i32 = 15;    // Alarm LED
pub const PIN_RELAY: i32 = 32;  // External load relay

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_MPU6050: u8 = 0x68;
pub const I2C_ADDR_LCD: u8 = 0x27;     // PCF8574 backpack
pub const I2C_BAUDRATE_KHZ: u32 = 100;
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks

// ---------------------------------------------------------------------------
// Character LCD
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LcdKind {
    /// No panel fitted; feedback goes to the console only.
    None,
    Lcd16x2,
    Lcd20x4,
}

impl LcdKind {
    /// `(columns, rows)` of the panel.
    pub const fn dimensions(self) -> (u8, u8) {
        match self {
            Self::None => (20, 4),
            Self::Lcd16x2 => (16, 2),
            Self::Lcd20x4 => (20, 4),
        }
    }
}

pub const SELECTED_LCD: LcdKind = LcdKind::Lcd16x2;

// ---------------------------------------------------------------------------
// Network & API (override at build time through the environment)
// ---------------------------------------------------------------------------
pub const NETWORK_SSID: &str = match option_env!("NETWORK_SSID") {
    Some(ssid) => ssid,
    None => "Wokwi-GUEST",
};
pub const NETWORK_PASSWORD: &str = match option_env!("NETWORK_PASSWORD") {
    Some(password) => password,
    None => "",
};
pub const API_BASE_URL: &str = match option_env!("API_URL") {
    Some(url) => url,
    None => "http://localhost:8180",
};
pub const API_INIT_PATH: &str = "/init/";
pub const API_READING_PATH: &str = "/leitura/";

pub const HTTP_TIMEOUT_MS: u64 = 10_000;
pub const MAX_HTTP_BODY: usize = 2048;
pub const WIFI_CONNECT_TIMEOUT_MS: u64 = 10_000;

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_MONITOR: usize = 16 * 1024; // HTTP client + JSON on this stack

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const PRIMARY_INTERVAL_MS: u32 = 10_000;
pub const SECONDARY_DELAY_MS: u64 = 100;
pub const BOOT_STEP_DISPLAY_MS: u64 = 1000;
pub const REGISTERED_DISPLAY_MS: u64 = 1000;
pub const LCD_SPLASH_MS: u64 = 1000;

// ---------------------------------------------------------------------------
// Vibration sampling
// ---------------------------------------------------------------------------
pub const VIBRATION_SAMPLES: usize = 100;
pub const VIBRATION_SAMPLE_DELAY_MS: u32 = 5;

// ---------------------------------------------------------------------------
// LDR (voltage divider + power-law lux estimate)
// ---------------------------------------------------------------------------
pub const LDR_VCC: f64 = 3.3;
pub const LDR_RESISTOR_OHMS: f64 = 10_000.0;
pub const LDR_LUX_COEFFICIENT: f64 = 500_000.0;
pub const LDR_GAMMA: f64 = 0.7;
pub const ADC_FULL_SCALE: u16 = 4095;

// ---------------------------------------------------------------------------
// MPU6050 Sensor Scale Factors
// ---------------------------------------------------------------------------
pub const ACCEL_SCALE_2G: f32 = 16384.0; // LSB/g   at ±2 g
pub const GYRO_SCALE_250: f32 = 131.0;   // LSB/°/s at ±250 °/s
pub const TEMP_SCALE: f32 = 340.0;       // LSB/°C
pub const TEMP_OFFSET_C: f32 = 36.53;

// ---------------------------------------------------------------------------
// Default alert envelope (used until the server supplies one)
// ---------------------------------------------------------------------------
pub const DEFAULT_THRESHOLDS: ThresholdSet = ThresholdSet {
    vibration_min: None,
    vibration_max: Some(1.0),
    temperature_min: None,
    temperature_max: Some(70.0),
    lux_min: Some(500.0),
    lux_max: None,
};
