// VibraWatch — Condition-Monitoring Firmware Library
//
// Everything that does not touch hardware lives here and builds for the host,
// so the alerting and scheduling logic can be tested off-target.  Drivers and
// networking are only compiled for ESP-IDF.

pub mod alert;
pub mod api;
pub mod config;
pub mod display;
pub mod error;
pub mod reading;
pub mod registration;
pub mod scheduler;
pub mod thresholds;

#[cfg(target_os = "espidf")]
pub mod drivers;
#[cfg(target_os = "espidf")]
pub mod net;

/// Milliseconds since boot (wraps at ~49 days — fine for intervals).
#[cfg(target_os = "espidf")]
pub fn now_ms() -> u32 {
    unsafe { (esp_idf_sys::esp_timer_get_time() / 1000) as u32 }
}
