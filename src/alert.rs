// VibraWatch — Alert Sink
//
// Alarm patterns are played synchronously: the caller blocks until the last
// repetition has finished.

use std::thread;
use std::time::Duration;

use crate::thresholds::Metric;

/// `repeat` cycles of LED + tone, each lasting `duration_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPattern {
    pub repeat: u32,
    pub frequency_hz: u32,
    pub duration_ms: u32,
}

impl AlertPattern {
    pub const fn new(repeat: u32, frequency_hz: u32, duration_ms: u32) -> Self {
        Self { repeat, frequency_hz, duration_ms }
    }

    pub const LUX: Self = Self::new(3, 800, 300);
    pub const VIBRATION: Self = Self::new(3, 1000, 300);
    pub const TEMPERATURE: Self = Self::new(3, 1500, 300);
    pub const DISCONNECTED: Self = Self::new(2, 2000, 500);
    pub const FATAL: Self = Self::new(1, 400, 500);

    pub fn for_metric(metric: Metric) -> Self {
        match metric {
            Metric::Lux => Self::LUX,
            Metric::Vibration => Self::VIBRATION,
            Metric::Temperature => Self::TEMPERATURE,
        }
    }
}

pub trait AlertSink {
    /// Play `pattern` to completion (blocking).
    fn alert(&mut self, pattern: AlertPattern);

    /// Stop any tone and turn the alarm LED off.
    fn silence(&mut self);

    /// Drive the external load relay.
    fn set_relay(&mut self, on: bool);
}

/// Pause after each fatal alarm burst.
const FATAL_PAUSE: Duration = Duration::from_millis(1000);

/// Refuse to run: sound the fatal pattern forever.
pub fn halt_forever<A: AlertSink>(sink: &mut A) -> ! {
    log::error!("Halting — primary sensor unavailable");
    sink.set_relay(false);
    loop {
        sink.alert(AlertPattern::FATAL);
        thread::sleep(FATAL_PAUSE);
    }
}
