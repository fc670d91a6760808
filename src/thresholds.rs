// VibraWatch — Alert Thresholds & Evaluator
//
// Every bound is an `Option<f64>`: `None` means "no constraint on this side".
// A `ThresholdSet` is only ever replaced as a whole, never patched field by
// field.

use crate::reading::SensorReading;

/// A single optional bound.
pub type NullableThreshold = Option<f64>;

/// The min/max pair for one metric.  No ordering between the two is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub min: NullableThreshold,
    pub max: NullableThreshold,
}

impl Bounds {
    pub const UNCONSTRAINED: Self = Self { min: None, max: None };

    pub const fn new(min: NullableThreshold, max: NullableThreshold) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThresholdSet {
    pub vibration_min: NullableThreshold,
    pub vibration_max: NullableThreshold,
    pub temperature_min: NullableThreshold,
    pub temperature_max: NullableThreshold,
    pub lux_min: NullableThreshold,
    pub lux_max: NullableThreshold,
}

impl ThresholdSet {
    pub fn vibration(&self) -> Bounds {
        Bounds::new(self.vibration_min, self.vibration_max)
    }

    pub fn temperature(&self) -> Bounds {
        Bounds::new(self.temperature_min, self.temperature_max)
    }

    pub fn lux(&self) -> Bounds {
        Bounds::new(self.lux_min, self.lux_max)
    }

    pub fn bounds(&self, metric: Metric) -> Bounds {
        match metric {
            Metric::Lux => self.lux(),
            Metric::Vibration => self.vibration(),
            Metric::Temperature => self.temperature(),
        }
    }
}

// ---------------------------------------------------------------------------
// Alertable metrics
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Lux,
    Vibration,
    Temperature,
}

impl Metric {
    /// Evaluation order within a primary pass.
    pub const ALL: [Metric; 3] = [Metric::Lux, Metric::Vibration, Metric::Temperature];

    pub fn value(self, reading: &SensorReading) -> f64 {
        match self {
            Self::Lux => reading.lux,
            Self::Vibration => reading.vibration,
            Self::Temperature => reading.temperature,
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Self::Lux => "L",
            Self::Vibration => "V",
            Self::Temperature => "T",
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    BelowMin,
    AboveMax,
    #[default]
    InRange,
}

impl Verdict {
    pub fn is_alarm(self) -> bool {
        !matches!(self, Self::InRange)
    }
}

/// Classify `value` against `bounds`.
///
/// NaN (sensor unavailable) is always `InRange`.  The max bound is checked
/// first, so an inverted pair (`min > max`) resolves to `AboveMax` for values
/// that violate both.
pub fn evaluate(value: f64, bounds: Bounds) -> Verdict {
    if value.is_nan() {
        return Verdict::InRange;
    }
    if matches!(bounds.max, Some(max) if value > max) {
        return Verdict::AboveMax;
    }
    if matches!(bounds.min, Some(min) if value < min) {
        return Verdict::BelowMin;
    }
    Verdict::InRange
}

/// Verdicts for the three alertable metrics of one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Verdicts {
    pub lux: Verdict,
    pub vibration: Verdict,
    pub temperature: Verdict,
}

impl Verdicts {
    pub fn get(&self, metric: Metric) -> Verdict {
        match metric {
            Metric::Lux => self.lux,
            Metric::Vibration => self.vibration,
            Metric::Temperature => self.temperature,
        }
    }

    pub fn any_alarm(&self) -> bool {
        Metric::ALL.iter().any(|m| self.get(*m).is_alarm())
    }
}
