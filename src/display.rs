// VibraWatch — Feedback Display
//
// Position-addressed text output.  `fit_line` holds the clipping rules shared
// by every panel size; `render_pass` lays out one primary-pass screen.

use crate::reading::SensorReading;
use crate::thresholds::{Metric, Verdict, Verdicts};

pub trait FeedbackDisplay {
    fn clear(&mut self);

    /// Write `text` at `(col, row)`, replacing whatever was on that row.
    fn write(&mut self, col: u8, row: u8, text: &str);
}

/// Clip a write to a `cols` x `rows` panel.
///
/// Rows past the bottom wrap around; text is cut at the right edge.  Returns
/// `None` when the column itself is off-panel.
pub fn fit_line(col: u8, row: u8, text: &str, cols: u8, rows: u8) -> Option<(u8, u8, String)> {
    if cols == 0 || rows == 0 || col >= cols {
        return None;
    }
    let row = row % rows;
    let room = usize::from(cols - col);
    Some((col, row, text.chars().take(room).collect()))
}

/// Fixed-precision value, or `Err` for an unavailable sensor.
pub fn format_value(value: f64, precision: usize) -> String {
    if value.is_nan() {
        "Err".to_string()
    } else {
        format!("{:.*}", precision, value)
    }
}

fn verdict_flag(metric: Metric, verdict: Verdict) -> Option<String> {
    match verdict {
        Verdict::AboveMax => Some(format!("{}+", metric.short_name())),
        Verdict::BelowMin => Some(format!("{}-", metric.short_name())),
        Verdict::InRange => None,
    }
}

/// Status summary: `OK`, or the out-of-range metrics as `V+ T- ...`.
pub fn status_line(verdicts: &Verdicts) -> String {
    let flags: Vec<String> = Metric::ALL
        .iter()
        .filter_map(|m| verdict_flag(*m, verdicts.get(*m)))
        .collect();
    if flags.is_empty() {
        "OK".to_string()
    } else {
        flags.join(" ")
    }
}

/// Draw the readings of one primary pass.  Rows 2 and 3 only land on a
/// four-row panel; smaller panels wrap them over the top rows.
pub fn render_pass<D: FeedbackDisplay>(
    display: &mut D,
    reading: &SensorReading,
    verdicts: &Verdicts,
    rows: u8,
) {
    display.clear();
    display.write(
        0,
        0,
        &format!(
            "T:{}C L:{}",
            format_value(reading.temperature, 1),
            format_value(reading.lux, 0)
        ),
    );
    display.write(
        0,
        1,
        &format!("V:{} {}", format_value(reading.vibration, 2), status_line(verdicts)),
    );

    if rows >= 4 {
        display.write(0, 2, "Accelerometer:");
        display.write(
            0,
            3,
            &format!(
                "x:{} y:{} z:{}",
                format_value(reading.accel_x, 1),
                format_value(reading.accel_y, 1),
                format_value(reading.accel_z, 1)
            ),
        );
    }
}
