// VibraWatch — Poll Scheduler
//
// One cooperative loop, two phases:
//   * primary   — every `interval_ms`: sample, evaluate, alarm, draw.
//   * secondary — every other tick: report the latest snapshot once,
//                 registering or reconnecting first when needed.
//
// All shared state lives in `MonitorState`, owned by the scheduler; nothing
// here is global.

use std::thread;
use std::time::Duration;

use crate::alert::{AlertPattern, AlertSink};
use crate::api::{ReadingReport, RemoteChannel};
use crate::config::{API_READING_PATH, PRIMARY_INTERVAL_MS, REGISTERED_DISPLAY_MS};
use crate::display::{self, FeedbackDisplay};
use crate::reading::{SensorReading, SensorSource};
use crate::registration::{self, RegistrationState};
use crate::thresholds::{evaluate, Metric, ThresholdSet, Verdict, Verdicts};

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorState {
    pub thresholds: ThresholdSet,
    pub registration: RegistrationState,
    /// Set once the current snapshot has been accepted by the server.
    pub report_sent: bool,
    /// Most recent completed primary-pass snapshot.
    pub latest: Option<SensorReading>,
    pub verdicts: Verdicts,
}

impl MonitorState {
    pub fn new(device_id: impl Into<String>, thresholds: ThresholdSet) -> Self {
        Self {
            thresholds,
            registration: RegistrationState::new(device_id),
            report_sent: false,
            latest: None,
            verdicts: Verdicts::default(),
        }
    }
}

/// What a secondary pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryOutcome {
    AlreadyReported,
    Reconnecting,
    Registered,
    RegistrationFailed(i32),
    NoReading,
    Reported,
    ReportFailed(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Primary,
    Secondary(SecondaryOutcome),
}

pub struct Scheduler<S, A, D, C> {
    sensors: S,
    alerts: A,
    display: D,
    channel: C,
    state: MonitorState,
    interval_ms: u32,
    display_rows: u8,
    /// How long "Sensor ready!" stays up before the loop resumes.
    registered_hold: Duration,
    last_primary_ms: Option<u32>,
}

impl<S, A, D, C> Scheduler<S, A, D, C>
where
    S: SensorSource,
    A: AlertSink,
    D: FeedbackDisplay,
    C: RemoteChannel,
{
    pub fn new(sensors: S, alerts: A, display: D, channel: C, state: MonitorState) -> Self {
        Self {
            sensors,
            alerts,
            display,
            channel,
            state,
            interval_ms: PRIMARY_INTERVAL_MS,
            display_rows: 2,
            registered_hold: Duration::from_millis(REGISTERED_DISPLAY_MS),
            last_primary_ms: None,
        }
    }

    pub fn with_interval_ms(mut self, interval_ms: u32) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn with_display_rows(mut self, rows: u8) -> Self {
        self.display_rows = rows;
        self
    }

    pub fn with_registered_hold_ms(mut self, hold_ms: u64) -> Self {
        self.registered_hold = Duration::from_millis(hold_ms);
        self
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Run one scheduler step at monotonic time `now_ms` (wrapping).
    ///
    /// The first tick always runs a primary pass so that a snapshot exists
    /// before anything is reported.
    pub fn tick(&mut self, now_ms: u32) -> Phase {
        let due = match self.last_primary_ms {
            None => true,
            Some(last) => now_ms.wrapping_sub(last) >= self.interval_ms,
        };

        if due {
            self.last_primary_ms = Some(now_ms);
            self.primary_pass();
            Phase::Primary
        } else {
            Phase::Secondary(self.secondary_pass())
        }
    }

    /// Sample, evaluate, draw, then play the alarm of every out-of-range
    /// metric (blocking).
    pub fn primary_pass(&mut self) {
        let reading = self.sensors.read();
        let thresholds = self.state.thresholds;

        let verdicts = Verdicts {
            lux: evaluate(reading.lux, thresholds.lux()),
            vibration: evaluate(reading.vibration, thresholds.vibration()),
            temperature: evaluate(reading.temperature, thresholds.temperature()),
        };

        log::info!(
            "Temp: {:.2} | Lux: {:.0} | Vib: {:.2} | Accel X:{:.2} Y:{:.2} Z:{:.2} | {}",
            reading.temperature,
            reading.lux,
            reading.vibration,
            reading.accel_x,
            reading.accel_y,
            reading.accel_z,
            display::status_line(&verdicts)
        );

        display::render_pass(&mut self.display, &reading, &verdicts, self.display_rows);

        let alarm = verdicts.any_alarm();
        self.alerts.set_relay(alarm);
        if alarm {
            for metric in Metric::ALL {
                let verdict = verdicts.get(metric);
                if verdict.is_alarm() {
                    log_alarm(metric, verdict, &reading, &thresholds);
                    self.alerts.alert(AlertPattern::for_metric(metric));
                }
            }
        } else {
            self.alerts.silence();
        }

        self.state.latest = Some(reading);
        self.state.verdicts = verdicts;
        self.state.report_sent = false;
    }

    /// Best-effort reporting.  A no-op once the current snapshot is reported.
    pub fn secondary_pass(&mut self) -> SecondaryOutcome {
        if self.state.report_sent {
            return SecondaryOutcome::AlreadyReported;
        }

        if !self.channel.is_connected() {
            log::warn!("WiFi disconnected — trying to reconnect");
            self.display.write(0, 1, "WiFi offline");
            self.alerts.alert(AlertPattern::DISCONNECTED);
            self.channel.reconnect();
            return SecondaryOutcome::Reconnecting;
        }

        if !self.state.registration.registered {
            return self.register();
        }

        let Some(reading) = self.state.latest else {
            return SecondaryOutcome::NoReading;
        };

        let report = ReadingReport::new(&self.state.registration.device_id, &reading);
        let body = match serde_json::to_string(&report) {
            Ok(body) => body,
            Err(e) => {
                log::error!("Could not encode reading: {}", e);
                return SecondaryOutcome::NoReading;
            }
        };

        let response = self.channel.post_json(API_READING_PATH, &body);
        if response.is_success() {
            log::info!("Reading sent (status {})", response.status);
            self.state.report_sent = true;
            return SecondaryOutcome::Reported;
        }

        log::warn!("Failed to send reading — status {}", response.status);
        if response.is_not_connected() {
            // Session presumed lost; announce the device again before the next report.
            self.state.registration.registered = false;
        }
        SecondaryOutcome::ReportFailed(response.status)
    }

    fn register(&mut self) -> SecondaryOutcome {
        self.display.write(0, 0, "Registering...");

        let outcome =
            registration::register(&mut self.channel, &self.state.registration.device_id);
        outcome.apply(&mut self.state.registration, &mut self.state.thresholds);

        if outcome.success {
            self.display.write(0, 0, "Sensor ready!");
            log::info!("Registered as {}", self.state.registration.device_id);
            thread::sleep(self.registered_hold);
            SecondaryOutcome::Registered
        } else {
            self.display.write(0, 0, &format!("Init failed: {}", outcome.status));
            SecondaryOutcome::RegistrationFailed(outcome.status)
        }
    }
}

fn log_alarm(metric: Metric, verdict: Verdict, reading: &SensorReading, thresholds: &ThresholdSet) {
    let bounds = thresholds.bounds(metric);
    log::warn!(
        "ALERT {:?} {:?}: value {:.2} (min {:?}, max {:?})",
        metric,
        verdict,
        metric.value(reading),
        bounds.min,
        bounds.max
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Response;
    use crate::display::tests::RecordingDisplay;
    use crate::registration::tests::ScriptedChannel;

    struct FixedSensors {
        reading: SensorReading,
        reads: usize,
    }

    impl SensorSource for FixedSensors {
        fn read(&mut self) -> SensorReading {
            self.reads += 1;
            self.reading
        }
    }

    #[derive(Default)]
    struct RecordingAlerts {
        patterns: Vec<AlertPattern>,
        silences: usize,
        relay: bool,
    }

    impl AlertSink for RecordingAlerts {
        fn alert(&mut self, pattern: AlertPattern) {
            self.patterns.push(pattern);
        }

        fn silence(&mut self) {
            self.silences += 1;
        }

        fn set_relay(&mut self, on: bool) {
            self.relay = on;
        }
    }

    type TestScheduler = Scheduler<FixedSensors, RecordingAlerts, RecordingDisplay, ScriptedChannel>;

    fn calm() -> SensorReading {
        SensorReading {
            temperature: 25.0,
            lux: 800.0,
            accel_x: 0.0,
            accel_y: 0.0,
            accel_z: 1.0,
            gyro_x: 0.0,
            gyro_y: 0.0,
            gyro_z: 0.0,
            vibration: 0.05,
        }
    }

    fn scheduler(
        reading: SensorReading,
        thresholds: ThresholdSet,
        responses: Vec<Response>,
    ) -> TestScheduler {
        Scheduler::new(
            FixedSensors { reading, reads: 0 },
            RecordingAlerts::default(),
            RecordingDisplay::default(),
            ScriptedChannel::new(responses),
            MonitorState::new("0000563412C40A24", thresholds),
        )
        .with_registered_hold_ms(0)
    }

    #[test]
    fn first_tick_is_primary() {
        let mut s = scheduler(calm(), ThresholdSet::default(), vec![]);
        assert_eq!(s.tick(0), Phase::Primary);
        assert_eq!(s.sensors.reads, 1);
        assert!(s.state().latest.is_some());
        assert!(s.channel.requests.is_empty());
    }

    #[test]
    fn ticks_within_interval_run_one_secondary_each() {
        let mut s = scheduler(calm(), ThresholdSet::default(), vec![Response::new(503, "")]);
        s.tick(0);
        let reads = s.sensors.reads;

        assert!(matches!(s.tick(100), Phase::Secondary(_)));
        assert!(matches!(s.tick(200), Phase::Secondary(_)));
        assert_eq!(s.sensors.reads, reads);
        // One registration attempt per secondary pass.
        assert_eq!(s.channel.requests.len(), 2);
    }

    #[test]
    fn primary_runs_again_after_interval() {
        let mut s = scheduler(calm(), ThresholdSet::default(), vec![]).with_interval_ms(10_000);
        s.tick(1_000);
        assert!(matches!(s.tick(10_999), Phase::Secondary(_)));
        assert_eq!(s.tick(11_000), Phase::Primary);
        assert_eq!(s.sensors.reads, 2);
    }

    #[test]
    fn interval_survives_clock_wrap() {
        let mut s = scheduler(calm(), ThresholdSet::default(), vec![]).with_interval_ms(10_000);
        s.tick(u32::MAX - 4_000);
        assert!(matches!(s.tick(u32::MAX), Phase::Secondary(_)));
        assert!(matches!(s.tick(5_000), Phase::Secondary(_)));
        assert_eq!(s.tick(6_000), Phase::Primary);
    }

    #[test]
    fn vibration_above_max_alarms_once() {
        let reading = SensorReading { vibration: 1.5, ..calm() };
        let thresholds = ThresholdSet { vibration_max: Some(1.0), ..Default::default() };
        let mut s = scheduler(reading, thresholds, vec![]);

        s.primary_pass();

        assert_eq!(s.state().verdicts.vibration, Verdict::AboveMax);
        assert_eq!(s.alerts.patterns, vec![AlertPattern::VIBRATION]);
        assert!(s.alerts.relay);
        assert_eq!(s.display.writes[1].2, "V:1.50 V+");
    }

    #[test]
    fn every_violated_metric_alarms_in_order() {
        let reading = SensorReading { temperature: 90.0, lux: 10.0, vibration: 2.0, ..calm() };
        let mut s = scheduler(reading, crate::config::DEFAULT_THRESHOLDS, vec![]);
        s.primary_pass();
        assert_eq!(
            s.alerts.patterns,
            vec![AlertPattern::LUX, AlertPattern::VIBRATION, AlertPattern::TEMPERATURE]
        );
    }

    #[test]
    fn nan_reading_never_alarms() {
        let mut s = scheduler(SensorReading::UNAVAILABLE, crate::config::DEFAULT_THRESHOLDS, vec![]);
        s.primary_pass();
        assert!(s.alerts.patterns.is_empty());
        assert!(!s.alerts.relay);
        assert_eq!(s.alerts.silences, 1);
        assert_eq!(s.display.writes[0].2, "T:ErrC L:Err");
    }

    #[test]
    fn reported_snapshot_makes_secondary_a_noop() {
        let mut s = scheduler(calm(), ThresholdSet::default(), vec![Response::new(200, "")]);
        s.state.registration.registered = true;
        s.tick(0);

        assert_eq!(s.secondary_pass(), SecondaryOutcome::Reported);
        assert!(s.state().report_sent);
        let sent = s.channel.requests.len();

        s.channel.connected = false;
        assert_eq!(s.secondary_pass(), SecondaryOutcome::AlreadyReported);
        assert_eq!(s.channel.requests.len(), sent);
        assert_eq!(s.channel.reconnects, 0);
        assert!(s.alerts.patterns.is_empty());
    }

    #[test]
    fn primary_pass_clears_report_flag() {
        let mut s = scheduler(calm(), ThresholdSet::default(), vec![]);
        s.state.report_sent = true;
        s.primary_pass();
        assert!(!s.state().report_sent);
    }

    #[test]
    fn report_body_carries_serial_and_readings() {
        let mut s = scheduler(calm(), ThresholdSet::default(), vec![Response::new(201, "")]);
        s.state.registration.registered = true;
        s.tick(0);
        s.tick(100);

        let (path, body) = &s.channel.requests[0];
        assert_eq!(path, "/leitura/");
        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["serial"], "0000563412C40A24");
        assert_eq!(json["temperatura"], 25.0);
        assert_eq!(json["vibracao_media"], 0.05);
    }

    #[test]
    fn disconnected_alerts_and_reconnects() {
        let mut s = scheduler(calm(), ThresholdSet::default(), vec![]);
        s.tick(0);
        s.channel.connected = false;

        assert_eq!(s.tick(100), Phase::Secondary(SecondaryOutcome::Reconnecting));
        assert_eq!(s.alerts.patterns, vec![AlertPattern::DISCONNECTED]);
        assert_eq!(s.channel.reconnects, 1);
        assert!(s.channel.requests.is_empty());
        assert_eq!(s.display.writes.last().unwrap(), &(0, 1, "WiFi offline".to_string()));
    }

    #[test]
    fn successful_registration_holds_ready_message() {
        let mut s = scheduler(calm(), ThresholdSet::default(), vec![Response::new(200, "{}")])
            .with_registered_hold_ms(30);
        s.tick(0);

        let started = std::time::Instant::now();
        assert_eq!(s.tick(100), Phase::Secondary(SecondaryOutcome::Registered));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn failed_registration_does_not_hold() {
        let mut s = scheduler(calm(), ThresholdSet::default(), vec![Response::new(503, "")])
            .with_registered_hold_ms(10_000);
        s.tick(0);

        let started = std::time::Instant::now();
        assert_eq!(s.tick(100), Phase::Secondary(SecondaryOutcome::RegistrationFailed(503)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn unregistered_device_registers_instead_of_reporting() {
        let mut s = scheduler(
            calm(),
            ThresholdSet::default(),
            vec![Response::new(200, r#"{"lux_threshold_min": 300}"#), Response::new(200, "")],
        );
        s.tick(0);

        assert_eq!(s.tick(100), Phase::Secondary(SecondaryOutcome::Registered));
        assert!(s.state().registration.registered);
        assert_eq!(s.state().thresholds, ThresholdSet { lux_min: Some(300.0), ..Default::default() });
        assert_eq!(s.channel.requests.len(), 1);
        assert_eq!(s.channel.requests[0].0, "/init/");
        assert_eq!(s.display.writes.last().unwrap().2, "Sensor ready!");

        assert_eq!(s.tick(200), Phase::Secondary(SecondaryOutcome::Reported));
        assert_eq!(s.channel.requests[1].0, "/leitura/");
    }

    #[test]
    fn failed_registration_is_retried_next_tick() {
        let thresholds = crate::config::DEFAULT_THRESHOLDS;
        let mut s = scheduler(
            calm(),
            thresholds,
            vec![Response::new(503, r#"{"lux_threshold_min": 1}"#), Response::new(200, "{}")],
        );
        s.tick(0);

        assert_eq!(s.tick(100), Phase::Secondary(SecondaryOutcome::RegistrationFailed(503)));
        assert!(!s.state().registration.registered);
        assert_eq!(s.state().thresholds, thresholds);
        assert_eq!(s.display.writes.last().unwrap().2, "Init failed: 503");

        assert_eq!(s.tick(200), Phase::Secondary(SecondaryOutcome::Registered));
        assert_eq!(s.channel.requests.iter().filter(|(p, _)| p == "/init/").count(), 2);
    }

    #[test]
    fn sentinel_on_submit_forces_reregistration() {
        let mut s = scheduler(
            calm(),
            ThresholdSet::default(),
            vec![
                Response::new(200, "{}"),
                Response::new(200, ""),
                Response::not_connected(),
                Response::new(200, "{}"),
            ],
        );
        s.tick(0);
        assert_eq!(s.tick(100), Phase::Secondary(SecondaryOutcome::Registered));
        assert_eq!(s.tick(200), Phase::Secondary(SecondaryOutcome::Reported));

        s.tick(20_000); // next primary
        assert_eq!(s.tick(20_100), Phase::Secondary(SecondaryOutcome::ReportFailed(-1)));
        assert!(!s.state().registration.registered);

        assert_eq!(s.tick(20_200), Phase::Secondary(SecondaryOutcome::Registered));
        assert_eq!(s.channel.requests.last().unwrap().0, "/init/");
    }

    #[test]
    fn other_failures_keep_registration_and_retry() {
        let mut s = scheduler(
            calm(),
            ThresholdSet::default(),
            vec![Response::new(500, ""), Response::new(200, "")],
        );
        s.state.registration.registered = true;
        s.tick(0);

        assert_eq!(s.tick(100), Phase::Secondary(SecondaryOutcome::ReportFailed(500)));
        assert!(s.state().registration.registered);
        assert!(!s.state().report_sent);
        assert_eq!(s.tick(200), Phase::Secondary(SecondaryOutcome::Reported));
    }
}
