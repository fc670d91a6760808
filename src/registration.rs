// VibraWatch — Registration Handshake
//
// Announces the device serial to `/init/`.  A 2xx answer registers the device
// and may carry a new alert envelope, which replaces the current one as a
// whole: keys missing from the answer become unbounded, they are not inherited.

use crate::api::{RegisterRequest, RemoteChannel, ThresholdPayload, STATUS_NOT_CONNECTED};
use crate::config::API_INIT_PATH;
use crate::thresholds::ThresholdSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationState {
    pub registered: bool,
    pub device_id: String,
}

impl RegistrationState {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self { registered: false, device_id: device_id.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationOutcome {
    pub success: bool,
    pub status: i32,
    /// Replacement envelope, present only when the answer carried one.
    pub thresholds: Option<ThresholdSet>,
}

impl RegistrationOutcome {
    fn failed(status: i32) -> Self {
        Self { success: false, status, thresholds: None }
    }

    /// Commit the outcome to the monitor state.  A failure changes nothing.
    pub fn apply(&self, registration: &mut RegistrationState, thresholds: &mut ThresholdSet) {
        if !self.success {
            return;
        }
        registration.registered = true;
        if let Some(set) = self.thresholds {
            *thresholds = set;
        }
    }
}

/// Perform the handshake.  The caller is expected to have checked
/// connectivity first; if it did not, the channel answers with the `-1`
/// sentinel and the outcome is an ordinary failure.
pub fn register<C: RemoteChannel>(channel: &mut C, device_id: &str) -> RegistrationOutcome {
    let body = match serde_json::to_string(&RegisterRequest { serial: device_id }) {
        Ok(body) => body,
        Err(e) => {
            log::error!("Could not encode registration request: {}", e);
            return RegistrationOutcome::failed(STATUS_NOT_CONNECTED);
        }
    };

    let response = channel.post_json(API_INIT_PATH, &body);
    if !response.is_success() {
        log::warn!("Registration failed — status {}", response.status);
        return RegistrationOutcome::failed(response.status);
    }

    log::info!("Sensor registered with API — serial {}", device_id);

    let thresholds = match ThresholdPayload::parse(&response.body) {
        Ok(payload) if payload.has_thresholds() => {
            let set = payload.to_threshold_set();
            log::info!("Thresholds received: {:?}", set);
            Some(set)
        }
        Ok(_) => {
            log::debug!("Registration response carried no thresholds");
            None
        }
        Err(e) => {
            log::warn!("Ignoring threshold payload: {}", e);
            None
        }
    };

    RegistrationOutcome { success: true, status: response.status, thresholds }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::Response;
    use std::collections::VecDeque;

    /// Channel that answers from a script and records every request.
    pub struct ScriptedChannel {
        pub connected: bool,
        pub responses: VecDeque<Response>,
        pub requests: Vec<(String, String)>,
        pub reconnects: usize,
    }

    impl ScriptedChannel {
        pub fn new(responses: impl IntoIterator<Item = Response>) -> Self {
            Self {
                connected: true,
                responses: responses.into_iter().collect(),
                requests: Vec::new(),
                reconnects: 0,
            }
        }
    }

    impl RemoteChannel for ScriptedChannel {
        fn is_connected(&mut self) -> bool {
            self.connected
        }

        fn reconnect(&mut self) {
            self.reconnects += 1;
        }

        fn post_json(&mut self, path: &str, body: &str) -> Response {
            self.requests.push((path.to_string(), body.to_string()));
            if !self.connected {
                return Response::not_connected();
            }
            self.responses.pop_front().unwrap_or_else(|| Response::new(500, ""))
        }
    }

    fn defaults() -> ThresholdSet {
        crate::config::DEFAULT_THRESHOLDS
    }

    #[test]
    fn sends_serial_to_init_endpoint() {
        let mut channel = ScriptedChannel::new([Response::new(200, "{}")]);
        register(&mut channel, "00AB12");
        assert_eq!(
            channel.requests,
            vec![("/init/".to_string(), r#"{"serial":"00AB12"}"#.to_string())]
        );
    }

    #[test]
    fn success_replaces_whole_set() {
        let mut channel =
            ScriptedChannel::new([Response::new(200, r#"{"temperature_threshold_max": 80}"#)]);
        let outcome = register(&mut channel, "X");
        assert!(outcome.success);

        let mut state = RegistrationState::new("X");
        let mut thresholds = defaults();
        outcome.apply(&mut state, &mut thresholds);

        assert!(state.registered);
        assert_eq!(
            thresholds,
            ThresholdSet { temperature_max: Some(80.0), ..Default::default() }
        );
    }

    #[test]
    fn malformed_payload_still_registers() {
        let mut channel = ScriptedChannel::new([Response::new(201, "<html>oops</html>")]);
        let outcome = register(&mut channel, "X");
        assert_eq!(outcome, RegistrationOutcome { success: true, status: 201, thresholds: None });

        let mut state = RegistrationState::new("X");
        let mut thresholds = defaults();
        outcome.apply(&mut state, &mut thresholds);
        assert!(state.registered);
        assert_eq!(thresholds, defaults());
    }

    #[test]
    fn answer_without_threshold_keys_keeps_set() {
        let mut channel =
            ScriptedChannel::new([Response::new(200, r#"{"status":"success"}"#)]);
        let outcome = register(&mut channel, "X");
        assert!(outcome.success);
        assert_eq!(outcome.thresholds, None);
    }

    #[test]
    fn service_unavailable_changes_nothing() {
        let mut channel = ScriptedChannel::new([Response::new(503, "busy")]);
        let outcome = register(&mut channel, "X");
        assert!(!outcome.success);
        assert_eq!(outcome.status, 503);

        let mut state = RegistrationState::new("X");
        let mut thresholds = defaults();
        outcome.apply(&mut state, &mut thresholds);
        assert!(!state.registered);
        assert_eq!(thresholds, defaults());
    }

    #[test]
    fn disconnected_channel_reports_sentinel() {
        let mut channel = ScriptedChannel::new([]);
        channel.connected = false;
        let outcome = register(&mut channel, "X");
        assert!(!outcome.success);
        assert_eq!(outcome.status, STATUS_NOT_CONNECTED);
    }
}
