//! # Ground Station Session
//!
//! Owns all mutable session state and exposes the two periodic step
//! functions driven by the scheduler:
//!
//! - [`Session::poll_telemetry`]: read at most one line, parse, store
//! - [`Session::check_liveness`]: detect a closed link, reconnect
//!
//! Both run on the caller's task, so the store and connection need no
//! locking. Presentation layers subscribe to [`SessionEvent`]s instead of
//! reading the store while it is being mutated; a recorded sample is
//! announced only after it has been appended to every channel.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandDispatcher, OutboundRecord};
use crate::error::{GroundStationError, Result};
use crate::serial::{Connection, LinkOpener, LinkState, LivenessOutcome};
use crate::telemetry::{format_info_panel, parse_line, TelemetrySample, TelemetryStore};

/// Category of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// Raw line received from the link
    Inbound,
    /// Command written to the link
    Outbound,
    Status,
    Error,
}

/// One line in the session log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub kind: LogKind,
    pub text: String,
}

/// State-change notification for presentation layers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Log(LogEntry),
    /// A sample was appended to every channel at `index`
    Sample {
        index: usize,
        time: f64,
        sample: TelemetrySample,
    },
    InfoPanel {
        text: String,
    },
    /// All series were cleared
    Reset,
    Connection {
        state: LinkState,
        port: Option<String>,
    },
}

/// Result of one telemetry poll
#[derive(Debug)]
pub enum PollOutcome {
    /// Nothing to read
    Idle,
    /// A sample was stored at normalized `time`
    Recorded { time: f64 },
    /// A line was read (or a read attempted) but no sample was stored
    Rejected(GroundStationError),
}

/// Running ground station session
pub struct Session<O: LinkOpener> {
    connection: Connection<O>,
    store: TelemetryStore,
    dispatcher: CommandDispatcher,
    latest: Option<TelemetrySample>,
    info_panel: Option<String>,
    events: broadcast::Sender<SessionEvent>,
}

impl<O: LinkOpener> Session<O> {
    /// Create a disconnected session
    ///
    /// `event_buffer` bounds how far a slow subscriber may fall behind
    /// before it starts missing events.
    pub fn new(opener: O, read_timeout: Duration, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            connection: Connection::new(opener, read_timeout),
            store: TelemetryStore::new(),
            dispatcher: CommandDispatcher::new(),
            latest: None,
            info_panel: None,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }

    pub fn connection_state(&self) -> LinkState {
        self.connection.state()
    }

    pub fn port_name(&self) -> Option<&str> {
        self.connection.port_name()
    }

    /// Most recent successfully parsed sample
    pub fn latest_sample(&self) -> Option<&TelemetrySample> {
        self.latest.as_ref()
    }

    pub fn info_panel(&self) -> Option<&str> {
        self.info_panel.as_deref()
    }

    pub fn outbound(&self) -> &[OutboundRecord] {
        self.dispatcher.outbound()
    }

    /// Connect to `port` at the fixed telemetry baud rate
    pub fn connect(&mut self, port: &str) -> Result<()> {
        match self.connection.connect(port) {
            Ok(()) => {
                self.log(LogKind::Status, format!("Connected to {}", port));
                self.emit_connection();
                Ok(())
            }
            Err(e) => {
                warn!("{}", e);
                self.log(LogKind::Error, e.to_string());
                Err(e)
            }
        }
    }

    /// Fast tick: read, parse and store at most one line
    pub async fn poll_telemetry(&mut self) -> PollOutcome {
        let bytes = match self.connection.read_available_line().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return PollOutcome::Idle,
            Err(e) => return self.reject(e),
        };

        let line = match String::from_utf8(bytes) {
            Ok(line) => line,
            Err(e) => return self.reject(e.into()),
        };
        let line = line.trim();
        self.log(LogKind::Inbound, line.to_string());

        let sample = match parse_line(line) {
            Ok(sample) => sample,
            Err(e) => return self.reject(e),
        };

        let time = match self.store.record(&sample) {
            Ok(time) => time,
            Err(e) => return self.reject(e),
        };
        debug!("Recorded sample {} at t={}", self.store.len(), time);

        let text = format_info_panel(&sample);
        self.latest = Some(sample);
        self.info_panel = Some(text.clone());

        self.emit(SessionEvent::Sample {
            index: self.store.len() - 1,
            time,
            sample,
        });
        self.emit(SessionEvent::InfoPanel { text });

        PollOutcome::Recorded { time }
    }

    /// Slow tick: check the link, reconnecting at most once
    pub fn check_liveness(&mut self) -> LivenessOutcome {
        let before = self.connection.state();
        let outcome = self.connection.check_liveness();
        let after = self.connection.state();

        let lost = !matches!(outcome, LivenessOutcome::Idle | LivenessOutcome::Healthy);
        if before == LinkState::Connected && lost {
            let port = self.connection.port_name().unwrap_or_default().to_string();
            let closed = GroundStationError::ChannelClosed(port);
            self.log(
                LogKind::Status,
                format!("{}. Attempting to reconnect...", closed),
            );
        }

        match &outcome {
            LivenessOutcome::Reconnected => {
                let port = self.connection.port_name().unwrap_or_default().to_string();
                self.log(LogKind::Status, format!("Reconnected to {}", port));
            }
            LivenessOutcome::ReconnectFailed(e) => {
                self.log(LogKind::Error, format!("Reconnect failed: {}", e));
            }
            LivenessOutcome::Idle | LivenessOutcome::Healthy => {}
        }

        if before != after {
            self.emit_connection();
        }
        outcome
    }

    /// Send a command and log the outcome
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` if no link is open, or `Serial` if the write
    /// fails.
    pub async fn send(&mut self, command: &Command) -> Result<()> {
        let sent = self
            .dispatcher
            .dispatch(&mut self.connection, command)
            .await
            .map(|record| record.text.clone());

        match sent {
            Ok(text) => {
                self.log(LogKind::Outbound, format!("Sent: {}", text));
                Ok(())
            }
            Err(e) => {
                warn!("Command {} not sent: {}", command, e);
                self.log(LogKind::Error, format!("Error: {}", e));
                Err(e)
            }
        }
    }

    /// Send free text typed by the operator
    ///
    /// Empty input is ignored and returns `Ok(false)`.
    pub async fn send_operator_text(&mut self, text: &str) -> Result<bool> {
        match Command::from_operator_text(text) {
            Some(command) => self.send(&command).await.map(|()| true),
            None => Ok(false),
        }
    }

    /// Clear every series and the time offset
    pub fn reset(&mut self) {
        self.store.reset();
        info!("Telemetry series reset");
        self.emit(SessionEvent::Reset);
        self.log(LogKind::Status, "Telemetry reset".to_string());
    }

    fn reject(&mut self, error: GroundStationError) -> PollOutcome {
        debug!("Telemetry line rejected: {}", error);
        let text = match &error {
            GroundStationError::NumericParse { .. } => {
                format!("Error parsing telemetry data: {}", error)
            }
            _ => format!("Error: {}", error),
        };
        self.log(LogKind::Error, text);
        PollOutcome::Rejected(error)
    }

    fn log(&self, kind: LogKind, text: String) {
        self.emit(SessionEvent::Log(LogEntry {
            at: Local::now(),
            kind,
            text,
        }));
    }

    fn emit_connection(&self) {
        self.emit(SessionEvent::Connection {
            state: self.connection.state(),
            port: self.connection.port_name().map(str::to_string),
        });
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::link::mocks::MockSerialLink;
    use crate::serial::link::MockLinkOpener;
    use crate::serial::SerialLink;
    use crate::telemetry::Channel;

    const LINE_1000: &str =
        "1000,120.5,22.3,101325,0.1,0.2,9.8,0.01,0.02,0.03,37.7,-122.4,10.0,5.5,1";
    const LINE_1250: &str =
        "1250,130.0,22.1,101200,0.2,0.1,9.7,0.02,0.01,0.04,37.7,-122.4,12.0,6.0,2";

    fn disconnected() -> Session<MockLinkOpener> {
        Session::new(MockLinkOpener::new(), Duration::from_secs(1), 64)
    }

    fn connected(mock: &MockSerialLink) -> Session<MockLinkOpener> {
        let link = mock.clone();
        let mut opener = MockLinkOpener::new();
        opener
            .expect_open()
            .times(1)
            .return_once(move |_, _, _| Ok(Box::new(link) as Box<dyn SerialLink>));
        let mut session = Session::new(opener, Duration::from_secs(1), 64);
        session.connect("/dev/ttyACM0").unwrap();
        session.connection.opener_mut().checkpoint();
        session
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn logs(events: &[SessionEvent], kind: LogKind) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                SessionEvent::Log(entry) if entry.kind == kind => Some(entry.text.clone()),
                _ => None,
            })
            .collect()
    }

    fn assert_lock_step(session: &Session<MockLinkOpener>) {
        let len = session.store().len();
        for channel in Channel::ALL {
            assert_eq!(session.store().snapshot(channel).values.len(), len);
        }
    }

    #[tokio::test]
    async fn test_poll_records_valid_line() {
        let mock = MockSerialLink::new();
        let mut session = connected(&mock);
        mock.push_line(LINE_1000);

        let outcome = session.poll_telemetry().await;

        assert!(matches!(outcome, PollOutcome::Recorded { time } if time == 0.0));
        assert_eq!(session.store().len(), 1);
        assert_lock_step(&session);
        assert_eq!(session.latest_sample().unwrap().gps_fix, 1);
        assert!(session.info_panel().unwrap().starts_with("GPS Lat: 37.7"));
    }

    #[tokio::test]
    async fn test_poll_normalizes_consecutive_lines() {
        let mock = MockSerialLink::new();
        let mut session = connected(&mock);
        mock.push_line(LINE_1000);
        mock.push_line(LINE_1250);

        session.poll_telemetry().await;
        session.poll_telemetry().await;

        assert_eq!(session.store().times(), &[0.0, 250.0]);
        assert_lock_step(&session);
    }

    #[tokio::test]
    async fn test_poll_reads_one_line_per_tick() {
        let mock = MockSerialLink::new();
        let mut session = connected(&mock);
        mock.push_line(LINE_1000);
        mock.push_line(LINE_1250);

        session.poll_telemetry().await;

        assert_eq!(mock.read_count(), 1);
        assert_eq!(mock.pending_lines(), 1);
        assert_eq!(session.store().len(), 1);
    }

    #[tokio::test]
    async fn test_poll_idle_without_data() {
        let mock = MockSerialLink::new();
        let mut session = connected(&mock);

        assert!(matches!(session.poll_telemetry().await, PollOutcome::Idle));
        assert_eq!(mock.read_count(), 0);
    }

    #[tokio::test]
    async fn test_poll_idle_while_disconnected() {
        let mut session = disconnected();
        assert!(matches!(session.poll_telemetry().await, PollOutcome::Idle));
    }

    #[tokio::test]
    async fn test_malformed_line_logged_but_not_stored() {
        let mock = MockSerialLink::new();
        let mut session = connected(&mock);
        let mut rx = session.subscribe();
        mock.push_line("a,b,c");

        let outcome = session.poll_telemetry().await;

        assert!(matches!(
            outcome,
            PollOutcome::Rejected(GroundStationError::MalformedLine { .. })
        ));
        assert!(session.store().is_empty());
        assert_eq!(session.store().time_offset(), None);

        let events = drain(&mut rx);
        assert_eq!(logs(&events, LogKind::Inbound), vec!["a,b,c".to_string()]);
        assert_eq!(logs(&events, LogKind::Error).len(), 1);
        assert!(!events.iter().any(|e| matches!(e, SessionEvent::Sample { .. })));
    }

    #[tokio::test]
    async fn test_numeric_error_reported_distinctly() {
        let mock = MockSerialLink::new();
        let mut session = connected(&mock);
        let mut rx = session.subscribe();
        mock.push_line("1000,x,22.3,101325,0.1,0.2,9.8,0.01,0.02,0.03,37.7,-122.4,10.0,5.5,1");

        let outcome = session.poll_telemetry().await;

        assert!(matches!(
            outcome,
            PollOutcome::Rejected(GroundStationError::NumericParse { .. })
        ));
        assert!(session.store().is_empty());
        let errors = logs(&drain(&mut rx), LogKind::Error);
        assert!(errors[0].starts_with("Error parsing telemetry data"));
    }

    #[tokio::test]
    async fn test_nan_time_not_stored() {
        let mock = MockSerialLink::new();
        let mut session = connected(&mock);
        mock.push_line(&LINE_1000.replacen("1000", "nan", 1));
        mock.push_line(LINE_1000);

        assert!(matches!(
            session.poll_telemetry().await,
            PollOutcome::Rejected(GroundStationError::NumericParse { field: "time", .. })
        ));
        assert!(session.store().is_empty());

        assert!(matches!(
            session.poll_telemetry().await,
            PollOutcome::Recorded { time } if time == 0.0
        ));
        assert_eq!(session.store().time_offset(), Some(1000.0));
        assert_lock_step(&session);
    }

    #[tokio::test]
    async fn test_undecodable_line_keeps_connection() {
        let mock = MockSerialLink::new();
        let mut session = connected(&mock);
        mock.push_raw(&[0xFF, 0xFE, b',']);

        let outcome = session.poll_telemetry().await;

        assert!(matches!(
            outcome,
            PollOutcome::Rejected(GroundStationError::Decode(_))
        ));
        assert_eq!(session.connection_state(), LinkState::Connected);
        assert!(session.store().is_empty());
    }

    #[tokio::test]
    async fn test_sample_event_follows_store_update() {
        let mock = MockSerialLink::new();
        let mut session = connected(&mock);
        let mut rx = session.subscribe();
        mock.push_line(LINE_1000);

        session.poll_telemetry().await;

        let events = drain(&mut rx);
        let sample_event = events
            .iter()
            .find_map(|event| match event {
                SessionEvent::Sample { index, time, sample } => Some((*index, *time, *sample)),
                _ => None,
            })
            .expect("sample event");
        assert_eq!(sample_event.0, 0);
        assert_eq!(sample_event.1, 0.0);
        assert_eq!(sample_event.2.altitude, 120.5);
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::InfoPanel { text } if text.contains("GPS Fix: 1"))));
    }

    #[tokio::test]
    async fn test_reset_clears_store_and_offset() {
        let mock = MockSerialLink::new();
        let mut session = connected(&mock);
        let mut rx = session.subscribe();
        mock.push_line(LINE_1000);
        mock.push_line(LINE_1250);
        session.poll_telemetry().await;

        session.reset();

        assert!(session.store().is_empty());
        assert_eq!(session.store().time_offset(), None);
        assert!(drain(&mut rx).contains(&SessionEvent::Reset));

        // The next sample starts a fresh series
        session.poll_telemetry().await;
        assert_eq!(session.store().times(), &[0.0]);
    }

    #[tokio::test]
    async fn test_send_abort_while_disconnected() {
        let mut session = disconnected();
        let mut rx = session.subscribe();

        let result = session.send(&Command::Abort).await;

        assert!(matches!(result, Err(GroundStationError::NotConnected)));
        assert!(session.outbound().is_empty());
        let errors = logs(&drain(&mut rx), LogKind::Error);
        assert_eq!(errors, vec!["Error: Serial not connected".to_string()]);
    }

    #[tokio::test]
    async fn test_send_launch_logs_outbound() {
        let mock = MockSerialLink::new();
        let mut session = connected(&mock);
        let mut rx = session.subscribe();

        session.send(&Command::Launch).await.unwrap();

        assert_eq!(mock.get_written_data(), vec![b"LAUNCH\n".to_vec()]);
        assert_eq!(
            logs(&drain(&mut rx), LogKind::Outbound),
            vec!["Sent: LAUNCH".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_operator_text_is_noop() {
        let mock = MockSerialLink::new();
        let mut session = connected(&mock);
        let mut rx = session.subscribe();

        let sent = session.send_operator_text("   ").await.unwrap();

        assert!(!sent);
        assert!(mock.get_written_data().is_empty());
        assert!(session.outbound().is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_operator_text_sent() {
        let mock = MockSerialLink::new();
        let mut session = connected(&mock);

        assert!(session.send_operator_text("ARM\n").await.unwrap());
        assert_eq!(mock.get_written_data(), vec![b"ARM\n".to_vec()]);
        assert_eq!(session.outbound()[0].text, "ARM");
    }

    #[test]
    fn test_connect_failure_reported() {
        let mut opener = MockLinkOpener::new();
        opener.expect_open().times(1).returning(|port, _, _| {
            Err(GroundStationError::PortOpen {
                port: port.to_string(),
                reason: "busy".to_string(),
            })
        });
        let mut session = Session::new(opener, Duration::from_secs(1), 8);
        let mut rx = session.subscribe();

        assert!(session.connect("/dev/ttyUSB9").is_err());
        assert_eq!(session.connection_state(), LinkState::Disconnected);

        let errors = logs(&drain(&mut rx), LogKind::Error);
        assert!(errors[0].contains("/dev/ttyUSB9"));
    }

    #[test]
    fn test_liveness_reconnects_after_close() {
        let mock = MockSerialLink::new();
        let mut session = connected(&mock);
        let mut rx = session.subscribe();
        mock.close();

        let replacement = MockSerialLink::new();
        session
            .connection
            .opener_mut()
            .expect_open()
            .times(1)
            .return_once(move |_, _, _| Ok(Box::new(replacement) as Box<dyn SerialLink>));

        assert!(matches!(session.check_liveness(), LivenessOutcome::Reconnected));
        assert_eq!(session.connection_state(), LinkState::Connected);

        let events = drain(&mut rx);
        let status = logs(&events, LogKind::Status);
        assert_eq!(
            status[0],
            "Serial channel /dev/ttyACM0 closed. Attempting to reconnect..."
        );
        assert_eq!(status[1], "Reconnected to /dev/ttyACM0");
        // Connected -> Connected across the tick: no state-change event
        assert!(!events.iter().any(|e| matches!(e, SessionEvent::Connection { .. })));
    }

    #[test]
    fn test_liveness_failed_reconnect_marks_stale() {
        let mock = MockSerialLink::new();
        let mut session = connected(&mock);
        let mut rx = session.subscribe();
        mock.close();

        session
            .connection
            .opener_mut()
            .expect_open()
            .times(2)
            .returning(|port, _, _| {
                Err(GroundStationError::PortOpen {
                    port: port.to_string(),
                    reason: "gone".to_string(),
                })
            });

        assert!(matches!(
            session.check_liveness(),
            LivenessOutcome::ReconnectFailed(_)
        ));
        assert!(matches!(
            session.check_liveness(),
            LivenessOutcome::ReconnectFailed(_)
        ));
        assert_eq!(session.connection_state(), LinkState::Stale);

        let events = drain(&mut rx);
        let stale_events = events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    SessionEvent::Connection {
                        state: LinkState::Stale,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(stale_events, 1);
        assert_eq!(logs(&events, LogKind::Error).len(), 2);
    }

    #[tokio::test]
    async fn test_poll_while_stale_is_silent() {
        let mock = MockSerialLink::new();
        let mut session = connected(&mock);
        mock.close();

        session
            .connection
            .opener_mut()
            .expect_open()
            .times(1)
            .returning(|port, _, _| {
                Err(GroundStationError::PortOpen {
                    port: port.to_string(),
                    reason: "gone".to_string(),
                })
            });
        session.check_liveness();
        assert_eq!(session.connection_state(), LinkState::Stale);

        mock.push_line(LINE_1000);
        let mut rx = session.subscribe();
        for _ in 0..3 {
            assert!(matches!(session.poll_telemetry().await, PollOutcome::Idle));
        }

        assert_eq!(mock.read_count(), 0);
        assert_eq!(mock.pending_lines(), 1);
        assert!(session.store().is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_events_serialize_with_tag() {
        let json = serde_json::to_value(&SessionEvent::Reset).unwrap();
        assert_eq!(json, serde_json::json!({ "event": "reset" }));

        let json = serde_json::to_value(&SessionEvent::Connection {
            state: LinkState::Stale,
            port: Some("/dev/ttyACM0".to_string()),
        })
        .unwrap();
        assert_eq!(json["event"], "connection");
        assert_eq!(json["state"], "stale");
    }
}
