//! # Serial Connection Lifecycle
//!
//! `Disconnected -> Connected` on an explicit connect, `Connected -> Stale`
//! when the liveness check finds the link closed, and `Stale -> Connected`
//! once a reconnect to the same port succeeds. Reconnects are attempted at
//! most once per liveness check, forever, with no backoff.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::link::{LinkOpener, SerialLink};
use super::TELEMETRY_BAUD_RATE;
use crate::error::{GroundStationError, Result};

/// Connection state as seen by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Disconnected,
    Connected,
    Stale,
}

/// Result of one liveness check
#[derive(Debug)]
pub enum LivenessOutcome {
    /// Never connected, nothing to check
    Idle,
    /// Link still open
    Healthy,
    /// Link had closed (or was already stale) and a reconnect succeeded
    Reconnected,
    /// Link is stale and this tick's reconnect attempt failed
    ReconnectFailed(GroundStationError),
}

/// Owns the serial link handle and its lifecycle
pub struct Connection<O: LinkOpener> {
    opener: O,
    read_timeout: Duration,
    port_name: Option<String>,
    link: Option<Box<dyn SerialLink>>,
    state: LinkState,
}

impl<O: LinkOpener> std::fmt::Debug for Connection<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("port_name", &self.port_name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<O: LinkOpener> Connection<O> {
    pub fn new(opener: O, read_timeout: Duration) -> Self {
        Self {
            opener,
            read_timeout,
            port_name: None,
            link: None,
            state: LinkState::Disconnected,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Port selected by the last successful connect
    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    pub fn baud_rate(&self) -> u32 {
        TELEMETRY_BAUD_RATE
    }

    #[cfg(test)]
    pub(crate) fn opener_mut(&mut self) -> &mut O {
        &mut self.opener
    }

    /// Open `port` and make it the active link
    ///
    /// # Errors
    ///
    /// Returns `PortOpen` if the device cannot be opened. The previous
    /// link and state are kept in that case.
    pub fn connect(&mut self, port: &str) -> Result<()> {
        let link = self
            .opener
            .open(port, TELEMETRY_BAUD_RATE, self.read_timeout)?;

        info!("Connected to {} at {} baud", port, TELEMETRY_BAUD_RATE);
        self.install(port.to_string(), link);
        Ok(())
    }

    /// Replace the handle only between reads; `&mut self` guarantees no
    /// read on the old handle is still in flight.
    fn install(&mut self, port: String, link: Box<dyn SerialLink>) {
        self.link = Some(link);
        self.port_name = Some(port);
        self.state = LinkState::Connected;
    }

    /// Periodic liveness check with at most one reconnect attempt
    pub fn check_liveness(&mut self) -> LivenessOutcome {
        match self.state {
            LinkState::Disconnected => return LivenessOutcome::Idle,
            LinkState::Connected => {
                let open = self.link.as_mut().map_or(false, |link| link.is_open());
                if open {
                    return LivenessOutcome::Healthy;
                }
                warn!(
                    "Serial channel {} closed, attempting to reconnect",
                    self.port_name.as_deref().unwrap_or("<unknown>")
                );
                self.link = None;
                self.state = LinkState::Stale;
            }
            LinkState::Stale => {}
        }

        let Some(port) = self.port_name.clone() else {
            self.state = LinkState::Disconnected;
            return LivenessOutcome::Idle;
        };

        match self.opener.open(&port, TELEMETRY_BAUD_RATE, self.read_timeout) {
            Ok(link) => {
                info!("Reconnected to {}", port);
                self.install(port, link);
                LivenessOutcome::Reconnected
            }
            Err(e) => {
                debug!("Reconnect to {} failed: {}", port, e);
                LivenessOutcome::ReconnectFailed(e)
            }
        }
    }

    /// Read one line if the link already holds received data
    ///
    /// Returns `Ok(None)` when not connected, when nothing is buffered, or
    /// when the read times out.
    pub async fn read_available_line(&mut self) -> Result<Option<Vec<u8>>> {
        if self.state != LinkState::Connected {
            return Ok(None);
        }
        let Some(link) = self.link.as_mut() else {
            return Ok(None);
        };

        let available = link
            .bytes_available()
            .map_err(|e| GroundStationError::Serial(format!("Failed to poll serial port: {}", e)))?;
        if available == 0 {
            return Ok(None);
        }

        let line = link
            .read_line()
            .await
            .map_err(|e| GroundStationError::Serial(format!("Failed to read line: {}", e)))?;
        Ok(line.map(|bytes| bytes.to_vec()))
    }

    /// Write `text` followed by a newline
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` without touching the link unless the state
    /// is `Connected`.
    pub async fn send_line(&mut self, text: &str) -> Result<()> {
        if self.state != LinkState::Connected {
            return Err(GroundStationError::NotConnected);
        }
        let link = self.link.as_mut().ok_or(GroundStationError::NotConnected)?;

        let payload = format!("{}\n", text);
        link.write_all(payload.as_bytes())
            .await
            .map_err(|e| GroundStationError::Serial(format!("Failed to write command: {}", e)))?;
        link.flush()
            .await
            .map_err(|e| GroundStationError::Serial(format!("Failed to flush serial port: {}", e)))?;

        debug!("Sent {} bytes", payload.len());
        Ok(())
    }
}
