//! # Presentation
//!
//! Renders [`SessionEvent`]s for the operator.
//!
//! - [`TextPresenter`]: human-readable log, sample summaries and info panel
//! - [`JsonLinesPresenter`]: one JSON object per event for an external
//!   plotting frontend

use std::io::Write;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::error::{GroundStationError, Result};
use crate::session::{LogKind, SessionEvent};

/// Consumer of session state changes
pub trait Presenter: Send {
    fn present(&mut self, event: &SessionEvent) -> Result<()>;
}

/// Plain-text output
pub struct TextPresenter<W: Write> {
    out: W,
}

impl<W: Write> TextPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Presenter for TextPresenter<W> {
    fn present(&mut self, event: &SessionEvent) -> Result<()> {
        match event {
            SessionEvent::Log(entry) => {
                let prefix = match entry.kind {
                    LogKind::Inbound => "<",
                    LogKind::Outbound => ">",
                    LogKind::Status => "*",
                    LogKind::Error => "!",
                };
                writeln!(
                    self.out,
                    "[{}] {} {}",
                    entry.at.format("%H:%M:%S%.3f"),
                    prefix,
                    entry.text
                )?;
            }
            SessionEvent::Sample { index, time, sample } => {
                writeln!(
                    self.out,
                    "#{} t={} alt={}m temp={}°C press={}Pa vel={}m/s",
                    index, time, sample.altitude, sample.temperature, sample.pressure, sample.velocity
                )?;
            }
            SessionEvent::InfoPanel { text } => {
                for line in text.lines() {
                    writeln!(self.out, "    {}", line)?;
                }
            }
            SessionEvent::Reset => writeln!(self.out, "--- telemetry reset ---")?,
            SessionEvent::Connection { state, port } => {
                writeln!(
                    self.out,
                    "--- link {:?} ({}) ---",
                    state,
                    port.as_deref().unwrap_or("no port")
                )?;
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

/// JSON Lines output
pub struct JsonLinesPresenter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Presenter for JsonLinesPresenter<W> {
    fn present(&mut self, event: &SessionEvent) -> Result<()> {
        serde_json::to_writer(&mut self.out, event)
            .map_err(|e| GroundStationError::Io(e.into()))?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

/// Feed events to `presenter` until the session is dropped
///
/// Events missed by a lagging receiver are reported and skipped.
pub async fn run_presenter(
    mut presenter: Box<dyn Presenter>,
    mut events: broadcast::Receiver<SessionEvent>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Err(e) = presenter.present(&event) {
                    warn!("Failed to present event: {}", e);
                }
            }
            Err(RecvError::Lagged(missed)) => {
                warn!("Presentation fell behind, {} events skipped", missed);
            }
            Err(RecvError::Closed) => {
                debug!("Session closed, presenter exiting");
                break;
            }
        }
    }
}
