//! # Command Dispatcher
//!
//! Sends operator commands to the flight computer and keeps the outbound log.
//!
//! Fixed commands (`LAUNCH`, `ABORT`) and free text share one write path:
//! the text plus a newline is written to the serial link, and only commands
//! that were actually written are recorded.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use tracing::info;

use crate::error::Result;
use crate::serial::{Connection, LinkOpener};

/// Outbound command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Launch,
    Abort,
    /// Operator-entered text, sent verbatim
    Custom(String),
}

impl Command {
    /// Build a command from operator input
    ///
    /// Returns `None` for empty or whitespace-only input.
    pub fn from_operator_text(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(Command::Custom(text.to_string()))
        }
    }

    /// Text written to the link, without the trailing newline
    pub fn wire_text(&self) -> &str {
        match self {
            Command::Launch => "LAUNCH",
            Command::Abort => "ABORT",
            Command::Custom(text) => text,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_text())
    }
}

/// One command that reached the link
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundRecord {
    pub at: DateTime<Local>,
    pub text: String,
}

/// Writes commands and records what was sent
#[derive(Debug, Default)]
pub struct CommandDispatcher {
    outbound: Vec<OutboundRecord>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `command` over `connection`
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` or `Serial` from the connection; nothing is
    /// recorded in that case.
    pub async fn dispatch<O: LinkOpener>(
        &mut self,
        connection: &mut Connection<O>,
        command: &Command,
    ) -> Result<&OutboundRecord> {
        connection.send_line(command.wire_text()).await?;

        info!("Sent command: {}", command);
        self.outbound.push(OutboundRecord {
            at: Local::now(),
            text: command.wire_text().to_string(),
        });
        Ok(&self.outbound[self.outbound.len() - 1])
    }

    /// Commands sent this session, oldest first
    pub fn outbound(&self) -> &[OutboundRecord] {
        &self.outbound
    }
}
