//! Trait abstraction for serial link operations to enable testing

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::Instant;
use tokio_serial::{SerialPort, SerialPortBuilderExt};
use tracing::debug;

use super::framing::LineFramer;
use crate::error::{GroundStationError, Result};

/// Trait for line-oriented serial link I/O
#[async_trait]
pub trait SerialLink: Send {
    /// Whether the underlying device still answers
    fn is_open(&mut self) -> bool;

    /// Bytes a read can make progress on without waiting
    ///
    /// A dangling partial line does not count until more bytes arrive.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read one line without its terminator
    ///
    /// Returns `Ok(None)` if the read timeout passes first. Partial data
    /// is kept for the next call.
    async fn read_line(&mut self) -> io::Result<Option<Bytes>>;

    /// Write all data to the link
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;
}

/// Opens serial links by device name
#[cfg_attr(test, mockall::automock)]
pub trait LinkOpener: Send {
    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn SerialLink>>;
}

/// Wrapper around tokio_serial::SerialStream that implements SerialLink
pub struct TokioSerialLink {
    port: tokio_serial::SerialStream,
    framer: LineFramer,
    read_timeout: Duration,
}

impl TokioSerialLink {
    pub fn new(port: tokio_serial::SerialStream, read_timeout: Duration) -> Self {
        Self {
            port,
            framer: LineFramer::new(),
            read_timeout,
        }
    }
}

#[async_trait]
impl SerialLink for TokioSerialLink {
    fn is_open(&mut self) -> bool {
        self.port.bytes_to_read().is_ok()
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        let pending = self.port.bytes_to_read().map_err(io::Error::from)?;
        Ok(readable_bytes(&self.framer, pending))
    }

    async fn read_line(&mut self) -> io::Result<Option<Bytes>> {
        let deadline = Instant::now() + self.read_timeout;

        loop {
            if let Some(line) = self.framer.next_line()? {
                return Ok(Some(line));
            }

            let read = self.port.read_buf(self.framer.buffer_mut());
            match tokio::time::timeout_at(deadline, read).await {
                Ok(Ok(0)) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "serial port returned end of stream",
                    ))
                }
                Ok(Ok(n)) => debug!("Read {} bytes from serial port", n),
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    debug!("Serial read timed out with {} bytes pending", self.framer.len());
                    return Ok(None);
                }
            }
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.port.flush().await
    }
}

/// Framed bytes count only once they hold a complete line; otherwise a
/// leftover partial line would send every poll into a full read timeout.
fn readable_bytes(framer: &LineFramer, pending: u32) -> usize {
    let framed = if framer.has_line() { framer.len() } else { 0 };
    framed + pending as usize
}

/// Opens real serial devices via tokio-serial (8N1, no flow control)
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSerialOpener;

impl LinkOpener for TokioSerialOpener {
    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn SerialLink>> {
        let stream = tokio_serial::new(port, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(read_timeout)
            .open_native_async()
            .map_err(|e| GroundStationError::PortOpen {
                port: port.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(TokioSerialLink::new(stream, read_timeout)))
    }
}
