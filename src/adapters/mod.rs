// src/adapters/mod.rs

//! Serial port abstraction consumed by the acquisition pipeline.
//!
//! A [`PortDriver`] opens ports by name and hands back a shared
//! [`SerialLink`]. The link is used from two threads at once: the acquisition
//! worker reads lines while the UI thread writes commands. Implementations
//! must allow one read and one write to be in flight concurrently.

use crate::encoding::TextEncoding;
use crate::error::{OpenError, ReadError};
use std::io;
use std::sync::Arc;
use std::time::Duration;

pub mod serial_adapter;
pub use serial_adapter::SerialPortDriver;
#[cfg(feature = "instrument_serial")]
pub use serial_adapter::SerialPortLink;

pub mod mock_adapter;
pub use mock_adapter::{MockDriver, MockLink};

/// Baud rate spoken by the weighing firmware.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Matches the instrument's reporting cadence.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport parameters used when opening a port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SerialSettings {
    /// Communication speed.
    pub baud_rate: u32,
    /// Upper bound on a single `read_line` call.
    pub read_timeout: Duration,
    /// Encoding for both directions.
    pub encoding: TextEncoding,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            encoding: TextEncoding::Cp437,
        }
    }
}

impl SerialSettings {
    /// Set read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set text encoding
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// An open, line-oriented serial connection.
pub trait SerialLink: Send + Sync {
    /// Port name the link was opened with.
    fn port_name(&self) -> &str;

    /// Reads bytes up to and including the next `\n`.
    ///
    /// Must return [`ReadError::Timeout`] once the configured read timeout
    /// elapses without a complete line.
    fn read_line(&self) -> Result<Vec<u8>, ReadError>;

    /// Writes all of `bytes` and flushes.
    fn write(&self, bytes: &[u8]) -> io::Result<()>;

    /// Whether the link has not been closed yet.
    fn is_open(&self) -> bool;

    /// Releases the underlying handle. Further reads and writes fail.
    fn close(&self);
}

/// Opens serial links by port name.
pub trait PortDriver: Send + Sync {
    /// Opens `port_name` with the given settings.
    fn open(
        &self,
        port_name: &str,
        settings: &SerialSettings,
    ) -> Result<Arc<dyn SerialLink>, OpenError>;

    /// Names of the ports that can currently be opened.
    fn available_ports(&self) -> Vec<String>;
}
