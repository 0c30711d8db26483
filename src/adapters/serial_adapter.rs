//! Serial link backed by the `serialport` crate.
//!
//! The port is opened once and cloned with `try_clone`, so the acquisition
//! thread owns the reading handle and the command path owns the writing
//! handle. Each handle sits behind its own lock; a command write never waits
//! for a pending line read.

use super::{PortDriver, SerialLink, SerialSettings};
use crate::error::OpenError;
use std::sync::Arc;

#[cfg(feature = "instrument_serial")]
use crate::error::ReadError;
#[cfg(feature = "instrument_serial")]
use serialport::SerialPort;
#[cfg(feature = "instrument_serial")]
use std::io::{self, Read, Write};
#[cfg(feature = "instrument_serial")]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "instrument_serial")]
use std::sync::Mutex;
#[cfg(feature = "instrument_serial")]
use std::time::{Duration, Instant};
#[cfg(feature = "instrument_serial")]
use tracing::{debug, trace};

/// Internal port timeout; `read_line` keeps polling until its own deadline.
#[cfg(feature = "instrument_serial")]
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Longest line kept while waiting for a terminator.
#[cfg(feature = "instrument_serial")]
const MAX_LINE_LENGTH: usize = 4096;

/// Opens real serial ports.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialPortDriver;

impl PortDriver for SerialPortDriver {
    fn open(
        &self,
        port_name: &str,
        settings: &SerialSettings,
    ) -> Result<Arc<dyn SerialLink>, OpenError> {
        #[cfg(feature = "instrument_serial")]
        {
            Ok(Arc::new(SerialPortLink::open(port_name, settings)?))
        }

        #[cfg(not(feature = "instrument_serial"))]
        {
            let _ = (port_name, settings);
            Err(OpenError::FeatureDisabled)
        }
    }

    fn available_ports(&self) -> Vec<String> {
        #[cfg(feature = "instrument_serial")]
        {
            match serialport::available_ports() {
                Ok(ports) => ports.into_iter().map(|info| info.port_name).collect(),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to enumerate serial ports");
                    Vec::new()
                }
            }
        }

        #[cfg(not(feature = "instrument_serial"))]
        {
            Vec::new()
        }
    }
}

#[cfg(feature = "instrument_serial")]
struct LineReader {
    port: Option<Box<dyn SerialPort>>,
    pending: Vec<u8>,
}

/// An open serial port split into reading and writing handles.
#[cfg(feature = "instrument_serial")]
pub struct SerialPortLink {
    port_name: String,
    read_timeout: Duration,
    reader: Mutex<LineReader>,
    writer: Mutex<Option<Box<dyn SerialPort>>>,
    open: AtomicBool,
}

#[cfg(feature = "instrument_serial")]
impl SerialPortLink {
    /// Opens `port_name` and clones a second handle for writing.
    pub fn open(port_name: &str, settings: &SerialSettings) -> Result<Self, OpenError> {
        let reader = serialport::new(port_name, settings.baud_rate)
            .timeout(settings.read_timeout.min(POLL_INTERVAL))
            .open()?;
        let writer = reader.try_clone()?;

        debug!(
            "Serial port '{}' opened at {} baud",
            port_name, settings.baud_rate
        );

        Ok(Self {
            port_name: port_name.to_owned(),
            read_timeout: settings.read_timeout,
            reader: Mutex::new(LineReader {
                port: Some(reader),
                pending: Vec::new(),
            }),
            writer: Mutex::new(Some(writer)),
            open: AtomicBool::new(true),
        })
    }
}

#[cfg(feature = "instrument_serial")]
impl SerialLink for SerialPortLink {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn read_line(&self) -> Result<Vec<u8>, ReadError> {
        let mut guard = self
            .reader
            .lock()
            .map_err(|_| io::Error::other("serial reader lock poisoned"))?;
        let LineReader { port, pending } = &mut *guard;
        let port = port.as_mut().ok_or_else(closed_error)?;

        let deadline = Instant::now() + self.read_timeout;
        let mut chunk = [0u8; 256];
        loop {
            if let Some(line) = take_line(pending) {
                return Ok(line);
            }
            if Instant::now() >= deadline {
                return Err(ReadError::Timeout);
            }

            match port.read(&mut chunk) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
                Ok(n) => pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        let mut guard = self
            .writer
            .lock()
            .map_err(|_| io::Error::other("serial writer lock poisoned"))?;
        let port = guard.as_mut().ok_or_else(closed_error)?;

        port.write_all(bytes)?;
        port.flush()?;
        trace!(
            "Sent to {}: '{}'",
            self.port_name,
            bytes.escape_ascii()
        );
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn close(&self) {
        if !self.open.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Ok(mut writer) = self.writer.lock() {
            writer.take();
        }
        if let Ok(mut reader) = self.reader.lock() {
            reader.port.take();
            reader.pending.clear();
        }
        debug!("Serial port '{}' closed", self.port_name);
    }
}

#[cfg(feature = "instrument_serial")]
fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "serial port is closed")
}

/// Removes and returns the first complete line from `pending`.
///
/// A buffer that grows past `MAX_LINE_LENGTH` without a terminator is handed
/// back whole so the parser can reject it.
#[cfg(feature = "instrument_serial")]
fn take_line(pending: &mut Vec<u8>) -> Option<Vec<u8>> {
    match pending.iter().position(|&b| b == b'\n') {
        Some(end) => Some(pending.drain(..=end).collect()),
        None if pending.len() >= MAX_LINE_LENGTH => Some(std::mem::take(pending)),
        None => None,
    }
}

#[cfg(all(test, feature = "instrument_serial"))]
mod tests {
    use super::*;

    #[test]
    fn take_line_splits_on_newline() {
        let mut pending = b"1.0 2.0\r\n3.0 4".to_vec();
        assert_eq!(take_line(&mut pending).unwrap(), b"1.0 2.0\r\n");
        assert_eq!(pending, b"3.0 4");
        assert!(take_line(&mut pending).is_none());

        pending.extend_from_slice(b".0\n");
        assert_eq!(take_line(&mut pending).unwrap(), b"3.0 4.0\n");
        assert!(pending.is_empty());
    }

    #[test]
    fn take_line_flushes_overlong_garbage() {
        let mut pending = vec![b'x'; MAX_LINE_LENGTH];
        let line = take_line(&mut pending).unwrap();
        assert_eq!(line.len(), MAX_LINE_LENGTH);
        assert!(pending.is_empty());
    }

    #[test]
    fn opening_missing_port_fails() {
        let result = SerialPortDriver.open("/dev/weigh-monitor-missing", &SerialSettings::default());
        assert!(result.is_err());
    }
}
