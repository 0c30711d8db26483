//! Mock serial driver for testing
//!
//! Provides an in-memory [`PortDriver`] and [`SerialLink`] so the acquisition
//! pipeline can be exercised without hardware:
//! - Lines are fed through a channel and honour the read timeout
//! - Writes are recorded for verification
//! - Open, read and write failures can be injected
//! - Every driver call is logged

use super::{PortDriver, SerialLink, SerialSettings};
use crate::error::{OpenError, ReadError};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Mock serial driver
///
/// # Example
///
/// ```
/// use weigh_monitor::adapters::{MockDriver, PortDriver, SerialSettings};
///
/// let driver = MockDriver::new();
/// let link = driver.add_port("COM3");
/// link.feed_line("1.0 2.0\n");
///
/// let opened = driver.open("COM3", &SerialSettings::default()).unwrap();
/// assert_eq!(opened.read_line().unwrap(), b"1.0 2.0\n");
/// assert!(driver.open("COM4", &SerialSettings::default()).is_err());
/// ```
#[derive(Default)]
pub struct MockDriver {
    ports: Mutex<HashMap<String, Arc<MockLink>>>,
    should_fail_next: AtomicBool,
    call_log: Mutex<Vec<String>>,
}

impl MockDriver {
    /// Create a driver with no ports
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a port that can be opened; returns its link for scripting.
    pub fn add_port(&self, port_name: &str) -> Arc<MockLink> {
        let link = Arc::new(MockLink::new(port_name));
        lock(&self.ports).insert(port_name.to_owned(), link.clone());
        link
    }

    /// Trigger a failure on the next open
    pub fn trigger_failure(&self) {
        self.should_fail_next.store(true, Ordering::SeqCst);
    }

    /// Get a copy of the call log for verification
    pub fn get_call_log(&self) -> Vec<String> {
        lock(&self.call_log).clone()
    }

    fn log_call(&self, call: String) {
        lock(&self.call_log).push(call);
    }
}

impl PortDriver for MockDriver {
    fn open(
        &self,
        port_name: &str,
        settings: &SerialSettings,
    ) -> Result<Arc<dyn SerialLink>, OpenError> {
        self.log_call(format!("open {port_name}"));

        if self.should_fail_next.swap(false, Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "mock open failure").into());
        }

        let link = lock(&self.ports)
            .get(port_name)
            .cloned()
            .ok_or_else(|| OpenError::NotFound(port_name.to_owned()))?;
        link.reopen(settings.read_timeout);
        let link: Arc<dyn SerialLink> = link;
        Ok(link)
    }

    fn available_ports(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.ports).keys().cloned().collect();
        names.sort();
        names
    }
}

/// In-memory serial link.
pub struct MockLink {
    port_name: String,
    lines_tx: mpsc::Sender<Vec<u8>>,
    lines_rx: Mutex<mpsc::Receiver<Vec<u8>>>,
    read_timeout: Mutex<Duration>,
    written: Mutex<Vec<Vec<u8>>>,
    open: AtomicBool,
    read_failures: AtomicUsize,
    fail_next_write: AtomicBool,
    reads: AtomicUsize,
    reading: AtomicBool,
    closed_during_read: AtomicBool,
}

impl MockLink {
    /// Create a closed link; it opens through [`MockDriver::open`].
    pub fn new(port_name: &str) -> Self {
        let (lines_tx, lines_rx) = mpsc::channel();
        Self {
            port_name: port_name.to_owned(),
            lines_tx,
            lines_rx: Mutex::new(lines_rx),
            read_timeout: Mutex::new(super::DEFAULT_READ_TIMEOUT),
            written: Mutex::new(Vec::new()),
            open: AtomicBool::new(false),
            read_failures: AtomicUsize::new(0),
            fail_next_write: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            reading: AtomicBool::new(false),
            closed_during_read: AtomicBool::new(false),
        }
    }

    /// Queue raw bytes to be returned by a future `read_line`.
    pub fn feed_line(&self, line: impl AsRef<[u8]>) {
        // The receiver lives in `self`, so sending cannot fail.
        let _ = self.lines_tx.send(line.as_ref().to_vec());
    }

    /// Make the next `count` reads fail with an I/O error.
    pub fn fail_reads(&self, count: usize) {
        self.read_failures.fetch_add(count, Ordering::SeqCst);
    }

    /// Make the next write fail with an I/O error.
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    /// Everything written so far, one entry per `write` call.
    pub fn written(&self) -> Vec<Vec<u8>> {
        lock(&self.written).clone()
    }

    /// Number of `read_line` calls made so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Whether `close` was ever called while a `read_line` was blocked.
    pub fn closed_during_read(&self) -> bool {
        self.closed_during_read.load(Ordering::SeqCst)
    }

    fn reopen(&self, read_timeout: Duration) {
        *lock(&self.read_timeout) = read_timeout;
        self.open.store(true, Ordering::SeqCst);
    }
}

impl SerialLink for MockLink {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn read_line(&self) -> Result<Vec<u8>, ReadError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if !self.is_open() {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "mock port is closed").into());
        }
        if self
            .read_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(io::Error::other("mock read failure").into());
        }

        let timeout = *lock(&self.read_timeout);
        self.reading.store(true, Ordering::SeqCst);
        let received = lock(&self.lines_rx).recv_timeout(timeout);
        self.reading.store(false, Ordering::SeqCst);
        match received {
            Ok(line) => Ok(line),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                Err(ReadError::Timeout)
            }
        }
    }

    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        if !self.is_open() {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "mock port is closed"));
        }
        if self.fail_next_write.swap(false, Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"));
        }
        lock(&self.written).push(bytes.to_vec());
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) {
        if self.reading.load(Ordering::SeqCst) {
            self.closed_during_read.store(true, Ordering::SeqCst);
        }
        self.open.store(false, Ordering::SeqCst);
    }
}

/// Locks a mutex, recovering the data if a panicking test poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_settings() -> SerialSettings {
        SerialSettings::default().with_read_timeout(Duration::from_millis(20))
    }

    #[test]
    fn test_open_unknown_port_fails() {
        let driver = MockDriver::new();
        let result = driver.open("BADPORT", &fast_settings());
        assert!(matches!(result, Err(OpenError::NotFound(name)) if name == "BADPORT"));
    }

    #[test]
    fn test_failure_is_one_shot() {
        let driver = MockDriver::new();
        driver.add_port("COM1");

        driver.trigger_failure();
        assert!(driver.open("COM1", &fast_settings()).is_err());
        assert!(driver.open("COM1", &fast_settings()).is_ok());
        assert_eq!(driver.get_call_log(), vec!["open COM1", "open COM1"]);
    }

    #[test]
    fn test_read_times_out_without_data() {
        let driver = MockDriver::new();
        driver.add_port("COM1");
        let link = driver.open("COM1", &fast_settings()).unwrap();

        let start = std::time::Instant::now();
        assert!(matches!(link.read_line(), Err(ReadError::Timeout)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_injected_read_failures() {
        let driver = MockDriver::new();
        let mock = driver.add_port("COM1");
        let link = driver.open("COM1", &fast_settings()).unwrap();

        mock.fail_reads(2);
        mock.feed_line("1 2\n");
        assert!(matches!(link.read_line(), Err(ReadError::Io(_))));
        assert!(matches!(link.read_line(), Err(ReadError::Io(_))));
        assert_eq!(link.read_line().unwrap(), b"1 2\n");
        assert_eq!(mock.read_count(), 3);
    }

    #[test]
    fn test_writes_are_recorded_until_closed() {
        let driver = MockDriver::new();
        let mock = driver.add_port("COM1");
        let link = driver.open("COM1", &fast_settings()).unwrap();

        link.write(b"ATTARE\r\n").unwrap();
        mock.fail_next_write();
        assert!(link.write(b"ATCAL\r\n").is_err());
        link.close();
        assert!(!link.is_open());
        assert!(link.write(b"ATCAL\r\n").is_err());

        assert_eq!(mock.written(), vec![b"ATTARE\r\n".to_vec()]);
    }

    #[test]
    fn test_available_ports_sorted() {
        let driver = MockDriver::new();
        driver.add_port("COM3");
        driver.add_port("COM1");
        assert_eq!(driver.available_ports(), vec!["COM1", "COM3"]);
    }
}
