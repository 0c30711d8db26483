//! Telemetry session: one open serial link plus its acquisition worker.
//!
//! The session is the only owner of the link. The worker holds a clone for
//! reading; the command path writes through the session. On disconnect the
//! worker is stopped and joined before the link is closed, so the reader never
//! touches a closed handle.
//!
//! Joining can take up to one read timeout. A UI thread should call
//! [`TelemetrySession::disconnect_in_background`], which runs the same
//! stop, join and close sequence on a short-lived teardown thread.

use crate::adapters::{PortDriver, SerialLink, SerialSettings};
use crate::command::{self, Command};
use crate::core::{ChannelPublisher, Sample};
use crate::error::{ConnectError, WriteError};
use crate::parser::LineParser;
use crate::worker::{AcquisitionWorker, WorkerState};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Default capacity of the sample hand-off channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Whether the session currently holds an open port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No port open, no worker running.
    Disconnected,
    /// Port open and acquisition running.
    Connected,
}

struct Connection {
    link: Arc<dyn SerialLink>,
    worker: AcquisitionWorker,
}

impl Connection {
    fn close(mut self) {
        self.worker.shutdown();
        self.link.close();
        info!(port = self.link.port_name(), "Disconnected");
    }
}

/// Owns the serial connection and the acquisition lifecycle.
pub struct TelemetrySession {
    driver: Arc<dyn PortDriver>,
    settings: SerialSettings,
    sender: broadcast::Sender<Sample>,
    connection: Option<Connection>,
    teardown: Option<JoinHandle<()>>,
}

impl TelemetrySession {
    /// Creates a disconnected session with the default channel capacity.
    pub fn new(driver: Arc<dyn PortDriver>, settings: SerialSettings) -> Self {
        Self::with_capacity(driver, settings, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a disconnected session whose hand-off channel keeps at most
    /// `capacity` unread samples per subscriber.
    pub fn with_capacity(
        driver: Arc<dyn PortDriver>,
        settings: SerialSettings,
        capacity: usize,
    ) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            driver,
            settings,
            sender,
            connection: None,
            teardown: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        if self.connection.is_some() {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    /// Whether a port is open.
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Name of the connected port.
    pub fn port_name(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.link.port_name())
    }

    /// State of the running worker, if any.
    pub fn worker_state(&self) -> Option<WorkerState> {
        self.connection.as_ref().map(|c| c.worker.state())
    }

    /// Whether a background disconnect is still stopping the worker.
    pub fn is_tearing_down(&self) -> bool {
        self.teardown
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Transport settings used for new connections.
    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    /// Driver used to open ports.
    pub fn driver(&self) -> &Arc<dyn PortDriver> {
        &self.driver
    }

    /// New receiver for published samples.
    pub fn subscribe(&self) -> broadcast::Receiver<Sample> {
        self.sender.subscribe()
    }

    /// Opens `port_name` and starts acquisition.
    ///
    /// An already open connection is closed first, and a pending background
    /// disconnect is waited for. On failure the session is left disconnected
    /// and no worker runs.
    pub fn connect(&mut self, port_name: &str) -> Result<(), ConnectError> {
        self.disconnect();

        let link = self
            .driver
            .open(port_name, &self.settings)
            .map_err(|source| ConnectError::PortOpenFailed {
                port: port_name.to_owned(),
                source,
            })?;

        let mut worker =
            AcquisitionWorker::new(port_name, LineParser::new(self.settings.encoding));
        if let Err(source) = worker.start(link.clone(), ChannelPublisher::new(self.sender.clone()))
        {
            link.close();
            return Err(ConnectError::WorkerStart {
                port: port_name.to_owned(),
                source,
            });
        }

        info!(
            port = port_name,
            baud = self.settings.baud_rate,
            timeout_ms = self.settings.read_timeout.as_millis() as u64,
            "Connected"
        );
        self.connection = Some(Connection { link, worker });
        Ok(())
    }

    /// Stops acquisition and closes the port. No-op when disconnected.
    ///
    /// Blocks until the worker has exited, including any disconnect started
    /// in the background earlier.
    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
        self.wait_for_teardown();
    }

    /// Like [`disconnect`](Self::disconnect), but returns immediately.
    ///
    /// The session reports `Disconnected` right away and commands are
    /// dropped from then on. The worker is joined and the port closed, in
    /// that order, on a teardown thread.
    pub fn disconnect_in_background(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        connection.worker.stop();

        let port = connection.link.port_name().to_owned();
        let spawned = thread::Builder::new()
            .name(format!("teardown-{port}"))
            .spawn(move || connection.close());
        // `connect` waits for the previous teardown, so none is pending here.
        match spawned {
            Ok(handle) => self.teardown = Some(handle),
            // The closure and its connection were dropped; the worker's Drop
            // joined it and the last link handle released the port.
            Err(e) => warn!(port = %port, error = %e, "Failed to spawn teardown thread"),
        }
    }

    fn wait_for_teardown(&mut self) {
        if let Some(handle) = self.teardown.take() {
            if handle.join().is_err() {
                error!("Teardown thread panicked");
            }
        }
    }

    /// Writes `text` followed by CRLF.
    ///
    /// Silently does nothing while disconnected. Write failures are returned
    /// but leave the session connected.
    pub fn send_command(&self, text: &str) -> Result<(), WriteError> {
        let Some(connection) = self.connection.as_ref().filter(|c| c.link.is_open()) else {
            debug!(command = text, "Not connected, command dropped");
            return Ok(());
        };

        let bytes = self.settings.encoding.encode(&command::frame(text))?;
        connection.link.write(&bytes).map_err(|e| {
            warn!(command = text, error = %e, "Failed to send command");
            WriteError::Io(e)
        })?;
        debug!(command = text, "Command sent");
        Ok(())
    }

    /// Sends a typed command.
    pub fn send(&self, command: Command) -> Result<(), WriteError> {
        self.send_command(&command.to_string())
    }

    /// Zeroes the current reading.
    pub fn tare(&self) -> Result<(), WriteError> {
        self.send(Command::Tare)
    }

    /// Starts on-device calibration.
    pub fn calibrate(&self) -> Result<(), WriteError> {
        self.send(Command::Calibrate)
    }

    /// Sets the on-device scale factor.
    pub fn set_scale(&self, scale: f64) -> Result<(), WriteError> {
        self.send(Command::SetScale(scale))
    }
}

impl Drop for TelemetrySession {
    fn drop(&mut self) {
        self.disconnect();
    }
}
