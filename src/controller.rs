//! Operator-facing surface of the monitor.
//!
//! The controller is what a front-end talks to: each `on_*_requested` method
//! maps one toolbar action onto the [`TelemetrySession`], and [`tick`] is
//! called on the display refresh timer to move freshly published samples
//! into the [`SampleBuffer`]. Failures never propagate out of the handlers;
//! they are queued as [`Notification`]s for the front-end to show.
//!
//! [`tick`]: MonitorController::tick

use crate::command::Command;
use crate::core::Sample;
use crate::data::SampleBuffer;
use crate::session::TelemetrySession;
use std::collections::VecDeque;
use std::fmt;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::warn;

/// Window title without a connection.
pub const BASE_TITLE: &str = "Weigh monitor";

/// Something the operator should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The port could not be opened.
    ConnectionFailed(String),
    /// A command could not be sent or its input was invalid.
    CommandFailed(String),
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::ConnectionFailed(reason) | Notification::CommandFailed(reason) => {
                f.write_str(reason)
            }
        }
    }
}

/// Glue between operator actions, the session and the sample buffer.
pub struct MonitorController {
    session: TelemetrySession,
    buffer: SampleBuffer,
    samples: broadcast::Receiver<Sample>,
    notifications: VecDeque<Notification>,
    lost_samples: u64,
}

impl MonitorController {
    /// Wraps a session; subscribes to its samples immediately.
    pub fn new(session: TelemetrySession) -> Self {
        let samples = session.subscribe();
        Self {
            session,
            buffer: SampleBuffer::new(),
            samples,
            notifications: VecDeque::new(),
            lost_samples: 0,
        }
    }

    /// The underlying session.
    pub fn session(&self) -> &TelemetrySession {
        &self.session
    }

    /// Samples shown by the plot.
    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    /// Samples overwritten in the hand-off channel before they were drained.
    pub fn lost_samples(&self) -> u64 {
        self.lost_samples
    }

    /// `"Weigh monitor"`, with the port name appended while connected.
    pub fn title(&self) -> String {
        match self.session.port_name() {
            Some(port) => format!("{BASE_TITLE} ({port})"),
            None => BASE_TITLE.to_owned(),
        }
    }

    /// Opens `port_name`, reporting failures as a notification.
    pub fn on_connect_requested(&mut self, port_name: &str) {
        let port_name = port_name.trim();
        if let Err(e) = self.session.connect(port_name) {
            warn!(port = port_name, error = %e, "Connect failed");
            self.notifications
                .push_back(Notification::ConnectionFailed(e.to_string()));
        }
    }

    /// Closes the connection, if any, without waiting for the worker.
    pub fn on_disconnect_requested(&mut self) {
        self.session.disconnect_in_background();
    }

    /// Sends `ATTARE`.
    pub fn on_tare_requested(&mut self) {
        self.send(Command::Tare);
    }

    /// Sends `ATCAL`.
    pub fn on_calibrate_requested(&mut self) {
        self.send(Command::Calibrate);
    }

    /// Sends `ATSCALE=<scale>` from the operator's text input.
    ///
    /// Input is only validated while connected, matching the rule that
    /// commands are dropped without a connection.
    pub fn on_set_scale_requested(&mut self, scale_text: &str) {
        if !self.session.is_connected() {
            return;
        }
        match Command::parse_scale(scale_text) {
            Ok(command) => self.send(command),
            Err(e) => self
                .notifications
                .push_back(Notification::CommandFailed(e.to_string())),
        }
    }

    /// Empties the plot, discarding samples still waiting in the channel.
    pub fn on_clear_requested(&mut self) {
        self.drain(|_| {});
        self.buffer.clear();
    }

    /// Moves pending samples into the buffer. Returns how many were added.
    pub fn tick(&mut self) -> usize {
        let mut appended = Vec::new();
        self.drain(|sample| appended.push(sample));
        let count = appended.len();
        self.buffer.extend(appended);
        count
    }

    /// Takes all queued notifications, oldest first.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    fn send(&mut self, command: Command) {
        if let Err(e) = self.session.send(command) {
            self.notifications
                .push_back(Notification::CommandFailed(e.to_string()));
        }
    }

    fn drain(&mut self, mut sink: impl FnMut(Sample)) {
        loop {
            match self.samples.try_recv() {
                Ok(sample) => sink(sample),
                Err(TryRecvError::Lagged(skipped)) => {
                    self.lost_samples += skipped;
                    warn!(skipped, "Display fell behind, oldest samples dropped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }
}
