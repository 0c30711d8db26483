//! Custom error types for the application.
//!
//! Errors are split by the layer that produces them so that each layer can
//! decide what is recoverable:
//!
//! - **`ParseError`**: a single telemetry line could not be turned into a
//!   `Sample`. Always recoverable; the acquisition loop skips the line.
//! - **`ReadError`**: a single `read_line` on the serial link failed or timed
//!   out. Recoverable inside the acquisition loop.
//! - **`OpenError`** / **`ConnectError`**: the serial port could not be opened.
//!   Reported synchronously to whoever asked for the connection.
//! - **`WriteError`**: a command could not be encoded or written. Reported to
//!   the caller of `send_command`; the session stays up.
//! - **`CommandError`**: operator input that does not form a valid command.
//! - **`MonitorError`**: the application-level error used by the binary and
//!   the configuration layer.

use std::io;
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, MonitorError>;

/// Why a raw telemetry line was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line is not valid {0} text")]
    Encoding(&'static str),

    #[error("expected `<time> <value>`, got {0:?}")]
    Malformed(String),

    #[error("invalid number {token:?}")]
    NumericFormat { token: String },
}

/// Failure of a single line read on an open link.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("no complete line within the read timeout")]
    Timeout,

    #[error("serial read failed: {0}")]
    Io(#[from] io::Error),
}

/// Failure to open a serial port.
#[derive(Error, Debug)]
pub enum OpenError {
    #[error("no such port '{0}'")]
    NotFound(String),

    #[cfg(feature = "instrument_serial")]
    #[error(transparent)]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serial support not enabled. Rebuild with --features instrument_serial")]
    FeatureDisabled,
}

/// Failure to establish a telemetry session.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Failed to open serial port '{port}': {source}")]
    PortOpenFailed {
        port: String,
        #[source]
        source: OpenError,
    },

    #[error("Failed to start acquisition for '{port}': {source}")]
    WorkerStart {
        port: String,
        #[source]
        source: WorkerError,
    },
}

/// Failure to start an acquisition worker.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("acquisition worker was already started")]
    AlreadyStarted,

    #[error("failed to spawn acquisition thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Failure to send a command to the device.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("command {text:?} cannot be encoded as {encoding}")]
    Unencodable {
        text: String,
        encoding: &'static str,
    },

    #[error("serial write failed: {0}")]
    Io(#[from] io::Error),
}

/// Operator input that does not form a device command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("could not convert {0:?} to a scale factor")]
    InvalidScale(String),
}

/// Application-level error.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

impl From<figment::Error> for MonitorError {
    fn from(value: figment::Error) -> Self {
        MonitorError::Config(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_error_names_port_and_cause() {
        let err = ConnectError::PortOpenFailed {
            port: "BADPORT".into(),
            source: OpenError::NotFound("BADPORT".into()),
        };
        let text = err.to_string();
        assert!(text.contains("BADPORT"));
        assert!(text.contains("no such port"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn write_error_wraps_io() {
        let err: WriteError = io::Error::new(io::ErrorKind::BrokenPipe, "unplugged").into();
        assert!(matches!(err, WriteError::Io(_)));
        assert!(err.to_string().contains("unplugged"));
    }

    #[test]
    fn monitor_error_from_connect() {
        let err: MonitorError = ConnectError::PortOpenFailed {
            port: "COM9".into(),
            source: OpenError::FeatureDisabled,
        }
        .into();
        match err {
            MonitorError::Connect(inner) => assert!(inner.to_string().contains("COM9")),
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
