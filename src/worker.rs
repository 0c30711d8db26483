//! Background acquisition loop.
//!
//! The worker runs on its own OS thread, reads one line at a time from a
//! [`SerialLink`], parses it and publishes every valid [`Sample`]. It never
//! terminates on bad input: malformed lines, numeric errors and single read
//! failures are counted and skipped.
//!
//! Cancellation is cooperative. [`AcquisitionWorker::stop`] raises a flag that
//! the loop checks once per iteration, so shutdown takes at most one read
//! timeout. The owner must [`join`](AcquisitionWorker::join) the worker before
//! closing the link it reads from.

use crate::adapters::SerialLink;
use crate::core::SamplePublisher;
use crate::error::{ReadError, WorkerError};
use crate::parser::LineParser;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace};

/// Pause after a failed read so an unplugged device does not spin the loop.
const IO_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Lifecycle of an [`AcquisitionWorker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Created, not started yet.
    Idle,
    /// The loop is reading.
    Running,
    /// Stop requested; the loop exits after the current read.
    Stopping,
    /// The loop has exited.
    Stopped,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Running,
            2 => WorkerState::Stopping,
            _ => WorkerState::Stopped,
        }
    }
}

/// Counters updated by the acquisition loop.
#[derive(Debug, Default)]
pub struct WorkerStats {
    published: AtomicU64,
    skipped_lines: AtomicU64,
    read_errors: AtomicU64,
}

impl WorkerStats {
    /// Samples handed to the publisher.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Lines rejected by the parser.
    pub fn skipped_lines(&self) -> u64 {
        self.skipped_lines.load(Ordering::Relaxed)
    }

    /// Reads that failed with an I/O error.
    pub fn read_errors(&self) -> u64 {
        self.read_errors.load(Ordering::Relaxed)
    }
}

/// Handle to the acquisition thread.
pub struct AcquisitionWorker {
    name: String,
    parser: LineParser,
    state: Arc<AtomicU8>,
    cancel_flag: Arc<AtomicBool>,
    stats: Arc<WorkerStats>,
    handle: Option<JoinHandle<()>>,
}

impl AcquisitionWorker {
    /// Creates an idle worker. `name` labels the thread and log output.
    pub fn new(name: impl Into<String>, parser: LineParser) -> Self {
        Self {
            name: name.into(),
            parser,
            state: Arc::new(AtomicU8::new(WorkerState::Idle as u8)),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(WorkerStats::default()),
            handle: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Live counters.
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Spawns the acquisition thread reading from `link`.
    ///
    /// Only valid from [`WorkerState::Idle`].
    pub fn start<P: SamplePublisher>(
        &mut self,
        link: Arc<dyn SerialLink>,
        publisher: P,
    ) -> Result<(), WorkerError> {
        if self
            .state
            .compare_exchange(
                WorkerState::Idle as u8,
                WorkerState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return Err(WorkerError::AlreadyStarted);
        }

        let context = LoopContext {
            name: self.name.clone(),
            parser: self.parser,
            link,
            state: self.state.clone(),
            cancel_flag: self.cancel_flag.clone(),
            stats: self.stats.clone(),
        };

        let spawned = thread::Builder::new()
            .name(format!("acquisition-{}", self.name))
            .spawn(move || run_acquisition_loop(context, publisher));

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.state
                    .store(WorkerState::Stopped as u8, Ordering::Release);
                Err(WorkerError::Spawn(e))
            }
        }
    }

    /// Requests the loop to exit. Returns immediately.
    pub fn stop(&self) {
        self.cancel_flag.store(true, Ordering::Release);
        let _ = self.state.compare_exchange(
            WorkerState::Running as u8,
            WorkerState::Stopping as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Waits for the acquisition thread to exit.
    ///
    /// Call [`stop`](Self::stop) first, otherwise this blocks until the
    /// thread ends on its own.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(worker = %self.name, "Acquisition thread panicked");
            }
        }
        // Also covers a worker that was never started.
        self.state
            .store(WorkerState::Stopped as u8, Ordering::Release);
    }

    /// Stops the loop and waits for it.
    pub fn shutdown(&mut self) {
        self.stop();
        self.join();
    }
}

impl Drop for AcquisitionWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}

struct LoopContext {
    name: String,
    parser: LineParser,
    link: Arc<dyn SerialLink>,
    state: Arc<AtomicU8>,
    cancel_flag: Arc<AtomicBool>,
    stats: Arc<WorkerStats>,
}

fn run_acquisition_loop<P: SamplePublisher>(ctx: LoopContext, publisher: P) {
    info!(worker = %ctx.name, port = ctx.link.port_name(), "Acquisition started");

    while !ctx.cancel_flag.load(Ordering::Acquire) {
        match ctx.link.read_line() {
            Ok(raw) => match ctx.parser.parse(&raw) {
                Ok(sample) => {
                    publisher.publish(sample);
                    ctx.stats.published.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    trace!(worker = %ctx.name, error = %e, "Skipping line");
                    ctx.stats.skipped_lines.fetch_add(1, Ordering::Relaxed);
                }
            },
            Err(ReadError::Timeout) => {
                trace!(worker = %ctx.name, "No data within read timeout");
            }
            Err(ReadError::Io(e)) => {
                debug!(worker = %ctx.name, error = %e, "Serial read failed");
                ctx.stats.read_errors.fetch_add(1, Ordering::Relaxed);
                thread::sleep(IO_ERROR_BACKOFF);
            }
        }
    }

    ctx.state
        .store(WorkerState::Stopped as u8, Ordering::Release);
    info!(
        worker = %ctx.name,
        published = ctx.stats.published(),
        skipped = ctx.stats.skipped_lines(),
        read_errors = ctx.stats.read_errors(),
        "Acquisition stopped"
    );
}
