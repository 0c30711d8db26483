//! # Weigh Monitor Core Library
//!
//! Live acquisition and display of force readings from a serial weighing
//! instrument. The instrument streams text lines of the form `"<time> <value>"`
//! and accepts `AT` commands for taring, calibration and scaling. The library
//! holds everything except argument parsing, so the GUI binary, the headless
//! monitor and the integration tests share one pipeline.
//!
//! ## Crate Structure
//!
//! - **`adapters`**: The [`adapters::SerialLink`] and [`adapters::PortDriver`]
//!   traits, the real serial port backend and an in-memory mock.
//! - **`command`**: Instrument commands (`ATTARE`, `ATCAL`, `ATSCALE=<f>`) and
//!   CRLF framing.
//! - **`config`**: Layered configuration (defaults, TOML file, environment).
//! - **`controller`**: Maps operator actions onto a session and moves samples
//!   into the plot buffer.
//! - **`core`**: The [`core::Sample`] type and the publisher seam between the
//!   acquisition thread and its consumers.
//! - **`data`**: The ordered [`data::SampleBuffer`] backing the plot.
//! - **`encoding`**: Wire text encodings (cp437 by default).
//! - **`error`**: Error types for every stage of the pipeline.
//! - **`gui`**: The eframe/egui desktop front-end.
//! - **`logging`**: `tracing` subscriber setup.
//! - **`parser`**: Turns one raw line into a sample.
//! - **`session`**: Connection lifecycle and the command path.
//! - **`worker`**: The background thread that reads, parses and publishes.

pub mod adapters;
pub mod command;
pub mod config;
pub mod controller;
pub mod core;
pub mod data;
pub mod encoding;
pub mod error;
pub mod gui;
pub mod logging;
pub mod parser;
pub mod session;
pub mod worker;
