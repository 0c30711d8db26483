//! CLI entry point for weigh-monitor
//!
//! Provides:
//! - The desktop GUI (default)
//! - A headless `monitor` mode that prints samples to stdout
//! - Serial port enumeration
//!
//! # Usage
//!
//! ```bash
//! weigh-monitor                                  # open the GUI
//! weigh-monitor monitor COM3 --send ATTARE       # stream samples from COM3
//! weigh-monitor ports                            # list serial ports
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use weigh_monitor::adapters::{PortDriver, SerialPortDriver};
use weigh_monitor::config::MonitorConfig;
use weigh_monitor::controller::{MonitorController, BASE_TITLE};
use weigh_monitor::gui::MonitorApp;
use weigh_monitor::logging;
use weigh_monitor::session::TelemetrySession;

#[derive(Parser)]
#[command(name = "weigh-monitor")]
#[command(about = "Live force telemetry from a serial weighing instrument", long_about = None)]
struct Cli {
    /// Configuration file (defaults to config/monitor.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the desktop GUI
    Gui,

    /// Stream samples from a port to stdout without the GUI
    Monitor {
        /// Serial port name, e.g. COM3 or /dev/ttyUSB0
        port: String,

        /// Command to send after connecting (repeatable), e.g. ATTARE
        #[arg(long)]
        send: Vec<String>,

        /// Stop after this many samples
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        count: Option<u64>,
    },

    /// List serial ports
    Ports,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MonitorConfig::load_from(path),
        None => MonitorConfig::load(),
    }
    .context("failed to load configuration")?;
    logging::init_from_config(&config)?;

    match cli.command.unwrap_or(Commands::Gui) {
        Commands::Gui => run_gui(config),
        Commands::Monitor { port, send, count } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(run_monitor(config, port, send, count))
        }
        Commands::Ports => {
            for port in SerialPortDriver.available_ports() {
                println!("{port}");
            }
            Ok(())
        }
    }
}

fn new_session(config: &MonitorConfig) -> TelemetrySession {
    TelemetrySession::with_capacity(
        Arc::new(SerialPortDriver),
        config.serial_settings(),
        config.display.channel_capacity,
    )
}

fn run_gui(config: MonitorConfig) -> Result<()> {
    let controller = MonitorController::new(new_session(&config));
    let refresh_interval = config.refresh_interval();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 400.0])
            .with_title(BASE_TITLE),
        ..Default::default()
    };

    info!(app = %config.application.name, "Starting GUI");
    eframe::run_native(
        &config.application.name,
        options,
        Box::new(move |cc| Ok(Box::new(MonitorApp::new(cc, controller, refresh_interval)))),
    )
    .map_err(|e| anyhow!("GUI exited with an error: {e}"))
}

async fn run_monitor(
    config: MonitorConfig,
    port: String,
    send: Vec<String>,
    count: Option<u64>,
) -> Result<()> {
    let mut session = new_session(&config);
    let mut samples = session.subscribe();
    session.connect(&port)?;

    send_startup_commands(&session, &send);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut received = 0u64;
    loop {
        tokio::select! {
            result = samples.recv() => match result {
                Ok(sample) => {
                    println!("{}\t{}", sample.time(), sample.value());
                    received += 1;
                    if count.is_some_and(|limit| received >= limit) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Output fell behind"),
                Err(RecvError::Closed) => break,
            },
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
    }

    // Joining the worker blocks for up to one read timeout.
    tokio::task::spawn_blocking(move || session.disconnect()).await?;
    info!(received, "Monitor finished");
    Ok(())
}

/// Sends each command in order. A failed write is logged and the rest are
/// still sent; the session stays connected. Returns how many went out.
fn send_startup_commands(session: &TelemetrySession, commands: &[String]) -> usize {
    commands
        .iter()
        .filter(|command| match session.send_command(command) {
            Ok(()) => true,
            Err(e) => {
                warn!(command = command.as_str(), error = %e, "Command not sent");
                false
            }
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use weigh_monitor::adapters::{MockDriver, SerialSettings};

    #[test]
    fn count_must_be_positive() {
        assert!(Cli::try_parse_from(["weigh-monitor", "monitor", "COM3", "--count", "0"]).is_err());

        let cli = Cli::try_parse_from(["weigh-monitor", "monitor", "COM3", "--count", "3"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Monitor { count: Some(3), .. })));
    }

    #[test]
    fn startup_commands_survive_write_failure() {
        let driver = Arc::new(MockDriver::new());
        let link = driver.add_port("COM3");
        let settings = SerialSettings::default().with_read_timeout(Duration::from_millis(20));
        let mut session = TelemetrySession::new(driver, settings);
        session.connect("COM3").unwrap();

        link.fail_next_write();
        let commands = vec!["ATTARE".to_string(), "AT€".to_string(), "ATCAL".to_string()];
        assert_eq!(send_startup_commands(&session, &commands), 1);

        assert!(session.is_connected());
        assert_eq!(link.written(), vec![b"ATCAL\r\n".to_vec()]);
    }
}
