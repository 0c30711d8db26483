//! AT-style commands understood by the weighing firmware.
use crate::error::CommandError;
use std::fmt;

/// Line terminator appended to every outgoing command.
pub const COMMAND_TERMINATOR: &str = "\r\n";

/// A command the operator can send to the instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Zero the current reading (`ATTARE`).
    Tare,
    /// Start the on-device calibration routine (`ATCAL`).
    Calibrate,
    /// Set the conversion factor applied to raw counts (`ATSCALE=<f>`).
    SetScale(f64),
}

impl Command {
    /// Parses operator input for the scale dialog.
    pub fn parse_scale(text: &str) -> Result<Self, CommandError> {
        let trimmed = text.trim();
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|scale| scale.is_finite())
            .map(Command::SetScale)
            .ok_or_else(|| CommandError::InvalidScale(trimmed.to_owned()))
    }

    /// Full wire text, terminator included.
    pub fn framed(&self) -> String {
        frame(&self.to_string())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Tare => f.write_str("ATTARE"),
            Command::Calibrate => f.write_str("ATCAL"),
            // Debug formatting keeps the trailing ".0" on whole numbers.
            Command::SetScale(scale) => write!(f, "ATSCALE={scale:?}"),
        }
    }
}

/// Appends the command terminator to `text`.
pub fn frame(text: &str) -> String {
    format!("{text}{COMMAND_TERMINATOR}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_wire_commands() {
        assert_eq!(Command::Tare.framed(), "ATTARE\r\n");
        assert_eq!(Command::Calibrate.framed(), "ATCAL\r\n");
        assert_eq!(Command::SetScale(10.013).framed(), "ATSCALE=10.013\r\n");
    }

    #[test]
    fn parses_scale_input() {
        assert_eq!(
            Command::parse_scale(" 10.013 ").unwrap(),
            Command::SetScale(10.013)
        );
        assert_eq!(Command::parse_scale("2").unwrap().to_string(), "ATSCALE=2.0");
        assert_eq!(
            Command::parse_scale("-0.5").unwrap().to_string(),
            "ATSCALE=-0.5"
        );
    }

    #[test]
    fn rejects_invalid_scale_input() {
        assert_eq!(
            Command::parse_scale("ten"),
            Err(CommandError::InvalidScale("ten".into()))
        );
        assert!(Command::parse_scale("").is_err());
        assert!(Command::parse_scale("NaN").is_err());
    }
}
