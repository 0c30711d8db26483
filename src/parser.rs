//! Parser for the `<time> <value>` telemetry line protocol.
//!
//! The instrument prints one record per line:
//!
//! ```text
//! 1.250 3.700\r\n
//! ```
//!
//! Anything after the second space-separated token is ignored. Lines that do
//! not have this shape are rejected with a [`ParseError`]; callers treat every
//! rejection as a silent skip because corrupted lines are routine on a noisy
//! serial link.

use crate::core::Sample;
use crate::encoding::TextEncoding;
use crate::error::ParseError;

/// Turns raw serial lines into [`Sample`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineParser {
    encoding: TextEncoding,
}

impl LineParser {
    /// Creates a parser for lines in the given encoding.
    pub fn new(encoding: TextEncoding) -> Self {
        Self { encoding }
    }

    /// The encoding this parser decodes with.
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Parses one raw line, terminator included or not.
    pub fn parse(&self, raw: &[u8]) -> Result<Sample, ParseError> {
        let text = self.encoding.decode(trim_line(raw))?;
        let line = text.as_str();

        let mut tokens = line.split(' ');
        let (Some(time), Some(value)) = (tokens.next(), tokens.next()) else {
            return Err(ParseError::Malformed(line.to_owned()));
        };

        let time = parse_number(time)?;
        let value = parse_number(value)?;
        // Both numbers are finite here, so construction cannot fail.
        Sample::new(time, value).ok_or_else(|| ParseError::Malformed(line.to_owned()))
    }
}

/// Parses a line with the default (cp437) encoding.
pub fn parse_line(raw: &[u8]) -> Result<Sample, ParseError> {
    LineParser::default().parse(raw)
}

/// Strips surrounding spaces, tabs, line terminators, vertical tabs and form
/// feeds from the raw bytes.
fn trim_line(raw: &[u8]) -> &[u8] {
    let is_space = |b: &u8| matches!(*b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c);
    let start = raw.iter().position(|b| !is_space(b)).unwrap_or(raw.len());
    let end = raw.iter().rposition(|b| !is_space(b)).map_or(start, |i| i + 1);
    &raw[start..end]
}

fn parse_number(token: &str) -> Result<f64, ParseError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ParseError::NumericFormat {
            token: token.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_time_and_value() {
        let sample = parse_line(b"1.250 3.700\n").unwrap();
        assert_eq!(sample.time(), 1.25);
        assert_eq!(sample.value(), 3.7);
    }

    #[test]
    fn ignores_trailing_tokens_and_crlf() {
        let sample = parse_line(b"  12 -0.5 g stable\r\n").unwrap();
        assert_eq!(sample.to_point(), [12.0, -0.5]);
    }

    #[test]
    fn strips_vertical_tab_and_form_feed() {
        let sample = parse_line(b"\x0c1 2\x0b\n").unwrap();
        assert_eq!(sample.to_point(), [1.0, 2.0]);
        assert_eq!(parse_line(b" \x0b\x0c "), Err(ParseError::Malformed(String::new())));
    }

    #[test]
    fn accepts_exponents_and_signs() {
        let sample = parse_line(b"+1e3 -2.5E-1").unwrap();
        assert_eq!(sample.to_point(), [1000.0, -0.25]);
    }

    #[test]
    fn rejects_single_token_lines() {
        assert_eq!(
            parse_line(b"garbage\n"),
            Err(ParseError::Malformed("garbage".into()))
        );
        assert_eq!(parse_line(b"\r\n"), Err(ParseError::Malformed(String::new())));
        assert_eq!(parse_line(b""), Err(ParseError::Malformed(String::new())));
    }

    #[test]
    fn rejects_non_numeric_tokens() {
        assert_eq!(
            parse_line(b"ATCAL done\n"),
            Err(ParseError::NumericFormat {
                token: "ATCAL".into()
            })
        );
        assert_eq!(
            parse_line(b"1.0 3.7kg\n"),
            Err(ParseError::NumericFormat {
                token: "3.7kg".into()
            })
        );
    }

    #[test]
    fn double_space_yields_empty_value_token() {
        assert_eq!(
            parse_line(b"1.0  2.0"),
            Err(ParseError::NumericFormat { token: String::new() })
        );
    }

    #[test]
    fn rejects_non_finite_numbers() {
        assert!(matches!(
            parse_line(b"nan 1.0"),
            Err(ParseError::NumericFormat { .. })
        ));
        assert!(matches!(
            parse_line(b"1.0 inf"),
            Err(ParseError::NumericFormat { .. })
        ));
        assert!(matches!(
            parse_line(b"1.0 1e400"),
            Err(ParseError::NumericFormat { .. })
        ));
    }

    #[test]
    fn tab_separated_fields_are_not_split() {
        assert!(matches!(
            parse_line(b"1.0\t2.0"),
            Err(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn utf8_parser_reports_encoding_errors() {
        let parser = LineParser::new(TextEncoding::Utf8);
        assert_eq!(
            parser.parse(&[0xfe, b' ', b'1']),
            Err(ParseError::Encoding("utf-8"))
        );
        assert_eq!(parser.parse(b"0.3 0.4").unwrap().to_point(), [0.3, 0.4]);
    }
}
