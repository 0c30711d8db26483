//! Text encoding used on the serial link.
//!
//! The weighing firmware speaks code page 437 in both directions. UTF-8 is
//! accepted as a configuration alternative for bridges that re-encode the
//! stream; it is the only encoding under which decoding can fail.

use crate::error::{ParseError, WriteError};
use codepage_437::{FromCp437, ToCp437, CP437_CONTROL};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Single text encoding shared by the read and write paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    /// IBM code page 437.
    #[default]
    #[serde(rename = "cp437")]
    Cp437,
    /// UTF-8.
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
}

impl TextEncoding {
    /// Name used in configuration files and error messages.
    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Cp437 => "cp437",
            TextEncoding::Utf8 => "utf-8",
        }
    }

    /// Decodes one raw line.
    pub fn decode(self, bytes: &[u8]) -> Result<String, ParseError> {
        match self {
            TextEncoding::Cp437 => Ok(String::from_cp437(bytes.to_vec(), &CP437_CONTROL)),
            TextEncoding::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|_| ParseError::Encoding(self.name())),
        }
    }

    /// Encodes outgoing text.
    pub fn encode(self, text: &str) -> Result<Vec<u8>, WriteError> {
        match self {
            TextEncoding::Cp437 => {
                let unencodable = || WriteError::Unencodable {
                    text: text.to_owned(),
                    encoding: self.name(),
                };
                let bytes: Cow<'_, [u8]> =
                    text.to_cp437(&CP437_CONTROL).map_err(|_| unencodable())?;
                // The codec substitutes look-alikes for some characters
                // (`€` becomes `ε`); only exact round trips go on the wire.
                let bytes = bytes.into_owned();
                if String::from_cp437(bytes.clone(), &CP437_CONTROL) != text {
                    return Err(unencodable());
                }
                Ok(bytes)
            }
            TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cp437_is_ascii_transparent() {
        let bytes = TextEncoding::Cp437.encode("ATSCALE=10.013\r\n").unwrap();
        assert_eq!(bytes, b"ATSCALE=10.013\r\n");
        assert_eq!(
            TextEncoding::Cp437.decode(b"1.250 3.700\r\n").unwrap(),
            "1.250 3.700\r\n"
        );
    }

    #[test]
    fn cp437_decodes_high_half() {
        // 0x81 is 'ü', 0xB0 is a light shade block
        assert_eq!(TextEncoding::Cp437.decode(&[0x81, 0xB0]).unwrap(), "ü░");
    }

    #[test]
    fn cp437_rejects_unmappable_text() {
        let err = TextEncoding::Cp437.encode("ATSCALE=€").unwrap_err();
        assert!(matches!(err, WriteError::Unencodable { encoding: "cp437", .. }));
        assert!(TextEncoding::Cp437.encode("AT€").is_err());
        assert!(TextEncoding::Cp437.encode("日本").is_err());
    }

    #[test]
    fn cp437_encodes_high_half_exactly() {
        assert_eq!(TextEncoding::Cp437.encode("ü░").unwrap(), vec![0x81, 0xB0]);
        assert_eq!(TextEncoding::Cp437.encode("\r\n").unwrap(), b"\r\n");
    }

    #[test]
    fn utf8_rejects_invalid_sequences() {
        assert_eq!(
            TextEncoding::Utf8.decode(&[0xff, 0x20, 0x31]),
            Err(ParseError::Encoding("utf-8"))
        );
        assert_eq!(TextEncoding::Utf8.decode(b"1 2").unwrap(), "1 2");
    }
}
