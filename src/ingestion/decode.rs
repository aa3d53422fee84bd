//! Bytes to text, UTF-8 first with a single-byte fallback.

use std::fmt;

use encoding_rs::{UTF_8, WINDOWS_1252};

/// Encoding actually used to decode an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// Single-byte fallback. This is what the `latin1` / `iso-8859-1` labels resolve to and it
    /// maps every byte value, so decoding with it cannot fail.
    Windows1252,
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Utf8 => f.write_str("utf-8"),
            TextEncoding::Windows1252 => f.write_str("windows-1252"),
        }
    }
}

/// Decoded upload text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: TextEncoding,
    /// Length of the raw bytes the text was decoded from.
    pub byte_len: usize,
}

impl DecodedText {
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Decode raw bytes. Never fails.
///
/// A leading UTF-8 BOM is dropped. Bytes that are not valid UTF-8 are decoded as windows-1252
/// instead of being replaced with U+FFFD.
pub fn decode(bytes: &[u8]) -> DecodedText {
    let (text, had_errors) = UTF_8.decode_with_bom_removal(bytes);
    if !had_errors {
        return DecodedText {
            text: text.into_owned(),
            encoding: TextEncoding::Utf8,
            byte_len: bytes.len(),
        };
    }

    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    DecodedText {
        text: text.into_owned(),
        encoding: TextEncoding::Windows1252,
        byte_len: bytes.len(),
    }
}
