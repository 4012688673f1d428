//! # Hex Encoding/Decoding Utilities
//!
//! Used for frame dumps in logs and for frames typed on the command line.
//!
//! ```rust
//! use sas_egm::util::hex::{decode_hex, encode_hex, format_hex_compact};
//!
//! let data = [0x01, 0x1F];
//! assert_eq!(encode_hex(&data), "011f");
//! assert_eq!(decode_hex("01 1F").unwrap(), data);
//! assert_eq!(format_hex_compact(&data), "01 1F");
//! ```

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode bytes to lowercase hex string
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decode hex string to bytes
///
/// Accepts both uppercase and lowercase hex characters. Whitespace, `0x`
/// prefixes and commas are stripped so frames can be pasted from captures.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    let cleaned: String = hex_str
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(|tok| tok.trim_start_matches("0x").trim_start_matches("0X"))
        .collect();

    if cleaned.is_empty() {
        return Err(HexError::EmptyString);
    }
    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }

    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Format bytes as space-separated uppercase hex (`01 1F 2A`)
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
