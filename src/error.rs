//! # SAS Error Handling
//!
//! This module defines the SasError enum, which represents the different error
//! types that can occur in the sas-egm crate.
//!
//! Malformed wire data never surfaces here: parsers turn it into NACK
//! responses. These variants cover codec misuse, transport failures,
//! configuration problems and registry lookups.

use thiserror::Error;

/// Represents the different error types that can occur in the SAS crate.
#[derive(Debug, Error)]
pub enum SasError {
    /// Indicates an error related to the serial port communication.
    #[error("Serial port error: {0}")]
    SerialPortError(String),

    /// The transport has not been opened yet.
    #[error("Transport not open")]
    TransportClosed,

    /// An offset/length pair falls outside the buffer or the supported width.
    #[error("Range error: offset {offset} length {length} on buffer of {available} bytes")]
    Range {
        offset: usize,
        length: usize,
        available: usize,
    },

    /// A value does not fit in the requested number of bytes.
    #[error("Value {value} does not fit in {length} byte(s)")]
    Overflow { value: u64, length: usize },

    /// Indicates a CRC mismatch on a received frame.
    #[error("Invalid CRC: expected 0x{expected:04X}, calculated 0x{calculated:04X}")]
    InvalidCrc { expected: u16, calculated: u16 },

    /// Indicates an invalid hexadecimal string was provided.
    #[error("Invalid hexadecimal string: {0}")]
    InvalidHexString(String),

    /// Configuration rejected by validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No parser is registered for the command.
    #[error("No parser registered for long poll 0x{0:02X}")]
    ParserNotRegistered(u8),

    /// A handler was injected with request/response types that do not match the parser.
    #[error("Handler type mismatch for long poll 0x{0:02X}")]
    HandlerTypeMismatch(u8),

    /// Indicates an I/O error while reading configuration or similar resources.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Indicates a JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A catch‑all error for uncategorized cases.
    #[error("Other error: {0}")]
    Other(String),
}
