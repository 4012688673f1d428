//! SAS CRC-16.
//!
//! The SAS CRC is the CCITT polynomial processed a nibble at a time with the
//! 0x1081 constant, starting from zero (the same values as CRC-16/KERMIT).
//! It is appended low byte first.

use crate::constants::{SAS_CRC_LENGTH, SAS_CRC_POLY, SAS_MIN_CRC_FRAME_LENGTH};
use crate::error::SasError;

/// Computes the SAS CRC over the first `length` bytes (clamped to the slice).
pub fn generate_crc16(bytes: &[u8], length: usize) -> u16 {
    let mut crc: u16 = 0;
    for &byte in &bytes[..length.min(bytes.len())] {
        let c = u16::from(byte);
        let q = (crc ^ c) & 0x0F;
        crc = (crc >> 4) ^ (q * SAS_CRC_POLY);
        let q = (crc ^ (c >> 4)) & 0x0F;
        crc = (crc >> 4) ^ (q * SAS_CRC_POLY);
    }
    crc
}

/// Returns `bytes` followed by their CRC, low byte then high byte.
pub fn calculate_and_append_crc(bytes: &[u8]) -> Vec<u8> {
    let crc = generate_crc16(bytes, bytes.len());
    let mut out = Vec::with_capacity(bytes.len() + SAS_CRC_LENGTH);
    out.extend_from_slice(bytes);
    out.extend_from_slice(&crc.to_le_bytes());
    out
}

/// Verifies the trailing CRC of a frame. Frames shorter than four bytes fail.
pub fn check_crc(bytes: &[u8]) -> bool {
    if bytes.len() < SAS_MIN_CRC_FRAME_LENGTH {
        return false;
    }
    received_crc(bytes) == generate_crc16(bytes, bytes.len() - SAS_CRC_LENGTH)
}

/// Like [`check_crc`], but reports what was received and what was computed.
pub fn verify_crc(bytes: &[u8]) -> Result<(), SasError> {
    if bytes.len() < SAS_MIN_CRC_FRAME_LENGTH {
        return Err(SasError::Range {
            offset: 0,
            length: SAS_MIN_CRC_FRAME_LENGTH,
            available: bytes.len(),
        });
    }
    let expected = received_crc(bytes);
    let calculated = generate_crc16(bytes, bytes.len() - SAS_CRC_LENGTH);
    if expected != calculated {
        return Err(SasError::InvalidCrc {
            expected,
            calculated,
        });
    }
    Ok(())
}

/// CRC carried in the last two bytes of a frame. Callers check the length first.
pub(crate) fn received_crc(bytes: &[u8]) -> u16 {
    let n = bytes.len();
    u16::from_le_bytes([bytes[n - 2], bytes[n - 1]])
}
