//! Little-endian binary fields.
//!
//! SAS carries counters, transfer numbers and pool ids as raw little-endian
//! integers of 1 to 4 (occasionally up to 8) bytes.

use crate::error::SasError;

fn check_range(bytes: &[u8], offset: usize, length: usize, max: usize) -> Result<(), SasError> {
    let in_buffer = offset
        .checked_add(length)
        .map(|end| end <= bytes.len())
        .unwrap_or(false);
    if length == 0 || length > max || !in_buffer {
        return Err(SasError::Range {
            offset,
            length,
            available: bytes.len(),
        });
    }
    Ok(())
}

/// Decodes 1–4 little-endian bytes starting at `offset`.
pub fn from_binary(bytes: &[u8], offset: usize, length: usize) -> Result<u32, SasError> {
    check_range(bytes, offset, length, 4)?;
    Ok(bytes[offset..offset + length]
        .iter()
        .rev()
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
}

/// Decodes 1–8 little-endian bytes starting at `offset`.
pub fn from_binary_u64(bytes: &[u8], offset: usize, length: usize) -> Result<u64, SasError> {
    check_range(bytes, offset, length, 8)?;
    Ok(bytes[offset..offset + length]
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

/// Encodes `value` into exactly `length` little-endian bytes.
///
/// Fails with [`SasError::Overflow`] when the value needs more than `length`
/// bytes and with [`SasError::Range`] when `length` is outside 1..=8.
pub fn to_binary(value: u64, length: usize) -> Result<Vec<u8>, SasError> {
    if length == 0 || length > 8 {
        return Err(SasError::Range {
            offset: 0,
            length,
            available: 8,
        });
    }
    if length < 8 && value >> (length * 8) != 0 {
        return Err(SasError::Overflow { value, length });
    }
    Ok(value.to_le_bytes()[..length].to_vec())
}
