//! Packed BCD fields.
//!
//! Two decimal digits per byte, most significant byte first. Meters,
//! amounts and validation numbers travel this way; a validation number is up
//! to 16 digits in 8 bytes.

/// Longest BCD field that still fits a `u64`.
const MAX_BCD_BYTES: usize = 8;

/// Decodes `length` packed BCD bytes starting at `offset`.
///
/// Never fails: returns `(0, false)` if any nibble is above 9 or the range
/// does not fit the buffer, so callers can branch into a NACK.
pub fn from_bcd_with_validation(bytes: &[u8], offset: usize, length: usize) -> (u64, bool) {
    let end = match offset.checked_add(length) {
        Some(end) if end <= bytes.len() && (1..=MAX_BCD_BYTES).contains(&length) => end,
        _ => return (0, false),
    };

    let mut value = 0u64;
    for &byte in &bytes[offset..end] {
        let high = u64::from(byte >> 4);
        let low = u64::from(byte & 0x0F);
        if high > 9 || low > 9 {
            return (0, false);
        }
        value = value * 100 + high * 10 + low;
    }
    (value, true)
}

/// Encodes `value` into `length` packed BCD bytes.
///
/// Digits are filled from the last byte backwards; digits that do not fit
/// are dropped silently.
pub fn to_bcd(value: u64, length: usize) -> Vec<u8> {
    let mut out = vec![0u8; length];
    let mut rest = value;
    for slot in out.iter_mut().rev() {
        let low = (rest % 10) as u8;
        rest /= 10;
        let high = (rest % 10) as u8;
        rest /= 10;
        *slot = (high << 4) | low;
    }
    out
}
