//! SAS date and time fields.
//!
//! Dates are eight BCD digits `MMDDYYYY` (4 bytes), times six BCD digits
//! `HHMMSS` (3 bytes); the combined form is the 7-byte concatenation.
//! Unpacking returns `None` for anything that is not a real calendar value.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use super::bcd::{from_bcd_with_validation, to_bcd};

/// Bytes in a packed `MMDDYYYY` date.
pub const DATE_LENGTH: usize = 4;
/// Bytes in a packed `HHMMSS` time.
pub const TIME_LENGTH: usize = 3;
/// Bytes in a packed date followed by a packed time.
pub const DATE_TIME_LENGTH: usize = DATE_LENGTH + TIME_LENGTH;

/// Packs a date as `MMDDYYYY`.
pub fn pack_date(date: NaiveDate) -> Vec<u8> {
    let digits = u64::from(date.month()) * 1_000_000
        + u64::from(date.day()) * 10_000
        + date.year().clamp(0, 9999) as u64;
    to_bcd(digits, DATE_LENGTH)
}

/// Packs a time as `HHMMSS`.
pub fn pack_time(time: NaiveTime) -> Vec<u8> {
    let digits =
        u64::from(time.hour()) * 10_000 + u64::from(time.minute()) * 100 + u64::from(time.second());
    to_bcd(digits, TIME_LENGTH)
}

/// Packs a timestamp as `MMDDYYYYHHMMSS`.
pub fn pack_date_time(value: NaiveDateTime) -> Vec<u8> {
    let mut out = pack_date(value.date());
    out.extend(pack_time(value.time()));
    out
}

/// Unpacks `MMDDYYYY` from the first four bytes of `bytes`.
pub fn unpack_date(bytes: &[u8]) -> Option<NaiveDate> {
    let (digits, valid) = from_bcd_with_validation(bytes, 0, DATE_LENGTH);
    if !valid {
        return None;
    }
    let month = (digits / 1_000_000) as u32;
    let day = ((digits / 10_000) % 100) as u32;
    let year = (digits % 10_000) as i32;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Unpacks `HHMMSS` from the first three bytes of `bytes`.
pub fn unpack_time(bytes: &[u8]) -> Option<NaiveTime> {
    let (digits, valid) = from_bcd_with_validation(bytes, 0, TIME_LENGTH);
    if !valid {
        return None;
    }
    let hour = (digits / 10_000) as u32;
    let minute = ((digits / 100) % 100) as u32;
    let second = (digits % 100) as u32;
    NaiveTime::from_hms_opt(hour, minute, second)
}

/// Unpacks `MMDDYYYYHHMMSS` from the first seven bytes of `bytes`.
pub fn unpack_date_time(bytes: &[u8]) -> Option<NaiveDateTime> {
    if bytes.len() < DATE_TIME_LENGTH {
        return None;
    }
    let date = unpack_date(&bytes[..DATE_LENGTH])?;
    let time = unpack_time(&bytes[DATE_LENGTH..DATE_TIME_LENGTH])?;
    Some(date.and_time(time))
}
