//! # SAS Wire Codec
//!
//! Pure, stateless conversions between SAS wire fields and Rust values:
//! little-endian binary counters, packed BCD, the SAS CRC-16, date/time
//! fields, fixed-width ASCII and denomination codes.
//!
//! Operations that the protocol layer must survive on garbage input
//! (`from_bcd_with_validation`, `ascii_to_bcd`, date/time unpacking) never
//! return errors; they report validity instead so the caller can answer
//! with a NACK.

pub mod ascii;
pub mod bcd;
pub mod binary;
pub mod crc;
pub mod datetime;
pub mod denomination;

pub use ascii::{ascii_to_bcd, from_ascii_field, to_ascii_field};
pub use bcd::{from_bcd_with_validation, to_bcd};
pub use binary::{from_binary, from_binary_u64, to_binary};
pub use crc::{calculate_and_append_crc, check_crc, generate_crc16, verify_crc};
pub use datetime::{
    pack_date, pack_date_time, pack_time, unpack_date, unpack_date_time, unpack_time,
};
pub use denomination::Denomination;
