//! 0x4D: send enhanced validation information.
//!
//! Two-tier failure: an undefined function code is rejected with NACK before
//! the handler runs, while a handler that has no record to report still
//! answers, with an all-zero record.

use bytes::{BufMut, BytesMut};
use chrono::{NaiveDate, NaiveDateTime};
use nom::number::complete::u8 as byte;

use super::{fixed_body, parse_body, DecodeError, LongPollDefinition};
use crate::codec::datetime::DATE_LENGTH;
use crate::codec::{pack_date, pack_date_time, to_bcd, to_binary, Denomination};
use crate::config::SasGroups;
use crate::sas::registry::LongPoll;

/// Bytes following `[addr][4D]` in the response.
pub const VALIDATION_RECORD_LENGTH: usize = 31;

/// Which record the host asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFunction {
    /// 0x00: the current record; the read pointer advances.
    Current,
    /// 0x01..=0x1F: the record at a buffer index.
    BufferIndex(u8),
    /// 0xFF: the current record without advancing the pointer.
    LookAhead,
}

impl ValidationFunction {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(ValidationFunction::Current),
            0x01..=0x1F => Some(ValidationFunction::BufferIndex(code)),
            0xFF => Some(ValidationFunction::LookAhead),
            _ => None,
        }
    }
}

/// One validation record as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRecord {
    pub validation_type: u8,
    pub index: u8,
    pub timestamp: NaiveDateTime,
    /// Up to 16 digits.
    pub validation_number: u64,
    /// Amount in cents, up to 10 digits.
    pub amount: u64,
    pub ticket_number: u16,
    pub validation_system_id: u8,
    /// Expiration date; `None` encodes as all zeros (never expires).
    pub expiration: Option<NaiveDate>,
    pub pool_id: u16,
}

impl ValidationRecord {
    fn encode_into(&self, out: &mut BytesMut) -> Option<()> {
        out.put_u8(self.validation_type);
        out.put_u8(self.index);
        out.extend_from_slice(&pack_date_time(self.timestamp));
        out.extend_from_slice(&to_bcd(self.validation_number, 8));
        out.extend_from_slice(&to_bcd(self.amount, 5));
        out.extend_from_slice(&to_binary(u64::from(self.ticket_number), 2).ok()?);
        out.put_u8(self.validation_system_id);
        match self.expiration {
            Some(date) => out.extend_from_slice(&pack_date(date)),
            None => out.put_bytes(0, DATE_LENGTH),
        }
        out.extend_from_slice(&to_binary(u64::from(self.pool_id), 2).ok()?);
        Some(())
    }
}

/// 0x4D definition.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnhancedValidationInformation;

impl LongPollDefinition for EnhancedValidationInformation {
    type Request = ValidationFunction;
    /// `None` when no record is available.
    type Response = Option<ValidationRecord>;

    const COMMAND: LongPoll = LongPoll::EnhancedValidationInformation;
    const GROUP: SasGroups = SasGroups::VALIDATION;

    fn decode(
        &self,
        frame: &[u8],
        _: Option<Denomination>,
    ) -> Result<ValidationFunction, DecodeError> {
        let body = fixed_body(frame, Self::COMMAND)?;
        let code = parse_body(body, "function code", byte)?;
        ValidationFunction::from_code(code).ok_or(DecodeError::OutOfRange {
            field: "function code",
            value: u64::from(code),
        })
    }

    fn encode(&self, address: u8, response: &Option<ValidationRecord>) -> Option<Vec<u8>> {
        let mut out = BytesMut::with_capacity(2 + VALIDATION_RECORD_LENGTH);
        out.put_u8(address);
        out.put_u8(Self::COMMAND.code());
        match response {
            Some(record) => record.encode_into(&mut out)?,
            None => out.put_bytes(0, VALIDATION_RECORD_LENGTH),
        }
        debug_assert_eq!(out.len(), 2 + VALIDATION_RECORD_LENGTH);
        Some(out.to_vec())
    }
}
