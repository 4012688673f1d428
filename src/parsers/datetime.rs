//! 0x7E (report current date and time) and 0x7F (set date and time).
//!
//! 0x7F may be broadcast; broadcast frames are processed but never answered.

use bytes::{BufMut, BytesMut};
use chrono::NaiveDateTime;

use super::{fixed_body, AckResponse, DecodeError, LongPollDefinition};
use crate::codec::datetime::DATE_TIME_LENGTH;
use crate::codec::{pack_date_time, unpack_date_time, Denomination};
use crate::config::SasGroups;
use crate::sas::registry::LongPoll;

/// 0x7E: the machine reports its clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentDateAndTime;

impl LongPollDefinition for CurrentDateAndTime {
    type Request = ();
    type Response = Option<NaiveDateTime>;

    const COMMAND: LongPoll = LongPoll::CurrentDateAndTime;
    const GROUP: SasGroups = SasGroups::GENERAL_CONTROL;

    fn decode(&self, frame: &[u8], _: Option<Denomination>) -> Result<(), DecodeError> {
        fixed_body(frame, Self::COMMAND).map(|_| ())
    }

    fn encode(&self, address: u8, response: &Option<NaiveDateTime>) -> Option<Vec<u8>> {
        let now = (*response)?;
        let mut out = BytesMut::with_capacity(2 + DATE_TIME_LENGTH);
        out.put_u8(address);
        out.put_u8(Self::COMMAND.code());
        out.extend_from_slice(&pack_date_time(now));
        Some(out.to_vec())
    }
}

/// 0x7F: the host sets the machine clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiveDateAndTime;

impl LongPollDefinition for ReceiveDateAndTime {
    type Request = NaiveDateTime;
    type Response = AckResponse;

    const COMMAND: LongPoll = LongPoll::ReceiveDateAndTime;
    const GROUP: SasGroups = SasGroups::GENERAL_CONTROL;

    fn decode(&self, frame: &[u8], _: Option<Denomination>) -> Result<NaiveDateTime, DecodeError> {
        let body = fixed_body(frame, Self::COMMAND)?;
        unpack_date_time(body).ok_or(DecodeError::Malformed("date/time"))
    }

    fn encode(&self, address: u8, response: &AckResponse) -> Option<Vec<u8>> {
        Some(response.encode(address))
    }
}
