//! 0x0E: enable/disable real-time event reporting.
//!
//! Every client carries this parser; it is built directly by the client
//! rather than through the registration table because its handler flips the
//! client's own reporting flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nom::number::complete::u8 as byte;

use super::{fixed_body, parse_body, AckResponse, DecodeError, LongPollDefinition, Parser};
use crate::codec::Denomination;
use crate::config::SasGroups;
use crate::sas::registry::LongPoll;

#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeEventReporting;

impl LongPollDefinition for RealTimeEventReporting {
    /// `true` to enable reporting.
    type Request = bool;
    type Response = AckResponse;

    const COMMAND: LongPoll = LongPoll::EnableDisableRealTimeEventReporting;
    const GROUP: SasGroups = SasGroups::PER_CLIENT;

    fn decode(&self, frame: &[u8], _: Option<Denomination>) -> Result<bool, DecodeError> {
        let body = fixed_body(frame, Self::COMMAND)?;
        match parse_body(body, "enable flag", byte)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::OutOfRange {
                field: "enable flag",
                value: u64::from(other),
            }),
        }
    }

    fn encode(&self, address: u8, response: &AckResponse) -> Option<Vec<u8>> {
        Some(response.encode(address))
    }
}

/// Builds the 0x0E parser bound to `flag`.
pub fn real_time_reporting_parser(flag: Arc<AtomicBool>) -> Parser<RealTimeEventReporting> {
    Parser::with_handler(RealTimeEventReporting, move |enable| {
        log::info!(
            target: "sas::client",
            "real-time event reporting {}",
            if enable { "enabled" } else { "disabled" }
        );
        flag.store(enable, Ordering::SeqCst);
        AckResponse::Ack
    })
}
