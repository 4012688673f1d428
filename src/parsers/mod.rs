//! # Long-Poll Parser Framework
//!
//! Every supported long poll is described by a [`LongPollDefinition`]: a
//! typed request decoded from the frame, a typed response produced by the
//! business handler, and the encoding of that response back to bytes.
//! [`Parser`] wraps a definition together with its injectable handler and is
//! used through the object-safe [`LongPollParser`] trait by the client.
//!
//! Outcome of a parse:
//!
//! - a decode failure (bad BCD, out-of-range value, wrong length) answers NACK;
//! - no handler injected, or the handler has nothing to say: no response,
//!   the host times out and moves on;
//! - otherwise the encoded response, unframed (the client appends the CRC).
//!
//! Parsers that may be wrapped in the multi-denomination preamble (0xB0)
//! also receive the denomination selected by the host.

pub mod bonus;
pub mod control;
pub mod datetime;
pub mod eft;
pub mod factory;
pub mod meters;
pub mod multi_denom;
pub mod progressive;
pub mod reporting;
pub mod validation;

use std::any::Any;
use std::sync::{Arc, PoisonError, RwLock};

use nom::bytes::complete::take;
use nom::combinator::all_consuming;
use nom::error::{Error as NomError, ErrorKind};
use nom::IResult;
use thiserror::Error;

use crate::codec::{from_bcd_with_validation, Denomination};
use crate::config::SasGroups;
use crate::constants::{SAS_CRC_LENGTH, SAS_VARIABLE_BASE_LENGTH};
use crate::sas::frame::{ack, busy, nack};
use crate::sas::registry::LongPoll;

pub use factory::{ParserFactory, ParserRegistration, PARSER_REGISTRATIONS};
pub use multi_denom::MultiDenomPreambleParser;

/// Why a long poll request could not be decoded. Always answered with NACK.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame is {actual} bytes, expected {expected}")]
    Length { expected: usize, actual: usize },

    #[error("malformed {0} field")]
    Malformed(&'static str),

    #[error("{field} value {value} out of range")]
    OutOfRange { field: &'static str, value: u64 },
}

/// Answer of handlers whose long poll only acknowledges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckResponse {
    Ack,
    Nack,
    Busy,
}

impl AckResponse {
    pub fn encode(self, address: u8) -> Vec<u8> {
        match self {
            AckResponse::Ack => ack(address),
            AckResponse::Nack => nack(address),
            AckResponse::Busy => busy(address),
        }
    }
}

impl From<bool> for AckResponse {
    fn from(accepted: bool) -> Self {
        if accepted {
            AckResponse::Ack
        } else {
            AckResponse::Nack
        }
    }
}

/// Business handler for one long poll.
pub type Handler<Req, Resp> = Arc<dyn Fn(Req) -> Resp + Send + Sync>;

/// Static description of one long poll: its command, protocol group and
/// request/response wire format.
pub trait LongPollDefinition: Send + Sync + 'static {
    type Request: Send + 'static;
    type Response: Send + 'static;

    const COMMAND: LongPoll;
    const GROUP: SasGroups;
    /// Whether the poll may be wrapped in the multi-denomination preamble.
    const MULTI_DENOM_AWARE: bool = false;

    /// Decodes a complete frame (address through CRC). `denomination` is set
    /// when the frame was unwrapped from the multi-denomination preamble.
    fn decode(
        &self,
        frame: &[u8],
        denomination: Option<Denomination>,
    ) -> Result<Self::Request, DecodeError>;

    /// Encodes the handler's answer. `None` sends nothing.
    fn encode(&self, address: u8, response: &Self::Response) -> Option<Vec<u8>>;
}

/// Object-safe view of a parser, as stored in the [`ParserFactory`].
pub trait LongPollParser: Send + Sync {
    fn command(&self) -> u8;

    fn group(&self) -> SasGroups;

    /// Parses a complete frame and returns the unframed response, if any.
    fn parse(&self, frame: &[u8]) -> Option<Vec<u8>>;

    /// The multi-denomination capability, for parsers that have it.
    fn as_multi_denom(&self) -> Option<&dyn MultiDenomParser> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Parsers that accept a host-selected denomination.
pub trait MultiDenomParser {
    fn parse_with_denom(&self, frame: &[u8], denomination: Denomination) -> Option<Vec<u8>>;
}

/// A long poll definition plus its injected business handler.
pub struct Parser<D: LongPollDefinition> {
    definition: D,
    handler: RwLock<Option<Handler<D::Request, D::Response>>>,
}

impl<D: LongPollDefinition> Parser<D> {
    pub fn new(definition: D) -> Self {
        Parser {
            definition,
            handler: RwLock::new(None),
        }
    }

    pub fn with_handler<F>(definition: D, handler: F) -> Self
    where
        F: Fn(D::Request) -> D::Response + Send + Sync + 'static,
    {
        let parser = Self::new(definition);
        parser.set_handler(handler);
        parser
    }

    /// Attaches (or replaces) the business handler.
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(D::Request) -> D::Response + Send + Sync + 'static,
    {
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    pub fn has_handler(&self) -> bool {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn definition(&self) -> &D {
        &self.definition
    }

    fn handle(&self, frame: &[u8], denomination: Option<Denomination>) -> Option<Vec<u8>> {
        let address = *frame.first()?;
        let request = match self.definition.decode(frame, denomination) {
            Ok(request) => request,
            Err(e) => {
                log::debug!(
                    target: "sas::client",
                    "long poll 0x{:02X} rejected: {e}",
                    D::COMMAND.code()
                );
                return Some(nack(address));
            }
        };

        // Clone the handler out so it runs without the lock held.
        let handler = self
            .handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        let response = handler(request);
        self.definition.encode(address, &response)
    }
}

impl<D: LongPollDefinition> LongPollParser for Parser<D> {
    fn command(&self) -> u8 {
        D::COMMAND.code()
    }

    fn group(&self) -> SasGroups {
        D::GROUP
    }

    fn parse(&self, frame: &[u8]) -> Option<Vec<u8>> {
        self.handle(frame, None)
    }

    fn as_multi_denom(&self) -> Option<&dyn MultiDenomParser> {
        if D::MULTI_DENOM_AWARE {
            Some(self)
        } else {
            None
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<D: LongPollDefinition> MultiDenomParser for Parser<D> {
    fn parse_with_denom(&self, frame: &[u8], denomination: Denomination) -> Option<Vec<u8>> {
        self.handle(frame, Some(denomination))
    }
}

/// Sentinel for commands with no registered parser; never answers.
#[derive(Debug, Clone, Copy)]
pub struct UnhandledParser {
    command: u8,
}

impl UnhandledParser {
    pub fn new(command: u8) -> Self {
        UnhandledParser { command }
    }
}

impl LongPollParser for UnhandledParser {
    fn command(&self) -> u8 {
        self.command
    }

    fn group(&self) -> SasGroups {
        SasGroups::empty()
    }

    fn parse(&self, _frame: &[u8]) -> Option<Vec<u8>> {
        None
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ----------------------------------------------------------------------------
// Decoding helpers shared by the concrete parsers
// ----------------------------------------------------------------------------

/// Payload of a fixed-length poll: the bytes between command and CRC.
/// The frame must be exactly the registered length.
pub(crate) fn fixed_body(frame: &[u8], command: LongPoll) -> Result<&[u8], DecodeError> {
    let info = command.info();
    let expected = usize::from(info.length);
    if frame.len() != expected {
        return Err(DecodeError::Length {
            expected,
            actual: frame.len(),
        });
    }
    if info.is_type_r() {
        return Ok(&[]);
    }
    Ok(&frame[2..expected - SAS_CRC_LENGTH])
}

/// Payload of a variable-length poll: the bytes after the length byte,
/// checked against it.
pub(crate) fn variable_body(frame: &[u8]) -> Result<&[u8], DecodeError> {
    let stated = usize::from(*frame.get(2).ok_or(DecodeError::Length {
        expected: SAS_VARIABLE_BASE_LENGTH,
        actual: frame.len(),
    })?);
    let expected = SAS_VARIABLE_BASE_LENGTH + stated;
    if frame.len() != expected {
        return Err(DecodeError::Length {
            expected,
            actual: frame.len(),
        });
    }
    Ok(&frame[3..3 + stated])
}

/// nom parser for a `length`-byte packed BCD field; invalid digits fail
/// with `ErrorKind::Verify`.
pub(crate) fn bcd(length: usize) -> impl Fn(&[u8]) -> IResult<&[u8], u64> {
    move |input: &[u8]| {
        let (rest, bytes) = take(length)(input)?;
        match from_bcd_with_validation(bytes, 0, length) {
            (value, true) => Ok((rest, value)),
            _ => Err(nom::Err::Error(NomError::new(input, ErrorKind::Verify))),
        }
    }
}

/// Runs `parser` over the whole body; any failure or leftover bytes is a
/// malformed `field`.
pub(crate) fn parse_body<'a, T, P>(
    body: &'a [u8],
    field: &'static str,
    parser: P,
) -> Result<T, DecodeError>
where
    P: FnMut(&'a [u8]) -> IResult<&'a [u8], T>,
{
    all_consuming(parser)(body)
        .map(|(_, value)| value)
        .map_err(|_| DecodeError::Malformed(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::calculate_and_append_crc;
    use crate::parsers::control::Shutdown;

    #[test]
    fn test_fixed_body_checks_length() {
        let frame = calculate_and_append_crc(&[0x01, 0x01]);
        assert_eq!(fixed_body(&frame, LongPoll::Shutdown), Ok(&[][..]));
        assert_eq!(
            fixed_body(&[0x01, 0x01, 0x00], LongPoll::Shutdown),
            Err(DecodeError::Length {
                expected: 4,
                actual: 3
            })
        );
        assert_eq!(fixed_body(&[0x01, 0x1F], LongPoll::GamingMachineIdAndInformation), Ok(&[][..]));
    }

    #[test]
    fn test_variable_body() {
        let frame = calculate_and_append_crc(&[0x01, 0xB0, 0x02, 0x01, 0x1A]);
        assert_eq!(variable_body(&frame), Ok(&[0x01, 0x1A][..]));
        assert!(variable_body(&frame[..5]).is_err());
        assert!(variable_body(&[0x01, 0xB0]).is_err());
    }

    #[test]
    fn test_bcd_combinator() {
        assert_eq!(bcd(2)(&[0x12, 0x34, 0xFF][..]), Ok((&[0xFF][..], 1234)));
        assert!(bcd(2)(&[0x1A, 0x34][..]).is_err());
        assert!(bcd(2)(&[0x12][..]).is_err());
        assert_eq!(parse_body(&[0x12, 0x34][..], "amount", bcd(2)), Ok(1234));
        assert_eq!(
            parse_body(&[0x12, 0x34, 0x00][..], "amount", bcd(2)),
            Err(DecodeError::Malformed("amount"))
        );
    }

    #[test]
    fn test_no_handler_means_no_response() {
        let parser = Parser::new(Shutdown);
        let frame = calculate_and_append_crc(&[0x01, 0x01]);
        assert!(!parser.has_handler());
        assert_eq!(parser.parse(&frame), None);

        parser.set_handler(|()| AckResponse::Ack);
        assert_eq!(parser.parse(&frame), Some(vec![0x01]));
        assert!(parser.as_multi_denom().is_none());
    }

    #[test]
    fn test_ack_response_encoding() {
        assert_eq!(AckResponse::Ack.encode(3), vec![0x03]);
        assert_eq!(AckResponse::Nack.encode(3), vec![0x83]);
        assert_eq!(AckResponse::Busy.encode(3), vec![0x03, 0x00]);
        assert_eq!(AckResponse::from(false), AckResponse::Nack);
    }

    #[test]
    fn test_unhandled_parser() {
        let parser = UnhandledParser::new(0x99);
        assert_eq!(parser.command(), 0x99);
        assert_eq!(parser.parse(&[0x01, 0x99]), None);
    }
}
