//! # Multi-Denomination Preamble (0xB0)
//!
//! The host wraps a long poll in 0xB0 to ask about one player denomination:
//!
//! ```text
//! [addr][B0][len][denom][cmd][data ...][crc lo][crc hi]
//! ```
//!
//! The wrapped poll is rebuilt as a normal frame (`[addr][cmd][data]`, plus
//! a CRC unless it is type R) and handed to its parser together with the
//! denomination. The inner response is then re-wrapped by shape:
//!
//! | inner response        | sent to the host                      |
//! |-----------------------|---------------------------------------|
//! | ACK / NACK (1 byte)   | unchanged                             |
//! | BUSY (2 bytes)        | unchanged                             |
//! | `[addr][cmd][data]`   | `[addr][B0][len][denom][cmd][data]`   |
//!
//! where `len` counts the denomination, command and data bytes. Failures
//! before the inner parser runs answer `[addr][B0][02][denom][error]`.

use bytes::{BufMut, BytesMut};

use super::{variable_body, ParserFactory};
use crate::codec::{calculate_and_append_crc, Denomination};
use crate::constants::{
    SAS_MULTI_DENOM_ERROR_INVALID_DENOM, SAS_MULTI_DENOM_ERROR_NOT_AWARE,
    SAS_MULTI_DENOM_ERROR_NOT_SUPPORTED, SAS_MULTI_DENOM_PREAMBLE,
};
use crate::sas::frame::{nack, response_shape, ResponseShape};
use crate::sas::registry::lookup;

/// Error codes carried in the preamble's error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MultiDenomError {
    NotMultiDenomAware = SAS_MULTI_DENOM_ERROR_NOT_AWARE,
    InvalidDenomination = SAS_MULTI_DENOM_ERROR_INVALID_DENOM,
    NotSupported = SAS_MULTI_DENOM_ERROR_NOT_SUPPORTED,
}

/// Builds the preamble error response.
pub fn error_response(address: u8, denomination: u8, error: MultiDenomError) -> Vec<u8> {
    vec![address, SAS_MULTI_DENOM_PREAMBLE, 0x02, denomination, error as u8]
}

/// Wraps an inner response according to its shape.
pub fn wrap_response(denomination: u8, inner: Vec<u8>) -> Vec<u8> {
    match response_shape(&inner) {
        ResponseShape::AckNack | ResponseShape::Busy => inner,
        ResponseShape::Data => {
            let mut out = BytesMut::with_capacity(inner.len() + 3);
            out.put_u8(inner[0]);
            out.put_u8(SAS_MULTI_DENOM_PREAMBLE);
            out.put_u8(inner.len() as u8);
            out.put_u8(denomination);
            out.extend_from_slice(&inner[1..]);
            out.to_vec()
        }
    }
}

/// Dispatches 0xB0 frames to the wrapped command's parser.
///
/// Not part of the registration table: it needs the client's parsers to
/// find the wrapped command, so the client builds and owns it.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiDenomPreambleParser;

impl MultiDenomPreambleParser {
    pub fn new() -> Self {
        MultiDenomPreambleParser
    }

    pub fn parse(&self, frame: &[u8], parsers: &ParserFactory) -> Option<Vec<u8>> {
        let address = *frame.first()?;
        let body = match variable_body(frame) {
            Ok(body) if body.len() >= 2 => body,
            _ => return Some(nack(address)),
        };
        let (denom_code, command, data) = (body[0], body[1], &body[2..]);

        let Some(denomination) = Denomination::from_code(denom_code) else {
            return Some(error_response(
                address,
                denom_code,
                MultiDenomError::InvalidDenomination,
            ));
        };

        let info = lookup(command);
        if command == SAS_MULTI_DENOM_PREAMBLE || !info.is_supported() || !parsers.is_registered(command)
        {
            return Some(error_response(address, denom_code, MultiDenomError::NotSupported));
        }

        let parser = parsers.get(command);
        let Some(aware) = parser.as_multi_denom() else {
            log::debug!(target: "sas::client", "0x{command:02X} is not multi-denom aware");
            return Some(error_response(
                address,
                denom_code,
                MultiDenomError::NotMultiDenomAware,
            ));
        };

        let mut inner = Vec::with_capacity(data.len() + 4);
        inner.push(address);
        inner.push(command);
        inner.extend_from_slice(data);
        if !info.is_type_r() {
            inner = calculate_and_append_crc(&inner);
        }

        let response = aware.parse_with_denom(&inner, denomination)?;
        Some(wrap_response(denom_code, response))
    }
}
