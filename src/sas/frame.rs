//! # SAS Frames
//!
//! A frame is one protocol unit read off the bus: a one-byte poll or a
//! complete long poll. This module classifies address bytes, builds the
//! standard ACK/NACK/BUSY responses and applies the outgoing CRC framing.
//!
//! Long poll layout on the wire:
//!
//! ```text
//! [address][command][length if variable][payload ...][crc lo][crc hi]
//! ```

use crate::codec::crc::calculate_and_append_crc;
use crate::constants::{
    SAS_ADDRESS_GLOBAL, SAS_ADDRESS_MASK, SAS_BARE_RESPONSE_MAX_LENGTH, SAS_BUSY_STATUS,
    SAS_EXCEPTION_NO_ACTIVITY, SAS_GENERAL_POLL_BIT, SAS_NACK_BIT,
};

/// How an address byte (received with the wakeup bit) relates to this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressClass {
    /// 0x00: start of a global broadcast long poll
    GlobalLongPoll,
    /// 0x80: global broadcast general poll
    GlobalPoll,
    /// Our address with the poll bit set
    GeneralPoll,
    /// Our address without the poll bit: a long poll follows
    LongPoll,
    /// Any other device's address
    OtherAddress,
}

/// Classifies `byte` against our configured SAS address.
pub fn classify_address(byte: u8, our_address: u8) -> AddressClass {
    let address = byte & SAS_ADDRESS_MASK;
    let poll_bit = byte & SAS_GENERAL_POLL_BIT != 0;
    match (address, poll_bit) {
        (SAS_ADDRESS_GLOBAL, false) => AddressClass::GlobalLongPoll,
        (SAS_ADDRESS_GLOBAL, true) => AddressClass::GlobalPoll,
        (a, true) if a == our_address => AddressClass::GeneralPoll,
        (a, false) if a == our_address => AddressClass::LongPoll,
        _ => AddressClass::OtherAddress,
    }
}

/// One complete frame assembled by the frame reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollFrame {
    /// General poll for this device (address | poll bit).
    GeneralPoll { address: u8 },
    /// Global broadcast general poll (0x80); a sync poll.
    GlobalPoll,
    /// Poll or long poll start for another address; a sync poll.
    OtherAddress { address_byte: u8 },
    /// A complete long poll. `broadcast` frames were sent to address 0.
    LongPoll { bytes: Vec<u8>, broadcast: bool },
}

impl PollFrame {
    /// Raw bytes as received, used as the implied-ack comparison baseline.
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            PollFrame::GeneralPoll { address } => vec![address | SAS_GENERAL_POLL_BIT],
            PollFrame::GlobalPoll => vec![SAS_ADDRESS_GLOBAL | SAS_GENERAL_POLL_BIT],
            PollFrame::OtherAddress { address_byte } => vec![*address_byte],
            PollFrame::LongPoll { bytes, .. } => bytes.clone(),
        }
    }

    pub fn is_global_broadcast(&self) -> bool {
        matches!(
            self,
            PollFrame::GlobalPoll | PollFrame::LongPoll { broadcast: true, .. }
        )
    }

    pub fn is_other_address(&self) -> bool {
        matches!(self, PollFrame::OtherAddress { .. })
    }

    /// Command byte of a long poll.
    pub fn command(&self) -> Option<u8> {
        match self {
            PollFrame::LongPoll { bytes, .. } => bytes.get(1).copied(),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PollFrame::GeneralPoll { .. } => "general",
            PollFrame::GlobalPoll => "global",
            PollFrame::OtherAddress { .. } => "other-address",
            PollFrame::LongPoll { broadcast: true, .. } => "broadcast-long",
            PollFrame::LongPoll { .. } => "long",
        }
    }
}

/// ACK: the address byte alone.
pub fn ack(address: u8) -> Vec<u8> {
    vec![address]
}

/// NACK: the address byte with the NACK bit set.
pub fn nack(address: u8) -> Vec<u8> {
    vec![address | SAS_NACK_BIT]
}

/// BUSY: the address byte followed by a zero status byte.
pub fn busy(address: u8) -> Vec<u8> {
    vec![address, SAS_BUSY_STATUS]
}

/// Shape of an unframed response, as the multi-denom envelope sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    AckNack,
    Busy,
    Data,
}

pub fn response_shape(response: &[u8]) -> ResponseShape {
    match response.len() {
        1 => ResponseShape::AckNack,
        2 if response[1] == SAS_BUSY_STATUS => ResponseShape::Busy,
        _ => ResponseShape::Data,
    }
}

/// Prepares an unframed response for the wire: anything longer than two
/// bytes gets the CRC appended; ACK, NACK, BUSY and single exception bytes
/// go out bare.
pub fn frame_response(response: &[u8]) -> Vec<u8> {
    if response.len() <= SAS_BARE_RESPONSE_MAX_LENGTH {
        response.to_vec()
    } else {
        calculate_and_append_crc(response)
    }
}

/// Whether a long poll response must be confirmed by implied ACK.
///
/// ACK, NACK and BUSY need no confirmation; data responses do.
pub fn requires_implied_ack(response: &[u8]) -> bool {
    response.len() > SAS_BARE_RESPONSE_MAX_LENGTH
}

/// Whether a general poll answer (exception byte) must be confirmed.
pub fn exception_requires_implied_ack(code: u8) -> bool {
    code != SAS_EXCEPTION_NO_ACTIVITY
}
