//! Meter and machine information polls.
//!
//! The single-meter polls are type R (address and command only) and answer
//! `[addr][cmd][meter: 4 BCD]`. They may be wrapped in the multi-denomination
//! preamble, in which case the handler reports the meter for that
//! denomination. A handler returning `None` sends nothing.

use bytes::{BufMut, BytesMut};

use super::{fixed_body, DecodeError, LongPollDefinition};
use crate::codec::{to_ascii_field, to_bcd, to_binary, Denomination};
use crate::config::SasGroups;
use crate::sas::registry::LongPoll;

/// BCD bytes of a single meter value.
pub const METER_LENGTH: usize = 4;

/// Request for any single-meter poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeterRequest {
    /// Set when the host asked through the multi-denomination preamble.
    pub denomination: Option<Denomination>,
}

fn encode_meter(address: u8, command: LongPoll, value: u64) -> Vec<u8> {
    let mut out = BytesMut::with_capacity(2 + METER_LENGTH);
    out.put_u8(address);
    out.put_u8(command.code());
    out.extend_from_slice(&to_bcd(value, METER_LENGTH));
    out.to_vec()
}

macro_rules! single_meters {
    ($( $(#[$doc:meta])* $name:ident; )*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $name;

            impl LongPollDefinition for $name {
                type Request = MeterRequest;
                type Response = Option<u64>;

                const COMMAND: LongPoll = LongPoll::$name;
                const GROUP: SasGroups = SasGroups::GENERAL_CONTROL;
                const MULTI_DENOM_AWARE: bool = true;

                fn decode(
                    &self,
                    frame: &[u8],
                    denomination: Option<Denomination>,
                ) -> Result<MeterRequest, DecodeError> {
                    fixed_body(frame, Self::COMMAND)?;
                    Ok(MeterRequest { denomination })
                }

                fn encode(&self, address: u8, response: &Option<u64>) -> Option<Vec<u8>> {
                    response.map(|value| encode_meter(address, Self::COMMAND, value))
                }
            }
        )*
    };
}

single_meters! {
    /// 0x10
    TotalCanceledCredits;
    /// 0x11
    TotalCoinIn;
    /// 0x12
    TotalCoinOut;
    /// 0x13
    TotalDrop;
    /// 0x14
    TotalJackpot;
    /// 0x15
    GamesPlayed;
    /// 0x1A
    CurrentCredits;
}

/// Answer to 0x1F.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GamingMachineInfo {
    /// Two ASCII characters.
    pub game_id: String,
    /// Three ASCII characters.
    pub additional_id: String,
    /// Denomination code.
    pub denomination: u8,
    pub max_bet: u8,
    pub progressive_group: u8,
    /// Game options bit field.
    pub game_options: u16,
    /// Six ASCII characters.
    pub paytable_id: String,
    /// Theoretical payback, four ASCII characters (e.g. "9450" for 94.50%).
    pub base_percentage: String,
}

/// 0x1F: gaming machine ID and information.
#[derive(Debug, Clone, Copy, Default)]
pub struct GamingMachineIdAndInformation;

impl LongPollDefinition for GamingMachineIdAndInformation {
    type Request = MeterRequest;
    type Response = Option<GamingMachineInfo>;

    const COMMAND: LongPoll = LongPoll::GamingMachineIdAndInformation;
    const GROUP: SasGroups = SasGroups::GENERAL_CONTROL;
    const MULTI_DENOM_AWARE: bool = true;

    fn decode(
        &self,
        frame: &[u8],
        denomination: Option<Denomination>,
    ) -> Result<MeterRequest, DecodeError> {
        fixed_body(frame, Self::COMMAND)?;
        Ok(MeterRequest { denomination })
    }

    fn encode(&self, address: u8, response: &Option<GamingMachineInfo>) -> Option<Vec<u8>> {
        let info = response.as_ref()?;
        let mut out = BytesMut::with_capacity(24);
        out.put_u8(address);
        out.put_u8(Self::COMMAND.code());
        out.extend_from_slice(&to_ascii_field(&info.game_id, 2));
        out.extend_from_slice(&to_ascii_field(&info.additional_id, 3));
        out.put_u8(info.denomination);
        out.put_u8(info.max_bet);
        out.put_u8(info.progressive_group);
        out.extend_from_slice(&to_binary(u64::from(info.game_options), 2).ok()?);
        out.extend_from_slice(&to_ascii_field(&info.paytable_id, 6));
        out.extend_from_slice(&to_ascii_field(&info.base_percentage, 4));
        Some(out.to_vec())
    }
}

/// Longest serial number 0x54 can carry.
pub const MAX_SERIAL_NUMBER_LENGTH: usize = 40;

/// Answer to 0x54.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SasVersion {
    /// Three ASCII digits, e.g. "603".
    pub version: String,
    pub serial_number: String,
}

/// 0x54: SAS version and machine serial number. Variable-length response.
#[derive(Debug, Clone, Copy, Default)]
pub struct SasVersionAndSerialNumber;

impl LongPollDefinition for SasVersionAndSerialNumber {
    type Request = ();
    type Response = Option<SasVersion>;

    const COMMAND: LongPoll = LongPoll::SasVersionAndSerialNumber;
    const GROUP: SasGroups = SasGroups::GENERAL_CONTROL;

    fn decode(&self, frame: &[u8], _: Option<Denomination>) -> Result<(), DecodeError> {
        fixed_body(frame, Self::COMMAND).map(|_| ())
    }

    fn encode(&self, address: u8, response: &Option<SasVersion>) -> Option<Vec<u8>> {
        let version = response.as_ref()?;
        let serial_len = version
            .serial_number
            .chars()
            .count()
            .min(MAX_SERIAL_NUMBER_LENGTH);
        let serial = to_ascii_field(&version.serial_number, serial_len);

        let mut out = BytesMut::with_capacity(6 + serial.len());
        out.put_u8(address);
        out.put_u8(Self::COMMAND.code());
        out.put_u8((3 + serial.len()) as u8);
        out.extend_from_slice(&to_ascii_field(&version.version, 3));
        out.extend_from_slice(&serial);
        Some(out.to_vec())
    }
}
