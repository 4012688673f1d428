//! General control long polls: machine shutdown/startup, sound, bill
//! acceptor and maintenance mode. All of them answer ACK or NACK.

use nom::bytes::complete::take;
use nom::number::complete::u8 as byte;
use nom::sequence::tuple;

use super::{fixed_body, parse_body, AckResponse, DecodeError, LongPollDefinition};
use crate::codec::Denomination;
use crate::config::SasGroups;
use crate::constants::SAS_CENTS_PER_DOLLAR;
use crate::sas::registry::LongPoll;

macro_rules! simple_controls {
    ($( $(#[$doc:meta])* $name:ident; )*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $name;

            impl LongPollDefinition for $name {
                type Request = ();
                type Response = AckResponse;

                const COMMAND: LongPoll = LongPoll::$name;
                const GROUP: SasGroups = SasGroups::GENERAL_CONTROL;

                fn decode(&self, frame: &[u8], _: Option<Denomination>) -> Result<(), DecodeError> {
                    fixed_body(frame, Self::COMMAND).map(|_| ())
                }

                fn encode(&self, address: u8, response: &AckResponse) -> Option<Vec<u8>> {
                    Some(response.encode(address))
                }
            }
        )*
    };
}

simple_controls! {
    /// 0x01: disable play.
    Shutdown;
    /// 0x02: enable play.
    Startup;
    /// 0x03
    SoundOff;
    /// 0x04
    SoundOn;
    /// 0x06
    EnableBillAcceptor;
    /// 0x07
    DisableBillAcceptor;
    /// 0x0A
    EnterMaintenanceMode;
    /// 0x0B
    ExitMaintenanceMode;
}

/// Bill values in dollars, one per bit of the denomination mask (bit 0 first).
const BILL_DOLLARS: [u64; 24] = [
    1, 2, 5, 10, 20, 25, 50, 100, 200, 250, 500, 1_000, 2_000, 2_500, 5_000, 10_000, 20_000,
    25_000, 50_000, 100_000, 200_000, 250_000, 500_000, 1_000_000,
];

/// Decoded 0x08 request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillDenominationConfig {
    /// Accepted bill values in cents, smallest first.
    pub denominations: Vec<u64>,
    /// Disable the bill acceptor after each accepted bill.
    pub disable_after_accept: bool,
}

/// 0x08: configure accepted bill denominations.
///
/// Payload: a 4-byte bit mask (least significant byte first; the fourth
/// byte is reserved) followed by the action flag (0 = keep the acceptor
/// enabled, 1 = disable it after each accepted bill).
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigureBillDenominations;

impl LongPollDefinition for ConfigureBillDenominations {
    type Request = BillDenominationConfig;
    type Response = AckResponse;

    const COMMAND: LongPoll = LongPoll::ConfigureBillDenominations;
    const GROUP: SasGroups = SasGroups::GENERAL_CONTROL;

    fn decode(
        &self,
        frame: &[u8],
        _: Option<Denomination>,
    ) -> Result<BillDenominationConfig, DecodeError> {
        let body = fixed_body(frame, Self::COMMAND)?;
        let (mask, action) = parse_body(body, "bill denominations", tuple((take(4usize), byte)))?;
        if action > 1 {
            return Err(DecodeError::OutOfRange {
                field: "bill acceptor action",
                value: u64::from(action),
            });
        }

        let bits = u32::from_le_bytes([mask[0], mask[1], mask[2], 0]);
        let denominations = BILL_DOLLARS
            .iter()
            .enumerate()
            .filter(|(bit, _)| bits & (1 << bit) != 0)
            .map(|(_, dollars)| dollars * SAS_CENTS_PER_DOLLAR)
            .collect();

        Ok(BillDenominationConfig {
            denominations,
            disable_after_accept: action == 1,
        })
    }

    fn encode(&self, address: u8, response: &AckResponse) -> Option<Vec<u8>> {
        Some(response.encode(address))
    }
}
