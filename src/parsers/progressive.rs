//! 0x80: single-level progressive broadcast.
//!
//! Normally sent to the global address, so the machine processes it without
//! answering. Addressed copies are acknowledged.

use nom::number::complete::u8 as byte;
use nom::sequence::tuple;

use super::{bcd, fixed_body, parse_body, AckResponse, DecodeError, LongPollDefinition};
use crate::codec::Denomination;
use crate::config::SasGroups;
use crate::sas::registry::LongPoll;

/// Highest progressive level number.
pub const MAX_PROGRESSIVE_LEVEL: u8 = 32;

/// Decoded 0x80 request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressiveLevelAmount {
    pub group: u8,
    /// 1..=32
    pub level: u8,
    /// Level amount in cents.
    pub amount: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SingleLevelProgressiveBroadcast;

impl LongPollDefinition for SingleLevelProgressiveBroadcast {
    type Request = ProgressiveLevelAmount;
    type Response = AckResponse;

    const COMMAND: LongPoll = LongPoll::SingleLevelProgressiveBroadcast;
    const GROUP: SasGroups = SasGroups::PROGRESSIVES;

    fn decode(
        &self,
        frame: &[u8],
        _: Option<Denomination>,
    ) -> Result<ProgressiveLevelAmount, DecodeError> {
        let body = fixed_body(frame, Self::COMMAND)?;
        let (group, level, amount) =
            parse_body(body, "progressive amount", tuple((byte, byte, bcd(5))))?;
        if !(1..=MAX_PROGRESSIVE_LEVEL).contains(&level) {
            return Err(DecodeError::OutOfRange {
                field: "progressive level",
                value: u64::from(level),
            });
        }
        Ok(ProgressiveLevelAmount {
            group,
            level,
            amount,
        })
    }

    fn encode(&self, address: u8, response: &AckResponse) -> Option<Vec<u8>> {
        Some(response.encode(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::calculate_and_append_crc;

    #[test]
    fn test_decode_level() {
        let frame =
            calculate_and_append_crc(&[0x00, 0x80, 0x01, 0x03, 0x00, 0x00, 0x12, 0x34, 0x56]);
        assert_eq!(
            SingleLevelProgressiveBroadcast.decode(&frame, None),
            Ok(ProgressiveLevelAmount {
                group: 1,
                level: 3,
                amount: 123_456
            })
        );
    }

    #[test]
    fn test_level_out_of_range() {
        for level in [0x00, 0x21] {
            let frame =
                calculate_and_append_crc(&[0x00, 0x80, 0x01, level, 0x00, 0x00, 0x00, 0x00, 0x01]);
            assert!(matches!(
                SingleLevelProgressiveBroadcast.decode(&frame, None),
                Err(DecodeError::OutOfRange { .. })
            ));
        }
    }
}
