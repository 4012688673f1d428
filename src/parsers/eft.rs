//! 0x69: EFT transfer to gaming machine.
//!
//! EFT runs a two-phase handshake: the host sends the transfer with ACK flag
//! 0, the machine answers with its status, then the host repeats the poll
//! with ACK flag 1 to commit. The implied-ack machine treats the flipped
//! flag as the second phase rather than a retry.

use bytes::{BufMut, BytesMut};
use nom::number::complete::u8 as byte;
use nom::sequence::tuple;

use super::{bcd, fixed_body, parse_body, DecodeError, LongPollDefinition};
use crate::codec::{to_bcd, Denomination};
use crate::config::SasGroups;
use crate::sas::registry::LongPoll;

const EFT_AMOUNT_LENGTH: usize = 4;

/// Decoded 0x69 request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EftTransferRequest {
    /// Second phase of the handshake.
    pub ack: bool,
    pub transaction_number: u8,
    /// Amount in cents.
    pub amount: u64,
}

/// EFT transfer status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EftStatus {
    Success = 0x00,
    InvalidAck = 0x01,
    MachineInMaintenance = 0x02,
    InvalidTransactionNumber = 0x03,
    DuplicateTransfer = 0x04,
    TransferLimitExceeded = 0x05,
    MachineDisabled = 0x06,
    NotAvailable = 0x09,
}

/// Answer to 0x69.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EftTransferResponse {
    pub ack: bool,
    pub transaction_number: u8,
    pub status: EftStatus,
    /// Amount actually transferred, in cents.
    pub amount: u64,
}

impl EftTransferResponse {
    /// Echoes the request with a status and transferred amount.
    pub fn for_request(request: &EftTransferRequest, status: EftStatus, amount: u64) -> Self {
        EftTransferResponse {
            ack: request.ack,
            transaction_number: request.transaction_number,
            status,
            amount,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EftTransferToGamingMachine;

impl LongPollDefinition for EftTransferToGamingMachine {
    type Request = EftTransferRequest;
    type Response = Option<EftTransferResponse>;

    const COMMAND: LongPoll = LongPoll::EftTransferToGamingMachine;
    const GROUP: SasGroups = SasGroups::EFT;

    fn decode(
        &self,
        frame: &[u8],
        _: Option<Denomination>,
    ) -> Result<EftTransferRequest, DecodeError> {
        let body = fixed_body(frame, Self::COMMAND)?;
        let (ack, transaction_number, amount) =
            parse_body(body, "EFT transfer", tuple((byte, byte, bcd(EFT_AMOUNT_LENGTH))))?;
        if ack > 1 {
            return Err(DecodeError::OutOfRange {
                field: "EFT ACK flag",
                value: u64::from(ack),
            });
        }
        Ok(EftTransferRequest {
            ack: ack == 1,
            transaction_number,
            amount,
        })
    }

    fn encode(&self, address: u8, response: &Option<EftTransferResponse>) -> Option<Vec<u8>> {
        let response = response.as_ref()?;
        let mut out = BytesMut::with_capacity(5 + EFT_AMOUNT_LENGTH);
        out.put_u8(address);
        out.put_u8(Self::COMMAND.code());
        out.put_u8(u8::from(response.ack));
        out.put_u8(response.transaction_number);
        out.put_u8(response.status as u8);
        out.extend_from_slice(&to_bcd(response.amount, EFT_AMOUNT_LENGTH));
        Some(out.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::calculate_and_append_crc;

    #[test]
    fn test_decode_both_phases() {
        let first = calculate_and_append_crc(&[0x01, 0x69, 0x00, 0x07, 0x00, 0x00, 0x10, 0x00]);
        let request = EftTransferToGamingMachine.decode(&first, None).unwrap();
        assert_eq!(
            request,
            EftTransferRequest {
                ack: false,
                transaction_number: 7,
                amount: 1_000
            }
        );

        let second = calculate_and_append_crc(&[0x01, 0x69, 0x01, 0x07, 0x00, 0x00, 0x10, 0x00]);
        assert!(EftTransferToGamingMachine.decode(&second, None).unwrap().ack);
    }

    #[test]
    fn test_rejects_bad_amount_and_flag() {
        let bad_bcd = calculate_and_append_crc(&[0x01, 0x69, 0x00, 0x07, 0x00, 0x00, 0x1A, 0x00]);
        assert_eq!(
            EftTransferToGamingMachine.decode(&bad_bcd, None),
            Err(DecodeError::Malformed("EFT transfer"))
        );
        let bad_flag = calculate_and_append_crc(&[0x01, 0x69, 0x02, 0x07, 0x00, 0x00, 0x10, 0x00]);
        assert!(EftTransferToGamingMachine.decode(&bad_flag, None).is_err());
    }

    #[test]
    fn test_encode_response() {
        let request = EftTransferRequest {
            ack: false,
            transaction_number: 7,
            amount: 1_000,
        };
        let response = EftTransferResponse::for_request(&request, EftStatus::Success, 1_000);
        assert_eq!(
            EftTransferToGamingMachine.encode(1, &Some(response)),
            Some(vec![0x01, 0x69, 0x00, 0x07, 0x00, 0x00, 0x00, 0x10, 0x00])
        );
    }
}
