//! 0x8A: initiate a legacy bonus pay.

use nom::number::complete::u8 as byte;
use nom::sequence::tuple;

use super::{bcd, fixed_body, parse_body, AckResponse, DecodeError, LongPollDefinition};
use crate::codec::Denomination;
use crate::config::{SasClientConfig, SasGroups};
use crate::sas::registry::LongPoll;

/// How the bonus is reported for tax purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxStatus {
    Deductible,
    NonDeductible,
    WagerMatch,
}

impl TaxStatus {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(TaxStatus::Deductible),
            0x01 => Some(TaxStatus::NonDeductible),
            0x02 => Some(TaxStatus::WagerMatch),
            _ => None,
        }
    }
}

/// Decoded 0x8A request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyBonus {
    /// Bonus amount in credits of `accounting_denom`.
    pub credits: u64,
    pub tax_status: TaxStatus,
    pub accounting_denom: Denomination,
}

impl LegacyBonus {
    /// Bonus value in millicents, saturating on overflow.
    pub fn amount_millicents(&self) -> u64 {
        self.credits.saturating_mul(self.accounting_denom.millicents())
    }
}

/// 0x8A definition; credits are counted in the client's accounting denomination.
#[derive(Debug, Clone, Copy)]
pub struct InitiateLegacyBonusPay {
    accounting_denom: Denomination,
}

impl InitiateLegacyBonusPay {
    pub fn new(accounting_denom: Denomination) -> Self {
        InitiateLegacyBonusPay { accounting_denom }
    }

    /// Falls back to one cent when the configured code is unknown; the
    /// client rejects such a configuration before it gets here.
    pub fn from_config(config: &SasClientConfig) -> Self {
        Self::new(
            config
                .accounting_denomination()
                .unwrap_or(Denomination::ONE_CENT),
        )
    }
}

impl Default for InitiateLegacyBonusPay {
    fn default() -> Self {
        Self::new(Denomination::ONE_CENT)
    }
}

impl LongPollDefinition for InitiateLegacyBonusPay {
    type Request = LegacyBonus;
    type Response = AckResponse;

    const COMMAND: LongPoll = LongPoll::InitiateLegacyBonusPay;
    const GROUP: SasGroups = SasGroups::LEGACY_BONUS;

    fn decode(&self, frame: &[u8], _: Option<Denomination>) -> Result<LegacyBonus, DecodeError> {
        let body = fixed_body(frame, Self::COMMAND)?;
        let (credits, tax) = parse_body(body, "bonus amount", tuple((bcd(4), byte)))?;
        let tax_status = TaxStatus::from_code(tax).ok_or(DecodeError::OutOfRange {
            field: "tax status",
            value: u64::from(tax),
        })?;
        Ok(LegacyBonus {
            credits,
            tax_status,
            accounting_denom: self.accounting_denom,
        })
    }

    fn encode(&self, address: u8, response: &AckResponse) -> Option<Vec<u8>> {
        Some(response.encode(address))
    }
}
