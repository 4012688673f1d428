//! SAS denomination codes.
//!
//! A single byte selects a denomination from a fixed table. Values are kept
//! in millicents (1/1000 of a cent) so the sub-cent denominations stay exact.

use serde::{Deserialize, Serialize};

/// `(code, value in millicents)` for every denomination code SAS defines.
const DENOMINATIONS: &[(u8, u64)] = &[
    (0x01, 1_000),          // $0.01
    (0x02, 5_000),          // $0.05
    (0x03, 10_000),         // $0.10
    (0x04, 25_000),         // $0.25
    (0x05, 50_000),         // $0.50
    (0x06, 100_000),        // $1.00
    (0x07, 500_000),        // $5.00
    (0x08, 1_000_000),      // $10.00
    (0x09, 2_000_000),      // $20.00
    (0x0A, 10_000_000),     // $100.00
    (0x0B, 20_000),         // $0.20
    (0x0C, 200_000),        // $2.00
    (0x0D, 250_000),        // $2.50
    (0x0E, 2_500_000),      // $25.00
    (0x0F, 5_000_000),      // $50.00
    (0x10, 20_000_000),     // $200.00
    (0x11, 25_000_000),     // $250.00
    (0x12, 50_000_000),     // $500.00
    (0x13, 100_000_000),    // $1,000.00
    (0x14, 200_000_000),    // $2,000.00
    (0x15, 250_000_000),    // $2,500.00
    (0x16, 500_000_000),    // $5,000.00
    (0x17, 2_000),          // $0.02
    (0x18, 3_000),          // $0.03
    (0x19, 15_000),         // $0.15
    (0x1A, 40_000),         // $0.40
    (0x1B, 500),            // $0.005
    (0x1C, 250),            // $0.0025
    (0x1D, 200),            // $0.002
    (0x1E, 100),            // $0.001
    (0x1F, 50),             // $0.0005
];

/// A validated SAS denomination code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Denomination {
    code: u8,
    millicents: u64,
}

impl Denomination {
    /// $0.01, code 0x01.
    pub const ONE_CENT: Denomination = Denomination {
        code: 0x01,
        millicents: 1_000,
    };

    /// Looks up a denomination code; `None` for codes SAS does not define.
    pub fn from_code(code: u8) -> Option<Self> {
        DENOMINATIONS
            .iter()
            .find(|(c, _)| *c == code)
            .map(|&(code, millicents)| Denomination { code, millicents })
    }

    /// Finds the code whose value is exactly `cents`.
    pub fn from_cents(cents: u64) -> Option<Self> {
        let millicents = cents.checked_mul(1_000)?;
        DENOMINATIONS
            .iter()
            .find(|(_, m)| *m == millicents)
            .map(|&(code, millicents)| Denomination { code, millicents })
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    pub fn millicents(&self) -> u64 {
        self.millicents
    }

    /// Value in whole cents, or `None` for sub-cent denominations.
    pub fn cents(&self) -> Option<u64> {
        (self.millicents % 1_000 == 0).then_some(self.millicents / 1_000)
    }
}
