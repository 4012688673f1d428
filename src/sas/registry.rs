//! # Long-Poll Registry
//!
//! Static metadata for every long poll the engine knows how to frame:
//! registered length, variable-length flag and whether the command may be
//! sent to the global broadcast address.
//!
//! Lengths count the whole frame as it arrives on the wire, address and CRC
//! included. A length of 2 marks a "type R" poll (address and command only,
//! no CRC). Variable-length polls register the base length (address,
//! command, length byte, CRC) and the length byte is added to it.
//! Commands absent from the table have length 0 and are unsupported.

use once_cell::sync::Lazy;

use crate::constants::SAS_TYPE_R_LENGTH;

/// Frame metadata for one command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongPollInfo {
    pub command: u8,
    /// Registered frame length in bytes; 0 means unsupported.
    pub length: u8,
    pub variable_length: bool,
    pub broadcast_allowed: bool,
}

impl LongPollInfo {
    const fn unsupported(command: u8) -> Self {
        LongPollInfo {
            command,
            length: 0,
            variable_length: false,
            broadcast_allowed: false,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.length != 0
    }

    /// Type R polls end after the command byte and carry no CRC.
    pub fn is_type_r(&self) -> bool {
        !self.variable_length && usize::from(self.length) == SAS_TYPE_R_LENGTH
    }

    /// Total frame length, given the length byte for variable-length polls.
    pub fn total_length(&self, stated_length: u8) -> usize {
        if self.variable_length {
            usize::from(self.length) + usize::from(stated_length)
        } else {
            usize::from(self.length)
        }
    }
}

macro_rules! long_polls {
    ($( $(#[$doc:meta])* $name:ident = $code:literal, $len:literal, $var:literal, $bcast:literal; )*) => {
        /// Long poll command codes known to the registry.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum LongPoll {
            $( $(#[$doc])* $name = $code, )*
        }

        impl LongPoll {
            pub fn from_u8(code: u8) -> Option<Self> {
                match code {
                    $( $code => Some(LongPoll::$name), )*
                    _ => None,
                }
            }
        }

        const LONG_POLL_TABLE: &[LongPollInfo] = &[
            $( LongPollInfo {
                command: $code,
                length: $len,
                variable_length: $var,
                broadcast_allowed: $bcast,
            }, )*
        ];
    };
}

long_polls! {
    Shutdown = 0x01, 4, false, true;
    Startup = 0x02, 4, false, true;
    SoundOff = 0x03, 4, false, true;
    SoundOn = 0x04, 4, false, true;
    ReelSpinSoundsDisabled = 0x05, 4, false, true;
    EnableBillAcceptor = 0x06, 4, false, true;
    DisableBillAcceptor = 0x07, 4, false, true;
    ConfigureBillDenominations = 0x08, 9, false, true;
    EnableDisableGameN = 0x09, 7, false, false;
    EnterMaintenanceMode = 0x0A, 4, false, false;
    ExitMaintenanceMode = 0x0B, 4, false, false;
    EnableDisableRealTimeEventReporting = 0x0E, 5, false, false;
    SendMeters10Through15 = 0x0F, 2, false, false;
    TotalCanceledCredits = 0x10, 2, false, false;
    TotalCoinIn = 0x11, 2, false, false;
    TotalCoinOut = 0x12, 2, false, false;
    TotalDrop = 0x13, 2, false, false;
    TotalJackpot = 0x14, 2, false, false;
    GamesPlayed = 0x15, 2, false, false;
    GamesWon = 0x16, 2, false, false;
    GamesLost = 0x17, 2, false, false;
    GamesSincePowerUp = 0x18, 2, false, false;
    SendMeters11Through15 = 0x19, 2, false, false;
    CurrentCredits = 0x1A, 2, false, false;
    HandpayInformation = 0x1B, 2, false, false;
    SendMeters = 0x1C, 2, false, false;
    CumulativeMeters = 0x1D, 2, false, false;
    BillMeters = 0x1E, 2, false, false;
    GamingMachineIdAndInformation = 0x1F, 2, false, false;
    TotalBillsInDollars = 0x20, 2, false, false;
    RomSignatureVerification = 0x21, 6, false, false;
    DelayGame = 0x2E, 6, false, false;
    SelectedMetersForGameN = 0x2F, 5, true, false;
    LastAcceptedBillInformation = 0x48, 2, false, false;
    SetSecureEnhancedValidationId = 0x4C, 10, false, false;
    EnhancedValidationInformation = 0x4D, 5, false, false;
    ValidationMeters = 0x50, 5, false, false;
    TotalNumberOfGamesImplemented = 0x51, 2, false, false;
    GameNConfiguration = 0x53, 6, false, false;
    SasVersionAndSerialNumber = 0x54, 2, false, false;
    SelectedGameNumber = 0x55, 2, false, false;
    EnabledGameNumbers = 0x56, 2, false, false;
    EftTransferPromoCreditsToHost = 0x63, 6, false, false;
    EftTransferCashableCreditsToHost = 0x64, 6, false, false;
    EftTransferNonrestrictedCreditsToHost = 0x65, 6, false, false;
    EftTransferToGamingMachine = 0x69, 10, false, false;
    EftTransferPromoCreditsToGamingMachine = 0x6A, 10, false, false;
    TicketValidationData = 0x70, 2, false, false;
    RedeemTicket = 0x71, 5, true, false;
    AftTransferFunds = 0x72, 5, true, false;
    AftRegisterGamingMachine = 0x73, 5, true, false;
    AftGameLockAndStatus = 0x74, 8, false, false;
    ExtendedValidationStatus = 0x7B, 5, true, false;
    SetExtendedTicketData = 0x7C, 5, true, false;
    SetTicketData = 0x7D, 5, true, false;
    CurrentDateAndTime = 0x7E, 2, false, false;
    ReceiveDateAndTime = 0x7F, 11, false, true;
    SingleLevelProgressiveBroadcast = 0x80, 11, false, true;
    CumulativeProgressiveWins = 0x83, 6, false, false;
    ProgressiveWinAmount = 0x84, 2, false, false;
    SasProgressiveWinAmount = 0x85, 2, false, false;
    MultipleLevelProgressiveBroadcast = 0x86, 5, true, true;
    MultipleSasProgressiveWinAmounts = 0x87, 2, false, false;
    InitiateLegacyBonusPay = 0x8A, 9, false, false;
    RemoteHandpayReset = 0x94, 4, false, false;
    EnabledFeatures = 0xA0, 6, false, false;
    EnableJackpotHandpayResetMethod = 0xA8, 5, false, false;
    MultiDenominationPreamble = 0xB0, 5, true, false;
    CurrentPlayerDenomination = 0xB1, 2, false, false;
    EnabledPlayerDenominations = 0xB2, 2, false, false;
    TokenDenomination = 0xB3, 2, false, false;
}

impl LongPoll {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn info(self) -> LongPollInfo {
        lookup(self.code())
    }

    /// EFT polls use the two-phase ACK flag handshake.
    pub fn is_eft_two_phase(self) -> bool {
        is_eft_two_phase(self.code())
    }
}

/// Registry indexed by command byte; built once.
static REGISTRY: Lazy<[LongPollInfo; 256]> = Lazy::new(|| {
    let mut table = [LongPollInfo::unsupported(0); 256];
    for (code, slot) in table.iter_mut().enumerate() {
        *slot = LongPollInfo::unsupported(code as u8);
    }
    for entry in LONG_POLL_TABLE {
        table[usize::from(entry.command)] = *entry;
    }
    table
});

/// Metadata for `command`; unsupported commands report length 0.
pub fn lookup(command: u8) -> LongPollInfo {
    REGISTRY[usize::from(command)]
}

/// Commands that follow the EFT two-phase ACK flag handshake.
pub fn is_eft_two_phase(command: u8) -> bool {
    matches!(command, 0x63 | 0x64 | 0x65 | 0x69 | 0x6A)
}
