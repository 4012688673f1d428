//! SAS Protocol Constants
//!
//! This module defines constants used in the SAS protocol implementation,
//! based on the SAS 6.03 standard.

// ----------------------------------------------------------------------------
// Addressing
// ----------------------------------------------------------------------------

/// Global broadcast address
pub const SAS_ADDRESS_GLOBAL: u8 = 0x00;

/// Poll bit; OR'd with an address it forms a general poll
pub const SAS_GENERAL_POLL_BIT: u8 = 0x80;

/// Low seven bits of an address byte carry the SAS address
pub const SAS_ADDRESS_MASK: u8 = 0x7F;

/// Highest configurable SAS address
pub const SAS_ADDRESS_MAX: u8 = 0x7F;

/// NACK bit set on the address byte of a negative acknowledgement
pub const SAS_NACK_BIT: u8 = 0x80;

/// Status byte following the address in a BUSY response
pub const SAS_BUSY_STATUS: u8 = 0x00;

// ----------------------------------------------------------------------------
// Frame layout
// ----------------------------------------------------------------------------

/// Registered length of a "type R" long poll: address + command, no CRC
pub const SAS_TYPE_R_LENGTH: usize = 2;

/// Address + command + length byte + 2 CRC bytes; base for variable-length polls
pub const SAS_VARIABLE_BASE_LENGTH: usize = 5;

/// Number of CRC bytes trailing a long poll
pub const SAS_CRC_LENGTH: usize = 2;

/// Shortest frame that can carry a CRC (address, command, CRC lo, CRC hi)
pub const SAS_MIN_CRC_FRAME_LENGTH: usize = 4;

/// Responses up to this many bytes (ACK, NACK, BUSY, single exception) carry no CRC
pub const SAS_BARE_RESPONSE_MAX_LENGTH: usize = 2;

/// CRC polynomial constant used by the nibble-at-a-time SAS CRC
pub const SAS_CRC_POLY: u16 = 0x1081;

// ----------------------------------------------------------------------------
// Timing (milliseconds)
// ----------------------------------------------------------------------------

/// Window after which the gaming machine chirps when no poll is seen
pub const SAS_CHIRP_INTERVAL_MS: u64 = 200;

/// Jitter tolerance subtracted from the chirp window when hunting for a frame start
pub const SAS_FRAME_START_JITTER_MS: u64 = 20;

/// Link is declared down after this long without a poll
pub const SAS_LINK_DOWN_TIMEOUT_MS: u64 = 5_000;

/// Implied acknowledgement must arrive within this window
pub const SAS_IMPLIED_ACK_TIMEOUT_MS: u64 = 30_000;

/// Maximum gap between two bytes of one long poll
pub const SAS_INTER_BYTE_DELAY_MS: u64 = 5;

/// A new wakeup byte may restart a frame at most this many times
pub const SAS_MAX_FRAME_RESTARTS: u8 = 3;

// ----------------------------------------------------------------------------
// Implied acknowledgement
// ----------------------------------------------------------------------------

/// Consecutive repeats of an ordinary long poll before an implied NACK
pub const SAS_IMPLIED_NACK_THRESHOLD: u8 = 2;

/// Consecutive repeats of an EFT long poll before an implied NACK
pub const SAS_EFT_IMPLIED_NACK_THRESHOLD: u8 = 8;

/// Bytes compared against the previous message for an ordinary long poll
pub const SAS_COMPARE_LENGTH: usize = 2;

/// Bytes compared for the multi-denomination preamble (address, B0, length, denom, command)
pub const SAS_MULTI_DENOM_COMPARE_LENGTH: usize = 5;

/// Offset of the ACK flag inside an EFT long poll
pub const SAS_EFT_ACK_FLAG_OFFSET: usize = 2;

// ----------------------------------------------------------------------------
// Exceptions
// ----------------------------------------------------------------------------

/// General poll response when nothing is pending
pub const SAS_EXCEPTION_NO_ACTIVITY: u8 = 0x00;

/// CMOS RAM error (no data recovered from EEPROM); terminal condition
pub const SAS_EXCEPTION_CMOS_NO_DATA_RECOVERED: u8 = 0x32;

/// Command byte introducing a real-time event report
pub const SAS_REAL_TIME_EVENT_COMMAND: u8 = 0xFF;

// ----------------------------------------------------------------------------
// Multi-denomination preamble
// ----------------------------------------------------------------------------

/// Command code of the multi-denomination preamble
pub const SAS_MULTI_DENOM_PREAMBLE: u8 = 0xB0;

/// Multi-denom error: the wrapped long poll is not multi-denom aware
pub const SAS_MULTI_DENOM_ERROR_NOT_AWARE: u8 = 0x01;

/// Multi-denom error: the denomination code is not a valid player denomination
pub const SAS_MULTI_DENOM_ERROR_INVALID_DENOM: u8 = 0x02;

/// Multi-denom error: the wrapped long poll is not supported at all
pub const SAS_MULTI_DENOM_ERROR_NOT_SUPPORTED: u8 = 0x03;

// ----------------------------------------------------------------------------
// Money
// ----------------------------------------------------------------------------

/// Cents per dollar, used when scaling bill denominations
pub const SAS_CENTS_PER_DOLLAR: u64 = 100;
