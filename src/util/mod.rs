//! # Utility Modules
//!
//! Hex formatting for frame dumps and the rate-limited logging used on the
//! noisy serial bus.

pub mod hex;
pub mod logging;

pub use hex::{decode_hex, encode_hex, format_hex_compact};
pub use logging::{log_frame_hex, LogThrottle};
