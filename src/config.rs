//! # SAS Client Configuration
//!
//! The engine treats configuration as an opaque struct handed to
//! [`SasClient`](crate::sas::client::SasClient) at construction. It can be
//! built in code or loaded from JSON.

use std::path::Path;
use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::codec::Denomination;
use crate::constants::{
    SAS_ADDRESS_MAX, SAS_CHIRP_INTERVAL_MS, SAS_FRAME_START_JITTER_MS, SAS_IMPLIED_ACK_TIMEOUT_MS,
    SAS_INTER_BYTE_DELAY_MS, SAS_LINK_DOWN_TIMEOUT_MS, SAS_MAX_FRAME_RESTARTS,
};
use crate::error::SasError;

bitflags! {
    /// Protocol groups a client instance answers for.
    ///
    /// Parsers declare the group they belong to; the parser factory loads
    /// only the parsers whose group intersects the configured set.
    /// `PER_CLIENT` parsers are loaded regardless.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SasGroups: u16 {
        const GENERAL_CONTROL = 0x0001;
        const VALIDATION      = 0x0002;
        const AFT             = 0x0004;
        const LEGACY_BONUS    = 0x0008;
        const PROGRESSIVES    = 0x0010;
        const EFT             = 0x0020;
        const PER_CLIENT      = 0x0040;
    }
}

/// What the frame reader does when two bytes of one long poll are too far apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterByteDelayMode {
    /// Drop the frame in progress.
    Enforce,
    /// Log the violation and keep reading (bench testing with slow hosts).
    LogOnly,
}

/// Configuration for one SAS client (one host connection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SasClientConfig {
    /// Identifies the client in platform callbacks (0 = primary host, 1 = secondary, ...).
    pub client_id: u8,
    /// SAS address 1..=127.
    pub address: u8,
    /// Accounting denomination code (see [`Denomination`](crate::codec::Denomination)).
    pub accounting_denom: u8,
    /// Groups of long polls this client answers.
    pub groups: SasGroups,
    pub chirp_interval_ms: u64,
    pub frame_start_jitter_ms: u64,
    pub link_down_timeout_ms: u64,
    pub implied_ack_timeout_ms: u64,
    pub inter_byte_delay_ms: u64,
    pub inter_byte_delay_mode: InterByteDelayMode,
    pub max_frame_restarts: u8,
    /// Ask the platform to disable play while the link is down.
    pub disable_play_on_link_down: bool,
    /// Real-time event reporting state at startup.
    pub real_time_reporting: bool,
}

impl Default for SasClientConfig {
    fn default() -> Self {
        SasClientConfig {
            client_id: 0,
            address: 1,
            accounting_denom: 0x01,
            groups: SasGroups::all(),
            chirp_interval_ms: SAS_CHIRP_INTERVAL_MS,
            frame_start_jitter_ms: SAS_FRAME_START_JITTER_MS,
            link_down_timeout_ms: SAS_LINK_DOWN_TIMEOUT_MS,
            implied_ack_timeout_ms: SAS_IMPLIED_ACK_TIMEOUT_MS,
            inter_byte_delay_ms: SAS_INTER_BYTE_DELAY_MS,
            inter_byte_delay_mode: InterByteDelayMode::Enforce,
            max_frame_restarts: SAS_MAX_FRAME_RESTARTS,
            disable_play_on_link_down: true,
            real_time_reporting: false,
        }
    }
}

impl SasClientConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, SasError> {
        let config: SasClientConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SasError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Checks invariants the engine relies on.
    pub fn validate(&self) -> Result<(), SasError> {
        if self.address == 0 || self.address > SAS_ADDRESS_MAX {
            return Err(SasError::InvalidConfig(format!(
                "SAS address {} outside 1..={}",
                self.address, SAS_ADDRESS_MAX
            )));
        }
        self.accounting_denomination()?;
        if self.groups.is_empty() {
            return Err(SasError::InvalidConfig("no protocol groups configured".into()));
        }
        if self.chirp_interval_ms == 0 || self.link_down_timeout_ms < self.chirp_interval_ms {
            return Err(SasError::InvalidConfig(
                "link-down timeout must be at least the chirp interval".into(),
            ));
        }
        Ok(())
    }

    /// The accounting denomination, or an error for a code SAS does not define.
    pub fn accounting_denomination(&self) -> Result<Denomination, SasError> {
        Denomination::from_code(self.accounting_denom).ok_or_else(|| {
            SasError::InvalidConfig(format!(
                "unknown accounting denomination code 0x{:02X}",
                self.accounting_denom
            ))
        })
    }

    pub fn chirp_interval(&self) -> Duration {
        Duration::from_millis(self.chirp_interval_ms)
    }

    /// Budget for hunting a frame start: the chirp window minus jitter tolerance.
    pub fn frame_start_budget(&self) -> Duration {
        Duration::from_millis(
            self.chirp_interval_ms
                .saturating_sub(self.frame_start_jitter_ms)
                .max(1),
        )
    }

    pub fn link_down_timeout(&self) -> Duration {
        Duration::from_millis(self.link_down_timeout_ms)
    }

    pub fn implied_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.implied_ack_timeout_ms)
    }

    pub fn inter_byte_delay(&self) -> Duration {
        Duration::from_millis(self.inter_byte_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SasClientConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_address() {
        let config = SasClientConfig {
            address: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SasError::InvalidConfig(_))));

        let config = SasClientConfig {
            address: 0x80,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SasClientConfig::from_json_str(r#"{"address": 7, "client_id": 1}"#).unwrap();
        assert_eq!(config.address, 7);
        assert_eq!(config.client_id, 1);
        assert_eq!(config.link_down_timeout_ms, SAS_LINK_DOWN_TIMEOUT_MS);
        assert_eq!(config.inter_byte_delay_mode, InterByteDelayMode::Enforce);
    }

    #[test]
    fn test_frame_start_budget() {
        let config = SasClientConfig::default();
        assert_eq!(config.frame_start_budget(), Duration::from_millis(180));
    }
}
