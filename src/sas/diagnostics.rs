//! # Client Diagnostics
//!
//! Per-client counters. Recoverable bus problems (read failures, CRC errors,
//! inter-byte violations, unsupported commands) only ever show up here.

use serde::{Deserialize, Serialize};

/// Events counted by the client loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticEvent {
    GeneralPoll,
    LongPoll,
    SyncPoll,
    Broadcast,
    MalformedBroadcast,
    CrcError,
    UnsupportedCommand,
    ImpliedAck,
    ImpliedNack,
    Retry,
    ReadFailure,
    InterByteViolation,
    Chirp,
    LinkDown,
}

/// Counter snapshot for one client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDiagnostics {
    pub general_polls: u64,
    pub long_polls: u64,
    pub sync_polls: u64,
    pub broadcasts: u64,
    /// Broadcasts with a valid CRC that the parser refused.
    pub malformed_broadcasts: u64,
    pub crc_errors: u64,
    pub unsupported_commands: u64,
    pub implied_acks: u64,
    pub implied_nacks: u64,
    pub retries: u64,
    pub read_failures: u64,
    pub inter_byte_violations: u64,
    pub chirps: u64,
    pub link_downs: u64,
}

impl ClientDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: DiagnosticEvent) {
        let counter = match event {
            DiagnosticEvent::GeneralPoll => &mut self.general_polls,
            DiagnosticEvent::LongPoll => &mut self.long_polls,
            DiagnosticEvent::SyncPoll => &mut self.sync_polls,
            DiagnosticEvent::Broadcast => &mut self.broadcasts,
            DiagnosticEvent::MalformedBroadcast => &mut self.malformed_broadcasts,
            DiagnosticEvent::CrcError => &mut self.crc_errors,
            DiagnosticEvent::UnsupportedCommand => &mut self.unsupported_commands,
            DiagnosticEvent::ImpliedAck => &mut self.implied_acks,
            DiagnosticEvent::ImpliedNack => &mut self.implied_nacks,
            DiagnosticEvent::Retry => &mut self.retries,
            DiagnosticEvent::ReadFailure => &mut self.read_failures,
            DiagnosticEvent::InterByteViolation => &mut self.inter_byte_violations,
            DiagnosticEvent::Chirp => &mut self.chirps,
            DiagnosticEvent::LinkDown => &mut self.link_downs,
        };
        *counter = counter.saturating_add(1);
    }

    /// Export as JSON for monitoring.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_export() {
        let mut diag = ClientDiagnostics::new();
        diag.record(DiagnosticEvent::CrcError);
        diag.record(DiagnosticEvent::CrcError);
        diag.record(DiagnosticEvent::Chirp);
        assert_eq!(diag.crc_errors, 2);
        assert_eq!(diag.chirps, 1);

        let json = diag.to_json().unwrap();
        let back: ClientDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, diag);

        diag.reset();
        assert_eq!(diag, ClientDiagnostics::default());
    }
}
