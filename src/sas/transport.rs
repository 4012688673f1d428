//! # Transport Contract
//!
//! The physical serial link is an external collaborator. The engine only
//! needs to read one byte at a time (with its wakeup bit), write response
//! bytes and emit a chirp. [`SerialTransport`](crate::sas::serial::SerialTransport)
//! implements this over a real port; [`MockTransport`](crate::sas::mock::MockTransport)
//! scripts it for tests.

use async_trait::async_trait;

use crate::error::SasError;

/// One byte as received from the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireByte {
    pub value: u8,
    /// Ninth (wakeup) bit; set on the first byte of every host message.
    pub wakeup: bool,
}

impl WireByte {
    pub fn wakeup(value: u8) -> Self {
        WireByte {
            value,
            wakeup: true,
        }
    }

    pub fn data(value: u8) -> Self {
        WireByte {
            value,
            wakeup: false,
        }
    }
}

/// Byte-level access to the SAS line.
#[async_trait]
pub trait SasTransport: Send {
    async fn open(&mut self, port: &str) -> Result<(), SasError>;

    async fn close(&mut self) -> Result<(), SasError>;

    /// Writes `bytes` as one response (no wakeup bit).
    async fn send_raw_bytes(&mut self, bytes: &[u8]) -> Result<(), SasError>;

    /// Reads a single byte. `None` means the read failed or timed out.
    ///
    /// `is_long_poll` tells the transport a frame is in progress so it can
    /// use the short inter-byte timeout instead of the frame-start timeout.
    async fn read_one_byte(&mut self, is_long_poll: bool) -> Option<WireByte>;

    /// Emits the keep-alive chirp: our address with the wakeup bit set.
    async fn send_chirp(&mut self, address: u8) -> Result<(), SasError>;
}
