//! Scriptable in-memory transport for tests.
//!
//! Inbound bytes are queued with their wakeup bit (and optionally a delay
//! to simulate a slow host); everything the engine writes is captured.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::codec::crc::calculate_and_append_crc;
use crate::error::SasError;
use crate::sas::transport::{SasTransport, WireByte};

#[derive(Debug, Clone, Copy)]
enum Scripted {
    Byte(WireByte, Duration),
    Failure,
}

#[derive(Debug, Default)]
struct MockState {
    rx: VecDeque<Scripted>,
    tx: Vec<Vec<u8>>,
    chirps: Vec<u8>,
    fail_sends: bool,
}

/// Mock transport; clones share the same buffers.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a host message: first byte with the wakeup bit, the rest without.
    pub fn queue_message(&self, bytes: &[u8]) {
        let mut state = self.lock();
        for (i, &b) in bytes.iter().enumerate() {
            let byte = if i == 0 {
                WireByte::wakeup(b)
            } else {
                WireByte::data(b)
            };
            state.rx.push_back(Scripted::Byte(byte, Duration::ZERO));
        }
    }

    /// Queue a long poll with its CRC appended.
    pub fn queue_long_poll(&self, bytes: &[u8]) {
        self.queue_message(&calculate_and_append_crc(bytes));
    }

    /// Queue one byte, delivered after `delay`.
    pub fn queue_byte(&self, byte: WireByte, delay: Duration) {
        self.lock().rx.push_back(Scripted::Byte(byte, delay));
    }

    /// Queue a failed read.
    pub fn queue_read_failure(&self) {
        self.lock().rx.push_back(Scripted::Failure);
    }

    /// Make every subsequent send fail.
    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    pub fn pending_rx(&self) -> usize {
        self.lock().rx.len()
    }

    /// Messages written so far, one entry per send.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.lock().tx.clone()
    }

    /// Drains the captured messages.
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.lock().tx)
    }

    pub fn chirps(&self) -> Vec<u8> {
        self.lock().chirps.clone()
    }
}

#[async_trait]
impl SasTransport for MockTransport {
    async fn open(&mut self, _port: &str) -> Result<(), SasError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SasError> {
        Ok(())
    }

    async fn send_raw_bytes(&mut self, bytes: &[u8]) -> Result<(), SasError> {
        let mut state = self.lock();
        if state.fail_sends {
            return Err(SasError::SerialPortError("mock send failure".into()));
        }
        state.tx.push(bytes.to_vec());
        Ok(())
    }

    async fn read_one_byte(&mut self, _is_long_poll: bool) -> Option<WireByte> {
        let next = self.lock().rx.pop_front();
        match next {
            Some(Scripted::Byte(byte, delay)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Some(byte)
            }
            Some(Scripted::Failure) | None => None,
        }
    }

    async fn send_chirp(&mut self, address: u8) -> Result<(), SasError> {
        self.lock().chirps.push(address);
        Ok(())
    }
}
