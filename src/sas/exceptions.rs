//! # Exception and Message Queues
//!
//! The exception queue belongs to the platform; the engine only polls it.
//! On a general poll the client first serves a pending delayed message, then
//! peeks the next exception and acknowledges it once the host's implied ACK
//! confirms delivery. [`MemoryExceptionQueue`] is a simple FIFO used by the
//! CLI and the tests.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::constants::{SAS_EXCEPTION_CMOS_NO_DATA_RECOVERED, SAS_EXCEPTION_NO_ACTIVITY};

/// A general poll exception, optionally with real-time event data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SasException {
    pub code: u8,
    /// Extra bytes reported after the code when real-time reporting is on.
    pub data: Vec<u8>,
}

impl SasException {
    pub fn new(code: u8) -> Self {
        SasException {
            code,
            data: Vec::new(),
        }
    }

    pub fn with_data(code: u8, data: Vec<u8>) -> Self {
        SasException { code, data }
    }

    pub fn no_activity() -> Self {
        Self::new(SAS_EXCEPTION_NO_ACTIVITY)
    }

    pub fn is_no_activity(&self) -> bool {
        self.code == SAS_EXCEPTION_NO_ACTIVITY
    }

    /// Storage corruption; the client stops after reporting it.
    pub fn is_fatal(&self) -> bool {
        self.code == SAS_EXCEPTION_CMOS_NO_DATA_RECOVERED
    }
}

/// Queue contract consumed by the client.
pub trait ExceptionQueue: Send {
    /// Next exception to report, without removing it. `None` when empty.
    fn get_next_exception(&self) -> Option<SasException>;

    fn is_empty(&self) -> bool;

    /// Removes the exception last returned by [`get_next_exception`](Self::get_next_exception).
    fn acknowledge_exception(&mut self);

    /// A delayed response message waiting for the next general poll.
    fn get_next_message(&self) -> Option<Vec<u8>>;

    /// Drops the delayed message once it has been delivered.
    fn clear_message(&mut self);
}

/// FIFO exception queue with a single delayed-message slot.
#[derive(Debug, Default)]
pub struct MemoryExceptionQueue {
    exceptions: VecDeque<SasException>,
    message: Option<Vec<u8>>,
}

impl MemoryExceptionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an exception. Duplicates of a queued code are collapsed.
    pub fn push(&mut self, exception: SasException) {
        if exception.is_no_activity() {
            return;
        }
        if self
            .exceptions
            .iter()
            .any(|e| e.code == exception.code && e.data == exception.data)
        {
            return;
        }
        self.exceptions.push_back(exception);
    }

    pub fn set_message(&mut self, message: Vec<u8>) {
        self.message = Some(message);
    }

    pub fn len(&self) -> usize {
        self.exceptions.len()
    }
}

impl ExceptionQueue for MemoryExceptionQueue {
    fn get_next_exception(&self) -> Option<SasException> {
        self.exceptions.front().cloned()
    }

    fn is_empty(&self) -> bool {
        self.exceptions.is_empty()
    }

    fn acknowledge_exception(&mut self) {
        self.exceptions.pop_front();
    }

    fn get_next_message(&self) -> Option<Vec<u8>> {
        self.message.clone()
    }

    fn clear_message(&mut self) {
        self.message = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_then_acknowledge() {
        let mut queue = MemoryExceptionQueue::new();
        queue.push(SasException::new(0x51));
        queue.push(SasException::new(0x52));
        assert_eq!(queue.get_next_exception(), Some(SasException::new(0x51)));
        assert_eq!(queue.get_next_exception(), Some(SasException::new(0x51)));
        queue.acknowledge_exception();
        assert_eq!(queue.get_next_exception(), Some(SasException::new(0x52)));
        queue.acknowledge_exception();
        assert!(queue.is_empty());
        assert_eq!(queue.get_next_exception(), None);
    }

    #[test]
    fn test_duplicates_and_no_activity_are_dropped() {
        let mut queue = MemoryExceptionQueue::new();
        queue.push(SasException::no_activity());
        queue.push(SasException::new(0x11));
        queue.push(SasException::new(0x11));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_delayed_message_slot() {
        let mut queue = MemoryExceptionQueue::new();
        assert!(queue.get_next_message().is_none());
        queue.set_message(vec![0x01, 0x1F, 0x00]);
        assert_eq!(queue.get_next_message(), Some(vec![0x01, 0x1F, 0x00]));
        queue.clear_message();
        assert!(queue.get_next_message().is_none());
        assert!(SasException::new(0x32).is_fatal());
    }
}
