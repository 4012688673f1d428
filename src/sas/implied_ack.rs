//! # Implied Acknowledgement
//!
//! SAS hosts never send explicit ACKs to the gaming machine. Whether a
//! response arrived is inferred from the host's next poll:
//!
//! - a poll to another address, a global broadcast, or a different poll to
//!   this address means the response was received (implied ACK);
//! - the same poll again means it was lost; after the retry budget is
//!   spent the response is declared lost (implied NACK).
//!
//! EFT long polls run a two-phase handshake (ACK flag 0, then 1) and are
//! retried up to nine times, so a repeated EFT poll with a flipped ACK flag
//! is the second phase rather than a retry.
//!
//! All state sits behind one mutex so the owning poll loop and any other
//! thread calling [`ImpliedAck::link_down`] cannot interleave. Callbacks are
//! taken out of the state while the lock is held and invoked after it is
//! released, so each fires at most once.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::constants::{
    SAS_COMPARE_LENGTH, SAS_EFT_ACK_FLAG_OFFSET, SAS_EFT_IMPLIED_NACK_THRESHOLD,
    SAS_IMPLIED_NACK_THRESHOLD, SAS_MULTI_DENOM_COMPARE_LENGTH, SAS_MULTI_DENOM_PREAMBLE,
};
use crate::sas::registry::is_eft_two_phase;

/// Link synchronization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Initial and post-link-down: waiting to see a poll to another address.
    PendingAnotherAddress,
    /// Saw a sync poll; the next poll to us synchronizes the link.
    PendingFirstMessage,
    Synchronized,
}

/// Called once when the pending response is confirmed or declared lost.
pub type AckCallback = Box<dyn FnOnce() + Send>;

/// Called on every sub-threshold EFT retry.
pub type IntermediateNackCallback = Box<dyn FnMut() + Send>;

/// Callbacks attached to a pending response.
#[derive(Default)]
pub struct ImpliedAckHandlers {
    on_ack: Option<AckCallback>,
    on_nack: Option<AckCallback>,
    on_intermediate_nack: Option<IntermediateNackCallback>,
}

impl ImpliedAckHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_ack(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_ack = Some(Box::new(f));
        self
    }

    pub fn on_nack(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_nack = Some(Box::new(f));
        self
    }

    pub fn on_intermediate_nack(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_intermediate_nack = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for ImpliedAckHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImpliedAckHandlers")
            .field("on_ack", &self.on_ack.is_some())
            .field("on_nack", &self.on_nack.is_some())
            .field("on_intermediate_nack", &self.on_intermediate_nack.is_some())
            .finish()
    }
}

/// Result of checking a newly received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpliedAckOutcome {
    /// Link not synchronized; polls to this address are ignored.
    NotSynchronized,
    /// A global or other-address poll; nothing for this device to answer.
    SyncPoll,
    /// Process the frame normally.
    Proceed,
    /// The host repeated the previous message; send the previous response again.
    Retry,
    /// Retry budget exhausted; the response was lost and the frame is not processed.
    ImpliedNack,
}

impl ImpliedAckOutcome {
    /// Whether the caller should answer the frame.
    pub fn proceed(self) -> bool {
        matches!(self, ImpliedAckOutcome::Proceed | ImpliedAckOutcome::Retry)
    }
}

#[derive(Debug)]
struct ImpliedAckState {
    sync: SyncState,
    pending: bool,
    last_message: Vec<u8>,
    compare_length: usize,
    nack_count: u8,
    handlers: ImpliedAckHandlers,
    deadline: Option<Instant>,
}

/// Deferred callback, run after the state lock is released.
enum Fire {
    None,
    Ack(Option<AckCallback>),
    Nack(Option<AckCallback>),
    Intermediate(IntermediateNackCallback),
}

impl Fire {
    fn run(self) -> Option<IntermediateNackCallback> {
        match self {
            Fire::None => None,
            Fire::Ack(cb) | Fire::Nack(cb) => {
                if let Some(cb) = cb {
                    cb();
                }
                None
            }
            Fire::Intermediate(mut cb) => {
                cb();
                Some(cb)
            }
        }
    }
}

/// Implied-acknowledgement state machine for one client.
#[derive(Debug)]
pub struct ImpliedAck {
    inner: Mutex<ImpliedAckState>,
    timeout: Duration,
}

impl ImpliedAck {
    pub fn new(timeout: Duration) -> Self {
        ImpliedAck {
            inner: Mutex::new(ImpliedAckState {
                sync: SyncState::PendingAnotherAddress,
                pending: false,
                last_message: Vec::new(),
                compare_length: SAS_COMPARE_LENGTH,
                nack_count: 0,
                handlers: ImpliedAckHandlers::default(),
                deadline: None,
            }),
            timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ImpliedAckState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn sync_state(&self) -> SyncState {
        self.lock().sync
    }

    pub fn is_pending(&self) -> bool {
        self.lock().pending
    }

    pub fn nack_count(&self) -> u8 {
        self.lock().nack_count
    }

    /// Checks a received frame and reports whether it should be processed.
    pub fn check_implied_ack(
        &self,
        global_broadcast: bool,
        other_address_poll: bool,
        frame: &[u8],
    ) -> bool {
        self.evaluate(global_broadcast, other_address_poll, frame)
            .proceed()
    }

    /// Checks a received frame, firing ACK/NACK callbacks as needed.
    pub fn evaluate(
        &self,
        global_broadcast: bool,
        other_address_poll: bool,
        frame: &[u8],
    ) -> ImpliedAckOutcome {
        let mut state = self.lock();
        let mut fire = Fire::None;
        let mut outcome = None;

        if state.pending && state.sync == SyncState::Synchronized {
            let (f, o) = Self::resolve_pending(&mut state, global_broadcast, frame);
            fire = f;
            outcome = o;
        }

        let outcome = match outcome {
            Some(o) => o,
            None => Self::synchronize(&mut state, global_broadcast || other_address_poll),
        };
        drop(state);

        if let Some(cb) = fire.run() {
            // Intermediate callbacks stay registered until ACK or NACK.
            let mut state = self.lock();
            if state.pending && state.handlers.on_intermediate_nack.is_none() {
                state.handlers.on_intermediate_nack = Some(cb);
            }
        }
        outcome
    }

    /// Pending-ack branch. Returns the callback to fire and, for retries and
    /// NACKs, the final outcome. `None` means the response was acknowledged
    /// and the frame continues through the synchronization rules.
    fn resolve_pending(
        state: &mut ImpliedAckState,
        global_broadcast: bool,
        frame: &[u8],
    ) -> (Fire, Option<ImpliedAckOutcome>) {
        if global_broadcast {
            log::debug!(target: "sas::ack", "implied ACK (global broadcast)");
            return (Self::take_ack(state), None);
        }

        let n = state.compare_length.min(state.last_message.len());
        let repeated = frame.len() >= n && frame[..n] == state.last_message[..n];
        if !repeated {
            log::debug!(target: "sas::ack", "implied ACK (host moved on)");
            return (Self::take_ack(state), None);
        }

        let command = state.last_message.get(1).copied().unwrap_or(0);
        if state.last_message.len() > SAS_EFT_ACK_FLAG_OFFSET && is_eft_two_phase(command) {
            let previous_flag = state.last_message[SAS_EFT_ACK_FLAG_OFFSET];
            if frame.get(SAS_EFT_ACK_FLAG_OFFSET) != Some(&previous_flag) {
                log::debug!(target: "sas::ack", "EFT 0x{command:02X} second phase");
                return (Self::take_ack(state), Some(ImpliedAckOutcome::Proceed));
            }
            return Self::count_retry(state, SAS_EFT_IMPLIED_NACK_THRESHOLD, true);
        }

        Self::count_retry(state, SAS_IMPLIED_NACK_THRESHOLD, false)
    }

    fn count_retry(
        state: &mut ImpliedAckState,
        threshold: u8,
        intermediate: bool,
    ) -> (Fire, Option<ImpliedAckOutcome>) {
        state.nack_count += 1;
        if state.nack_count >= threshold {
            log::debug!(
                target: "sas::ack",
                "implied NACK after {} repeats",
                state.nack_count
            );
            return (Self::take_nack(state), Some(ImpliedAckOutcome::ImpliedNack));
        }

        log::debug!(target: "sas::ack", "retry {} of {}", state.nack_count, threshold);
        let fire = match (intermediate, state.handlers.on_intermediate_nack.take()) {
            (true, Some(cb)) => Fire::Intermediate(cb),
            (_, cb) => {
                state.handlers.on_intermediate_nack = cb;
                Fire::None
            }
        };
        (fire, Some(ImpliedAckOutcome::Retry))
    }

    /// Synchronization rules for frames with no response outstanding.
    fn synchronize(state: &mut ImpliedAckState, sync_poll: bool) -> ImpliedAckOutcome {
        if sync_poll {
            state.nack_count = 0;
            state.sync = SyncState::PendingFirstMessage;
            return ImpliedAckOutcome::SyncPoll;
        }
        match state.sync {
            SyncState::PendingFirstMessage => {
                state.deadline = None;
                state.sync = SyncState::Synchronized;
                log::debug!(target: "sas::ack", "link synchronized");
                ImpliedAckOutcome::Proceed
            }
            SyncState::Synchronized => ImpliedAckOutcome::Proceed,
            SyncState::PendingAnotherAddress => ImpliedAckOutcome::NotSynchronized,
        }
    }

    fn clear_pending(state: &mut ImpliedAckState) -> ImpliedAckHandlers {
        state.pending = false;
        state.nack_count = 0;
        state.deadline = None;
        std::mem::take(&mut state.handlers)
    }

    fn take_ack(state: &mut ImpliedAckState) -> Fire {
        Fire::Ack(Self::clear_pending(state).on_ack)
    }

    fn take_nack(state: &mut ImpliedAckState) -> Fire {
        Fire::Nack(Self::clear_pending(state).on_nack)
    }

    /// Records `frame` (the poll just answered) as the comparison baseline
    /// and arms the pending flag and timeout.
    pub fn set_pending_implied_ack(&self, frame: &[u8], handlers: ImpliedAckHandlers) {
        let mut state = self.lock();
        state.compare_length = if frame.get(1) == Some(&SAS_MULTI_DENOM_PREAMBLE) {
            SAS_MULTI_DENOM_COMPARE_LENGTH
        } else {
            SAS_COMPARE_LENGTH
        };
        state.last_message = frame.to_vec();
        state.handlers = handlers;
        state.nack_count = 0;
        state.pending = true;
        state.deadline = Some(Instant::now() + self.timeout);
    }

    /// Forces resynchronization and declares any outstanding response lost.
    pub fn link_down(&self) {
        let fire = {
            let mut state = self.lock();
            state.sync = SyncState::PendingAnotherAddress;
            if state.pending {
                Self::take_nack(&mut state)
            } else {
                state.deadline = None;
                Fire::None
            }
        };
        fire.run();
    }

    /// Checks the implied-ack timer. On expiry the outstanding response is
    /// declared lost, the link drops back to `PendingAnotherAddress` and
    /// `true` is returned so the caller can escalate.
    pub fn poll_timeout(&self) -> bool {
        let fire = {
            let mut state = self.lock();
            match state.deadline {
                Some(deadline) if state.pending && Instant::now() >= deadline => {
                    log::warn!(target: "sas::ack", "implied ACK timeout");
                    state.sync = SyncState::PendingAnotherAddress;
                    Self::take_nack(&mut state)
                }
                _ => return false,
            }
        };
        fire.run();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn synchronized() -> ImpliedAck {
        let ack = ImpliedAck::new(Duration::from_secs(30));
        assert_eq!(ack.evaluate(false, true, &[0x02]), ImpliedAckOutcome::SyncPoll);
        assert_eq!(ack.evaluate(false, false, &[0x81]), ImpliedAckOutcome::Proceed);
        assert_eq!(ack.sync_state(), SyncState::Synchronized);
        ack
    }

    #[test]
    fn test_initial_state_ignores_own_polls() {
        let ack = ImpliedAck::new(Duration::from_secs(30));
        assert_eq!(ack.sync_state(), SyncState::PendingAnotherAddress);
        assert!(!ack.check_implied_ack(false, false, &[0x81]));
    }

    #[test]
    fn test_sync_sequence() {
        let ack = ImpliedAck::new(Duration::from_secs(30));
        assert!(!ack.check_implied_ack(true, false, &[0x80]));
        assert_eq!(ack.sync_state(), SyncState::PendingFirstMessage);
        assert!(ack.check_implied_ack(false, false, &[0x81]));
        assert_eq!(ack.sync_state(), SyncState::Synchronized);
    }

    #[test]
    fn test_different_poll_acks() {
        let ack = synchronized();
        let acked = Arc::new(AtomicUsize::new(0));
        let a = acked.clone();
        ack.set_pending_implied_ack(
            &[0x01, 0x1F],
            ImpliedAckHandlers::new().on_ack(move || {
                a.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(ack.evaluate(false, false, &[0x01, 0x11]), ImpliedAckOutcome::Proceed);
        assert_eq!(acked.load(Ordering::SeqCst), 1);
        assert!(!ack.is_pending());
    }

    #[test]
    fn test_other_address_acks_and_resyncs() {
        let ack = synchronized();
        let acked = Arc::new(AtomicUsize::new(0));
        let a = acked.clone();
        ack.set_pending_implied_ack(
            &[0x81],
            ImpliedAckHandlers::new().on_ack(move || {
                a.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(ack.evaluate(false, true, &[0x82]), ImpliedAckOutcome::SyncPoll);
        assert_eq!(acked.load(Ordering::SeqCst), 1);
        assert_eq!(ack.sync_state(), SyncState::PendingFirstMessage);
    }

    #[test]
    fn test_multi_denom_compare_length() {
        let ack = synchronized();
        ack.set_pending_implied_ack(&[0x01, 0xB0, 0x03, 0x01, 0x11, 0xAA, 0xBB], Default::default());
        // Same first two bytes but a different wrapped command: host moved on.
        assert_eq!(
            ack.evaluate(false, false, &[0x01, 0xB0, 0x03, 0x01, 0x12, 0xCC, 0xDD]),
            ImpliedAckOutcome::Proceed
        );
        assert!(!ack.is_pending());
    }

    #[test]
    fn test_link_down_fires_nack() {
        let ack = synchronized();
        let nacked = Arc::new(AtomicUsize::new(0));
        let n = nacked.clone();
        ack.set_pending_implied_ack(
            &[0x01, 0x1F],
            ImpliedAckHandlers::new().on_nack(move || {
                n.fetch_add(1, Ordering::SeqCst);
            }),
        );
        ack.link_down();
        ack.link_down();
        assert_eq!(nacked.load(Ordering::SeqCst), 1);
        assert_eq!(ack.sync_state(), SyncState::PendingAnotherAddress);
        assert!(!ack.is_pending());
    }

    #[test]
    fn test_timeout_expiry() {
        let ack = ImpliedAck::new(Duration::from_millis(5));
        ack.evaluate(true, false, &[0x80]);
        ack.evaluate(false, false, &[0x81]);
        let nacked = Arc::new(AtomicUsize::new(0));
        let n = nacked.clone();
        ack.set_pending_implied_ack(
            &[0x81],
            ImpliedAckHandlers::new().on_nack(move || {
                n.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert!(!ack.poll_timeout());
        std::thread::sleep(Duration::from_millis(20));
        assert!(ack.poll_timeout());
        assert!(!ack.poll_timeout());
        assert_eq!(nacked.load(Ordering::SeqCst), 1);
        assert_eq!(ack.sync_state(), SyncState::PendingAnotherAddress);
    }
}
