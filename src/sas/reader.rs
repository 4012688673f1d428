//! # Frame Reader
//!
//! Assembles exactly one frame per call from the byte stream. A frame
//! starts at a byte with the wakeup bit set; the address byte decides
//! whether it is a general poll, a sync poll (global or another address) or
//! the start of a long poll whose length comes from the registry.
//!
//! Nothing partial is ever returned. A read failure, an inter-byte gap
//! above the limit or too many wakeup restarts abandons the frame and the
//! caller sees [`ReadOutcome::NoFrame`] for this cycle.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::{InterByteDelayMode, SasClientConfig};
use crate::sas::frame::{classify_address, AddressClass, PollFrame};
use crate::sas::registry::lookup;
use crate::sas::transport::{SasTransport, WireByte};
use crate::util::logging::{log_frame_hex, LogThrottle};

/// Why no frame was produced this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoFrameReason {
    /// No byte with the wakeup bit within the frame-start budget.
    Idle,
    /// The transport failed or timed out in the middle of a frame.
    ReadFailure,
    /// Two bytes of a long poll were further apart than allowed.
    InterByteDelay,
    /// Wakeup bytes kept interrupting the frame.
    TooManyRestarts,
    /// Command has no registry entry.
    UnsupportedCommand(u8),
}

/// Result of one [`FrameReader::read_frame`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Frame(PollFrame),
    NoFrame(NoFrameReason),
}

enum Assembly {
    Done(PollFrame),
    Abandoned(NoFrameReason),
    /// A wakeup byte arrived mid-frame; start over from it.
    Restart(WireByte),
}

/// Reads frames for one SAS address.
#[derive(Debug)]
pub struct FrameReader {
    address: u8,
    frame_start_budget: Duration,
    inter_byte_delay: Duration,
    mode: InterByteDelayMode,
    max_restarts: u8,
    throttle: LogThrottle,
}

impl FrameReader {
    pub fn new(config: &SasClientConfig) -> Self {
        FrameReader {
            address: config.address,
            frame_start_budget: config.frame_start_budget(),
            inter_byte_delay: config.inter_byte_delay(),
            mode: config.inter_byte_delay_mode,
            max_restarts: config.max_frame_restarts,
            throttle: LogThrottle::new(1000, 5),
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn set_address(&mut self, address: u8) {
        self.address = address;
    }

    /// Reads until one complete frame is assembled or the cycle is abandoned.
    pub async fn read_frame<T>(&mut self, transport: &mut T) -> ReadOutcome
    where
        T: SasTransport + ?Sized,
    {
        let started = Instant::now();
        let mut current = loop {
            match transport.read_one_byte(false).await {
                None => return ReadOutcome::NoFrame(NoFrameReason::Idle),
                Some(byte) if byte.wakeup => break byte,
                Some(_) if started.elapsed() >= self.frame_start_budget => {
                    return ReadOutcome::NoFrame(NoFrameReason::Idle)
                }
                Some(_) => continue,
            }
        };

        let mut restarts = 0u8;
        loop {
            match self.assemble(transport, current).await {
                Assembly::Done(frame) => return ReadOutcome::Frame(frame),
                Assembly::Abandoned(reason) => {
                    log::trace!(target: "sas::frame", "frame abandoned: {reason:?}");
                    return ReadOutcome::NoFrame(reason);
                }
                Assembly::Restart(byte) => {
                    restarts += 1;
                    if restarts > self.max_restarts {
                        crate::log_warn_throttled!(
                            self.throttle,
                            "frame restarted {restarts} times by wakeup bytes; giving up"
                        );
                        return ReadOutcome::NoFrame(NoFrameReason::TooManyRestarts);
                    }
                    current = byte;
                }
            }
        }
    }

    async fn assemble<T>(&mut self, transport: &mut T, first: WireByte) -> Assembly
    where
        T: SasTransport + ?Sized,
    {
        match classify_address(first.value, self.address) {
            AddressClass::GeneralPoll => Assembly::Done(PollFrame::GeneralPoll {
                address: self.address,
            }),
            AddressClass::GlobalPoll => Assembly::Done(PollFrame::GlobalPoll),
            AddressClass::OtherAddress => Assembly::Done(PollFrame::OtherAddress {
                address_byte: first.value,
            }),
            AddressClass::LongPoll => self.read_long_poll(transport, first.value, false).await,
            AddressClass::GlobalLongPoll => self.read_long_poll(transport, first.value, true).await,
        }
    }

    async fn read_long_poll<T>(&mut self, transport: &mut T, address: u8, broadcast: bool) -> Assembly
    where
        T: SasTransport + ?Sized,
    {
        let mut last = Instant::now();
        let mut bytes = vec![address];

        let command = match self.next_byte(transport, &mut last).await {
            Ok(b) => b,
            Err(a) => return a,
        };
        bytes.push(command);

        let info = lookup(command);
        if !info.is_supported() {
            return Assembly::Abandoned(NoFrameReason::UnsupportedCommand(command));
        }
        if info.is_type_r() {
            return Assembly::Done(PollFrame::LongPoll { bytes, broadcast });
        }

        let total = if info.variable_length {
            let stated = match self.next_byte(transport, &mut last).await {
                Ok(b) => b,
                Err(a) => return a,
            };
            bytes.push(stated);
            info.total_length(stated)
        } else {
            info.total_length(0)
        };

        while bytes.len() < total {
            match self.next_byte(transport, &mut last).await {
                Ok(b) => bytes.push(b),
                Err(a) => return a,
            }
        }

        log_frame_hex("rx", &bytes);
        Assembly::Done(PollFrame::LongPoll { bytes, broadcast })
    }

    /// Reads the next data byte of a frame in progress, enforcing the
    /// inter-byte delay.
    async fn next_byte<T>(&mut self, transport: &mut T, last: &mut Instant) -> Result<u8, Assembly>
    where
        T: SasTransport + ?Sized,
    {
        let byte = transport
            .read_one_byte(true)
            .await
            .ok_or(Assembly::Abandoned(NoFrameReason::ReadFailure))?;

        let now = Instant::now();
        let gap = now.duration_since(*last);
        *last = now;

        if byte.wakeup {
            return Err(Assembly::Restart(byte));
        }
        if gap > self.inter_byte_delay {
            match self.mode {
                InterByteDelayMode::Enforce => {
                    crate::log_warn_throttled!(
                        self.throttle,
                        "inter-byte delay {gap:?} exceeds {:?}; frame dropped",
                        self.inter_byte_delay
                    );
                    return Err(Assembly::Abandoned(NoFrameReason::InterByteDelay));
                }
                InterByteDelayMode::LogOnly => {
                    crate::log_warn_throttled!(
                        self.throttle,
                        "inter-byte delay {gap:?} exceeds {:?}",
                        self.inter_byte_delay
                    );
                }
            }
        }
        Ok(byte.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sas::mock::MockTransport;

    fn reader() -> FrameReader {
        FrameReader::new(&SasClientConfig::default())
    }

    #[tokio::test]
    async fn test_general_poll() {
        let mut mock = MockTransport::new();
        mock.queue_message(&[0x81]);
        assert_eq!(
            reader().read_frame(&mut mock).await,
            ReadOutcome::Frame(PollFrame::GeneralPoll { address: 1 })
        );
    }

    #[tokio::test]
    async fn test_skips_bytes_without_wakeup() {
        let mut mock = MockTransport::new();
        mock.queue_byte(WireByte::data(0x55), Duration::ZERO);
        mock.queue_byte(WireByte::data(0x81), Duration::ZERO);
        mock.queue_message(&[0x81]);
        assert_eq!(
            reader().read_frame(&mut mock).await,
            ReadOutcome::Frame(PollFrame::GeneralPoll { address: 1 })
        );
    }

    #[tokio::test]
    async fn test_empty_line_is_idle() {
        let mut mock = MockTransport::new();
        assert_eq!(
            reader().read_frame(&mut mock).await,
            ReadOutcome::NoFrame(NoFrameReason::Idle)
        );
    }

    #[tokio::test]
    async fn test_type_r_long_poll() {
        let mut mock = MockTransport::new();
        mock.queue_message(&[0x01, 0x1F]);
        assert_eq!(
            reader().read_frame(&mut mock).await,
            ReadOutcome::Frame(PollFrame::LongPoll {
                bytes: vec![0x01, 0x1F],
                broadcast: false
            })
        );
    }
}
