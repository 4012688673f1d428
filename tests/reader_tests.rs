//! Integration tests for frame assembly over the mock transport.

use std::time::Duration;

use sas_egm::codec::calculate_and_append_crc;
use sas_egm::config::{InterByteDelayMode, SasClientConfig};
use sas_egm::sas::frame::PollFrame;
use sas_egm::sas::mock::MockTransport;
use sas_egm::sas::reader::{FrameReader, NoFrameReason, ReadOutcome};
use sas_egm::sas::transport::WireByte;

fn reader_with(mode: InterByteDelayMode) -> FrameReader {
    FrameReader::new(&SasClientConfig {
        inter_byte_delay_mode: mode,
        ..Default::default()
    })
}

fn reader() -> FrameReader {
    reader_with(InterByteDelayMode::Enforce)
}

fn long_poll(bytes: Vec<u8>) -> ReadOutcome {
    ReadOutcome::Frame(PollFrame::LongPoll {
        bytes,
        broadcast: false,
    })
}

#[tokio::test]
async fn test_fixed_length_long_poll() {
    let mut mock = MockTransport::new();
    let poll = calculate_and_append_crc(&[0x01, 0x7F, 0x10, 0x16, 0x20, 0x26, 0x13, 0x45, 0x00]);
    mock.queue_message(&poll);
    assert_eq!(reader().read_frame(&mut mock).await, long_poll(poll));
    assert_eq!(mock.pending_rx(), 0);
}

/// Variable-length polls add the length byte to the registered base.
#[tokio::test]
async fn test_variable_length_long_poll() {
    let mut mock = MockTransport::new();
    let poll = calculate_and_append_crc(&[0x01, 0x2F, 0x03, 0x00, 0x01, 0x0C]);
    mock.queue_message(&poll);
    // Next frame must stay queued.
    mock.queue_message(&[0x81]);

    let mut reader = reader();
    assert_eq!(reader.read_frame(&mut mock).await, long_poll(poll));
    assert_eq!(
        reader.read_frame(&mut mock).await,
        ReadOutcome::Frame(PollFrame::GeneralPoll { address: 1 })
    );
}

#[tokio::test]
async fn test_sync_polls_and_broadcast() {
    let mut mock = MockTransport::new();
    mock.queue_message(&[0x80]);
    mock.queue_message(&[0x85]);
    let broadcast = calculate_and_append_crc(&[0x00, 0x7F, 0x10, 0x16, 0x20, 0x26, 0x13, 0x45, 0x00]);
    mock.queue_message(&broadcast);

    let mut reader = reader();
    assert_eq!(
        reader.read_frame(&mut mock).await,
        ReadOutcome::Frame(PollFrame::GlobalPoll)
    );
    assert_eq!(
        reader.read_frame(&mut mock).await,
        ReadOutcome::Frame(PollFrame::OtherAddress { address_byte: 0x85 })
    );
    assert_eq!(
        reader.read_frame(&mut mock).await,
        ReadOutcome::Frame(PollFrame::LongPoll {
            bytes: broadcast,
            broadcast: true
        })
    );
}

#[tokio::test]
async fn test_unsupported_command() {
    let mut mock = MockTransport::new();
    mock.queue_message(&[0x01, 0xEE]);
    assert_eq!(
        reader().read_frame(&mut mock).await,
        ReadOutcome::NoFrame(NoFrameReason::UnsupportedCommand(0xEE))
    );
}

#[tokio::test]
async fn test_read_failure_mid_frame() {
    let mut mock = MockTransport::new();
    mock.queue_message(&[0x01, 0x7F, 0x10]);
    mock.queue_read_failure();
    assert_eq!(
        reader().read_frame(&mut mock).await,
        ReadOutcome::NoFrame(NoFrameReason::ReadFailure)
    );
}

#[tokio::test(start_paused = true)]
async fn test_inter_byte_delay_enforced() {
    let mut mock = MockTransport::new();
    mock.queue_message(&[0x01, 0x0E]);
    mock.queue_byte(WireByte::data(0x01), Duration::from_millis(20));
    assert_eq!(
        reader().read_frame(&mut mock).await,
        ReadOutcome::NoFrame(NoFrameReason::InterByteDelay)
    );
}

#[tokio::test(start_paused = true)]
async fn test_inter_byte_delay_log_only() {
    let mut mock = MockTransport::new();
    let poll = calculate_and_append_crc(&[0x01, 0x0E, 0x01]);
    mock.queue_message(&poll[..2]);
    mock.queue_byte(WireByte::data(poll[2]), Duration::from_millis(20));
    for &b in &poll[3..] {
        mock.queue_byte(WireByte::data(b), Duration::ZERO);
    }
    assert_eq!(
        reader_with(InterByteDelayMode::LogOnly)
            .read_frame(&mut mock)
            .await,
        long_poll(poll)
    );
}

/// A wakeup byte mid-frame starts a new frame from that byte.
#[tokio::test]
async fn test_wakeup_restarts_frame() {
    let mut mock = MockTransport::new();
    mock.queue_message(&[0x01, 0x7F, 0x10]);
    mock.queue_message(&[0x81]);
    assert_eq!(
        reader().read_frame(&mut mock).await,
        ReadOutcome::Frame(PollFrame::GeneralPoll { address: 1 })
    );
}

#[tokio::test]
async fn test_restart_cap() {
    let mut mock = MockTransport::new();
    for _ in 0..4 {
        mock.queue_message(&[0x01, 0x7F]);
    }
    mock.queue_message(&[0x01]);
    assert_eq!(
        reader().read_frame(&mut mock).await,
        ReadOutcome::NoFrame(NoFrameReason::TooManyRestarts)
    );
}

#[tokio::test]
async fn test_address_change_reclassifies() {
    let mut mock = MockTransport::new();
    mock.queue_message(&[0x81]);
    let mut reader = reader();
    reader.set_address(2);
    assert_eq!(reader.address(), 2);
    assert_eq!(
        reader.read_frame(&mut mock).await,
        ReadOutcome::Frame(PollFrame::OtherAddress { address_byte: 0x81 })
    );
}
