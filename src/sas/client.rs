//! # SAS Client
//!
//! The per-host control loop. Each cycle:
//!
//! 1. the [`FrameReader`] assembles a frame (or reports none);
//! 2. the [`ImpliedAck`] machine decides whether it acknowledges the previous
//!    response, repeats it, or must be ignored;
//! 3. long polls are CRC-checked and dispatched to their parser, general
//!    polls are answered from the exception queue, broadcasts are processed
//!    silently;
//! 4. the [`LinkMonitor`] chirps while the line is idle and declares the link
//!    down when it stays idle.
//!
//! Every per-frame problem is absorbed and counted in
//! [`ClientDiagnostics`]. The loop only ends on the stop flag or on the
//! fatal storage exception.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::codec::verify_crc;
use crate::config::SasClientConfig;
use crate::constants::{
    SAS_ADDRESS_GLOBAL, SAS_GENERAL_POLL_BIT, SAS_MULTI_DENOM_PREAMBLE, SAS_NACK_BIT,
    SAS_REAL_TIME_EVENT_COMMAND,
};
use crate::error::SasError;
use crate::parsers::reporting::real_time_reporting_parser;
use crate::parsers::{MultiDenomPreambleParser, ParserFactory};
use crate::sas::diagnostics::{ClientDiagnostics, DiagnosticEvent};
use crate::sas::exceptions::{ExceptionQueue, SasException};
use crate::sas::frame::{
    exception_requires_implied_ack, frame_response, nack, requires_implied_ack, PollFrame,
};
use crate::sas::implied_ack::{ImpliedAck, ImpliedAckHandlers, ImpliedAckOutcome};
use crate::sas::link::LinkMonitor;
use crate::sas::reader::{FrameReader, NoFrameReason, ReadOutcome};
use crate::sas::registry::lookup;
use crate::sas::transport::SasTransport;
use crate::util::logging::{log_frame_hex, LogThrottle};

/// Callbacks into the gaming machine platform.
pub trait SasPlatform: Send + Sync {
    /// The host link came up or went down.
    fn link_up(&self, up: bool, client_id: u8);

    /// Enable or disable play on behalf of this host.
    fn toggle_communications_enabled(&self, enabled: bool, client_id: u8);

    /// A long poll response was confirmed by implied ACK.
    fn long_poll_acked(&self, _command: u8, _client_id: u8) {}

    /// A long poll response was declared lost.
    fn long_poll_nacked(&self, _command: u8, _client_id: u8) {}

    /// An EFT poll was retried without reaching the NACK threshold.
    fn eft_intermediate_nack(&self, _command: u8, _client_id: u8) {}
}

/// Platform that only logs; used by the CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPlatform;

impl SasPlatform for LoggingPlatform {
    fn link_up(&self, up: bool, client_id: u8) {
        log::info!(target: "sas::link", "client {client_id} link {}", if up { "up" } else { "down" });
    }

    fn toggle_communications_enabled(&self, enabled: bool, client_id: u8) {
        log::info!(
            target: "sas::link",
            "client {client_id} play {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }
}

/// Why [`SasClient::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientExit {
    /// The stop flag was set.
    Stopped,
    /// The fatal storage exception was reported; the SAS address is now 0.
    Fatal,
}

/// Shared exception queue handle.
pub type SharedExceptionQueue = Arc<Mutex<dyn ExceptionQueue>>;

fn lock_queue(queue: &SharedExceptionQueue) -> MutexGuard<'_, dyn ExceptionQueue + 'static> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One SAS host connection.
pub struct SasClient<T: SasTransport> {
    config: SasClientConfig,
    address: u8,
    transport: T,
    reader: FrameReader,
    ack: Arc<ImpliedAck>,
    parsers: ParserFactory,
    multi_denom: MultiDenomPreambleParser,
    queue: SharedExceptionQueue,
    platform: Arc<dyn SasPlatform>,
    link: LinkMonitor,
    diagnostics: ClientDiagnostics,
    real_time_reporting: Arc<AtomicBool>,
    /// Last response as sent, replayed when the host retries.
    last_response: Option<Vec<u8>>,
    throttle: LogThrottle,
}

impl<T: SasTransport> SasClient<T> {
    pub fn new(
        config: SasClientConfig,
        transport: T,
        queue: SharedExceptionQueue,
        platform: Arc<dyn SasPlatform>,
    ) -> Result<Self, SasError> {
        config.validate()?;

        let real_time_reporting = Arc::new(AtomicBool::new(config.real_time_reporting));
        let mut parsers = ParserFactory::new(&config);
        parsers.insert_parser(Arc::new(real_time_reporting_parser(
            real_time_reporting.clone(),
        )));

        Ok(SasClient {
            address: config.address,
            reader: FrameReader::new(&config),
            ack: Arc::new(ImpliedAck::new(config.implied_ack_timeout())),
            link: LinkMonitor::new(config.chirp_interval(), config.link_down_timeout()),
            multi_denom: MultiDenomPreambleParser::new(),
            diagnostics: ClientDiagnostics::new(),
            last_response: None,
            throttle: LogThrottle::new(1000, 5),
            config,
            transport,
            parsers,
            queue,
            platform,
            real_time_reporting,
        })
    }

    pub fn config(&self) -> &SasClientConfig {
        &self.config
    }

    /// Current SAS address; 0 after the fatal exception.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Parsers of this client, for handler injection.
    pub fn parsers(&self) -> &ParserFactory {
        &self.parsers
    }

    pub fn parsers_mut(&mut self) -> &mut ParserFactory {
        &mut self.parsers
    }

    pub fn implied_ack(&self) -> Arc<ImpliedAck> {
        self.ack.clone()
    }

    pub fn diagnostics(&self) -> &ClientDiagnostics {
        &self.diagnostics
    }

    pub fn real_time_reporting(&self) -> bool {
        self.real_time_reporting.load(Ordering::SeqCst)
    }

    pub fn link_is_up(&self) -> bool {
        self.link.is_up()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Runs until `stop` is set or the fatal exception is reported. The flag
    /// is checked once per cycle.
    pub async fn run(&mut self, stop: Arc<AtomicBool>) -> ClientExit {
        log::info!(
            target: "sas::client",
            "client {} running at address {}",
            self.config.client_id,
            self.address
        );
        while !stop.load(Ordering::SeqCst) {
            if let Some(exit) = self.process_once().await {
                return exit;
            }
        }
        log::info!(target: "sas::client", "client {} stopped", self.config.client_id);
        ClientExit::Stopped
    }

    /// One cycle of the loop. Returns `Some` only on the fatal exception.
    pub async fn process_once(&mut self) -> Option<ClientExit> {
        if self.ack.poll_timeout() {
            self.diagnostics.record(DiagnosticEvent::ImpliedNack);
            if self.link.force_down() {
                self.handle_link_down();
            }
        }

        match self.reader.read_frame(&mut self.transport).await {
            ReadOutcome::NoFrame(reason) => {
                self.handle_no_frame(reason).await;
                None
            }
            ReadOutcome::Frame(frame) => {
                self.note_activity();
                self.dispatch(frame).await
            }
        }
    }

    #[cfg(feature = "tracing")]
    async fn dispatch(&mut self, frame: PollFrame) -> Option<ClientExit> {
        use tracing::Instrument;
        let span = crate::util::logging::span_poll_processing(self.config.client_id, frame.kind());
        self.process_frame(frame).instrument(span).await
    }

    #[cfg(not(feature = "tracing"))]
    async fn dispatch(&mut self, frame: PollFrame) -> Option<ClientExit> {
        self.process_frame(frame).await
    }

    async fn process_frame(&mut self, frame: PollFrame) -> Option<ClientExit> {
        let bytes = frame.bytes();
        let was_pending = self.ack.is_pending();
        let outcome = self.ack.evaluate(
            frame.is_global_broadcast(),
            frame.is_other_address(),
            &bytes,
        );
        if was_pending && !self.ack.is_pending() && outcome != ImpliedAckOutcome::ImpliedNack {
            self.diagnostics.record(DiagnosticEvent::ImpliedAck);
        }

        match outcome {
            ImpliedAckOutcome::NotSynchronized => {
                log::trace!(target: "sas::client", "ignoring {} poll until synchronized", frame.kind());
                None
            }
            ImpliedAckOutcome::SyncPoll => {
                self.diagnostics.record(DiagnosticEvent::SyncPoll);
                if let PollFrame::LongPoll {
                    bytes,
                    broadcast: true,
                } = &frame
                {
                    self.process_broadcast(bytes);
                }
                None
            }
            ImpliedAckOutcome::ImpliedNack => {
                self.diagnostics.record(DiagnosticEvent::ImpliedNack);
                self.last_response = None;
                None
            }
            ImpliedAckOutcome::Retry => {
                self.diagnostics.record(DiagnosticEvent::Retry);
                if let Some(previous) = self.last_response.clone() {
                    self.send(&previous).await;
                }
                None
            }
            ImpliedAckOutcome::Proceed => match frame {
                PollFrame::GeneralPoll { .. } => self.general_poll().await,
                PollFrame::LongPoll {
                    bytes,
                    broadcast: false,
                } => {
                    self.long_poll(&bytes).await;
                    None
                }
                _ => None,
            },
        }
    }

    async fn long_poll(&mut self, frame: &[u8]) {
        self.diagnostics.record(DiagnosticEvent::LongPoll);
        let (address, command) = (frame[0], frame[1]);
        let info = lookup(command);

        if !info.is_type_r() {
            if let Err(e) = verify_crc(frame) {
                self.diagnostics.record(DiagnosticEvent::CrcError);
                crate::log_warn_throttled!(
                    self.throttle,
                    "long poll 0x{command:02X}: {e}, answering NACK"
                );
                let response = nack(address);
                self.send(&response).await;
                self.last_response = Some(response);
                return;
            }
        }

        let response = if command == SAS_MULTI_DENOM_PREAMBLE {
            self.multi_denom.parse(frame, &self.parsers)
        } else {
            self.parsers.get(command).parse(frame)
        };

        let Some(response) = response else {
            if !self.parsers.is_registered(command) && command != SAS_MULTI_DENOM_PREAMBLE {
                self.diagnostics.record(DiagnosticEvent::UnsupportedCommand);
                log::debug!(target: "sas::client", "no parser for long poll 0x{command:02X}");
            }
            return;
        };

        let framed = frame_response(&response);
        self.send(&framed).await;
        self.last_response = Some(framed);

        if requires_implied_ack(&response) {
            let handlers = self.long_poll_handlers(command);
            self.ack.set_pending_implied_ack(frame, handlers);
        }
    }

    fn long_poll_handlers(&self, command: u8) -> ImpliedAckHandlers {
        let client_id = self.config.client_id;
        let on_ack = self.platform.clone();
        let on_nack = self.platform.clone();
        let on_retry = self.platform.clone();
        ImpliedAckHandlers::new()
            .on_ack(move || on_ack.long_poll_acked(command, client_id))
            .on_nack(move || on_nack.long_poll_nacked(command, client_id))
            .on_intermediate_nack(move || on_retry.eft_intermediate_nack(command, client_id))
    }

    /// Broadcast long polls are processed but never answered.
    fn process_broadcast(&mut self, frame: &[u8]) {
        self.diagnostics.record(DiagnosticEvent::Broadcast);
        let command = frame[1];
        if !lookup(command).broadcast_allowed {
            log::debug!(target: "sas::client", "0x{command:02X} may not be broadcast; dropped");
            return;
        }
        if let Err(e) = verify_crc(frame) {
            self.diagnostics.record(DiagnosticEvent::CrcError);
            crate::log_warn_throttled!(self.throttle, "broadcast 0x{command:02X}: {e}");
            return;
        }
        match self.parsers.get(command).parse(frame) {
            Some(r) if r.len() == 1 && r[0] & SAS_NACK_BIT != 0 => {
                self.diagnostics.record(DiagnosticEvent::MalformedBroadcast);
                crate::log_warn_throttled!(
                    self.throttle,
                    "broadcast 0x{command:02X} refused by its parser"
                );
            }
            _ => {}
        }
    }

    async fn general_poll(&mut self) -> Option<ClientExit> {
        self.diagnostics.record(DiagnosticEvent::GeneralPoll);
        let poll = [self.address | SAS_GENERAL_POLL_BIT];

        let message = lock_queue(&self.queue).get_next_message();
        if let Some(message) = message {
            let framed = frame_response(&message);
            self.send(&framed).await;
            self.last_response = Some(framed);
            if requires_implied_ack(&message) {
                let queue = self.queue.clone();
                self.ack.set_pending_implied_ack(
                    &poll,
                    ImpliedAckHandlers::new().on_ack(move || {
                        lock_queue(&queue).clear_message();
                    }),
                );
            } else {
                lock_queue(&self.queue).clear_message();
            }
            return None;
        }

        let exception = lock_queue(&self.queue)
            .get_next_exception()
            .unwrap_or_else(SasException::no_activity);
        let response = self.exception_response(&exception);
        let framed = frame_response(&response);
        self.send(&framed).await;
        self.last_response = Some(framed);

        if exception_requires_implied_ack(exception.code) {
            let queue = self.queue.clone();
            self.ack.set_pending_implied_ack(
                &poll,
                ImpliedAckHandlers::new().on_ack(move || {
                    lock_queue(&queue).acknowledge_exception();
                }),
            );
        }

        if exception.is_fatal() {
            log::error!(
                target: "sas::client",
                "client {}: storage failure reported, SAS address reset to 0",
                self.config.client_id
            );
            self.address = SAS_ADDRESS_GLOBAL;
            self.reader.set_address(SAS_ADDRESS_GLOBAL);
            return Some(ClientExit::Fatal);
        }
        None
    }

    fn exception_response(&self, exception: &SasException) -> Vec<u8> {
        if self.real_time_reporting() && !exception.is_no_activity() {
            let mut response = vec![self.address, SAS_REAL_TIME_EVENT_COMMAND, exception.code];
            response.extend_from_slice(&exception.data);
            response
        } else {
            vec![exception.code]
        }
    }

    async fn handle_no_frame(&mut self, reason: NoFrameReason) {
        match reason {
            NoFrameReason::Idle => {}
            NoFrameReason::ReadFailure | NoFrameReason::TooManyRestarts => {
                self.diagnostics.record(DiagnosticEvent::ReadFailure)
            }
            NoFrameReason::InterByteDelay => {
                self.diagnostics.record(DiagnosticEvent::InterByteViolation)
            }
            NoFrameReason::UnsupportedCommand(command) => {
                // Still a poll from a live host.
                self.note_activity();
                self.diagnostics.record(DiagnosticEvent::UnsupportedCommand);
                log::debug!(target: "sas::client", "unsupported long poll 0x{command:02X}");
                return;
            }
        }

        let check = self.link.check_idle();
        if check.chirp {
            match self.transport.send_chirp(self.address).await {
                Ok(()) => self.diagnostics.record(DiagnosticEvent::Chirp),
                Err(e) => crate::log_warn_throttled!(self.throttle, "chirp failed: {e}"),
            }
        }
        if check.link_down {
            self.handle_link_down();
        }
    }

    fn note_activity(&mut self) {
        if self.link.activity() {
            self.platform.link_up(true, self.config.client_id);
            if self.config.disable_play_on_link_down {
                self.platform
                    .toggle_communications_enabled(true, self.config.client_id);
            }
        }
    }

    fn handle_link_down(&mut self) {
        self.diagnostics.record(DiagnosticEvent::LinkDown);
        self.ack.link_down();
        self.last_response = None;
        self.platform.link_up(false, self.config.client_id);
        if self.config.disable_play_on_link_down {
            self.platform
                .toggle_communications_enabled(false, self.config.client_id);
        }
    }

    async fn send(&mut self, bytes: &[u8]) {
        log_frame_hex("tx", bytes);
        if let Err(e) = self.transport.send_raw_bytes(bytes).await {
            crate::log_warn_throttled!(self.throttle, "send failed: {e}");
        }
    }
}
