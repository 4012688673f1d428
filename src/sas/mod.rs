//! The sas module contains the protocol engine: frame assembly, the long
//! poll registry, implied acknowledgement, link supervision and the client
//! loop tying them together, plus the serial and mock transports.

pub mod client;
pub mod diagnostics;
pub mod exceptions;
pub mod frame;
pub mod implied_ack;
pub mod link;
pub mod mock;
pub mod reader;
pub mod registry;
pub mod serial;
pub mod transport;

pub use client::{ClientExit, LoggingPlatform, SasClient, SasPlatform, SharedExceptionQueue};
pub use diagnostics::{ClientDiagnostics, DiagnosticEvent};
pub use exceptions::{ExceptionQueue, MemoryExceptionQueue, SasException};
pub use frame::PollFrame;
pub use implied_ack::{ImpliedAck, ImpliedAckHandlers, ImpliedAckOutcome, SyncState};
pub use reader::{FrameReader, NoFrameReason, ReadOutcome};
pub use registry::{lookup, LongPoll, LongPollInfo};
pub use transport::{SasTransport, WireByte};
