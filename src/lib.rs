//! # sas-egm - The Gaming Machine Side of the SAS Protocol
//!
//! SAS (Slot Accounting System) connects a gaming machine (EGM) to a casino
//! host over a 19200 baud serial line. The host polls; the machine answers.
//! This crate implements the machine's protocol engine:
//!
//! - Frame assembly driven by the ninth (wakeup) bit
//! - The long poll registry (lengths, type R polls, broadcast rules)
//! - CRC-16, BCD, binary, ASCII and date/time field codecs
//! - Implied acknowledgement, including the EFT two-phase handshake
//! - Long poll parsers with typed business handlers
//! - The multi-denomination preamble (0xB0)
//! - Chirping, link-down detection and per-client diagnostics
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! sas-egm = "0.1.0"
//! ```
//!
//! ```rust,no_run
//! use std::sync::atomic::AtomicBool;
//! use std::sync::{Arc, Mutex};
//!
//! use sas_egm::parsers::control::Shutdown;
//! use sas_egm::parsers::AckResponse;
//! use sas_egm::sas::serial::{SerialConfig, SerialTransport};
//! use sas_egm::sas::transport::SasTransport;
//! use sas_egm::{LoggingPlatform, MemoryExceptionQueue, SasClient, SasClientConfig};
//!
//! # async fn demo() -> Result<(), sas_egm::SasError> {
//! let mut transport = SerialTransport::new(SerialConfig::default());
//! transport.open("/dev/ttyUSB0").await?;
//!
//! let queue = Arc::new(Mutex::new(MemoryExceptionQueue::new()));
//! let mut client = SasClient::new(
//!     SasClientConfig::default(),
//!     transport,
//!     queue,
//!     Arc::new(LoggingPlatform),
//! )?;
//! client
//!     .parsers()
//!     .inject_handler::<Shutdown, _>(|()| AckResponse::Ack)?;
//!
//! client.run(Arc::new(AtomicBool::new(false))).await;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod parsers;
pub mod sas;
pub mod util;

pub use crate::config::{InterByteDelayMode, SasClientConfig, SasGroups};
pub use crate::error::SasError;
pub use crate::logging::{init_logger, init_logger_with_default, log_info};

// Protocol engine
pub use parsers::{AckResponse, LongPollDefinition, ParserFactory};
pub use sas::client::{ClientExit, LoggingPlatform, SasClient, SasPlatform};
pub use sas::diagnostics::ClientDiagnostics;
pub use sas::exceptions::{ExceptionQueue, MemoryExceptionQueue, SasException};
pub use sas::transport::{SasTransport, WireByte};
