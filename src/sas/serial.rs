//! # SAS Serial Transport
//!
//! SAS runs at 19200 baud with a ninth "wakeup" bit on the first byte of every
//! host message. Standard UARTs have no ninth data bit, so it is carried in
//! the parity bit:
//!
//! - sending: the parity mode is chosen per byte (odd or even) so the parity
//!   bit comes out as the wanted wakeup value;
//! - receiving: the port runs with even parity and POSIX parity marking
//!   (`PARMRK`). A byte with a parity error arrives as `FF 00 xx`, a literal
//!   `FF` as `FF FF`. The wakeup bit is then the parity error flag XOR the
//!   byte's own parity.
//!
//! Parity marking is configured through termios, so wakeup detection needs a
//! unix host.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};

use crate::error::SasError;
use crate::sas::transport::{SasTransport, WireByte};

const PARITY_MARK: u8 = 0xFF;
const PARITY_ERROR: u8 = 0x00;

/// Configuration for the serial line.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baudrate: u32,
    /// How long to wait for the first byte of a frame.
    pub frame_start_timeout: Duration,
    /// How long to wait for each following byte of a long poll.
    pub inter_byte_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baudrate: 19200,
            frame_start_timeout: Duration::from_millis(180),
            inter_byte_timeout: Duration::from_millis(10),
        }
    }
}

/// Parity bit the receiver should see for `byte` to carry `wakeup`.
fn parity_for(byte: u8, wakeup: bool) -> tokio_serial::Parity {
    let odd_ones = byte.count_ones() % 2 == 1;
    // Even parity sets the bit when the data has an odd number of ones.
    if odd_ones == wakeup {
        tokio_serial::Parity::Even
    } else {
        tokio_serial::Parity::Odd
    }
}

/// Recovers the wakeup bit of a byte received under even parity.
fn wakeup_from_parity(byte: u8, parity_error: bool) -> bool {
    (byte.count_ones() % 2 == 1) ^ parity_error
}

/// Serial port transport for one SAS client.
pub struct SerialTransport {
    config: SerialConfig,
    port: Option<SerialStream>,
    /// Raw bytes read ahead while decoding parity marks.
    lookahead: VecDeque<u8>,
}

impl SerialTransport {
    pub fn new(config: SerialConfig) -> Self {
        SerialTransport {
            config,
            port: None,
            lookahead: VecDeque::new(),
        }
    }

    fn port(&mut self) -> Result<&mut SerialStream, SasError> {
        self.port.as_mut().ok_or(SasError::TransportClosed)
    }

    async fn read_raw(&mut self, timeout: Duration) -> Option<u8> {
        if let Some(b) = self.lookahead.pop_front() {
            return Some(b);
        }
        let port = self.port.as_mut()?;
        match tokio::time::timeout(timeout, port.read_u8()).await {
            Ok(Ok(b)) => Some(b),
            Ok(Err(e)) => {
                log::debug!(target: "sas::frame", "serial read failed: {e}");
                None
            }
            Err(_) => None,
        }
    }

    /// Writes a run of bytes that all share one wakeup value.
    async fn write_with_wakeup(&mut self, bytes: &[u8], wakeup: bool) -> Result<(), SasError> {
        let mut start = 0;
        while start < bytes.len() {
            let parity = parity_for(bytes[start], wakeup);
            let end = bytes[start..]
                .iter()
                .position(|&b| parity_for(b, wakeup) != parity)
                .map_or(bytes.len(), |n| start + n);

            let port = self.port()?;
            port.set_parity(parity)
                .map_err(|e| SasError::SerialPortError(e.to_string()))?;
            port.write_all(&bytes[start..end])
                .await
                .map_err(|e| SasError::SerialPortError(e.to_string()))?;
            port.flush()
                .await
                .map_err(|e| SasError::SerialPortError(e.to_string()))?;
            drain(port)?;
            start = end;
        }

        self.port()?
            .set_parity(tokio_serial::Parity::Even)
            .map_err(|e| SasError::SerialPortError(e.to_string()))
    }
}

#[async_trait]
impl SasTransport for SerialTransport {
    async fn open(&mut self, port_name: &str) -> Result<(), SasError> {
        let port = tokio_serial::new(port_name, self.config.baudrate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::Even)
            .timeout(self.config.frame_start_timeout)
            .open_native_async()
            .map_err(|e| SasError::SerialPortError(e.to_string()))?;
        enable_parity_marking(&port)?;

        log::info!(target: "sas::link", "opened {port_name} at {} baud", self.config.baudrate);
        self.lookahead.clear();
        self.port = Some(port);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SasError> {
        // Dropping the stream closes the descriptor.
        self.port = None;
        self.lookahead.clear();
        Ok(())
    }

    async fn send_raw_bytes(&mut self, bytes: &[u8]) -> Result<(), SasError> {
        self.write_with_wakeup(bytes, false).await
    }

    async fn read_one_byte(&mut self, is_long_poll: bool) -> Option<WireByte> {
        let timeout = if is_long_poll {
            self.config.inter_byte_timeout
        } else {
            self.config.frame_start_timeout
        };

        let first = self.read_raw(timeout).await?;
        if first != PARITY_MARK {
            return Some(WireByte {
                value: first,
                wakeup: wakeup_from_parity(first, false),
            });
        }

        // Marked sequences arrive back to back.
        let inter = self.config.inter_byte_timeout;
        match self.read_raw(inter).await? {
            PARITY_MARK => Some(WireByte {
                value: PARITY_MARK,
                wakeup: wakeup_from_parity(PARITY_MARK, false),
            }),
            PARITY_ERROR => {
                let value = self.read_raw(inter).await?;
                Some(WireByte {
                    value,
                    wakeup: wakeup_from_parity(value, true),
                })
            }
            other => {
                // Framing glitch; hand the second byte back for the next read.
                self.lookahead.push_back(other);
                Some(WireByte {
                    value: first,
                    wakeup: wakeup_from_parity(first, false),
                })
            }
        }
    }

    async fn send_chirp(&mut self, address: u8) -> Result<(), SasError> {
        self.write_with_wakeup(&[address], true).await
    }
}

#[cfg(unix)]
fn enable_parity_marking(port: &SerialStream) -> Result<(), SasError> {
    use nix::sys::termios::{tcgetattr, tcsetattr, InputFlags, SetArg};

    let fd = borrowed_fd(port);
    let mut termios = tcgetattr(fd).map_err(|e| SasError::SerialPortError(e.to_string()))?;
    termios.input_flags.insert(InputFlags::PARMRK | InputFlags::INPCK);
    termios
        .input_flags
        .remove(InputFlags::IGNPAR | InputFlags::ISTRIP);
    tcsetattr(fd, SetArg::TCSANOW, &termios).map_err(|e| SasError::SerialPortError(e.to_string()))
}

#[cfg(not(unix))]
fn enable_parity_marking(_port: &SerialStream) -> Result<(), SasError> {
    Err(SasError::SerialPortError(
        "wakeup-bit detection needs parity marking, which requires a unix host".into(),
    ))
}

/// Waits until every queued byte has left the UART so the parity change
/// does not apply to bytes still in flight.
#[cfg(unix)]
fn drain(port: &SerialStream) -> Result<(), SasError> {
    nix::sys::termios::tcdrain(borrowed_fd(port)).map_err(|e| SasError::SerialPortError(e.to_string()))
}

#[cfg(not(unix))]
fn drain(_port: &SerialStream) -> Result<(), SasError> {
    Ok(())
}

#[cfg(unix)]
fn borrowed_fd(port: &SerialStream) -> std::os::fd::BorrowedFd<'_> {
    use std::os::fd::{AsRawFd, BorrowedFd};
    // SAFETY: the descriptor belongs to `port` and the borrow cannot outlive it.
    unsafe { BorrowedFd::borrow_raw(port.as_raw_fd()) }
}
