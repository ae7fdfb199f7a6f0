//! Serial port transport for meter communication.
//!
//! This module provides [`SerialTransport`], which implements the [`Transport`]
//! trait for USB-serial adapters and RS-232 interface cables. Brymen meters
//! stream fixed-size frames continuously at 9600 baud, 8N1, so the defaults
//! in [`SerialConfig`] work without changes for the BM25x family.
//!
//! # Example
//!
//! ```no_run
//! use dmmlog_transport::SerialTransport;
//! use dmmlog_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> dmmlog_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 9600).await?;
//!
//! // One 15-byte frame, waiting at most one second.
//! let frame = transport.read_exact(15, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dmmlog_core::error::{Error, Result};
use dmmlog_core::transport::Transport;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};

/// Serial port configuration.
///
/// Defaults match the Brymen interface cable:
/// - 9600 baud
/// - 8 data bits
/// - 1 stop bit
/// - No parity
/// - No flow control
/// - 1 second read timeout
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate (2400, 4800 or 9600 on most meters)
    pub baud_rate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Number of stop bits (typically 1)
    pub stop_bits: StopBits,
    /// Parity checking (typically None)
    pub parity: Parity,
    /// Flow control (None for optically isolated meter cables)
    pub flow_control: FlowControl,
    /// Default timeout for a single frame read
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
            read_timeout: Duration::from_secs(1),
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => tokio_serial::DataBits::Five,
            DataBits::Six => tokio_serial::DataBits::Six,
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

impl TryFrom<u8> for DataBits {
    type Error = Error;

    fn try_from(bits: u8) -> Result<Self> {
        match bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(Error::InvalidParameter(format!(
                "data bits must be 5-8, got {other}"
            ))),
        }
    }
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

impl TryFrom<u8> for StopBits {
    type Error = Error;

    fn try_from(bits: u8) -> Result<Self> {
        match bits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(Error::InvalidParameter(format!(
                "stop bits must be 1 or 2, got {other}"
            ))),
        }
    }
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Software => tokio_serial::FlowControl::Software,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}

/// Serial port transport for meter communication.
///
/// Keeps the port path and configuration so that [`Transport::reopen`] can
/// re-establish the link after a framing error.
pub struct SerialTransport {
    /// The underlying serial port stream
    port: Option<SerialStream>,
    /// Port name for logging and reopen
    port_name: String,
    /// Settings applied on every (re)open
    config: SerialConfig,
}

impl SerialTransport {
    /// Open a serial port with the given baud rate and default settings.
    ///
    /// # Arguments
    ///
    /// * `port` - Serial port path (e.g., "/dev/ttyUSB0" on Linux, "COM3" on Windows)
    /// * `baud_rate` - Baud rate (9600 for Brymen meters)
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let config = SerialConfig {
            baud_rate,
            ..Default::default()
        };
        Self::open_with_config(port, config).await
    }

    /// Open a serial port with full configuration control.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use dmmlog_transport::{SerialTransport, SerialConfig, Parity};
    /// # async fn example() -> dmmlog_core::Result<()> {
    /// let config = SerialConfig {
    ///     parity: Parity::Even,
    ///     ..Default::default()
    /// };
    /// let transport = SerialTransport::open_with_config("/dev/ttyUSB0", config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        if config.baud_rate == 0 {
            return Err(Error::InvalidParameter("baud rate must be non-zero".into()));
        }
        let stream = open_stream(port, &config)?;
        Ok(Self {
            port: Some(stream),
            port_name: port.to_string(),
            config,
        })
    }

    /// Get the name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Get the configuration applied to the port.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

fn open_stream(port: &str, config: &SerialConfig) -> Result<SerialStream> {
    tracing::debug!(
        port = %port,
        baud_rate = config.baud_rate,
        data_bits = ?config.data_bits,
        stop_bits = ?config.stop_bits,
        parity = ?config.parity,
        flow_control = ?config.flow_control,
        "Opening serial port"
    );

    let mut stream = tokio_serial::new(port, config.baud_rate)
        .data_bits(config.data_bits.into())
        .stop_bits(config.stop_bits.into())
        .parity(config.parity.into())
        .flow_control(config.flow_control.into())
        .open_native_async()
        .map_err(|e| {
            tracing::error!(port = %port, error = %e, "Failed to open serial port");
            Error::Transport(format!("Failed to open serial port {}: {}", port, e))
        })?;

    // The optically isolated interface cables draw their power from DTR/RTS.
    if let Err(e) = stream.write_data_terminal_ready(true) {
        tracing::warn!(port = %port, error = %e, "Failed to assert DTR");
    }
    if let Err(e) = stream.write_request_to_send(true) {
        tracing::warn!(port = %port, error = %e, "Failed to assert RTS");
    }
    if let Err(e) = stream.clear(ClearBuffer::Input) {
        tracing::warn!(port = %port, error = %e, "Failed to clear input buffer");
    }

    tracing::info!(port = %port, baud_rate = config.baud_rate, "Serial port opened successfully");
    Ok(stream)
}

fn map_io_error(port_name: &str, e: std::io::Error) -> Error {
    tracing::error!(port = %port_name, error = %e, "Failed to receive data");
    if e.kind() == std::io::ErrorKind::BrokenPipe || e.kind() == std::io::ErrorKind::NotConnected {
        Error::ConnectionLost
    } else {
        Error::Io(e)
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn read_exact(&mut self, len: usize, timeout: Duration) -> Result<Bytes> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(
            port = %self.port_name,
            len,
            timeout_ms = timeout.as_millis(),
            "Waiting for data"
        );

        let mut buf = BytesMut::zeroed(len);
        let mut filled = 0;
        let deadline = tokio::time::Instant::now() + timeout;

        while filled < len {
            match tokio::time::timeout_at(deadline, port.read(&mut buf[filled..])).await {
                Ok(Ok(0)) => return Err(Error::ConnectionLost),
                Ok(Ok(n)) => filled += n,
                Ok(Err(e)) => return Err(map_io_error(&self.port_name, e)),
                Err(_) => break,
            }
        }

        if filled == 0 {
            tracing::trace!(
                port = %self.port_name,
                timeout_ms = timeout.as_millis(),
                "Timeout waiting for data"
            );
            return Err(Error::Timeout);
        }

        buf.truncate(filled);
        tracing::trace!(port = %self.port_name, bytes = filled, data = ?&buf[..], "Received data");
        Ok(buf.freeze())
    }

    async fn reopen(&mut self) -> Result<()> {
        tracing::debug!(port = %self.port_name, "Reopening serial port");
        // Dropping the stream closes the port before it is opened again.
        self.port = None;
        self.port = Some(open_stream(&self.port_name, &self.config)?);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            tracing::info!(port = %self.port_name, "Serial port closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.port.is_some() {
            tracing::debug!(port = %self.port_name, "SerialTransport dropped, closing port");
        }
    }
}
