//! SessionBuilder -- fluent builder for constructing [`DeviceSession`]s.
//!
//! Separates configuration from construction so that callers can set up
//! serial port parameters, timings and the resync policy before the port is
//! opened.
//!
//! # Example
//!
//! ```no_run
//! use dmmlog_brymen::builder::SessionBuilder;
//! use dmmlog_brymen::models::bm257s;
//! use std::time::Duration;
//!
//! # async fn example() -> dmmlog_core::Result<()> {
//! let mut session = SessionBuilder::new(bm257s())
//!     .serial_port("/dev/ttyUSB0")
//!     .read_timeout(Duration::from_millis(1500))
//!     .max_resyncs(Some(20))
//!     .probe(true)
//!     .build()
//!     .await?;
//! let reading = session.next_reading().await?;
//! println!("{}", reading.display);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tracing::debug;

use dmmlog_core::error::{Error, Result};
use dmmlog_core::transport::Transport;
use dmmlog_transport::{SerialConfig, SerialTransport};

use crate::models::BrymenModel;
use crate::session::{DEFAULT_SETTLE_DELAY, DeviceSession};

/// Fluent builder for [`DeviceSession`].
///
/// Defaults come from the [`BrymenModel`] and [`SerialConfig::default`]:
/// 9600 8N1, a 1 s read timeout, a 200 ms settle delay after each resync,
/// unlimited resyncs and no probe.
pub struct SessionBuilder {
    model: BrymenModel,
    serial_port: Option<String>,
    serial_config: Option<SerialConfig>,
    baud_rate: Option<u32>,
    read_timeout: Option<Duration>,
    settle_delay: Duration,
    max_resyncs: Option<u32>,
    probe: bool,
}

impl SessionBuilder {
    /// Create a new builder for the given model.
    pub fn new(model: BrymenModel) -> Self {
        SessionBuilder {
            model,
            serial_port: None,
            serial_config: None,
            baud_rate: None,
            read_timeout: None,
            settle_delay: DEFAULT_SETTLE_DELAY,
            max_resyncs: None,
            probe: false,
        }
    }

    /// Replace the model chosen in [`new`](Self::new).
    pub fn model(mut self, model: BrymenModel) -> Self {
        self.model = model;
        self
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Full serial settings. [`baud_rate`](Self::baud_rate) and
    /// [`read_timeout`](Self::read_timeout) still take precedence.
    pub fn serial_config(mut self, config: SerialConfig) -> Self {
        self.serial_config = Some(config);
        self
    }

    /// Override the model's default baud rate.
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = Some(baud);
        self
    }

    /// Timeout for reading one frame.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Wait after each transport reopen (default: 200ms).
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Give up after this many consecutive resyncs (default: never).
    pub fn max_resyncs(mut self, limit: Option<u32>) -> Self {
        self.max_resyncs = limit;
        self
    }

    /// Read one frame during build and fail if the meter does not answer.
    /// The probed reading is returned by the session's first read.
    pub fn probe(mut self, enabled: bool) -> Self {
        self.probe = enabled;
        self
    }

    fn effective_read_timeout(&self) -> Duration {
        self.read_timeout.unwrap_or_else(|| {
            self.serial_config
                .as_ref()
                .map(|c| c.read_timeout)
                .unwrap_or_else(|| SerialConfig::default().read_timeout)
        })
    }

    fn effective_serial_config(&self) -> SerialConfig {
        let base = self.serial_config.clone().unwrap_or_default();
        SerialConfig {
            baud_rate: self
                .baud_rate
                .or(self.serial_config.as_ref().map(|c| c.baud_rate))
                .unwrap_or(self.model.default_baud_rate),
            read_timeout: self.effective_read_timeout(),
            ..base
        }
    }

    /// Build a session over a caller-provided transport.
    ///
    /// This is the entry point for tests (pass a `MockTransport` from
    /// `dmmlog-test-harness`) and for callers that manage the transport
    /// themselves.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<DeviceSession> {
        let read_timeout = self.effective_read_timeout();
        if read_timeout.is_zero() {
            return Err(Error::InvalidParameter("read timeout must be non-zero".into()));
        }

        let mut session = DeviceSession::new(transport, self.model)
            .with_read_timeout(read_timeout)
            .with_settle_delay(self.settle_delay)
            .with_max_resyncs(self.max_resyncs);

        if self.probe {
            session.probe().await?;
        }
        Ok(session)
    }

    /// Build a session over a serial port.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<DeviceSession> {
        let port = self
            .serial_port
            .clone()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;
        let config = self.effective_serial_config();

        let transport = SerialTransport::open_with_config(&port, config).await?;
        debug!(port = %port, model = self.model.name, "starting session");
        self.build_with_transport(Box::new(transport)).await
    }
}
