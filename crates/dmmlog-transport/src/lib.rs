//! Transport implementations for dmmlog.
//!
//! This crate provides [`SerialTransport`], the concrete implementation of the
//! [`Transport`](dmmlog_core::Transport) trait for USB-serial adapters and
//! RS-232 meter interface cables.
//!
//! # Example
//!
//! ```no_run
//! use dmmlog_transport::SerialTransport;
//! use dmmlog_core::transport::Transport;
//!
//! # async fn example() -> dmmlog_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 9600).await?;
//! transport.reopen().await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits};
