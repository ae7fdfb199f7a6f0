//! Transport trait for meter communication.
//!
//! The [`Transport`] trait abstracts over the physical link to a multimeter.
//! Decoders never talk to a serial port directly: they ask the transport for
//! a fixed number of bytes and, when the byte stream has lost alignment with
//! the meter's frame boundaries, ask it to reopen the link.
//!
//! The serial implementation lives in `dmmlog-transport`; a scripted mock
//! for tests lives in `dmmlog-test-harness`.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a meter.
///
/// A transport is owned by exactly one read session at a time, so
/// implementations need no internal locking.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Read up to `len` bytes from the meter.
    ///
    /// Waits up to `timeout` for the full count. If the deadline passes after
    /// some bytes have arrived, the short buffer is returned as-is so that the
    /// caller's frame validator can reject it. Returns
    /// [`Error::Timeout`](crate::error::Error::Timeout) if nothing arrived.
    async fn read_exact(&mut self, len: usize, timeout: Duration) -> Result<Bytes>;

    /// Close and reopen the link, discarding any buffered input.
    ///
    /// Called after a framing error so the next read starts on a fresh
    /// byte stream.
    async fn reopen(&mut self) -> Result<()>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent reads should return
    /// [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
