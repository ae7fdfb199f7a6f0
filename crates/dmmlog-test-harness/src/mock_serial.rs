//! Mock transport for deterministic testing of frame decoders.
//!
//! [`MockTransport`] implements the [`Transport`] trait by replaying
//! pre-loaded byte chunks. Each chunk models a burst of bytes arriving on
//! the wire; reads take bytes from the front chunk, and a reopen discards
//! whatever is left of a partially consumed chunk, the same way closing a
//! real port drops its input buffer.
//!
//! # Example
//!
//! ```
//! use dmmlog_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! mock.push_bytes(&[0x02, 0x10, 0x20]);
//! mock.push_connection_lost();
//! assert_eq!(mock.remaining_steps(), 2);
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dmmlog_core::error::{Error, Result};
use dmmlog_core::transport::Transport;

/// One scripted event on the mock wire.
#[derive(Debug, Clone)]
enum Step {
    /// Bytes that arrive together.
    Data(Vec<u8>),
    /// The next read fails with [`Error::ConnectionLost`].
    ConnectionLost,
    /// The next read fails with an I/O error of this kind.
    Io(std::io::ErrorKind),
}

/// A mock [`Transport`] for testing decoders without a meter attached.
///
/// When the script is exhausted, reads return [`Error::Timeout`], the same
/// as a silent serial port.
#[derive(Debug)]
pub struct MockTransport {
    /// Ordered script of wire events.
    steps: VecDeque<Step>,
    /// Unread tail of a chunk split by a short read request.
    pending: Option<Vec<u8>>,
    /// Whether the transport is "connected".
    connected: bool,
    /// Whether `reopen()` should fail.
    fail_reopen: bool,
    /// Number of successful `reopen()` calls, shared with
    /// [`MockTransport::reopen_counter`] handles.
    reopens: Arc<AtomicUsize>,
    /// Bytes discarded by `reopen()`.
    discarded: usize,
    /// Length requested by each `read_exact()` call.
    read_log: Vec<usize>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            steps: VecDeque::new(),
            pending: None,
            connected: true,
            fail_reopen: false,
            reopens: Arc::new(AtomicUsize::new(0)),
            discarded: 0,
            read_log: Vec::new(),
        }
    }

    /// Queue a chunk of bytes.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.steps.push_back(Step::Data(data.to_vec()));
    }

    /// Queue several chunks, one per frame.
    pub fn push_frames<'a>(&mut self, frames: impl IntoIterator<Item = &'a [u8]>) {
        for frame in frames {
            self.push_bytes(frame);
        }
    }

    /// Queue a read that fails with [`Error::ConnectionLost`].
    pub fn push_connection_lost(&mut self) {
        self.steps.push_back(Step::ConnectionLost);
    }

    /// Queue a read that fails with an [`Error::Io`] of the given kind.
    pub fn push_io_error(&mut self, kind: std::io::ErrorKind) {
        self.steps.push_back(Step::Io(kind));
    }

    /// Make subsequent `reopen()` calls fail with [`Error::Transport`].
    pub fn set_fail_reopen(&mut self, fail: bool) {
        self.fail_reopen = fail;
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, reads return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Number of successful `reopen()` calls so far.
    pub fn reopen_count(&self) -> usize {
        self.reopens.load(Ordering::SeqCst)
    }

    /// Shared handle to the reopen count. It stays readable after the mock
    /// has been boxed and moved into a session.
    pub fn reopen_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reopens)
    }

    /// Number of buffered bytes thrown away by `reopen()` calls.
    pub fn discarded_bytes(&self) -> usize {
        self.discarded
    }

    /// Length requested by every `read_exact()` call, in order.
    pub fn read_requests(&self) -> &[usize] {
        &self.read_log
    }

    /// Number of scripted steps not yet consumed.
    pub fn remaining_steps(&self) -> usize {
        self.steps.len() + usize::from(self.pending.is_some())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn read_exact(&mut self, len: usize, _timeout: Duration) -> Result<Bytes> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.read_log.push(len);

        let step = match self.pending.take() {
            Some(rest) => Step::Data(rest),
            None => match self.steps.pop_front() {
                Some(step) => step,
                None => return Err(Error::Timeout),
            },
        };

        match step {
            Step::ConnectionLost => Err(Error::ConnectionLost),
            Step::Io(kind) => Err(Error::Io(std::io::Error::new(kind, "mock I/O failure"))),
            Step::Data(mut data) => {
                if data.len() > len {
                    self.pending = Some(data.split_off(len));
                }
                Ok(Bytes::from(data))
            }
        }
    }

    async fn reopen(&mut self) -> Result<()> {
        if self.fail_reopen {
            return Err(Error::Transport("mock reopen failure".into()));
        }
        if let Some(rest) = self.pending.take() {
            self.discarded += rest.len();
        }
        self.connected = true;
        self.reopens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
