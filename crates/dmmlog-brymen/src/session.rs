//! The read loop for one attached meter.
//!
//! A [`DeviceSession`] owns its transport exclusively and moves between two
//! states: READY, where it reads one frame's worth of bytes and checks it,
//! and RESYNCING, where it reopens the transport and waits a fixed settle
//! delay before reading again. Corrupt or misaligned data never reaches the
//! reading builder.

use std::time::{Duration, SystemTime};

use tracing::{debug, trace};

use dmmlog_core::error::{Error, Result};
use dmmlog_core::transport::Transport;
use dmmlog_core::types::Reading;

use crate::frame::{FRAME_LEN, FrameCheck, check_frame};
use crate::models::BrymenModel;
use crate::reading::build_reading;

/// Default wait after reopening the transport.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Default timeout for one frame read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Why [`DeviceSession::decode_next`] produced no reading.
#[derive(Debug, thiserror::Error)]
pub enum DecodeOutcome {
    /// The candidate frame was discarded and the transport realigned.
    #[error("frame discarded, transport resynchronized (attempt {attempt})")]
    Resynced {
        /// Consecutive resyncs since the last good frame (1-based).
        attempt: u32,
    },
    /// The session cannot continue.
    #[error(transparent)]
    Transport(#[from] Error),
}

/// One meter, one transport, one read loop.
pub struct DeviceSession {
    transport: Box<dyn Transport>,
    model: BrymenModel,
    read_timeout: Duration,
    settle_delay: Duration,
    max_resyncs: Option<u32>,
    /// Consecutive resyncs since the last good frame.
    resyncs: u32,
    total_resyncs: u64,
    /// Reading taken by a connection probe, handed out first.
    primed: Option<Reading>,
}

impl DeviceSession {
    /// Wrap a transport with default timings and no resync ceiling.
    pub fn new(transport: Box<dyn Transport>, model: BrymenModel) -> Self {
        DeviceSession {
            transport,
            model,
            read_timeout: DEFAULT_READ_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            max_resyncs: None,
            resyncs: 0,
            total_resyncs: 0,
            primed: None,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Give up after `limit` consecutive resyncs. `None` retries forever.
    pub fn with_max_resyncs(mut self, limit: Option<u32>) -> Self {
        self.max_resyncs = limit;
        self
    }

    /// The model this session decodes for.
    pub fn model(&self) -> &BrymenModel {
        &self.model
    }

    /// Consecutive resyncs since the last good frame.
    pub fn resync_count(&self) -> u32 {
        self.resyncs
    }

    /// Resyncs over the whole session.
    pub fn total_resyncs(&self) -> u64 {
        self.total_resyncs
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Read one frame and decode it, or resync.
    ///
    /// A silent device (read timeout with nothing received) is treated like a
    /// short frame. I/O failures and a reached resync ceiling are returned as
    /// [`DecodeOutcome::Transport`].
    pub async fn decode_next(&mut self) -> std::result::Result<Reading, DecodeOutcome> {
        if let Some(reading) = self.primed.take() {
            return Ok(reading);
        }

        let check = match self.transport.read_exact(FRAME_LEN, self.read_timeout).await {
            Ok(buf) => {
                trace!(len = buf.len(), bytes = ?&buf[..], "frame bytes");
                check_frame(&buf, self.model.validation)
            }
            Err(Error::Timeout) => {
                debug!("no data from meter within read timeout");
                return Err(self.resync().await);
            }
            Err(e) => return Err(DecodeOutcome::Transport(e)),
        };

        match check {
            FrameCheck::Valid(frame) => {
                let reading = build_reading(&frame, &self.model, SystemTime::now());
                self.resyncs = 0;
                Ok(reading)
            }
            FrameCheck::Resync(reason) => {
                debug!(%reason, "discarding frame");
                Err(self.resync().await)
            }
        }
    }

    /// Read until a frame decodes.
    ///
    /// Resyncs are retried with the fixed settle delay until a reading
    /// arrives, the ceiling is reached, or the transport fails.
    pub async fn next_reading(&mut self) -> Result<Reading> {
        loop {
            match self.decode_next().await {
                Ok(reading) => return Ok(reading),
                Err(DecodeOutcome::Resynced { .. }) => continue,
                Err(DecodeOutcome::Transport(e)) => return Err(e),
            }
        }
    }

    /// Read one frame and keep it for the next call, failing if the meter
    /// does not answer.
    pub(crate) async fn probe(&mut self) -> Result<()> {
        let reading = self.next_reading().await?;
        debug!(display = %reading.display, "probe reading");
        self.primed = Some(reading);
        Ok(())
    }

    /// Close the transport.
    pub async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }

    /// Give up the session and take the transport back.
    pub fn into_transport(self) -> Box<dyn Transport> {
        self.transport
    }

    async fn resync(&mut self) -> DecodeOutcome {
        if let Some(limit) = self.max_resyncs {
            if self.resyncs >= limit {
                return DecodeOutcome::Transport(Error::ResyncExhausted(limit));
            }
        }
        self.resyncs += 1;
        self.total_resyncs += 1;

        debug!(attempt = self.resyncs, "reopening transport");
        if let Err(e) = self.transport.reopen().await {
            return DecodeOutcome::Transport(e);
        }
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
        DecodeOutcome::Resynced {
            attempt: self.resyncs,
        }
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("model", &self.model.name)
            .field("read_timeout", &self.read_timeout)
            .field("settle_delay", &self.settle_delay)
            .field("max_resyncs", &self.max_resyncs)
            .field("resyncs", &self.resyncs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{bm257, bm257s};
    use crate::reading::tests::TestFrame;
    use dmmlog_core::{Coupling, Quantity};
    use dmmlog_test_harness::MockTransport;
    use std::sync::atomic::Ordering;

    fn session(mock: MockTransport) -> DeviceSession {
        DeviceSession::new(Box::new(mock), bm257s()).with_settle_delay(Duration::ZERO)
    }

    fn volts() -> [u8; FRAME_LEN] {
        TestFrame::new()
            .digits(" 500")
            .point(3)
            .bit(1, 5)
            .bit(14, 5)
            .bytes()
    }

    fn corrupt() -> [u8; FRAME_LEN] {
        let mut bytes = volts();
        bytes[6] = 0x76;
        bytes
    }

    #[tokio::test]
    async fn clean_frame_gives_reading() {
        let mut mock = MockTransport::new();
        mock.push_bytes(&volts());
        let mut session = session(mock);

        let reading = session.decode_next().await.unwrap();
        assert_eq!(reading.value, Some(5.0));
        assert_eq!(reading.quantity, Quantity::Voltage(Coupling::Dc));
        assert_eq!(reading.display, "5.00V");
        assert_eq!(session.resync_count(), 0);
    }

    #[tokio::test]
    async fn corrupt_then_clean_resyncs_once() {
        let mut mock = MockTransport::new();
        mock.push_bytes(&corrupt());
        mock.push_bytes(&volts());
        let mut session = session(mock);

        match session.decode_next().await {
            Err(DecodeOutcome::Resynced { attempt }) => assert_eq!(attempt, 1),
            other => panic!("expected resync, got {other:?}"),
        }
        let reading = session.decode_next().await.unwrap();
        assert_eq!(reading.display, "5.00V");
        assert_eq!(session.resync_count(), 0);
        assert_eq!(session.total_resyncs(), 1);
    }

    #[tokio::test]
    async fn resync_reopens_transport() {
        let mut mock = MockTransport::new();
        mock.push_bytes(&corrupt());
        mock.push_bytes(&volts());
        let reopens = mock.reopen_counter();
        let mut session = session(mock);

        let reading = session.next_reading().await.unwrap();
        assert_eq!(reading.value, Some(5.0));
        assert_eq!(session.total_resyncs(), 1);
        assert_eq!(reopens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clean_frames_never_reopen() {
        let mut mock = MockTransport::new();
        mock.push_bytes(&volts());
        mock.push_bytes(&volts());
        let reopens = mock.reopen_counter();
        let mut session = session(mock);

        session.next_reading().await.unwrap();
        session.next_reading().await.unwrap();
        assert_eq!(reopens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn short_read_discards_buffered_bytes() {
        // A burst starting mid-frame; the reopen must drop its unread tail
        // so the next read starts on a frame boundary.
        let mut mock = MockTransport::new();
        let mut burst = volts()[5..].to_vec();
        burst.extend_from_slice(&volts()[..10]);
        mock.push_bytes(&burst);
        mock.push_bytes(&volts());
        let mut session = session(mock);

        let reading = session.next_reading().await.unwrap();
        assert_eq!(reading.display, "5.00V");
        assert_eq!(session.total_resyncs(), 1);
    }

    #[tokio::test]
    async fn silent_meter_is_resync_not_error() {
        let mut mock = MockTransport::new();
        mock.push_bytes(&[0x02, 0x10, 0x20]);
        let mut session = session(mock);

        assert!(matches!(
            session.decode_next().await,
            Err(DecodeOutcome::Resynced { attempt: 1 })
        ));
        // Script exhausted: the mock times out like a silent port.
        assert!(matches!(
            session.decode_next().await,
            Err(DecodeOutcome::Resynced { attempt: 2 })
        ));
    }

    #[tokio::test]
    async fn io_error_is_fatal() {
        let mut mock = MockTransport::new();
        mock.push_io_error(std::io::ErrorKind::PermissionDenied);
        mock.push_bytes(&volts());
        let mut session = session(mock);

        match session.next_reading().await {
            Err(Error::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied),
            other => panic!("expected io error, got {other:?}"),
        }
        assert_eq!(session.total_resyncs(), 0);
    }

    #[tokio::test]
    async fn connection_lost_is_fatal() {
        let mut mock = MockTransport::new();
        mock.push_connection_lost();
        let mut session = session(mock);

        assert!(matches!(
            session.decode_next().await,
            Err(DecodeOutcome::Transport(Error::ConnectionLost))
        ));
    }

    #[tokio::test]
    async fn disconnected_transport_is_fatal() {
        let mut mock = MockTransport::new();
        mock.push_bytes(&volts());
        mock.set_connected(false);
        let reopens = mock.reopen_counter();
        let mut session = session(mock);

        assert!(!session.is_connected());
        assert!(matches!(
            session.decode_next().await,
            Err(DecodeOutcome::Transport(Error::NotConnected))
        ));
        assert_eq!(session.total_resyncs(), 0);
        assert_eq!(reopens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_reopen_is_fatal() {
        let mut mock = MockTransport::new();
        mock.push_bytes(&corrupt());
        mock.set_fail_reopen(true);
        let mut session = session(mock);

        assert!(matches!(
            session.next_reading().await,
            Err(Error::Transport(_))
        ));
    }

    #[tokio::test]
    async fn resync_ceiling() {
        let mut mock = MockTransport::new();
        for _ in 0..5 {
            mock.push_bytes(&corrupt());
        }
        let mut session = session(mock).with_max_resyncs(Some(2));

        match session.next_reading().await {
            Err(Error::ResyncExhausted(n)) => assert_eq!(n, 2),
            other => panic!("expected ceiling, got {other:?}"),
        }
        assert_eq!(session.total_resyncs(), 2);
    }

    #[tokio::test]
    async fn ceiling_counts_consecutive_resyncs_only() {
        let mut mock = MockTransport::new();
        mock.push_bytes(&corrupt());
        mock.push_bytes(&volts());
        mock.push_bytes(&corrupt());
        mock.push_bytes(&volts());
        let mut session = session(mock).with_max_resyncs(Some(1));

        assert!(session.next_reading().await.is_ok());
        assert!(session.next_reading().await.is_ok());
        assert_eq!(session.total_resyncs(), 2);
    }

    #[tokio::test]
    async fn readings_arrive_in_order() {
        let mut mock = MockTransport::new();
        let frames: Vec<[u8; FRAME_LEN]> = ["   1", "   2", "   3"]
            .iter()
            .map(|d| TestFrame::new().digits(d).bytes())
            .collect();
        mock.push_frames(frames.iter().map(|f| &f[..]));
        let mut session = session(mock);

        for expected in [1.0, 2.0, 3.0] {
            let reading = session.next_reading().await.unwrap();
            assert_eq!(reading.value, Some(expected));
        }
    }

    #[tokio::test]
    async fn probe_reading_is_not_lost() {
        let mut mock = MockTransport::new();
        mock.push_bytes(&volts());
        let mut session = session(mock);

        session.probe().await.unwrap();
        let reading = session.next_reading().await.unwrap();
        assert_eq!(reading.display, "5.00V");
    }

    #[tokio::test]
    async fn legacy_model_uses_legacy_check() {
        let mut mock = MockTransport::new();
        // Sequence nibbles are ignored by the legacy check.
        let mut bytes = volts();
        bytes[7] &= 0x0F;
        mock.push_bytes(&bytes);
        let mut session = DeviceSession::new(Box::new(mock), bm257())
            .with_settle_delay(Duration::ZERO);

        let reading = session.decode_next().await.unwrap();
        assert_eq!(reading.value, Some(5.0));
    }

    #[tokio::test]
    async fn into_transport_returns_the_transport() {
        let mut mock = MockTransport::new();
        mock.push_bytes(&volts());
        let session = session(mock);
        let transport = session.into_transport();
        assert!(transport.is_connected());
    }
}
