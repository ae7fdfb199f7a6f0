//! Background read task for a [`DeviceSession`].
//!
//! [`spawn_session`] moves the session onto its own Tokio task, which owns
//! the transport exclusively and publishes [`MeterEvent`]s into a bounded
//! channel in acquisition order. Stopping is cooperative: the cancellation
//! token is checked before every frame read and while waiting for channel
//! capacity.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dmmlog_core::error::{Error, Result};
use dmmlog_core::events::MeterEvent;
use dmmlog_core::transport::Transport;

use crate::session::{DecodeOutcome, DeviceSession};

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Handle to a running session task.
pub struct SessionHandle {
    events: mpsc::Receiver<MeterEvent>,
    cancel: CancellationToken,
    task: JoinHandle<DeviceSession>,
}

impl SessionHandle {
    /// Next event, or `None` once the task has stopped and the queue is
    /// drained.
    pub async fn recv(&mut self) -> Option<MeterEvent> {
        self.events.recv().await
    }

    /// A token that stops the task when cancelled. Cloning it lets a signal
    /// handler stop the session while another task consumes events.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the task and recover the transport.
    pub async fn shutdown(self) -> Result<Box<dyn Transport>> {
        self.cancel.cancel();
        // Unblock a task waiting on a full queue.
        drop(self.events);
        let session = self
            .task
            .await
            .map_err(|e| Error::Transport(format!("session task failed: {e}")))?;
        Ok(session.into_transport())
    }
}

/// Spawn the read loop. `capacity` bounds the number of undelivered events;
/// when the consumer falls behind, the loop waits rather than dropping
/// readings.
pub fn spawn_session(session: DeviceSession, capacity: usize) -> SessionHandle {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let cancel = CancellationToken::new();
    let task = tokio::spawn(session_loop(session, tx, cancel.clone()));

    SessionHandle {
        events: rx,
        cancel,
        task,
    }
}

async fn session_loop(
    mut session: DeviceSession,
    tx: mpsc::Sender<MeterEvent>,
    cancel: CancellationToken,
) -> DeviceSession {
    loop {
        if cancel.is_cancelled() {
            debug!("session task cancelled");
            break;
        }

        let outcome = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("session task cancelled during read");
                break;
            }

            outcome = session.decode_next() => outcome,
        };

        let (event, last) = match outcome {
            Ok(reading) => (MeterEvent::Reading(reading), false),
            Err(DecodeOutcome::Resynced { attempt }) => (MeterEvent::Resynced { attempt }, false),
            Err(DecodeOutcome::Transport(e)) => {
                warn!(error = %e, "meter session stopped");
                (
                    MeterEvent::Disconnected {
                        reason: e.to_string(),
                    },
                    true,
                )
            }
        };

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("session task cancelled while publishing");
                break;
            }

            sent = tx.send(event) => {
                if sent.is_err() {
                    debug!("event receiver dropped, exiting session task");
                    break;
                }
            }
        }

        if last {
            break;
        }
    }
    session
}
