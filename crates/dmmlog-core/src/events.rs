//! Meter session event types.
//!
//! A background read session publishes [`MeterEvent`]s through a bounded
//! channel. Plotters and file writers consume them in acquisition order.

use crate::types::Reading;

/// An event emitted by a running meter session.
#[derive(Debug, Clone, PartialEq)]
pub enum MeterEvent {
    /// A frame was decoded.
    Reading(Reading),

    /// A corrupt or misaligned frame was discarded and the transport was
    /// reopened.
    Resynced {
        /// Consecutive resync count since the last good frame (1-based).
        attempt: u32,
    },

    /// The session stopped because the transport failed or the resync
    /// ceiling was reached.
    Disconnected {
        /// Description of the terminating error.
        reason: String,
    },
}
