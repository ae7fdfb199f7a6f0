//! Error types for dmmlog.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Framing problems are not errors: they
//! are recovered inside the read session by resynchronizing the transport.
//! What reaches the caller here is what the session could not recover from.

/// The error type for all dmmlog operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port could not be opened or configured).
    #[error("transport error: {0}")]
    Transport(String),

    /// Timed out waiting for bytes from the meter.
    ///
    /// Usually the meter is switched off, its RS-232 adapter is not in
    /// transmit mode, or the baud rate is wrong.
    #[error("timeout waiting for data")]
    Timeout,

    /// No connection to the meter has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the meter was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An invalid parameter was passed to a builder or configuration.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The session reached its configured resync ceiling without
    /// receiving a valid frame.
    #[error("gave up after {0} resync attempts")]
    ResyncExhausted(u32),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
