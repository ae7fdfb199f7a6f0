//! dmmlog-core: Core traits, types, and error definitions for dmmlog.
//!
//! This crate defines the meter-agnostic abstractions shared by every
//! protocol decoder. Loggers and plotters depend on these types without
//! pulling in a specific meter driver or a serial port library.
//!
//! # Key types
//!
//! - [`Reading`] -- one decoded display snapshot
//! - [`Quantity`] / [`StatusFlags`] -- what was measured and which annunciators were lit
//! - [`Transport`] -- byte-level communication channel
//! - [`MeterEvent`] -- notifications from a background read session
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod events;
pub mod helpers;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use events::MeterEvent;
pub use helpers::{LogFormat, NO_VALUE, format_log_line, format_value};
pub use transport::Transport;
pub use types::*;
