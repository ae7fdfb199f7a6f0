//! Brymen BM25x protocol backend for dmmlog.
//!
//! The meter streams one 15-byte frame per LCD update over its optically
//! isolated interface cable. Each frame is a raw dump of the display: which
//! segments of each digit are lit and which annunciators are on. This crate
//! turns those frames into [`Reading`](dmmlog_core::Reading)s:
//!
//! - **Frame validation** ([`frame`]) -- length, header and per-byte sequence
//!   checks; anything else triggers a resync.
//! - **Bit access** ([`bits`]) -- MSB-first bit positions within the frame.
//! - **Field extraction** ([`fields`]) -- coupling, prefix, unit, sign,
//!   decimal points and status annunciators.
//! - **Segment decoding** ([`segments`]) -- versioned seven-segment tables.
//! - **Value assembly** ([`value`]) -- display text to number and quantity,
//!   including temperature and electric-field displays.
//! - **Model definitions** ([`models`]) -- the BM257 and BM257s revisions.
//! - **Reading builder** ([`reading`]) and **device session** ([`session`])
//!   -- the read loop with transport resync.
//! - **SessionBuilder** ([`builder`]) and the background task ([`io`]).
//!
//! # Example
//!
//! ```
//! use dmmlog_brymen::models::bm257s;
//! use dmmlog_brymen::reading::decode;
//! use dmmlog_core::{Coupling, Quantity};
//! use std::time::SystemTime;
//!
//! // " 5.00" V DC
//! let frame = [0x02, 0x14, 0x20, 0x30, 0x40, 0x5C, 0x67, 0x7F, 0x8B, 0x9E, 0xAB, 0xB0, 0xC0, 0xD0, 0xE4];
//! let reading = decode(&frame, &bm257s(), SystemTime::now()).unwrap();
//! assert_eq!(reading.value, Some(5.0));
//! assert_eq!(reading.quantity, Quantity::Voltage(Coupling::Dc));
//! assert_eq!(reading.display, "5.00V");
//! ```

pub mod bits;
pub mod builder;
pub mod fields;
pub mod frame;
pub mod io;
pub mod models;
pub mod reading;
pub mod segments;
pub mod session;
pub mod value;

pub use builder::SessionBuilder;
pub use io::{SessionHandle, spawn_session};
pub use models::BrymenModel;
pub use session::{DecodeOutcome, DeviceSession};
