//! dmmlog-test-harness: Test utilities and mock transports for dmmlog.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! frame decoders and read sessions without a meter attached.

pub mod mock_serial;

pub use mock_serial::MockTransport;
