//! lostik-test-harness: test utilities for the LoStik driver.
//!
//! This crate provides [`MockTransport`], a scripted device for
//! deterministic testing of the command/response engine and the radio
//! controller without real hardware.

pub mod mock_serial;

pub use mock_serial::MockTransport;
