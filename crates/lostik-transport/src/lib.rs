//! Transport implementations for the LoStik driver.
//!
//! This crate provides [`SerialTransport`], the implementation of the
//! [`Transport`](lostik_core::Transport) trait from `lostik-core` for the
//! stick's USB virtual COM port.

pub mod serial;

pub use serial::{SerialTransport, DEFAULT_BAUD_RATE};
