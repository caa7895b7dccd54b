//! Transport trait for device communication.
//!
//! The [`Transport`] trait abstracts over the physical link to the LoStik.
//! The serial implementation lives in `lostik-transport`; a scripted mock
//! lives in `lostik-test-harness`.
//!
//! The command/response engine in `lostik-text-io` operates on a
//! `Transport` rather than directly on a serial port, so the same protocol
//! code runs against real hardware and against deterministic test doubles.

use async_trait::async_trait;

use crate::error::Result;

/// Asynchronous byte-level transport to the device.
///
/// A transport is a plain byte pipe: it holds no protocol state and is not
/// safe for concurrent writers. Callers serialize access.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the device.
    ///
    /// Implementations should return only once all bytes have been handed
    /// to the underlying channel.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the device into the provided buffer.
    ///
    /// Waits until at least one byte is available and returns the number of
    /// bytes read. `Ok(0)` signals end of stream. There is no deadline here;
    /// callers that need one must impose it from outside.
    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
