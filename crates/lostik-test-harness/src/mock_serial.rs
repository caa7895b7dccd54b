//! Mock transport for deterministic testing of the command/response engine.
//!
//! [`MockTransport`] implements the [`Transport`] trait as a scripted
//! device. Each expectation pairs the exact bytes a command should put on
//! the wire with the chunks the device emits in reply. Every queued chunk
//! is handed out by exactly one `receive()` call, which lets tests control
//! how a response is split across reads.
//!
//! When no chunk is queued, `receive()` waits, the way a blocking serial
//! read on a silent device would. A later `send()` or
//! [`push_chunks`](MockTransport::push_chunks) wakes it.
//!
//! For timing-sensitive tests the mock can behave more like a UART:
//! [`set_reply_delay`](MockTransport::set_reply_delay) makes replies arrive
//! some time after the command is written, and
//! [`set_merge_reads`](MockTransport::set_merge_reads) makes one `receive()`
//! drain everything buffered so far.
//!
//! # Example
//!
//! ```
//! use lostik_test_harness::MockTransport;
//!
//! let mock = MockTransport::new();
//! mock.expect(b"radio tx dead\r\n", &[b"ok\r\n", b"radio_tx_ok\r\n"]);
//! assert_eq!(mock.remaining_expectations(), 1);
//! ```
//!
//! The mock is `Clone`; clones share state, so a test can hand one clone to
//! the driver and keep another to inspect what was sent.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;

use lostik_core::error::{Error, Result};
use lostik_core::transport::Transport;

/// A pre-loaded request and the chunks the device answers with.
#[derive(Debug, Clone)]
struct Expectation {
    request: Vec<u8>,
    chunks: Vec<Vec<u8>>,
}

#[derive(Debug)]
struct MockState {
    expectations: VecDeque<Expectation>,
    /// Chunks waiting to be returned by `receive()`, one per call.
    pending: VecDeque<Vec<u8>>,
    /// Error kind to fail the next `receive()` with.
    read_error: Option<std::io::ErrorKind>,
    connected: bool,
    sent_log: Vec<Vec<u8>>,
    /// Time between a matching `send()` and its reply becoming readable.
    reply_delay: Duration,
    /// Hand out all buffered chunks in one `receive()`.
    merge_reads: bool,
}

/// A scripted [`Transport`] for testing without hardware.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    data_ready: Arc<Notify>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            state: Arc::new(Mutex::new(MockState {
                expectations: VecDeque::new(),
                pending: VecDeque::new(),
                read_error: None,
                connected: true,
                sent_log: Vec::new(),
                reply_delay: Duration::ZERO,
                merge_reads: false,
            })),
            data_ready: Arc::new(Notify::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock transport state poisoned")
    }

    /// Add an expected request and the chunks the device replies with.
    ///
    /// An empty `chunks` slice models a command the device does not answer.
    /// An empty chunk (`b""`) is delivered as end of stream.
    pub fn expect(&self, request: &[u8], chunks: &[&[u8]]) {
        self.state().expectations.push_back(Expectation {
            request: request.to_vec(),
            chunks: chunks.iter().map(|c| c.to_vec()).collect(),
        });
    }

    /// Queue chunks for reading without waiting for a request.
    pub fn push_chunks(&self, chunks: &[&[u8]]) {
        self.state()
            .pending
            .extend(chunks.iter().map(|c| c.to_vec()));
        self.data_ready.notify_one();
    }

    /// Fail the next `receive()` call with an I/O error of the given kind.
    pub fn fail_next_receive(&self, kind: std::io::ErrorKind) {
        self.state().read_error = Some(kind);
        self.data_ready.notify_one();
    }

    /// Return a copy of all data that has been sent through this transport.
    ///
    /// Each element is the byte slice from one `send()` call.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.state().sent_log.clone()
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.state().expectations.len()
    }

    /// Return the number of chunks still waiting to be read.
    pub fn unread_chunks(&self) -> usize {
        self.state().pending.len()
    }

    /// Delay every scripted reply by `delay` after its request is sent.
    ///
    /// Delayed replies are delivered from a spawned tokio task, so this
    /// needs a running runtime.
    pub fn set_reply_delay(&self, delay: Duration) {
        self.state().reply_delay = delay;
    }

    /// When enabled, `receive()` returns every buffered chunk at once (up to
    /// the buffer size) instead of one chunk per call.
    pub fn set_merge_reads(&self, merge: bool) {
        self.state().merge_reads = merge;
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` and `receive()` calls will
    /// return [`Error::NotConnected`].
    pub fn set_connected(&self, connected: bool) {
        self.state().connected = connected;
        self.data_ready.notify_one();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy queued chunks into `buf` until it is full or an end-of-stream chunk
/// is next.
fn drain_buffered(pending: &mut VecDeque<Vec<u8>>, buf: &mut [u8]) -> usize {
    let mut n = 0;
    while n < buf.len() {
        let Some(mut chunk) = pending.pop_front() else {
            break;
        };
        if chunk.is_empty() {
            pending.push_front(chunk);
            break;
        }
        let take = chunk.len().min(buf.len() - n);
        buf[n..n + take].copy_from_slice(&chunk[..take]);
        n += take;
        if take < chunk.len() {
            pending.push_front(chunk.split_off(take));
        }
    }
    n
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.state();
        if !state.connected {
            return Err(Error::NotConnected);
        }

        state.sent_log.push(data.to_vec());

        let expectation = state.expectations.pop_front().ok_or_else(|| {
            Error::Protocol("no more expectations in mock transport".into())
        })?;
        if data != expectation.request.as_slice() {
            return Err(Error::Protocol(format!(
                "unexpected send data: expected {:?}, got {:?}",
                String::from_utf8_lossy(&expectation.request),
                String::from_utf8_lossy(data)
            )));
        }

        if expectation.chunks.is_empty() {
            return Ok(());
        }

        let delay = state.reply_delay;
        if delay.is_zero() {
            state.pending.extend(expectation.chunks);
            drop(state);
            self.data_ready.notify_one();
        } else {
            drop(state);
            let shared = Arc::clone(&self.state);
            let data_ready = Arc::clone(&self.data_ready);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Ok(mut state) = shared.lock() {
                    if state.connected {
                        state.pending.extend(expectation.chunks);
                    }
                }
                data_ready.notify_one();
            });
        }
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            {
                let mut state = self.state();
                if !state.connected {
                    return Err(Error::NotConnected);
                }
                if let Some(kind) = state.read_error.take() {
                    return Err(Error::Io(std::io::Error::new(kind, "mock read failure")));
                }
                if state.merge_reads && state.pending.front().is_some_and(|c| !c.is_empty()) {
                    return Ok(drain_buffered(&mut state.pending, buf));
                }
                if let Some(mut chunk) = state.pending.pop_front() {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        state.pending.push_front(chunk.split_off(n));
                    }
                    return Ok(n);
                }
            }
            self.data_ready.notified().await;
        }
    }

    async fn close(&mut self) -> Result<()> {
        {
            let mut state = self.state();
            state.connected = false;
            state.pending.clear();
        }
        self.data_ready.notify_one();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state().connected
    }
}
