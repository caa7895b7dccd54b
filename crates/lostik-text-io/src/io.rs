//! The command/response engine.
//!
//! [`CommandEngine`] owns the transport behind an `Arc<Mutex<>>` and
//! provides the three primitives the radio controller is built from:
//! writing one command line, reading one response under a deadline, and
//! writing a sequence of commands.
//!
//! Every [`read_response`](CommandEngine::read_response) spawns a fresh
//! reader task. The task reports its outcome only through a `oneshot`
//! channel; the caller races that channel against the deadline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tracing::{debug, trace, warn};

use lostik_core::error::{Error, Result};
use lostik_core::transport::Transport;

use crate::protocol::{self, READ_CHUNK_SIZE};

/// Write-then-read exchange logic over a shared transport.
pub struct CommandEngine {
    transport: Arc<Mutex<Box<dyn Transport>>>,
    /// Pause after each command of a sequence.
    command_spacing: Duration,
    /// Set while a timed-out reader task still holds the transport.
    reader_abandoned: Arc<AtomicBool>,
}

impl CommandEngine {
    /// Wrap a transport. Command spacing starts at zero.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        CommandEngine {
            transport: Arc::new(Mutex::new(transport)),
            command_spacing: Duration::ZERO,
            reader_abandoned: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set the pause [`exec_sequence`](Self::exec_sequence) inserts after
    /// each command it writes.
    pub fn with_command_spacing(mut self, spacing: Duration) -> Self {
        self.command_spacing = spacing;
        self
    }

    /// The pause inserted after each sequenced command.
    pub fn command_spacing(&self) -> Duration {
        self.command_spacing
    }

    /// Write `line` followed by `\r\n` in a single transport write.
    ///
    /// Fails with [`Error::InvalidParameter`] if `line` itself contains
    /// `\r\n`.
    pub async fn write_command(&self, line: &str) -> Result<()> {
        let bytes = protocol::encode_command(line)?;
        debug!(command = line, "writing command");
        let mut transport = self.transport.lock().await;
        transport.send(&bytes).await
    }

    /// Read one response, giving up after `deadline`.
    ///
    /// Returns the response text with `\r` removed and one trailing `\n`
    /// trimmed. A hard I/O error from the reader is returned as-is; an
    /// elapsed deadline yields [`Error::Timeout`].
    ///
    /// The transport read cannot be cancelled. When the deadline elapses the
    /// reader task is left running and keeps the transport locked until its
    /// in-flight read returns, and it will consume whatever the device sends
    /// next. Any further use of this engine after a timeout is unreliable;
    /// reopen the connection instead. [`close`](Self::close) still returns
    /// promptly in that state.
    pub async fn read_response(&self, deadline: Duration) -> Result<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let transport = Arc::clone(&self.transport);
        let abandoned = Arc::clone(&self.reader_abandoned);

        tokio::spawn(async move {
            let mut transport = transport.lock().await;
            let result = read_until_complete(&mut **transport).await;
            drop(transport);
            abandoned.store(false, Ordering::Release);
            let _ = reply_tx.send(result);
        });

        match tokio::time::timeout(deadline, reply_rx).await {
            Ok(Ok(Ok(response))) => {
                debug!(response = %response, "response received");
                Ok(response)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(Error::ConnectionLost),
            Err(_) => {
                self.reader_abandoned.store(true, Ordering::Release);
                warn!(
                    deadline_ms = deadline.as_millis() as u64,
                    "deadline elapsed, abandoning in-flight read"
                );
                Err(Error::Timeout)
            }
        }
    }

    /// Write each non-empty command in order, stopping at the first failure.
    ///
    /// Every written command, the last one included, is followed by the
    /// command spacing so the device has answered it before the caller
    /// reads. Empty strings are skipped and do not trigger the spacing.
    pub async fn exec_sequence<S: AsRef<str>>(&self, commands: &[S]) -> Result<()> {
        for cmd in commands.iter().map(AsRef::as_ref).filter(|c| !c.is_empty()) {
            self.write_command(cmd).await?;
            if !self.command_spacing.is_zero() {
                tokio::time::sleep(self.command_spacing).await;
            }
        }
        Ok(())
    }

    /// Close the underlying transport.
    ///
    /// If a timed-out reader is still blocked on the transport, the close is
    /// skipped; the transport is released once that read returns.
    pub async fn close(&self) -> Result<()> {
        let mut transport = if self.reader_abandoned.load(Ordering::Acquire) {
            match self.transport.try_lock() {
                Ok(transport) => transport,
                Err(_) => {
                    warn!("transport held by an abandoned read, skipping close");
                    return Ok(());
                }
            }
        } else {
            self.transport.lock().await
        };
        transport.close().await
    }
}

/// Read chunks until the framing rules say the response is complete.
async fn read_until_complete(transport: &mut dyn Transport) -> Result<String> {
    let mut buf = [0u8; READ_CHUNK_SIZE];
    let mut accumulated = Vec::new();

    loop {
        let n = transport.receive(&mut buf).await?;
        let chunk = &buf[..n];
        accumulated.extend_from_slice(chunk);

        let termination = protocol::classify_chunk(&accumulated, chunk, n);
        trace!(bytes = n, ?termination, "response chunk");
        if termination.is_complete() {
            return Ok(protocol::finalize_response(&accumulated));
        }
    }
}
