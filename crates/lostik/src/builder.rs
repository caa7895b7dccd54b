//! LoStikBuilder -- fluent builder for constructing [`LoStik`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! serial parameters, deadlines and settle delays before the transport is
//! opened.
//!
//! # Example
//!
//! ```no_run
//! use lostik::LoStikBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> lostik_core::Result<()> {
//! let stick = LoStikBuilder::new()
//!     .serial_port("/dev/ttyUSB0")
//!     .response_timeout(Duration::from_secs(10))
//!     .build()
//!     .await?;
//! stick.init().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use lostik_core::error::{Error, Result};
use lostik_core::transport::Transport;
use lostik_transport::{SerialTransport, DEFAULT_BAUD_RATE};

use crate::commands::DEFAULT_INIT_COMMANDS;
use crate::radio::LoStik;

/// Fluent builder for [`LoStik`].
///
/// Every setting has a default that works with a stock stick, so the
/// simplest usage only names the port.
#[derive(Debug, Clone)]
pub struct LoStikBuilder {
    serial_port: Option<String>,
    baud_rate: u32,
    response_timeout: Duration,
    wake_settle: Duration,
    rx_tx_settle: Duration,
    command_spacing: Duration,
    init_commands: Vec<String>,
}

impl LoStikBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        LoStikBuilder {
            serial_port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            response_timeout: Duration::from_secs(15),
            wake_settle: Duration::from_secs(1),
            rx_tx_settle: Duration::from_millis(300),
            command_spacing: Duration::from_millis(500),
            init_commands: DEFAULT_INIT_COMMANDS.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the baud rate (default: 57600).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Set the deadline for each response read (default: 15s).
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set the pause after the wake command during init (default: 1s).
    pub fn wake_settle(mut self, delay: Duration) -> Self {
        self.wake_settle = delay;
        self
    }

    /// Set the pause between a `radio tx`/`radio rx` command and its first
    /// read (default: 300ms).
    pub fn rx_tx_settle(mut self, delay: Duration) -> Self {
        self.rx_tx_settle = delay;
        self
    }

    /// Set the pause after each init command (default: 500ms).
    pub fn command_spacing(mut self, spacing: Duration) -> Self {
        self.command_spacing = spacing;
        self
    }

    /// Replace the init command sequence.
    ///
    /// The sequence must produce a four-line reply ending in `ok`.
    pub fn init_commands<S: AsRef<str>>(mut self, commands: &[S]) -> Self {
        self.init_commands = commands.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }

    /// Build a [`LoStik`] with a caller-provided transport.
    ///
    /// This is the entry point for tests (pass a `MockTransport` from
    /// `lostik-test-harness`) and for callers that manage the transport
    /// themselves.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<LoStik> {
        if self.init_commands.iter().all(|c| c.is_empty()) {
            return Err(Error::InvalidParameter(
                "init command sequence must not be empty".into(),
            ));
        }

        Ok(LoStik::new(
            transport,
            self.response_timeout,
            self.wake_settle,
            self.rx_tx_settle,
            self.command_spacing,
            self.init_commands,
        ))
    }

    /// Build a [`LoStik`] over a serial port.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<LoStik> {
        let port = self
            .serial_port
            .as_deref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;

        let transport = SerialTransport::open(port, self.baud_rate).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}

impl Default for LoStikBuilder {
    fn default() -> Self {
        Self::new()
    }
}
