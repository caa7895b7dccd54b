//! Serial port transport for the LoStik.
//!
//! The stick shows up as a USB virtual COM port (`/dev/ttyUSB0` on Linux,
//! `COM3` on Windows). Its RN2483/RN2903 module always frames characters as
//! 8N1 without flow control; only the baud rate can differ if the module was
//! reconfigured.
//!
//! ```no_run
//! use lostik_transport::SerialTransport;
//! use lostik_core::transport::Transport;
//!
//! # async fn example() -> lostik_core::Result<()> {
//! let mut stick = SerialTransport::open("/dev/ttyUSB0", 57_600).await?;
//! stick.send(b"sys get ver\r\n").await?;
//!
//! let mut buf = [0u8; 100];
//! let n = stick.receive(&mut buf).await?;
//! # Ok(())
//! # }
//! ```

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, error, trace, warn};

use lostik_core::error::{Error, Result};
use lostik_core::transport::Transport;

/// Factory baud rate of the RN2483/RN2903 module.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// The stick's USB serial port.
pub struct SerialTransport {
    stream: Option<SerialStream>,
    port_name: String,
}

impl SerialTransport {
    /// Open `port` at `baud_rate`, 8N1, no flow control.
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        debug!(port, baud_rate, "opening LoStik serial port");

        let stream = tokio_serial::new(port, baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                error!(port, error = %e, "cannot open serial port");
                Error::Transport(format!("cannot open {port}: {e}"))
            })?;

        debug!(port, "serial port open");
        Ok(SerialTransport {
            stream: Some(stream),
            port_name: port.to_string(),
        })
    }

    /// Path the port was opened with.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

/// A vanished USB device surfaces as a broken pipe or a disconnected socket.
fn map_io_error(e: io::Error) -> Error {
    match e.kind() {
        io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        trace!(port = %self.port_name, bytes = data.len(), "write");

        let written = async {
            stream.write_all(data).await?;
            stream.flush().await
        };
        written.await.map_err(|e| {
            error!(port = %self.port_name, error = %e, "write failed");
            map_io_error(e)
        })
    }

    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let n = stream.read(buf).await.map_err(|e| {
            error!(port = %self.port_name, error = %e, "read failed");
            map_io_error(e)
        })?;
        trace!(port = %self.port_name, bytes = n, data = ?String::from_utf8_lossy(&buf[..n]), "read");
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        if let Err(e) = stream.flush().await {
            warn!(port = %self.port_name, error = %e, "flush on close failed");
        }
        debug!(port = %self.port_name, "serial port closed");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}
