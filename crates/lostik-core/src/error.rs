//! Error types for the LoStik driver.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport failures, deadline expiry and
//! the radio-level handshake failures are all captured here.

/// The error type for all LoStik operations.
///
/// Variants are constructed fresh at each failure site; none of them carry
/// shared state.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (opening or configuring the serial port).
    #[error("transport error: {0}")]
    Transport(String),

    /// The device answered with something other than what a scripted
    /// exchange expected.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No qualifying response arrived before the read deadline.
    ///
    /// The reader task may still be blocked on the transport. Treat the
    /// connection as unusable and reopen it.
    #[error("timeout waiting for response")]
    Timeout,

    /// The radio initialization handshake returned an unexpected response.
    #[error("problem initialising radio")]
    InitFailed,

    /// The device did not acknowledge or complete a transmission.
    #[error("failed transmitting data")]
    TxFailed,

    /// The final receive response did not carry a `radio_rx` frame.
    #[error("failed receiving data")]
    RxFailed,

    /// A received payload was not valid hex.
    #[error("payload decode error: {0}")]
    Decode(#[from] hex::FromHexError),

    /// An invalid parameter was passed to a command or builder.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The transport has been closed.
    #[error("not connected")]
    NotConnected,

    /// The connection to the device was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
