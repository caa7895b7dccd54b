//! lostik-core: error definitions and the transport trait for the LoStik
//! driver.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod transport;

pub use error::{Error, Result};
pub use transport::Transport;
