//! Command/response engine for the LoStik's text protocol.
//!
//! The device answers `\r\n`-terminated command lines with responses that
//! have no explicit framing. This crate writes commands and reads responses
//! back under a deadline, deciding heuristically where a response ends.
//!
//! # Architecture
//!
//! - [`protocol`] -- command encoding and the response termination rules
//! - [`io`] -- [`CommandEngine`](io::CommandEngine): write, deadline-raced read,
//!   command sequences

pub mod io;
pub mod protocol;

pub use io::CommandEngine;
