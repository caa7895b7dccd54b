//! Host-side driver for the LoStik LoRa USB radio.
//!
//! The stick carries a Microchip RN2483/RN2903 module that is driven with
//! `\r\n`-terminated text commands over a USB serial port. This crate
//! provides:
//!
//! - **Radio controller** ([`radio`]) -- [`LoStik::init`], [`LoStik::tx`] and
//!   [`LoStik::rx`], including recovery from the module's spurious
//!   `radio_err` after a receive acknowledgement.
//! - **Command vocabulary** ([`commands`]) -- the command lines sent and the
//!   checks applied to the replies.
//! - **Indicator LEDs** ([`indicator`]) -- red/blue LED control and blink
//!   patterns.
//! - **Builder** ([`builder`]) -- [`LoStikBuilder`] with defaults that work
//!   for a stock stick.
//!
//! # Example
//!
//! ```no_run
//! use lostik::LoStikBuilder;
//!
//! # async fn example() -> lostik_core::Result<()> {
//! let stick = LoStikBuilder::new().serial_port("/dev/ttyUSB0").build().await?;
//! stick.init().await?;
//! stick.tx(b"Hello").await?;
//! let frame = stick.rx().await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod commands;
pub mod indicator;
pub mod radio;

pub use builder::LoStikBuilder;
pub use indicator::Led;
pub use lostik_core::{Error, Result};
pub use radio::LoStik;
