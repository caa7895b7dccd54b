//! Status LEDs on the stick.
//!
//! The red and blue LEDs hang off module GPIO pins and are switched with
//! `sys set pindig`. The module answers these commands, but the replies are
//! not read here; they drain into the next response read.

use std::fmt;
use std::time::Duration;

use lostik_core::error::Result;

use crate::commands;
use crate::radio::LoStik;

/// One of the two indicator LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Led {
    Red,
    Blue,
}

impl Led {
    /// Module GPIO pin driving this LED.
    pub fn pin(self) -> &'static str {
        match self {
            Led::Red => "GPIO11",
            Led::Blue => "GPIO10",
        }
    }
}

impl fmt::Display for Led {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Led::Red => write!(f, "red"),
            Led::Blue => write!(f, "blue"),
        }
    }
}

impl LoStik {
    /// Switch an LED on or off.
    pub async fn set_led(&self, led: Led, on: bool) -> Result<()> {
        self.engine
            .write_command(&commands::cmd_set_pin(led.pin(), on))
            .await
    }

    pub async fn red_led_on(&self) -> Result<()> {
        self.set_led(Led::Red, true).await
    }

    pub async fn red_led_off(&self) -> Result<()> {
        self.set_led(Led::Red, false).await
    }

    pub async fn blue_led_on(&self) -> Result<()> {
        self.set_led(Led::Blue, true).await
    }

    pub async fn blue_led_off(&self) -> Result<()> {
        self.set_led(Led::Blue, false).await
    }

    /// Short red blink: 200 ms pause, 200 ms on.
    pub async fn receiving_led_pattern(&self) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.red_led_on().await?;
        tokio::time::sleep(Duration::from_millis(200)).await;
        self.red_led_off().await
    }

    /// Long blue blink: 500 ms pause, 2 s on.
    pub async fn sending_led_pattern(&self) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        self.blue_led_on().await?;
        tokio::time::sleep(Duration::from_secs(2)).await;
        self.blue_led_off().await
    }

    /// Sending pattern followed by the receiving pattern.
    pub async fn sending_receiving_led_pattern(&self) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        self.sending_led_pattern().await?;
        tokio::time::sleep(Duration::from_millis(1275)).await;
        self.receiving_led_pattern().await
    }
}
