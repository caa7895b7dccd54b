//! LoStik command vocabulary and response checks.
//!
//! Only the subset of the RN2483/RN2903 command set needed to bring the
//! radio up, transmit, receive and drive the indicator LEDs. Builders here
//! return command lines without the `\r\n` terminator; the engine adds it.

use lostik_core::error::{Error, Result};

/// Version query, also used to wake the module from sleep.
pub const SYS_GET_VER: &str = "sys get ver";

/// Query the modulation mode.
pub const RADIO_GET_MOD: &str = "radio get mod";

/// Query the spreading factor.
pub const RADIO_GET_SF: &str = "radio get sf";

/// Pause the LoRaWAN MAC layer so the radio can be driven directly.
pub const MAC_PAUSE: &str = "mac pause";

/// Set the transmit power to 10 dBm.
pub const RADIO_SET_PWR_10: &str = "radio set pwr 10";

/// Enter continuous receive mode (no device-side timeout).
pub const RADIO_RX: &str = "radio rx 0";

/// Initialization sequence used when the caller does not supply one.
pub const DEFAULT_INIT_COMMANDS: [&str; 4] =
    [RADIO_GET_MOD, RADIO_GET_SF, MAC_PAUSE, RADIO_SET_PWR_10];

/// Number of reply lines a successful four-command init produces.
pub const INIT_RESPONSE_LINES: usize = 4;

/// Command accepted.
pub const RESPONSE_OK: &str = "ok";

/// Transmission finished over the air.
pub const RESPONSE_TX_OK: &str = "radio_tx_ok";

/// Received frame notification, followed by the hex payload.
pub const RESPONSE_RX: &str = "radio_rx";

/// Receive error. Directly after an `ok` this is a known false alarm.
pub const RESPONSE_RADIO_ERR: &str = "radio_err";

/// Build a `radio tx` command carrying `payload` as lowercase hex.
///
/// ```
/// use lostik::commands::cmd_radio_tx;
///
/// assert_eq!(cmd_radio_tx(&[0xDE, 0xAD]), "radio tx dead");
/// ```
pub fn cmd_radio_tx(payload: &[u8]) -> String {
    format!("radio tx {}", hex::encode(payload))
}

/// Build a `sys set pindig` command driving a GPIO pin high or low.
pub fn cmd_set_pin(pin: &str, on: bool) -> String {
    format!("sys set pindig {} {}", pin, if on { 1 } else { 0 })
}

/// Check the combined reply to the init sequence.
///
/// Succeeds only for exactly [`INIT_RESPONSE_LINES`] lines with `ok` last.
pub fn parse_init_response(response: &str) -> Result<()> {
    let lines: Vec<&str> = response.split('\n').collect();
    if lines.len() != INIT_RESPONSE_LINES || lines[INIT_RESPONSE_LINES - 1] != RESPONSE_OK {
        return Err(Error::InitFailed);
    }
    Ok(())
}

/// Whether a response acknowledges the command.
pub fn is_ack(response: &str) -> bool {
    response.starts_with(RESPONSE_OK)
}

/// Whether a response reports a completed transmission.
pub fn is_tx_complete(response: &str) -> bool {
    response.ends_with(RESPONSE_TX_OK)
}

/// Whether a response is the spurious receive error.
pub fn is_radio_err(response: &str) -> bool {
    response.starts_with(RESPONSE_RADIO_ERR)
}

/// Extract the payload from a `radio_rx <hex>` notification.
pub fn parse_rx_response(response: &str) -> Result<Vec<u8>> {
    let data = response.strip_prefix(RESPONSE_RX).ok_or(Error::RxFailed)?;
    Ok(hex::decode(data.trim())?)
}
