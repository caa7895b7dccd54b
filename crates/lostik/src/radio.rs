//! LoStik -- the radio controller.
//!
//! Ties the command vocabulary ([`commands`]) to a [`CommandEngine`] to
//! bring the radio up, transmit a frame and receive a frame. Each operation
//! is a short fixed sequence of writes and deadline-bounded reads executed
//! strictly in order.
//!
//! The device keeps all radio configuration itself; nothing is mirrored
//! here. [`tx`](LoStik::tx) and [`rx`](LoStik::rx) assume a prior
//! successful [`init`](LoStik::init) and do not check for it.

use std::time::Duration;

use tracing::{debug, info};

use lostik_core::error::{Error, Result};
use lostik_core::transport::Transport;
use lostik_text_io::CommandEngine;

use crate::commands;

/// A connected LoStik.
///
/// Constructed via [`LoStikBuilder`](crate::builder::LoStikBuilder).
pub struct LoStik {
    pub(crate) engine: CommandEngine,
    response_timeout: Duration,
    wake_settle: Duration,
    rx_tx_settle: Duration,
    init_commands: Vec<String>,
}

impl LoStik {
    /// Create a new `LoStik` from its constituent parts.
    ///
    /// Called by the builder; use [`LoStikBuilder`](crate::builder::LoStikBuilder).
    pub(crate) fn new(
        transport: Box<dyn Transport>,
        response_timeout: Duration,
        wake_settle: Duration,
        rx_tx_settle: Duration,
        command_spacing: Duration,
        init_commands: Vec<String>,
    ) -> Self {
        LoStik {
            engine: CommandEngine::new(transport).with_command_spacing(command_spacing),
            response_timeout,
            wake_settle,
            rx_tx_settle,
            init_commands,
        }
    }

    /// Deadline applied to each individual response read.
    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// The command sequence [`init`](Self::init) sends.
    pub fn init_commands(&self) -> &[String] {
        &self.init_commands
    }

    /// Query the module firmware version, e.g.
    /// `RN2483 1.0.1 Dec 15 2015 09:38:09`.
    pub async fn version(&self) -> Result<String> {
        self.engine.write_command(commands::SYS_GET_VER).await?;
        let response = self.engine.read_response(self.response_timeout).await?;
        Ok(response.trim().to_string())
    }

    /// Initialize the radio with the configured command sequence.
    pub async fn init(&self) -> Result<()> {
        self.run_init(&self.init_commands).await
    }

    /// Initialize the radio with a caller-supplied command sequence.
    ///
    /// An empty slice falls back to the configured sequence. Empty strings
    /// inside the sequence are skipped. The combined reply must still be
    /// four lines ending in `ok`.
    pub async fn init_with<S: AsRef<str>>(&self, init_commands: &[S]) -> Result<()> {
        if init_commands.is_empty() {
            return self.init().await;
        }
        self.run_init(init_commands).await
    }

    async fn run_init<S: AsRef<str>>(&self, init_commands: &[S]) -> Result<()> {
        // Wake the module; its first reply after sleep can take a while.
        self.engine.write_command(commands::SYS_GET_VER).await?;
        let version = self.engine.read_response(self.response_timeout).await?;
        debug!(version = %version, "module awake");

        tokio::time::sleep(self.wake_settle).await;

        self.engine.exec_sequence(init_commands).await?;

        let response = self.engine.read_response(self.response_timeout).await?;
        commands::parse_init_response(&response).inspect_err(|_| {
            debug!(response = %response, "unexpected init response");
        })?;

        info!("radio initialised");
        Ok(())
    }

    /// Transmit `payload` over the air.
    ///
    /// Waits for the command acknowledgement and then for the separate
    /// over-the-air completion notice, each under its own deadline.
    pub async fn tx(&self, payload: &[u8]) -> Result<()> {
        self.engine
            .write_command(&commands::cmd_radio_tx(payload))
            .await?;

        tokio::time::sleep(self.rx_tx_settle).await;

        let ack = self.engine.read_response(self.response_timeout).await?;
        if !commands::is_ack(&ack) {
            debug!(response = %ack, "transmit not acknowledged");
            return Err(Error::TxFailed);
        }

        let done = self.engine.read_response(self.response_timeout).await?;
        if !commands::is_tx_complete(&done) {
            debug!(response = %done, "transmit did not complete");
            return Err(Error::TxFailed);
        }

        debug!(bytes = payload.len(), "frame transmitted");
        Ok(())
    }

    /// Receive one frame and return its payload.
    ///
    /// A `radio_err` right after the receive acknowledgement is a known
    /// module defect: the receiver is re-armed once, its acknowledgement
    /// discarded, and the next response taken as the frame notification.
    pub async fn rx(&self) -> Result<Vec<u8>> {
        self.engine.write_command(commands::RADIO_RX).await?;

        tokio::time::sleep(self.rx_tx_settle).await;

        let mut response = self.engine.read_response(self.response_timeout).await?;
        if commands::is_ack(&response) {
            response = self.engine.read_response(self.response_timeout).await?;

            if commands::is_radio_err(&response) {
                debug!("spurious radio_err after ok, re-arming receiver");
                self.engine.write_command(commands::RADIO_RX).await?;
                self.engine.read_response(self.response_timeout).await?;
                response = self.engine.read_response(self.response_timeout).await?;
            }
        }

        let payload = commands::parse_rx_response(&response).inspect_err(|_| {
            debug!(response = %response, "no frame in receive response");
        })?;
        debug!(bytes = payload.len(), "frame received");
        Ok(payload)
    }

    /// Close the connection to the stick.
    pub async fn close(&self) -> Result<()> {
        self.engine.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::LoStikBuilder;
    use lostik_test_harness::MockTransport;

    const VERSION: &[u8] = b"RN2483 1.0.1 Dec 15 2015 09:38:09\r\n";

    async fn stick(mock: &MockTransport) -> LoStik {
        LoStikBuilder::new()
            .response_timeout(Duration::from_millis(500))
            .wake_settle(Duration::ZERO)
            .rx_tx_settle(Duration::ZERO)
            .command_spacing(Duration::ZERO)
            .build_with_transport(Box::new(mock.clone()))
            .await
            .unwrap()
    }

    fn expect_init_sequence(mock: &MockTransport, reply: &[u8]) {
        mock.expect(b"sys get ver\r\n", &[VERSION]);
        mock.expect(b"radio get mod\r\n", &[]);
        mock.expect(b"radio get sf\r\n", &[]);
        mock.expect(b"mac pause\r\n", &[]);
        mock.expect(b"radio set pwr 10\r\n", &[reply]);
    }

    // =======================================================================
    // init
    // =======================================================================

    #[tokio::test]
    async fn init_succeeds_on_four_lines_ending_ok() {
        let mock = MockTransport::new();
        expect_init_sequence(&mock, b"mod\r\nsf\r\npause\r\nok\r\n");
        let stick = stick(&mock).await;

        stick.init().await.unwrap();
        assert_eq!(mock.remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn init_fails_on_three_lines() {
        let mock = MockTransport::new();
        expect_init_sequence(&mock, b"mod\r\nsf\r\nok\r\n");
        let stick = stick(&mock).await;

        assert!(matches!(stick.init().await, Err(Error::InitFailed)));
    }

    #[tokio::test]
    async fn init_fails_when_last_line_not_ok() {
        let mock = MockTransport::new();
        expect_init_sequence(&mock, b"mod\r\nsf\r\npause\r\nfail\r\n");
        let stick = stick(&mock).await;

        assert!(matches!(stick.init().await, Err(Error::InitFailed)));
    }

    #[tokio::test]
    async fn init_with_custom_sequence() {
        let mock = MockTransport::new();
        mock.expect(b"sys get ver\r\n", &[VERSION]);
        mock.expect(b"radio set sf sf12\r\n", &[]);
        mock.expect(b"radio set bw 125\r\n", &[]);
        mock.expect(b"mac pause\r\n", &[]);
        mock.expect(b"radio set pwr 14\r\n", &[b"ok\r\nok\r\n4294967245\r\nok\r\n"]);
        let stick = stick(&mock).await;

        stick
            .init_with(&[
                "radio set sf sf12",
                "",
                "radio set bw 125",
                "mac pause",
                "radio set pwr 14",
            ])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn init_with_empty_uses_defaults() {
        let mock = MockTransport::new();
        expect_init_sequence(&mock, b"mod\r\nsf\r\npause\r\nok\r\n");
        let stick = stick(&mock).await;

        stick.init_with::<&str>(&[]).await.unwrap();
        assert_eq!(mock.sent_data()[1], b"radio get mod\r\n");
    }

    #[tokio::test(start_paused = true)]
    async fn init_waits_for_last_reply_before_reading() {
        // A UART-like device: each reply lands 20 ms after its command and a
        // read drains whatever has buffered.
        let mock = MockTransport::new();
        mock.set_reply_delay(Duration::from_millis(20));
        mock.set_merge_reads(true);
        mock.expect(b"sys get ver\r\n", &[VERSION]);
        mock.expect(b"radio get mod\r\n", &[b"lora\r\n"]);
        mock.expect(b"radio get sf\r\n", &[b"sf12\r\n"]);
        mock.expect(b"mac pause\r\n", &[b"4294967245\r\n"]);
        mock.expect(b"radio set pwr 10\r\n", &[b"ok\r\n"]);
        let stick = LoStikBuilder::new()
            .response_timeout(Duration::from_secs(1))
            .wake_settle(Duration::from_millis(50))
            .command_spacing(Duration::from_millis(100))
            .build_with_transport(Box::new(mock.clone()))
            .await
            .unwrap();

        stick.init().await.unwrap();
        assert_eq!(mock.unread_chunks(), 0);
    }

    #[tokio::test]
    async fn init_propagates_wake_timeout() {
        let mock = MockTransport::new();
        mock.expect(b"sys get ver\r\n", &[]);
        let stick = LoStikBuilder::new()
            .response_timeout(Duration::from_millis(50))
            .build_with_transport(Box::new(mock.clone()))
            .await
            .unwrap();

        assert!(matches!(stick.init().await, Err(Error::Timeout)));
        // Nothing past the wake command was sent.
        assert_eq!(mock.sent_data().len(), 1);
    }

    // =======================================================================
    // tx
    // =======================================================================

    #[tokio::test]
    async fn tx_sends_hex_and_succeeds() {
        let mock = MockTransport::new();
        mock.expect(b"radio tx dead\r\n", &[b"ok\r\n", b"radio_tx_ok\r\n"]);
        let stick = stick(&mock).await;

        stick.tx(&[0xDE, 0xAD]).await.unwrap();
        assert_eq!(mock.sent_data(), vec![b"radio tx dead\r\n".to_vec()]);
    }

    #[tokio::test]
    async fn tx_fails_when_completion_is_error() {
        let mock = MockTransport::new();
        mock.expect(b"radio tx dead\r\n", &[b"ok\r\n", b"radio_tx_err\r\n"]);
        let stick = stick(&mock).await;

        assert!(matches!(stick.tx(&[0xDE, 0xAD]).await, Err(Error::TxFailed)));
    }

    #[tokio::test]
    async fn tx_fails_when_not_acknowledged() {
        let mock = MockTransport::new();
        mock.expect(b"radio tx 01\r\n", &[b"invalid_param\r\n"]);
        let stick = stick(&mock).await;

        assert!(matches!(stick.tx(&[0x01]).await, Err(Error::TxFailed)));
        // The completion read is never attempted.
        assert_eq!(mock.unread_chunks(), 0);
    }

    #[tokio::test]
    async fn tx_times_out_without_completion() {
        let mock = MockTransport::new();
        mock.expect(b"radio tx 01\r\n", &[b"ok\r\n"]);
        let stick = LoStikBuilder::new()
            .response_timeout(Duration::from_millis(50))
            .rx_tx_settle(Duration::ZERO)
            .build_with_transport(Box::new(mock.clone()))
            .await
            .unwrap();

        assert!(matches!(stick.tx(&[0x01]).await, Err(Error::Timeout)));
    }

    // =======================================================================
    // rx
    // =======================================================================

    #[tokio::test]
    async fn rx_without_quirk() {
        let mock = MockTransport::new();
        mock.expect(b"radio rx 0\r\n", &[b"ok\r\n", b"radio_rx 01\r\n"]);
        let stick = stick(&mock).await;

        assert_eq!(stick.rx().await.unwrap(), vec![0x01]);
    }

    #[tokio::test]
    async fn rx_recovers_from_spurious_radio_err() {
        let mock = MockTransport::new();
        mock.expect(b"radio rx 0\r\n", &[b"ok\r\n", b"radio_err\r\n"]);
        mock.expect(b"radio rx 0\r\n", &[b"ok\r\n", b"radio_rx 48656c6c6f\r\n"]);
        let stick = stick(&mock).await;

        assert_eq!(stick.rx().await.unwrap(), b"Hello");
        assert_eq!(mock.sent_data().len(), 2);
    }

    #[tokio::test]
    async fn rx_quirk_recovery_only_once() {
        let mock = MockTransport::new();
        mock.expect(b"radio rx 0\r\n", &[b"ok\r\n", b"radio_err\r\n"]);
        mock.expect(b"radio rx 0\r\n", &[b"ok\r\n", b"radio_err\r\n"]);
        let stick = stick(&mock).await;

        assert!(matches!(stick.rx().await, Err(Error::RxFailed)));
    }

    #[tokio::test]
    async fn rx_fails_when_not_acknowledged() {
        let mock = MockTransport::new();
        mock.expect(b"radio rx 0\r\n", &[b"busy\r\n"]);
        let stick = stick(&mock).await;

        assert!(matches!(stick.rx().await, Err(Error::RxFailed)));
    }

    #[tokio::test]
    async fn rx_propagates_decode_error() {
        let mock = MockTransport::new();
        mock.expect(b"radio rx 0\r\n", &[b"ok\r\n", b"radio_rx 4g\r\n"]);
        let stick = stick(&mock).await;

        assert!(matches!(stick.rx().await, Err(Error::Decode(_))));
    }

    // =======================================================================
    // version / close
    // =======================================================================

    #[tokio::test]
    async fn version_returns_trimmed_text() {
        let mock = MockTransport::new();
        mock.expect(b"sys get ver\r\n", &[VERSION]);
        let stick = stick(&mock).await;

        assert_eq!(
            stick.version().await.unwrap(),
            "RN2483 1.0.1 Dec 15 2015 09:38:09"
        );
    }

    #[tokio::test]
    async fn close_returns_after_rx_timeout() {
        let mock = MockTransport::new();
        mock.expect(b"radio rx 0\r\n", &[]);
        let stick = LoStikBuilder::new()
            .response_timeout(Duration::from_millis(50))
            .rx_tx_settle(Duration::ZERO)
            .build_with_transport(Box::new(mock.clone()))
            .await
            .unwrap();

        assert!(matches!(stick.rx().await, Err(Error::Timeout)));
        let closed = tokio::time::timeout(Duration::from_secs(2), stick.close()).await;
        assert!(matches!(closed, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn close_then_tx_is_not_connected() {
        let mock = MockTransport::new();
        let stick = stick(&mock).await;

        stick.close().await.unwrap();
        assert!(matches!(stick.tx(&[0x01]).await, Err(Error::NotConnected)));
    }
}
