// LoStik test application -- CLI tool for exercising the driver against a
// real stick or a scripted mock device.
//
// Usage:
//   lostik-test-app --port /dev/ttyUSB0 version
//   lostik-test-app --port /dev/ttyUSB0 init
//   lostik-test-app --port /dev/ttyUSB0 tx "Hello"
//   lostik-test-app --port /dev/ttyUSB0 tx --hex dead
//   lostik-test-app --port /dev/ttyUSB0 rx --count 5 --blink
//   lostik-test-app --port /dev/ttyUSB0 led red on
//   lostik-test-app --mock rx
//
// Logging goes to stderr; RUST_LOG overrides the level chosen by --verbose.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use lostik::{Led, LoStik, LoStikBuilder};
use lostik_test_harness::MockTransport;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// LoStik test application -- drives a LoRa stick from the command line.
#[derive(Parser)]
#[command(name = "lostik-test-app", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB0, COM3). Required unless --mock.
    #[arg(long)]
    port: Option<String>,

    /// Baud rate of the stick's UART.
    #[arg(long, default_value_t = 57_600)]
    baud: u32,

    /// Deadline for each response read, in seconds.
    #[arg(long, default_value_t = 15)]
    timeout_secs: u64,

    /// Use a scripted mock device instead of a real serial port.
    #[arg(long)]
    mock: bool,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the module firmware version.
    Version,

    /// Run the radio initialization handshake.
    Init {
        /// Init command to send instead of the defaults (repeatable).
        #[arg(long = "cmd")]
        commands: Vec<String>,
    },

    /// Initialize the radio and transmit one frame.
    Tx {
        /// Payload text (sent as UTF-8 bytes).
        text: Option<String>,

        /// Payload as a hex string instead of text.
        #[arg(long, conflicts_with = "text")]
        hex: Option<String>,
    },

    /// Initialize the radio and receive frames.
    Rx {
        /// Number of frames to receive (0 = until an error).
        #[arg(long, default_value_t = 1)]
        count: u32,

        /// Blink the red LED after each frame.
        #[arg(long)]
        blink: bool,
    },

    /// Switch an indicator LED.
    Led {
        #[arg(value_enum)]
        led: LedArg,
        #[arg(value_enum)]
        state: LedState,
    },

    /// Play an LED blink pattern.
    Pattern {
        #[arg(value_enum)]
        pattern: PatternArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LedArg {
    Red,
    Blue,
}

impl From<LedArg> for Led {
    fn from(arg: LedArg) -> Self {
        match arg {
            LedArg::Red => Led::Red,
            LedArg::Blue => Led::Blue,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LedState {
    On,
    Off,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PatternArg {
    Sending,
    Receiving,
    Interleaving,
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve the payload for `tx` from either text or hex.
fn tx_payload(text: Option<&str>, hex_payload: Option<&str>) -> Result<Vec<u8>> {
    match (text, hex_payload) {
        (_, Some(h)) => hex::decode(h).context("invalid --hex payload"),
        (Some(t), None) => Ok(t.as_bytes().to_vec()),
        (None, None) => bail!("tx needs a text payload or --hex"),
    }
}

const MOCK_VERSION: &[u8] = b"RN2483 1.0.1 Dec 15 2015 09:38:09\r\n";
const MOCK_INIT_REPLY: &[u8] = b"lora\r\nsf12\r\n4294967245\r\nok\r\n";

/// Script a mock device with the replies a healthy stick gives for `command`.
fn mock_device(command: &Command) -> Result<MockTransport> {
    let mock = MockTransport::new();

    let expect_init = |commands: &[String]| {
        mock.expect(b"sys get ver\r\n", &[MOCK_VERSION]);
        let sent: Vec<&String> = commands.iter().filter(|c| !c.is_empty()).collect();
        for (i, cmd) in sent.iter().enumerate() {
            let line = format!("{cmd}\r\n");
            if i + 1 == sent.len() {
                mock.expect(line.as_bytes(), &[MOCK_INIT_REPLY]);
            } else {
                mock.expect(line.as_bytes(), &[]);
            }
        }
    };
    let default_init: Vec<String> = lostik::commands::DEFAULT_INIT_COMMANDS
        .iter()
        .map(|c| c.to_string())
        .collect();

    match command {
        Command::Version => mock.expect(b"sys get ver\r\n", &[MOCK_VERSION]),
        Command::Init { commands } if commands.is_empty() => expect_init(&default_init),
        Command::Init { commands } => expect_init(commands),
        Command::Tx { text, hex } => {
            expect_init(&default_init);
            let payload = tx_payload(text.as_deref(), hex.as_deref())?;
            let line = format!("{}\r\n", lostik::commands::cmd_radio_tx(&payload));
            mock.expect(line.as_bytes(), &[b"ok\r\n", b"radio_tx_ok\r\n"]);
        }
        Command::Rx { count, blink } => {
            expect_init(&default_init);
            // The first receive hits the spurious radio_err to show recovery.
            mock.expect(b"radio rx 0\r\n", &[b"ok\r\n", b"radio_err\r\n"]);
            for _ in 0..(*count).max(1) {
                mock.expect(b"radio rx 0\r\n", &[b"ok\r\n", b"radio_rx 48656c6c6f\r\n"]);
                if *blink {
                    mock.expect(b"sys set pindig GPIO11 1\r\n", &[]);
                    mock.expect(b"sys set pindig GPIO11 0\r\n", &[]);
                }
            }
        }
        Command::Led { led, state } => {
            let line = format!(
                "{}\r\n",
                lostik::commands::cmd_set_pin(Led::from(*led).pin(), matches!(state, LedState::On))
            );
            mock.expect(line.as_bytes(), &[]);
        }
        Command::Pattern { pattern } => {
            let leds: &[Led] = match pattern {
                PatternArg::Sending => &[Led::Blue],
                PatternArg::Receiving => &[Led::Red],
                PatternArg::Interleaving => &[Led::Blue, Led::Red],
            };
            for led in leds {
                for on in [true, false] {
                    let line = format!("{}\r\n", lostik::commands::cmd_set_pin(led.pin(), on));
                    mock.expect(line.as_bytes(), &[]);
                }
            }
        }
    }

    Ok(mock)
}

async fn connect(cli: &Cli) -> Result<LoStik> {
    let builder = LoStikBuilder::new()
        .baud_rate(cli.baud)
        .response_timeout(Duration::from_secs(cli.timeout_secs));

    if cli.mock {
        let mock = mock_device(&cli.command)?;
        return builder
            .command_spacing(Duration::from_millis(10))
            .build_with_transport(Box::new(mock))
            .await
            .context("failed to build mock LoStik");
    }

    let Some(port) = cli.port.as_deref() else {
        bail!("--port is required unless --mock is used");
    };
    tracing::info!(port, baud = cli.baud, "connecting to LoStik");
    builder
        .serial_port(port)
        .build()
        .await
        .with_context(|| format!("failed to open LoStik on {port}"))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_init(stick: &LoStik, commands: &[String]) -> Result<()> {
    stick.init_with(commands).await.context("radio init failed")?;
    println!("Radio initialised");
    Ok(())
}

async fn cmd_tx(stick: &LoStik, payload: &[u8]) -> Result<()> {
    stick.init().await.context("radio init failed")?;
    stick.tx(payload).await.context("transmit failed")?;
    println!("Sent {} bytes: {}", payload.len(), hex::encode(payload));
    Ok(())
}

async fn cmd_rx(stick: &LoStik, count: u32, blink: bool) -> Result<()> {
    stick.init().await.context("radio init failed")?;

    let mut received = 0u32;
    while count == 0 || received < count {
        let frame = stick.rx().await.context("receive failed")?;
        received += 1;
        println!(
            "Frame {}: {} ({:?})",
            received,
            hex::encode(&frame),
            String::from_utf8_lossy(&frame)
        );
        if blink {
            stick.receiving_led_pattern().await?;
        }
    }
    Ok(())
}

async fn cmd_pattern(stick: &LoStik, pattern: PatternArg) -> Result<()> {
    match pattern {
        PatternArg::Sending => stick.sending_led_pattern().await?,
        PatternArg::Receiving => stick.receiving_led_pattern().await?,
        PatternArg::Interleaving => stick.sending_receiving_led_pattern().await?,
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let stick = connect(&cli).await?;

    let result = match &cli.command {
        Command::Version => {
            let version = stick.version().await.context("version query failed")?;
            println!("{version}");
            Ok(())
        }
        Command::Init { commands } => cmd_init(&stick, commands).await,
        Command::Tx { text, hex } => {
            let payload = tx_payload(text.as_deref(), hex.as_deref())?;
            cmd_tx(&stick, &payload).await
        }
        Command::Rx { count, blink } => cmd_rx(&stick, *count, *blink).await,
        Command::Led { led, state } => stick
            .set_led((*led).into(), matches!(state, LedState::On))
            .await
            .context("LED command failed"),
        Command::Pattern { pattern } => cmd_pattern(&stick, *pattern).await,
    };

    stick.close().await.ok();
    result
}
