//! Framing rules for the LoStik's line-oriented text protocol.
//!
//! Commands are ASCII lines terminated by `\r\n`. Responses carry no length
//! prefix and no delimiter that cannot also appear mid-payload, so the end
//! of a response is inferred from its shape. That decision is isolated in
//! [`classify_chunk`] so it can be tested without any I/O.
//!
//! The rule set:
//!
//! 1. a read that returns 0 bytes is end of stream;
//! 2. a read that returns [`SHORT_READ_MAX`] bytes or fewer ends the
//!    response (the device emitting a trailing ack/terminator fragment);
//! 3. the response is complete once the accumulated text contains
//!    [`OK_MARKER`] or the latest chunk ends with [`TERMINATOR`].
//!
//! A response that happens to arrive in a short fragment for other reasons
//! is cut there. That imprecision is inherent to the device protocol.

use lostik_core::error::{Error, Result};

/// Line terminator appended to every command.
pub const TERMINATOR: &str = "\r\n";

/// Acknowledgement marker that completes a response wherever it appears.
pub const OK_MARKER: &str = "ok\r";

/// Reads of this many bytes or fewer end a response.
pub const SHORT_READ_MAX: usize = 3;

/// Size of a single transport read.
pub const READ_CHUNK_SIZE: usize = 100;

/// Outcome of inspecting one chunk of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Keep reading.
    Continue,
    /// The transport reported end of stream.
    EndOfStream,
    /// The read returned a short fragment.
    ShortRead,
    /// An `ok\r` marker or a trailing `\r\n` was seen.
    Marker,
}

impl Termination {
    /// Whether the response is finished.
    pub fn is_complete(self) -> bool {
        !matches!(self, Termination::Continue)
    }
}

/// Encode a command line for the wire.
///
/// # Examples
///
/// ```
/// use lostik_text_io::protocol::encode_command;
///
/// assert_eq!(encode_command("sys get ver").unwrap(), b"sys get ver\r\n");
/// assert!(encode_command("mac pause\r\nmac resume").is_err());
/// ```
pub fn encode_command(line: &str) -> Result<Vec<u8>> {
    if line.contains(TERMINATOR) {
        return Err(Error::InvalidParameter(format!(
            "command must not contain a line terminator: {:?}",
            line
        )));
    }
    let mut bytes = Vec::with_capacity(line.len() + TERMINATOR.len());
    bytes.extend_from_slice(line.as_bytes());
    bytes.extend_from_slice(TERMINATOR.as_bytes());
    Ok(bytes)
}

/// Decide whether a response is complete after reading `chunk`.
///
/// `accumulated` is the raw response so far, already including `chunk`.
/// `n` is the byte count of the read that produced `chunk`.
pub fn classify_chunk(accumulated: &[u8], chunk: &[u8], n: usize) -> Termination {
    if n == 0 {
        Termination::EndOfStream
    } else if n <= SHORT_READ_MAX {
        Termination::ShortRead
    } else if contains(accumulated, OK_MARKER.as_bytes())
        || chunk.ends_with(TERMINATOR.as_bytes())
    {
        Termination::Marker
    } else {
        Termination::Continue
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Turn the raw accumulated response bytes into the value handed to callers.
///
/// Decodes as UTF-8 (lossily), removes every `\r` and trims exactly one
/// trailing `\n`.
///
/// ```
/// use lostik_text_io::protocol::finalize_response;
///
/// assert_eq!(finalize_response(b"ok\r\n"), "ok");
/// assert_eq!(finalize_response(b"lora\r\nok\r\n\r\n"), "lora\nok\n");
/// ```
pub fn finalize_response(raw: &[u8]) -> String {
    let stripped = String::from_utf8_lossy(raw).replace('\r', "");
    match stripped.strip_suffix('\n') {
        Some(trimmed) => trimmed.to_string(),
        None => stripped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_appends_crlf() {
        assert_eq!(encode_command("radio rx 0").unwrap(), b"radio rx 0\r\n");
    }

    #[test]
    fn encode_empty_line_is_bare_terminator() {
        assert_eq!(encode_command("").unwrap(), b"\r\n");
    }

    #[test]
    fn encode_is_deterministic() {
        let a = encode_command("radio set pwr 10").unwrap();
        let b = encode_command("radio set pwr 10").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn encode_rejects_embedded_terminator() {
        let err = encode_command("radio tx 01\r\nradio rx 0").unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn encode_allows_lone_carriage_return() {
        // Only the full CRLF sequence is reserved.
        assert_eq!(encode_command("a\rb").unwrap(), b"a\rb\r\n");
    }

    // -----------------------------------------------------------------------
    // classify_chunk
    // -----------------------------------------------------------------------

    #[test]
    fn zero_bytes_is_end_of_stream() {
        assert_eq!(classify_chunk(b"lora", b"", 0), Termination::EndOfStream);
    }

    #[test]
    fn three_bytes_or_fewer_is_short_read() {
        assert_eq!(classify_chunk(b"ok\r", b"ok\r", 3), Termination::ShortRead);
        assert_eq!(classify_chunk(b"x\r\n", b"\r\n", 2), Termination::ShortRead);
        assert_eq!(classify_chunk(b"a", b"a", 1), Termination::ShortRead);
    }

    #[test]
    fn four_bytes_is_not_short() {
        assert_eq!(classify_chunk(b"lora", b"lora", 4), Termination::Continue);
    }

    #[test]
    fn ok_marker_in_chunk_completes() {
        assert_eq!(classify_chunk(b"ok\r\n", b"ok\r\n", 4), Termination::Marker);
    }

    #[test]
    fn ok_marker_spanning_chunks_completes() {
        // "radio_tx_o" then "k\r mac": the marker only exists in the
        // accumulated text.
        let accumulated = b"radio_tx_ok\r mac";
        assert_eq!(classify_chunk(accumulated, b"k\r mac", 6), Termination::Marker);
    }

    #[test]
    fn trailing_terminator_completes() {
        let chunk: &[u8] = b"RN2483 1.0.1 Dec 15 2015 09:38:09\r\n";
        assert_eq!(classify_chunk(chunk, chunk, chunk.len()), Termination::Marker);
    }

    #[test]
    fn terminator_mid_chunk_continues() {
        let chunk: &[u8] = b"lora\r\nsf12";
        assert_eq!(classify_chunk(chunk, chunk, chunk.len()), Termination::Continue);
    }

    #[test]
    fn is_complete_only_false_for_continue() {
        assert!(!Termination::Continue.is_complete());
        assert!(Termination::EndOfStream.is_complete());
        assert!(Termination::ShortRead.is_complete());
        assert!(Termination::Marker.is_complete());
    }

    // -----------------------------------------------------------------------
    // finalize_response
    // -----------------------------------------------------------------------

    #[test]
    fn finalize_strips_all_carriage_returns() {
        assert_eq!(
            finalize_response(b"mod\r\nsf\r\npause\r\nok\r\n"),
            "mod\nsf\npause\nok"
        );
    }

    #[test]
    fn finalize_lone_carriage_returns_join_lines() {
        assert_eq!(
            finalize_response(b"mod\rsf\rmac_tx_ok\rok\r\n"),
            "modsfmac_tx_okok"
        );
    }

    #[test]
    fn finalize_without_newline_is_unchanged() {
        assert_eq!(finalize_response(b"radio_rx 01"), "radio_rx 01");
    }

    #[test]
    fn finalize_empty() {
        assert_eq!(finalize_response(b""), "");
    }

    #[test]
    fn finalize_decodes_multibyte_split_across_reads() {
        // "é" is 0xC3 0xA9; the two halves arrived in separate reads.
        let mut raw = b"caf\xC3".to_vec();
        raw.extend_from_slice(b"\xA9\r\n");
        assert_eq!(finalize_response(&raw), "café");
    }
}
