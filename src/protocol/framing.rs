//! Streaming line-protocol decoder.
//!
//! Data-bearing widgets receive their process output as a sequence of
//! base64 `stdout` chunks. Concatenated and decoded, those chunks form a
//! newline-delimited stream of JSON lines, each carrying exactly one of:
//!
//! - `{"contents": <b64>}`: success payload
//! - `{"error": <b64>}`: human-readable failure text
//!
//! [`FramingDecoder`] accumulates decoded text across arbitrarily split
//! chunks and emits one [`Record`] per completed line.
//!
//! # Chunk boundary assumption
//!
//! Each chunk is base64-decoded independently, so chunk boundaries must
//! fall on base64 group boundaries. The sender guarantees this by encoding
//! and flushing whole output lines; `feed` carries *text* (not base64)
//! across calls, so any group-aligned split is safe. See
//! `test_sender_flushes_on_line_boundaries` for the pinned assumption.

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use tracing::warn;

use crate::error::Result;

use super::notification::decode_text;

// ============================================================================
// Record
// ============================================================================

/// One decoded logical unit recovered from an output substream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Success payload, still base64-encoded.
    ///
    /// Left encoded because consumers differ: text viewers decode to text,
    /// image viewers splice the base64 straight into a data URI.
    Contents {
        /// Base64-encoded resource contents.
        data: String,
    },

    /// Failure payload, decoded to human-readable text.
    Error {
        /// The failure message.
        message: String,
    },
}

impl Record {
    /// Returns `true` if this is an error record.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

// ============================================================================
// FramedLine
// ============================================================================

/// Raw shape of one JSON line before validation.
#[derive(Debug, Deserialize)]
struct FramedLine {
    #[serde(default)]
    contents: Option<String>,

    #[serde(default)]
    error: Option<String>,
}

// ============================================================================
// FramingDecoder
// ============================================================================

/// Stateful decoder for an embedded newline-delimited JSON substream.
///
/// One decoder instance per widget; the internal buffer is exclusively
/// owned and never shared. The decoder is never re-created mid-stream;
/// it lives as long as its widget does.
///
/// # Example
///
/// ```
/// use widget_room::protocol::{FramingDecoder, Record};
///
/// let mut decoder = FramingDecoder::new();
/// # let chunk = {
/// #     use base64::Engine as _;
/// #     base64::engine::general_purpose::STANDARD.encode(b"{\"contents\":\"aGk=\"}\n")
/// # };
/// let records = decoder.feed(&chunk).unwrap();
/// assert_eq!(records, vec![Record::Contents { data: "aGk=".into() }]);
/// ```
#[derive(Debug, Default)]
pub struct FramingDecoder {
    /// Decoded text awaiting a newline.
    buffer: String,

    /// Optional cap on bytes buffered without a newline.
    max_buffered: Option<usize>,
}

impl FramingDecoder {
    /// Creates a new decoder with an unbounded buffer.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder that caps bytes buffered without a newline.
    ///
    /// The decoder itself imposes no size bound; this is the external
    /// backpressure hook for callers that need one. When the cap is
    /// exceeded the buffered text is discarded and an error record is
    /// surfaced, leaving the decoder usable for subsequent lines.
    #[inline]
    #[must_use]
    pub fn with_max_buffered(max_bytes: usize) -> Self {
        Self {
            buffer: String::new(),
            max_buffered: Some(max_bytes),
        }
    }

    /// Returns the number of bytes currently buffered without a newline.
    #[inline]
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Feeds one base64 chunk and returns the records completed by it.
    ///
    /// May be called any number of times with arbitrarily split chunks,
    /// as long as each chunk is independently valid base64 (see the
    /// module docs for the sender-side guarantee). Text left over after
    /// the last newline stays buffered for the next call.
    ///
    /// A line that is not valid JSON, or that carries neither `contents`
    /// nor `error`, yields a synthetic [`Record::Error`] instead of an
    /// `Err`; one bad line must not make the stream unresumable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Base64`](crate::Error::Base64) if `chunk` itself is
    /// not valid base64. The buffer is left untouched, so the caller may
    /// drop the chunk and continue.
    pub fn feed(&mut self, chunk: &str) -> Result<Vec<Record>> {
        let bytes = BASE64.decode(chunk)?;
        self.buffer.push_str(&String::from_utf8_lossy(&bytes));

        let mut records = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            records.push(Self::parse_line(line.trim_end_matches('\n')));
        }

        if let Some(max) = self.max_buffered
            && self.buffer.len() > max
        {
            warn!(
                buffered = self.buffer.len(),
                max, "Output buffer overflow, discarding partial line"
            );
            self.buffer.clear();
            records.push(Record::Error {
                message: "output buffer overflow".to_string(),
            });
        }

        Ok(records)
    }

    /// Parses one completed line into a record.
    ///
    /// `contents` wins if a line carries both fields, matching how the
    /// stream has always been read on the receiving side.
    fn parse_line(line: &str) -> Record {
        let Ok(parsed) = serde_json::from_str::<FramedLine>(line) else {
            warn!(line, "Discarding malformed record line");
            return Record::Error {
                message: "malformed record".to_string(),
            };
        };

        if let Some(data) = parsed.contents {
            return Record::Contents { data };
        }

        if let Some(error) = parsed.error {
            return match decode_text(&error) {
                Ok(message) => Record::Error { message },
                Err(_) => {
                    warn!(line, "Error record payload is not valid base64");
                    Record::Error {
                        message: "malformed record".to_string(),
                    }
                }
            };
        }

        warn!(line, "Record line has neither contents nor error");
        Record::Error {
            message: "malformed record".to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::notification::encode_text;

    use proptest::prelude::*;

    /// Encodes a full stdout stream the way the sender does: whole lines,
    /// encoded and flushed together.
    fn encode_stream(lines: &[&str]) -> String {
        let mut text = String::new();
        for line in lines {
            text.push_str(line);
            text.push('\n');
        }
        BASE64.encode(text.as_bytes())
    }

    #[test]
    fn test_single_contents_record() {
        let mut decoder = FramingDecoder::new();
        let chunk = encode_stream(&[r#"{"contents":"aGk="}"#]);

        let records = decoder.feed(&chunk).expect("feed");
        assert_eq!(records, vec![Record::Contents { data: "aGk=".into() }]);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_error_record_is_decoded_to_text() {
        let mut decoder = FramingDecoder::new();
        let line = format!(r#"{{"error":"{}"}}"#, encode_text("no such file"));
        let chunk = encode_stream(&[&line]);

        let records = decoder.feed(&chunk).expect("feed");
        assert_eq!(
            records,
            vec![Record::Error {
                message: "no such file".into()
            }]
        );
    }

    #[test]
    fn test_partial_line_stays_buffered() {
        let mut decoder = FramingDecoder::new();
        // No newline yet: nothing to emit.
        let chunk = BASE64.encode(br#"{"contents":"aG"#);

        let records = decoder.feed(&chunk).expect("feed");
        assert!(records.is_empty());
        assert!(decoder.buffered_len() > 0);

        // Rest of the line arrives.
        let rest = BASE64.encode("k=\"}\n".as_bytes());
        let records = decoder.feed(&rest).expect("feed");
        assert_eq!(records, vec![Record::Contents { data: "aGk=".into() }]);
    }

    #[test]
    fn test_multiple_records_in_one_chunk() {
        let mut decoder = FramingDecoder::new();
        let err_line = format!(r#"{{"error":"{}"}}"#, encode_text("gone"));
        let chunk = encode_stream(&[r#"{"contents":"QQ=="}"#, &err_line]);

        let records = decoder.feed(&chunk).expect("feed");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], Record::Contents { data: "QQ==".into() });
        assert!(records[1].is_error());
    }

    #[test]
    fn test_malformed_line_keeps_decoder_usable() {
        let mut decoder = FramingDecoder::new();
        let chunk = encode_stream(&["not json", r#"{"contents":"QQ=="}"#]);

        let records = decoder.feed(&chunk).expect("feed");
        assert_eq!(
            records[0],
            Record::Error {
                message: "malformed record".into()
            }
        );
        assert_eq!(records[1], Record::Contents { data: "QQ==".into() });
    }

    #[test]
    fn test_line_with_neither_field_is_malformed() {
        let mut decoder = FramingDecoder::new();
        let chunk = encode_stream(&[r#"{"other":"QQ=="}"#]);

        let records = decoder.feed(&chunk).expect("feed");
        assert_eq!(
            records,
            vec![Record::Error {
                message: "malformed record".into()
            }]
        );
    }

    #[test]
    fn test_invalid_base64_chunk_is_rejected_without_corrupting_buffer() {
        let mut decoder = FramingDecoder::new();
        decoder
            .feed(&BASE64.encode(br#"{"contents":"#))
            .expect("feed");
        let buffered = decoder.buffered_len();

        assert!(decoder.feed("!!!not-base64!!!").is_err());
        assert_eq!(decoder.buffered_len(), buffered);
    }

    #[test]
    fn test_buffer_cap_surfaces_error_record() {
        let mut decoder = FramingDecoder::with_max_buffered(8);
        let chunk = BASE64.encode(b"0123456789abcdef");

        let records = decoder.feed(&chunk).expect("feed");
        assert_eq!(
            records,
            vec![Record::Error {
                message: "output buffer overflow".into()
            }]
        );
        assert_eq!(decoder.buffered_len(), 0);

        // Still usable afterwards.
        let chunk = encode_stream(&[r#"{"contents":"QQ=="}"#]);
        let records = decoder.feed(&chunk).expect("feed");
        assert_eq!(records, vec![Record::Contents { data: "QQ==".into() }]);
    }

    #[test]
    fn test_sender_flushes_on_line_boundaries() {
        // Pins the documented assumption: the sender base64-encodes whole
        // flushed lines, so every chunk we receive decodes independently.
        // Two separately-encoded lines must parse identically to one
        // concatenated encoding of both.
        let line_a = r#"{"contents":"aGk="}"#;
        let line_b = r#"{"contents":"eW8="}"#;

        let mut split = FramingDecoder::new();
        let mut records = split.feed(&encode_stream(&[line_a])).expect("feed");
        records.extend(split.feed(&encode_stream(&[line_b])).expect("feed"));

        let mut joined = FramingDecoder::new();
        let all = joined.feed(&encode_stream(&[line_a, line_b])).expect("feed");

        assert_eq!(records, all);
    }

    proptest! {
        /// Splitting the base64 stream at any group-aligned boundary yields
        /// the same records as feeding it whole.
        #[test]
        fn prop_group_aligned_splits_are_equivalent(
            payloads in proptest::collection::vec("[a-zA-Z0-9+/=]{0,24}", 1..6),
            split_seed in any::<usize>(),
        ) {
            let lines: Vec<String> = payloads
                .iter()
                .map(|p| format!(r#"{{"contents":"{p}"}}"#))
                .collect();
            let line_refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let full = encode_stream(&line_refs);

            let mut whole = FramingDecoder::new();
            let expected = whole.feed(&full).expect("feed whole");

            // Pick a split point aligned to a 4-char base64 group.
            let groups = full.len() / 4;
            let split = (split_seed % (groups + 1)) * 4;

            let mut decoder = FramingDecoder::new();
            let mut records = decoder.feed(&full[..split]).expect("feed head");
            records.extend(decoder.feed(&full[split..]).expect("feed tail"));

            prop_assert_eq!(records, expected);
        }
    }
}
