//! Inbound per-widget payload types.
//!
//! These are the payloads the execution host sends inside an
//! [`Envelope`](super::Envelope) to a single widget channel. They describe
//! the lifecycle of the remote process backing that widget.
//!
//! # Shapes
//!
//! | Payload | Meaning |
//! |---------|---------|
//! | `{"type":"started"}` | Process (re)started; clear previous output |
//! | `{"type":"output","stdout":<b64>}` | One stdout chunk |
//! | `{"type":"output","stderr":<b64>}` | One stderr chunk |
//! | `{"type":"finished"}` | Process exited normally |
//! | `{"type":"errored","stdout":<b64>}` | Process failed; `stdout` carries message text |

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// ============================================================================
// Notification
// ============================================================================

/// A process lifecycle notification addressed to one widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Notification {
    /// Process started (or restarted). Previously shown output is stale.
    Started,

    /// One chunk of process output.
    ///
    /// Exactly one of `stdout`/`stderr` is present per notification.
    /// A notification with neither is a degenerate frame that produces
    /// no display update; see [`Notification::chunk`].
    Output {
        /// Base64-encoded stdout chunk, if this is a stdout notification.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stdout: Option<String>,

        /// Base64-encoded stderr chunk, if this is a stderr notification.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stderr: Option<String>,
    },

    /// Process exited normally.
    Finished,

    /// Process failed.
    ///
    /// The `stdout` field carries base64 human-readable message text,
    /// despite the field name (wire format constraint).
    Errored {
        /// Base64-encoded failure message.
        stdout: String,
    },
}

impl Notification {
    /// Parses a notification from an opaque envelope payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the payload is not a
    /// known notification shape.
    #[inline]
    pub fn parse(payload: &Value) -> Result<Self> {
        Ok(serde_json::from_value(payload.clone())?)
    }

    /// Returns the output chunk, if this is a well-formed output notification.
    ///
    /// Returns `None` for non-output notifications and for output
    /// notifications carrying neither `stdout` nor `stderr`. When both are
    /// present (which the protocol forbids), `stdout` wins.
    #[must_use]
    pub fn chunk(&self) -> Option<OutputChunk<'_>> {
        match self {
            Self::Output {
                stdout: Some(data), ..
            } => Some(OutputChunk::Stdout(data)),
            Self::Output {
                stderr: Some(data), ..
            } => Some(OutputChunk::Stderr(data)),
            _ => None,
        }
    }

    /// Decodes the failure message of an [`Notification::Errored`] payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Base64`](crate::Error::Base64) if the message is not
    /// valid base64.
    pub fn errored_message(&self) -> Option<Result<String>> {
        match self {
            Self::Errored { stdout } => Some(decode_text(stdout)),
            _ => None,
        }
    }
}

// ============================================================================
// OutputChunk
// ============================================================================

/// One base64 output chunk, tagged with its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputChunk<'a> {
    /// A stdout chunk (base64).
    Stdout(&'a str),
    /// A stderr chunk (base64).
    Stderr(&'a str),
}

impl OutputChunk<'_> {
    /// Returns the base64 payload regardless of stream.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &str {
        match self {
            Self::Stdout(data) | Self::Stderr(data) => data,
        }
    }

    /// Returns `true` if this is a stderr chunk.
    #[inline]
    #[must_use]
    pub fn is_stderr(&self) -> bool {
        matches!(self, Self::Stderr(_))
    }
}

// ============================================================================
// Base64 Helpers
// ============================================================================

/// Decodes a base64 payload to raw bytes.
///
/// Terminal output may contain escape sequences and partial UTF-8, so it
/// must reach the display undamaged.
///
/// # Errors
///
/// Returns [`Error::Base64`](crate::Error::Base64) if `data` is not valid
/// base64.
#[inline]
pub fn decode_bytes(data: &str) -> Result<Vec<u8>> {
    Ok(BASE64.decode(data)?)
}

/// Decodes a base64 payload to text.
///
/// Invalid UTF-8 inside a valid base64 payload is replaced rather than
/// rejected; a mangled message is still more useful than none.
///
/// # Errors
///
/// Returns [`Error::Base64`](crate::Error::Base64) if `data` is not valid
/// base64.
pub fn decode_text(data: &str) -> Result<String> {
    let bytes = BASE64.decode(data)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Encodes text as a base64 payload.
#[inline]
#[must_use]
pub fn encode_text(text: &str) -> String {
    BASE64.encode(text.as_bytes())
}

// ============================================================================
// Tests
// ============================================================================
