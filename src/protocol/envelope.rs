//! Channel-addressed wire envelope.
//!
//! The envelope is the unit exchanged over the physical connection, in both
//! directions. The `executor` field names the logical channel; the `message`
//! is an opaque payload understood only by the addressed subscriber.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// ============================================================================
// Envelope
// ============================================================================

/// A channel-addressed message, symmetric in both directions.
///
/// # Format
///
/// ```json
/// {
///   "executor": "channel-name",
///   "message": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Stable, caller-chosen channel identifier.
    pub executor: String,

    /// Opaque payload for the addressed subscriber.
    pub message: Value,
}

impl Envelope {
    /// Creates a new envelope.
    #[inline]
    #[must_use]
    pub fn new(executor: impl Into<String>, message: Value) -> Self {
        Self {
            executor: executor.into(),
            message,
        }
    }

    /// Encodes the envelope as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails
    /// (practically impossible for well-formed `Value` payloads).
    #[inline]
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes an envelope from a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the frame is not a
    /// valid envelope. Callers drop the single frame and keep the
    /// connection open.
    #[inline]
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
