//! Error types for widget-room.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use widget_room::{Result, Error};
//!
//! fn example(mux: &mut Multiplexer) -> Result<()> {
//!     mux.register("viewer", Box::new(widget))?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Registry | [`Error::DuplicateChannel`], [`Error::UnknownChannel`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::ChannelClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::Endpoint`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::Base64`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Registry Errors
    // ========================================================================
    /// A subscriber is already registered under this channel name.
    ///
    /// Registration is strictly one subscriber per channel; a second
    /// registration under the same name is a caller bug, not a request
    /// to replace the first.
    #[error("Channel already registered: {channel}")]
    DuplicateChannel {
        /// The channel name that was registered twice.
        channel: String,
    },

    /// No subscriber is registered under this channel name.
    ///
    /// Returned when a local caller addresses a channel that was never
    /// registered. (Inbound frames for unknown channels are dropped with
    /// a diagnostic instead, so a broken sender cannot take the room down.)
    #[error("Unknown channel: {channel}")]
    UnknownChannel {
        /// The unregistered channel name.
        channel: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the physical connection cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The physical connection is closed.
    ///
    /// Connection loss is terminal for a room session; there is no
    /// automatic reconnection.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The room event loop has exited and its command channel is gone.
    ///
    /// Returned when a [`RoomConnection`](crate::room::RoomConnection)
    /// handle is used after shutdown.
    #[error("Room event loop terminated")]
    ChannelClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected message shape.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Endpoint URL could not be derived.
    ///
    /// Returned when the page URL cannot be rewritten into a WebSocket
    /// endpoint (unsupported scheme, cannot-be-a-base URL, ...).
    #[error("Endpoint error: {message}")]
    Endpoint {
        /// Description of the endpoint derivation failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decoding error.
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a duplicate channel error.
    #[inline]
    pub fn duplicate_channel(channel: impl Into<String>) -> Self {
        Self::DuplicateChannel {
            channel: channel.into(),
        }
    }

    /// Creates an unknown channel error.
    #[inline]
    pub fn unknown_channel(channel: impl Into<String>) -> Self {
        Self::UnknownChannel {
            channel: channel.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an endpoint error.
    #[inline]
    pub fn endpoint(message: impl Into<String>) -> Self {
        Self::Endpoint {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::ChannelClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a registry error.
    #[inline]
    #[must_use]
    pub fn is_registry_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateChannel { .. } | Self::UnknownChannel { .. }
        )
    }

    /// Returns `true` if this error is a decode fault.
    ///
    /// Decode faults affect a single frame or record and never terminate
    /// the connection.
    #[inline]
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Json(_) | Self::Base64(_) | Self::Protocol { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("handshake refused");
        assert_eq!(err.to_string(), "Connection failed: handshake refused");
    }

    #[test]
    fn test_duplicate_channel_display() {
        let err = Error::duplicate_channel("terminal-1");
        assert_eq!(err.to_string(), "Channel already registered: terminal-1");
    }

    #[test]
    fn test_is_connection_error() {
        let conn_err = Error::connection("test");
        let closed_err = Error::ConnectionClosed;
        let loop_err = Error::ChannelClosed;
        let other_err = Error::duplicate_channel("a");

        assert!(conn_err.is_connection_error());
        assert!(closed_err.is_connection_error());
        assert!(loop_err.is_connection_error());
        assert!(!other_err.is_connection_error());
    }

    #[test]
    fn test_is_registry_error() {
        assert!(Error::duplicate_channel("a").is_registry_error());
        assert!(Error::unknown_channel("b").is_registry_error());
        assert!(!Error::ConnectionClosed.is_registry_error());
    }

    #[test]
    fn test_is_decode_error() {
        let json_err: Error = serde_json::from_str::<String>("not json")
            .unwrap_err()
            .into();
        assert!(json_err.is_decode_error());
        assert!(Error::protocol("bad frame").is_decode_error());
        assert!(!Error::ConnectionClosed.is_decode_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
