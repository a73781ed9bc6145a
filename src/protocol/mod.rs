//! Wire protocol message types.
//!
//! This module defines the message formats exchanged between the page
//! (local end) and the execution host (remote end), plus the streaming
//! decoder for output substreams.
//!
//! # Protocol Overview
//!
//! | Layer | Type | Direction | Purpose |
//! |-------|------|-----------|---------|
//! | Connection | [`Envelope`] | Both | `{executor, message}` channel routing |
//! | Widget | [`Notification`] | Remote → Local | Process lifecycle + output chunks |
//! | Widget | [`action`] payloads | Local → Remote | stdin, resize, resource edits |
//! | Substream | [`Record`] | Remote → Local | Framed `contents`/`error` lines |
//!
//! # Stream-within-stream
//!
//! Data-bearing widgets receive base64 `stdout` chunks inside
//! [`Notification::Output`]. Concatenated, those chunks form a
//! newline-delimited JSON stream which [`FramingDecoder`] turns back into
//! [`Record`]s.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | Channel-addressed wire envelope |
//! | `notification` | Inbound per-widget payloads |
//! | `action` | Outbound per-widget payloads |
//! | `framing` | Streaming line-protocol decoder |

// ============================================================================
// Submodules
// ============================================================================

/// Channel-addressed wire envelope.
pub mod envelope;

/// Outbound per-widget payload constructors.
pub mod action;

/// Inbound per-widget payload types.
pub mod notification;

/// Streaming line-protocol decoder.
pub mod framing;

// ============================================================================
// Re-exports
// ============================================================================

pub use action::{ResourceAction, TerminalSize};
pub use envelope::Envelope;
pub use framing::{FramingDecoder, Record};
pub use notification::{Notification, OutputChunk};
