//! Widget room - Connection multiplexer for live documentation widgets.
//!
//! This library connects a documentation page to an execution host over a
//! single WebSocket and fans the traffic out to independent widgets, each
//! bound to a named channel and backed by a remote process.
//!
//! # Architecture
//!
//! The room follows a client-host model:
//!
//! - **Local End (Rust)**: Registers widgets, multiplexes one socket
//! - **Remote End (Host)**: Runs the backing processes, emits notifications
//!
//! Key design principles:
//!
//! - One socket per page; every frame is an [`Envelope`] naming its channel
//! - Widgets register before the socket dials; a ready gate defers the dial
//!   until every widget has finished its own setup
//! - Sends before open are queued in order; the connection never reconnects
//! - Bad frames are dropped with a diagnostic, never fatal
//!
//! # Quick Start
//!
//! ```no_run
//! use serde_json::json;
//! use widget_room::{Multiplexer, RoomConnection, RoomEndpoint, RoomId, Result};
//! # struct Emulator;
//! # impl widget_room::TerminalDisplay for Emulator {
//! #     fn write(&mut self, _: &[u8]) {}
//! #     fn reset(&mut self) {}
//! #     fn show_error(&mut self, _: &str) {}
//! # }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // One channel per widget on the page
//!     let mut multiplexer = Multiplexer::new();
//!     multiplexer.register(
//!         "shell-0",
//!         Box::new(widget_room::TerminalWidget::new(Emulator)),
//!     )?;
//!
//!     // Derive the socket endpoint from the page URL
//!     let endpoint = RoomEndpoint::from_page_url(
//!         "https://docs.example.com/guide/",
//!         RoomId::generate(),
//!     )?;
//!
//!     // Dial once the page and all widgets are ready
//!     let connection = RoomConnection::spawn(endpoint, multiplexer);
//!     connection.request_connect()?;
//!     connection.notify_ready()?;
//!
//!     // Forward user input to the widget's backing process
//!     connection.send("shell-0", json!({"stdin": "bHMK"}))?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire message types and the streaming record decoder |
//! | [`room`] | Multiplexer core, endpoint derivation, event loop |
//! | [`widgets`] | Built-in terminal, command, and resource widgets |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Wire protocol message types.
///
/// Envelope routing, per-widget payloads, and the streaming decoder for
/// framed record substreams.
pub mod protocol;

/// Room connection management.
///
/// The synchronous multiplexer core, the subscriber contract, endpoint
/// derivation, and the tokio event loop driving the socket.
pub mod room;

/// Built-in widget subscribers.
///
/// Terminal, command, and resource widgets, each generic over a display
/// trait the embedding UI implements.
pub mod widgets;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::RoomId;

// Protocol types
pub use protocol::{
    Envelope, FramingDecoder, Notification, OutputChunk, Record, ResourceAction, TerminalSize,
};

// Room types
pub use room::{
    ConnectionState, DisconnectIndicator, LogIndicator, Multiplexer, NoopIndicator,
    RoomConnection, RoomContext, RoomEndpoint, Subscriber,
};

// Widget types
pub use widgets::{
    CommandDisplay, CommandWidget, ResourceDisplay, ResourceWidget, TerminalDisplay,
    TerminalWidget,
};
