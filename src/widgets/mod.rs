//! Built-in widget subscribers.
//!
//! Each widget couples one multiplexer channel to a display surface. The
//! widget owns the protocol interpretation (parsing notifications,
//! decoding output, reassembling framed records); the display trait is
//! the seam where a concrete UI plugs in.
//!
//! | Widget | Backing process | Display seam |
//! |--------|-----------------|--------------|
//! | [`TerminalWidget`] | Interactive shell in a pty | [`TerminalDisplay`] |
//! | [`CommandWidget`] | Command triggered on demand | [`CommandDisplay`] |
//! | [`ResourceWidget`] | File watcher streaming framed records | [`ResourceDisplay`] |
//!
//! Outbound traffic (keystrokes, triggers, resource edits) does not go
//! through the widget: the UI sends it on the widget's channel via
//! [`RoomConnection::send`](crate::room::RoomConnection::send), using the
//! payload constructors in [`protocol::action`](crate::protocol::action).

// ============================================================================
// Submodules
// ============================================================================

/// Raw pass-through terminal widget.
pub mod terminal;

/// Trigger-and-capture command widget.
pub mod command;

/// File-backed resource widget.
pub mod resource;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{CommandDisplay, CommandWidget};
pub use resource::{ResourceDisplay, ResourceWidget};
pub use terminal::{TerminalDisplay, TerminalWidget};
