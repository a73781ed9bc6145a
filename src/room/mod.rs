//! Room connection layer.
//!
//! This module turns one physical WebSocket into many independent logical
//! channels, one per widget.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │  Page (Rust)     │                              │  Execution Host │
//! │                  │         WebSocket            │                 │
//! │  RoomConnection  │◄────────────────────────────►│  Room session   │
//! │  → Multiplexer   │      wss://.../ws?roomName=  │  (one process   │
//! │  → Subscribers   │                              │   per channel)  │
//! └──────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. Construct a [`Multiplexer`], `register` every widget channel
//! 2. `request_connect` once the page is assembled
//! 3. Each widget reports `notify_ready` after its asynchronous setup
//! 4. When both conditions hold, the driver dials the [`RoomEndpoint`]
//! 5. `on_open` broadcast, queued messages flushed, frames routed
//! 6. On close or error the session is over; no automatic reconnect
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `multiplexer` | Channel registry, ready gate, outbound queue, routing |
//! | `subscriber` | Widget-side capability contract |
//! | `endpoint` | WebSocket URL derivation |
//! | `connection` | Tokio event loop owning the physical socket |

// ============================================================================
// Submodules
// ============================================================================

/// Channel registry, ready gate, outbound queue and frame routing.
pub mod multiplexer;

/// Widget-side capability contract and lifecycle collaborators.
pub mod subscriber;

/// WebSocket endpoint derivation.
pub mod endpoint;

/// Event loop owning the physical WebSocket.
pub mod connection;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::RoomConnection;
pub use endpoint::RoomEndpoint;
pub use multiplexer::{ConnectionState, Multiplexer, RoomContext};
pub use subscriber::{DisconnectIndicator, LogIndicator, NoopIndicator, Subscriber};
