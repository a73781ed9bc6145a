//! Widget-side capability contract.
//!
//! A [`Subscriber`] is the receiving end of one logical channel. The
//! multiplexer delivers three kinds of events to it: connection opened,
//! connection closed, and a routed message payload. Everything a widget
//! does (display updates, decoder feeding, replies) happens inside
//! these callbacks.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::{info, warn};

use super::multiplexer::RoomContext;

// ============================================================================
// Subscriber
// ============================================================================

/// The capability set a widget must implement to receive routed events.
///
/// Callbacks run synchronously on the room event loop; each runs to
/// completion before the next event is processed. Sending from inside a
/// callback (via [`RoomContext`]) is the normal reply pattern and is
/// always safe.
pub trait Subscriber: Send {
    /// Called once when the physical connection opens.
    ///
    /// Queued messages have already been flushed to the transport at this
    /// point, so anything sent here follows them in order.
    fn on_open(&mut self, ctx: &mut RoomContext<'_>);

    /// Called once when the physical connection closes or errors.
    ///
    /// Terminal for the session; no `on_open` will ever follow.
    fn on_close(&mut self);

    /// Called for each inbound payload addressed to this channel.
    fn on_message(&mut self, ctx: &mut RoomContext<'_>, payload: &Value);
}

// ============================================================================
// DisconnectIndicator
// ============================================================================

/// Page-wide connection status collaborator.
///
/// The multiplexer has no UI dependency; whatever renders the persistent
/// "connection lost" banner implements this trait and is injected at
/// construction. Only transport faults reach it; per-frame and per-record
/// faults stay local to the affected widget.
pub trait DisconnectIndicator: Send {
    /// Show the persistent connection-lost indicator.
    fn show_disconnected(&mut self);

    /// Clear the indicator (connection established).
    fn show_connected(&mut self);
}

// ============================================================================
// Provided Indicators
// ============================================================================

/// Indicator that does nothing.
///
/// For tests and embedders that surface connection state elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopIndicator;

impl DisconnectIndicator for NoopIndicator {
    fn show_disconnected(&mut self) {}

    fn show_connected(&mut self) {}
}

/// Indicator that reports connection state through `tracing`.
///
/// The default indicator: loss of the room connection is always worth a
/// log line even when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogIndicator;

impl DisconnectIndicator for LogIndicator {
    fn show_disconnected(&mut self) {
        warn!("Room connection lost; reload required to resume");
    }

    fn show_connected(&mut self) {
        info!("Room connection established");
    }
}
