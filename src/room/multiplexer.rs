//! Connection multiplexer: channel registry, ready gate, outbound queue
//! and frame routing.
//!
//! The [`Multiplexer`] is the synchronous core of the room layer. It owns
//! no I/O: inbound frames are pushed into it by the event loop
//! ([`connection`](super::connection)), and outbound frames accumulate in
//! an internal transmit buffer that the event loop drains after every
//! delivered event. This keeps all state transitions single-threaded and
//! run-to-completion, and makes every property testable without a socket.
//!
//! # Startup protocol
//!
//! Widgets register first and perform asynchronous setup (fonts, layout,
//! viewport measurement) before they can usefully receive the `on_open`
//! broadcast. The ready gate counts outstanding widgets: the physical
//! connection is requested only when `request_connect` has been called
//! *and* every registered widget has reported ready, whichever happens
//! last.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::protocol::Envelope;

use super::subscriber::{DisconnectIndicator, LogIndicator, Subscriber};

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of the physical connection.
///
/// `Open` is entered exactly once; `Closed` is terminal. Reconnection
/// would resume a different backend session, so it is never automatic;
/// the only recovery is a page reload creating a fresh room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not yet connected; outbound messages are queued.
    Pending,
    /// Connected; messages transmit immediately.
    Open,
    /// Closed or errored; terminal.
    Closed,
}

// ============================================================================
// Channel
// ============================================================================

/// One registered logical channel.
struct Channel {
    /// Stable, caller-chosen channel name (the wire `executor` field).
    name: String,
    /// The widget bound to this channel.
    subscriber: Box<dyn Subscriber>,
}

// ============================================================================
// RoomState
// ============================================================================

/// Mutable room state shared between the multiplexer and [`RoomContext`].
///
/// Split out of [`Multiplexer`] so a subscriber callback can hold a
/// mutable borrow of its own channel while still sending through the
/// room (the re-entrant reply pattern).
struct RoomState {
    /// Physical connection state.
    state: ConnectionState,

    /// Widgets that registered but have not yet reported ready.
    pending_widgets: usize,

    /// Whether `request_connect` has been called.
    armed: bool,

    /// Whether the connect signal has already been handed to the driver.
    connect_issued: bool,

    /// Messages sent before open, in insertion order.
    queue: VecDeque<Envelope>,

    /// Encoded frames awaiting transmission by the driver.
    outgoing: VecDeque<String>,

    /// Page-wide connection status collaborator.
    indicator: Box<dyn DisconnectIndicator>,
}

impl RoomState {
    /// Routes one outbound envelope according to connection state.
    ///
    /// Pending: enqueue. Open: encode and stage for transmit. Closed:
    /// drop with a diagnostic. The upstream process cannot resume, and
    /// the disconnect indicator is already showing, so queueing would
    /// only hide the loss.
    fn send_envelope(&mut self, envelope: Envelope) {
        match self.state {
            ConnectionState::Pending => self.queue.push_back(envelope),
            ConnectionState::Open => self.stage(envelope),
            ConnectionState::Closed => {
                warn!(
                    channel = %envelope.executor,
                    "Dropping message sent after connection close"
                );
            }
        }
    }

    /// Encodes an envelope into the transmit buffer.
    fn stage(&mut self, envelope: Envelope) {
        match envelope.encode() {
            Ok(frame) => self.outgoing.push_back(frame),
            Err(err) => {
                warn!(
                    channel = %envelope.executor,
                    error = %err,
                    "Failed to encode outbound envelope"
                );
            }
        }
    }
}

// ============================================================================
// RoomContext
// ============================================================================

/// Send capability handed to subscriber callbacks.
///
/// Borrowing rules prevent a subscriber from holding a reference to the
/// whole multiplexer while being called by it; the context exposes the
/// parts a callback may touch. Sends issued here follow the same
/// state-dependent routing as any other send.
pub struct RoomContext<'a> {
    room: &'a mut RoomState,
    index: &'a FxHashMap<String, usize>,
    channel: &'a str,
}

impl RoomContext<'_> {
    /// Returns the channel name this callback is bound to.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &str {
        self.channel
    }

    /// Sends a payload back on this callback's own channel.
    ///
    /// The normal reply pattern: a widget answering from inside its own
    /// `on_open` or `on_message` handler.
    #[inline]
    pub fn reply(&mut self, payload: Value) {
        let envelope = Envelope::new(self.channel, payload);
        self.room.send_envelope(envelope);
    }

    /// Sends a payload on an arbitrary channel.
    ///
    /// Addressing a channel nobody registered is almost always a wiring
    /// bug; it trips an assertion in development builds but is still
    /// transmitted in release builds (the remote end may accept messages
    /// for executors that never reply).
    pub fn send(&mut self, channel: &str, payload: Value) {
        if !self.index.contains_key(channel) {
            warn!(channel, "Send on unregistered channel");
            debug_assert!(
                self.index.contains_key(channel),
                "send on unregistered channel: {channel}"
            );
        }
        self.room.send_envelope(Envelope::new(channel, payload));
    }
}

// ============================================================================
// Multiplexer
// ============================================================================

/// Owns the channel registry, the ready gate and the outbound queue;
/// routes inbound frames to subscribers and broadcasts lifecycle events.
///
/// Created once per page and alive for the page's lifetime. The driver
/// ([`RoomConnection`](super::RoomConnection)) feeds it transport events
/// and drains its transmit buffer; everything else is synchronous state.
pub struct Multiplexer {
    /// Registered channels, in registration order (broadcast order).
    channels: Vec<Channel>,

    /// Channel-name lookup into `channels`.
    index: FxHashMap<String, usize>,

    /// Connection state, gate counters, queue and transmit buffer.
    room: RoomState,
}

impl Default for Multiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Multiplexer {
    /// Creates a multiplexer with the default logging indicator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_indicator(Box::new(LogIndicator))
    }

    /// Creates a multiplexer with an injected disconnect indicator.
    #[must_use]
    pub fn with_indicator(indicator: Box<dyn DisconnectIndicator>) -> Self {
        Self {
            channels: Vec::new(),
            index: FxHashMap::default(),
            room: RoomState {
                state: ConnectionState::Pending,
                pending_widgets: 0,
                armed: false,
                connect_issued: false,
                queue: VecDeque::new(),
                outgoing: VecDeque::new(),
                indicator,
            },
        }
    }

    // ========================================================================
    // Registration & Ready Gate
    // ========================================================================

    /// Registers a subscriber under a channel name.
    ///
    /// Registration also registers one outstanding readiness report: the
    /// widget owes exactly one [`notify_ready`](Self::notify_ready) call.
    ///
    /// Registering after the open broadcast is allowed but the subscriber
    /// misses the `on_open` already delivered to the others; registration
    /// belongs in the page's initialization phase.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateChannel`] if the name is already taken.
    pub fn register(
        &mut self,
        channel: impl Into<String>,
        subscriber: Box<dyn Subscriber>,
    ) -> Result<()> {
        let name = channel.into();
        if self.index.contains_key(&name) {
            return Err(Error::duplicate_channel(name));
        }

        debug!(channel = %name, "Channel registered");
        self.index.insert(name.clone(), self.channels.len());
        self.channels.push(Channel {
            name,
            subscriber,
        });
        self.room.pending_widgets += 1;
        Ok(())
    }

    /// Arms the ready gate.
    ///
    /// Returns `true` if the driver should establish the physical
    /// connection now; otherwise the connect is deferred until the last
    /// outstanding widget reports ready.
    pub fn request_connect(&mut self) -> bool {
        self.room.armed = true;
        self.maybe_connect()
    }

    /// Reports one widget as ready.
    ///
    /// Returns `true` if this was the last outstanding widget and the
    /// gate is armed, meaning the driver should connect now.
    pub fn notify_ready(&mut self) -> bool {
        if self.room.pending_widgets == 0 {
            warn!("notify_ready without matching registration");
            debug_assert!(
                self.room.pending_widgets > 0,
                "notify_ready without matching registration"
            );
            return false;
        }

        self.room.pending_widgets -= 1;
        self.maybe_connect()
    }

    /// Checks the gate; signals connect at most once.
    fn maybe_connect(&mut self) -> bool {
        let fire = self.room.armed
            && self.room.pending_widgets == 0
            && self.room.state == ConnectionState::Pending
            && !self.room.connect_issued;
        if fire {
            debug!("Ready gate satisfied, connecting");
            self.room.connect_issued = true;
        }
        fire
    }

    // ========================================================================
    // Sending
    // ========================================================================

    /// Sends a payload on a channel.
    ///
    /// Open: staged for transmit immediately, preserving call order.
    /// Pending: appended to the outbound queue, drained in order on open.
    /// Closed: dropped with a diagnostic; never an error to the caller.
    pub fn send(&mut self, channel: &str, payload: Value) {
        if !self.index.contains_key(channel) {
            warn!(channel, "Send on unregistered channel");
            debug_assert!(
                self.index.contains_key(channel),
                "send on unregistered channel: {channel}"
            );
        }
        self.room.send_envelope(Envelope::new(channel, payload));
    }

    /// Drains the encoded frames awaiting transmission.
    ///
    /// Called by the driver after every event delivered into the
    /// multiplexer; frames come out in staging order.
    #[must_use]
    pub fn take_outgoing(&mut self) -> Vec<String> {
        self.room.outgoing.drain(..).collect()
    }

    // ========================================================================
    // Transport Events
    // ========================================================================

    /// Handles the physical connection opening.
    ///
    /// Drains the outbound queue strictly in insertion order, then
    /// broadcasts `on_open` in registration order, so anything a
    /// subscriber sends from its `on_open` handler follows every queued
    /// message on the wire.
    pub fn handle_open(&mut self) {
        if self.room.state != ConnectionState::Pending {
            warn!(state = ?self.room.state, "Ignoring open in non-pending state");
            return;
        }

        debug!(channels = self.channels.len(), "Connection open");
        self.room.state = ConnectionState::Open;
        self.room.indicator.show_connected();

        while let Some(envelope) = self.room.queue.pop_front() {
            self.room.stage(envelope);
        }

        let index = &self.index;
        let room = &mut self.room;
        for channel in &mut self.channels {
            let Channel { name, subscriber } = channel;
            let mut ctx = RoomContext {
                room: &mut *room,
                index,
                channel: name,
            };
            subscriber.on_open(&mut ctx);
        }
    }

    /// Handles one inbound text frame.
    ///
    /// A malformed frame, or a frame addressed to an unknown channel, is
    /// dropped with a diagnostic; it never terminates the connection or
    /// reaches any other channel.
    pub fn handle_frame(&mut self, text: &str) {
        let envelope = match Envelope::decode(text) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(error = %err, "Dropping malformed inbound frame");
                return;
            }
        };

        let Some(&position) = self.index.get(&envelope.executor) else {
            warn!(channel = %envelope.executor, "Dropping frame for unknown channel");
            return;
        };

        let Channel { name, subscriber } = &mut self.channels[position];
        let mut ctx = RoomContext {
            room: &mut self.room,
            index: &self.index,
            channel: name,
        };
        subscriber.on_message(&mut ctx, &envelope.message);
    }

    /// Handles the physical connection closing or erroring.
    ///
    /// Idempotent; terminal. Broadcasts `on_close` in registration order
    /// and raises the persistent disconnect indicator.
    pub fn handle_close(&mut self) {
        if self.room.state == ConnectionState::Closed {
            return;
        }

        debug!("Connection closed");
        self.room.state = ConnectionState::Closed;
        self.room.indicator.show_disconnected();

        for channel in &mut self.channels {
            channel.subscriber.on_close();
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.room.state
    }

    /// Returns the number of registered channels.
    #[inline]
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Returns the number of widgets that have not yet reported ready.
    #[inline]
    #[must_use]
    pub fn pending_widgets(&self) -> usize {
        self.room.pending_widgets
    }

    /// Returns the number of messages queued awaiting open.
    #[inline]
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.room.queue.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
