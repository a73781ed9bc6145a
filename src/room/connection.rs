//! Event loop owning the physical WebSocket.
//!
//! [`RoomConnection`] is the async shell around the synchronous
//! [`Multiplexer`] core. It spawns a tokio task that:
//!
//! - waits for the ready gate before dialing the endpoint
//! - forwards local commands (sends, readiness reports) into the core
//! - pushes inbound text frames into the core and flushes whatever the
//!   core staged for transmit after every event
//! - translates remote close and transport errors into the terminal
//!   `Closed` state, never reconnecting
//!
//! The handle is cheap to clone and safe to use from any task; commands
//! travel over an unbounded channel so nothing here blocks.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, warn};

use crate::error::{Error, Result};

use super::endpoint::RoomEndpoint;
use super::multiplexer::{ConnectionState, Multiplexer};

// ============================================================================
// Types
// ============================================================================

/// Write half of the physical socket.
type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

// ============================================================================
// RoomCommand
// ============================================================================

/// Internal commands for the event loop.
enum RoomCommand {
    /// Send a payload on a channel.
    Send {
        channel: String,
        payload: Value,
    },
    /// One widget finished its asynchronous setup.
    NotifyReady,
    /// The page is assembled; connect when all widgets are ready.
    RequestConnect,
    /// Close the connection and stop the loop.
    Shutdown,
}

// ============================================================================
// RoomConnection
// ============================================================================

/// Handle to a running room event loop.
///
/// # Thread Safety
///
/// `RoomConnection` is `Send + Sync` and cheap to clone. All operations
/// are non-blocking; they enqueue commands for the event loop task.
pub struct RoomConnection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<RoomCommand>,
    /// Connection state mirror, updated by the event loop.
    state: Arc<Mutex<ConnectionState>>,
}

impl Clone for RoomConnection {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl RoomConnection {
    /// Spawns the event loop for a fully registered multiplexer.
    ///
    /// The connection is not dialed yet; it opens once
    /// [`request_connect`](Self::request_connect) has been called and
    /// every registered widget has reported ready.
    #[must_use]
    pub fn spawn(endpoint: RoomEndpoint, multiplexer: Multiplexer) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(ConnectionState::Pending));

        tokio::spawn(run_event_loop(
            endpoint,
            multiplexer,
            command_rx,
            Arc::clone(&state),
        ));

        Self { command_tx, state }
    }

    /// Sends a payload on a channel.
    ///
    /// Queued before open, transmitted immediately once open, dropped
    /// with a diagnostic after close; this call itself only fails if
    /// the event loop is gone entirely.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the event loop has terminated.
    pub fn send(&self, channel: impl Into<String>, payload: Value) -> Result<()> {
        self.command(RoomCommand::Send {
            channel: channel.into(),
            payload,
        })
    }

    /// Reports one widget as ready.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the event loop has terminated.
    pub fn notify_ready(&self) -> Result<()> {
        self.command(RoomCommand::NotifyReady)
    }

    /// Arms the ready gate; connects once all widgets are ready.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the event loop has terminated.
    pub fn request_connect(&self) -> Result<()> {
        self.command(RoomCommand::RequestConnect)
    }

    /// Shuts the connection down gracefully.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(RoomCommand::Shutdown);
    }

    /// Returns a snapshot of the connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Sends one command to the event loop.
    fn command(&self, command: RoomCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::ChannelClosed)
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Event loop driving one room connection from gate to close.
async fn run_event_loop(
    endpoint: RoomEndpoint,
    mut multiplexer: Multiplexer,
    mut command_rx: mpsc::UnboundedReceiver<RoomCommand>,
    state: Arc<Mutex<ConnectionState>>,
) {
    // Phase 1: hold commands until the ready gate fires.
    let should_connect = loop {
        match command_rx.recv().await {
            Some(RoomCommand::Send { channel, payload }) => {
                multiplexer.send(&channel, payload);
            }
            Some(RoomCommand::NotifyReady) => {
                if multiplexer.notify_ready() {
                    break true;
                }
            }
            Some(RoomCommand::RequestConnect) => {
                if multiplexer.request_connect() {
                    break true;
                }
            }
            Some(RoomCommand::Shutdown) | None => break false,
        }
    };

    if !should_connect {
        debug!("Event loop stopping before connect");
        multiplexer.handle_close();
        *state.lock() = multiplexer.state();
        return;
    }

    // Phase 2: dial the endpoint.
    debug!(endpoint = %endpoint, "Connecting");
    let ws_stream = match connect_async(endpoint.as_str()).await {
        Ok((ws_stream, _response)) => ws_stream,
        Err(err) => {
            error!(error = %err, "WebSocket connect failed");
            multiplexer.handle_close();
            *state.lock() = multiplexer.state();
            drain_after_close(&mut command_rx, &mut multiplexer).await;
            return;
        }
    };

    let (mut ws_write, mut ws_read) = ws_stream.split();

    multiplexer.handle_open();
    *state.lock() = multiplexer.state();
    if let Err(err) = flush_outgoing(&mut ws_write, &mut multiplexer).await {
        error!(error = %err, "Transmit failed right after open");
        multiplexer.handle_close();
        *state.lock() = multiplexer.state();
        drain_after_close(&mut command_rx, &mut multiplexer).await;
        return;
    }

    // Phase 3: route frames and commands until the connection ends.
    loop {
        tokio::select! {
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        multiplexer.handle_frame(text.as_str());
                        if let Err(err) = flush_outgoing(&mut ws_write, &mut multiplexer).await {
                            error!(error = %err, "Transmit failed");
                            break;
                        }
                    }

                    Some(Ok(Message::Close(_))) => {
                        debug!("WebSocket closed by remote");
                        break;
                    }

                    Some(Err(err)) => {
                        error!(error = %err, "WebSocket error");
                        break;
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            command = command_rx.recv() => {
                match command {
                    Some(RoomCommand::Send { channel, payload }) => {
                        multiplexer.send(&channel, payload);
                        if let Err(err) = flush_outgoing(&mut ws_write, &mut multiplexer).await {
                            error!(error = %err, "Transmit failed");
                            break;
                        }
                    }

                    // Late readiness reports are inert once open.
                    Some(RoomCommand::NotifyReady) => {
                        let _ = multiplexer.notify_ready();
                    }
                    Some(RoomCommand::RequestConnect) => {
                        let _ = multiplexer.request_connect();
                    }

                    Some(RoomCommand::Shutdown) => {
                        debug!("Shutdown command received");
                        let _ = ws_write.close().await;
                        break;
                    }

                    None => {
                        debug!("All handles dropped");
                        let _ = ws_write.close().await;
                        break;
                    }
                }
            }
        }
    }

    multiplexer.handle_close();
    *state.lock() = multiplexer.state();
    drain_after_close(&mut command_rx, &mut multiplexer).await;

    debug!("Event loop terminated");
}

/// Flushes everything the multiplexer staged for transmit.
async fn flush_outgoing(ws_write: &mut WsSink, multiplexer: &mut Multiplexer) -> Result<()> {
    for frame in multiplexer.take_outgoing() {
        ws_write.send(Message::Text(frame.into())).await?;
    }
    Ok(())
}

/// Keeps consuming commands after close so that late `send` calls are
/// dropped with a diagnostic instead of failing the caller.
async fn drain_after_close(
    command_rx: &mut mpsc::UnboundedReceiver<RoomCommand>,
    multiplexer: &mut Multiplexer,
) {
    loop {
        match command_rx.recv().await {
            Some(RoomCommand::Send { channel, payload }) => {
                // Routed into the closed core, which warns and drops.
                multiplexer.send(&channel, payload);
            }
            Some(RoomCommand::NotifyReady | RoomCommand::RequestConnect) => {
                warn!("Readiness signal after connection close");
            }
            Some(RoomCommand::Shutdown) | None => break,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
