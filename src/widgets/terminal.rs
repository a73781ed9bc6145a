//! Raw pass-through terminal widget.
//!
//! The channel is backed by an interactive shell in a pty. Output chunks
//! are raw terminal bytes (escape sequences included) and go to the
//! display undecoded beyond base64; the display is expected to be a
//! terminal emulator that interprets them itself.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::{debug, warn};

use crate::protocol::TerminalSize;
use crate::protocol::action;
use crate::protocol::notification::{Notification, decode_bytes};
use crate::room::{RoomContext, Subscriber};

// ============================================================================
// TerminalDisplay
// ============================================================================

/// Display surface for a [`TerminalWidget`].
pub trait TerminalDisplay: Send {
    /// Writes raw terminal bytes to the emulator.
    fn write(&mut self, bytes: &[u8]);

    /// Clears the emulator screen. Called when the backing process
    /// (re)starts, so stale output never mixes with a fresh session.
    fn reset(&mut self);

    /// Shows a failure message in place of the session.
    fn show_error(&mut self, message: &str);
}

// ============================================================================
// TerminalWidget
// ============================================================================

/// Subscriber bridging one pty-backed channel to a terminal emulator.
///
/// If constructed with a known viewport size, the widget reports it to
/// the remote end as soon as the connection opens, so the pty is sized
/// before the first prompt renders. Later resizes are the UI's job
/// (send [`action::resize`] on this widget's channel).
pub struct TerminalWidget<D> {
    /// Terminal emulator surface.
    display: D,
    /// Viewport size to report on open, if already known.
    initial_size: Option<TerminalSize>,
}

impl<D: TerminalDisplay> TerminalWidget<D> {
    /// Creates a terminal widget with no known viewport size.
    #[must_use]
    pub fn new(display: D) -> Self {
        Self {
            display,
            initial_size: None,
        }
    }

    /// Creates a terminal widget that reports `size` once the
    /// connection opens.
    #[must_use]
    pub fn with_size(display: D, size: TerminalSize) -> Self {
        Self {
            display,
            initial_size: Some(size),
        }
    }
}

impl<D: TerminalDisplay> Subscriber for TerminalWidget<D> {
    fn on_open(&mut self, ctx: &mut RoomContext<'_>) {
        if let Some(size) = self.initial_size {
            ctx.reply(action::resize(size));
        }
    }

    fn on_close(&mut self) {}

    fn on_message(&mut self, ctx: &mut RoomContext<'_>, payload: &Value) {
        let notification = match Notification::parse(payload) {
            Ok(notification) => notification,
            Err(err) => {
                warn!(channel = ctx.channel(), error = %err, "Unparseable payload");
                return;
            }
        };

        match notification {
            Notification::Started => self.display.reset(),

            Notification::Output { .. } => {
                let Some(chunk) = notification.chunk() else {
                    warn!(channel = ctx.channel(), "Output notification without data");
                    return;
                };
                // A pty merges the streams remotely, but a stderr chunk
                // is still displayable if one ever arrives.
                match decode_bytes(chunk.data()) {
                    Ok(bytes) => self.display.write(&bytes),
                    Err(err) => {
                        warn!(channel = ctx.channel(), error = %err, "Undecodable chunk");
                    }
                }
            }

            Notification::Finished => {
                debug!(channel = ctx.channel(), "Session ended");
            }

            Notification::Errored { .. } => match notification.errored_message() {
                Some(Ok(message)) => self.display.show_error(&message),
                _ => self.display.show_error("session failed"),
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use crate::protocol::Envelope;
    use crate::protocol::notification::encode_text;
    use crate::room::{Multiplexer, NoopIndicator};

    #[derive(Clone, Default)]
    struct MockTerminal {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl TerminalDisplay for MockTerminal {
        fn write(&mut self, bytes: &[u8]) {
            self.log
                .lock()
                .unwrap()
                .push(format!("write:{}", String::from_utf8_lossy(bytes)));
        }

        fn reset(&mut self) {
            self.log.lock().unwrap().push("reset".into());
        }

        fn show_error(&mut self, message: &str) {
            self.log.lock().unwrap().push(format!("error:{message}"));
        }
    }

    fn mux_with_terminal(widget: TerminalWidget<MockTerminal>) -> Multiplexer {
        let mut multiplexer = Multiplexer::with_indicator(Box::new(NoopIndicator));
        multiplexer
            .register("term", Box::new(widget))
            .expect("register");
        multiplexer.request_connect();
        multiplexer.notify_ready();
        multiplexer
    }

    fn frame(payload: Value) -> String {
        Envelope::new("term", payload).encode().expect("encode")
    }

    #[test]
    fn test_output_reaches_display_raw() {
        let display = MockTerminal::default();
        let log = Arc::clone(&display.log);
        let mut multiplexer = mux_with_terminal(TerminalWidget::new(display));
        multiplexer.handle_open();

        multiplexer.handle_frame(&frame(json!({
            "type": "output",
            "stdout": encode_text("\x1b[2J$ "),
        })));

        assert_eq!(log.lock().unwrap().clone(), vec!["write:\x1b[2J$ "]);
    }

    #[test]
    fn test_started_resets_display() {
        let display = MockTerminal::default();
        let log = Arc::clone(&display.log);
        let mut multiplexer = mux_with_terminal(TerminalWidget::new(display));
        multiplexer.handle_open();

        multiplexer.handle_frame(&frame(json!({"type": "started"})));
        assert_eq!(log.lock().unwrap().clone(), vec!["reset"]);
    }

    #[test]
    fn test_initial_size_reported_on_open() {
        let display = MockTerminal::default();
        let widget = TerminalWidget::with_size(display, TerminalSize::new(24, 80));
        let mut multiplexer = mux_with_terminal(widget);
        multiplexer.handle_open();

        let frames = multiplexer.take_outgoing();
        assert_eq!(frames.len(), 1);

        let envelope = Envelope::decode(&frames[0]).expect("envelope");
        assert_eq!(envelope.executor, "term");
        assert_eq!(envelope.message["size"]["rows"], 24);
        assert_eq!(envelope.message["size"]["cols"], 80);
    }

    #[test]
    fn test_no_size_means_no_open_traffic() {
        let display = MockTerminal::default();
        let mut multiplexer = mux_with_terminal(TerminalWidget::new(display));
        multiplexer.handle_open();

        assert!(multiplexer.take_outgoing().is_empty());
    }

    #[test]
    fn test_errored_shows_message() {
        let display = MockTerminal::default();
        let log = Arc::clone(&display.log);
        let mut multiplexer = mux_with_terminal(TerminalWidget::new(display));
        multiplexer.handle_open();

        multiplexer.handle_frame(&frame(json!({
            "type": "errored",
            "stdout": encode_text("pty allocation failed"),
        })));

        assert_eq!(
            log.lock().unwrap().clone(),
            vec!["error:pty allocation failed"]
        );
    }
}
