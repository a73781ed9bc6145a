//! Trigger-and-capture command widget.
//!
//! The channel is backed by a command the remote end runs on demand: the
//! UI sends a `null` trigger payload and the process lifecycle streams
//! back as notifications. The display shows captured stdout and stderr
//! separately and exposes a trigger control that must only be usable
//! while the connection is open and no run is in flight.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::{debug, warn};

use crate::protocol::notification::{Notification, OutputChunk, decode_text};
use crate::room::{RoomContext, Subscriber};

// ============================================================================
// CommandDisplay
// ============================================================================

/// Display surface for a [`CommandWidget`].
pub trait CommandDisplay: Send {
    /// Discards previously captured output. Called when a run starts.
    fn clear(&mut self);

    /// Appends one decoded stdout chunk.
    fn append_stdout(&mut self, text: &str);

    /// Appends one decoded stderr chunk.
    fn append_stderr(&mut self, text: &str);

    /// Shows a run failure message.
    fn show_error(&mut self, message: &str);

    /// Enables or disables the trigger control.
    fn set_trigger_enabled(&mut self, enabled: bool);
}

// ============================================================================
// CommandWidget
// ============================================================================

/// Subscriber bridging a run-on-demand channel to a capture display.
///
/// Tracks two bits of state: whether the connection is open and whether
/// a run is in flight. The trigger control is enabled exactly when the
/// first holds and the second does not. Triggering itself is the UI's
/// job (send [`action::trigger`](crate::protocol::action::trigger) on
/// this widget's channel).
pub struct CommandWidget<D> {
    /// Capture display surface.
    display: D,
    /// Connection is open.
    open: bool,
    /// A run is in flight.
    running: bool,
}

impl<D: CommandDisplay> CommandWidget<D> {
    /// Creates a command widget. The trigger starts disabled.
    #[must_use]
    pub fn new(mut display: D) -> Self {
        display.set_trigger_enabled(false);
        Self {
            display,
            open: false,
            running: false,
        }
    }

    /// Pushes the current trigger availability to the display.
    fn update_trigger(&mut self) {
        self.display.set_trigger_enabled(self.open && !self.running);
    }
}

impl<D: CommandDisplay> Subscriber for CommandWidget<D> {
    fn on_open(&mut self, _ctx: &mut RoomContext<'_>) {
        self.open = true;
        self.update_trigger();
    }

    fn on_close(&mut self) {
        self.open = false;
        self.running = false;
        self.display.set_trigger_enabled(false);
    }

    fn on_message(&mut self, ctx: &mut RoomContext<'_>, payload: &Value) {
        let notification = match Notification::parse(payload) {
            Ok(notification) => notification,
            Err(err) => {
                warn!(channel = ctx.channel(), error = %err, "Unparseable payload");
                return;
            }
        };

        match notification {
            Notification::Started => {
                self.running = true;
                self.display.clear();
                self.update_trigger();
            }

            Notification::Output { .. } => {
                let Some(chunk) = notification.chunk() else {
                    warn!(channel = ctx.channel(), "Output notification without data");
                    return;
                };
                match decode_text(chunk.data()) {
                    Ok(text) => match chunk {
                        OutputChunk::Stdout(_) => self.display.append_stdout(&text),
                        OutputChunk::Stderr(_) => self.display.append_stderr(&text),
                    },
                    Err(err) => {
                        warn!(channel = ctx.channel(), error = %err, "Undecodable chunk");
                    }
                }
            }

            Notification::Finished => {
                debug!(channel = ctx.channel(), "Run finished");
                self.running = false;
                self.update_trigger();
            }

            Notification::Errored { .. } => {
                self.running = false;
                match notification.errored_message() {
                    Some(Ok(message)) => self.display.show_error(&message),
                    _ => self.display.show_error("run failed"),
                }
                self.update_trigger();
            }
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
    struct MockCapture {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl CommandDisplay for MockCapture {
        fn clear(&mut self) {
            self.log.lock().unwrap().push("clear".into());
        }

        fn append_stdout(&mut self, text: &str) {
            self.log.lock().unwrap().push(format!("out:{text}"));
        }

        fn append_stderr(&mut self, text: &str) {
            self.log.lock().unwrap().push(format!("err:{text}"));
        }

        fn show_error(&mut self, message: &str) {
            self.log.lock().unwrap().push(format!("fail:{message}"));
        }

        fn set_trigger_enabled(&mut self, enabled: bool) {
            self.log.lock().unwrap().push(format!("trigger:{enabled}"));
        }
    }

    fn mux_with_command(display: MockCapture) -> Multiplexer {
        let mut multiplexer = Multiplexer::with_indicator(Box::new(NoopIndicator));
        multiplexer
            .register("run", Box::new(CommandWidget::new(display)))
            .expect("register");
        multiplexer.request_connect();
        multiplexer.notify_ready();
        multiplexer
    }

    fn frame(payload: Value) -> String {
        Envelope::new("run", payload).encode().expect("encode")
    }

    #[test]
    fn test_trigger_enabled_only_while_open_and_idle() {
        let display = MockCapture::default();
        let log = Arc::clone(&display.log);
        let mut multiplexer = mux_with_command(display);

        // Disabled at construction, enabled on open.
        multiplexer.handle_open();
        assert_eq!(
            log.lock().unwrap().clone(),
            vec!["trigger:false", "trigger:true"]
        );

        // Disabled while a run is in flight, back on when it finishes.
        multiplexer.handle_frame(&frame(json!({"type": "started"})));
        multiplexer.handle_frame(&frame(json!({"type": "finished"})));
        assert_eq!(
            log.lock().unwrap().clone(),
            vec![
                "trigger:false",
                "trigger:true",
                "clear",
                "trigger:false",
                "trigger:true",
            ]
        );

        // Disabled for good on close.
        multiplexer.handle_close();
        assert_eq!(log.lock().unwrap().last().unwrap(), "trigger:false");
    }

    #[test]
    fn test_started_clears_previous_output() {
        let display = MockCapture::default();
        let log = Arc::clone(&display.log);
        let mut multiplexer = mux_with_command(display);
        multiplexer.handle_open();

        multiplexer.handle_frame(&frame(json!({"type": "started"})));
        multiplexer.handle_frame(&frame(json!({
            "type": "output",
            "stdout": encode_text("first\n"),
        })));
        multiplexer.handle_frame(&frame(json!({"type": "started"})));

        let entries = log.lock().unwrap().clone();
        let clears = entries.iter().filter(|entry| *entry == "clear").count();
        assert_eq!(clears, 2);
        assert!(entries.contains(&"out:first\n".to_string()));
    }

    #[test]
    fn test_streams_are_kept_apart() {
        let display = MockCapture::default();
        let log = Arc::clone(&display.log);
        let mut multiplexer = mux_with_command(display);
        multiplexer.handle_open();

        multiplexer.handle_frame(&frame(json!({
            "type": "output",
            "stdout": encode_text("compiled ok\n"),
        })));
        multiplexer.handle_frame(&frame(json!({
            "type": "output",
            "stderr": encode_text("warning: unused\n"),
        })));

        let entries = log.lock().unwrap().clone();
        assert!(entries.contains(&"out:compiled ok\n".to_string()));
        assert!(entries.contains(&"err:warning: unused\n".to_string()));
    }

    #[test]
    fn test_errored_ends_the_run_with_message() {
        let display = MockCapture::default();
        let log = Arc::clone(&display.log);
        let mut multiplexer = mux_with_command(display);
        multiplexer.handle_open();

        multiplexer.handle_frame(&frame(json!({"type": "started"})));
        multiplexer.handle_frame(&frame(json!({
            "type": "errored",
            "stdout": encode_text("exit status 1"),
        })));

        let entries = log.lock().unwrap().clone();
        assert!(entries.contains(&"fail:exit status 1".to_string()));
        // Run over, trigger available again.
        assert_eq!(entries.last().unwrap(), "trigger:true");
    }

    #[test]
    fn test_unparseable_payload_is_dropped() {
        let display = MockCapture::default();
        let log = Arc::clone(&display.log);
        let mut multiplexer = mux_with_command(display);
        multiplexer.handle_open();

        let before = log.lock().unwrap().len();
        multiplexer.handle_frame(&frame(json!({"type": "rebooted"})));
        assert_eq!(log.lock().unwrap().len(), before);
    }
}
