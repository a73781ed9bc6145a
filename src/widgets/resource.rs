//! File-backed resource widget.
//!
//! The channel is backed by a watcher process that streams the resource
//! as framed records: each stdout chunk carries part of a
//! newline-delimited JSON stream which [`FramingDecoder`] reassembles.
//! Every complete record replaces the displayed state wholesale, so the
//! display is always one record behind the file at worst.
//!
//! Edits flow the other way as [`ResourceAction`] payloads; the UI sends
//! them on this widget's channel and marks the display busy until the
//! watcher echoes the resulting record back.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::{debug, warn};

use crate::protocol::framing::{FramingDecoder, Record};
use crate::protocol::notification::Notification;
use crate::room::{RoomContext, Subscriber};

// ============================================================================
// ResourceDisplay
// ============================================================================

/// Display surface for a [`ResourceWidget`].
pub trait ResourceDisplay: Send {
    /// Replaces the displayed resource with a new base64 payload.
    ///
    /// The payload stays base64 so displays that embed it verbatim
    /// (data URIs for image viewers) never pay a decode round trip;
    /// text displays decode it themselves.
    fn show_contents(&mut self, data: &str);

    /// Replaces the displayed resource with an error state.
    fn show_error(&mut self, message: &str);

    /// Toggles the waiting indicator. Set while no record has arrived
    /// yet; cleared by the first record after (re)start.
    fn set_busy(&mut self, busy: bool);
}

// ============================================================================
// ResourceWidget
// ============================================================================

/// Subscriber bridging a watcher-backed channel to a resource display.
pub struct ResourceWidget<D> {
    /// Resource display surface.
    display: D,
    /// Reassembles framed records from stdout chunks.
    decoder: FramingDecoder,
    /// Decoder buffer cap, preserved across restarts.
    max_buffered: Option<usize>,
}

impl<D: ResourceDisplay> ResourceWidget<D> {
    /// Creates a resource widget with an unbounded reassembly buffer.
    #[must_use]
    pub fn new(display: D) -> Self {
        Self {
            display,
            decoder: FramingDecoder::new(),
            max_buffered: None,
        }
    }

    /// Creates a resource widget whose reassembly buffer is capped at
    /// `max_bytes` of decoded text.
    #[must_use]
    pub fn with_max_buffered(display: D, max_bytes: usize) -> Self {
        Self {
            display,
            decoder: FramingDecoder::with_max_buffered(max_bytes),
            max_buffered: Some(max_bytes),
        }
    }

    /// Drops any partially reassembled line. Called when the watcher
    /// restarts, since the new stream does not continue the old one.
    fn reset_decoder(&mut self) {
        self.decoder = match self.max_buffered {
            Some(max_bytes) => FramingDecoder::with_max_buffered(max_bytes),
            None => FramingDecoder::new(),
        };
    }

    /// Applies one reassembled record to the display.
    fn apply_record(&mut self, record: Record) {
        self.display.set_busy(false);
        match record {
            Record::Contents { data } => self.display.show_contents(&data),
            Record::Error { message } => self.display.show_error(&message),
        }
    }
}

impl<D: ResourceDisplay> Subscriber for ResourceWidget<D> {
    fn on_open(&mut self, _ctx: &mut RoomContext<'_>) {
        // Nothing to show until the watcher sends its first record.
        self.display.set_busy(true);
    }

    fn on_close(&mut self) {
        self.display.set_busy(false);
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
                self.reset_decoder();
                self.display.set_busy(true);
            }

            Notification::Output { stdout, stderr } => {
                if stderr.is_some() {
                    warn!(channel = ctx.channel(), "Record stream carries no stderr");
                    return;
                }
                let Some(chunk) = stdout else {
                    warn!(channel = ctx.channel(), "Output notification without data");
                    return;
                };
                match self.decoder.feed(&chunk) {
                    Ok(records) => {
                        for record in records {
                            self.apply_record(record);
                        }
                    }
                    Err(err) => {
                        warn!(channel = ctx.channel(), error = %err, "Undecodable chunk");
                    }
                }
            }

            Notification::Finished => {
                debug!(channel = ctx.channel(), "Watcher exited");
            }

            Notification::Errored { .. } => {
                self.display.set_busy(false);
                match notification.errored_message() {
                    Some(Ok(message)) => self.display.show_error(&message),
                    _ => self.display.show_error("watcher failed"),
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
