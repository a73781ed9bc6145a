//! Outbound per-widget payload constructors.
//!
//! Widgets reply to the execution host through the same envelope channel
//! they receive notifications on. The payload shapes are per-role:
//!
//! | Role | Payload |
//! |------|---------|
//! | Terminal keystrokes | `{"stdin": <b64>}` |
//! | Terminal viewport | `{"size": {"rows": n, "cols": n}}` |
//! | Run-button trigger | `null` |
//! | Resource edit | `{"stdin": <b64 of one JSON line>}` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::notification::encode_text;

// ============================================================================
// TerminalSize
// ============================================================================

/// Terminal viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSize {
    /// Number of rows.
    pub rows: u16,
    /// Number of columns.
    pub cols: u16,
}

impl TerminalSize {
    /// Creates a new terminal size.
    #[inline]
    #[must_use]
    pub const fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

// ============================================================================
// Payload Constructors
// ============================================================================

/// Builds a stdin payload carrying raw input text.
#[inline]
#[must_use]
pub fn stdin(data: &str) -> Value {
    json!({ "stdin": encode_text(data) })
}

/// Builds a viewport resize payload.
#[inline]
#[must_use]
pub fn resize(size: TerminalSize) -> Value {
    json!({ "size": size })
}

/// Builds a run-button trigger payload.
#[inline]
#[must_use]
pub fn trigger() -> Value {
    Value::Null
}

// ============================================================================
// ResourceAction
// ============================================================================

/// An edit action on a file-backed resource widget.
///
/// Each action is shipped as one newline-terminated JSON line, base64-encoded
/// into a stdin payload, mirroring the framed record stream the widget
/// reads back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceAction {
    /// Create the resource, or truncate it to empty.
    Create,
    /// Replace the resource contents with the given text.
    Save(String),
    /// Delete the resource.
    Delete,
}

impl ResourceAction {
    /// Builds the wire payload for this action.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let line = match self {
            Self::Create => json!({ "contents": "" }),
            Self::Save(text) => json!({ "contents": encode_text(text) }),
            Self::Delete => json!({ "delete": true }),
        };
        json!({ "stdin": encode_text(&format!("{line}\n")) })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::notification::decode_text;

    #[test]
    fn test_stdin_payload_is_base64() {
        let payload = stdin("ls -la\n");
        let encoded = payload["stdin"].as_str().expect("stdin field");
        assert_eq!(decode_text(encoded).expect("decode"), "ls -la\n");
    }

    #[test]
    fn test_resize_payload_shape() {
        let payload = resize(TerminalSize::new(24, 80));
        assert_eq!(payload["size"]["rows"], 24);
        assert_eq!(payload["size"]["cols"], 80);
    }

    #[test]
    fn test_trigger_is_null() {
        assert!(trigger().is_null());
    }

    #[test]
    fn test_save_action_wraps_one_json_line() {
        let payload = ResourceAction::Save("hello world".into()).to_payload();
        let line = decode_text(payload["stdin"].as_str().expect("stdin")).expect("decode");

        assert!(line.ends_with('\n'));
        let parsed: Value = serde_json::from_str(line.trim_end()).expect("line is json");
        assert_eq!(
            decode_text(parsed["contents"].as_str().expect("contents")).expect("decode"),
            "hello world"
        );
    }

    #[test]
    fn test_create_action_sends_empty_contents() {
        let payload = ResourceAction::Create.to_payload();
        let line = decode_text(payload["stdin"].as_str().expect("stdin")).expect("decode");
        let parsed: Value = serde_json::from_str(line.trim_end()).expect("line is json");
        assert_eq!(parsed["contents"], "");
    }

    #[test]
    fn test_delete_action() {
        let payload = ResourceAction::Delete.to_payload();
        let line = decode_text(payload["stdin"].as_str().expect("stdin")).expect("decode");
        let parsed: Value = serde_json::from_str(line.trim_end()).expect("line is json");
        assert_eq!(parsed["delete"], true);
    }
}
