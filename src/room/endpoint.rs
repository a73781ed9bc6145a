//! WebSocket endpoint derivation.
//!
//! The multiplexer treats its endpoint as opaque; deriving it from the
//! hosting page's URL is this module's job. The rewrite mirrors what the
//! page environment does: swap the scheme to its WebSocket counterpart,
//! drop the fragment, append a `ws` path segment and carry the room id
//! as the `roomName` query parameter.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::RoomId;

// ============================================================================
// RoomEndpoint
// ============================================================================

/// A fully derived WebSocket endpoint for one room.
///
/// # Example
///
/// ```
/// use widget_room::{RoomEndpoint, RoomId};
///
/// let room = RoomId::generate();
/// let endpoint = RoomEndpoint::from_page_url("https://docs.example.com/guide/", room).unwrap();
/// assert!(endpoint.as_str().starts_with("wss://docs.example.com/guide/ws?roomName="));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomEndpoint {
    url: Url,
    room: RoomId,
}

impl RoomEndpoint {
    /// Derives the endpoint from the hosting page's URL.
    ///
    /// `http`/`ws` become `ws`, `https`/`wss` become `wss`. The page's
    /// query and fragment are discarded; only `roomName` survives.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Endpoint`] if the URL cannot be parsed or uses a
    /// scheme without a WebSocket counterpart.
    pub fn from_page_url(page_url: &str, room: RoomId) -> Result<Self> {
        let mut url: Url = page_url
            .parse()
            .map_err(|err| Error::endpoint(format!("invalid page URL: {err}")))?;

        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(Error::endpoint(format!(
                    "no WebSocket counterpart for scheme: {other}"
                )));
            }
        };
        url.set_scheme(scheme)
            .map_err(|()| Error::endpoint("URL does not accept a WebSocket scheme"))?;

        url.set_fragment(None);

        let path = if url.path().ends_with('/') {
            format!("{}ws", url.path())
        } else {
            format!("{}/ws", url.path())
        };
        url.set_path(&path);

        url.set_query(None);
        url.query_pairs_mut()
            .append_pair("roomName", &room.to_string());

        Ok(Self { url, room })
    }

    /// Returns the room id this endpoint is bound to.
    #[inline]
    #[must_use]
    pub const fn room(&self) -> RoomId {
        self.room
    }

    /// Returns the derived URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the derived URL as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for RoomEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.url.fmt(f)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> RoomId {
        "550e8400-e29b-41d4-a716-446655440000"
            .parse()
            .expect("room id")
    }

    #[test]
    fn test_https_becomes_wss() {
        let endpoint = RoomEndpoint::from_page_url("https://docs.example.com/guide/", room())
            .expect("derive");
        assert_eq!(
            endpoint.as_str(),
            "wss://docs.example.com/guide/ws?roomName=550e8400-e29b-41d4-a716-446655440000"
        );
    }

    #[test]
    fn test_http_becomes_ws() {
        let endpoint =
            RoomEndpoint::from_page_url("http://localhost:8000/page", room()).expect("derive");
        assert!(endpoint.as_str().starts_with("ws://localhost:8000/page/ws?"));
    }

    #[test]
    fn test_missing_trailing_slash_handled() {
        let with_slash =
            RoomEndpoint::from_page_url("http://host/a/", room()).expect("derive");
        let without_slash =
            RoomEndpoint::from_page_url("http://host/a", room()).expect("derive");
        assert_eq!(with_slash.url().path(), "/a/ws");
        assert_eq!(without_slash.url().path(), "/a/ws");
    }

    #[test]
    fn test_fragment_and_query_discarded() {
        let endpoint =
            RoomEndpoint::from_page_url("https://host/page?tab=2#section", room()).expect("derive");
        assert!(endpoint.url().fragment().is_none());
        assert_eq!(
            endpoint.url().query(),
            Some("roomName=550e8400-e29b-41d4-a716-446655440000")
        );
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        let err = RoomEndpoint::from_page_url("ftp://host/page", room()).expect_err("reject");
        assert!(matches!(err, Error::Endpoint { .. }));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(RoomEndpoint::from_page_url("not a url", room()).is_err());
    }
}
