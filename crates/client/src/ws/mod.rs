//! WebSocket side of the engine.
//!
//! ```text
//!   server ──frames──▶ WsConnection ──on_frame──▶ Updater ──set_aspects──▶ AspectWrapper
//!                          ▲                         │
//!                          └──────── WsHandle ◀──────┘  (binding / replies)
//! ```
//!
//! The connection owns the socket and its reconnect loop. The [`Updater`]
//! owns the binding table and the identity registry; it never touches the
//! socket directly, it only queues frames on a [`WsHandle`].

mod connection;
mod updater;

pub use connection::{
    ConnectionState, FrameHandler, ReconnectConfig, WsConnection, WsHandle,
};
pub use updater::Updater;

use url::Url;

use crate::error::{DazzlerError, Result};

/// Normalize a host string for use in a URL (strips protocol prefix)
pub fn normalize_host(host: &str) -> String {
    host.trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_start_matches("ws://")
        .trim_start_matches("wss://")
        .trim_end_matches('/')
        .to_string()
}

/// `ws(s)://{host}{pathname}/ws` for a page.
///
/// The scheme follows the page (`wss` iff `https`). `base_url`, when not
/// empty, replaces the page host.
pub fn websocket_url(page_url: &Url, base_url: &str) -> Result<Url> {
    let scheme = if page_url.scheme() == "https" { "wss" } else { "ws" };
    let host = if base_url.trim().is_empty() {
        let host = page_url
            .host_str()
            .ok_or_else(|| DazzlerError::Config(format!("Page URL {} has no host", page_url)))?;
        match page_url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    } else {
        normalize_host(base_url)
    };
    let path = page_url.path().trim_end_matches('/');
    let raw = format!("{}://{}{}/ws", scheme, host, path);
    Url::parse(&raw).map_err(|e| DazzlerError::Config(format!("Invalid WebSocket URL {}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn scheme_follows_page() {
        assert_eq!(
            websocket_url(&url("http://localhost:8150/page"), "").unwrap().as_str(),
            "ws://localhost:8150/page/ws"
        );
        assert_eq!(
            websocket_url(&url("https://example.com/app/page/"), "").unwrap().as_str(),
            "wss://example.com/app/page/ws"
        );
    }

    #[test]
    fn base_url_overrides_host() {
        assert_eq!(
            websocket_url(&url("https://example.com/"), "https://ws.example.com:9000/")
                .unwrap()
                .as_str(),
            "wss://ws.example.com:9000/ws"
        );
    }
}
