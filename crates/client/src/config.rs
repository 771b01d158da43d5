//! Render options, built in code or read from the environment.

use std::time::Duration;

use url::Url;

use crate::error::{DazzlerError, Result};
use crate::ws::ReconnectConfig;

/// Options for mounting one page.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Page to bootstrap from; also the base of the WebSocket path.
    pub page_url: Url,
    /// WebSocket host override. Empty means the page host.
    pub base_url: String,
    /// Accepted for compatibility with page hosts; the engine does not ping.
    pub ping: bool,
    pub ping_interval: Duration,
    /// Reconnect attempts after the socket closes.
    pub retries: u32,
    /// Fixed delay before each reconnect attempt.
    pub retry_delay: Duration,
}

impl RenderOptions {
    pub fn new(page_url: Url) -> Self {
        let reconnect = ReconnectConfig::default();
        Self {
            page_url,
            base_url: String::new(),
            ping: false,
            ping_interval: Duration::from_secs(30),
            retries: reconnect.max_attempts,
            retry_delay: reconnect.delay,
        }
    }

    /// Parse render options from environment variables.
    ///
    /// Environment variables:
    /// - `DAZZLER_PAGE_URL`: page to mount (required unless `page_url` is given)
    /// - `DAZZLER_BASE_URL`: WebSocket host override (default: page host)
    /// - `DAZZLER_RETRIES`: reconnect cap (default: 30)
    /// - `DAZZLER_RETRY_DELAY_MS`: delay between reconnects (default: 1000)
    /// - `DAZZLER_PING`: "true" | "false" (default: "false")
    /// - `DAZZLER_PING_INTERVAL`: seconds (default: 30)
    pub fn from_env(page_url: Option<&str>) -> Result<Self> {
        let raw_url = match page_url {
            Some(url) => url.to_string(),
            None => std::env::var("DAZZLER_PAGE_URL")
                .map_err(|_| DazzlerError::Config("DAZZLER_PAGE_URL is not set".to_string()))?,
        };
        let page_url = Url::parse(&raw_url)
            .map_err(|e| DazzlerError::Config(format!("Invalid page URL {}: {}", raw_url, e)))?;

        let mut options = Self::new(page_url);
        options.base_url = std::env::var("DAZZLER_BASE_URL").unwrap_or_default();
        if let Some(retries) = env_parse("DAZZLER_RETRIES")? {
            options.retries = retries;
        }
        if let Some(ms) = env_parse::<u64>("DAZZLER_RETRY_DELAY_MS")? {
            options.retry_delay = Duration::from_millis(ms);
        }
        if let Some(ping) = env_parse("DAZZLER_PING")? {
            options.ping = ping;
        }
        if let Some(secs) = env_parse::<u64>("DAZZLER_PING_INTERVAL")? {
            options.ping_interval = Duration::from_secs(secs);
        }
        Ok(options)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = delay;
        self
    }

    pub fn reconnect(&self) -> ReconnectConfig {
        ReconnectConfig {
            max_attempts: self.retries,
            delay: self.retry_delay,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .to_lowercase()
            .parse()
            .map(Some)
            .map_err(|_| DazzlerError::Config(format!("Invalid value for {}: {}", name, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = RenderOptions::new(Url::parse("http://localhost/page").unwrap());
        assert_eq!(options.retries, 30);
        assert_eq!(options.retry_delay, Duration::from_millis(1000));
        assert!(options.base_url.is_empty());
    }

    #[test]
    fn explicit_url_wins_and_bad_urls_fail() {
        let options = RenderOptions::from_env(Some("https://example.com/p")).unwrap();
        assert_eq!(options.page_url.host_str(), Some("example.com"));
        assert!(matches!(
            RenderOptions::from_env(Some("not a url")),
            Err(DazzlerError::Config(_))
        ));
    }
}
