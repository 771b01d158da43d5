//! HTTP helper with JSON encoding and a one-shot auth refresh.

use std::sync::Arc;

use async_trait::async_trait;
use dazzler_shared::RequestError;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{DazzlerError, Result};

/// Per-request options.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub payload: Option<Value>,
    /// Encode `payload` as JSON. When false a string payload is sent raw.
    pub json: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            payload: None,
            json: true,
        }
    }
}

impl RequestOptions {
    pub fn post() -> Self {
        Self {
            method: Method::POST,
            ..Self::default()
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A successful response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The response declared a JSON content type.
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// Decode as `T`, parsing text bodies as JSON too.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        let parsed = match self {
            ResponseBody::Json(value) => serde_json::from_value(value),
            ResponseBody::Text(text) => serde_json::from_str(&text),
        };
        parsed.map_err(|e| DazzlerError::Deserialize(e.to_string()))
    }

    pub fn into_text(self) -> String {
        match self {
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Text(text) => text,
        }
    }
}

/// Plain HTTP client.
#[derive(Debug, Clone, Default)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a request. Statuses >= 400 are rejected with a
    /// [`RequestError`]; network failures with [`DazzlerError::Network`].
    pub async fn request(&self, url: &str, options: &RequestOptions) -> Result<ResponseBody> {
        let mut rb = self.client.request(options.method.clone(), url);
        for (name, value) in &options.headers {
            rb = rb.header(name.as_str(), value.as_str());
        }

        if let Some(payload) = &options.payload {
            rb = match (options.json, payload) {
                (false, Value::String(raw)) => rb.body(raw.clone()),
                _ => {
                    let body = serde_json::to_vec(payload)
                        .map_err(|e| DazzlerError::Deserialize(e.to_string()))?;
                    rb.header(CONTENT_TYPE, "application/json").body(body)
                }
            };
        }

        let resp = rb.send().await.map_err(|e| DazzlerError::Network(e.to_string()))?;

        let status = resp.status();
        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_ascii_lowercase().contains("json"));

        let text = resp
            .text()
            .await
            .map_err(|e| DazzlerError::Network(format!("failed to read body: {e}")))?;

        if status.as_u16() >= 400 {
            let message = status.canonical_reason().unwrap_or("").to_string();
            return Err(RequestError::new(status.as_u16(), message, text).into());
        }

        if !is_json {
            return Ok(ResponseBody::Text(text));
        }
        if text.is_empty() {
            return Ok(ResponseBody::Json(Value::Null));
        }
        serde_json::from_str(&text)
            .map(ResponseBody::Json)
            .map_err(|e| DazzlerError::Deserialize(e.to_string()))
    }

    /// Bind this client to a base URL and an auth provider.
    pub fn with_auth(self, auth: Arc<dyn AuthProvider>, base_url: impl Into<String>) -> ApiRequest {
        ApiRequest {
            client: self,
            auth,
            base_url: base_url.into(),
        }
    }
}

/// Source of request credentials.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Headers added to every request, computed per attempt.
    async fn headers(&self) -> Vec<(String, String)>;
    /// Renew credentials after a 401.
    async fn refresh(&self) -> Result<()>;
}

/// Authenticated calls relative to a base URL.
#[derive(Clone)]
pub struct ApiRequest {
    client: ApiClient,
    auth: Arc<dyn AuthProvider>,
    base_url: String,
}

impl ApiRequest {
    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if self.base_url.is_empty() {
            if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{path}")
            }
        } else {
            let base = self.base_url.trim_end_matches('/');
            let path = path.trim_start_matches('/');
            format!("{base}/{path}")
        }
    }

    /// Issue `path` with fresh auth headers. The first 401 triggers one
    /// refresh and one retry; anything after that is returned as is.
    pub async fn call(&self, path: &str, options: RequestOptions) -> Result<ResponseBody> {
        let url = self.url(path);
        let mut retried = false;
        loop {
            let mut attempt = options.clone();
            attempt.headers.extend(self.auth.headers().await);

            match self.client.request(&url, &attempt).await {
                Err(DazzlerError::Transport(e)) if e.is_unauthorized() && !retried => {
                    crate::log_info!("401 from {}, refreshing credentials", url);
                    retried = true;
                    self.auth.refresh().await?;
                }
                result => return result,
            }
        }
    }
}
