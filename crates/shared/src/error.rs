//! Transport-level error shared by every HTTP caller.

use serde::{Deserialize, Serialize};

/// Rejection for an HTTP response with status >= 400.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{error} {status}: {message}")]
pub struct RequestError {
    /// Always `"RequestError"`.
    pub error: String,
    pub message: String,
    pub status: u16,
    /// Raw response body.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
}

impl RequestError {
    pub fn new(status: u16, message: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            error: "RequestError".to_string(),
            message: message.into(),
            status,
            body: body.into(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}
