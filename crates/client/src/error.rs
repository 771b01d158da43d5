//! Client error taxonomy.

use dazzler_shared::RequestError;

#[derive(Debug, thiserror::Error)]
pub enum DazzlerError {
    /// HTTP status >= 400.
    #[error(transparent)]
    Transport(#[from] RequestError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Deserialization error: {0}")]
    Deserialize(String),

    /// A frame referenced something this client cannot serve.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Connection error: {0}")]
    Connection(String),

    /// The server layout is not a component descriptor.
    #[error("Invalid layout: {0}")]
    Structural(String),

    #[error("Failed to load requirement {url}: {reason}")]
    RequirementLoad { url: String, reason: String },

    #[error("Package not registered: {0}")]
    UnknownPackage(String),

    #[error("Component {name} not found in package {package}")]
    UnknownComponent { package: String, name: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DazzlerError {
    /// Status of a transport rejection, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            DazzlerError::Transport(e) => Some(e.status),
            _ => None,
        }
    }
}

pub type Result<T, E = DazzlerError> = std::result::Result<T, E>;
