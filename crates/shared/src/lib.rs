//! Shared wire types for the dazzler client engine and its servers.

pub mod aspect;
pub mod error;
pub mod models;
pub mod protocol;

pub use aspect::*;
pub use error::*;
pub use models::*;
pub use protocol::*;
