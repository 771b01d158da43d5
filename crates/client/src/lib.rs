//! Dazzler client engine
//!
//! Hydrates server-declared component trees and keeps their aspects in sync
//! with the server over a WebSocket: pushed `set-aspect` frames flow into
//! the matching wrappers, local changes flow back out as `binding` frames,
//! and the server can query aspects and storage by request id.

pub mod logging;

pub mod api_client;
pub mod config;
pub mod error;
pub mod hydration;
pub mod page;
pub mod requirements;
pub mod storage;
pub mod ws;

pub use api_client::{ApiClient, ApiRequest, AuthProvider, RequestOptions, ResponseBody};
pub use config::RenderOptions;
pub use error::{DazzlerError, Result};
pub use hydration::{Component, Element, LiveProps, LiveValue, Package, PackageRegistry};
pub use page::{fetch_page_info, render, Page};
pub use ws::{ConnectionState, Updater};
