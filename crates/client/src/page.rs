//! Page bootstrap: the entry point host applications call.

use std::sync::Arc;

use dazzler_shared::{AspectValue, ComponentDescriptor, PageInfo};
use tokio::sync::watch;
use url::Url;

use crate::api_client::{ApiClient, RequestOptions};
use crate::config::RenderOptions;
use crate::error::{DazzlerError, Result};
use crate::hydration::{hydrate_component, Element, PackageRegistry};
use crate::requirements::{
    load_package_requirements, load_requirements, HttpRequirementLoader, RequirementLoader,
};
use crate::storage::Storage;
use crate::ws::{websocket_url, ConnectionState, FrameHandler, Updater, WsConnection, WsHandle};

/// Fetch the bootstrap metadata. The page URL doubles as the metadata
/// endpoint: GET renders HTML, POST returns JSON.
pub async fn fetch_page_info(client: &ApiClient, page_url: &Url) -> Result<PageInfo> {
    client
        .request(page_url.as_str(), &RequestOptions::post())
        .await?
        .into_json()
}

/// Fetch, load and mount a page with default HTTP loading and storage.
pub async fn render(options: RenderOptions, registry: PackageRegistry) -> Result<Page> {
    let client = ApiClient::new();
    let info = fetch_page_info(&client, &options.page_url).await?;
    let loader = HttpRequirementLoader::new(client, options.page_url.clone());
    Page::start(options, registry, info, &loader, Storage::for_app("dazzler")).await
}

/// A mounted page.
pub struct Page {
    info: PageInfo,
    root: Element,
    updater: Arc<Updater>,
    connection: WsConnection,
}

impl Page {
    /// Run the startup sequence from already-fetched metadata:
    /// package requirements (concurrently), page requirements (in order),
    /// WebSocket open, then hydration of the layout.
    pub async fn start(
        options: RenderOptions,
        registry: PackageRegistry,
        info: PageInfo,
        loader: &dyn RequirementLoader,
        storage: Storage,
    ) -> Result<Page> {
        load_package_requirements(loader, &info.package_requirements()).await?;
        load_requirements(loader, &info.requirements).await?;

        let ws_url = websocket_url(&options.page_url, &options.base_url)?;
        let (handle, outbound) = WsHandle::channel();
        let updater = Updater::new(
            info.page.clone(),
            info.bindings.clone(),
            Arc::new(registry),
            handle,
            storage,
        );

        let dispatch = updater.clone();
        let on_frame: FrameHandler = Arc::new(move |frame: String| dispatch.on_message(&frame));
        let connection =
            WsConnection::open(ws_url.to_string(), options.reconnect(), outbound, on_frame);

        // Nothing renders until the socket is up.
        connection.wait_connected().await?;

        let layout = layout_descriptor(&info.layout)?;
        let root = hydrate_component(layout, updater.registry(), &updater.context())?;
        root.node().mount();
        crate::log_info!("Mounted page {} with root {}", info.page, root.identity());

        Ok(Page {
            info,
            root,
            updater,
            connection,
        })
    }

    pub fn info(&self) -> &PageInfo {
        &self.info
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn updater(&self) -> &Arc<Updater> {
        &self.updater
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Follow connection state changes.
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    /// Unmount the tree and close the socket.
    pub fn shutdown(self) {
        self.root.node().unmount();
        self.connection.close();
    }
}

fn layout_descriptor(layout: &AspectValue) -> Result<&ComponentDescriptor> {
    layout.as_component().ok_or_else(|| {
        DazzlerError::Structural(format!(
            "layout must be a component descriptor, got {}",
            layout.to_json()
        ))
    })
}
