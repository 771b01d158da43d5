use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use dazzler_client::hydration::{Inert, Package, PackageRegistry};
use dazzler_client::page::Page;
use dazzler_client::requirements::RequirementLoader;
use dazzler_client::storage::Storage;
use dazzler_client::{RenderOptions, Result};
use dazzler_shared::{PageInfo, Requirement};
use serde_json::json;
use url::Url;

type Events = Arc<Mutex<Vec<String>>>;

/// Logs each load; `slow` requirements take longer to finish.
struct OrderedLoader {
    events: Events,
}

#[async_trait]
impl RequirementLoader for OrderedLoader {
    async fn load(&self, requirement: &Requirement) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(format!("start {}", requirement.url));
        let delay = if requirement.url.contains("slow") { 60 } else { 5 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.events
            .lock()
            .unwrap()
            .push(format!("end {}", requirement.url));
        Ok(())
    }
}

async fn socket_server(events: Events) -> Url {
    let app = Router::new().route(
        "/page/ws",
        get(move |ws: WebSocketUpgrade| {
            let events = events.clone();
            async move {
                events.lock().unwrap().push("socket".to_string());
                let response: Response = ws.on_upgrade(|socket| async move {
                    // Hold the socket open for the rest of the test.
                    let _socket = socket;
                    std::future::pending::<()>().await;
                });
                response
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{}/page", addr)).unwrap()
}

fn position(events: &[String], event: &str) -> usize {
    events
        .iter()
        .position(|e| e == event)
        .unwrap_or_else(|| panic!("missing event {event:?} in {events:?}"))
}

#[tokio::test]
async fn phases_run_in_order() {
    let events: Events = Arc::default();
    let page_url = socket_server(events.clone()).await;

    let info: PageInfo = serde_json::from_value(json!({
        "page": "ordered",
        "layout": {"name": "Root", "package": "core", "identity": "root", "aspects": {}},
        "packages": {
            "charts": {"requirements": [{"url": "pkg-slow.js", "kind": "js"}]},
            "core": {"requirements": [{"url": "pkg-fast.js", "kind": "js"}]}
        },
        "requirements": [
            {"url": "page-slow.css", "kind": "css"},
            {"url": "page-fast.js", "kind": "js"}
        ]
    }))
    .unwrap();
    let registry =
        PackageRegistry::new().with_package(Package::new("core").with_fallback(|_| Box::new(Inert)));
    let loader = OrderedLoader {
        events: events.clone(),
    };

    let page = Page::start(
        RenderOptions::new(page_url),
        registry,
        info,
        &loader,
        Storage::in_memory(),
    )
    .await
    .unwrap();

    let events = events.lock().unwrap().clone();

    // Package requirements start together.
    let mut first_two = events[..2].to_vec();
    first_two.sort();
    assert_eq!(first_two, vec!["start pkg-fast.js", "start pkg-slow.js"]);

    // Page requirements wait for every package requirement, then run one by one.
    let packages_done = position(&events, "end pkg-slow.js").max(position(&events, "end pkg-fast.js"));
    assert_eq!(
        &events[packages_done + 1..],
        &[
            "start page-slow.css",
            "end page-slow.css",
            "start page-fast.js",
            "end page-fast.js",
            "socket",
        ]
    );

    page.shutdown();
}
