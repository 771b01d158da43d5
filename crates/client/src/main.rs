//! Headless page runner.
//!
//! Mounts a page without a UI: every component is backed by a component
//! that logs its aspects whenever it renders. Useful for exercising a
//! backend's bindings from a terminal.
//!
//! Usage: `dazzler-client [page-url]` (falls back to `DAZZLER_PAGE_URL`).

use std::collections::BTreeSet;

use dazzler_client::hydration::{prepare_props, Component, LiveProps, Package, PackageRegistry};
use dazzler_client::page::{fetch_page_info, Page};
use dazzler_client::requirements::HttpRequirementLoader;
use dazzler_client::storage::Storage;
use dazzler_client::{ApiClient, ConnectionState, RenderOptions};
use dazzler_shared::AspectValue;
use tracing_subscriber::EnvFilter;

struct TracingComponent {
    label: String,
}

impl Component for TracingComponent {
    fn render(&self, aspects: &LiveProps) {
        let wire = serde_json::to_string(&prepare_props(aspects)).unwrap_or_default();
        tracing::info!("render {}: {}", self.label, wire);
    }
}

/// Every package named anywhere in the layout or the package table.
fn declared_packages(layout: &AspectValue, known: impl Iterator<Item = String>) -> BTreeSet<String> {
    fn walk(value: &AspectValue, out: &mut BTreeSet<String>) {
        match value {
            AspectValue::Scalar(_) => {}
            AspectValue::Component(descriptor) => {
                out.insert(descriptor.package.clone());
                descriptor.aspects.values().for_each(|v| walk(v, out));
            }
            AspectValue::Sequence(items) => items.iter().for_each(|v| walk(v, out)),
            AspectValue::Record(entries) => entries.values().for_each(|v| walk(v, out)),
        }
    }

    let mut out: BTreeSet<String> = known.collect();
    walk(layout, &mut out);
    out
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dazzler_client=debug")),
        )
        .init();

    let arg = std::env::args().nth(1);
    let options = RenderOptions::from_env(arg.as_deref())?;
    tracing::info!("Loading {}", options.page_url);

    let client = ApiClient::new();
    let info = fetch_page_info(&client, &options.page_url).await?;

    let mut registry = PackageRegistry::new();
    for name in declared_packages(&info.layout, info.packages.keys().cloned()) {
        registry.register(Package::new(name.clone()).with_fallback(move |descriptor| {
            Box::new(TracingComponent {
                label: format!("{}.{}#{}", name, descriptor.name, descriptor.identity),
            })
        }));
    }

    let loader = HttpRequirementLoader::new(client, options.page_url.clone());
    let page = Page::start(options, registry, info, &loader, Storage::for_app("dazzler")).await?;
    tracing::info!(
        "Page {} ready, {} assets loaded, {} components bound",
        page.info().page,
        loader.cache().len(),
        page.updater().bound_identities().len()
    );

    let mut states = page.watch_connection();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            match state {
                ConnectionState::Failed { reason } => {
                    tracing::warn!("Connection lost for good: {}", reason);
                    break;
                }
                other => tracing::info!("Connection {:?}", other),
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    page.shutdown();
    Ok(())
}
