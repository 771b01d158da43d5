//! Loading of package and page assets before hydration.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use dazzler_shared::{Requirement, RequirementKind};
use futures_util::future::try_join_all;
use url::Url;

use crate::api_client::{ApiClient, RequestOptions};
use crate::error::{DazzlerError, Result};

/// Loads a single requirement.
#[async_trait]
pub trait RequirementLoader: Send + Sync {
    async fn load(&self, requirement: &Requirement) -> Result<()>;
}

/// Load package requirements concurrently; all must succeed.
pub async fn load_package_requirements(
    loader: &dyn RequirementLoader,
    requirements: &[Requirement],
) -> Result<()> {
    try_join_all(requirements.iter().map(|r| loader.load(r))).await?;
    Ok(())
}

/// Load page requirements in order, each finishing before the next starts.
/// Later assets may override earlier ones, so order matters.
pub async fn load_requirements(
    loader: &dyn RequirementLoader,
    requirements: &[Requirement],
) -> Result<()> {
    for requirement in requirements {
        loader.load(requirement).await?;
    }
    Ok(())
}

/// A fetched asset.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedAsset {
    pub url: String,
    pub kind: RequirementKind,
    pub content: String,
}

/// Assets in load order.
#[derive(Debug, Clone, Default)]
pub struct AssetCache {
    assets: Arc<RwLock<Vec<LoadedAsset>>>,
}

impl AssetCache {
    pub fn push(&self, asset: LoadedAsset) {
        let mut assets = self.assets.write().unwrap_or_else(PoisonError::into_inner);
        assets.push(asset);
    }

    pub fn urls(&self) -> Vec<String> {
        let assets = self.assets.read().unwrap_or_else(PoisonError::into_inner);
        assets.iter().map(|a| a.url.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.assets.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fetches assets over HTTP, resolving relative URLs against the page.
pub struct HttpRequirementLoader {
    client: ApiClient,
    base: Url,
    cache: AssetCache,
}

impl HttpRequirementLoader {
    pub fn new(client: ApiClient, base: Url) -> Self {
        Self {
            client,
            base,
            cache: AssetCache::default(),
        }
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }
}

#[async_trait]
impl RequirementLoader for HttpRequirementLoader {
    async fn load(&self, requirement: &Requirement) -> Result<()> {
        let fail = |reason: String| DazzlerError::RequirementLoad {
            url: requirement.url.clone(),
            reason,
        };

        if requirement.kind == RequirementKind::Unknown {
            return Err(fail("Invalid requirement kind".to_string()));
        }

        let url = self
            .base
            .join(&requirement.url)
            .map_err(|e| fail(e.to_string()))?;
        let body = self
            .client
            .request(url.as_str(), &RequestOptions::default())
            .await
            .map_err(|e| fail(e.to_string()))?;

        crate::log_debug!("Loaded {:?} requirement {}", requirement.kind, url);
        self.cache.push(LoadedAsset {
            url: requirement.url.clone(),
            kind: requirement.kind,
            content: body.into_text(),
        });
        Ok(())
    }
}
