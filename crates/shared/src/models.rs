//! Page bootstrap metadata and asset requirements.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aspect::AspectValue;
use crate::protocol::BindingRule;

/// Kind of asset a requirement points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementKind {
    Js,
    Css,
    Map,
    #[serde(other)]
    Unknown,
}

/// An asset that must be loaded before hydration proceeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub url: String,
    pub kind: RequirementKind,
    #[serde(default)]
    pub meta: Value,
}

impl Requirement {
    pub fn new(url: impl Into<String>, kind: RequirementKind) -> Self {
        Self {
            url: url.into(),
            kind,
            meta: Value::Null,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

/// Response to the bootstrap `POST {page url}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: String,
    /// Root of the component tree. Must be a descriptor.
    pub layout: AspectValue,
    /// Keyed by `"{identity}.{aspect}"`.
    #[serde(default)]
    pub bindings: HashMap<String, BindingRule>,
    #[serde(default)]
    pub packages: BTreeMap<String, PackageInfo>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

impl PageInfo {
    /// Package requirements flattened in package order.
    pub fn package_requirements(&self) -> Vec<Requirement> {
        self.packages
            .values()
            .flat_map(|package| package.requirements.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_page_info() {
        let info: PageInfo = serde_json::from_value(json!({
            "page": "home",
            "layout": {"name": "Container", "package": "core", "identity": "root", "aspects": {}},
            "bindings": {
                "btn.clicks": {
                    "key": "btn.clicks",
                    "trigger": {"identity": "btn", "aspect": "clicks"},
                    "states": [{"identity": "input", "aspect": "value"}]
                }
            },
            "packages": {
                "core": {"requirements": [{"url": "/core.js", "kind": "js"}]},
                "extra": {"requirements": [{"url": "/extra.css", "kind": "css", "meta": {"x": 1}}]}
            },
            "requirements": [{"url": "/page.woff", "kind": "font"}]
        }))
        .unwrap();

        assert!(info.layout.as_component().is_some());
        assert_eq!(info.bindings["btn.clicks"].states.len(), 1);
        let urls: Vec<_> = info
            .package_requirements()
            .into_iter()
            .map(|r| r.url)
            .collect();
        assert_eq!(urls, vec!["/core.js", "/extra.css"]);
        assert_eq!(info.requirements[0].kind, RequirementKind::Unknown);
    }
}
