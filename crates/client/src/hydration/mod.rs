//! Component tree hydration.
//!
//! Turns [`ComponentDescriptor`] trees received from the server into live
//! [`Element`]s. Each element wraps one [`AspectWrapper`], which owns the
//! authoritative aspect values of that component. Serialization back to the
//! wire shape lives in [`serialize`].

mod registry;
mod serialize;
mod wrapper;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use dazzler_shared::{AspectValue, Aspects, ComponentDescriptor};
use serde_json::Value;

use crate::error::Result;

pub use registry::{Component, ComponentFactory, Inert, Package, PackageRegistry};
pub use serialize::{prepare_prop, prepare_props, RESERVED_ASPECTS};
pub use wrapper::AspectWrapper;

/// Hydrated aspects of one component.
pub type LiveProps = BTreeMap<String, LiveValue>;

/// Hydrated counterpart of [`AspectValue`].
#[derive(Debug, Clone)]
pub enum LiveValue {
    Scalar(Value),
    Element(Element),
    Sequence(Vec<LiveValue>),
    Record(LiveProps),
}

impl LiveValue {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            LiveValue::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            LiveValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Every element reachable from this value, outermost first.
    pub fn elements(&self) -> Vec<Element> {
        let mut found = Vec::new();
        self.collect_elements(&mut found);
        found
    }

    fn collect_elements(&self, found: &mut Vec<Element>) {
        match self {
            LiveValue::Scalar(_) => {}
            LiveValue::Element(element) => found.push(element.clone()),
            LiveValue::Sequence(items) => items.iter().for_each(|v| v.collect_elements(found)),
            LiveValue::Record(entries) => entries.values().for_each(|v| v.collect_elements(found)),
        }
    }
}

impl From<Value> for LiveValue {
    /// Plain JSON; objects become records, never elements.
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => LiveValue::Sequence(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                LiveValue::Record(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
            scalar => LiveValue::Scalar(scalar),
        }
    }
}

/// A live, wrapped component.
///
/// Cloning is cheap and yields a handle to the same wrapper.
#[derive(Clone)]
pub struct Element {
    key: String,
    node: Arc<AspectWrapper>,
}

impl Element {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn identity(&self) -> &str {
        self.node.identity()
    }

    pub fn node(&self) -> &Arc<AspectWrapper> {
        &self.node
    }

    /// True if both handles point at the same wrapper instance.
    pub fn same_instance(&self, other: &Element) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("key", &self.key)
            .field("package", &self.node.package())
            .field("name", &self.node.name())
            .finish()
    }
}

/// Reconciliation key of the wrapper for `identity`.
pub fn wrapper_key(identity: &str) -> String {
    format!("wrapper-{}", identity)
}

/// Capabilities a wrapper needs from its coordinator.
pub trait HydrationContext: Send + Sync {
    /// Evaluate bindings for locally changed aspects.
    fn update_aspects(&self, identity: &str, aspects: &LiveProps);
    /// Register a mounted wrapper under its identity.
    fn connect(&self, node: &Arc<AspectWrapper>);
    /// Remove a wrapper from the registry. Must tolerate unknown nodes.
    fn disconnect(&self, node: &Arc<AspectWrapper>);
}

/// Hydrate every component descriptor found in `props`.
pub fn hydrate_props(
    props: &Aspects,
    registry: &PackageRegistry,
    ctx: &Arc<dyn HydrationContext>,
) -> Result<LiveProps> {
    props
        .iter()
        .map(|(key, value)| -> Result<(String, LiveValue)> {
            Ok((key.clone(), hydrate_value(value, registry, ctx)?))
        })
        .collect()
}

fn hydrate_value(
    value: &AspectValue,
    registry: &PackageRegistry,
    ctx: &Arc<dyn HydrationContext>,
) -> Result<LiveValue> {
    Ok(match value {
        AspectValue::Scalar(scalar) => LiveValue::Scalar(scalar.clone()),
        AspectValue::Component(descriptor) => {
            LiveValue::Element(hydrate_component(descriptor, registry, ctx)?)
        }
        AspectValue::Sequence(items) => LiveValue::Sequence(
            items
                .iter()
                .map(|item| hydrate_value(item, registry, ctx))
                .collect::<Result<_>>()?,
        ),
        AspectValue::Record(entries) => LiveValue::Record(hydrate_props(entries, registry, ctx)?),
    })
}

/// Instantiate and wrap a single descriptor, hydrating its aspects first.
pub fn hydrate_component(
    descriptor: &ComponentDescriptor,
    registry: &PackageRegistry,
    ctx: &Arc<dyn HydrationContext>,
) -> Result<Element> {
    let aspects = hydrate_props(&descriptor.aspects, registry, ctx)?;
    let component = registry.instantiate(descriptor)?;
    let node = AspectWrapper::new(descriptor, aspects, component, ctx.clone());
    Ok(Element {
        key: wrapper_key(&descriptor.identity),
        node: Arc::new(node),
    })
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::{core_registry, RecordingContext};
    use super::*;

    fn descriptor(value: Value) -> ComponentDescriptor {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn hydrates_nested_descriptors() {
        let ctx: Arc<dyn HydrationContext> = Arc::new(RecordingContext::default());
        let root = descriptor(json!({
            "name": "Container", "package": "core", "identity": "root",
            "aspects": {
                "children": [
                    {"name": "Text", "package": "core", "identity": "t1", "aspects": {"text": "hi"}},
                    "plain"
                ],
                "header": {"name": "Text", "package": "core", "identity": "h", "aspects": {}},
                "style": {"inner": {"name": "Text", "package": "core", "identity": "deep", "aspects": {}}},
                "count": 2
            }
        }));

        let element = hydrate_component(&root, &core_registry(), &ctx).unwrap();
        assert_eq!(element.key(), "wrapper-root");

        let children = element.node().get_aspect("children").unwrap();
        let LiveValue::Sequence(items) = children else {
            panic!("children should stay a sequence");
        };
        assert_eq!(items[0].as_element().unwrap().key(), "wrapper-t1");
        assert_eq!(items[1].as_scalar(), Some(&json!("plain")));

        let header = element.node().get_aspect("header").unwrap();
        assert_eq!(header.as_element().unwrap().identity(), "h");

        let style = element.node().get_aspect("style").unwrap();
        let identities: Vec<_> = style
            .elements()
            .iter()
            .map(|e| e.identity().to_string())
            .collect();
        assert_eq!(identities, vec!["deep"]);

        assert_eq!(element.node().get_aspect("count").unwrap().as_scalar(), Some(&json!(2)));
    }

    #[test]
    fn same_identity_gets_same_key() {
        let ctx: Arc<dyn HydrationContext> = Arc::new(RecordingContext::default());
        let registry = core_registry();
        let d = ComponentDescriptor::new("Text", "core", "stable");

        let first = hydrate_component(&d, &registry, &ctx).unwrap();
        let second = hydrate_component(&d, &registry, &ctx).unwrap();
        assert_eq!(first.key(), second.key());
        assert!(!first.same_instance(&second));
    }

    #[test]
    fn unknown_package_fails_hydration() {
        let ctx: Arc<dyn HydrationContext> = Arc::new(RecordingContext::default());
        let d = ComponentDescriptor::new("Text", "core", "root")
            .with_aspect("child", ComponentDescriptor::new("Chart", "plots", "c"));
        let err = hydrate_component(&d, &core_registry(), &ctx).err().unwrap();
        assert!(matches!(err, crate::error::DazzlerError::UnknownPackage(p) if p == "plots"));
    }
}
