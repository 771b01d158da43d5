//! Per-component aspect store and lifecycle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use dazzler_shared::ComponentDescriptor;

use super::{Component, Element, HydrationContext, LiveProps, LiveValue};

/// Owns the local aspects of one live component.
///
/// Lifecycle: created uninitialized, `mount` registers with the context and
/// self-reports the initial aspects once, after which the wrapper is ready.
/// Nothing renders before that.
pub struct AspectWrapper {
    identity: String,
    name: String,
    package: String,
    aspects: RwLock<LiveProps>,
    component: Box<dyn Component>,
    ctx: Arc<dyn HydrationContext>,
    mounted: AtomicBool,
    ready: AtomicBool,
    initial: AtomicBool,
    // Serializes mount and unmount so a disconnect never overtakes its connect.
    lifecycle: Mutex<()>,
}

impl AspectWrapper {
    pub(super) fn new(
        descriptor: &ComponentDescriptor,
        aspects: LiveProps,
        component: Box<dyn Component>,
        ctx: Arc<dyn HydrationContext>,
    ) -> Self {
        Self {
            identity: descriptor.identity.clone(),
            name: descriptor.name.clone(),
            package: descriptor.package.clone(),
            aspects: RwLock::new(aspects),
            component,
            ctx,
            mounted: AtomicBool::new(false),
            ready: AtomicBool::new(false),
            initial: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Current value of one aspect.
    pub fn get_aspect(&self, name: &str) -> Option<LiveValue> {
        self.read_aspects().get(name).cloned()
    }

    /// Snapshot of all aspects.
    pub fn aspects(&self) -> LiveProps {
        self.read_aspects().clone()
    }

    /// Snapshot for rendering, `None` until the initial sync is done.
    pub fn render(&self) -> Option<LiveProps> {
        if !self.is_ready() {
            return None;
        }
        let snapshot = self.aspects();
        self.component.render(&snapshot);
        Some(snapshot)
    }

    /// Register with the context, report the initial aspects once, then
    /// mount child elements.
    pub fn mount(self: &Arc<Self>) {
        {
            let _guard = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
            if self.mounted.swap(true, Ordering::AcqRel) {
                return;
            }
            self.ctx.connect(self);
            if !self.initial.load(Ordering::Acquire) {
                let current = self.aspects();
                self.ctx.update_aspects(&self.identity, &current);
                self.initial.store(true, Ordering::Release);
            }
            self.ready.store(true, Ordering::Release);
        }

        for child in self.children() {
            child.node().mount();
        }
        self.render();
    }

    /// Unmount children and deregister. Safe to call repeatedly.
    pub fn unmount(self: &Arc<Self>) {
        let _guard = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.mounted.swap(false, Ordering::AcqRel) {
            return;
        }
        self.ready.store(false, Ordering::Release);
        for child in self.children() {
            child.node().unmount();
        }
        self.ctx.disconnect(self);
    }

    /// Merge `partial` into the local aspects without notifying the context.
    ///
    /// While mounted, incoming elements are reconciled by key against the
    /// elements they replace: a matching key keeps the existing instance,
    /// vanished elements are unmounted and new ones mounted. Returns the
    /// aspects as stored.
    pub fn set_aspects(self: &Arc<Self>, partial: LiveProps) -> LiveProps {
        let mounted = self.is_mounted();
        let mut partial = partial;
        let mut stale = HashMap::new();
        let mut fresh = Vec::new();

        {
            let mut aspects = self
                .aspects
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if mounted {
                for key in partial.keys() {
                    if let Some(old) = aspects.get(key) {
                        for element in old.elements() {
                            stale.insert(element.key().to_string(), element);
                        }
                    }
                }
                for value in partial.values_mut() {
                    reuse_elements(value, &mut stale, &mut fresh);
                }
            }
            for (key, value) in &partial {
                aspects.insert(key.clone(), value.clone());
            }
        }

        if mounted {
            for element in stale.into_values() {
                element.node().unmount();
            }
            for element in fresh {
                element.node().mount();
            }
            self.render();
        }
        partial
    }

    /// Local change: merge, then let the context evaluate bindings.
    pub fn update_aspects(self: &Arc<Self>, partial: LiveProps) {
        let applied = self.set_aspects(partial);
        self.ctx.update_aspects(&self.identity, &applied);
    }

    fn children(&self) -> Vec<Element> {
        self.read_aspects()
            .values()
            .flat_map(LiveValue::elements)
            .collect()
    }

    fn read_aspects(&self) -> std::sync::RwLockReadGuard<'_, LiveProps> {
        self.aspects.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Swap elements in `value` for the existing instances with the same key.
fn reuse_elements(
    value: &mut LiveValue,
    existing: &mut HashMap<String, Element>,
    fresh: &mut Vec<Element>,
) {
    match value {
        LiveValue::Scalar(_) => {}
        LiveValue::Element(element) => match existing.remove(element.key()) {
            Some(kept) => *element = kept,
            None => fresh.push(element.clone()),
        },
        LiveValue::Sequence(items) => items
            .iter_mut()
            .for_each(|item| reuse_elements(item, existing, fresh)),
        LiveValue::Record(entries) => entries
            .values_mut()
            .for_each(|item| reuse_elements(item, existing, fresh)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use dazzler_shared::ComponentDescriptor;
    use serde_json::json;

    use super::super::testing::{core_registry, RecordingContext};
    use super::super::{hydrate_component, hydrate_props, Package, PackageRegistry};
    use super::*;

    fn setup(descriptor: &ComponentDescriptor) -> (Arc<RecordingContext>, Element) {
        let recorder = Arc::new(RecordingContext::default());
        let ctx: Arc<dyn HydrationContext> = recorder.clone();
        let element = hydrate_component(descriptor, &core_registry(), &ctx).unwrap();
        (recorder, element)
    }

    #[test]
    fn mount_connects_then_reports_once() {
        let d = ComponentDescriptor::new("Input", "core", "in").with_aspect("value", "a");
        let (recorder, element) = setup(&d);
        let node = element.node();

        assert!(node.render().is_none());
        node.mount();
        node.mount();

        assert_eq!(recorder.events(), vec!["connect in", "update in value"]);
        assert!(node.is_ready());
        assert!(node.render().is_some());
    }

    #[test]
    fn parent_mounts_before_children() {
        let d = ComponentDescriptor::new("Container", "core", "root")
            .with_aspect("child", ComponentDescriptor::new("Text", "core", "kid"));
        let (recorder, element) = setup(&d);
        element.node().mount();

        assert_eq!(
            recorder.events(),
            vec!["connect root", "update root child", "connect kid", "update kid "]
        );
    }

    #[test]
    fn set_aspects_does_not_notify() {
        let d = ComponentDescriptor::new("Input", "core", "in");
        let (recorder, element) = setup(&d);
        let node = element.node().clone();
        node.mount();

        node.set_aspects(LiveProps::from([("value".to_string(), json!("x").into())]));
        assert_eq!(recorder.updates.lock().unwrap().len(), 1);
        assert_eq!(node.get_aspect("value").unwrap().as_scalar(), Some(&json!("x")));

        node.update_aspects(LiveProps::from([("value".to_string(), json!("y").into())]));
        let updates = recorder.updates.lock().unwrap();
        assert_eq!(updates.last().unwrap(), &("in".to_string(), vec!["value".to_string()]));
    }

    #[test]
    fn unmount_disconnects_children_and_is_idempotent() {
        let d = ComponentDescriptor::new("Container", "core", "root").with_aspect(
            "children",
            vec![
                ComponentDescriptor::new("Text", "core", "a").into(),
                ComponentDescriptor::new("Text", "core", "b").into(),
            ],
        );
        let (recorder, element) = setup(&d);
        element.node().mount();
        assert_eq!(recorder.connected_identities(), vec!["root", "a", "b"]);

        element.node().unmount();
        element.node().unmount();
        assert!(recorder.connected_identities().is_empty());
        assert!(!element.node().is_ready());
    }

    #[test]
    fn reconciles_children_by_key() {
        let recorder = Arc::new(RecordingContext::default());
        let ctx: Arc<dyn HydrationContext> = recorder.clone();
        let registry = core_registry();

        let d = ComponentDescriptor::new("Container", "core", "root").with_aspect(
            "children",
            vec![
                ComponentDescriptor::new("Text", "core", "keep").into(),
                ComponentDescriptor::new("Text", "core", "drop").into(),
            ],
        );
        let root = hydrate_component(&d, &registry, &ctx).unwrap();
        root.node().mount();
        let kept_before = root.node().get_aspect("children").unwrap().elements()[0].clone();

        let incoming = ComponentDescriptor::new("x", "x", "x").with_aspect(
            "children",
            vec![
                ComponentDescriptor::new("Text", "core", "keep").into(),
                ComponentDescriptor::new("Text", "core", "new").into(),
            ],
        );
        let live = hydrate_props(&incoming.aspects, &registry, &ctx).unwrap();
        root.node().set_aspects(live);

        let children = root.node().get_aspect("children").unwrap().elements();
        assert!(children[0].same_instance(&kept_before));
        assert_eq!(children[1].identity(), "new");
        assert!(children[1].node().is_ready());

        let mut connected = recorder.connected_identities();
        connected.sort();
        assert_eq!(connected, vec!["keep", "new", "root"]);
    }

    struct Counting(Arc<StdMutex<usize>>);

    impl Component for Counting {
        fn render(&self, _aspects: &LiveProps) {
            *self.0.lock().unwrap() += 1;
        }
    }

    #[test]
    fn component_renders_only_when_ready() {
        let renders = Arc::new(StdMutex::new(0));
        let counter = renders.clone();
        let registry = PackageRegistry::new().with_package(
            Package::new("core").with_component("Counter", move |_| Box::new(Counting(counter.clone()))),
        );
        let ctx: Arc<dyn HydrationContext> = Arc::new(RecordingContext::default());
        let element =
            hydrate_component(&ComponentDescriptor::new("Counter", "core", "c"), &registry, &ctx)
                .unwrap();

        element.node().set_aspects(LiveProps::from([("n".to_string(), json!(1).into())]));
        assert_eq!(*renders.lock().unwrap(), 0);

        element.node().mount();
        element.node().set_aspects(LiveProps::from([("n".to_string(), json!(2).into())]));
        assert_eq!(*renders.lock().unwrap(), 2);
    }
}
