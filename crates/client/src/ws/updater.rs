//! Update coordinator: binding dispatch, the bound component registry, and
//! handling of server frames.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use dazzler_shared::{
    binding_key, BindingRule, BoundAspect, ClientMessage, ServerMessage, StorageArea,
};
use serde_json::Value;

use super::connection::WsHandle;
use crate::hydration::{
    hydrate_props, prepare_prop, AspectWrapper, HydrationContext, LiveProps, LiveValue,
    PackageRegistry,
};
use crate::storage::Storage;

/// Owns the binding table and the identity registry for one page.
///
/// The registry holds weak references: a wrapper deregisters itself on
/// unmount, and a dropped wrapper simply stops resolving.
pub struct Updater {
    page: String,
    bindings: HashMap<String, BindingRule>,
    bound: RwLock<HashMap<String, Weak<AspectWrapper>>>,
    registry: Arc<PackageRegistry>,
    outbound: WsHandle,
    storage: Storage,
}

impl Updater {
    pub fn new(
        page: impl Into<String>,
        bindings: HashMap<String, BindingRule>,
        registry: Arc<PackageRegistry>,
        outbound: WsHandle,
        storage: Storage,
    ) -> Arc<Self> {
        Arc::new(Self {
            page: page.into(),
            bindings,
            bound: RwLock::new(HashMap::new()),
            registry,
            outbound,
            storage,
        })
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn registry(&self) -> &Arc<PackageRegistry> {
        &self.registry
    }

    /// This coordinator as the context handed to hydrated wrappers.
    pub fn context(self: &Arc<Self>) -> Arc<dyn HydrationContext> {
        self.clone()
    }

    /// Mounted wrapper for `identity`, if any.
    pub fn lookup(&self, identity: &str) -> Option<Arc<AspectWrapper>> {
        let bound = self.bound.read().unwrap_or_else(PoisonError::into_inner);
        bound.get(identity).and_then(Weak::upgrade)
    }

    pub fn bound_identities(&self) -> Vec<String> {
        let bound = self.bound.read().unwrap_or_else(PoisonError::into_inner);
        bound.keys().cloned().collect()
    }

    /// Push a binding frame. State values are read now, not when the rule
    /// was declared.
    pub fn send_binding(&self, rule: &BindingRule, value: &LiveValue) {
        let trigger = BoundAspect::new(&rule.trigger, Some(prepare_prop(value)));
        let states = rule
            .states
            .iter()
            .map(|state| {
                let current = self
                    .lookup(&state.identity)
                    .and_then(|node| node.get_aspect(&state.aspect))
                    .map(|v| prepare_prop(&v));
                BoundAspect::new(state, current)
            })
            .collect();

        crate::log_debug!("Binding {} triggered by {}", rule.key, rule.trigger.binding_key());
        self.send(ClientMessage::Binding {
            page: self.page.clone(),
            key: rule.key.clone(),
            trigger,
            states,
        });
    }

    /// Handle one raw frame from the server.
    pub fn on_message(self: &Arc<Self>, raw: &str) {
        let message = match serde_json::from_str::<ServerMessage>(raw) {
            Ok(message) => message,
            Err(e) => {
                crate::log_error!("Failed to parse message: {}", e);
                return;
            }
        };

        match message {
            ServerMessage::SetAspect {
                identity, payload, ..
            } => self.handle_set_aspect(&identity, &payload),
            ServerMessage::GetAspect {
                identity,
                aspect,
                request_id,
            } => self.handle_get_aspect(identity, aspect, request_id),
            ServerMessage::SetStorage {
                identity,
                payload,
                storage,
            } => {
                let area = StorageArea::from_field(storage.as_deref());
                if !self.storage.save(area, &identity, &payload) {
                    crate::log_error!("Failed to store {:?} value for {}", area, identity);
                }
            }
            ServerMessage::GetStorage {
                identity,
                storage,
                request_id,
            } => {
                let area = StorageArea::from_field(storage.as_deref());
                let value = self
                    .storage
                    .load::<Value>(area, &identity)
                    .unwrap_or(Value::Null);
                self.send(ClientMessage::GetStorage {
                    identity,
                    request_id,
                    value,
                });
            }
            ServerMessage::Ping | ServerMessage::Unknown => {}
        }
    }

    fn handle_set_aspect(self: &Arc<Self>, identity: &str, payload: &dazzler_shared::Aspects) {
        let Some(target) = self.lookup(identity) else {
            crate::log_warn!("set-aspect for unknown component {}", identity);
            self.send(ClientMessage::component_not_found(identity));
            return;
        };

        let live = match hydrate_props(payload, &self.registry, &self.context()) {
            Ok(live) => live,
            Err(e) => {
                crate::log_error!("Failed to hydrate aspects for {}: {}", identity, e);
                self.send(ClientMessage::Error {
                    error: e.to_string(),
                });
                return;
            }
        };

        // Pushed state can trigger outbound bindings too.
        let applied = target.set_aspects(live);
        self.update_aspects(identity, &applied);
    }

    fn handle_get_aspect(&self, identity: String, aspect: String, request_id: Value) {
        let reply = match self.lookup(&identity) {
            Some(target) => {
                let value = target.get_aspect(&aspect).map(|v| prepare_prop(&v));
                ClientMessage::GetAspect {
                    identity,
                    aspect,
                    value,
                    error: None,
                    request_id,
                }
            }
            None => {
                crate::log_warn!("get-aspect for unknown component {}", identity);
                ClientMessage::GetAspect {
                    error: Some(format!("Component not found: {}", identity)),
                    identity,
                    aspect,
                    value: None,
                    request_id,
                }
            }
        };
        self.send(reply);
    }

    fn send(&self, message: ClientMessage) {
        if let Err(e) = self.outbound.send(message) {
            crate::log_warn!("Dropping frame: {}", e);
        }
    }
}

impl HydrationContext for Updater {
    fn update_aspects(&self, identity: &str, aspects: &LiveProps) {
        for (aspect, value) in aspects {
            if let Some(rule) = self.bindings.get(&binding_key(identity, aspect)) {
                self.send_binding(rule, value);
            }
        }
    }

    fn connect(&self, node: &Arc<AspectWrapper>) {
        let mut bound = self.bound.write().unwrap_or_else(PoisonError::into_inner);
        bound.insert(node.identity().to_string(), Arc::downgrade(node));
        crate::log_debug!("Connected {}", node.identity());
    }

    fn disconnect(&self, node: &Arc<AspectWrapper>) {
        let mut bound = self.bound.write().unwrap_or_else(PoisonError::into_inner);
        // Only drop the entry if it still points at this node; a newer
        // wrapper may have taken over the identity.
        let owned = bound
            .get(node.identity())
            .is_some_and(|current| std::ptr::eq(current.as_ptr(), Arc::as_ptr(node)));
        if owned {
            bound.remove(node.identity());
            crate::log_debug!("Disconnected {}", node.identity());
        }
    }
}
