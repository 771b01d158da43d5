//! Live values back to wire shape.

use dazzler_shared::{AspectValue, Aspects, ComponentDescriptor};

use super::{Element, LiveProps, LiveValue};

/// Bookkeeping names that never travel back to the server as aspects.
pub const RESERVED_ASPECTS: [&str; 6] =
    ["identity", "updateAspects", "_name", "_package", "aspects", "key"];

/// Serialize a live value, turning elements into descriptors that carry
/// their current aspects.
pub fn prepare_prop(value: &LiveValue) -> AspectValue {
    match value {
        LiveValue::Scalar(scalar) => AspectValue::Scalar(scalar.clone()),
        LiveValue::Element(element) => AspectValue::Component(Box::new(describe(element))),
        LiveValue::Sequence(items) => AspectValue::Sequence(items.iter().map(prepare_prop).collect()),
        LiveValue::Record(entries) => AspectValue::Record(prepare_props(entries)),
    }
}

pub fn prepare_props(props: &LiveProps) -> Aspects {
    props
        .iter()
        .map(|(key, value)| (key.clone(), prepare_prop(value)))
        .collect()
}

fn describe(element: &Element) -> ComponentDescriptor {
    let node = element.node();
    let aspects = node
        .aspects()
        .iter()
        .filter(|(key, _)| !RESERVED_ASPECTS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), prepare_prop(value)))
        .collect();
    ComponentDescriptor {
        name: node.name().to_string(),
        package: node.package().to_string(),
        identity: node.identity().to_string(),
        aspects,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::super::testing::{core_registry, RecordingContext};
    use super::super::{hydrate_component, HydrationContext};
    use super::*;

    #[test]
    fn hydrate_then_serialize_round_trips() {
        let descriptor: ComponentDescriptor = serde_json::from_value(json!({
            "name": "Container", "package": "core", "identity": "root",
            "aspects": {
                "children": [
                    {"name": "Text", "package": "core", "identity": "t1", "aspects": {"text": "hi"}},
                    42,
                    {"plain": true}
                ],
                "footer": {"name": "Text", "package": "core", "identity": "f", "aspects": {
                    "nested": {"deep": {"name": "Icon", "package": "core", "identity": "i", "aspects": {"size": 2.5}}}
                }},
                "title": null
            }
        }))
        .unwrap();

        let ctx: Arc<dyn HydrationContext> = Arc::new(RecordingContext::default());
        let element = hydrate_component(&descriptor, &core_registry(), &ctx).unwrap();

        assert_eq!(
            prepare_prop(&LiveValue::Element(element)),
            AspectValue::Component(Box::new(descriptor))
        );
    }

    #[test]
    fn serializes_current_state_and_skips_reserved_names() {
        let descriptor = ComponentDescriptor::new("Input", "core", "in")
            .with_aspect("value", "old")
            .with_aspect("key", "internal");
        let ctx: Arc<dyn HydrationContext> = Arc::new(RecordingContext::default());
        let element = hydrate_component(&descriptor, &core_registry(), &ctx).unwrap();
        element
            .node()
            .set_aspects(LiveProps::from([("value".to_string(), json!("new").into())]));

        let AspectValue::Component(out) = prepare_prop(&LiveValue::Element(element)) else {
            panic!("expected a descriptor");
        };
        assert_eq!(out.aspects.len(), 1);
        assert_eq!(out.aspects["value"], AspectValue::from("new"));
    }
}
