//! Aspect values and component descriptors.
//!
//! The wire format is untagged JSON: a component descriptor is any object
//! carrying the four keys `package`, `aspects`, `name` and `identity`. We
//! classify every value exactly once, when it is deserialized, into the
//! [`AspectValue`] variants below. Downstream code matches on the variant and
//! never inspects shapes again.
//!
//! Because the wire has no tag, user data that happens to carry all four
//! descriptor keys is still read as a component. Servers should avoid such
//! records in aspect payloads.

use std::collections::BTreeMap;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys that mark an object as a component descriptor.
pub const DESCRIPTOR_KEYS: [&str; 4] = ["package", "aspects", "name", "identity"];

/// Aspect name to value.
pub type Aspects = BTreeMap<String, AspectValue>;

/// A server-declared UI node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub name: String,
    pub package: String,
    pub identity: String,
    #[serde(default)]
    pub aspects: Aspects,
}

impl ComponentDescriptor {
    pub fn new(
        name: impl Into<String>,
        package: impl Into<String>,
        identity: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            identity: identity.into(),
            aspects: Aspects::new(),
        }
    }

    /// Builder-style aspect insertion.
    pub fn with_aspect(mut self, name: impl Into<String>, value: impl Into<AspectValue>) -> Self {
        self.aspects.insert(name.into(), value.into());
        self
    }
}

/// A value held by an aspect.
#[derive(Debug, Clone, PartialEq)]
pub enum AspectValue {
    /// `null`, a boolean, a number or a string.
    Scalar(Value),
    Component(Box<ComponentDescriptor>),
    Sequence(Vec<AspectValue>),
    Record(Aspects),
}

impl AspectValue {
    pub fn null() -> Self {
        AspectValue::Scalar(Value::Null)
    }

    /// Classify a JSON value.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Array(items) => {
                AspectValue::Sequence(items.into_iter().map(AspectValue::from_json).collect())
            }
            Value::Object(map) => Self::from_object(map),
            scalar => AspectValue::Scalar(scalar),
        }
    }

    fn from_object(map: Map<String, Value>) -> Self {
        if is_descriptor_shape(&map) {
            // A descriptor-shaped object with malformed fields (e.g. a numeric
            // `name`) falls back to a plain record.
            if let Ok(descriptor) =
                serde_json::from_value::<ComponentDescriptor>(Value::Object(map.clone()))
            {
                return AspectValue::Component(Box::new(descriptor));
            }
        }
        AspectValue::Record(
            map.into_iter()
                .map(|(k, v)| (k, AspectValue::from_json(v)))
                .collect(),
        )
    }

    /// Convert back to untagged wire JSON.
    pub fn to_json(&self) -> Value {
        // Serializing into a `Value` cannot fail for this type.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn as_component(&self) -> Option<&ComponentDescriptor> {
        match self {
            AspectValue::Component(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            AspectValue::Scalar(value) => Some(value),
            _ => None,
        }
    }
}

fn is_descriptor_shape(map: &Map<String, Value>) -> bool {
    DESCRIPTOR_KEYS.iter().all(|key| map.contains_key(*key))
}

impl Serialize for AspectValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AspectValue::Scalar(value) => value.serialize(serializer),
            AspectValue::Component(descriptor) => descriptor.serialize(serializer),
            AspectValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            AspectValue::Record(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for AspectValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(AspectValue::from_json)
    }
}

impl From<Value> for AspectValue {
    fn from(value: Value) -> Self {
        AspectValue::from_json(value)
    }
}

impl From<ComponentDescriptor> for AspectValue {
    fn from(descriptor: ComponentDescriptor) -> Self {
        AspectValue::Component(Box::new(descriptor))
    }
}

impl From<&str> for AspectValue {
    fn from(value: &str) -> Self {
        AspectValue::Scalar(Value::String(value.to_string()))
    }
}

impl From<String> for AspectValue {
    fn from(value: String) -> Self {
        AspectValue::Scalar(Value::String(value))
    }
}

impl From<i64> for AspectValue {
    fn from(value: i64) -> Self {
        AspectValue::Scalar(Value::from(value))
    }
}

impl From<f64> for AspectValue {
    fn from(value: f64) -> Self {
        AspectValue::Scalar(Value::from(value))
    }
}

impl From<bool> for AspectValue {
    fn from(value: bool) -> Self {
        AspectValue::Scalar(Value::Bool(value))
    }
}

impl From<Vec<AspectValue>> for AspectValue {
    fn from(items: Vec<AspectValue>) -> Self {
        AspectValue::Sequence(items)
    }
}
