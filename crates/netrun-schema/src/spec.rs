//! # Schema Specification Format
//!
//! The declarative document a role ships as `bindings.yaml`:
//!
//! ```yaml
//! validators:
//!   vlan_range: { type: range, minval: 1, maxval: 4094 }
//! models:
//!   vlan:
//!     vlan_id: { type: int, required: true, validators: vlan_range }
//!     vlan_name: {}
//! actions:
//!   create_vlan:
//!     args:
//!       vlan_id: { type: int, required: true, validators: [vlan_range] }
//!       vlan_name: { type: str }
//!     tasks_from: create_vlan
//! ```
//!
//! Every mapping keeps declaration order. `parameters`, `static_vars` and
//! `target` are accepted as aliases of `args`, `vars` and `tasks_from`.
//!
//! YAML is converted to `serde_json::Value` before typed deserialization,
//! so both formats go through one code path.

use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

use netrun_core::{Document, SerializeWhen};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;

use crate::error::SchemaError;

// ─── Ordered Maps ────────────────────────────────────────────────────

/// A mapping that keeps declaration order and rejects duplicate keys.
///
/// A null value deserializes as an empty map, so `models:` with nothing
/// under it is accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<T>(Vec<(String, T)>);

impl<T> OrderedMap<T> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> Default for OrderedMap<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> FromIterator<(String, T)> for OrderedMap<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OrderedMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<T> {
            type Value = OrderedMap<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(OrderedMap::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, T)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, T>()? {
                    if entries.iter().any(|(k, _)| k == &key) {
                        return Err(de::Error::custom(format!("duplicate key '{key}'")));
                    }
                    entries.push((key, value));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_any(OrderedMapVisitor(PhantomData))
    }
}

/// A single name or a list of names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::One(name) => std::slice::from_ref(name),
            Self::Many(names) => names,
        }
    }
}

impl Default for OneOrMany {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

// ─── Specification ───────────────────────────────────────────────────

/// A validator definition: a kind from the fixed table and its parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValidatorSpec {
    /// Validator kind (`range`, `choice`, `port`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Kind-specific parameters.
    #[serde(flatten)]
    pub params: Document,
}

/// A model field definition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    /// Attribute type name; absent means `str`.
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub validators: OneOrMany,
    #[serde(default)]
    pub serialize_when: SerializeWhen,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Element model of an `object`, `index` or `map` field.
    #[serde(default)]
    pub model: Option<String>,
    /// Key field of a `map` field's elements; defaults to `name`.
    #[serde(default)]
    pub key: Option<String>,
}

/// An action parameter definition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamSpec {
    /// `str`, `int`, `bool`, `list`, `dict`, or a model name; absent means `str`.
    #[serde(rename = "type", default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub validators: OneOrMany,
}

/// An action definition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionSpec {
    /// Declared parameters. A parameter with no body is an optional string.
    #[serde(default, alias = "parameters")]
    pub args: OrderedMap<Option<ParamSpec>>,
    /// Static variables merged into every invocation.
    #[serde(default, alias = "static_vars")]
    pub vars: Option<Document>,
    /// Task file of the role to import.
    #[serde(default, alias = "target")]
    pub tasks_from: Option<String>,
}

/// A parsed role bindings specification.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SchemaSpecification {
    #[serde(default)]
    pub validators: OrderedMap<ValidatorSpec>,
    /// Models by name; each maps field names to field definitions.
    #[serde(default)]
    pub models: OrderedMap<OrderedMap<Option<FieldSpec>>>,
    #[serde(default)]
    pub actions: OrderedMap<ActionSpec>,
}

const STRING_SOURCE: &str = "<string>";

impl SchemaSpecification {
    /// Parse a YAML specification.
    pub fn from_yaml_str(text: &str) -> Result<Self, SchemaError> {
        Self::parse_yaml(STRING_SOURCE, text)
    }

    /// Parse a JSON specification.
    pub fn from_json_str(text: &str) -> Result<Self, SchemaError> {
        Self::parse_json(STRING_SOURCE, text)
    }

    /// Read and parse a specification file.
    ///
    /// `.json` files are parsed as JSON; everything else as YAML.
    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        let source_name = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: source_name.clone(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::parse_json(&source_name, &text),
            _ => Self::parse_yaml(&source_name, &text),
        }
    }

    fn parse_yaml(source_name: &str, text: &str) -> Result<Self, SchemaError> {
        let parse_err = |reason: String| SchemaError::Parse {
            source_name: source_name.to_string(),
            reason,
        };
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| parse_err(format!("invalid YAML: {e}")))?;
        let json = yaml_to_json_value(&yaml)
            .map_err(|e| parse_err(format!("YAML-to-JSON conversion failed: {e}")))?;
        Self::from_value(source_name, json)
    }

    fn parse_json(source_name: &str, text: &str) -> Result<Self, SchemaError> {
        let json: Value = serde_json::from_str(text).map_err(|e| SchemaError::Parse {
            source_name: source_name.to_string(),
            reason: format!("invalid JSON: {e}"),
        })?;
        Self::from_value(source_name, json)
    }

    fn from_value(source_name: &str, value: Value) -> Result<Self, SchemaError> {
        // An empty file is an empty specification.
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(|e| SchemaError::Parse {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Convert a YAML value into a JSON value, keeping mapping order.
fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::from(i))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::from(u))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f} in JSON"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => seq
            .iter()
            .map(yaml_to_json_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        serde_yaml::Value::Mapping(map) => {
            let mut json_map = Document::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported mapping key: {other:?}")),
                };
                json_map.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(json_map))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}
