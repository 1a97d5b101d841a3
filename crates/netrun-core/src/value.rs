//! # Attribute Values and Type Tags
//!
//! `TypeTag` is the fixed type grammar an attribute can declare. `AttrValue`
//! is the owned value stored in an entity slot. Values convert to and from
//! plain `serde_json::Value` documents, the boundary format handed to the
//! external automation engine.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::container::{KeyedCollection, OrderedCollection};
use crate::entity::{Entity, EntityType};

/// A plain, insertion-ordered key/value document.
pub type Document = Map<String, Value>;

// ─── Type Tags ───────────────────────────────────────────────────────

/// Discriminant of a [`TypeTag`], used for validator compatibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    /// UTF-8 string.
    Str,
    /// Signed 64-bit integer.
    Int,
    /// Boolean.
    Bool,
    /// Free-form list of document values.
    List,
    /// Free-form mapping of document values.
    Dict,
    /// Nested entity.
    Object,
    /// Ordered collection of entities.
    Index,
    /// Keyed collection of entities.
    Map,
}

impl Primitive {
    /// The tag name used in schema specifications.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::List => "list",
            Self::Dict => "dict",
            Self::Object => "object",
            Self::Index => "index",
            Self::Map => "map",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The declared type of an attribute.
#[derive(Debug, Clone)]
pub enum TypeTag {
    /// UTF-8 string.
    String,
    /// Signed 64-bit integer.
    Integer,
    /// Boolean.
    Boolean,
    /// Free-form list.
    List,
    /// Free-form mapping.
    Dict,
    /// Nested entity of the given type.
    Object(Arc<EntityType>),
    /// Ordered collection of the given element type.
    Index(Arc<EntityType>),
    /// Keyed collection of the given element type, keyed by `key`.
    Map {
        /// Element type.
        item: Arc<EntityType>,
        /// Name of the string field on `item` that provides the key.
        key: String,
    },
}

impl TypeTag {
    /// The primitive discriminant of this tag.
    pub fn primitive(&self) -> Primitive {
        match self {
            Self::String => Primitive::Str,
            Self::Integer => Primitive::Int,
            Self::Boolean => Primitive::Bool,
            Self::List => Primitive::List,
            Self::Dict => Primitive::Dict,
            Self::Object(_) => Primitive::Object,
            Self::Index(_) => Primitive::Index,
            Self::Map { .. } => Primitive::Map,
        }
    }

    /// The nested entity type, for object and collection tags.
    pub fn entity_type(&self) -> Option<&Arc<EntityType>> {
        match self {
            Self::Object(ty) | Self::Index(ty) => Some(ty),
            Self::Map { item, .. } => Some(item),
            _ => None,
        }
    }

    /// Whether values of this tag are "present" only when non-empty.
    pub fn is_container(&self) -> bool {
        !matches!(self, Self::String | Self::Integer | Self::Boolean)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(ty) => write!(f, "object<{}>", ty.name()),
            Self::Index(ty) => write!(f, "index<{}>", ty.name()),
            Self::Map { item, .. } => write!(f, "map<{}>", item.name()),
            other => f.write_str(other.primitive().as_str()),
        }
    }
}

// ─── Attribute Values ────────────────────────────────────────────────

/// An owned attribute value.
///
/// `Number` holds any document number that does not fit an `i64`
/// (fractions and integers above `i64::MAX`). It exists so that such input is
/// rejected with a type mismatch instead of being truncated; no attribute
/// type accepts it.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Unset.
    Null,
    /// A string.
    String(String),
    /// An integer.
    Integer(i64),
    /// A boolean.
    Boolean(bool),
    /// A number outside the `i64` domain, kept exactly as parsed.
    Number(serde_json::Number),
    /// A free-form list.
    List(Vec<Value>),
    /// A free-form mapping.
    Dict(Document),
    /// A nested entity.
    Object(Box<Entity>),
    /// An ordered collection of entities.
    Index(OrderedCollection),
    /// A keyed collection of entities.
    Map(KeyedCollection),
}

impl AttrValue {
    /// Short name of the value's kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::String(_) => "str",
            Self::Integer(_) => "int",
            Self::Boolean(_) => "bool",
            Self::Number(n) if n.is_u64() => "int out of range",
            Self::Number(_) => "float",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Object(_) => "object",
            Self::Index(_) => "index",
            Self::Map(_) => "map",
        }
    }

    /// Returns true for [`AttrValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer value, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// The boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether the value counts as present for `serialize_when: present`.
    ///
    /// Scalars are present when non-null; lists, mappings, containers and
    /// nested entities when their serialized form is non-empty.
    pub fn is_present(&self) -> bool {
        match self {
            Self::Null => false,
            Self::String(_) | Self::Integer(_) | Self::Boolean(_) | Self::Number(_) => true,
            Self::List(items) => !items.is_empty(),
            Self::Dict(map) => !map.is_empty(),
            Self::Object(entity) => !entity.serialize().is_empty(),
            Self::Index(coll) => !coll.is_empty(),
            Self::Map(coll) => !coll.is_empty(),
        }
    }

    /// Render the value as a plain document value, recursing into nested
    /// entities and containers.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(i) => Value::from(*i),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::List(items) => Value::Array(items.clone()),
            Self::Dict(map) => Value::Object(map.clone()),
            Self::Object(entity) => Value::Object(entity.serialize()),
            Self::Index(coll) => Value::Array(coll.serialize()),
            Self::Map(coll) => Value::Object(coll.serialize()),
        }
    }
}

impl From<Value> for AttrValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Number(n),
            },
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items),
            Value::Object(map) => Self::Dict(map),
        }
    }
}

impl From<&Value> for AttrValue {
    fn from(value: &Value) -> Self {
        Self::from(value.clone())
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u16> for AttrValue {
    fn from(value: u16) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Vec<Value>> for AttrValue {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl From<Document> for AttrValue {
    fn from(value: Document) -> Self {
        Self::Dict(value)
    }
}

impl From<Entity> for AttrValue {
    fn from(value: Entity) -> Self {
        Self::Object(Box::new(value))
    }
}

impl From<OrderedCollection> for AttrValue {
    fn from(value: OrderedCollection) -> Self {
        Self::Index(value)
    }
}

impl From<KeyedCollection> for AttrValue {
    fn from(value: KeyedCollection) -> Self {
        Self::Map(value)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(AttrValue::from(json!(null)), AttrValue::Null);
        assert_eq!(AttrValue::from(json!(true)), AttrValue::Boolean(true));
        assert_eq!(AttrValue::from(json!(42)), AttrValue::Integer(42));
        assert_eq!(AttrValue::from(json!("eos")), AttrValue::String("eos".into()));
        assert_eq!(AttrValue::from(json!(1.5)).kind(), "float");
    }

    #[test]
    fn test_numbers_outside_i64_kept_exactly() {
        let big = AttrValue::from(json!(u64::MAX));
        assert_eq!(big.kind(), "int out of range");
        assert_eq!(big.as_int(), None);
        assert_eq!(big.to_json(), json!(u64::MAX));
        assert_eq!(AttrValue::from(json!(1.5)).to_json(), json!(1.5));
    }

    #[test]
    fn test_bool_is_never_integer() {
        assert_eq!(AttrValue::from(json!(true)).as_int(), None);
        assert_eq!(AttrValue::from(json!(1)).as_bool(), None);
    }

    #[test]
    fn test_presence_of_empty_containers() {
        assert!(!AttrValue::Null.is_present());
        assert!(!AttrValue::List(vec![]).is_present());
        assert!(!AttrValue::Dict(Document::new()).is_present());
        assert!(AttrValue::Integer(0).is_present());
        assert!(AttrValue::Boolean(false).is_present());
        assert!(AttrValue::String(String::new()).is_present());
    }

    #[test]
    fn test_option_conversion() {
        let none: Option<&str> = None;
        assert!(AttrValue::from(none).is_null());
        assert_eq!(AttrValue::from(Some(7_i64)), AttrValue::Integer(7));
    }
}
