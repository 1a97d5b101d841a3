//! # Typed Containers
//!
//! Homogeneous collections of entities bound to one element type.
//!
//! - [`OrderedCollection`] is a positional list (a playbook's plays, a
//!   play's tasks).
//! - [`KeyedCollection`] is a mapping from a string key to an entity, where
//!   the key is always the value of a designated string field on the element
//!   (an inventory's hosts, keyed by `name`).
//!
//! Both reject elements that are not instances of the element type. Keyed
//! storage is a `Vec<(String, Entity)>` so iteration follows insertion order
//! and replacing an entry keeps its position.
//!
//! ## Document Form
//!
//! An ordered collection serializes to a list of element documents. A keyed
//! collection serializes to a mapping from key to element document with the
//! key field removed; deserialization writes the key back into that field.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::attribute::{check_key_field, describe, DEFAULT_KEY_FIELD};
use crate::entity::{Entity, EntityType};
use crate::error::{DefinitionError, EntityError};
use crate::serialize;
use crate::value::{AttrValue, Document};

fn wrong_item(container: &str, expected: &EntityType, item: &Entity) -> EntityError {
    EntityError::TypeMismatch {
        attribute: format!("{container}<{}>", expected.name()),
        expected: expected.name().to_string(),
        actual: item.type_name().to_string(),
    }
}

// ─── Ordered ─────────────────────────────────────────────────────────

/// A positional list of entities of one type.
#[derive(Clone)]
pub struct OrderedCollection {
    item_type: Arc<EntityType>,
    items: Vec<Entity>,
}

impl OrderedCollection {
    /// Create an empty collection of `item_type` elements.
    pub fn new(item_type: Arc<EntityType>) -> Self {
        Self {
            item_type,
            items: Vec::new(),
        }
    }

    /// Element type.
    pub fn item_type(&self) -> &Arc<EntityType> {
        &self.item_type
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection has no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.items.iter()
    }

    /// Iterate mutably in order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Entity> {
        self.items.iter_mut()
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.items.get(index)
    }

    /// Mutable element at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.items.get_mut(index)
    }

    /// Append `item` to the end.
    pub fn append(&mut self, item: Entity) -> Result<(), EntityError> {
        self.check(&item)?;
        self.items.push(item);
        Ok(())
    }

    /// Insert `item` at `index`, clamped to the current length.
    pub fn insert(&mut self, index: usize, item: Entity) -> Result<(), EntityError> {
        self.check(&item)?;
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        Ok(())
    }

    /// Replace the element at `index`, returning the previous one.
    pub fn replace(&mut self, index: usize, item: Entity) -> Result<Entity, EntityError> {
        self.check(&item)?;
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or(EntityError::IndexOutOfRange { index, len })?;
        Ok(std::mem::replace(slot, item))
    }

    /// Remove and return the element at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Entity, EntityError> {
        if index >= self.items.len() {
            return Err(EntityError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Construct a new element from `fields`, append it and return it.
    pub fn create<I, K, V>(&mut self, fields: I) -> Result<&mut Entity, EntityError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttrValue>,
    {
        let item = Entity::new(&self.item_type, fields)?;
        self.items.push(item);
        let last = self.items.len() - 1;
        Ok(&mut self.items[last])
    }

    /// Element documents, in order.
    pub fn serialize(&self) -> Vec<Value> {
        self.items
            .iter()
            .map(|item| Value::Object(item.serialize()))
            .collect()
    }

    /// Replace the contents with elements rebuilt from `documents`.
    ///
    /// Nothing changes unless every document deserializes.
    pub fn deserialize(&mut self, documents: &[Value]) -> Result<(), EntityError> {
        let items = documents
            .iter()
            .map(|doc| serialize::from_value(&self.item_type, doc))
            .collect::<Result<Vec<_>, _>>()?;
        self.items = items;
        Ok(())
    }

    fn check(&self, item: &Entity) -> Result<(), EntityError> {
        if item.is_instance_of(&self.item_type) {
            Ok(())
        } else {
            Err(wrong_item("index", &self.item_type, item))
        }
    }
}

impl<'a> IntoIterator for &'a OrderedCollection {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl PartialEq for OrderedCollection {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl fmt::Debug for OrderedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedCollection")
            .field("item_type", &self.item_type.name())
            .field("items", &self.items)
            .finish()
    }
}

// ─── Keyed ───────────────────────────────────────────────────────────

/// A mapping from key to entity, keyed by a string field of the element.
#[derive(Clone)]
pub struct KeyedCollection {
    item_type: Arc<EntityType>,
    key_field: String,
    entries: Vec<(String, Entity)>,
}

impl KeyedCollection {
    /// Create an empty collection keyed by the element's `name` field.
    pub fn new(item_type: Arc<EntityType>) -> Result<Self, DefinitionError> {
        Self::with_key(item_type, DEFAULT_KEY_FIELD)
    }

    /// Create an empty collection keyed by the element's `key_field`.
    pub fn with_key(
        item_type: Arc<EntityType>,
        key_field: impl Into<String>,
    ) -> Result<Self, DefinitionError> {
        let key_field = key_field.into();
        check_key_field(&item_type, &key_field)?;
        Ok(Self::unchecked(item_type, key_field))
    }

    // The key field was already checked by the owning descriptor.
    pub(crate) fn unchecked(item_type: Arc<EntityType>, key_field: String) -> Self {
        Self {
            item_type,
            key_field,
            entries: Vec::new(),
        }
    }

    /// Element type.
    pub fn item_type(&self) -> &Arc<EntityType> {
        &self.item_type
    }

    /// Name of the element field that supplies the key.
    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an entry exists under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entity)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entry under `key`.
    pub fn get(&self, key: &str) -> Option<&Entity> {
        self.position(key).map(|pos| &self.entries[pos].1)
    }

    /// Mutable entry under `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entity> {
        let pos = self.position(key)?;
        Some(&mut self.entries[pos].1)
    }

    /// Add `item` under the value of its key field, replacing any entry
    /// already stored under that key. Returns the replaced entry.
    pub fn add(&mut self, item: Entity) -> Result<Option<Entity>, EntityError> {
        self.check(&item)?;
        let key = self.key_of(&item)?;
        Ok(self.upsert(key, item))
    }

    /// Store `item` under `key`, writing `key` into the item's key field.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        mut item: Entity,
    ) -> Result<Option<Entity>, EntityError> {
        self.check(&item)?;
        let key = key.into();
        item.set(&self.key_field, key.as_str())?;
        Ok(self.upsert(key, item))
    }

    /// Construct a new element from `fields` and store it under its key.
    ///
    /// Fails with `MissingKey` when the key field is not supplied and with
    /// `DuplicateKey` when the key is already taken. The collection is
    /// unchanged on failure.
    pub fn create<I, K, V>(&mut self, fields: I) -> Result<&mut Entity, EntityError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttrValue>,
    {
        let item = Entity::new(&self.item_type, fields)?;
        let key = self.key_of(&item)?;
        if self.contains_key(&key) {
            return Err(EntityError::DuplicateKey { key });
        }
        self.entries.push((key, item));
        let last = self.entries.len() - 1;
        Ok(&mut self.entries[last].1)
    }

    /// Remove and return the entry under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Entity> {
        self.position(key).map(|pos| self.entries.remove(pos).1)
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// A mapping from key to element document without the key field.
    pub fn serialize(&self) -> Document {
        self.entries
            .iter()
            .map(|(key, item)| {
                let body: Document = item
                    .serialize()
                    .into_iter()
                    .filter(|(field, _)| field != &self.key_field)
                    .collect();
                (key.clone(), Value::Object(body))
            })
            .collect()
    }

    /// Replace the contents with entries rebuilt from `document`.
    ///
    /// Each key is written back into the element's key field. A null
    /// element document is treated as empty. Nothing changes unless every
    /// entry deserializes.
    pub fn deserialize(&mut self, document: &Document) -> Result<(), EntityError> {
        let mut entries = Vec::with_capacity(document.len());
        for (key, value) in document {
            let mut body = match value {
                Value::Null => Document::new(),
                Value::Object(map) => map.clone(),
                other => {
                    return Err(EntityError::MalformedDocument {
                        entity: self.item_type.name().to_string(),
                        reason: format!("entry '{key}' must be a mapping, got {}", describe(other)),
                    })
                }
            };
            body.insert(self.key_field.clone(), Value::String(key.clone()));
            let item = serialize::from_document(&self.item_type, &body)?;
            entries.push((key.clone(), item));
        }
        self.entries = entries;
        Ok(())
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    fn upsert(&mut self, key: String, item: Entity) -> Option<Entity> {
        match self.position(&key) {
            Some(pos) => Some(std::mem::replace(&mut self.entries[pos].1, item)),
            None => {
                self.entries.push((key, item));
                None
            }
        }
    }

    fn key_of(&self, item: &Entity) -> Result<String, EntityError> {
        match item.get_str(&self.key_field)? {
            Some(key) => Ok(key.to_string()),
            None => Err(EntityError::MissingKey {
                entity: self.item_type.name().to_string(),
                field: self.key_field.clone(),
            }),
        }
    }

    fn check(&self, item: &Entity) -> Result<(), EntityError> {
        if item.is_instance_of(&self.item_type) {
            Ok(())
        } else {
            Err(wrong_item("map", &self.item_type, item))
        }
    }
}

impl PartialEq for KeyedCollection {
    fn eq(&self, other: &Self) -> bool {
        self.serialize() == other.serialize()
    }
}

impl fmt::Debug for KeyedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedCollection")
            .field("item_type", &self.item_type.name())
            .field("key_field", &self.key_field)
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Attribute, SerializeWhen};
    use serde_json::json;

    fn host_type() -> Arc<EntityType> {
        EntityType::builder("Host")
            .attr("name", Attribute::string().serialize_when(SerializeWhen::Present))
            .attr("ansible_host", Attribute::string().serialize_when(SerializeWhen::Present))
            .build()
            .unwrap()
    }

    fn other_type() -> Arc<EntityType> {
        EntityType::builder("Other")
            .attr("name", Attribute::string())
            .build()
            .unwrap()
    }

    fn host(ty: &Arc<EntityType>, name: &str) -> Entity {
        Entity::new(ty, [("name", name)]).unwrap()
    }

    #[test]
    fn test_ordered_rejects_foreign_type() {
        let ty = host_type();
        let mut coll = OrderedCollection::new(Arc::clone(&ty));
        let foreign = Entity::new(&other_type(), [("name", "x")]).unwrap();
        assert!(matches!(
            coll.append(foreign.clone()),
            Err(EntityError::TypeMismatch { .. })
        ));
        assert!(matches!(
            coll.insert(0, foreign),
            Err(EntityError::TypeMismatch { .. })
        ));
        assert!(coll.is_empty());
    }

    #[test]
    fn test_ordered_positional_operations() {
        let ty = host_type();
        let mut coll = OrderedCollection::new(Arc::clone(&ty));
        coll.append(host(&ty, "a")).unwrap();
        coll.append(host(&ty, "c")).unwrap();
        coll.insert(1, host(&ty, "b")).unwrap();
        coll.insert(99, host(&ty, "d")).unwrap();
        let names: Vec<_> = coll
            .iter()
            .map(|h| h.get_str("name").unwrap().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a", "b", "c", "d"]);

        let old = coll.replace(0, host(&ty, "z")).unwrap();
        assert_eq!(old.get_str("name").unwrap(), Some("a"));
        assert_eq!(
            coll.replace(10, host(&ty, "y")).unwrap_err(),
            EntityError::IndexOutOfRange { index: 10, len: 4 }
        );
        assert_eq!(coll.remove(3).unwrap().get_str("name").unwrap(), Some("d"));
        assert!(coll.remove(3).is_err());
        assert_eq!(coll.len(), 3);
    }

    #[test]
    fn test_ordered_create_appends() {
        let ty = host_type();
        let mut coll = OrderedCollection::new(Arc::clone(&ty));
        coll.create([("name", "h1")]).unwrap().set("ansible_host", "10.0.0.1").unwrap();
        assert_eq!(
            Value::Array(coll.serialize()),
            json!([{"name": "h1", "ansible_host": "10.0.0.1"}])
        );
    }

    #[test]
    fn test_ordered_deserialize_is_atomic() {
        let ty = host_type();
        let mut coll = OrderedCollection::new(Arc::clone(&ty));
        coll.append(host(&ty, "keep")).unwrap();
        let err = coll
            .deserialize(&[json!({"name": "ok"}), json!({"bogus": 1})])
            .unwrap_err();
        assert!(matches!(err, EntityError::UnknownField { .. }));
        assert_eq!(coll.len(), 1);
        assert_eq!(coll.get(0).unwrap().get_str("name").unwrap(), Some("keep"));
    }

    #[test]
    fn test_keyed_add_replaces_in_place() {
        let ty = host_type();
        let mut coll = KeyedCollection::new(Arc::clone(&ty)).unwrap();
        coll.add(host(&ty, "a")).unwrap();
        coll.add(host(&ty, "b")).unwrap();
        let mut replacement = host(&ty, "a");
        replacement.set("ansible_host", "1.1.1.1").unwrap();
        assert!(coll.add(replacement).unwrap().is_some());
        assert_eq!(coll.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(
            coll.get("a").unwrap().get_str("ansible_host").unwrap(),
            Some("1.1.1.1")
        );
    }

    #[test]
    fn test_keyed_add_requires_key() {
        let ty = host_type();
        let mut coll = KeyedCollection::new(Arc::clone(&ty)).unwrap();
        let unnamed = Entity::empty(&ty).unwrap();
        assert_eq!(
            coll.add(unnamed).unwrap_err(),
            EntityError::MissingKey {
                entity: "Host".into(),
                field: "name".into(),
            }
        );
    }

    #[test]
    fn test_keyed_insert_writes_key_field() {
        let ty = host_type();
        let mut coll = KeyedCollection::new(Arc::clone(&ty)).unwrap();
        coll.insert("sw01", host(&ty, "ignored")).unwrap();
        assert_eq!(coll.get("sw01").unwrap().get_str("name").unwrap(), Some("sw01"));
        assert!(!coll.contains_key("ignored"));
    }

    #[test]
    fn test_keyed_create_rejects_duplicates() {
        let ty = host_type();
        let mut coll = KeyedCollection::new(Arc::clone(&ty)).unwrap();
        coll.create([("name", "test")]).unwrap();
        assert_eq!(
            coll.create([("name", "test")]).unwrap_err(),
            EntityError::DuplicateKey { key: "test".into() }
        );
        assert!(matches!(
            coll.create([("ansible_host", "x")]),
            Err(EntityError::MissingKey { .. })
        ));
        assert_eq!(coll.len(), 1);
    }

    #[test]
    fn test_keyed_serialize_strips_key() {
        let ty = host_type();
        let mut coll = KeyedCollection::new(Arc::clone(&ty)).unwrap();
        coll.create([("name", "sw01"), ("ansible_host", "10.1.1.1")]).unwrap();
        coll.create([("name", "sw02")]).unwrap();
        assert_eq!(
            Value::Object(coll.serialize()),
            json!({"sw01": {"ansible_host": "10.1.1.1"}, "sw02": {}})
        );
    }

    #[test]
    fn test_keyed_deserialize_reinjects_key() {
        let ty = host_type();
        let mut coll = KeyedCollection::new(Arc::clone(&ty)).unwrap();
        let doc = json!({"sw01": {"ansible_host": "10.1.1.1"}, "sw02": null});
        coll.deserialize(doc.as_object().unwrap()).unwrap();
        assert_eq!(coll.get("sw02").unwrap().get_str("name").unwrap(), Some("sw02"));
        assert_eq!(
            Value::Object(coll.serialize()),
            json!({"sw01": {"ansible_host": "10.1.1.1"}, "sw02": {}})
        );
    }

    #[test]
    fn test_keyed_deserialize_rejects_scalar_entries() {
        let ty = host_type();
        let mut coll = KeyedCollection::new(Arc::clone(&ty)).unwrap();
        let doc = json!({"sw01": 5});
        assert!(matches!(
            coll.deserialize(doc.as_object().unwrap()),
            Err(EntityError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_key_field_must_be_string_attribute() {
        assert!(matches!(
            KeyedCollection::with_key(host_type(), "missing"),
            Err(DefinitionError::InvalidKeyField { .. })
        ));
        let numbered = EntityType::builder("Numbered")
            .attr("id", Attribute::integer())
            .build()
            .unwrap();
        assert!(KeyedCollection::with_key(numbered, "id").is_err());
    }

    #[test]
    fn test_keyed_remove_keeps_order() {
        let ty = host_type();
        let mut coll = KeyedCollection::new(Arc::clone(&ty)).unwrap();
        for name in ["a", "b", "c"] {
            coll.add(host(&ty, name)).unwrap();
        }
        assert!(coll.remove("b").is_some());
        assert!(coll.remove("b").is_none());
        assert_eq!(coll.keys().collect::<Vec<_>>(), ["a", "c"]);
    }
}
