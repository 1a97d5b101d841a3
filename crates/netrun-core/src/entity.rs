//! # Entity Types and Instances
//!
//! An [`EntityType`] is a named, ordered, immutable set of attribute
//! descriptors. An [`Entity`] is a value bag holding one owned value per
//! descriptor.
//!
//! ## Registration
//!
//! Types are registered explicitly through [`EntityType::builder`] rather
//! than by reflection:
//!
//! ```text
//! EntityType::builder("Task")
//!     .extends(&base)            // ancestor attributes first
//!     .attr("name", Attribute::string().serialize_when(SerializeWhen::Present))
//!     .attr("action", Attribute::string().required())
//!     .build()?                  // -> Arc<EntityType>
//! ```
//!
//! Ancestor attributes are collected first. A later declaration with the
//! same name replaces the earlier descriptor in place, so the most specific
//! definition wins while the ancestor's field position is kept.
//!
//! ## Aliases
//!
//! Every field owns exactly one storage slot. Alias names resolve to the
//! canonical slot at lookup time, so a write through any name is visible
//! through all of them and a delete through any name resets all of them.
//! An alias that equals a separately declared field name is shadowed by
//! that field.
//!
//! ## Open and Closed Types
//!
//! A closed type rejects undeclared names. An open type captures them into
//! a designated `dict` field (its catch-all), either flattened back into the
//! serialized document (host variables) or kept under the field's own key
//! (group variables).
//!
//! ## Identity
//!
//! Equality, hashing and `Display` derive from the serialized document.
//! Two entities are equal iff their documents are equal, independent of
//! key order.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde_json::Value;

use crate::attribute::{Attribute, AttributeDescriptor};
use crate::container::{KeyedCollection, OrderedCollection};
use crate::error::{DefinitionError, EntityError};
use crate::naming::validate_name;
use crate::serialize;
use crate::value::{AttrValue, Document, TypeTag};

// ─── Entity Types ────────────────────────────────────────────────────

/// How an open entity type stores and emits undeclared keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatchAllMode {
    /// Captured keys are merged into the top level of the serialized document.
    Flatten,
    /// Captured keys stay under the catch-all field's own key.
    Nested,
}

#[derive(Debug, Clone)]
struct CatchAll {
    field: String,
    slot: usize,
    mode: CatchAllMode,
}

/// A registered entity type.
#[derive(Debug)]
pub struct EntityType {
    name: String,
    parents: Vec<Arc<EntityType>>,
    attributes: Vec<AttributeDescriptor>,
    lookup: BTreeMap<String, usize>,
    catch_all: Option<CatchAll>,
    envelope: Option<String>,
}

impl EntityType {
    /// Start registering a new entity type.
    pub fn builder(name: impl Into<String>) -> EntityTypeBuilder {
        EntityTypeBuilder {
            name: name.into(),
            parents: Vec::new(),
            declared: Vec::new(),
            catch_all: None,
            envelope: None,
        }
    }

    /// Type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct ancestors, in declaration order.
    pub fn parents(&self) -> &[Arc<EntityType>] {
        &self.parents
    }

    /// All descriptors, ancestors first, in declaration order.
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    /// Look up a descriptor by field or alias name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.slot(name).map(|slot| &self.attributes[slot])
    }

    /// Storage slot for a field or alias name.
    pub fn slot(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Whether `name` is a declared field or alias.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    /// Canonical field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(AttributeDescriptor::name)
    }

    /// Whether undeclared keys are captured instead of rejected.
    pub fn is_open(&self) -> bool {
        self.catch_all.is_some()
    }

    /// Catch-all field name and mode, for open types.
    pub fn catch_all(&self) -> Option<(&str, CatchAllMode)> {
        self.catch_all.as_ref().map(|c| (c.field.as_str(), c.mode))
    }

    /// Root key wrapping the serialized document, if any.
    pub fn envelope(&self) -> Option<&str> {
        self.envelope.as_deref()
    }

    /// Whether any attribute is required.
    pub fn has_required_fields(&self) -> bool {
        self.attributes.iter().any(AttributeDescriptor::is_required)
    }

    /// True if `self` is `other` or descends from it.
    pub fn is_a(&self, other: &EntityType) -> bool {
        std::ptr::eq(self, other) || self.parents.iter().any(|p| p.is_a(other))
    }

    pub(crate) fn catch_all_slot(&self) -> Option<(usize, CatchAllMode)> {
        self.catch_all.as_ref().map(|c| (c.slot, c.mode))
    }
}

/// Builder for [`EntityType`]. See the module documentation.
#[derive(Debug)]
pub struct EntityTypeBuilder {
    name: String,
    parents: Vec<Arc<EntityType>>,
    declared: Vec<(String, Attribute)>,
    catch_all: Option<(String, CatchAllMode)>,
    envelope: Option<String>,
}

impl EntityTypeBuilder {
    /// Inherit the attributes, catch-all and envelope of `parent`.
    pub fn extends(mut self, parent: &Arc<EntityType>) -> Self {
        self.parents.push(Arc::clone(parent));
        self
    }

    /// Declare an attribute.
    pub fn attr(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.declared.push((name.into(), attribute));
        self
    }

    /// Capture undeclared keys into `field` and flatten them on output.
    pub fn open(mut self, field: impl Into<String>) -> Self {
        self.catch_all = Some((field.into(), CatchAllMode::Flatten));
        self
    }

    /// Capture undeclared keys into `field`, serialized under its own key.
    pub fn open_nested(mut self, field: impl Into<String>) -> Self {
        self.catch_all = Some((field.into(), CatchAllMode::Nested));
        self
    }

    /// Wrap the serialized document under a single root key.
    pub fn envelope(mut self, key: impl Into<String>) -> Self {
        self.envelope = Some(key.into());
        self
    }

    /// Validate and register the type.
    pub fn build(self) -> Result<Arc<EntityType>, DefinitionError> {
        validate_name(&self.name)?;

        let mut attributes: Vec<AttributeDescriptor> = Vec::new();
        let mut merge = |descriptor: AttributeDescriptor| {
            match attributes.iter().position(|a| a.name() == descriptor.name()) {
                Some(pos) => attributes[pos] = descriptor,
                None => attributes.push(descriptor),
            }
        };

        for parent in &self.parents {
            for descriptor in parent.attributes() {
                merge(descriptor.clone());
            }
        }

        let mut own_names: Vec<&str> = Vec::new();
        for (name, attribute) in &self.declared {
            if own_names.contains(&name.as_str()) {
                return Err(DefinitionError::DuplicateAttribute {
                    entity: self.name.clone(),
                    name: name.clone(),
                });
            }
            own_names.push(name);
            merge(attribute.clone().define(name)?);
        }

        let mut lookup = BTreeMap::new();
        for (slot, descriptor) in attributes.iter().enumerate() {
            lookup.insert(descriptor.name().to_string(), slot);
        }
        for (slot, descriptor) in attributes.iter().enumerate() {
            for alias in descriptor.aliases() {
                if attributes.iter().any(|a| a.name() == alias) {
                    tracing::warn!(
                        entity = %self.name,
                        alias = %alias,
                        field = %descriptor.name(),
                        "alias shadowed by a declared field"
                    );
                    continue;
                }
                if lookup.insert(alias.clone(), slot).is_some() {
                    return Err(DefinitionError::DuplicateAttribute {
                        entity: self.name.clone(),
                        name: alias.clone(),
                    });
                }
            }
        }

        let inherited = || {
            self.parents.iter().find_map(|p| {
                p.catch_all
                    .as_ref()
                    .map(|c| (c.field.clone(), c.mode))
            })
        };
        let catch_all = match self.catch_all.clone().or_else(inherited) {
            Some((field, mode)) => {
                let slot = match lookup.get(&field) {
                    Some(&slot) if matches!(attributes[slot].type_tag(), TypeTag::Dict) => slot,
                    _ => {
                        return Err(DefinitionError::InvalidCatchAll {
                            entity: self.name.clone(),
                            field,
                        })
                    }
                };
                Some(CatchAll { field, slot, mode })
            }
            None => None,
        };

        let envelope = self
            .envelope
            .clone()
            .or_else(|| self.parents.iter().find_map(|p| p.envelope.clone()));

        tracing::debug!(
            entity = %self.name,
            attributes = attributes.len(),
            open = catch_all.is_some(),
            "registered entity type"
        );

        Ok(Arc::new(EntityType {
            name: self.name,
            parents: self.parents,
            attributes,
            lookup,
            catch_all,
            envelope,
        }))
    }
}

// ─── Entity Instances ────────────────────────────────────────────────

/// Which error an unknown name produces while populating an entity.
#[derive(Debug, Clone, Copy)]
pub(crate) enum UnknownName {
    /// Keyword construction: `UnknownAttribute`.
    Attribute,
    /// Document deserialization: `UnknownField`.
    Field,
}

/// An instance of an [`EntityType`].
#[derive(Clone)]
pub struct Entity {
    ty: Arc<EntityType>,
    values: Vec<AttrValue>,
}

impl Entity {
    /// Construct an entity from `(name, value)` pairs.
    ///
    /// Unsupplied fields take their defaults. Undeclared names fail with
    /// `UnknownAttribute` on closed types and are captured on open types.
    pub fn new<I, K, V>(ty: &Arc<EntityType>, fields: I) -> Result<Self, EntityError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttrValue>,
    {
        let fields = fields.into_iter().map(|(k, v)| (k.into(), v.into()));
        Self::populate(ty, fields, UnknownName::Attribute)
    }

    /// Construct an entity with every field at its default.
    pub fn empty(ty: &Arc<EntityType>) -> Result<Self, EntityError> {
        let entity = Self::with_defaults(ty);
        entity.check_required()?;
        Ok(entity)
    }

    /// Rebuild an entity from its serialized document.
    pub fn from_document(ty: &Arc<EntityType>, document: &Value) -> Result<Self, EntityError> {
        serialize::from_value(ty, document)
    }

    pub(crate) fn with_defaults(ty: &Arc<EntityType>) -> Self {
        Self {
            ty: Arc::clone(ty),
            values: ty.attributes.iter().map(AttributeDescriptor::default_value).collect(),
        }
    }

    pub(crate) fn populate<I>(
        ty: &Arc<EntityType>,
        fields: I,
        unknown: UnknownName,
    ) -> Result<Self, EntityError>
    where
        I: IntoIterator<Item = (String, AttrValue)>,
    {
        let mut entity = Self::with_defaults(ty);
        let mut extras: Vec<(String, AttrValue)> = Vec::new();

        for (name, value) in fields {
            match ty.slot(&name) {
                Some(slot) => entity.assign(slot, value)?,
                None if ty.is_open() => extras.push((name, value)),
                None => {
                    return Err(match unknown {
                        UnknownName::Attribute => EntityError::UnknownAttribute {
                            entity: ty.name.clone(),
                            attribute: name,
                        },
                        UnknownName::Field => EntityError::UnknownField {
                            entity: ty.name.clone(),
                            field: name,
                        },
                    })
                }
            }
        }

        // Captured after declared fields so an explicit catch-all value
        // does not overwrite them.
        for (name, value) in extras {
            entity.capture(name, value.to_json());
        }

        entity.check_required()?;
        Ok(entity)
    }

    /// The entity's type.
    pub fn entity_type(&self) -> &Arc<EntityType> {
        &self.ty
    }

    /// The entity's type name.
    pub fn type_name(&self) -> &str {
        &self.ty.name
    }

    /// Whether the entity is an instance of `ty` or one of its descendants.
    pub fn is_instance_of(&self, ty: &EntityType) -> bool {
        self.ty.is_a(ty)
    }

    /// Borrow the value of a field or alias.
    pub fn get(&self, name: &str) -> Result<&AttrValue, EntityError> {
        let slot = self.slot_of(name)?;
        Ok(&self.values[slot])
    }

    /// An owned copy of the value of a field or alias.
    pub fn value(&self, name: &str) -> Result<AttrValue, EntityError> {
        self.get(name).cloned()
    }

    /// A string field. `None` when unset.
    pub fn get_str(&self, name: &str) -> Result<Option<&str>, EntityError> {
        self.typed(name, "str", |v| match v {
            AttrValue::String(s) => Some(Some(s.as_str())),
            AttrValue::Null => Some(None),
            _ => None,
        })
    }

    /// An integer field. `None` when unset.
    pub fn get_int(&self, name: &str) -> Result<Option<i64>, EntityError> {
        self.typed(name, "int", |v| match v {
            AttrValue::Integer(i) => Some(Some(*i)),
            AttrValue::Null => Some(None),
            _ => None,
        })
    }

    /// A boolean field. `None` when unset.
    pub fn get_bool(&self, name: &str) -> Result<Option<bool>, EntityError> {
        self.typed(name, "bool", |v| match v {
            AttrValue::Boolean(b) => Some(Some(*b)),
            AttrValue::Null => Some(None),
            _ => None,
        })
    }

    /// A list field.
    pub fn get_list(&self, name: &str) -> Result<&[Value], EntityError> {
        self.typed(name, "list", |v| match v {
            AttrValue::List(items) => Some(items.as_slice()),
            _ => None,
        })
    }

    /// A dict field.
    pub fn get_dict(&self, name: &str) -> Result<&Document, EntityError> {
        self.typed(name, "dict", |v| match v {
            AttrValue::Dict(map) => Some(map),
            _ => None,
        })
    }

    /// A nested entity field. `None` when unset.
    pub fn get_object(&self, name: &str) -> Result<Option<&Entity>, EntityError> {
        self.typed(name, "object", |v| match v {
            AttrValue::Object(entity) => Some(Some(entity.as_ref())),
            AttrValue::Null => Some(None),
            _ => None,
        })
    }

    /// An ordered collection field.
    pub fn get_index(&self, name: &str) -> Result<&OrderedCollection, EntityError> {
        self.typed(name, "index", |v| match v {
            AttrValue::Index(coll) => Some(coll),
            _ => None,
        })
    }

    /// A keyed collection field.
    pub fn get_map(&self, name: &str) -> Result<&KeyedCollection, EntityError> {
        self.typed(name, "map", |v| match v {
            AttrValue::Map(coll) => Some(coll),
            _ => None,
        })
    }

    /// Mutable access to a dict field.
    pub fn dict_mut(&mut self, name: &str) -> Result<&mut Document, EntityError> {
        let slot = self.slot_of(name)?;
        match &mut self.values[slot] {
            AttrValue::Dict(map) => Ok(map),
            other => Err(mismatch(name, "dict", other)),
        }
    }

    /// Mutable access to a nested entity field.
    pub fn object_mut(&mut self, name: &str) -> Result<&mut Entity, EntityError> {
        let slot = self.slot_of(name)?;
        match &mut self.values[slot] {
            AttrValue::Object(entity) => Ok(entity.as_mut()),
            other => Err(mismatch(name, "object", other)),
        }
    }

    /// Mutable access to an ordered collection field.
    pub fn index_mut(&mut self, name: &str) -> Result<&mut OrderedCollection, EntityError> {
        let slot = self.slot_of(name)?;
        match &mut self.values[slot] {
            AttrValue::Index(coll) => Ok(coll),
            other => Err(mismatch(name, "index", other)),
        }
    }

    /// Mutable access to a keyed collection field.
    pub fn map_mut(&mut self, name: &str) -> Result<&mut KeyedCollection, EntityError> {
        let slot = self.slot_of(name)?;
        match &mut self.values[slot] {
            AttrValue::Map(coll) => Ok(coll),
            other => Err(mismatch(name, "map", other)),
        }
    }

    /// Set a field or alias. The value is coerced through its descriptor.
    pub fn set(&mut self, name: &str, value: impl Into<AttrValue>) -> Result<(), EntityError> {
        let slot = self.slot_of(name)?;
        self.assign(slot, value.into())
    }

    /// Reset a field (and every alias of it) to its default.
    pub fn delete(&mut self, name: &str) -> Result<(), EntityError> {
        let slot = self.slot_of(name)?;
        let descriptor = &self.ty.attributes[slot];
        if descriptor.is_required() {
            return Err(EntityError::RequiredFieldImmutable {
                entity: self.ty.name.clone(),
                attribute: descriptor.name().to_string(),
            });
        }
        self.values[slot] = descriptor.default_value();
        Ok(())
    }

    /// Store a free-form value in the catch-all of an open entity.
    pub fn set_extra(&mut self, name: &str, value: Value) -> Result<(), EntityError> {
        if self.ty.has_attribute(name) {
            return self.set(name, value);
        }
        if self.capture(name.to_string(), value) {
            Ok(())
        } else {
            Err(EntityError::UnknownAttribute {
                entity: self.ty.name.clone(),
                attribute: name.to_string(),
            })
        }
    }

    /// Serialize to a plain document. See [`crate::serialize`].
    pub fn serialize(&self) -> Document {
        serialize::to_document(self)
    }

    pub(crate) fn values(&self) -> &[AttrValue] {
        &self.values
    }

    fn slot_of(&self, name: &str) -> Result<usize, EntityError> {
        self.ty.slot(name).ok_or_else(|| EntityError::UnknownAttribute {
            entity: self.ty.name.clone(),
            attribute: name.to_string(),
        })
    }

    fn assign(&mut self, slot: usize, value: AttrValue) -> Result<(), EntityError> {
        let descriptor = &self.ty.attributes[slot];
        let coerced = descriptor.coerce(value)?;
        if descriptor.is_required() && coerced.is_null() {
            return Err(EntityError::MissingRequiredField {
                entity: self.ty.name.clone(),
                attribute: descriptor.name().to_string(),
            });
        }
        self.values[slot] = coerced;
        Ok(())
    }

    // Returns false for closed types.
    fn capture(&mut self, name: String, value: Value) -> bool {
        let Some((slot, _)) = self.ty.catch_all_slot() else {
            return false;
        };
        match &mut self.values[slot] {
            AttrValue::Dict(map) => {
                map.insert(name, value);
            }
            other => {
                let mut map = Document::new();
                map.insert(name, value);
                *other = AttrValue::Dict(map);
            }
        }
        true
    }

    fn check_required(&self) -> Result<(), EntityError> {
        for (descriptor, value) in self.ty.attributes.iter().zip(&self.values) {
            if descriptor.is_required() && value.is_null() {
                return Err(EntityError::MissingRequiredField {
                    entity: self.ty.name.clone(),
                    attribute: descriptor.name().to_string(),
                });
            }
        }
        Ok(())
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        expected: &str,
        pick: impl FnOnce(&'a AttrValue) -> Option<T>,
    ) -> Result<T, EntityError> {
        let value = self.get(name)?;
        pick(value).ok_or_else(|| mismatch(name, expected, value))
    }
}

fn mismatch(name: &str, expected: &str, actual: &AttrValue) -> EntityError {
    EntityError::TypeMismatch {
        attribute: name.to_string(),
        expected: expected.to_string(),
        actual: actual.kind().to_string(),
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.serialize() == other.serialize()
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        serialize::hash_document(&self.serialize(), state);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("type", &self.ty.name)
            .field("document", &self.serialize())
            .finish()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(&self.serialize()).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}
