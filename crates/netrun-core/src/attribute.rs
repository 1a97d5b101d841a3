//! # Attribute Descriptors
//!
//! An [`AttributeDescriptor`] is the single source of truth for one field's
//! contract: its type, default, required flag, validators, serialization
//! policy and alias names. Descriptors are produced by [`Attribute::define`]
//! and are immutable afterwards.
//!
//! ## Definition-Time Checks
//!
//! `define` rejects, before any entity exists:
//!
//! 1. validators attached to a type they cannot check (`IncompatibleValidator`);
//! 2. required attributes that are not always serialized (`InvalidPolicy`);
//! 3. defaults that fail the attribute's own type check or validators
//!    (`InvalidDefault`);
//! 4. keyed collections whose key field is not a string attribute of the
//!    element type (`InvalidKeyField`).
//!
//! ## Coercion
//!
//! [`AttributeDescriptor::coerce`] is the only path by which a value enters
//! an entity slot. Null becomes a fresh copy of the default; anything else
//! must already be of the declared kind. There is no cross-primitive
//! coercion: a boolean is never accepted as an integer, nor the reverse.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::container::{KeyedCollection, OrderedCollection};
use crate::entity::{Entity, EntityType};
use crate::error::{DefinitionError, EntityError};
use crate::naming::validate_name;
use crate::serialize;
use crate::validators::Validator;
use crate::value::{AttrValue, TypeTag};

/// Key field used by keyed collections unless another is named.
pub const DEFAULT_KEY_FIELD: &str = "name";

/// When an attribute appears in the serialized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializeWhen {
    /// Always included, even when null or empty.
    #[default]
    Always,
    /// Included only when non-null (scalars) or non-empty (containers).
    Present,
    /// Never included.
    Never,
}

impl SerializeWhen {
    /// Policy name as written in schema specifications.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Present => "present",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for SerializeWhen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Builder ─────────────────────────────────────────────────────────

/// An attribute under construction.
///
/// ```ignore
/// let attr = Attribute::integer()
///     .required()
///     .validator(Validator::range(1, 4094)?)
///     .define("vlan_id")?;
/// ```
#[derive(Debug, Clone)]
pub struct Attribute {
    type_tag: TypeTag,
    default: AttrValue,
    required: bool,
    validators: Vec<Validator>,
    serialize_when: SerializeWhen,
    aliases: Vec<String>,
}

impl Attribute {
    /// Start an attribute of the given type.
    pub fn new(type_tag: TypeTag) -> Self {
        Self {
            type_tag,
            default: AttrValue::Null,
            required: false,
            validators: Vec::new(),
            serialize_when: SerializeWhen::Always,
            aliases: Vec::new(),
        }
    }

    /// A string attribute.
    pub fn string() -> Self {
        Self::new(TypeTag::String)
    }

    /// An integer attribute.
    pub fn integer() -> Self {
        Self::new(TypeTag::Integer)
    }

    /// A boolean attribute.
    pub fn boolean() -> Self {
        Self::new(TypeTag::Boolean)
    }

    /// A free-form list attribute. Defaults to `[]`.
    pub fn list() -> Self {
        Self::new(TypeTag::List)
    }

    /// A free-form mapping attribute. Defaults to `{}`.
    pub fn dict() -> Self {
        Self::new(TypeTag::Dict)
    }

    /// A nested entity attribute.
    pub fn object(ty: &Arc<EntityType>) -> Self {
        Self::new(TypeTag::Object(Arc::clone(ty)))
    }

    /// An ordered collection attribute.
    pub fn index(ty: &Arc<EntityType>) -> Self {
        Self::new(TypeTag::Index(Arc::clone(ty)))
    }

    /// A keyed collection attribute keyed by the element's `name` field.
    pub fn map(ty: &Arc<EntityType>) -> Self {
        Self::map_keyed(ty, DEFAULT_KEY_FIELD)
    }

    /// A keyed collection attribute keyed by the element's `key` field.
    pub fn map_keyed(ty: &Arc<EntityType>, key: impl Into<String>) -> Self {
        Self::new(TypeTag::Map {
            item: Arc::clone(ty),
            key: key.into(),
        })
    }

    /// Set the default value.
    pub fn default(mut self, value: impl Into<AttrValue>) -> Self {
        self.default = value.into();
        self
    }

    /// Mark the attribute as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Attach a validator. Validators run in attachment order.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Attach several validators.
    pub fn validators(mut self, validators: impl IntoIterator<Item = Validator>) -> Self {
        self.validators.extend(validators);
        self
    }

    /// Set the serialization policy.
    pub fn serialize_when(mut self, policy: SerializeWhen) -> Self {
        self.serialize_when = policy;
        self
    }

    /// Add an alias name sharing this attribute's storage.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Validate the attribute contract and produce an immutable descriptor.
    pub fn define(self, name: &str) -> Result<AttributeDescriptor, DefinitionError> {
        validate_name(name)?;
        for alias in &self.aliases {
            validate_name(alias)?;
        }

        let primitive = self.type_tag.primitive();
        if let Some(v) = self.validators.iter().find(|v| !v.supports(primitive)) {
            return Err(DefinitionError::IncompatibleValidator {
                validator: v.kind().to_string(),
                type_tag: self.type_tag.to_string(),
            });
        }

        if self.required && self.serialize_when != SerializeWhen::Always {
            return Err(DefinitionError::InvalidPolicy {
                attribute: name.to_string(),
                policy: self.serialize_when.to_string(),
            });
        }

        if let TypeTag::Map { item, key } = &self.type_tag {
            check_key_field(item, key)?;
        }

        let mut descriptor = AttributeDescriptor {
            name: name.to_string(),
            type_tag: self.type_tag,
            default: AttrValue::Null,
            required: self.required,
            validators: self.validators,
            serialize_when: self.serialize_when,
            aliases: self.aliases,
        };

        descriptor.default = if self.default.is_null() {
            implicit_default(&descriptor.type_tag)
        } else {
            descriptor
                .check(self.default)
                .map_err(|e| DefinitionError::InvalidDefault {
                    attribute: name.to_string(),
                    reason: e.to_string(),
                })?
        };

        Ok(descriptor)
    }
}

/// The default a container-typed attribute takes when none is declared.
fn implicit_default(tag: &TypeTag) -> AttrValue {
    match tag {
        TypeTag::List => AttrValue::List(Vec::new()),
        TypeTag::Dict => AttrValue::Dict(Default::default()),
        TypeTag::Index(ty) => AttrValue::Index(OrderedCollection::new(Arc::clone(ty))),
        TypeTag::Map { item, key } => {
            AttrValue::Map(KeyedCollection::unchecked(Arc::clone(item), key.clone()))
        }
        TypeTag::Object(ty) => Entity::empty(ty).map_or(AttrValue::Null, AttrValue::from),
        TypeTag::String | TypeTag::Integer | TypeTag::Boolean => AttrValue::Null,
    }
}

pub(crate) fn check_key_field(item: &EntityType, key: &str) -> Result<(), DefinitionError> {
    match item.attribute(key).map(AttributeDescriptor::type_tag) {
        Some(TypeTag::String) => Ok(()),
        _ => Err(DefinitionError::InvalidKeyField {
            entity: item.name().to_string(),
            key: key.to_string(),
        }),
    }
}

// ─── Descriptor ──────────────────────────────────────────────────────

/// The immutable contract of one entity field.
#[derive(Debug, Clone)]
pub struct AttributeDescriptor {
    name: String,
    type_tag: TypeTag,
    default: AttrValue,
    required: bool,
    validators: Vec<Validator>,
    serialize_when: SerializeWhen,
    aliases: Vec<String>,
}

impl AttributeDescriptor {
    /// Canonical field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    pub fn type_tag(&self) -> &TypeTag {
        &self.type_tag
    }

    /// A private copy of the default value.
    pub fn default_value(&self) -> AttrValue {
        self.default.clone()
    }

    /// Whether the field must be set.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Attached validators, in attachment order.
    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Serialization policy.
    pub fn serialize_when(&self) -> SerializeWhen {
        self.serialize_when
    }

    /// Alias names sharing this field's storage.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Coerce `value` into an owned value satisfying this contract.
    pub fn coerce(&self, value: impl Into<AttrValue>) -> Result<AttrValue, EntityError> {
        let value = value.into();
        if value.is_null() {
            return Ok(self.default.clone());
        }
        self.check(value)
    }

    // Type-check and validate a non-null value.
    fn check(&self, value: AttrValue) -> Result<AttrValue, EntityError> {
        let value = self.check_kind(value)?;
        for validator in &self.validators {
            validator.validate(&value)?;
        }
        Ok(value)
    }

    fn check_kind(&self, value: AttrValue) -> Result<AttrValue, EntityError> {
        match (&self.type_tag, value) {
            (TypeTag::String, v @ AttrValue::String(_))
            | (TypeTag::Integer, v @ AttrValue::Integer(_))
            | (TypeTag::Boolean, v @ AttrValue::Boolean(_))
            | (TypeTag::List, v @ AttrValue::List(_))
            | (TypeTag::Dict, v @ AttrValue::Dict(_)) => Ok(v),

            (TypeTag::Object(ty), AttrValue::Object(entity)) if entity.is_instance_of(ty) => {
                Ok(AttrValue::Object(entity))
            }
            (TypeTag::Object(ty), AttrValue::Dict(doc)) => {
                let entity = serialize::from_document(ty, &doc)?;
                Ok(AttrValue::from(entity))
            }

            (TypeTag::Index(ty), AttrValue::Index(coll)) if coll.item_type().is_a(ty) => {
                Ok(AttrValue::Index(coll))
            }
            (TypeTag::Index(ty), AttrValue::List(items)) => {
                let mut coll = OrderedCollection::new(Arc::clone(ty));
                coll.deserialize(&items)?;
                Ok(AttrValue::Index(coll))
            }

            (TypeTag::Map { item, key }, AttrValue::Map(coll))
                if coll.item_type().is_a(item) && coll.key_field() == key =>
            {
                Ok(AttrValue::Map(coll))
            }
            (TypeTag::Map { item, key }, AttrValue::Dict(doc)) => {
                let mut coll = KeyedCollection::unchecked(Arc::clone(item), key.clone());
                coll.deserialize(&doc)?;
                Ok(AttrValue::Map(coll))
            }

            (tag, other) => Err(EntityError::TypeMismatch {
                attribute: self.name.clone(),
                expected: tag.to_string(),
                actual: actual_kind(&other),
            }),
        }
    }
}

fn actual_kind(value: &AttrValue) -> String {
    match value {
        AttrValue::Object(entity) => format!("object<{}>", entity.type_name()),
        AttrValue::Index(coll) => format!("index<{}>", coll.item_type().name()),
        AttrValue::Map(coll) => format!("map<{}>", coll.item_type().name()),
        other => other.kind().to_string(),
    }
}

/// Render a document value for error messages.
pub(crate) fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
