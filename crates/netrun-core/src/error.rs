//! # Error Types — Definition, Validation, and Entity Errors
//!
//! Every failure in the framework is surfaced immediately to the direct
//! caller as one of the enums below. All errors use `thiserror` for
//! derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Definition-time errors (`DefinitionError`) are raised while building
//!   attribute descriptors and entity types. They indicate a malformed
//!   model, never bad runtime data.
//! - Validator failures (`ValidationError`) carry the rejected value and
//!   the rule it violated.
//! - Runtime errors (`EntityError`) cover construction, mutation,
//!   collection and document handling. They wrap the two kinds above so a
//!   single `?` propagates any framework failure.

use thiserror::Error;

/// Errors raised while defining attributes and entity types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// A validator was attached to a type it cannot check.
    #[error("validator '{validator}' cannot be attached to attribute type '{type_tag}'")]
    IncompatibleValidator {
        /// Kind name of the validator (e.g. `range`).
        validator: String,
        /// Type tag of the attribute it was attached to.
        type_tag: String,
    },

    /// A declared default value does not satisfy the attribute's own contract.
    #[error("invalid default for attribute '{attribute}': {reason}")]
    InvalidDefault {
        /// Attribute name.
        attribute: String,
        /// Why the default was rejected.
        reason: String,
    },

    /// A range validator was given a lower bound above its upper bound.
    #[error("invalid range: min {min} is greater than max {max}")]
    InvalidRange {
        /// Declared lower bound.
        min: i64,
        /// Declared upper bound.
        max: i64,
    },

    /// A required attribute was given a serialization policy other than `always`.
    #[error("required attribute '{attribute}' must always be serialized (got '{policy}')")]
    InvalidPolicy {
        /// Attribute name.
        attribute: String,
        /// The rejected policy.
        policy: String,
    },

    /// A name collides with the reserved-word set.
    #[error("'{name}' is a reserved word")]
    ReservedName {
        /// The offending name.
        name: String,
    },

    /// A name does not start with an alphabetic character.
    #[error("invalid name '{name}': names must start with an alphabetic character")]
    InvalidName {
        /// The offending name.
        name: String,
    },

    /// A field or alias name is declared twice on the same type.
    #[error("entity type '{entity}' declares '{name}' more than once")]
    DuplicateAttribute {
        /// Entity type name.
        entity: String,
        /// The duplicated field or alias name.
        name: String,
    },

    /// A keyed collection names a key field the element type cannot provide.
    #[error("key field '{key}' is not a string attribute of '{entity}'")]
    InvalidKeyField {
        /// Element type name.
        entity: String,
        /// The requested key field.
        key: String,
    },

    /// The catch-all field of an open entity type is missing or not a mapping.
    #[error("catch-all field '{field}' is not a dict attribute of '{entity}'")]
    InvalidCatchAll {
        /// Entity type name.
        entity: String,
        /// The requested catch-all field.
        field: String,
    },
}

/// A value rejected by a validator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Value is not one of the permitted choices.
    #[error("invalid choice '{value}': expected one of [{}]", choices.join(", "))]
    InvalidChoice {
        /// The rejected value.
        value: String,
        /// The permitted choices, in declaration order.
        choices: Vec<String>,
    },

    /// Value is outside the permitted inclusive range.
    #[error("value {value} is outside the range [{min}, {max}]")]
    InvalidRange {
        /// The rejected value.
        value: i64,
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },
}

/// Errors raised while constructing, mutating, or (de)serializing entities.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    /// A required field is still unset after defaults were applied.
    #[error("missing required attribute '{attribute}' on '{entity}'")]
    MissingRequiredField {
        /// Entity type name.
        entity: String,
        /// Attribute name.
        attribute: String,
    },

    /// The name is not declared on the entity type.
    #[error("'{entity}' has no attribute '{attribute}'")]
    UnknownAttribute {
        /// Entity type name.
        entity: String,
        /// The undeclared name.
        attribute: String,
    },

    /// A value's kind does not match the declared type.
    #[error("type mismatch for '{attribute}': expected {expected}, got {actual}")]
    TypeMismatch {
        /// Attribute (or container) receiving the value.
        attribute: String,
        /// Declared type.
        expected: String,
        /// Kind of the rejected value.
        actual: String,
    },

    /// Required attributes cannot be deleted.
    #[error("required attribute '{attribute}' on '{entity}' cannot be deleted")]
    RequiredFieldImmutable {
        /// Entity type name.
        entity: String,
        /// Attribute name.
        attribute: String,
    },

    /// A keyed collection already holds an entry under this key.
    #[error("an entry with key '{key}' already exists")]
    DuplicateKey {
        /// The duplicated key.
        key: String,
    },

    /// The key field of a keyed-collection element is unset.
    #[error("missing key attribute '{field}' for '{entity}'")]
    MissingKey {
        /// Element type name.
        entity: String,
        /// Key field name.
        field: String,
    },

    /// A document key has no corresponding field on a closed entity type.
    #[error("unknown field '{field}' for closed entity '{entity}'")]
    UnknownField {
        /// Entity type name.
        entity: String,
        /// The unexpected document key.
        field: String,
    },

    /// A document does not have the shape the entity type requires.
    #[error("malformed document for '{entity}': {reason}")]
    MalformedDocument {
        /// Entity or container type name.
        entity: String,
        /// What was wrong with the document.
        reason: String,
    },

    /// Positional access past the end of an ordered collection.
    #[error("index {index} is out of range for a collection of {len} items")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Current collection length.
        len: usize,
    },

    /// A validator rejected the value.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A definition-time contract was violated.
    #[error("definition error: {0}")]
    Definition(#[from] DefinitionError),
}
