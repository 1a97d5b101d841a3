//! # netrun-core — Declarative Entity Framework
//!
//! Typed, validated entities that serialize to the plain documents an
//! external automation engine consumes (playbooks, inventories). Every other
//! crate in the workspace depends on `netrun-core`; it depends on nothing
//! internal.
//!
//! ## Building Blocks
//!
//! 1. **Attribute descriptors.** One immutable contract per field: type,
//!    default, required flag, validators, serialization policy, aliases.
//!    Malformed contracts are rejected when the type is defined, never when
//!    an entity is used.
//!
//! 2. **Entity types.** Named, ordered descriptor sets built explicitly
//!    through [`EntityType::builder`], with single inheritance by
//!    composition, open (catch-all) or closed key handling, and an optional
//!    document envelope.
//!
//! 3. **Typed containers.** [`OrderedCollection`] and [`KeyedCollection`]
//!    hold entities of exactly one type.
//!
//! 4. **Serialization.** Entities map to insertion-ordered
//!    `serde_json::Map` documents and back. Equality and hashing are defined
//!    over those documents.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - Entity types are immutable after `build()` and shared through `Arc`.

pub mod attribute;
pub mod container;
pub mod entity;
pub mod error;
pub mod naming;
pub mod serialize;
pub mod validators;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use attribute::{Attribute, AttributeDescriptor, SerializeWhen, DEFAULT_KEY_FIELD};
pub use container::{KeyedCollection, OrderedCollection};
pub use entity::{CatchAllMode, Entity, EntityType, EntityTypeBuilder};
pub use error::{DefinitionError, EntityError, ValidationError};
pub use naming::{is_reserved, validate_name, RESERVED_WORDS};
pub use validators::{ChoiceValidator, RangeValidator, Validator};
pub use value::{AttrValue, Document, Primitive, TypeTag};
