//! # netrun-schema — Runtime Schema Compiler
//!
//! Compiles a role's declarative bindings into entity types and
//! task-producing actions at runtime.
//!
//! - **Specification** (`spec.rs`): the YAML/JSON document format, parsed
//!   with declaration order kept.
//! - **Compiler** (`compiler.rs`): validator kinds, model synthesis and
//!   parameter resolution. Any error rejects the whole load.
//! - **Actions** (`action.rs`): argument checking and coercion, rendering
//!   an `import_role` task.
//! - **Bindings** (`bindings.rs`): the immutable compiled table.
//! - **Configuration** (`config.rs`): role name, task action and extra
//!   reserved words.
//!
//! ## Error Kinds
//!
//! Load-time failures (`Parse`, `UnknownValidatorKind`, `ReservedName`,
//! ...) produce no bindings. Invocation failures (`UnknownAction`,
//! `UnknownArgument`, `MissingRequiredArgument`, `ArgumentType`,
//! `InvalidArgument`) reject one call. See [`SchemaError`].

pub mod action;
pub mod bindings;
mod compiler;
pub mod config;
pub mod error;
pub mod spec;

pub use action::{Action, ParamType, Parameter};
pub use bindings::{Bindings, BINDINGS_FILES};
pub use config::{normalize_identifier, CompilerConfig, DEFAULT_ROLE_NAME, DEFAULT_TASK_ACTION};
pub use error::SchemaError;
pub use spec::{
    ActionSpec, FieldSpec, OneOrMany, OrderedMap, ParamSpec, SchemaSpecification, ValidatorSpec,
};
