//! # Schema Compiler Errors
//!
//! Load-time errors reject the whole specification: no bindings are
//! produced. Invocation-time errors reject a single action call and leave
//! the bindings untouched.

use netrun_core::{DefinitionError, EntityError, ValidationError};
use thiserror::Error;

/// Errors raised while loading, compiling, or invoking role bindings.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The specification text is not valid YAML or JSON, or has the wrong shape.
    #[error("cannot parse specification '{source_name}': {reason}")]
    Parse {
        /// File path or `<string>`.
        source_name: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The specification file could not be read.
    #[error("cannot read '{path}': {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A role directory has no `bindings.yaml` or `bindings.yml`.
    #[error("role bindings not found in '{path}'")]
    BindingsNotFound {
        /// Role directory searched.
        path: String,
    },

    /// A validator declares a `type` outside the validator-kind table.
    #[error("validator '{validator}' has unknown type '{kind}'")]
    UnknownValidatorKind {
        /// Validator name.
        validator: String,
        /// The unrecognized kind.
        kind: String,
    },

    /// A validator's parameters do not fit its kind.
    #[error("invalid parameters for validator '{validator}': {reason}")]
    InvalidValidatorParams {
        /// Validator name.
        validator: String,
        /// What was wrong.
        reason: String,
    },

    /// A field or parameter references a validator that is not declared.
    #[error("'{owner}' references unknown validator '{validator}'")]
    UnknownValidator {
        /// `model.field` or `action.parameter`.
        owner: String,
        /// The missing validator name.
        validator: String,
    },

    /// A field or parameter declares a type outside the type table.
    #[error("'{owner}' has unknown type '{type_name}'")]
    UnknownAttributeType {
        /// `model.field` or `action.parameter`.
        owner: String,
        /// The unrecognized type.
        type_name: String,
    },

    /// A model name is not declared (or not declared early enough).
    #[error("unknown model '{name}'")]
    UnknownModel {
        /// The missing model name.
        name: String,
    },

    /// An `object`, `index` or `map` field does not name its element model.
    #[error("field '{owner}' of type '{type_name}' must name a model")]
    MissingModelReference {
        /// `model.field`.
        owner: String,
        /// The container type.
        type_name: String,
    },

    /// The action is not declared.
    #[error("unknown action '{name}'")]
    UnknownAction {
        /// The missing action name.
        name: String,
    },

    /// A declared name is a reserved word.
    #[error("'{name}' is a reserved word and cannot name a {kind}")]
    ReservedName {
        /// The offending name.
        name: String,
        /// What it was declared as (`action`, `model`, ...).
        kind: &'static str,
    },

    /// An invocation supplied an argument the action does not declare.
    #[error("action '{action}' got an unexpected argument '{argument}'")]
    UnknownArgument {
        /// Action name.
        action: String,
        /// The undeclared argument.
        argument: String,
    },

    /// A required argument without a default was not supplied.
    #[error("action '{action}' is missing required argument '{argument}'")]
    MissingRequiredArgument {
        /// Action name.
        action: String,
        /// The missing argument.
        argument: String,
    },

    /// An argument cannot be coerced to its declared type.
    #[error("argument '{argument}' of action '{action}' must be {expected}, got {actual}")]
    ArgumentType {
        /// Action name.
        action: String,
        /// Argument name.
        argument: String,
        /// Declared parameter type.
        expected: String,
        /// Kind of the rejected value.
        actual: String,
    },

    /// An argument failed one of its validators.
    #[error("argument '{argument}' of action '{action}' is invalid: {source}")]
    InvalidArgument {
        /// Action name.
        action: String,
        /// Argument name.
        argument: String,
        /// The validator failure.
        #[source]
        source: ValidationError,
    },

    /// A synthesized type or attribute was malformed.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// Building an entity failed.
    #[error(transparent)]
    Entity(#[from] EntityError),
}
