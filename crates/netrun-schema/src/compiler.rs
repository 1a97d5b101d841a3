//! # Schema Compiler
//!
//! Turns a parsed [`SchemaSpecification`] into validators, synthesized
//! entity types and resolved actions.
//!
//! ## Order
//!
//! 1. Every declared name is checked against the reserved words. One hit
//!    rejects the whole specification before anything is built.
//! 2. Validators, from the fixed kind table.
//! 3. Models, in declaration order. Nested fields may only reference
//!    models declared earlier.
//! 4. Actions, whose parameters may reference any model.
//!
//! Synthesized types go through the same builder as the static models, so
//! they carry the same definition-time checks.

use std::sync::Arc;

use netrun_core::{
    AttrValue, Attribute, DefinitionError, Document, Entity, EntityType, Validator,
    DEFAULT_KEY_FIELD,
};
use serde_json::Value;
use tracing::info;

use crate::action::{Action, ParamType, Parameter};
use crate::config::CompilerConfig;
use crate::error::SchemaError;
use crate::spec::{ActionSpec, FieldSpec, OneOrMany, OrderedMap, ParamSpec, SchemaSpecification};

/// The compiled tables, in declaration order.
#[derive(Debug, Default)]
pub(crate) struct Compiled {
    pub(crate) validators: Vec<(String, Validator)>,
    pub(crate) models: Vec<(String, Arc<EntityType>)>,
    pub(crate) actions: Vec<Action>,
}

pub(crate) fn compile(
    spec: &SchemaSpecification,
    config: &CompilerConfig,
) -> Result<Compiled, SchemaError> {
    check_reserved(spec, config)?;

    let mut compiled = Compiled::default();
    for (name, validator) in spec.validators.iter() {
        let validator = compile_validator(name, &validator.kind, &validator.params)?;
        compiled.validators.push((name.to_string(), validator));
    }
    for (name, fields) in spec.models.iter() {
        let ty = compile_model(name, fields, &compiled)?;
        compiled.models.push((name.to_string(), ty));
    }
    for (name, action) in spec.actions.iter() {
        let action = compile_action(name, action, &compiled)?;
        compiled.actions.push(action);
    }

    info!(
        role = %config.role_name,
        validators = compiled.validators.len(),
        models = compiled.models.len(),
        actions = compiled.actions.len(),
        "schema compiled"
    );
    Ok(compiled)
}

// ─── Reserved Names ──────────────────────────────────────────────────

fn check_reserved(spec: &SchemaSpecification, config: &CompilerConfig) -> Result<(), SchemaError> {
    let reject = |name: &str, kind: &'static str| -> Result<(), SchemaError> {
        if config.is_reserved(name) {
            return Err(SchemaError::ReservedName {
                name: name.to_string(),
                kind,
            });
        }
        Ok(())
    };

    for name in spec.validators.keys() {
        reject(name, "validator")?;
    }
    for (name, fields) in spec.models.iter() {
        reject(name, "model")?;
        for (field, body) in fields.iter() {
            reject(field, "field")?;
            for alias in body.iter().flat_map(|b| &b.aliases) {
                reject(alias.as_str(), "alias")?;
            }
        }
    }
    for (name, action) in spec.actions.iter() {
        reject(name, "action")?;
        for param in action.args.keys() {
            reject(param, "parameter")?;
        }
    }
    Ok(())
}

// ─── Validators ──────────────────────────────────────────────────────

fn compile_validator(name: &str, kind: &str, params: &Document) -> Result<Validator, SchemaError> {
    let invalid = |reason: String| SchemaError::InvalidValidatorParams {
        validator: name.to_string(),
        reason,
    };

    match kind {
        "range" => {
            allow_params(params, &["minval", "maxval", "min", "max"]).map_err(invalid)?;
            let min = bound(params, "minval", "min").map_err(invalid)?;
            let max = bound(params, "maxval", "max").map_err(invalid)?;
            Validator::range(min, max).map_err(|e| invalid(e.to_string()))
        }
        "choice" => {
            allow_params(params, &["choices"]).map_err(invalid)?;
            let choices = match params.get("choices") {
                Some(Value::Array(items)) if !items.is_empty() => items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| invalid("choices must be strings".to_string()))?,
                Some(_) => return Err(invalid("choices must be a non-empty list".to_string())),
                None => return Err(invalid("missing parameter 'choices'".to_string())),
            };
            Ok(Validator::choice(choices))
        }
        "port" => {
            allow_params(params, &[]).map_err(invalid)?;
            Ok(Validator::port())
        }
        other => Err(SchemaError::UnknownValidatorKind {
            validator: name.to_string(),
            kind: other.to_string(),
        }),
    }
}

fn allow_params(params: &Document, allowed: &[&str]) -> Result<(), String> {
    match params.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(format!("unexpected parameter '{key}'")),
        None => Ok(()),
    }
}

fn bound(params: &Document, name: &str, alias: &str) -> Result<i64, String> {
    let value = match (params.get(name), params.get(alias)) {
        (Some(_), Some(_)) => return Err(format!("both '{name}' and '{alias}' given")),
        (Some(v), None) | (None, Some(v)) => v,
        (None, None) => return Err(format!("missing parameter '{name}'")),
    };
    value
        .as_i64()
        .ok_or_else(|| format!("'{name}' must be an integer, got {value}"))
}

fn resolve_validators(
    owner: &str,
    names: &OneOrMany,
    compiled: &Compiled,
) -> Result<Vec<Validator>, SchemaError> {
    names
        .as_slice()
        .iter()
        .map(|name| {
            compiled
                .validators
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| SchemaError::UnknownValidator {
                    owner: owner.to_string(),
                    validator: name.clone(),
                })
        })
        .collect()
}

fn resolve_model(compiled: &Compiled, name: &str) -> Result<Arc<EntityType>, SchemaError> {
    compiled
        .models
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, ty)| Arc::clone(ty))
        .ok_or_else(|| SchemaError::UnknownModel {
            name: name.to_string(),
        })
}

// ─── Models ──────────────────────────────────────────────────────────

fn compile_model(
    name: &str,
    fields: &OrderedMap<Option<FieldSpec>>,
    compiled: &Compiled,
) -> Result<Arc<EntityType>, SchemaError> {
    let mut builder = EntityType::builder(name);
    for (field, body) in fields.iter() {
        let owner = format!("{name}.{field}");
        let attribute = match body {
            Some(body) => compile_field(&owner, body, compiled)?,
            None => Attribute::string(),
        };
        builder = builder.attr(field, attribute);
    }
    Ok(builder.build()?)
}

fn compile_field(owner: &str, field: &FieldSpec, compiled: &Compiled) -> Result<Attribute, SchemaError> {
    let type_name = field.type_name.as_deref().unwrap_or("str");
    let element = || -> Result<Arc<EntityType>, SchemaError> {
        let model = field
            .model
            .as_deref()
            .ok_or_else(|| SchemaError::MissingModelReference {
                owner: owner.to_string(),
                type_name: type_name.to_string(),
            })?;
        resolve_model(compiled, model)
    };

    let mut attribute = match type_name {
        "str" => Attribute::string(),
        "int" => Attribute::integer(),
        "bool" => Attribute::boolean(),
        "list" => Attribute::list(),
        "dict" => Attribute::dict(),
        "object" => Attribute::object(&element()?),
        "index" => Attribute::index(&element()?),
        "map" => Attribute::map_keyed(
            &element()?,
            field.key.as_deref().unwrap_or(DEFAULT_KEY_FIELD),
        ),
        other => {
            return Err(SchemaError::UnknownAttributeType {
                owner: owner.to_string(),
                type_name: other.to_string(),
            })
        }
    };

    if let Some(default) = &field.default {
        attribute = attribute.default(default.clone());
    }
    if field.required {
        attribute = attribute.required();
    }
    for alias in &field.aliases {
        attribute = attribute.alias(alias.as_str());
    }
    Ok(attribute
        .validators(resolve_validators(owner, &field.validators, compiled)?)
        .serialize_when(field.serialize_when))
}

// ─── Actions ─────────────────────────────────────────────────────────

fn compile_action(name: &str, spec: &ActionSpec, compiled: &Compiled) -> Result<Action, SchemaError> {
    let params = spec
        .args
        .iter()
        .map(|(param, body)| {
            let body = body.clone().unwrap_or_default();
            compile_param(name, param, &body, compiled)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Action {
        name: name.to_string(),
        params,
        vars: spec.vars.clone().unwrap_or_default(),
        tasks_from: spec.tasks_from.clone(),
    })
}

fn compile_param(
    action: &str,
    name: &str,
    spec: &ParamSpec,
    compiled: &Compiled,
) -> Result<Parameter, SchemaError> {
    let owner = format!("{action}.{name}");
    let kind = match spec.type_name.as_deref().unwrap_or("str") {
        "str" => ParamType::Str,
        "int" => ParamType::Int,
        "bool" => ParamType::Bool,
        "list" => ParamType::List,
        "dict" => ParamType::Dict,
        model => match resolve_model(compiled, model) {
            Ok(ty) => ParamType::Model {
                name: model.to_string(),
                ty,
            },
            Err(_) => {
                return Err(SchemaError::UnknownAttributeType {
                    owner,
                    type_name: model.to_string(),
                })
            }
        },
    };

    let validators = resolve_validators(&owner, &spec.validators, compiled)?;
    let primitive = kind.primitive();
    if let Some(v) = validators.iter().find(|v| !v.supports(primitive)) {
        return Err(DefinitionError::IncompatibleValidator {
            validator: v.kind().to_string(),
            type_tag: kind.to_string(),
        }
        .into());
    }

    let mut param = Parameter {
        name: name.to_string(),
        kind,
        required: spec.required,
        default: None,
        validators,
    };
    if let Some(default) = spec.default.as_ref().filter(|d| !d.is_null()) {
        let value = default_value(&param, default)?;
        param.default = Some(param.check(action, value).map_err(|e| {
            DefinitionError::InvalidDefault {
                attribute: owner.clone(),
                reason: e.to_string(),
            }
        })?);
    }
    Ok(param)
}

// A model-typed default is written as the model's document.
fn default_value(param: &Parameter, default: &Value) -> Result<AttrValue, SchemaError> {
    match (&param.kind, default) {
        (ParamType::Model { ty, .. }, Value::Object(_)) => Ok(Entity::from_document(ty, default)
            .map(AttrValue::from)
            .map_err(|e| DefinitionError::InvalidDefault {
                attribute: param.name.clone(),
                reason: e.to_string(),
            })?),
        _ => Ok(AttrValue::from(default)),
    }
}
