//! # Role Bindings
//!
//! [`Bindings`] is the compiled, read-only table of a role's validators,
//! models and actions. It is `Send + Sync` and can be shared across
//! threads behind an `Arc`.
//!
//! ```ignore
//! let role = Bindings::from_role_dir("roles/network-runner", CompilerConfig::default())?;
//! let task = role.invoke("create_vlan", [("vlan_id", 37)])?;
//! ```

use std::path::Path;
use std::sync::Arc;

use netrun_core::{AttrValue, Entity, EntityType, Validator};

use crate::action::Action;
use crate::compiler::{compile, Compiled};
use crate::config::{normalize_identifier, CompilerConfig};
use crate::error::SchemaError;
use crate::spec::SchemaSpecification;

/// File names searched for in a role directory, in order.
pub const BINDINGS_FILES: [&str; 2] = ["bindings.yaml", "bindings.yml"];

/// Compiled bindings of one role.
#[derive(Debug)]
pub struct Bindings {
    name: String,
    role: String,
    task_action: String,
    validators: Vec<(String, Validator)>,
    models: Vec<(String, Arc<EntityType>)>,
    actions: Vec<Action>,
}

impl Bindings {
    /// Compile a parsed specification.
    pub fn compile(spec: &SchemaSpecification, config: CompilerConfig) -> Result<Self, SchemaError> {
        let Compiled {
            validators,
            models,
            actions,
        } = compile(spec, &config)?;
        Ok(Self {
            name: normalize_identifier(&config.role_name),
            role: config.role_name,
            task_action: config.task_action,
            validators,
            models,
            actions,
        })
    }

    pub fn from_yaml_str(text: &str, config: CompilerConfig) -> Result<Self, SchemaError> {
        Self::compile(&SchemaSpecification::from_yaml_str(text)?, config)
    }

    pub fn from_json_str(text: &str, config: CompilerConfig) -> Result<Self, SchemaError> {
        Self::compile(&SchemaSpecification::from_json_str(text)?, config)
    }

    /// Load and compile a specification file.
    pub fn from_path(path: impl AsRef<Path>, config: CompilerConfig) -> Result<Self, SchemaError> {
        Self::compile(&SchemaSpecification::from_path(path.as_ref())?, config)
    }

    /// Load `bindings.yaml` (or `bindings.yml`) from a role directory.
    ///
    /// When the configured role name is the default, the directory name
    /// is used instead.
    pub fn from_role_dir(
        dir: impl AsRef<Path>,
        mut config: CompilerConfig,
    ) -> Result<Self, SchemaError> {
        let dir = dir.as_ref();
        let path = BINDINGS_FILES
            .iter()
            .map(|file| dir.join(file))
            .find(|path| path.is_file())
            .ok_or_else(|| SchemaError::BindingsNotFound {
                path: dir.display().to_string(),
            })?;

        if config.role_name == crate::config::DEFAULT_ROLE_NAME {
            if let Some(dir_name) = dir.file_name().and_then(|n| n.to_str()) {
                config.role_name = dir_name.to_string();
            }
        }
        Self::from_path(path, config)
    }

    /// Identifier form of the role name (`network_runner`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role imported by produced tasks (`network-runner`).
    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn task_action(&self) -> &str {
        &self.task_action
    }

    /// Build an instance of a synthesized model.
    pub fn new_model<I, K, V>(&self, model: &str, fields: I) -> Result<Entity, SchemaError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttrValue>,
    {
        let ty = self.model(model).ok_or_else(|| SchemaError::UnknownModel {
            name: model.to_string(),
        })?;
        Ok(Entity::new(ty, fields)?)
    }

    pub fn model(&self, name: &str) -> Option<&Arc<EntityType>> {
        self.models.iter().find(|(n, _)| n == name).map(|(_, ty)| ty)
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|(n, _)| n.as_str())
    }

    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name() == name)
    }

    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(Action::name)
    }

    pub fn validator(&self, name: &str) -> Option<&Validator> {
        self.validators.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn validator_names(&self) -> impl Iterator<Item = &str> {
        self.validators.iter().map(|(n, _)| n.as_str())
    }

    /// Invoke an action, producing a `Task` that imports the role.
    pub fn invoke<I, K, V>(&self, action: &str, args: I) -> Result<Entity, SchemaError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttrValue>,
    {
        let compiled = self.action(action).ok_or_else(|| SchemaError::UnknownAction {
            name: action.to_string(),
        })?;
        compiled.invoke(&self.role, &self.task_action, args)
    }
}
