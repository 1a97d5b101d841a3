//! # Playbook Models
//!
//! Plays, tasks and roles as the automation engine reads them.
//!
//! ```text
//! Playbook = index<Play>
//! Play     = Base + name, hosts ("all"), gather_facts, roles: index<Role>, tasks: index<Task>
//! Task     = Base + name, action (required), args, vars, when
//! Role     = role (required) + free-form variables flattened beside it
//! ```
//!
//! `Task` and `Play` are closed: a document carrying an undeclared key,
//! such as a misspelled `module`, is rejected rather than silently dropped.

use std::sync::Arc;

use netrun_core::{Attribute, DefinitionError, EntityType, SerializeWhen};

/// Attributes shared by plays and tasks.
pub(crate) fn base() -> Result<Arc<EntityType>, DefinitionError> {
    EntityType::builder("Base")
        .attr(
            "connection",
            Attribute::string().serialize_when(SerializeWhen::Present),
        )
        .build()
}

pub(crate) fn task(base: &Arc<EntityType>) -> Result<Arc<EntityType>, DefinitionError> {
    EntityType::builder("Task")
        .extends(base)
        .attr("name", Attribute::string().serialize_when(SerializeWhen::Present))
        .attr("action", Attribute::string().required())
        .attr("args", Attribute::dict())
        .attr("vars", Attribute::dict().serialize_when(SerializeWhen::Present))
        .attr("when", Attribute::string().serialize_when(SerializeWhen::Present))
        .build()
}

pub(crate) fn role() -> Result<Arc<EntityType>, DefinitionError> {
    EntityType::builder("Role")
        .attr("role", Attribute::string().required())
        .attr("vars", Attribute::dict().serialize_when(SerializeWhen::Never))
        .open("vars")
        .build()
}

pub(crate) fn play(
    base: &Arc<EntityType>,
    role: &Arc<EntityType>,
    task: &Arc<EntityType>,
) -> Result<Arc<EntityType>, DefinitionError> {
    EntityType::builder("Play")
        .extends(base)
        .attr("name", Attribute::string().serialize_when(SerializeWhen::Present))
        .attr("hosts", Attribute::string().default(crate::ALL))
        .attr(
            "gather_facts",
            Attribute::boolean().serialize_when(SerializeWhen::Present),
        )
        .attr(
            "roles",
            Attribute::index(role).serialize_when(SerializeWhen::Present),
        )
        .attr(
            "tasks",
            Attribute::index(task).serialize_when(SerializeWhen::Present),
        )
        .build()
}
