//! # Module Wrappers
//!
//! Typed front ends for engine modules that tasks invoke. `ImportRole`
//! describes an `import_role` call and renders it as a [`Task`](crate::Models::task).

use std::sync::Arc;

use netrun_core::{
    Attribute, AttrValue, DefinitionError, Document, Entity, EntityError, EntityType,
    SerializeWhen,
};
use serde_json::Value;

use crate::models;

/// Engine action that imports a role's task file.
pub const IMPORT_ROLE: &str = "import_role";

pub(crate) fn import_role() -> Result<Arc<EntityType>, DefinitionError> {
    EntityType::builder("ImportRole")
        .attr("name", Attribute::string().required())
        .attr(
            "tasks_from",
            Attribute::string().serialize_when(SerializeWhen::Present),
        )
        .build()
}

/// Build an `ImportRole` entity.
pub fn new_import_role(name: &str, tasks_from: Option<&str>) -> Result<Entity, EntityError> {
    let m = models()?;
    Entity::new(
        m.import_role(),
        [
            ("name", AttrValue::from(name)),
            ("tasks_from", AttrValue::from(tasks_from)),
        ],
    )
}

/// Render an `ImportRole` entity as a task running [`IMPORT_ROLE`].
///
/// The task's `args` carry the role name and, when set, `tasks_from`.
pub fn to_task(import_role: &Entity) -> Result<Entity, EntityError> {
    let m = models()?;
    if !import_role.is_instance_of(m.import_role()) {
        return Err(EntityError::TypeMismatch {
            attribute: "import_role".to_string(),
            expected: m.import_role().name().to_string(),
            actual: import_role.type_name().to_string(),
        });
    }

    let mut args = Document::new();
    if let Some(name) = import_role.get_str("name")? {
        args.insert("name".to_string(), Value::String(name.to_string()));
    }
    if let Some(tasks_from) = import_role.get_str("tasks_from")? {
        args.insert("tasks_from".to_string(), Value::String(tasks_from.to_string()));
    }

    Entity::new(
        m.task(),
        [
            ("action", AttrValue::from(IMPORT_ROLE)),
            ("args", AttrValue::from(args)),
        ],
    )
}
