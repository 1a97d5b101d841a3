//! Process-wide table of the static model types.
//!
//! Built once on first use and read-only afterwards. Entity containers
//! check element types by identity, so every caller must obtain the types
//! from this table rather than building private copies.

use std::sync::{Arc, OnceLock};

use netrun_core::{DefinitionError, Entity, EntityError, EntityType, OrderedCollection};

use crate::{inventory, modules, playbook};

static MODELS: OnceLock<Models> = OnceLock::new();

/// The static model types.
#[derive(Debug)]
pub struct Models {
    base: Arc<EntityType>,
    task: Arc<EntityType>,
    role: Arc<EntityType>,
    play: Arc<EntityType>,
    host: Arc<EntityType>,
    child: Arc<EntityType>,
    inventory: Arc<EntityType>,
    import_role: Arc<EntityType>,
}

/// The shared model table, built on first call.
pub fn models() -> Result<&'static Models, DefinitionError> {
    if let Some(models) = MODELS.get() {
        return Ok(models);
    }
    let built = Models::build()?;
    Ok(MODELS.get_or_init(|| built))
}

impl Models {
    fn build() -> Result<Self, DefinitionError> {
        let base = playbook::base()?;
        let task = playbook::task(&base)?;
        let role = playbook::role()?;
        let play = playbook::play(&base, &role, &task)?;
        let host = inventory::host()?;
        let child = inventory::child(&host)?;
        let inventory = inventory::inventory(&host, &child)?;
        let import_role = modules::import_role()?;
        tracing::debug!("static model table built");
        Ok(Self {
            base,
            task,
            role,
            play,
            host,
            child,
            inventory,
            import_role,
        })
    }

    /// Attributes shared by plays and tasks.
    pub fn base(&self) -> &Arc<EntityType> {
        &self.base
    }

    pub fn task(&self) -> &Arc<EntityType> {
        &self.task
    }

    pub fn role(&self) -> &Arc<EntityType> {
        &self.role
    }

    pub fn play(&self) -> &Arc<EntityType> {
        &self.play
    }

    pub fn host(&self) -> &Arc<EntityType> {
        &self.host
    }

    /// A group of hosts.
    pub fn child(&self) -> &Arc<EntityType> {
        &self.child
    }

    pub fn inventory(&self) -> &Arc<EntityType> {
        &self.inventory
    }

    pub fn import_role(&self) -> &Arc<EntityType> {
        &self.import_role
    }

    /// An empty playbook: an ordered collection of plays.
    pub fn playbook(&self) -> OrderedCollection {
        OrderedCollection::new(Arc::clone(&self.play))
    }

    /// An empty inventory.
    pub fn new_inventory(&self) -> Result<Entity, EntityError> {
        Entity::empty(&self.inventory)
    }
}
