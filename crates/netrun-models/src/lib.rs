//! # netrun-models — Static Automation Models
//!
//! The fixed entity types an automation run is made of, built on
//! `netrun-core`:
//!
//! - **Playbook** (`playbook.rs`): `Play`, `Task` and `Role`, plus the
//!   shared `Base` attributes. A playbook is an ordered collection of plays.
//! - **Inventory** (`inventory.rs`): `Host`, `Child` (host groups) and the
//!   `Inventory` root, serialized under the `all` group.
//! - **Modules** (`modules.rs`): `ImportRole` and its conversion to a task.
//! - **Formats** (`formats.rs`): normalizes port-configuration output.
//! - **Network operations** (`network.rs`): VLAN and port playbook builders
//!   and the [`NetworkRunner`] that hands them to an [`Engine`].
//!
//! Every type is registered once in a process-wide table reached through
//! [`models()`]. Containers check element types by identity, so entities
//! must be built from the shared table.

pub mod formats;
pub mod inventory;
pub mod modules;
pub mod network;
pub mod playbook;
pub mod registry;

/// Default host pattern and inventory root group.
pub const ALL: &str = "all";

pub use formats::{format_port_config, FormatError, PortConfig};
pub use inventory::NETWORK_OS_CHOICES;
pub use modules::{new_import_role, to_task, IMPORT_ROLE};
pub use network::{Engine, NetworkRunner, RunError, RunStatus, NETWORK_RUNNER};
pub use registry::{models, Models};
