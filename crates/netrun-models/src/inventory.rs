//! # Inventory Models
//!
//! Hosts, groups of hosts ("children") and the inventory root.
//!
//! Host variables the model does not declare (`ansible_connection`,
//! `ansible_become`, ...) are captured into `vars` and written back beside
//! the declared fields. Group variables stay under the group's `vars` key.
//! The inventory document is wrapped under the `all` root group.

use std::sync::Arc;

use netrun_core::{Attribute, DefinitionError, EntityType, SerializeWhen, Validator};

/// Network operating systems the bundled role supports.
pub const NETWORK_OS_CHOICES: [&str; 6] =
    ["cumulus", "dellos10", "eos", "junos", "nxos", "openvswitch"];

fn present_string() -> Attribute {
    Attribute::string().serialize_when(SerializeWhen::Present)
}

pub(crate) fn host() -> Result<Arc<EntityType>, DefinitionError> {
    EntityType::builder("Host")
        .attr("name", present_string())
        .attr("ansible_host", present_string())
        .attr("ansible_user", present_string())
        .attr("ansible_password", present_string().alias("ansible_ssh_pass"))
        .attr(
            "ansible_network_os",
            present_string().validator(Validator::choice(NETWORK_OS_CHOICES)),
        )
        .attr("vars", Attribute::dict().serialize_when(SerializeWhen::Never))
        .open("vars")
        .build()
}

pub(crate) fn child(host: &Arc<EntityType>) -> Result<Arc<EntityType>, DefinitionError> {
    EntityType::builder("Child")
        .attr("name", present_string())
        .attr("hosts", Attribute::map(host))
        .attr("vars", Attribute::dict())
        .open_nested("vars")
        .build()
}

pub(crate) fn inventory(
    host: &Arc<EntityType>,
    child: &Arc<EntityType>,
) -> Result<Arc<EntityType>, DefinitionError> {
    EntityType::builder("Inventory")
        .attr("hosts", Attribute::map(host))
        .attr("children", Attribute::map(child))
        .attr("vars", Attribute::dict())
        .envelope(crate::ALL)
        .build()
}
