//! # VLAN Walkthrough
//!
//! One switch, one play, three tasks:
//!
//! ```text
//! create_vlan vlan_id=10 vlan_name=web
//! create_vlan vlan_id=20 vlan_name=db
//! delete_vlan vlan_id=10
//! ```
//!
//! Every task comes from the compiled bindings, so argument checking and
//! the `import_role` rendering are the role's own.

use anyhow::Context;
use netrun_core::{AttrValue, Entity, EntityError};
use netrun_models::{models, NetworkRunner};
use netrun_schema::{Bindings, CompilerConfig, SchemaError};
use serde_json::{json, Value};
use tracing::info;

use crate::engine::DryRun;

/// Bindings of the bundled `network-runner` role.
pub const BUNDLED_BINDINGS: &str = include_str!("../roles/network-runner/bindings.yaml");

/// Compile [`BUNDLED_BINDINGS`].
pub fn bundled_bindings() -> Result<Bindings, SchemaError> {
    Bindings::from_yaml_str(BUNDLED_BINDINGS, CompilerConfig::default())
}

/// The walkthrough's Arista switch.
pub fn veos01() -> Result<Entity, EntityError> {
    let m = models()?;
    Entity::new(
        m.host(),
        [
            ("name", AttrValue::from("veos01")),
            ("ansible_host", AttrValue::from("192.168.86.64")),
            ("ansible_user", AttrValue::from("admin")),
            ("ansible_password", AttrValue::from("admin")),
            ("ansible_network_os", AttrValue::from("eos")),
            ("ansible_connection", AttrValue::from("network_cli")),
            ("ansible_become", AttrValue::from(true)),
            ("ansible_become_method", AttrValue::from("enable")),
        ],
    )
}

/// Run the walkthrough and return the documents the engine received.
pub fn run() -> anyhow::Result<Value> {
    let role = bundled_bindings().context("compiling bundled network-runner bindings")?;
    let m = models()?;

    let mut inventory = m.new_inventory()?;
    inventory.map_mut("hosts")?.add(veos01()?)?;

    let mut playbook = m.playbook();
    let play = playbook.create([("gather_facts", false)])?;
    let tasks = play.index_mut("tasks")?;
    for (vlan_id, vlan_name) in [(10, "web"), (20, "db")] {
        let task = role.invoke(
            "create_vlan",
            [
                ("vlan_id", AttrValue::from(vlan_id)),
                ("vlan_name", AttrValue::from(vlan_name)),
            ],
        )?;
        tasks.append(task)?;
    }
    tasks.append(role.invoke("delete_vlan", [("vlan_id", 10)])?)?;

    let vlan = role.new_model("vlan", [("vlan_id", 30)])?;

    let mut runner = NetworkRunner::with_inventory(DryRun::default(), inventory)?;
    let status = runner.run(&playbook)?;
    info!(role = role.role(), status = %status.status, "walkthrough finished");

    let engine = runner.engine();
    Ok(json!({
        "bindings": role.name(),
        "status": status.status,
        "inventory": engine.inventory,
        "playbook": engine.playbooks.first(),
        "models": {"vlan": vlan.serialize()},
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_bindings_declare_network_operations() {
        let role = bundled_bindings().unwrap();
        assert_eq!(role.name(), "network_runner");
        assert_eq!(
            role.action_names().collect::<Vec<_>>(),
            ["create_vlan", "delete_vlan", "conf_access_port", "conf_trunk_port", "delete_port"]
        );
        assert_eq!(
            role.action("conf_trunk_port").unwrap().param("trunked_vlans").unwrap().default_value(),
            Some(&json!([]))
        );
    }

    #[test]
    fn test_bundled_port_actions() {
        let role = bundled_bindings().unwrap();
        let task = role
            .invoke("conf_trunk_port", [("port_name", json!("Ethernet2")), ("vlan_id", json!("1"))])
            .unwrap();
        assert_eq!(
            task.get_dict("vars").unwrap(),
            json!({"port_name": "Ethernet2", "vlan_id": 1, "trunked_vlans": []})
                .as_object()
                .unwrap()
        );
        assert!(matches!(
            role.invoke("delete_port", Vec::<(&str, Value)>::new()),
            Err(SchemaError::MissingRequiredArgument { ref argument, .. }) if argument == "port_name"
        ));
    }

    #[test]
    fn test_walkthrough_documents() {
        let out = run().unwrap();
        assert_eq!(out["bindings"], json!("network_runner"));
        assert_eq!(out["status"], json!("dry-run"));
        assert_eq!(
            out["inventory"]["all"]["hosts"]["veos01"],
            json!({
                "ansible_host": "192.168.86.64",
                "ansible_user": "admin",
                "ansible_password": "admin",
                "ansible_network_os": "eos",
                "ansible_connection": "network_cli",
                "ansible_become": true,
                "ansible_become_method": "enable",
            })
        );

        let play = &out["playbook"][0];
        assert_eq!(play["hosts"], json!("all"));
        assert_eq!(play["gather_facts"], json!(false));
        let tasks = play["tasks"].as_array().unwrap();
        assert_eq!(tasks.len(), 3);
        assert_eq!(
            tasks[0],
            json!({
                "action": "import_role",
                "args": {"name": "network-runner", "tasks_from": "create_vlan"},
                "vars": {"vlan_id": 10, "vlan_name": "web"},
            })
        );
        assert_eq!(tasks[2]["args"]["tasks_from"], json!("delete_vlan"));
        assert_eq!(out["models"]["vlan"], json!({"vlan_id": 30}));
    }
}
