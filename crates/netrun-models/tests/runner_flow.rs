//! # Runner Flow
//!
//! Drives a [`NetworkRunner`] through the full VLAN lifecycle against an
//! in-memory engine and checks the documents the engine receives.

use std::convert::Infallible;

use netrun_core::{AttrValue, Document, Entity};
use netrun_models::{models, Engine, NetworkRunner, RunStatus};
use serde_json::{json, Value};

#[derive(Default)]
struct Journal {
    runs: Vec<Vec<Value>>,
}

impl Engine for Journal {
    type Error = Infallible;

    fn run(&mut self, playbook: &[Value], inventory: &Document) -> Result<RunStatus, Infallible> {
        assert!(inventory.contains_key("all"));
        self.runs.push(playbook.to_vec());
        Ok(RunStatus {
            status: "successful".into(),
            ..RunStatus::default()
        })
    }
}

fn veos01() -> Entity {
    let m = models().expect("models");
    Entity::new(
        m.host(),
        [
            ("name", AttrValue::from("veos01")),
            ("ansible_host", AttrValue::from("192.168.86.64")),
            ("ansible_network_os", AttrValue::from("eos")),
            ("ansible_become_method", AttrValue::from("enable")),
        ],
    )
    .expect("host")
}

#[test]
fn vlan_and_port_lifecycle() {
    let mut runner = NetworkRunner::new(Journal::default()).unwrap();
    runner.add_host(veos01()).unwrap();
    let none = Document::new();

    runner.create_vlan("veos01", 100, Some("web"), &none).unwrap();
    runner.conf_access_port("veos01", "Ethernet1", Some(100), &none).unwrap();
    runner
        .conf_trunk_port("veos01", "Ethernet2", None, &[100, 200], &none)
        .unwrap();
    runner.delete_port("veos01", "Ethernet1", &none).unwrap();
    runner.delete_vlan("veos01", 100, &none).unwrap();

    let task_files: Vec<&Value> = runner
        .engine()
        .runs
        .iter()
        .map(|plays| &plays[0]["tasks"][0]["args"]["tasks_from"])
        .collect();
    assert_eq!(
        task_files,
        [
            &json!("create_vlan"),
            &json!("conf_access_port"),
            &json!("conf_trunk_port"),
            &json!("delete_port"),
            &json!("delete_vlan"),
        ]
    );
}

#[test]
fn inventory_document_carries_host_variables() {
    let mut runner = NetworkRunner::new(Journal::default()).unwrap();
    runner.add_host(veos01()).unwrap();
    assert_eq!(
        Value::Object(runner.inventory().serialize()),
        json!({
            "all": {
                "hosts": {
                    "veos01": {
                        "ansible_host": "192.168.86.64",
                        "ansible_network_os": "eos",
                        "ansible_become_method": "enable",
                    }
                },
                "children": {},
                "vars": {},
            }
        })
    );
}

#[test]
fn runner_rejects_foreign_inventory() {
    let m = models().unwrap();
    let not_inventory = Entity::empty(m.play()).unwrap();
    assert!(NetworkRunner::with_inventory(Journal::default(), not_inventory).is_err());
}
