//! # VLAN and Port Operations
//!
//! Builders for the one-play playbooks that drive the bundled
//! `network-runner` role, and [`NetworkRunner`], which pairs an inventory
//! with an [`Engine`] that executes them.
//!
//! ## Playbook Shape
//!
//! Every operation produces the same structure:
//!
//! ```text
//! - name: <operation title>
//!   hosts: <host>
//!   gather_facts: false
//!   tasks:
//!     - name: <operation title>
//!       action: import_role
//!       args: { name: network-runner, tasks_from: <operation> }
//!       vars: { <operation variables>, <extra variables> }
//! ```
//!
//! Extra variables are merged last and override the operation's own.
//!
//! ## Engine Seam
//!
//! No engine ships with this crate. An [`Engine`] receives the serialized
//! playbook and inventory documents and reports a [`RunStatus`]. A run
//! fails when the status is `failed` or any failure is reported.

use netrun_core::{AttrValue, Document, Entity, EntityError, OrderedCollection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::formats::{format_port_config, FormatError};
use crate::models;
use crate::modules::{new_import_role, to_task};

/// Role that implements the VLAN and port operations.
pub const NETWORK_RUNNER: &str = "network-runner";
/// Task file creating a VLAN.
pub const CREATE_VLAN: &str = "create_vlan";
/// Task file deleting a VLAN.
pub const DELETE_VLAN: &str = "delete_vlan";
/// Task file configuring an access port.
pub const CONF_ACCESS_PORT: &str = "conf_access_port";
/// Task file configuring a trunk port.
pub const CONF_TRUNK_PORT: &str = "conf_trunk_port";
/// Task file removing port configuration.
pub const DELETE_PORT: &str = "delete_port";

/// Status string an engine reports for a failed run.
pub const STATUS_FAILED: &str = "failed";

// ─── Playbook Builders ───────────────────────────────────────────────

fn vars<const N: usize>(pairs: [(&str, Value); N]) -> Document {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn single_task_playbook(
    title: &str,
    host: &str,
    tasks_from: &str,
    mut variables: Document,
    extra: &Document,
) -> Result<OrderedCollection, EntityError> {
    let m = models()?;
    for (key, value) in extra {
        variables.insert(key.clone(), value.clone());
    }

    let mut task = to_task(&new_import_role(NETWORK_RUNNER, Some(tasks_from))?)?;
    task.set("name", title)?;
    task.set("vars", variables)?;

    let mut playbook = m.playbook();
    let play = playbook.create([
        ("name", AttrValue::from(title)),
        ("hosts", AttrValue::from(host)),
        ("gather_facts", AttrValue::from(false)),
    ])?;
    play.index_mut("tasks")?.append(task)?;
    Ok(playbook)
}

/// Playbook creating VLAN `vlan_id` on `host`.
pub fn create_vlan(
    host: &str,
    vlan_id: i64,
    vlan_name: Option<&str>,
    extra: &Document,
) -> Result<OrderedCollection, EntityError> {
    let mut variables = vars([("vlan_id", Value::from(vlan_id))]);
    if let Some(name) = vlan_name {
        variables.insert("vlan_name".to_string(), Value::from(name));
    }
    single_task_playbook("Create VLAN", host, CREATE_VLAN, variables, extra)
}

/// Playbook deleting VLAN `vlan_id` from `host`.
pub fn delete_vlan(
    host: &str,
    vlan_id: i64,
    extra: &Document,
) -> Result<OrderedCollection, EntityError> {
    let variables = vars([("vlan_id", Value::from(vlan_id))]);
    single_task_playbook("Delete VLAN", host, DELETE_VLAN, variables, extra)
}

/// Playbook placing `port` in access mode on `vlan_id`.
///
/// `None` leaves the VLAN choice to the role's per-platform default.
pub fn conf_access_port(
    host: &str,
    port: &str,
    vlan_id: Option<i64>,
    extra: &Document,
) -> Result<OrderedCollection, EntityError> {
    let variables = vars([
        ("vlan_id", vlan_id.map_or(Value::Null, Value::from)),
        ("port_name", Value::from(port)),
        ("port_description", Value::from(port)),
    ]);
    single_task_playbook(
        "Configure port in access mode",
        host,
        CONF_ACCESS_PORT,
        variables,
        extra,
    )
}

/// Playbook placing `port` in trunk mode with native VLAN `vlan_id` and
/// the additional `trunked_vlans`.
pub fn conf_trunk_port(
    host: &str,
    port: &str,
    vlan_id: Option<i64>,
    trunked_vlans: &[i64],
    extra: &Document,
) -> Result<OrderedCollection, EntityError> {
    let variables = vars([
        ("vlan_id", vlan_id.map_or(Value::Null, Value::from)),
        ("port_name", Value::from(port)),
        ("port_description", Value::from(port)),
        ("trunked_vlans", Value::from(trunked_vlans.to_vec())),
    ]);
    single_task_playbook(
        "Configure port in trunk mode",
        host,
        CONF_TRUNK_PORT,
        variables,
        extra,
    )
}

/// Playbook removing the configuration of `port`.
pub fn delete_port(
    host: &str,
    port: &str,
    extra: &Document,
) -> Result<OrderedCollection, EntityError> {
    let variables = vars([("port_name", Value::from(port))]);
    single_task_playbook("Delete port", host, DELETE_PORT, variables, extra)
}

// ─── Engine Seam ─────────────────────────────────────────────────────

/// Outcome reported by an [`Engine`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    /// Engine status string, e.g. `successful` or `failed`.
    pub status: String,
    /// Per-host failures reported by the engine.
    #[serde(default)]
    pub failures: Vec<String>,
    /// Captured engine output.
    #[serde(default)]
    pub stdout: Vec<String>,
}

impl RunStatus {
    /// Whether the run must be treated as failed.
    pub fn is_failed(&self) -> bool {
        self.status == STATUS_FAILED || !self.failures.is_empty()
    }

    /// Normalize the port configuration object in the captured output.
    ///
    /// Output lines are joined with newlines before parsing.
    pub fn port_config(&self, os: &str) -> Result<String, FormatError> {
        format_port_config(&self.stdout.join("\n"), os)
    }

    fn details(&self) -> String {
        if self.stdout.is_empty() {
            self.failures.join(" ")
        } else {
            self.stdout.join(" ")
        }
    }
}

/// Executes a serialized playbook against a serialized inventory.
pub trait Engine {
    /// Error raised when the engine itself cannot run.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run `playbook` (a list of play documents) against `inventory`.
    fn run(&mut self, playbook: &[Value], inventory: &Document) -> Result<RunStatus, Self::Error>;
}

/// Errors from [`NetworkRunner`].
#[derive(Error, Debug)]
pub enum RunError {
    /// The engine could not execute the playbook.
    #[error("engine error: {0}")]
    Engine(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The engine ran the playbook and reported failure.
    #[error("playbook run failed: {details}")]
    Failed {
        /// Engine output or failure list.
        details: String,
        /// The full status as reported.
        status: RunStatus,
    },

    /// A playbook or inventory could not be built.
    #[error(transparent)]
    Entity(#[from] EntityError),
}

impl From<netrun_core::DefinitionError> for RunError {
    fn from(err: netrun_core::DefinitionError) -> Self {
        Self::Entity(EntityError::from(err))
    }
}

// ─── Runner ──────────────────────────────────────────────────────────

/// An inventory bound to an engine.
#[derive(Debug)]
pub struct NetworkRunner<E> {
    engine: E,
    inventory: Entity,
}

impl<E: Engine> NetworkRunner<E> {
    /// A runner with an empty inventory.
    pub fn new(engine: E) -> Result<Self, RunError> {
        let inventory = models()?.new_inventory()?;
        Ok(Self { engine, inventory })
    }

    /// A runner over an existing inventory.
    pub fn with_inventory(engine: E, inventory: Entity) -> Result<Self, RunError> {
        let m = models()?;
        if !inventory.is_instance_of(m.inventory()) {
            return Err(EntityError::TypeMismatch {
                attribute: "inventory".to_string(),
                expected: m.inventory().name().to_string(),
                actual: inventory.type_name().to_string(),
            }
            .into());
        }
        Ok(Self { engine, inventory })
    }

    pub fn inventory(&self) -> &Entity {
        &self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut Entity {
        &mut self.inventory
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Add `host` to the inventory, replacing any host of the same name.
    pub fn add_host(&mut self, host: Entity) -> Result<(), RunError> {
        self.inventory.map_mut("hosts")?.add(host)?;
        Ok(())
    }

    /// Whether a host is known by inventory name or by `ansible_host`.
    pub fn has_host(&self, name: &str) -> Result<bool, RunError> {
        let hosts = self.inventory.get_map("hosts")?;
        if hosts.contains_key(name) {
            return Ok(true);
        }
        for (_, host) in hosts.iter() {
            if host.get_str("ansible_host")? == Some(name) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Run `playbook` against the inventory.
    pub fn run(&mut self, playbook: &OrderedCollection) -> Result<RunStatus, RunError> {
        let m = models()?;
        if !playbook.item_type().is_a(m.play()) {
            return Err(EntityError::TypeMismatch {
                attribute: "playbook".to_string(),
                expected: format!("index<{}>", m.play().name()),
                actual: format!("index<{}>", playbook.item_type().name()),
            }
            .into());
        }

        let plays = playbook.serialize();
        let inventory = self.inventory.serialize();
        tracing::info!(plays = plays.len(), "running playbook");

        let status = self
            .engine
            .run(&plays, &inventory)
            .map_err(|e| RunError::Engine(Box::new(e)))?;

        if status.is_failed() {
            tracing::warn!(
                status = %status.status,
                failures = status.failures.len(),
                "playbook run failed"
            );
            return Err(RunError::Failed {
                details: status.details(),
                status,
            });
        }
        tracing::debug!(status = %status.status, "playbook run finished");
        Ok(status)
    }

    /// Create VLAN `vlan_id` on `host`.
    pub fn create_vlan(
        &mut self,
        host: &str,
        vlan_id: i64,
        vlan_name: Option<&str>,
        extra: &Document,
    ) -> Result<RunStatus, RunError> {
        let playbook = create_vlan(host, vlan_id, vlan_name, extra)?;
        self.run(&playbook)
    }

    /// Delete VLAN `vlan_id` from `host`.
    pub fn delete_vlan(
        &mut self,
        host: &str,
        vlan_id: i64,
        extra: &Document,
    ) -> Result<RunStatus, RunError> {
        let playbook = delete_vlan(host, vlan_id, extra)?;
        self.run(&playbook)
    }

    /// Place `port` on `host` in access mode.
    pub fn conf_access_port(
        &mut self,
        host: &str,
        port: &str,
        vlan_id: Option<i64>,
        extra: &Document,
    ) -> Result<RunStatus, RunError> {
        let playbook = conf_access_port(host, port, vlan_id, extra)?;
        self.run(&playbook)
    }

    /// Place `port` on `host` in trunk mode.
    pub fn conf_trunk_port(
        &mut self,
        host: &str,
        port: &str,
        vlan_id: Option<i64>,
        trunked_vlans: &[i64],
        extra: &Document,
    ) -> Result<RunStatus, RunError> {
        let playbook = conf_trunk_port(host, port, vlan_id, trunked_vlans, extra)?;
        self.run(&playbook)
    }

    /// Remove the configuration of `port` on `host`.
    pub fn delete_port(
        &mut self,
        host: &str,
        port: &str,
        extra: &Document,
    ) -> Result<RunStatus, RunError> {
        let playbook = delete_port(host, port, extra)?;
        self.run(&playbook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default)]
    struct Recorder {
        reply: RunStatus,
        calls: Vec<(Vec<Value>, Document)>,
    }

    impl Engine for Recorder {
        type Error = std::io::Error;

        fn run(&mut self, playbook: &[Value], inventory: &Document) -> Result<RunStatus, Self::Error> {
            self.calls.push((playbook.to_vec(), inventory.clone()));
            Ok(self.reply.clone())
        }
    }

    struct Broken;

    impl Engine for Broken {
        type Error = std::io::Error;

        fn run(&mut self, _: &[Value], _: &Document) -> Result<RunStatus, Self::Error> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "engine not installed"))
        }
    }

    fn ok() -> Recorder {
        Recorder {
            reply: RunStatus {
                status: "successful".into(),
                ..RunStatus::default()
            },
            calls: Vec::new(),
        }
    }

    fn host(name: &str, address: Option<&str>) -> Entity {
        let m = models().unwrap();
        Entity::new(
            m.host(),
            [("name", AttrValue::from(name)), ("ansible_host", AttrValue::from(address))],
        )
        .unwrap()
    }

    #[test]
    fn test_create_vlan_playbook() {
        let playbook = create_vlan("sw1", 37, Some("storage"), &Document::new()).unwrap();
        assert_eq!(
            Value::Array(playbook.serialize()),
            json!([{
                "name": "Create VLAN",
                "hosts": "sw1",
                "gather_facts": false,
                "tasks": [{
                    "name": "Create VLAN",
                    "action": "import_role",
                    "args": {"name": "network-runner", "tasks_from": "create_vlan"},
                    "vars": {"vlan_id": 37, "vlan_name": "storage"},
                }],
            }])
        );
    }

    #[test]
    fn test_extra_vars_override() {
        let extra = vars([("vlan_id", json!(40)), ("stp_edge", json!(true))]);
        let playbook = conf_access_port("sw1", "eth1", Some(10), &extra).unwrap();
        let doc = Value::Array(playbook.serialize());
        assert_eq!(
            doc[0]["tasks"][0]["vars"],
            json!({
                "vlan_id": 40,
                "port_name": "eth1",
                "port_description": "eth1",
                "stp_edge": true,
            })
        );
    }

    #[test]
    fn test_access_port_without_vlan() {
        let playbook = conf_access_port("sw1", "eth1", None, &Document::new()).unwrap();
        let doc = Value::Array(playbook.serialize());
        assert_eq!(doc[0]["tasks"][0]["vars"]["vlan_id"], Value::Null);
        assert_eq!(doc[0]["tasks"][0]["args"]["tasks_from"], json!("conf_access_port"));
    }

    #[test]
    fn test_trunk_and_delete_port_variables() {
        let trunk = conf_trunk_port("sw1", "eth2", Some(1), &[10, 20], &Document::new()).unwrap();
        let doc = Value::Array(trunk.serialize());
        assert_eq!(doc[0]["name"], json!("Configure port in trunk mode"));
        assert_eq!(doc[0]["tasks"][0]["vars"]["trunked_vlans"], json!([10, 20]));

        let delete = delete_port("sw1", "eth2", &Document::new()).unwrap();
        let doc = Value::Array(delete.serialize());
        assert_eq!(doc[0]["tasks"][0]["vars"], json!({"port_name": "eth2"}));
        assert_eq!(doc[0]["tasks"][0]["args"]["tasks_from"], json!("delete_port"));
    }

    #[test]
    fn test_delete_vlan_playbook() {
        let playbook = delete_vlan("sw1", 37, &Document::new()).unwrap();
        let doc = Value::Array(playbook.serialize());
        assert_eq!(doc[0]["name"], json!("Delete VLAN"));
        assert_eq!(doc[0]["tasks"][0]["vars"], json!({"vlan_id": 37}));
    }

    #[test]
    fn test_add_and_find_hosts() {
        let mut runner = NetworkRunner::new(ok()).unwrap();
        assert!(!runner.has_host("test").unwrap());
        runner.add_host(host("test1", Some("test2"))).unwrap();
        assert!(runner.has_host("test1").unwrap());
        assert!(runner.has_host("test2").unwrap());
        assert!(!runner.has_host("test").unwrap());
    }

    #[test]
    fn test_run_passes_documents_to_engine() {
        let mut runner = NetworkRunner::new(ok()).unwrap();
        runner.add_host(host("sw1", None)).unwrap();
        let status = runner.create_vlan("sw1", 10, None, &Document::new()).unwrap();
        assert_eq!(status.status, "successful");

        let (plays, inventory) = &runner.engine().calls[0];
        assert_eq!(plays[0]["hosts"], json!("sw1"));
        assert_eq!(
            Value::Object(inventory.clone()),
            json!({"all": {"hosts": {"sw1": {}}, "children": {}, "vars": {}}})
        );
    }

    #[test]
    fn test_port_config_read_from_stdout() {
        let status = RunStatus {
            status: "successful".into(),
            failures: Vec::new(),
            stdout: vec![
                r#"ok: [fos01] => {"stdout_lines": [["#.into(),
                r#""switchport mode access", "switchport access vlan 10"]]}"#.into(),
            ],
        };
        let out = status.port_config(crate::formats::FOS).unwrap();
        assert_eq!(
            out,
            r#"ok: [fos01] => {"mode":"access","vlan":10,"trunked_vlans":""}"#
        );
    }

    #[test]
    fn test_failed_status_is_an_error() {
        let mut engine = ok();
        engine.reply.status = STATUS_FAILED.into();
        engine.reply.stdout = vec!["fatal:".into(), "unreachable".into()];
        let mut runner = NetworkRunner::new(engine).unwrap();
        match runner.delete_vlan("sw1", 10, &Document::new()) {
            Err(RunError::Failed { details, .. }) => assert_eq!(details, "fatal: unreachable"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_reported_failures_are_an_error() {
        let mut engine = ok();
        engine.reply.failures = vec!["I got some failure".into()];
        let mut runner = NetworkRunner::new(engine).unwrap();
        let playbook = models().unwrap().playbook();
        assert!(matches!(runner.run(&playbook), Err(RunError::Failed { .. })));
    }

    #[test]
    fn test_engine_errors_propagate() {
        let mut runner = NetworkRunner::new(Broken).unwrap();
        let err = runner.delete_port("sw1", "eth1", &Document::new()).unwrap_err();
        assert!(matches!(err, RunError::Engine(_)));
        assert_eq!(err.to_string(), "engine error: engine not installed");
    }

    #[test]
    fn test_run_status_from_json() {
        let status: RunStatus = serde_json::from_value(json!({"status": "failed"})).unwrap();
        assert!(status.is_failed());
        assert!(status.failures.is_empty());
    }
}
