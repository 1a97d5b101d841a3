//! Engine that captures the documents it is handed instead of running them.

use std::convert::Infallible;

use netrun_core::Document;
use netrun_models::{Engine, RunStatus};
use serde_json::Value;

/// Status a [`DryRun`] reports.
pub const DRY_RUN_STATUS: &str = "dry-run";

/// Records every playbook and the inventory of the last run.
#[derive(Debug, Default)]
pub struct DryRun {
    pub playbooks: Vec<Vec<Value>>,
    pub inventory: Document,
}

impl Engine for DryRun {
    type Error = Infallible;

    fn run(&mut self, playbook: &[Value], inventory: &Document) -> Result<RunStatus, Infallible> {
        self.playbooks.push(playbook.to_vec());
        self.inventory = inventory.clone();
        Ok(RunStatus {
            status: DRY_RUN_STATUS.to_string(),
            ..RunStatus::default()
        })
    }
}
