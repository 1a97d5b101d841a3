//! # netrun-demo — VLAN Walkthrough
//!
//! Compiles the bundled `network-runner` bindings, registers one switch,
//! queues VLAN tasks produced by the role's actions and hands the result
//! to a [`DryRun`](engine::DryRun) engine.
//!
//! - `engine.rs`: the recording engine
//! - `walkthrough.rs`: the scripted session
//!
//! Logging is set up in `main.rs` only.

pub mod engine;
pub mod walkthrough;
