//! # netrun-demo Entry Point
//!
//! Runs the VLAN walkthrough and prints the captured documents as JSON.

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays a single JSON document.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = netrun_demo::walkthrough::run()?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
