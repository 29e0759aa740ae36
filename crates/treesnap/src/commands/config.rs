//! Configuration display.

use treesnap_snapshot::SnapshotConfig;

/// Print the effective configuration as JSON.
pub fn show_config(config: &SnapshotConfig) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
