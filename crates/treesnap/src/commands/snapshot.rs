//! Snapshot lifecycle commands: create, list, show and restore.

use treesnap_snapshot::{Snapshot, SnapshotConfig, SnapshotId, SnapshotService};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub async fn handle_create(
    config: SnapshotConfig,
    message: &str,
    author: Option<&str>,
) -> anyhow::Result<()> {
    let service = SnapshotService::new(config).await?;
    let snapshot = service.create(message, author).await?;

    println!(
        "Created snapshot {} ({} files)",
        snapshot.id,
        snapshot.files.len()
    );
    Ok(())
}

pub async fn handle_list(config: SnapshotConfig, json: bool) -> anyhow::Result<()> {
    let service = SnapshotService::new(config).await?;
    let snapshots = service.list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
        return Ok(());
    }

    if snapshots.is_empty() {
        println!("No snapshots found.");
        return Ok(());
    }

    println!(
        "{:<9} {:<20} {:<16} {:>6}  {}",
        "ID", "TIMESTAMP", "USER", "FILES", "MESSAGE"
    );
    println!("{}", "-".repeat(78));
    for snapshot in &snapshots {
        println!(
            "{:<9} {:<20} {:<16} {:>6}  {}",
            snapshot.id,
            snapshot.timestamp.format(TIME_FORMAT),
            truncate(&snapshot.author, 16),
            snapshot.files.len(),
            first_line(&snapshot.message)
        );
    }
    Ok(())
}

pub async fn handle_show(config: SnapshotConfig, id: &str) -> anyhow::Result<()> {
    let service = SnapshotService::new(config).await?;
    let snapshot = service.get(&SnapshotId::from(id)).await?;
    print_snapshot(&snapshot);
    Ok(())
}

pub async fn handle_restore(config: SnapshotConfig, id: &str) -> anyhow::Result<()> {
    let service = SnapshotService::new(config).await?;
    let snapshot = service.restore(&SnapshotId::from(id)).await?;

    println!(
        "Restored snapshot {} ({} files) into {}",
        snapshot.id,
        snapshot.files.len(),
        service.config().working_tree.display()
    );
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    println!("Snapshot: {}", snapshot.id);
    println!("Created: {}", snapshot.timestamp.format(TIME_FORMAT));
    println!("User: {}", snapshot.author);
    println!("Message: {}", snapshot.message);
    println!("Stored at: {}", snapshot.storage_path.display());
    println!("Files ({}):", snapshot.files.len());
    for file in &snapshot.files {
        println!("  {file}");
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_names() {
        assert_eq!(truncate("alice", 16), "alice");
    }

    #[test]
    fn truncate_shortens_long_names() {
        assert_eq!(truncate("a-very-long-user-name", 10), "a-very-...");
    }

    #[test]
    fn first_line_of_multiline_message() {
        assert_eq!(first_line("summary\n\ndetails"), "summary");
        assert_eq!(first_line(""), "");
    }
}
