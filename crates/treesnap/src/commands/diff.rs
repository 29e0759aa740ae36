//! Diff command.

use treesnap_snapshot::config::MAX_CONTEXT_LINES;
use treesnap_snapshot::{DiffMode, DiffSummary, SnapshotConfig, SnapshotId, SnapshotService};

pub async fn handle_diff(
    config: SnapshotConfig,
    id: &str,
    context: Option<usize>,
    all: bool,
) -> anyhow::Result<()> {
    let mut options = config.diff_options();
    if let Some(context) = context {
        if context > MAX_CONTEXT_LINES {
            anyhow::bail!("--context must be at most {MAX_CONTEXT_LINES}");
        }
        options.context_lines = context;
    }
    if all {
        options.mode = DiffMode::Bidirectional;
    }

    let service = SnapshotService::new(config).await?;
    let lines = service.diff_with(&SnapshotId::from(id), options).await?;

    if lines.is_empty() {
        println!("No differences.");
        return Ok(());
    }

    for line in &lines {
        println!("{line}");
    }
    println!();
    println!("{}", DiffSummary::from_lines(&lines));
    Ok(())
}
