//! End-to-end tests for the snapshot service against real directories.

use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;
use treesnap_snapshot::{
    DiffLine, DiffMode, DiffOptions, DiffSummary, SnapshotConfig, SnapshotId, SnapshotService,
};
use treesnap_test_utils::assertions::{assert_file_equals, assert_trees_equal};
use treesnap_test_utils::read_tree;

struct Harness {
    dir: TempDir,
    service: SnapshotService,
}

impl Harness {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let service = SnapshotService::new(SnapshotConfig::for_data_dir(dir.path()))
            .await
            .unwrap();
        Self { dir, service }
    }

    fn write(&self, path: &str, contents: impl AsRef<[u8]>) {
        let full = self.service.config().working_tree.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, contents).unwrap();
    }

    fn remove(&self, path: &str) {
        std::fs::remove_file(self.service.config().working_tree.join(path)).unwrap();
    }

    fn working_tree(&self) -> &std::path::Path {
        &self.service.config().working_tree
    }
}

fn rendered(lines: &[DiffLine]) -> Vec<String> {
    lines.iter().map(ToString::to_string).collect()
}

#[tokio::test]
async fn appended_line_shows_as_single_addition() {
    let h = Harness::new().await;
    h.write("x.txt", "hello\n");
    let snapshot = h.service.create("init", Some("tester")).await.unwrap();

    h.write("x.txt", "hello\nworld\n");
    let lines = h.service.diff_against_current(&snapshot.id).await.unwrap();

    assert_eq!(
        rendered(&lines),
        vec![
            "--- snapshot/x.txt\n+++ current/x.txt",
            "@@ -1 +1,2 @@",
            " hello",
            "+world",
        ]
    );
}

#[tokio::test]
async fn deleted_file_shows_every_line_removed() {
    let h = Harness::new().await;
    h.write("gone.txt", "one\ntwo\n");
    let snapshot = h.service.create("before delete", None).await.unwrap();

    h.remove("gone.txt");
    let lines = h.service.diff_against_current(&snapshot.id).await.unwrap();

    assert_eq!(
        rendered(&lines),
        vec![
            "--- snapshot/gone.txt\n+++ current/gone.txt",
            "@@ -1,2 +0,0 @@",
            "-one",
            "-two",
        ]
    );
}

#[tokio::test]
async fn diff_is_empty_right_after_create() {
    let h = Harness::new().await;
    h.write("a.txt", "alpha\n");
    h.write("b/c.txt", "gamma\n");
    h.write("bin/blob", [0u8, 0xff, 0x10]);

    let snapshot = h.service.create("clean", None).await.unwrap();

    let lines = h.service.diff_against_current(&snapshot.id).await.unwrap();
    assert!(lines.is_empty(), "unexpected diff: {:?}", rendered(&lines));
    assert!(DiffSummary::from_lines(&lines).is_empty());
}

#[tokio::test]
async fn new_files_are_ignored_unless_bidirectional() {
    let h = Harness::new().await;
    h.write("a.txt", "alpha\n");
    let snapshot = h.service.create("base", None).await.unwrap();

    h.write("new.txt", "fresh\n");

    let one_way = h.service.diff_against_current(&snapshot.id).await.unwrap();
    assert!(one_way.is_empty());

    let both_ways = h
        .service
        .diff_with(
            &snapshot.id,
            DiffOptions {
                context_lines: 3,
                mode: DiffMode::Bidirectional,
            },
        )
        .await
        .unwrap();
    assert_eq!(
        rendered(&both_ways),
        vec![
            "--- snapshot/new.txt\n+++ current/new.txt",
            "@@ -0,0 +1 @@",
            "+fresh",
        ]
    );
}

#[tokio::test]
async fn changed_binary_file_is_marked() {
    let h = Harness::new().await;
    h.write("image.bin", [0xffu8, 0x00, 0x01]);
    let snapshot = h.service.create("binary", None).await.unwrap();

    h.write("image.bin", [0xffu8, 0x00, 0x02]);
    let lines = h.service.diff_against_current(&snapshot.id).await.unwrap();

    assert_eq!(
        lines,
        vec![DiffLine::BinaryFile {
            path: "image.bin".to_string()
        }]
    );
    assert_eq!(DiffSummary::from_lines(&lines).binary_files, 1);
}

#[tokio::test]
async fn restore_after_create_is_byte_identical() {
    let h = Harness::new().await;
    h.write("a.txt", "alpha\n");
    h.write("b/c.txt", "gamma\n");
    h.write("bin/blob", [0u8, 0xff, 0x10, 0x0a]);
    let before = read_tree(h.working_tree());

    let snapshot = h.service.create("full", None).await.unwrap();
    assert_trees_equal(&snapshot.storage_path, h.working_tree());

    h.write("a.txt", "changed\n");
    h.remove("b/c.txt");
    h.write("extra/new.txt", "should vanish\n");

    let restored = h.service.restore(&snapshot.id).await.unwrap();
    assert_eq!(restored.id, snapshot.id);

    assert_eq!(read_tree(h.working_tree()), before);
    assert!(!h.working_tree().join("extra").exists());
    assert_file_equals(&h.working_tree().join("a.txt"), "alpha\n");
}

#[tokio::test]
async fn restore_does_not_record_a_snapshot() {
    let h = Harness::new().await;
    h.write("a.txt", "alpha\n");
    let snapshot = h.service.create("only", None).await.unwrap();

    h.write("a.txt", "edited\n");
    h.service.restore(&snapshot.id).await.unwrap();

    assert_eq!(h.service.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn restore_unknown_id_leaves_tree_unchanged() {
    let h = Harness::new().await;
    h.write("a.txt", "alpha\n");
    let before = read_tree(h.working_tree());

    let err = h
        .service
        .restore(&SnapshotId::from("nope123"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(read_tree(h.working_tree()), before);
}

#[tokio::test]
async fn diff_unknown_id_is_not_found() {
    let h = Harness::new().await;
    let err = h
        .service
        .diff_against_current(&SnapshotId::from("nope123"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn snapshot_records_relative_file_list() {
    let h = Harness::new().await;
    h.write("a.txt", "a");
    h.write("b/c.txt", "c");
    std::fs::create_dir_all(h.working_tree().join("empty")).unwrap();

    let snapshot = h.service.create("files", None).await.unwrap();

    assert_eq!(snapshot.files, vec!["a.txt", "b/c.txt"]);
    assert!(snapshot.storage_path.join("empty").is_dir());
}

#[tokio::test]
async fn snapshot_ids_are_unique_and_stable() {
    let h = Harness::new().await;
    let mut ids = HashSet::new();
    for i in 0..10 {
        h.write("counter.txt", i.to_string());
        let snapshot = h.service.create(&format!("snap {}", i), None).await.unwrap();
        assert_eq!(snapshot.id.as_str().len(), 7);
        assert!(ids.insert(snapshot.id));
    }

    let listed: HashSet<SnapshotId> = h
        .service
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(listed, ids);
}

#[tokio::test]
async fn each_snapshot_keeps_its_own_copy() {
    let h = Harness::new().await;
    h.write("v.txt", "one\n");
    let first = h.service.create("one", None).await.unwrap();
    h.write("v.txt", "two\n");
    let second = h.service.create("two", None).await.unwrap();

    assert_file_equals(&first.stored_file("v.txt"), "one\n");
    assert_file_equals(&second.stored_file("v.txt"), "two\n");

    h.service.restore(&first.id).await.unwrap();
    assert_file_equals(&h.working_tree().join("v.txt"), "one\n");
    h.service.restore(&second.id).await.unwrap();
    assert_file_equals(&h.working_tree().join("v.txt"), "two\n");
}

#[tokio::test]
async fn ledger_survives_a_new_service_instance() {
    let h = Harness::new().await;
    h.write("a.txt", "alpha\n");
    let snapshot = h.service.create("persisted", Some("alice")).await.unwrap();

    let reopened = SnapshotService::new(SnapshotConfig::for_data_dir(h.dir.path()))
        .await
        .unwrap();
    let loaded = reopened.get(&snapshot.id).await.unwrap();

    assert_eq!(loaded, snapshot);
    assert_eq!(loaded.author, "alice");
}

#[tokio::test]
async fn ledger_uses_documented_field_names() {
    let h = Harness::new().await;
    h.write("a.txt", "alpha\n");
    let snapshot = h.service.create("fields", Some("alice")).await.unwrap();

    let raw = std::fs::read_to_string(h.dir.path().join("history.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let record = &json[0];

    assert_eq!(record["id"], snapshot.id.as_str());
    assert_eq!(record["user"], "alice");
    assert_eq!(record["message"], "fields");
    assert_eq!(record["files"], serde_json::json!(["a.txt"]));
    assert!(record["snapshot_path"].is_string());
    assert!(record["timestamp"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn missing_ledger_lists_nothing() {
    let h = Harness::new().await;
    assert!(h.service.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_ledger_is_a_parse_error() {
    let h = Harness::new().await;
    std::fs::write(h.dir.path().join("history.json"), "[{]").unwrap();

    let err = h.service.list().await.unwrap_err();
    assert!(matches!(
        err,
        treesnap_snapshot::SnapshotError::Parse { .. }
    ));
}

#[tokio::test]
async fn concurrent_creates_are_all_recorded() {
    let h = Harness::new().await;
    h.write("a.txt", "alpha\n");
    let service = Arc::new(h.service);

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.create(&format!("task {}", i), None).await })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        ids.insert(task.await.unwrap().unwrap().id);
    }

    assert_eq!(ids.len(), 8);
    assert_eq!(service.list().await.unwrap().len(), 8);
}
