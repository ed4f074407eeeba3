// End-to-end engine scenarios against a real SQLite store

use std::sync::Arc;
use tagflow::db::DbConnection;
use tagflow::engine::{Advance, Annotator, RequestContext};
use tagflow::repo::{AnnotationRepo, ImageRepo, SqliteStore};
use tagflow::utils::sha256_hex;
use tagflow::workflow::{ProjectConfig, StageRegistry, TaskGraph};

const CONFIG: &str = r#"
tasks:
  - id: quality
    type: boolean
  - id: has_person
    type: boolean
    if:
      quality: "true"
  - id: age
    if:
      has_person: "true"
    classes:
      child: {}
      adult: {}
"#;

fn graph() -> Arc<TaskGraph> {
    Arc::new(ProjectConfig::parse(CONFIG).unwrap().graph)
}

/// Ingest `n` images whose hashes are derived from their names
fn ingest(conn: &rusqlite::Connection, n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            let name = format!("img{}.png", i);
            let hash = sha256_hex(name.as_bytes());
            ImageRepo::create(conn, &hash, &name).unwrap();
            hash
        })
        .collect()
}

#[test]
fn test_gating_scenario() {
    let conn = DbConnection::connect_in_memory().unwrap();
    let hashes = ingest(&conn, 3);
    let annotator = Annotator::new(graph(), SqliteStore::new(&conn));
    let ctx = RequestContext::new();

    annotator.submit_annotation(&ctx, &hashes[0], "quality", "alice", "true").unwrap();
    annotator.submit_annotation(&ctx, &hashes[1], "quality", "bob", "false").unwrap();

    assert_eq!(annotator.count_eligible(&ctx, "quality").unwrap(), 3);
    assert_eq!(annotator.count_available(&ctx, "quality").unwrap(), 1);
    assert_eq!(annotator.count_eligible(&ctx, "has_person").unwrap(), 1);
    assert_eq!(annotator.count_available(&ctx, "has_person").unwrap(), 1);

    let progress = annotator.phase_progress(&ctx, "has_person").unwrap();
    assert_eq!(progress.pending, 1);
    assert_eq!(progress.filtered_wrong_class, 1);
    assert_eq!(progress.not_yet_annotated, 1);
    assert_eq!(progress.total, 3);

    let step = annotator.next_step(&ctx, Some("has_person")).unwrap().unwrap();
    assert_eq!(step.image_sha256, hashes[0]);
    assert_eq!(step.image_filename, "img0.png");

    // Nothing can reach the third stage yet
    assert_eq!(annotator.count_eligible(&ctx, "age").unwrap(), 0);
    assert_eq!(annotator.next_step(&ctx, Some("age")).unwrap(), None);
}

#[test]
fn test_split_always_sums_to_total() {
    let conn = DbConnection::connect_in_memory().unwrap();
    let hashes = ingest(&conn, 8);
    let annotator = Annotator::new(graph(), SqliteStore::new(&conn));
    let ctx = RequestContext::new();

    for (i, hash) in hashes.iter().enumerate() {
        let value = if i % 3 == 0 { "false" } else { "true" };
        if i < 6 {
            annotator.submit_annotation(&ctx, hash, "quality", "alice", value).unwrap();
        }
        if i % 2 == 1 {
            annotator.submit_annotation(&ctx, hash, "has_person", "bob", "true").unwrap();
        }
    }

    for task in ["quality", "has_person", "age"] {
        let p = annotator.phase_progress(&ctx, task).unwrap();
        assert_eq!(
            p.completed + p.pending + p.filtered_wrong_class + p.not_yet_annotated,
            p.total,
            "split for {}",
            task
        );
        assert_eq!(p.total, 8);
    }
}

#[test]
fn test_resubmission_overwrites() {
    let conn = DbConnection::connect_in_memory().unwrap();
    let hashes = ingest(&conn, 1);
    let annotator = Annotator::new(graph(), SqliteStore::new(&conn));
    let ctx = RequestContext::new();

    let first = annotator.submit_annotation(&ctx, &hashes[0], "quality", "alice", "true").unwrap();
    let again = annotator.submit_annotation(&ctx, &hashes[0], "quality", "alice", "true").unwrap();
    let changed = annotator.submit_annotation(&ctx, &hashes[0], "quality", "alice", "false").unwrap();

    assert_eq!(first.id, again.id);
    assert_eq!(first.id, changed.id);
    assert_eq!(changed.value, "false");
    assert_eq!(AnnotationRepo::stats(&conn).unwrap().total_annotations, 1);

    // The overwritten value now filters the image out of the next stage
    assert_eq!(annotator.count_eligible(&ctx, "has_person").unwrap(), 0);
}

#[test]
fn test_walk_to_completion() {
    let conn = DbConnection::connect_in_memory().unwrap();
    let hashes = ingest(&conn, 2);
    let annotator = Annotator::new(graph(), SqliteStore::new(&conn)).with_offset_advance(1);
    let ctx = RequestContext::new();

    let mut submitted = 0;
    let mut step = annotator.next_step(&ctx, None).unwrap();
    while let Some(current) = step {
        let value = match current.task_id.as_str() {
            "age" => "adult",
            _ => "true",
        };
        let advance = annotator
            .submit_and_advance(&ctx, &current.image_sha256, &current.task_id, "alice", value)
            .unwrap();
        submitted += 1;
        step = match advance {
            Advance::SameTask(next) | Advance::NextTask(next) => Some(next),
            Advance::AllDone => None,
        };
        assert!(submitted <= 6, "scheduler looped");
    }

    // Every image went through all three stages
    assert_eq!(submitted, 6);
    for hash in &hashes {
        assert_eq!(AnnotationRepo::get_for_image(&conn, hash).unwrap().len(), 3);
    }
    assert_eq!(annotator.next_step(&ctx, None).unwrap(), None);
}

#[test]
fn test_reordered_config_is_rejected() {
    let conn = DbConnection::connect_in_memory().unwrap();
    StageRegistry::sync(&conn, &graph()).unwrap();

    let reordered = ProjectConfig::parse(
        "tasks:\n  - id: has_person\n    type: boolean\n  - id: quality\n    type: boolean\n",
    )
    .unwrap();
    assert!(StageRegistry::sync(&conn, &reordered.graph).is_err());
}
