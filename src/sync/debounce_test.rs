use std::time::Duration;

use serde_json::Value;

use super::*;
use crate::document::NewDocument;
use crate::scene::LiveScene;
use crate::snapshot::{ShapeNode, StrokePoint};
use crate::store::MemoryStore;

const DELAY: Duration = Duration::from_millis(800);

// =============================================================================
// ScheduledTask
// =============================================================================

#[test]
fn schedule_replaces_pending_deadline() {
    let now = Instant::now();
    let mut task = ScheduledTask::new();
    assert!(!task.schedule(now + Duration::from_millis(10)));
    assert!(task.schedule(now + Duration::from_millis(20)));
    assert_eq!(task.deadline(), Some(now + Duration::from_millis(20)));
}

#[test]
fn take_due_fires_once() {
    let now = Instant::now();
    let mut task = ScheduledTask::new();
    task.schedule(now + Duration::from_millis(5));

    assert!(!task.take_due(now));
    assert!(task.take_due(now + Duration::from_millis(5)));
    assert!(!task.take_due(now + Duration::from_millis(50)));
    assert!(!task.is_pending());
}

#[test]
fn cancel_reports_whether_pending() {
    let mut task = ScheduledTask::new();
    assert!(!task.cancel());
    task.schedule(Instant::now());
    assert!(task.cancel());
    assert_eq!(task.deadline(), None);
}

// =============================================================================
// DebouncedWriter
// =============================================================================

#[test]
fn deadline_tracks_last_mutation() {
    let start = Instant::now();
    let mut writer = DebouncedWriter::new(DELAY, ApplyGuard::new());

    for step in 0..5u64 {
        assert!(writer.on_mutation(start + Duration::from_millis(step * 100)));
    }

    assert_eq!(writer.deadline(), Some(start + Duration::from_millis(400) + DELAY));
    assert_eq!(writer.timer_starts(), 5);
}

#[test]
fn fires_once_after_quiet_period() {
    let start = Instant::now();
    let mut writer = DebouncedWriter::new(DELAY, ApplyGuard::new());
    writer.on_mutation(start);

    assert!(!writer.fire(start + DELAY - Duration::from_millis(1)));
    assert!(writer.fire(start + DELAY));
    assert!(!writer.fire(start + DELAY * 2));
}

#[test]
fn mutations_under_guard_start_no_timer() {
    let guard = ApplyGuard::new();
    let mut writer = DebouncedWriter::new(DELAY, guard.clone());

    let token = guard.try_enter().unwrap();
    assert!(!writer.on_mutation(Instant::now()));
    assert!(!writer.on_mutation(Instant::now()));
    drop(token);

    assert_eq!(writer.timer_starts(), 0);
    assert!(!writer.is_pending());
    assert!(writer.on_mutation(Instant::now()));
}

#[test]
fn guard_leaves_existing_deadline_alone() {
    let guard = ApplyGuard::new();
    let mut writer = DebouncedWriter::new(DELAY, guard.clone());
    let start = Instant::now();
    writer.on_mutation(start);

    let _token = guard.try_enter().unwrap();
    writer.on_mutation(start + Duration::from_millis(300));
    assert_eq!(writer.deadline(), Some(start + DELAY));
}

#[tokio::test(start_paused = true)]
async fn sleep_until_deadline_wakes_at_deadline() {
    let start = Instant::now();
    sleep_until_deadline(Some(start + DELAY)).await;
    let elapsed = start.elapsed();
    assert!(elapsed >= DELAY && elapsed < DELAY + Duration::from_millis(2));
}

#[tokio::test(start_paused = true)]
async fn sleep_without_deadline_never_wakes() {
    let woke = tokio::time::timeout(Duration::from_secs(3600), sleep_until_deadline(None)).await;
    assert!(woke.is_err());
}

// =============================================================================
// SnapshotWriter
// =============================================================================

#[tokio::test]
async fn write_stores_sanitized_snapshot_under_client_id() {
    let store = Arc::new(MemoryStore::new());
    let doc = store.create(NewDocument::default()).await.unwrap();
    let scene = Arc::new(LiveScene::new());
    scene.add_shape(ShapeNode::stroke(vec![StrokePoint::new(1.0, 2.0), StrokePoint::new(3.5, 4.0)]));

    let client = ClientId::new("writer-1");
    let writer = SnapshotWriter::new(store.clone(), scene, doc, client.clone(), WriteOptions::default());
    writer.write().await.unwrap();

    let stored = store.get(doc).await.unwrap().unwrap();
    assert_eq!(stored.last_writer_id, Some(client));
    let payload = stored.payload.unwrap();
    assert_eq!(payload["objects"][0]["path"], Value::String("1,2;3.5,4".into()));
}

#[tokio::test]
async fn write_surfaces_store_failure() {
    let store = Arc::new(MemoryStore::new());
    let doc = store.create(NewDocument::default()).await.unwrap();
    store.set_available(false);

    let writer = SnapshotWriter::new(
        store,
        Arc::new(LiveScene::new()),
        doc,
        ClientId::new("writer-1"),
        WriteOptions::default(),
    );
    let err = writer.write().await.unwrap_err();
    assert!(matches!(err, SyncError::Store(_)));
    assert_eq!(err.error_code(), "E_STORE_UNAVAILABLE");
}

#[tokio::test]
async fn write_refuses_scene_that_cannot_be_reloaded() {
    let store = Arc::new(MemoryStore::new());
    let doc = store.create(NewDocument::default()).await.unwrap();
    let scene = Arc::new(LiveScene::new());
    scene.add_shape(ShapeNode::rect(f64::NAN, 0.0, 10.0, 10.0));

    let writer = SnapshotWriter::new(store.clone(), scene, doc, ClientId::new("writer-1"), WriteOptions::default());
    let err = writer.write().await.unwrap_err();

    assert!(matches!(err, SyncError::Scene(_)));
    assert_eq!(err.error_code(), "E_INVALID_SHAPE");
    assert!(store.get(doc).await.unwrap().unwrap().payload.is_none());
}
