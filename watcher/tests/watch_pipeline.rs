//! End-to-end watch pipeline tests over a live notification backend.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nbtidy_watcher::{ActionOutcome, ChangeAction, DebounceLoop, WatchConfig};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RecordingAction {
    invoked: Mutex<Vec<PathBuf>>,
}

impl RecordingAction {
    fn paths(&self) -> Vec<PathBuf> {
        self.invoked.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChangeAction for RecordingAction {
    async fn invoke(&self, path: &Path) -> nbtidy_watcher::Result<ActionOutcome> {
        self.invoked.lock().unwrap().push(path.to_path_buf());
        Ok(ActionOutcome::default())
    }
}

fn fast_config(root: &Path) -> WatchConfig {
    WatchConfig::new(root)
        .with_debounce_interval(Duration::from_millis(50))
        .with_rebuild_period(1000)
}

#[tokio::test]
async fn test_write_is_detected_and_dispatched() {
    let temp_dir = TempDir::new().unwrap();
    let action = Arc::new(RecordingAction::default());
    let debounce = DebounceLoop::new(fast_config(temp_dir.path()), action.clone()).unwrap();

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(debounce.run(cancel.clone()));

    // Let registration settle before producing events.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let notebook = temp_dir.path().join("notes.nb");
    std::fs::write(&notebook, b"notebook content").unwrap();
    let generated = temp_dir.path().join("notes.plain.nb");
    std::fs::write(&generated, b"generated output").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    cancel.cancel();
    handle.await.unwrap().unwrap();

    let paths = action.paths();
    assert!(!paths.is_empty(), "write to notes.nb was not dispatched");
    // Repeated writes may dispatch more than once; every dispatch must
    // be for the matching file, never for the generated output.
    assert!(paths.iter().all(|p| p == &notebook));
}

#[tokio::test]
async fn test_try_run_detects_without_invoking() {
    let temp_dir = TempDir::new().unwrap();
    let action = Arc::new(RecordingAction::default());
    let config = fast_config(temp_dir.path()).try_run();
    let debounce = DebounceLoop::new(config, action.clone()).unwrap();

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(debounce.run(cancel.clone()));

    tokio::time::sleep(Duration::from_millis(300)).await;
    std::fs::write(temp_dir.path().join("notes.nb"), b"notebook content").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    cancel.cancel();
    handle.await.unwrap().unwrap();

    assert!(action.paths().is_empty());
}

#[tokio::test]
async fn test_rebuild_discovers_directories_created_after_start() {
    let temp_dir = TempDir::new().unwrap();
    let action = Arc::new(RecordingAction::default());
    // Rebuild every other drain cycle so the new subdirectory is picked
    // up quickly.
    let config = WatchConfig::new(temp_dir.path())
        .with_debounce_interval(Duration::from_millis(50))
        .with_rebuild_period(2);
    let debounce = DebounceLoop::new(config, action.clone()).unwrap();

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(debounce.run(cancel.clone()));

    tokio::time::sleep(Duration::from_millis(300)).await;
    let subdir = temp_dir.path().join("created-later");
    std::fs::create_dir(&subdir).unwrap();

    // Wait past at least one rebuild boundary, then write inside the new
    // directory.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let notebook = subdir.join("notes.nb");
    std::fs::write(&notebook, b"notebook content").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    cancel.cancel();
    handle.await.unwrap().unwrap();

    let paths = action.paths();
    assert!(
        paths.iter().any(|p| p == &notebook),
        "write in a directory created after start was not dispatched: {paths:?}"
    );
}

#[tokio::test]
async fn test_cancellation_exits_cleanly() {
    let temp_dir = TempDir::new().unwrap();
    let action = Arc::new(RecordingAction::default());
    let debounce = DebounceLoop::new(fast_config(temp_dir.path()), action).unwrap();

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(debounce.run(cancel.clone()));

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop did not stop after cancellation");
    result.unwrap().unwrap();
}
