//! One-shot tree scanning.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, trace, warn};
use walkdir::WalkDir;

use crate::action::ChangeAction;
use crate::error::{Result, WatcherError};
use crate::filter::PathFilter;

/// Counts from one scan pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    /// Files visited.
    pub files_seen: usize,

    /// Files that passed the filter.
    pub matched: usize,

    /// Successful action invocations.
    pub converted: usize,

    /// Failed action invocations.
    pub failures: usize,

    /// Time taken in milliseconds.
    pub duration_ms: u64,
}

/// One-shot alternative to the watch loop: walk the existing tree once,
/// filter files directly, and invoke the action in walk order.
///
/// Presence on disk is treated as evidence of content, so only the path
/// rules of the filter apply. No buffering, no debounce, no rebuild.
pub struct ScanWalker {
    filter: Arc<PathFilter>,
    action: Arc<dyn ChangeAction>,
    try_run: bool,
}

impl ScanWalker {
    /// Create a walker dispatching matches to `action`.
    pub fn new(filter: Arc<PathFilter>, action: Arc<dyn ChangeAction>, try_run: bool) -> Self {
        Self {
            filter,
            action,
            try_run,
        }
    }

    /// Walk the tree rooted at `root` once.
    ///
    /// Terminates on the first unrecoverable traversal error; action
    /// failures are logged per file and counted, never terminal.
    pub async fn scan(&self, root: &Path) -> Result<ScanSummary> {
        if !root.exists() {
            return Err(WatcherError::RootNotFound(root.display().to_string()));
        }
        if !root.is_dir() {
            return Err(WatcherError::NotADirectory(root.display().to_string()));
        }

        let start = Instant::now();
        let mut summary = ScanSummary::default();

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry?;
            if entry.file_type().is_dir() {
                trace!(dir = %entry.path().display(), "visiting directory");
                continue;
            }

            summary.files_seen += 1;
            if !self.filter.matches_path(entry.path()) {
                continue;
            }

            summary.matched += 1;
            info!(path = %entry.path().display(), "matched existing file");
            if self.try_run {
                continue;
            }

            match self.action.invoke(entry.path()).await {
                Ok(_) => summary.converted += 1,
                Err(e) => {
                    warn!(path = %entry.path().display(), "action failed, skipping: {e}");
                    summary.failures += 1;
                }
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            files = summary.files_seen,
            matched = summary.matched,
            converted = summary.converted,
            failures = summary.failures,
            "scan complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionOutcome;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingAction {
        invoked: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl ChangeAction for RecordingAction {
        async fn invoke(&self, path: &Path) -> crate::error::Result<ActionOutcome> {
            self.invoked.lock().unwrap().push(path.to_path_buf());
            Ok(ActionOutcome::default())
        }
    }

    fn notebook_filter() -> Arc<PathFilter> {
        Arc::new(PathFilter::new("[.]nb$", ".plain.nb").unwrap())
    }

    #[tokio::test]
    async fn test_scan_invokes_action_for_matches_only() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.nb"), b"notebook").unwrap();
        std::fs::write(temp_dir.path().join("b.plain.nb"), b"generated").unwrap();
        std::fs::write(temp_dir.path().join("c.txt"), b"other").unwrap();

        let action = Arc::new(RecordingAction::default());
        let walker = ScanWalker::new(notebook_filter(), action.clone(), false);
        let summary = walker.scan(temp_dir.path()).await.unwrap();

        assert_eq!(summary.files_seen, 3);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.converted, 1);
        assert_eq!(summary.failures, 0);

        let invoked = action.invoked.lock().unwrap().clone();
        assert_eq!(invoked, vec![temp_dir.path().join("a.nb")]);
    }

    #[tokio::test]
    async fn test_scan_descends_into_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("deep/deeper")).unwrap();
        std::fs::write(temp_dir.path().join("deep/deeper/x.nb"), b"notebook").unwrap();

        let action = Arc::new(RecordingAction::default());
        let walker = ScanWalker::new(notebook_filter(), action.clone(), false);
        let summary = walker.scan(temp_dir.path()).await.unwrap();

        assert_eq!(summary.matched, 1);
        assert_eq!(
            action.invoked.lock().unwrap().clone(),
            vec![temp_dir.path().join("deep/deeper/x.nb")]
        );
    }

    #[tokio::test]
    async fn test_scan_try_run_skips_invocation() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.nb"), b"notebook").unwrap();

        let action = Arc::new(RecordingAction::default());
        let walker = ScanWalker::new(notebook_filter(), action.clone(), true);
        let summary = walker.scan(temp_dir.path()).await.unwrap();

        assert_eq!(summary.matched, 1);
        assert_eq!(summary.converted, 0);
        assert!(action.invoked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scan_missing_root() {
        let action = Arc::new(RecordingAction::default());
        let walker = ScanWalker::new(notebook_filter(), action, false);
        let err = walker
            .scan(Path::new("/nonexistent/path/12345"))
            .await
            .unwrap_err();
        assert!(matches!(err, WatcherError::RootNotFound(_)));
    }

    #[tokio::test]
    async fn test_scan_root_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.nb");
        std::fs::write(&file, b"notebook").unwrap();

        let action = Arc::new(RecordingAction::default());
        let walker = ScanWalker::new(notebook_filter(), action, false);
        let err = walker.scan(&file).await.unwrap_err();
        assert!(matches!(err, WatcherError::NotADirectory(_)));
    }
}
