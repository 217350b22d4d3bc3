//! Watch-set management over the notification backend.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::{Result, WatcherError};
use crate::event::{ChangeEvent, ChangeOp, EventBuffer};
use crate::filter::PathFilter;

/// Registration operations the control loop drives.
///
/// Implemented by [`WatchSetManager`]; the seam lets the loop's rebuild
/// cadence be exercised without a live notification backend.
pub trait WatchRegistry: Send {
    /// Register `root` and every descendant directory.
    fn register_recursive(&mut self, root: &Path) -> Result<usize>;

    /// Unregister every watched directory.
    fn reset_all(&mut self);
}

/// Owns the notification backend and the set of registered directories.
///
/// Directories are registered one by one (non-recursively), so the set
/// reflects the tree as it looked during the last registration pass.
/// Directories created afterwards are invisible until the next periodic
/// rebuild; [`WatchSetManager::reset_all`] followed by
/// [`WatchSetManager::register_recursive`] is the discovery mechanism.
pub struct WatchSetManager {
    watcher: RecommendedWatcher,
    watched: HashSet<PathBuf>,
}

impl WatchSetManager {
    /// Create a manager whose notification callback filters raw events
    /// through `filter` and appends survivors to `buffer`.
    ///
    /// Filtering before buffering means capacity is only spent on events
    /// the loop would actually dispatch.
    pub fn new(buffer: Arc<EventBuffer>, filter: Arc<PathFilter>) -> Result<Self> {
        let watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    let op = ChangeOp::from(event.kind);
                    for path in event.paths {
                        if filter.is_interesting(&path, op) {
                            buffer.append(ChangeEvent::new(op, path));
                        }
                    }
                }
                Err(e) => warn!("notification backend error: {e}"),
            },
        )?;

        Ok(Self {
            watcher,
            watched: HashSet::new(),
        })
    }

    /// Register `root` and every descendant directory.
    ///
    /// Already-registered directories are skipped, so re-running after a
    /// partial failure is idempotent. A missing root or a registration
    /// failure returns an error; directories registered before the
    /// failure stay registered (the next rebuild completes coverage).
    pub fn register_recursive(&mut self, root: &Path) -> Result<usize> {
        if !root.exists() {
            return Err(WatcherError::RootNotFound(root.display().to_string()));
        }
        if !root.is_dir() {
            return Err(WatcherError::NotADirectory(root.display().to_string()));
        }

        let mut registered = 0usize;
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let dir = entry.into_path();
            if self.watched.contains(&dir) {
                continue;
            }
            if let Err(source) = self.watcher.watch(&dir, RecursiveMode::NonRecursive) {
                return Err(WatcherError::Registration {
                    path: dir.display().to_string(),
                    source,
                });
            }
            trace!(dir = %dir.display(), "registered directory");
            self.watched.insert(dir);
            registered += 1;
        }

        debug!(
            registered,
            total = self.watched.len(),
            "recursive registration complete"
        );
        Ok(registered)
    }

    /// Unregister every watched directory.
    ///
    /// A directory that fails to unregister is logged and skipped; this
    /// must never block a rebuild.
    pub fn reset_all(&mut self) {
        let count = self.watched.len();
        for dir in self.watched.drain() {
            if let Err(e) = self.watcher.unwatch(&dir) {
                warn!(dir = %dir.display(), "unable to unregister directory, ignoring: {e}");
            }
        }
        debug!(count, "watch set cleared");
    }

    /// Number of currently registered directories.
    pub fn len(&self) -> usize {
        self.watched.len()
    }

    /// Whether no directory is registered.
    pub fn is_empty(&self) -> bool {
        self.watched.is_empty()
    }
}

impl WatchRegistry for WatchSetManager {
    fn register_recursive(&mut self, root: &Path) -> Result<usize> {
        WatchSetManager::register_recursive(self, root)
    }

    fn reset_all(&mut self) {
        WatchSetManager::reset_all(self);
    }
}
