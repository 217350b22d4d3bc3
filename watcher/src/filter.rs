//! Path filtering for change notifications.

use std::path::Path;

use regex::Regex;

use crate::error::{Result, WatcherError};
use crate::event::ChangeOp;

/// Decides whether a change notification is worth acting on.
///
/// Read-only after construction, so it can be shared freely between the
/// notification callback and the control loop.
#[derive(Debug)]
pub struct PathFilter {
    include: Regex,
    exclude_suffix: String,
}

impl PathFilter {
    /// Compile a filter from an inclusion pattern and exclusion suffix.
    ///
    /// A pattern that fails to compile is a fatal configuration error;
    /// the run never starts. An empty suffix disables the exclusion
    /// rule.
    pub fn new(include_pattern: &str, exclude_suffix: impl Into<String>) -> Result<Self> {
        let include = Regex::new(include_pattern).map_err(|source| WatcherError::InvalidPattern {
            pattern: include_pattern.to_string(),
            source,
        })?;

        Ok(Self {
            include,
            exclude_suffix: exclude_suffix.into(),
        })
    }

    /// Whether a live notification should be dispatched.
    ///
    /// All three rules must hold: the operation is a write, the path does
    /// not carry the exclusion suffix, and the path matches the inclusion
    /// pattern.
    pub fn is_interesting(&self, path: &Path, op: ChangeOp) -> bool {
        op == ChangeOp::Write && self.matches_path(path)
    }

    /// Path rules only. Scan mode treats presence on disk as evidence of
    /// content, so no operation gate applies.
    pub fn matches_path(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        if !self.exclude_suffix.is_empty() && path_str.ends_with(&self.exclude_suffix) {
            return false;
        }
        self.include.is_match(&path_str)
    }
}
