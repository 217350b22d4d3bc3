//! Run configuration for watching and scanning.

use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WatcherError};

/// Default bound on buffered change events.
pub const DEFAULT_MAX_EVENTS: usize = 0xffff;

/// Default inclusion pattern (Wolfram notebook files).
pub const DEFAULT_INCLUDE_PATTERN: &str = "[.]nb$";

/// Default suffix marking generated output.
pub const DEFAULT_EXCLUDE_SUFFIX: &str = ".plain.nb";

/// Default deadline for one action invocation.
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default sleep between drain cycles.
pub const DEFAULT_DEBOUNCE_INTERVAL: Duration = Duration::from_millis(500);

/// Default number of drain cycles between full watch-set rebuilds.
pub const DEFAULT_REBUILD_PERIOD: u32 = 100;

/// Configuration for one watch or scan run.
///
/// Immutable for the process lifetime once validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Root directory to watch.
    pub root: PathBuf,

    /// Maximum number of buffered change events; arrivals beyond this
    /// bound are dropped until the next drain.
    pub max_events: usize,

    /// Regular expression a full path must match to be processed.
    pub include_pattern: String,

    /// Suffix marking generated output. Matching paths are never
    /// processed, which keeps the tool from reacting to its own writes.
    pub exclude_suffix: String,

    /// Detect and log changes without invoking the action.
    pub try_run: bool,

    /// Deadline for a single action invocation.
    pub action_timeout: Duration,

    /// Sleep between drain cycles.
    pub debounce_interval: Duration,

    /// Number of drain cycles between full watch-set rebuilds.
    pub rebuild_period: u32,
}

impl WatchConfig {
    /// Create a config for `root` with default settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_events: DEFAULT_MAX_EVENTS,
            include_pattern: DEFAULT_INCLUDE_PATTERN.to_string(),
            exclude_suffix: DEFAULT_EXCLUDE_SUFFIX.to_string(),
            try_run: false,
            action_timeout: DEFAULT_ACTION_TIMEOUT,
            debounce_interval: DEFAULT_DEBOUNCE_INTERVAL,
            rebuild_period: DEFAULT_REBUILD_PERIOD,
        }
    }

    /// Set the event buffer bound.
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    /// Set the inclusion pattern.
    pub fn with_include_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.include_pattern = pattern.into();
        self
    }

    /// Set the exclusion suffix.
    pub fn with_exclude_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.exclude_suffix = suffix.into();
        self
    }

    /// Enable try-run mode (detect and log, never invoke).
    pub fn try_run(mut self) -> Self {
        self.try_run = true;
        self
    }

    /// Set the per-invocation action deadline.
    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// Set the sleep between drain cycles.
    pub fn with_debounce_interval(mut self, interval: Duration) -> Self {
        self.debounce_interval = interval;
        self
    }

    /// Set the number of drain cycles between watch-set rebuilds.
    pub fn with_rebuild_period(mut self, cycles: u32) -> Self {
        self.rebuild_period = cycles;
        self
    }

    /// Validate the configuration before a run starts.
    ///
    /// All violations are fatal: a run never starts on a config that
    /// cannot support it.
    pub fn validate(&self) -> Result<()> {
        if !self.root.exists() {
            return Err(WatcherError::RootNotFound(self.root.display().to_string()));
        }
        if !self.root.is_dir() {
            return Err(WatcherError::NotADirectory(self.root.display().to_string()));
        }
        if self.max_events == 0 {
            return Err(WatcherError::Config(
                "max_events must be positive".to_string(),
            ));
        }
        if self.rebuild_period == 0 {
            return Err(WatcherError::Config(
                "rebuild_period must be positive".to_string(),
            ));
        }
        if let Err(source) = Regex::new(&self.include_pattern) {
            return Err(WatcherError::InvalidPattern {
                pattern: self.include_pattern.clone(),
                source,
            });
        }
        Ok(())
    }
}
