//! # nbtidy watcher
//!
//! Debounced, bounded, self-healing recursive directory monitoring.
//! Watches a directory tree for writes matching a pattern, coalesces
//! bursts into periodic drain cycles, and invokes an external action
//! once per detected change.
//!
//! ## Features
//!
//! - **Bounded buffering**: in-flight events are capped; bursts beyond
//!   the bound drop the excess instead of growing without limit
//! - **Debounced dispatch**: events are drained on a fixed interval, one
//!   action at a time
//! - **Self-healing watch set**: the watch set is periodically torn down
//!   and rebuilt so directories created after the initial scan get
//!   picked up
//! - **One-shot scans**: the existing tree can be walked once with the
//!   same filtering semantics
//!
//! ## Data flow
//!
//! ```text
//! raw notifications ──► PathFilter ──► EventBuffer
//!                                          │ (every debounce interval)
//!                                          ▼
//!                                    DebounceLoop ──► ChangeAction
//!                                          │
//!                  (every rebuild period)  ▼
//!                                   WatchSetManager
//! ```

pub mod action;
pub mod config;
pub mod debounce;
pub mod error;
pub mod event;
pub mod filter;
pub mod scan;
pub mod watch_set;

pub use action::{ActionOutcome, ChangeAction, CommandAction};
pub use config::WatchConfig;
pub use debounce::DebounceLoop;
pub use error::{Result, WatcherError};
pub use event::{ChangeEvent, ChangeOp, EventBuffer};
pub use filter::PathFilter;
pub use scan::{ScanSummary, ScanWalker};
pub use watch_set::{WatchRegistry, WatchSetManager};
