//! The debounced control loop.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::action::ChangeAction;
use crate::config::WatchConfig;
use crate::error::Result;
use crate::event::{ChangeEvent, EventBuffer};
use crate::filter::PathFilter;
use crate::watch_set::{WatchRegistry, WatchSetManager};

/// Drives the watch cycle: drain the event buffer on a fixed interval,
/// dispatch each surviving event to the action, and after a fixed number
/// of cycles tear down and rebuild the watch set so directories created
/// after the last pass get picked up.
///
/// The loop runs until the cancellation token fires; cancellation is
/// checked at every sleep boundary and exits after the current dispatch
/// completes.
pub struct DebounceLoop {
    config: WatchConfig,
    buffer: Arc<EventBuffer>,
    action: Arc<dyn ChangeAction>,
    scratch: Vec<ChangeEvent>,
    logged_drops: u64,
}

impl DebounceLoop {
    /// Create a loop for `config` dispatching to `action`.
    ///
    /// Fails on structural misconfiguration; nothing is registered yet.
    pub fn new(config: WatchConfig, action: Arc<dyn ChangeAction>) -> Result<Self> {
        config.validate()?;
        let buffer = Arc::new(EventBuffer::new(config.max_events));

        Ok(Self {
            config,
            buffer,
            action,
            scratch: Vec::new(),
            logged_drops: 0,
        })
    }

    /// Shared handle to the event buffer the loop drains.
    pub fn buffer(&self) -> Arc<EventBuffer> {
        self.buffer.clone()
    }

    /// Run until cancelled.
    ///
    /// The initial registration is fatal on failure (the run would have
    /// no coverage at all); rebuild-time registration failures are
    /// warnings healed by the next rebuild.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        let filter = Arc::new(PathFilter::new(
            &self.config.include_pattern,
            &self.config.exclude_suffix,
        )?);
        let mut manager = WatchSetManager::new(self.buffer.clone(), filter)?;
        self.run_with_registry(&mut manager, cancel).await
    }

    pub(crate) async fn run_with_registry<R: WatchRegistry>(
        &mut self,
        registry: &mut R,
        cancel: CancellationToken,
    ) -> Result<()> {
        let registered = registry.register_recursive(&self.config.root)?;
        info!(
            root = %self.config.root.display(),
            directories = registered,
            pattern = %self.config.include_pattern,
            "watching"
        );

        loop {
            for _ in 0..self.config.rebuild_period {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("cancellation requested, stopping watch loop");
                        return Ok(());
                    }
                    _ = tokio::time::sleep(self.config.debounce_interval) => {}
                }
                self.drain_and_dispatch().await;
            }

            trace!("resetting watches to discover new directories");
            registry.reset_all();
            match registry.register_recursive(&self.config.root) {
                Ok(n) => debug!(directories = n, "watch set rebuilt"),
                // Coverage stays incomplete until the next rebuild.
                Err(e) => warn!("watch set rebuild incomplete: {e}"),
            }
        }
    }

    /// Drain the buffer and dispatch every drained event. Returns the
    /// number of detected changes.
    ///
    /// Dispatch is synchronous with respect to the loop: one action at a
    /// time, each bounded by its own deadline. Action failures are
    /// logged and skipped; the next write to the same path re-triggers
    /// it naturally.
    pub(crate) async fn drain_and_dispatch(&mut self) -> usize {
        let dropped = self.buffer.dropped();
        if dropped > self.logged_drops {
            warn!(
                dropped = dropped - self.logged_drops,
                "event buffer overflowed, changes were discarded"
            );
            self.logged_drops = dropped;
        }

        self.buffer.drain_into(&mut self.scratch);
        for event in &self.scratch {
            info!(path = %event.path.display(), "detected change");
            if self.config.try_run {
                continue;
            }
            match self.action.invoke(&event.path).await {
                Ok(outcome) => debug!(
                    path = %event.path.display(),
                    duration_ms = outcome.duration_ms,
                    "action completed"
                ),
                Err(e) => warn!(path = %event.path.display(), "action failed, skipping: {e}"),
            }
        }

        self.scratch.len()
    }
}
