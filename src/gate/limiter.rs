//! Core sliding-window gate implementation.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use super::backend::FloodControl;
use super::CheckHistory;
use crate::config::GateConfig;
use crate::context::CheckContext;
use crate::error::Result;

/// Shortest period the reaper task runs at.
const MIN_REAP_INTERVAL: Duration = Duration::from_millis(1);

/// The flood control gate that tracks recent checks per identifier.
///
/// This struct is thread-safe and meant to be shared behind an `Arc`. A single
/// lock covers the whole map, so evict, append and compare happen atomically
/// for every caller.
pub struct RateGate {
    /// Limits shared by every identifier
    config: GateConfig,
    /// Check history indexed by identifier
    histories: Mutex<HashMap<i64, CheckHistory>>,
}

impl RateGate {
    /// Create a new gate with the given limits.
    ///
    /// Fails if the window is zero.
    pub fn new(config: GateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            histories: Mutex::new(HashMap::new()),
        })
    }

    /// Check whether a request from `user_id` is admitted.
    ///
    /// The check is recorded whether or not it is admitted. If `ctx` is
    /// already cancelled or expired, the call fails and nothing is recorded.
    pub async fn check(&self, ctx: &CheckContext, user_id: i64) -> Result<bool> {
        if let Err(err) = ctx.ensure_active() {
            warn!(user_id, error = %err, "Flood control check aborted");
            return Err(err);
        }

        let window = self.config.window();
        let max_checks = self.config.max_checks;

        let count = {
            let mut histories = self.histories.lock();
            let now = Instant::now();

            let history = histories.entry(user_id).or_insert_with(|| {
                debug!(user_id, "Tracking new identifier");
                CheckHistory::new()
            });

            let evicted = history.evict(now, window);
            history.record(now);

            trace!(user_id, evicted, count = history.len(), "Checking flood control");
            history.len()
        };

        if count > max_checks {
            debug!(user_id, count, max_checks, "Flood control limit exceeded");
            return Ok(false);
        }

        Ok(true)
    }

    /// Drop identifiers with no check for longer than `idle_after`.
    ///
    /// The threshold never goes below the window, so a removed identifier
    /// could not have affected its next decision. Returns the number removed.
    pub fn reap_idle(&self, idle_after: Duration) -> usize {
        let threshold = idle_after.max(self.config.window());
        let mut histories = self.histories.lock();
        let now = Instant::now();

        let before = histories.len();
        histories.retain(|_, history| !history.is_idle(now, threshold));
        let removed = before - histories.len();

        if removed > 0 {
            debug!(removed, remaining = histories.len(), "Reaped idle identifiers");
        }
        removed
    }

    /// Spawn a task that reaps idle identifiers every `every` until
    /// `shutdown` resolves.
    ///
    /// `every` is raised to at least one millisecond.
    pub fn spawn_reaper<F>(
        self: Arc<Self>,
        every: Duration,
        idle_after: Duration,
        shutdown: F,
    ) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let every = every.max(MIN_REAP_INTERVAL);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tokio::pin!(shutdown);

            loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        debug!("Idle identifier reaper stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        self.reap_idle(idle_after);
                    }
                }
            }
        })
    }

    /// Get the number of stored checks for an identifier.
    ///
    /// This is the raw stored length; stale entries are only evicted by the
    /// next check. Returns `None` if the identifier has never been checked.
    pub fn history_len(&self, user_id: i64) -> Option<usize> {
        let histories = self.histories.lock();
        histories.get(&user_id).map(CheckHistory::len)
    }

    /// Get the number of tracked identifiers.
    pub fn identifier_count(&self) -> usize {
        self.histories.lock().len()
    }

    /// Forget every identifier.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.histories.lock().clear();
    }

    /// The limits this gate enforces.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }
}

impl Default for RateGate {
    fn default() -> Self {
        Self {
            config: GateConfig::default(),
            histories: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl FloodControl for RateGate {
    async fn check(&self, ctx: &CheckContext, user_id: i64) -> Result<bool> {
        RateGate::check(self, ctx, user_id).await
    }
}
