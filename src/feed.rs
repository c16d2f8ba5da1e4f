use crate::source::DataSource;
use crate::state::SessionState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(2500);
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_millis(4500);

#[derive(Debug, Clone, Copy)]
pub struct FeedOptions {
    pub min_interval: Duration,
    pub max_interval: Duration,
}

impl FeedOptions {
    /// Next wait, drawn uniformly from `[min_interval, max_interval)` so
    /// repeated cycles do not land in lockstep.
    pub fn jittered_interval(&self) -> Duration {
        let spread = self.max_interval.saturating_sub(self.min_interval);
        self.min_interval + spread.mul_f64(rand::random::<f64>())
    }
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
        }
    }
}

/// Handle to a running update feed. Dropping it stops the loop.
pub struct FeedHandle {
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::Relaxed);
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Start the periodic availability refresh for the snapshot identified by
/// `generation`. The loop exits on its own as soon as the session snapshot
/// moves to a different generation, so a feed can never write into results
/// it was not started for.
pub fn spawn_update_feed(
    source: Arc<dyn DataSource>,
    state: Arc<RwLock<SessionState>>,
    generation: u64,
    options: FeedOptions,
) -> FeedHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let loop_stop = Arc::clone(&stop);
    let task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(options.jittered_interval()).await;
            if loop_stop.load(Ordering::Relaxed) {
                break;
            }

            let ids = {
                let Ok(guard) = state.read() else {
                    warn!("session lock poisoned, stopping update feed");
                    break;
                };
                match guard.snapshot() {
                    Some(snapshot) if snapshot.generation == generation => snapshot.lot_ids(),
                    _ => break,
                }
            };
            if ids.is_empty() {
                continue;
            }

            let updates = match source.push_updates(&ids).await {
                Ok(updates) => updates,
                Err(err) => {
                    warn!(error = %err, "availability refresh failed, will retry");
                    continue;
                }
            };
            if updates.is_empty() {
                continue;
            }

            let applied = {
                let Ok(mut guard) = state.write() else {
                    warn!("session lock poisoned, stopping update feed");
                    break;
                };
                guard.apply_updates(generation, &updates)
            };
            if !applied {
                break;
            }
            debug!(count = updates.len(), generation, "availability refreshed");
        }
    });
    FeedHandle { stop, task }
}
