//! Background sweep of expired and idle conversation handles.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::ports::{CacheError, ConversationCache};

/// Periodically evicts dead handles from the conversation cache.
///
/// Runs independently of request handling and stops when the shutdown
/// channel flips to `true`.
pub struct CacheJanitor {
    cache: Arc<dyn ConversationCache>,
    interval: Duration,
}

impl CacheJanitor {
    pub fn new(cache: Arc<dyn ConversationCache>, interval: Duration) -> Self {
        Self { cache, interval }
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; nothing can be stale yet.
        interval.tick().await;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("cache janitor stopping");
                        return;
                    }
                }
                _ = interval.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        tracing::warn!(error = %e, "cache cleanup failed");
                    }
                }
            }
        }
    }

    /// One cleanup pass. Returns the number of evicted handles.
    pub async fn sweep_once(&self) -> Result<usize, CacheError> {
        let evicted = self.cache.cleanup().await?;
        if evicted > 0 {
            tracing::info!(evicted, "evicted stale conversation handles");
        } else {
            tracing::debug!("cache cleanup found nothing to evict");
        }
        Ok(evicted)
    }
}
