//! Periodic refresh loop
//!
//! Refreshes immediately on start, then on a fixed interval plus a small
//! random jitter until the shutdown channel fires.

use super::{RefreshOutcome, Refresher};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Configuration for the refresh loop
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Base refresh interval (default: 300 seconds)
    pub interval: Duration,
    /// Maximum jitter added to each interval (default: 5 seconds)
    pub jitter: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            jitter: Duration::from_secs(5),
        }
    }
}

pub struct RefreshLoop {
    refresher: Arc<Refresher>,
    config: RefreshConfig,
}

impl RefreshLoop {
    pub fn new(refresher: Arc<Refresher>, config: RefreshConfig) -> Self {
        Self { refresher, config }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            regions = self.refresher.regions().len(),
            "Starting refresh loop"
        );

        // first tick completes immediately
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let RefreshOutcome::Skipped = self.refresher.refresh_once().await {
                        debug!("Scheduled refresh skipped, previous cycle still running");
                    }
                    ticker.reset_after(self.next_delay());
                }
                _ = shutdown.recv() => {
                    info!("Shutting down refresh loop");
                    break;
                }
            }
        }
    }

    fn next_delay(&self) -> Duration {
        self.config.interval + Duration::from_millis(rand_jitter(self.config.jitter.as_millis() as u64))
    }
}

/// Random jitter in `[0, max_ms)`
fn rand_jitter(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..max_ms)
}
