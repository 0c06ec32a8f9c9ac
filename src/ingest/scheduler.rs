// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::gauge;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ingest::types::FeedAdapter;
use crate::notify::Broadcaster;
use crate::registry::Destinations;

/// Reference poll period: 10 minutes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub adapters: usize,
    pub new_items: usize,
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Owns every adapter and runs poll-and-deliver cycles one at a time.
pub struct Scheduler {
    adapters: Vec<Box<dyn FeedAdapter>>,
    broadcaster: Broadcaster,
    destinations: Arc<dyn Destinations>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        adapters: Vec<Box<dyn FeedAdapter>>,
        broadcaster: Broadcaster,
        destinations: Arc<dyn Destinations>,
    ) -> Self {
        Self {
            adapters,
            broadcaster,
            destinations,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn adapter_names(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.name().to_string()).collect()
    }

    /// Poll every adapter in turn and broadcast whatever is new.
    ///
    /// Adapters swallow their own fetch errors, so one broken feed never
    /// keeps the others from running.
    pub async fn run_cycle(&mut self) -> CycleSummary {
        crate::ingest::ensure_metrics_described();
        let mut summary = CycleSummary {
            adapters: self.adapters.len(),
            ..CycleSummary::default()
        };

        for adapter in self.adapters.iter_mut() {
            tracing::debug!(feed = adapter.name(), "checking feed");
            let items = adapter.poll_for_new().await;
            if items.is_empty() {
                continue;
            }
            summary.new_items += items.len();

            let destinations = self.destinations.snapshot();
            if destinations.is_empty() {
                tracing::info!(
                    feed = adapter.name(),
                    new = items.len(),
                    "no subscribed destinations; items dropped"
                );
                continue;
            }
            let report = self
                .broadcaster
                .deliver(adapter.kind(), &items, &destinations)
                .await;
            summary.attempted += report.attempted;
            summary.delivered += report.delivered;
            summary.failed += report.failures.len();
        }

        let now = chrono::Utc::now().timestamp().max(0) as f64;
        gauge!("scheduler_last_cycle_ts").set(now);
        summary
    }

    /// Run one cycle immediately, then every `interval`. Ticks never overlap:
    /// a slow cycle delays the next one instead of running alongside it.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.interval.max(Duration::from_millis(1));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(
                interval_secs = self.interval.as_secs(),
                feeds = ?self.adapter_names(),
                "scheduler started"
            );
            loop {
                ticker.tick().await;
                let s = self.run_cycle().await;
                tracing::info!(
                    new_items = s.new_items,
                    attempted = s.attempted,
                    delivered = s.delivered,
                    failed = s.failed,
                    "broadcast cycle done"
                );
            }
        })
    }
}
