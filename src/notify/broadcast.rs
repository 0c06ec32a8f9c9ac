//! Fan-out of new items to every subscribed destination.
//!
//! Each item is sent to all destinations as one bounded concurrent batch and
//! every destination's outcome is captured on its own. A failing destination
//! is logged and skipped; it never aborts the remaining sends.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use metrics::counter;

use super::{Notifier, NotificationStyle};
use crate::ingest::types::{FeedKind, Item};

pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub source_id: String,
    pub target_id: String,
    pub item: String,
    pub error: String,
}

/// Informational outcome of one `deliver` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failures: Vec<DeliveryFailure>,
}

pub struct Broadcaster {
    notifier: Arc<dyn Notifier>,
    style: NotificationStyle,
    max_in_flight: usize,
}

impl Broadcaster {
    pub fn new(notifier: Arc<dyn Notifier>, style: NotificationStyle) -> Self {
        Self {
            notifier,
            style,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Upper bound on concurrent sends for one item (at least 1).
    pub fn with_max_in_flight(mut self, n: usize) -> Self {
        self.max_in_flight = n.max(1);
        self
    }

    /// Send every item, in the order given, to every destination.
    ///
    /// `destinations` maps source id (guild) to target id (channel).
    pub async fn deliver(
        &self,
        kind: FeedKind,
        items: &[Item],
        destinations: &BTreeMap<String, String>,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        if items.is_empty() || destinations.is_empty() {
            return report;
        }
        let feed = kind.label();

        for item in items {
            let notification = Arc::new(self.style.notification(kind, item));

            // Owned pairs keep the batch future `Send` for the spawned scheduler.
            let outcomes: Vec<_> = stream::iter(destinations.clone())
                .map(|(source_id, target_id)| {
                    let notifier = Arc::clone(&self.notifier);
                    let notification = Arc::clone(&notification);
                    async move {
                        let res = notifier.send(&target_id, &notification).await;
                        (source_id, target_id, res)
                    }
                })
                .buffer_unordered(self.max_in_flight)
                .collect()
                .await;

            for (source_id, target_id, res) in outcomes {
                report.attempted += 1;
                counter!("delivery_attempts_total", "feed" => feed).increment(1);
                match res {
                    Ok(()) => report.delivered += 1,
                    Err(e) => {
                        tracing::warn!(
                            guild = %source_id,
                            channel = %target_id,
                            item = %item.identifier,
                            "delivery failed: {e:#}"
                        );
                        counter!("delivery_failures_total", "feed" => feed).increment(1);
                        report.failures.push(DeliveryFailure {
                            source_id,
                            target_id,
                            item: item.identifier.clone(),
                            error: format!("{e:#}"),
                        });
                    }
                }
            }
        }

        tracing::info!(
            feed,
            items = items.len(),
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failures.len(),
            "broadcast finished"
        );
        report
    }
}
