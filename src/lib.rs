// src/lib.rs
// Public library surface for the binary and the integration tests.

pub mod api;
pub mod commands;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod registry;
pub mod state;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::AppConfig;
pub use crate::ingest::scheduler::{CycleSummary, Scheduler};
pub use crate::ingest::types::{FeedAdapter, FeedKind, Item};
pub use crate::notify::{Broadcaster, Notification, Notifier};
pub use crate::registry::{DestinationRegistry, Destinations};
pub use crate::state::WatermarkStore;
