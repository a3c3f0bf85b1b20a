//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use tokio::sync::mpsc;

use reading_tracker_core::ports::TrackerStore;
use reading_tracker_core::sessions::SessionTracker;

use crate::worker::StatsJob;

/// The shared application state, created once at startup and passed to all
/// handlers.
///
/// Handlers never talk to the statistics aggregator directly; they enqueue
/// jobs on `stats_jobs` and the worker picks them up.
pub struct AppState {
    pub store: Arc<dyn TrackerStore>,
    pub tracker: SessionTracker,
    pub stats_jobs: mpsc::Sender<StatsJob>,
}

impl AppState {
    pub fn new(store: Arc<dyn TrackerStore>, stats_jobs: mpsc::Sender<StatsJob>) -> Self {
        Self {
            tracker: SessionTracker::new(store.clone()),
            store,
            stats_jobs,
        }
    }
}
