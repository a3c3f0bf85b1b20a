//! services/api/src/worker.rs
//!
//! Background execution of the statistics aggregator. Requests never run the
//! recompute inline: they enqueue a job on a bounded channel and get an
//! acknowledgment, and a single worker task drains the queue. A failed job
//! is logged and dropped; there is no automatic resubmission.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use reading_tracker_core::statistics::StatisticsAggregator;

/// A unit of work for the statistics worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsJob {
    /// Recompute one user's profile (the on-demand path).
    RefreshUser(Uuid),
    /// Recompute every user's profile (the nightly path).
    RefreshAll,
}

/// Drains the statistics job queue.
pub struct StatsWorker {
    aggregator: Arc<StatisticsAggregator>,
    jobs: mpsc::Receiver<StatsJob>,
}

impl StatsWorker {
    pub fn new(aggregator: Arc<StatisticsAggregator>, jobs: mpsc::Receiver<StatsJob>) -> Self {
        Self { aggregator, jobs }
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("statistics worker started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                job = self.jobs.recv() => match job {
                    Some(job) => self.handle(job).await,
                    None => break,
                },
            }
        }
        info!("statistics worker stopped");
    }

    async fn handle(&self, job: StatsJob) {
        let result = match job {
            StatsJob::RefreshUser(user_id) => {
                self.aggregator.refresh_user_statistics(user_id).await
            }
            StatsJob::RefreshAll => self.aggregator.refresh_all_users().await,
        };
        if let Err(e) = result {
            error!("statistics job {:?} failed: {}", job, e);
        }
    }
}

/// Queues a `RefreshAll` job once a day at `at` (UTC wall clock).
pub fn spawn_daily_schedule(
    jobs: mpsc::Sender<StatsJob>,
    at: NaiveTime,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = next_run(now, at);
            let wait = (next - now).to_std().unwrap_or(StdDuration::ZERO);
            info!(at = %next, "next nightly statistics run scheduled");

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(wait) => {
                    if jobs.send(StatsJob::RefreshAll).await.is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// The next occurrence of `at`, strictly after `now`.
fn next_run(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = Utc.from_utc_datetime(&now.date_naive().and_time(at));
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}
