//! crates/reading_tracker_core/src/statistics.rs
//!
//! Recomputes the cached per-user reading statistics: one total plus 7 + 30
//! rolling single-day buckets. Day boundaries are anchored at the moment the
//! job runs, not at calendar midnight. Every run is a full recompute; the
//! profile is never updated incrementally.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::ReadingSession;
use crate::ports::{PortResult, TrackerStore};

pub struct StatisticsAggregator {
    store: Arc<dyn TrackerStore>,
}

impl StatisticsAggregator {
    pub fn new(store: Arc<dyn TrackerStore>) -> Self {
        Self { store }
    }

    /// Rebuilds the statistics profile of one user.
    ///
    /// Unknown user ids complete without error and without effect: the job
    /// has no caller waiting on it, so there is nobody to surface a failure
    /// to. A missing profile is created with defaults before writing.
    pub async fn refresh_user_statistics(&self, user_id: Uuid) -> PortResult<()> {
        self.refresh_at(user_id, Utc::now()).await
    }

    /// Rebuilds the profiles of every known user, for the nightly run.
    pub async fn refresh_all_users(&self) -> PortResult<()> {
        let user_ids = self.store.list_user_ids().await?;
        info!(users = user_ids.len(), "refreshing statistics for all users");
        for user_id in user_ids {
            self.refresh_user_statistics(user_id).await?;
        }
        Ok(())
    }

    async fn refresh_at(&self, user_id: Uuid, now: DateTime<Utc>) -> PortResult<()> {
        if !self.store.user_exists(user_id).await? {
            debug!(user_id = %user_id, "statistics refresh for unknown user, skipping");
            return Ok(());
        }

        let mut profile = self.store.get_or_create_profile(user_id).await?;
        let sessions = self.store.list_sessions_for_user(user_id).await?;

        profile.total_reading_time = sessions
            .iter()
            .filter_map(ReadingSession::reading_time_secs)
            .sum();
        profile.reading_time_last_7_days = daily_totals(&sessions, now);
        profile.reading_time_last_30_days = daily_totals(&sessions, now);

        self.store.upsert_profile(&profile).await
    }
}

/// Sums closed-session durations into `DAYS` single-day buckets.
///
/// Bucket index `i` covers `[now - (i + 1) days, now - i days)`, judged by
/// the session's `start_time`. Sessions without an `end_time` are excluded
/// no matter where they started.
fn daily_totals<const DAYS: usize>(
    sessions: &[ReadingSession],
    now: DateTime<Utc>,
) -> [f64; DAYS] {
    let mut totals = [0.0; DAYS];
    for (i, bucket) in totals.iter_mut().enumerate() {
        let from = now - Duration::days(i as i64 + 1);
        let until = from + Duration::days(1);
        *bucket = sessions
            .iter()
            .filter(|s| s.start_time >= from && s.start_time < until)
            .filter_map(ReadingSession::reading_time_secs)
            .sum();
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewBook;
    use crate::memory::InMemoryStore;

    fn book_fixture() -> NewBook {
        NewBook {
            title: "Statistics Fixture".to_string(),
            author: "Test Author".to_string(),
            year_of_publication: 2023,
            short_description: None,
            full_description: None,
            pages: None,
            language: None,
            country: None,
        }
    }

    async fn setup() -> (Arc<InMemoryStore>, StatisticsAggregator, Uuid, Uuid) {
        let store = Arc::new(InMemoryStore::new());
        let user = store
            .create_user_with_email("reader@example.com", "hash")
            .await
            .unwrap();
        let book = store.create_book(book_fixture()).await.unwrap();
        let aggregator = StatisticsAggregator::new(store.clone());
        (store, aggregator, user.user_id, book.id)
    }

    /// A closed session of `secs` seconds that started `days_ago` days
    /// before `now`, shifted an hour into the bucket to stay clear of
    /// its edges.
    async fn closed_session(
        store: &InMemoryStore,
        user_id: Uuid,
        book_id: Uuid,
        now: DateTime<Utc>,
        days_ago: i64,
        secs: i64,
    ) {
        let start = now - Duration::days(days_ago) + Duration::hours(1);
        let session = store.create_session(user_id, book_id, start).await.unwrap();
        store
            .close_session(session.id, start + Duration::seconds(secs))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn refresh_without_sessions_creates_an_all_zero_profile() {
        let (store, aggregator, user_id, _book_id) = setup().await;

        aggregator.refresh_user_statistics(user_id).await.unwrap();

        let profile = store.get_or_create_profile(user_id).await.unwrap();
        assert_eq!(profile.total_reading_time, 0.0);
        assert_eq!(profile.reading_time_last_7_days, [0.0; 7]);
        assert_eq!(profile.reading_time_last_30_days, [0.0; 30]);
    }

    #[tokio::test]
    async fn refresh_for_unknown_user_is_a_no_op() {
        let (store, aggregator, _user_id, _book_id) = setup().await;

        let ghost = Uuid::new_v4();
        aggregator.refresh_user_statistics(ghost).await.unwrap();
        assert!(!store.has_profile(ghost));
    }

    #[tokio::test]
    async fn sessions_land_in_the_bucket_of_their_start_day() {
        let (store, aggregator, user_id, book_id) = setup().await;
        let now = Utc::now();

        closed_session(&store, user_id, book_id, now, 1, 600).await;
        closed_session(&store, user_id, book_id, now, 3, 1200).await;
        closed_session(&store, user_id, book_id, now, 12, 900).await;

        aggregator.refresh_at(user_id, now).await.unwrap();

        let profile = store.get_or_create_profile(user_id).await.unwrap();
        assert_eq!(profile.reading_time_last_7_days[0], 600.0);
        assert_eq!(profile.reading_time_last_7_days[2], 1200.0);
        // Day 12 is outside the 7-day window but inside the 30-day one.
        assert_eq!(profile.reading_time_last_7_days.iter().sum::<f64>(), 1800.0);
        assert_eq!(profile.reading_time_last_30_days[11], 900.0);
        assert_eq!(profile.reading_time_last_30_days[0], 600.0);
        assert_eq!(profile.total_reading_time, 2700.0);
    }

    #[tokio::test]
    async fn open_sessions_are_excluded_from_every_bucket() {
        let (store, aggregator, user_id, book_id) = setup().await;
        let now = Utc::now();

        closed_session(&store, user_id, book_id, now, 2, 300).await;
        store
            .create_session(user_id, book_id, now - Duration::hours(5))
            .await
            .unwrap();

        aggregator.refresh_at(user_id, now).await.unwrap();

        let profile = store.get_or_create_profile(user_id).await.unwrap();
        assert_eq!(profile.total_reading_time, 300.0);
        assert_eq!(profile.reading_time_last_7_days[0], 0.0);
        assert_eq!(profile.reading_time_last_7_days[1], 300.0);
    }

    #[tokio::test]
    async fn refresh_is_idempotent_for_a_fixed_now() {
        let (store, aggregator, user_id, book_id) = setup().await;
        let now = Utc::now();

        closed_session(&store, user_id, book_id, now, 1, 450).await;

        aggregator.refresh_at(user_id, now).await.unwrap();
        let first = store.get_or_create_profile(user_id).await.unwrap();
        aggregator.refresh_at(user_id, now).await.unwrap();
        let second = store.get_or_create_profile(user_id).await.unwrap();

        assert_eq!(first.total_reading_time, second.total_reading_time);
        assert_eq!(first.reading_time_last_7_days, second.reading_time_last_7_days);
        assert_eq!(first.reading_time_last_30_days, second.reading_time_last_30_days);
    }

    #[tokio::test]
    async fn refresh_all_users_covers_every_identity() {
        let (store, aggregator, user_id, book_id) = setup().await;
        let second = store
            .create_user_with_email("other@example.com", "hash")
            .await
            .unwrap();
        let now = Utc::now();
        closed_session(&store, user_id, book_id, now, 1, 60).await;

        aggregator.refresh_all_users().await.unwrap();

        assert!(store.has_profile(user_id));
        assert!(store.has_profile(second.user_id));
    }
}
