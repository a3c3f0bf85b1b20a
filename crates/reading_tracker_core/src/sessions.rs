//! crates/reading_tracker_core/src/sessions.rs
//!
//! The session state machine. Per user there are two states: Idle (no open
//! session) and Reading (exactly one open session, tied to one book).
//! Starting a session on a different book implicitly closes the previous
//! one; starting again on the same book returns the existing session.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Book, ReadingSession};
use crate::ports::{PortError, PortResult, TrackerStore};

/// What a book lookup resolves to for a given caller: the caller's open
/// session on that book when one exists, otherwise the static record.
#[derive(Debug, Clone)]
pub enum BookView {
    Active(ReadingSession),
    Static(Book),
}

/// Coordinates session starts and ends against the store.
///
/// The auto-close-then-open sequence of `start_session` must not interleave
/// for one user, or two concurrent starts could each observe "no open
/// session" and both insert one. Every user gets a dedicated async mutex
/// from the registry, and all session mutations for that user run under it.
pub struct SessionTracker {
    store: Arc<dyn TrackerStore>,
    user_locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionTracker {
    pub fn new(store: Arc<dyn TrackerStore>) -> Self {
        Self {
            store,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, user_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        self.user_locks
            .lock()
            .entry(user_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Opens a session for `user_id` on `book_id`.
    ///
    /// Fails with `NotFound` when the book does not exist. An open session
    /// on another book is closed with the same timestamp the new session
    /// starts with. An open session on the same book is returned as-is.
    pub async fn start_session(&self, user_id: Uuid, book_id: Uuid) -> PortResult<ReadingSession> {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        let book = self.store.get_book(book_id).await?;
        let now = Utc::now();

        if let Some(open) = self.store.find_open_session(user_id).await? {
            if open.book_id == book.id {
                return Ok(open);
            }
            self.store.close_session(open.id, now).await?;
            info!(user_id = %user_id, closed_book_id = %open.book_id, "auto-closed previous session");
        }

        self.store.create_session(user_id, book.id, now).await
    }

    /// Closes the user's open session on `book_id` and returns it.
    ///
    /// A wrong book id, an already-closed session and no session at all are
    /// indistinguishable: all fail with `NotFound`.
    pub async fn end_session(&self, user_id: Uuid, book_id: Uuid) -> PortResult<ReadingSession> {
        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        let open = self
            .store
            .find_open_session_for_book(user_id, book_id)
            .await?
            .ok_or_else(|| {
                PortError::NotFound(format!("No open reading session on book {}", book_id))
            })?;

        self.store.close_session(open.id, Utc::now()).await
    }

    /// Resolves a book for a caller: their open session on it, or the
    /// static record. A read-time choice, nothing is stored.
    pub async fn active_or_static(&self, user_id: Uuid, book_id: Uuid) -> PortResult<BookView> {
        let book = self.store.get_book(book_id).await?;
        match self
            .store
            .find_open_session_for_book(user_id, book.id)
            .await?
        {
            Some(session) => Ok(BookView::Active(session)),
            None => Ok(BookView::Static(book)),
        }
    }

    /// Total time, in seconds, spent reading `book_id` across all users.
    /// Only closed sessions count; open ones contribute zero. Recomputed on
    /// every call, never cached.
    pub async fn book_total_reading_time(&self, book_id: Uuid) -> PortResult<f64> {
        let book = self.store.get_book(book_id).await?;
        let sessions = self.store.list_sessions_for_book(book.id).await?;
        Ok(sessions
            .iter()
            .filter_map(ReadingSession::reading_time_secs)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewBook;
    use crate::memory::InMemoryStore;
    use chrono::Duration;

    fn new_book(title: &str) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: "Test Author".to_string(),
            year_of_publication: 2023,
            short_description: None,
            full_description: None,
            pages: None,
            language: None,
            country: None,
        }
    }

    async fn setup() -> (Arc<InMemoryStore>, SessionTracker, Uuid, Book) {
        let store = Arc::new(InMemoryStore::new());
        let user = store.create_user_with_email("reader@example.com", "hash").await.unwrap();
        let book = store.create_book(new_book("Test Book")).await.unwrap();
        let tracker = SessionTracker::new(store.clone());
        (store, tracker, user.user_id, book)
    }

    #[tokio::test]
    async fn start_session_opens_a_session() {
        let (_store, tracker, user_id, book) = setup().await;

        let session = tracker.start_session(user_id, book.id).await.unwrap();
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.book_id, book.id);
        assert!(session.is_open());
    }

    #[tokio::test]
    async fn start_session_unknown_book_is_not_found() {
        let (_store, tracker, user_id, _book) = setup().await;

        let err = tracker.start_session(user_id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn start_on_second_book_auto_closes_the_first() {
        let (store, tracker, user_id, book1) = setup().await;
        let book2 = store.create_book(new_book("Another Book")).await.unwrap();

        let first = tracker.start_session(user_id, book1.id).await.unwrap();
        let second = tracker.start_session(user_id, book2.id).await.unwrap();

        let open: Vec<_> = store
            .list_sessions_for_user(user_id)
            .await
            .unwrap()
            .into_iter()
            .filter(ReadingSession::is_open)
            .collect();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, second.id);
        assert_eq!(open[0].book_id, book2.id);

        // The first session was closed at the moment the second one opened.
        let closed = store
            .list_sessions_for_user(user_id)
            .await
            .unwrap()
            .into_iter()
            .find(|s| s.id == first.id)
            .unwrap();
        assert_eq!(closed.end_time, Some(second.start_time));
    }

    #[tokio::test]
    async fn start_on_same_book_returns_existing_session() {
        let (store, tracker, user_id, book) = setup().await;

        let first = tracker.start_session(user_id, book.id).await.unwrap();
        let again = tracker.start_session(user_id, book.id).await.unwrap();
        assert_eq!(first.id, again.id);

        let open_count = store
            .list_sessions_for_user(user_id)
            .await
            .unwrap()
            .iter()
            .filter(|s| s.is_open())
            .count();
        assert_eq!(open_count, 1);
    }

    #[tokio::test]
    async fn end_session_closes_the_open_session() {
        let (store, tracker, user_id, book) = setup().await;

        tracker.start_session(user_id, book.id).await.unwrap();
        let closed = tracker.end_session(user_id, book.id).await.unwrap();
        assert!(closed.end_time.is_some());

        let open_count = store
            .list_sessions_for_user(user_id)
            .await
            .unwrap()
            .iter()
            .filter(|s| s.is_open())
            .count();
        assert_eq!(open_count, 0);
    }

    #[tokio::test]
    async fn end_session_without_open_session_is_not_found() {
        let (store, tracker, user_id, book) = setup().await;

        let err = tracker.end_session(user_id, book.id).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));

        // Nothing was mutated.
        assert!(store.list_sessions_for_user(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ending_twice_is_not_found() {
        let (_store, tracker, user_id, book) = setup().await;

        tracker.start_session(user_id, book.id).await.unwrap();
        tracker.end_session(user_id, book.id).await.unwrap();
        let err = tracker.end_session(user_id, book.id).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn active_or_static_prefers_the_open_session() {
        let (_store, tracker, user_id, book) = setup().await;

        match tracker.active_or_static(user_id, book.id).await.unwrap() {
            BookView::Static(b) => assert_eq!(b.id, book.id),
            BookView::Active(_) => panic!("no session open yet"),
        }

        let session = tracker.start_session(user_id, book.id).await.unwrap();
        match tracker.active_or_static(user_id, book.id).await.unwrap() {
            BookView::Active(s) => {
                assert_eq!(s.id, session.id);
                assert!(s.end_time.is_none());
            }
            BookView::Static(_) => panic!("expected the open session"),
        }
    }

    #[tokio::test]
    async fn book_total_counts_only_closed_sessions() {
        let (store, tracker, user_id, book) = setup().await;

        let t0 = Utc::now() - Duration::hours(2);
        let first = store.create_session(user_id, book.id, t0).await.unwrap();
        store
            .close_session(first.id, t0 + Duration::seconds(1800))
            .await
            .unwrap();
        assert_eq!(tracker.book_total_reading_time(book.id).await.unwrap(), 1800.0);

        // A second closed session adds on top.
        let other_user = store
            .create_user_with_email("second@example.com", "hash")
            .await
            .unwrap();
        let second = store
            .create_session(other_user.user_id, book.id, t0)
            .await
            .unwrap();
        store
            .close_session(second.id, t0 + Duration::seconds(900))
            .await
            .unwrap();
        assert_eq!(tracker.book_total_reading_time(book.id).await.unwrap(), 2700.0);

        // An open session contributes nothing.
        store
            .create_session(user_id, book.id, Utc::now())
            .await
            .unwrap();
        assert_eq!(tracker.book_total_reading_time(book.id).await.unwrap(), 2700.0);
    }

    #[tokio::test]
    async fn concurrent_starts_leave_at_most_one_open_session() {
        let (store, tracker, user_id, book1) = setup().await;
        let book2 = store.create_book(new_book("Racing Book")).await.unwrap();
        let tracker = Arc::new(tracker);

        let a = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.start_session(user_id, book1.id).await })
        };
        let b = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.start_session(user_id, book2.id).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let open_count = store
            .list_sessions_for_user(user_id)
            .await
            .unwrap()
            .iter()
            .filter(|s| s.is_open())
            .count();
        assert_eq!(open_count, 1);
    }
}
