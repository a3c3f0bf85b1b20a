//! crates/reading_tracker_core/src/memory.rs
//!
//! An in-memory `TrackerStore`. Backs the unit tests of the core services
//! and the HTTP-level tests of the API service, so both exercise the real
//! code paths without a running database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::domain::{AuthSession, Book, NewBook, ReadingSession, User, UserCredentials, UserProfile};
use crate::ports::{PortError, PortResult, TrackerStore};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserCredentials>,
    auth_sessions: HashMap<String, AuthSession>,
    books: Vec<Book>,
    sessions: Vec<ReadingSession>,
    profiles: HashMap<Uuid, UserProfile>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test-support accessor: whether a statistics profile exists.
    pub fn has_profile(&self, user_id: Uuid) -> bool {
        self.inner.lock().profiles.contains_key(&user_id)
    }
}

#[async_trait]
impl TrackerStore for InMemoryStore {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut inner = self.inner.lock();
        if inner.users.values().any(|u| u.email == email) {
            return Err(PortError::Unexpected(format!(
                "email {} is already registered",
                email
            )));
        }
        let user_id = Uuid::new_v4();
        inner.users.insert(
            user_id,
            UserCredentials {
                user_id,
                email: email.to_string(),
                hashed_password: hashed_password.to_string(),
            },
        );
        Ok(User {
            user_id,
            email: Some(email.to_string()),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.inner
            .lock()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn user_exists(&self, user_id: Uuid) -> PortResult<bool> {
        Ok(self.inner.lock().users.contains_key(&user_id))
    }

    async fn list_user_ids(&self) -> PortResult<Vec<Uuid>> {
        Ok(self.inner.lock().users.keys().copied().collect())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.inner.lock().auth_sessions.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        self.inner
            .lock()
            .auth_sessions
            .get(session_id)
            .filter(|s| s.expires_at > Utc::now())
            .map(|s| s.user_id)
            .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.inner.lock().auth_sessions.remove(session_id);
        Ok(())
    }

    async fn create_book(&self, book: NewBook) -> PortResult<Book> {
        let book = Book {
            id: Uuid::new_v4(),
            title: book.title,
            author: book.author,
            year_of_publication: book.year_of_publication,
            short_description: book.short_description,
            full_description: book.full_description,
            pages: book.pages,
            language: book.language,
            country: book.country.unwrap_or_else(|| "Unknown".to_string()),
        };
        self.inner.lock().books.push(book.clone());
        Ok(book)
    }

    async fn get_book(&self, book_id: Uuid) -> PortResult<Book> {
        self.inner
            .lock()
            .books
            .iter()
            .find(|b| b.id == book_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))
    }

    async fn list_books(&self) -> PortResult<Vec<Book>> {
        Ok(self.inner.lock().books.clone())
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        start_time: DateTime<Utc>,
    ) -> PortResult<ReadingSession> {
        let session = ReadingSession {
            id: Uuid::new_v4(),
            user_id,
            book_id,
            start_time,
            end_time: None,
        };
        self.inner.lock().sessions.push(session.clone());
        Ok(session)
    }

    async fn find_open_session(&self, user_id: Uuid) -> PortResult<Option<ReadingSession>> {
        Ok(self
            .inner
            .lock()
            .sessions
            .iter()
            .find(|s| s.user_id == user_id && s.end_time.is_none())
            .cloned())
    }

    async fn find_open_session_for_book(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> PortResult<Option<ReadingSession>> {
        Ok(self
            .inner
            .lock()
            .sessions
            .iter()
            .find(|s| s.user_id == user_id && s.book_id == book_id && s.end_time.is_none())
            .cloned())
    }

    async fn close_session(
        &self,
        session_id: Uuid,
        end_time: DateTime<Utc>,
    ) -> PortResult<ReadingSession> {
        let mut inner = self.inner.lock();
        let session = inner
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id && s.end_time.is_none())
            .ok_or_else(|| PortError::NotFound(format!("Open session {} not found", session_id)))?;
        session.end_time = Some(end_time);
        Ok(session.clone())
    }

    async fn list_sessions(&self) -> PortResult<Vec<ReadingSession>> {
        Ok(self.inner.lock().sessions.clone())
    }

    async fn list_sessions_for_book(&self, book_id: Uuid) -> PortResult<Vec<ReadingSession>> {
        Ok(self
            .inner
            .lock()
            .sessions
            .iter()
            .filter(|s| s.book_id == book_id)
            .cloned()
            .collect())
    }

    async fn list_sessions_for_user(&self, user_id: Uuid) -> PortResult<Vec<ReadingSession>> {
        Ok(self
            .inner
            .lock()
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_or_create_profile(&self, user_id: Uuid) -> PortResult<UserProfile> {
        let mut inner = self.inner.lock();
        if !inner.users.contains_key(&user_id) {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(inner
            .profiles
            .entry(user_id)
            .or_insert_with(|| UserProfile::empty(user_id))
            .clone())
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> PortResult<()> {
        self.inner
            .lock()
            .profiles
            .insert(profile.user_id, profile.clone());
        Ok(())
    }
}
