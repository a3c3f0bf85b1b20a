//! crates/reading_tracker_core/src/ports.rs
//!
//! Defines the storage contract (trait) for the application's core logic.
//! The trait forms the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete database behind it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Book, NewBook, ReadingSession, User, UserCredentials, UserProfile};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from the storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Port (Trait)
//=========================================================================================

/// Durable storage for users, books, sessions and statistics profiles.
///
/// All queries are single-entity reads and writes; there are no
/// multi-entity transactions. Serialization of the session state machine
/// is the caller's concern (see `SessionTracker`).
#[async_trait]
pub trait TrackerStore: Send + Sync {
    // --- User Identities ---
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn user_exists(&self, user_id: Uuid) -> PortResult<bool>;

    /// Every known user identity, for the nightly statistics fan-out.
    async fn list_user_ids(&self) -> PortResult<Vec<Uuid>>;

    // --- Auth Sessions (login cookies) ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a cookie token to a user id. Expired or unknown tokens
    /// fail with `PortError::Unauthorized`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Book Catalog ---
    async fn create_book(&self, book: NewBook) -> PortResult<Book>;

    async fn get_book(&self, book_id: Uuid) -> PortResult<Book>;

    async fn list_books(&self) -> PortResult<Vec<Book>>;

    // --- Reading Sessions ---
    async fn create_session(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        start_time: DateTime<Utc>,
    ) -> PortResult<ReadingSession>;

    /// The user's open session, on any book.
    async fn find_open_session(&self, user_id: Uuid) -> PortResult<Option<ReadingSession>>;

    /// The user's open session on a specific book.
    async fn find_open_session_for_book(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> PortResult<Option<ReadingSession>>;

    /// Sets `end_time` on an open session. Fails with `NotFound` when the
    /// session does not exist or is already closed.
    async fn close_session(
        &self,
        session_id: Uuid,
        end_time: DateTime<Utc>,
    ) -> PortResult<ReadingSession>;

    async fn list_sessions(&self) -> PortResult<Vec<ReadingSession>>;

    async fn list_sessions_for_book(&self, book_id: Uuid) -> PortResult<Vec<ReadingSession>>;

    async fn list_sessions_for_user(&self, user_id: Uuid) -> PortResult<Vec<ReadingSession>>;

    // --- Statistics Profiles ---
    /// Fetches the user's profile, materializing an all-zero one if absent.
    /// Fails with `NotFound` when the user identity itself does not exist.
    async fn get_or_create_profile(&self, user_id: Uuid) -> PortResult<UserProfile>;

    /// Writes back a recomputed profile (insert-or-update).
    async fn upsert_profile(&self, profile: &UserProfile) -> PortResult<()>;
}
