//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of
//! the `TrackerStore` port from the core crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Queries are bound at runtime (no compile-time query verification) so the
//! workspace builds without a reachable database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use reading_tracker_core::domain::{Book, NewBook, ReadingSession, User, UserCredentials, UserProfile};
use reading_tracker_core::ports::{PortError, PortResult, TrackerStore};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `TrackerStore` port.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}

impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct BookRecord {
    id: Uuid,
    title: String,
    author: String,
    year_of_publication: i32,
    short_description: Option<String>,
    full_description: Option<String>,
    pages: Option<i32>,
    language: Option<String>,
    country: String,
}

impl BookRecord {
    fn to_domain(self) -> Book {
        Book {
            id: self.id,
            title: self.title,
            author: self.author,
            year_of_publication: self.year_of_publication,
            short_description: self.short_description,
            full_description: self.full_description,
            pages: self.pages,
            language: self.language,
            country: self.country,
        }
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    user_id: Uuid,
    book_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
}

impl SessionRecord {
    fn to_domain(self) -> ReadingSession {
        ReadingSession {
            id: self.id,
            user_id: self.user_id,
            book_id: self.book_id,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

#[derive(FromRow)]
struct ProfileRecord {
    user_id: Uuid,
    total_reading_time: f64,
    reading_time_last_7_days: Vec<f64>,
    reading_time_last_30_days: Vec<f64>,
}

impl ProfileRecord {
    fn to_domain(self) -> UserProfile {
        UserProfile {
            user_id: self.user_id,
            total_reading_time: self.total_reading_time,
            reading_time_last_7_days: to_fixed(self.reading_time_last_7_days),
            reading_time_last_30_days: to_fixed(self.reading_time_last_30_days),
        }
    }
}

/// Copies a database array into a fixed-size bucket array, zero-padding
/// short rows from before a bucket-count change.
fn to_fixed<const N: usize>(values: Vec<f64>) -> [f64; N] {
    let mut out = [0.0; N];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = value;
    }
    out
}

const SESSION_COLUMNS: &str = "id, user_id, book_id, start_time, end_time";
const BOOK_COLUMNS: &str =
    "id, title, author, year_of_publication, short_description, full_description, pages, language, country";

//=========================================================================================
// `TrackerStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl TrackerStore for PgStore {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING user_id, email, hashed_password",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(User {
            user_id: record.user_id,
            email: Some(record.email),
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;

        Ok(record.to_domain())
    }

    async fn user_exists(&self, user_id: Uuid) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE user_id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn list_user_ids(&self) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM users")
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_book(&self, book: NewBook) -> PortResult<Book> {
        let record = sqlx::query_as::<_, BookRecord>(
            "INSERT INTO books (id, title, author, year_of_publication, short_description, \
             full_description, pages, language, country) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id, title, author, year_of_publication, short_description, \
             full_description, pages, language, country",
        )
        .bind(Uuid::new_v4())
        .bind(book.title)
        .bind(book.author)
        .bind(book.year_of_publication)
        .bind(book.short_description)
        .bind(book.full_description)
        .bind(book.pages)
        .bind(book.language)
        .bind(book.country.unwrap_or_else(|| "Unknown".to_string()))
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.to_domain())
    }

    async fn get_book(&self, book_id: Uuid) -> PortResult<Book> {
        let query = format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS);
        sqlx::query_as::<_, BookRecord>(&query)
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(BookRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("Book {} not found", book_id)))
    }

    async fn list_books(&self) -> PortResult<Vec<Book>> {
        let query = format!("SELECT {} FROM books ORDER BY created_at", BOOK_COLUMNS);
        let records = sqlx::query_as::<_, BookRecord>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(BookRecord::to_domain).collect())
    }

    async fn create_session(
        &self,
        user_id: Uuid,
        book_id: Uuid,
        start_time: DateTime<Utc>,
    ) -> PortResult<ReadingSession> {
        let query = format!(
            "INSERT INTO reading_sessions (id, user_id, book_id, start_time) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            SESSION_COLUMNS
        );
        let record = sqlx::query_as::<_, SessionRecord>(&query)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(book_id)
            .bind(start_time)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn find_open_session(&self, user_id: Uuid) -> PortResult<Option<ReadingSession>> {
        let query = format!(
            "SELECT {} FROM reading_sessions WHERE user_id = $1 AND end_time IS NULL",
            SESSION_COLUMNS
        );
        let record = sqlx::query_as::<_, SessionRecord>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(SessionRecord::to_domain))
    }

    async fn find_open_session_for_book(
        &self,
        user_id: Uuid,
        book_id: Uuid,
    ) -> PortResult<Option<ReadingSession>> {
        let query = format!(
            "SELECT {} FROM reading_sessions \
             WHERE user_id = $1 AND book_id = $2 AND end_time IS NULL",
            SESSION_COLUMNS
        );
        let record = sqlx::query_as::<_, SessionRecord>(&query)
            .bind(user_id)
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(SessionRecord::to_domain))
    }

    async fn close_session(
        &self,
        session_id: Uuid,
        end_time: DateTime<Utc>,
    ) -> PortResult<ReadingSession> {
        // The `end_time IS NULL` guard makes closing an already-closed
        // session indistinguishable from a missing one.
        let query = format!(
            "UPDATE reading_sessions SET end_time = $2 \
             WHERE id = $1 AND end_time IS NULL RETURNING {}",
            SESSION_COLUMNS
        );
        sqlx::query_as::<_, SessionRecord>(&query)
            .bind(session_id)
            .bind(end_time)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(SessionRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("Open session {} not found", session_id)))
    }

    async fn list_sessions(&self) -> PortResult<Vec<ReadingSession>> {
        let query = format!(
            "SELECT {} FROM reading_sessions ORDER BY start_time",
            SESSION_COLUMNS
        );
        let records = sqlx::query_as::<_, SessionRecord>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(SessionRecord::to_domain).collect())
    }

    async fn list_sessions_for_book(&self, book_id: Uuid) -> PortResult<Vec<ReadingSession>> {
        let query = format!(
            "SELECT {} FROM reading_sessions WHERE book_id = $1",
            SESSION_COLUMNS
        );
        let records = sqlx::query_as::<_, SessionRecord>(&query)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(SessionRecord::to_domain).collect())
    }

    async fn list_sessions_for_user(&self, user_id: Uuid) -> PortResult<Vec<ReadingSession>> {
        let query = format!(
            "SELECT {} FROM reading_sessions WHERE user_id = $1",
            SESSION_COLUMNS
        );
        let records = sqlx::query_as::<_, SessionRecord>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(SessionRecord::to_domain).collect())
    }

    async fn get_or_create_profile(&self, user_id: Uuid) -> PortResult<UserProfile> {
        if !self.user_exists(user_id).await? {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }

        sqlx::query("INSERT INTO user_profiles (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT user_id, total_reading_time, reading_time_last_7_days, \
             reading_time_last_30_days FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.to_domain())
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO user_profiles \
             (user_id, total_reading_time, reading_time_last_7_days, reading_time_last_30_days) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE SET \
             total_reading_time = EXCLUDED.total_reading_time, \
             reading_time_last_7_days = EXCLUDED.reading_time_last_7_days, \
             reading_time_last_30_days = EXCLUDED.reading_time_last_30_days",
        )
        .bind(profile.user_id)
        .bind(profile.total_reading_time)
        .bind(profile.reading_time_last_7_days.to_vec())
        .bind(profile.reading_time_last_30_days.to_vec())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}
