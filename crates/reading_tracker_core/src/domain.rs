//! crates/reading_tracker_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A book in the catalog. Immutable reference data.
#[derive(Debug, Clone)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub year_of_publication: i32,
    pub short_description: Option<String>,
    pub full_description: Option<String>,
    pub pages: Option<i32>,
    pub language: Option<String>,
    pub country: String,
}

/// The fields a catalog maintainer supplies when creating a book.
/// Descriptive fields are optional; `country` falls back to "Unknown".
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub year_of_publication: i32,
    pub short_description: Option<String>,
    pub full_description: Option<String>,
    pub pages: Option<i32>,
    pub language: Option<String>,
    pub country: Option<String>,
}

/// A timed reading session of one user against one book.
///
/// An open session has `end_time = None`. Per user there is at most one
/// open session at any time; `SessionTracker` enforces this.
#[derive(Debug, Clone)]
pub struct ReadingSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl ReadingSession {
    /// Whether the session is still in progress.
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Duration of the session in seconds, or `None` while it is open.
    pub fn reading_time_secs(&self) -> Option<f64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds() as f64 / 1000.0)
    }
}

/// Cached per-user reading statistics, recomputed by the aggregator.
///
/// Bucket `i` (0-indexed) holds the total reading time, in seconds, of
/// sessions started between `i + 1` and `i` days before the last refresh.
/// The profile is a derived view over the session history and can always
/// be rebuilt from scratch.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub total_reading_time: f64,
    pub reading_time_last_7_days: [f64; 7],
    pub reading_time_last_30_days: [f64; 30],
}

impl UserProfile {
    /// A fresh profile with all totals at zero.
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            total_reading_time: 0.0,
            reading_time_last_7_days: [0.0; 7],
            reading_time_last_30_days: [0.0; 30],
        }
    }
}

// Represents a user - used throughout the app.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
}

// Only used internally for login/signup - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie).
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}
