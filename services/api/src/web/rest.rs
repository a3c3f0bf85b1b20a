//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use reading_tracker_core::domain::{Book, NewBook, ReadingSession, UserProfile};
use reading_tracker_core::ports::PortError;
use reading_tracker_core::sessions::BookView;

use crate::web::state::AppState;
use crate::worker::StatsJob;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        list_books_handler,
        create_book_handler,
        book_detail_handler,
        book_reading_time_handler,
        list_sessions_handler,
        start_session_handler,
        end_session_handler,
        user_statistics_handler,
        refresh_statistics_handler,
    ),
    components(schemas(
        crate::web::auth::SignupRequest,
        crate::web::auth::LoginRequest,
        crate::web::auth::AuthResponse,
        BookResponse,
        CreateBookRequest,
        ReadingSessionResponse,
        BookReadingTimeResponse,
        UserProfileResponse,
        RefreshAck,
    )),
    tags(
        (name = "Reading Tracker API", description = "Books, reading sessions and per-user reading statistics.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct BookResponse {
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

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            year_of_publication: book.year_of_publication,
            short_description: book.short_description,
            full_description: book.full_description,
            pages: book.pages,
            language: book.language,
            country: book.country,
        }
    }
}

/// Payload for creating a book. Fields are optional at the serde level so
/// that a missing required field maps to 400 rather than a rejection from
/// the extractor.
#[derive(Deserialize, ToSchema)]
pub struct CreateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year_of_publication: Option<i32>,
    pub short_description: Option<String>,
    pub full_description: Option<String>,
    pub pages: Option<i32>,
    pub language: Option<String>,
    pub country: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ReadingSessionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub start_time: DateTime<Utc>,
    /// `null` while the session is in progress.
    pub end_time: Option<DateTime<Utc>>,
    /// Duration in seconds, once the session is closed.
    pub reading_time: Option<f64>,
}

impl From<ReadingSession> for ReadingSessionResponse {
    fn from(session: ReadingSession) -> Self {
        Self {
            reading_time: session.reading_time_secs(),
            id: session.id,
            user_id: session.user_id,
            book_id: session.book_id,
            start_time: session.start_time,
            end_time: session.end_time,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct BookReadingTimeResponse {
    pub id: Uuid,
    pub title: String,
    /// Total seconds across all users' closed sessions of this book.
    pub total_reading_time: f64,
}

#[derive(Serialize, ToSchema)]
pub struct UserProfileResponse {
    pub user_id: Uuid,
    pub total_reading_time: f64,
    pub reading_time_last_7_days: Vec<f64>,
    pub reading_time_last_30_days: Vec<f64>,
}

impl From<UserProfile> for UserProfileResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            user_id: profile.user_id,
            total_reading_time: profile.total_reading_time,
            reading_time_last_7_days: profile.reading_time_last_7_days.to_vec(),
            reading_time_last_30_days: profile.reading_time_last_30_days.to_vec(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct RefreshAck {
    pub status: String,
}

/// Maps a port error to the HTTP taxonomy: NotFound 404, Unauthorized 401,
/// anything else 500 (logged, with a generic message to the caller).
fn port_error(context: &str, err: PortError) -> (StatusCode, String) {
    match err {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(msg) => {
            error!("{}: {}", context, msg);
            (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
        }
    }
}

//=========================================================================================
// Book Catalog Handlers
//=========================================================================================

/// List all books in the catalog.
#[utoipa::path(
    get,
    path = "/books/",
    responses(
        (status = 200, description = "All books", body = [BookResponse]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_books_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let books = state
        .store
        .list_books()
        .await
        .map_err(|e| port_error("Failed to list books", e))?;
    let books: Vec<BookResponse> = books.into_iter().map(BookResponse::from).collect();
    Ok(Json(books))
}

/// Create a book. `title`, `author` and `year_of_publication` are required.
#[utoipa::path(
    post,
    path = "/books/",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Missing or invalid required fields"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_book_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut missing = Vec::new();
    if req.title.as_deref().map_or(true, str::is_empty) {
        missing.push("title");
    }
    if req.author.as_deref().map_or(true, str::is_empty) {
        missing.push("author");
    }
    if req.year_of_publication.is_none() {
        missing.push("year_of_publication");
    }
    if !missing.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Missing required fields: {}", missing.join(", ")),
        ));
    }
    if req.pages.map_or(false, |p| p < 1) {
        return Err((
            StatusCode::BAD_REQUEST,
            "pages must be a positive integer".to_string(),
        ));
    }

    let new_book = NewBook {
        title: req.title.unwrap_or_default(),
        author: req.author.unwrap_or_default(),
        year_of_publication: req.year_of_publication.unwrap_or_default(),
        short_description: req.short_description,
        full_description: req.full_description,
        pages: req.pages,
        language: req.language,
        country: req.country,
    };

    let book = state
        .store
        .create_book(new_book)
        .await
        .map_err(|e| port_error("Failed to create book", e))?;
    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

/// Book detail. When the caller has an open reading session on this book,
/// the response is that session (with its `null` end_time) instead of the
/// static book record.
#[utoipa::path(
    get,
    path = "/books/{id}/",
    params(("id" = Uuid, Path, description = "Book id")),
    responses(
        (status = 200, description = "Book detail, or the caller's open session on it", body = BookResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn book_detail_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<Response, (StatusCode, String)> {
    let view = state
        .tracker
        .active_or_static(user_id, id)
        .await
        .map_err(|e| port_error("Failed to load book", e))?;
    Ok(match view {
        BookView::Active(session) => Json(ReadingSessionResponse::from(session)).into_response(),
        BookView::Static(book) => Json(BookResponse::from(book)).into_response(),
    })
}

/// Total closed-session reading time of a book, across all users.
#[utoipa::path(
    get,
    path = "/books/{id}/reading-time/",
    params(("id" = Uuid, Path, description = "Book id")),
    responses(
        (status = 200, description = "Aggregate reading time", body = BookReadingTimeResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn book_reading_time_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let book = state
        .store
        .get_book(id)
        .await
        .map_err(|e| port_error("Failed to load book", e))?;
    let total_reading_time = state
        .tracker
        .book_total_reading_time(id)
        .await
        .map_err(|e| port_error("Failed to compute reading time", e))?;
    Ok(Json(BookReadingTimeResponse {
        id: book.id,
        title: book.title,
        total_reading_time,
    }))
}

//=========================================================================================
// Reading Session Handlers
//=========================================================================================

/// List all reading sessions.
#[utoipa::path(
    get,
    path = "/reading-sessions/",
    responses(
        (status = 200, description = "All reading sessions", body = [ReadingSessionResponse]),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let sessions = state
        .store
        .list_sessions()
        .await
        .map_err(|e| port_error("Failed to list sessions", e))?;
    let sessions: Vec<ReadingSessionResponse> = sessions
        .into_iter()
        .map(ReadingSessionResponse::from)
        .collect();
    Ok(Json(sessions))
}

/// Start a reading session for the caller on the given book. An open
/// session on a different book is closed implicitly; starting again on the
/// same book returns the already-open session.
#[utoipa::path(
    post,
    path = "/start-reading-session/{book_id}/",
    params(("book_id" = Uuid, Path, description = "Book id")),
    responses(
        (status = 201, description = "Session open", body = ReadingSessionResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn start_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .tracker
        .start_session(user_id, book_id)
        .await
        .map_err(|e| port_error("Failed to start session", e))?;
    Ok((
        StatusCode::CREATED,
        Json(ReadingSessionResponse::from(session)),
    ))
}

/// End the caller's open session on the given book.
#[utoipa::path(
    patch,
    path = "/end-reading-session/{book_id}/",
    params(("book_id" = Uuid, Path, description = "Book id")),
    responses(
        (status = 200, description = "Session closed", body = ReadingSessionResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No open session on this book")
    )
)]
pub async fn end_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .tracker
        .end_session(user_id, book_id)
        .await
        .map_err(|e| port_error("Failed to end session", e))?;
    Ok(Json(ReadingSessionResponse::from(session)))
}

//=========================================================================================
// Statistics Handlers
//=========================================================================================

/// The caller's statistics profile, created with zeroed totals on first
/// access. Bucket values refresh on the nightly run or an explicit refresh.
#[utoipa::path(
    get,
    path = "/user-statistics/",
    responses(
        (status = 200, description = "The caller's statistics profile", body = UserProfileResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Caller identity no longer exists")
    )
)]
pub async fn user_statistics_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = state
        .store
        .get_or_create_profile(user_id)
        .await
        .map_err(|e| port_error("Failed to load statistics", e))?;
    Ok(Json(UserProfileResponse::from(profile)))
}

/// Queue a statistics refresh for the caller. Fire-and-forget: the response
/// acknowledges the dispatch, not the recomputation.
#[utoipa::path(
    post,
    path = "/user-statistics/refresh/",
    responses(
        (status = 200, description = "Refresh job queued", body = RefreshAck),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Job queue unavailable")
    )
)]
pub async fn refresh_statistics_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .stats_jobs
        .send(StatsJob::RefreshUser(user_id))
        .await
        .map_err(|e| {
            error!("Failed to queue statistics refresh: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to queue statistics refresh".to_string(),
            )
        })?;
    Ok(Json(RefreshAck {
        status: "Task triggered successfully".to_string(),
    }))
}
