pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};

use crate::web::auth::{login_handler, logout_handler, signup_handler};
use crate::web::middleware::require_auth;
use crate::web::rest::{
    book_detail_handler, book_reading_time_handler, create_book_handler, end_session_handler,
    list_books_handler, list_sessions_handler, refresh_statistics_handler, start_session_handler,
    user_statistics_handler,
};
use crate::web::state::AppState;

pub use rest::ApiDoc;

/// Builds the application router: public auth routes plus the protected API
/// surface behind the auth middleware. Shared between the server binary and
/// the HTTP tests.
pub fn app_router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    let protected_routes = Router::new()
        .route("/books/", get(list_books_handler).post(create_book_handler))
        .route("/books/{id}/", get(book_detail_handler))
        .route("/books/{id}/reading-time/", get(book_reading_time_handler))
        .route("/reading-sessions/", get(list_sessions_handler))
        .route("/start-reading-session/{book_id}/", post(start_session_handler))
        .route("/end-reading-session/{book_id}/", patch(end_session_handler))
        .route("/user-statistics/", get(user_statistics_handler))
        .route("/user-statistics/refresh/", post(refresh_statistics_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
