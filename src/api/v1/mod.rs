//! v1 API endpoints

pub mod sessions;
pub mod users;

use axum::{Router, routing::get};

use super::state::AppState;

/// Create v1 API router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list_users))
        .route("/users/{user_id}", get(users::get_user))
        .route("/sessions/{session_id}", get(sessions::authorize_session))
}
