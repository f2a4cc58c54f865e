//! User endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::{Cursor, KeyedEntity, User};

/// Response header carrying the next page's cursor, empty on the last page
pub const CURSOR_HEADER: &str = "x-cursor";

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default, alias = "num")]
    pub limit: Option<usize>,
}

/// Public view of a user; the password hash never leaves the server
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id().to_string(),
            username: user.username().to_string(),
            email: user.email().to_string(),
            created_at: user.created_at().to_rfc3339(),
            updated_at: user.updated_at().map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListUsersResponse {
    pub data: Vec<UserResponse>,
    pub next_cursor: String,
}

/// GET /v1/users
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<([(&'static str, String); 1], Json<ListUsersResponse>), ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let cursor = query.cursor.as_deref().and_then(Cursor::from_wire);
    debug!(cursor = ?cursor, limit, "Listing users");

    let ctx = state.request_context();
    let page = state.user_service.list(&ctx, cursor.as_ref(), limit).await?;

    let next_cursor = page.next_cursor_wire().to_string();
    let body = ListUsersResponse {
        data: page.items.iter().map(UserResponse::from).collect(),
        next_cursor: next_cursor.clone(),
    };

    Ok(([(CURSOR_HEADER, next_cursor)], Json(body)))
}

/// GET /v1/users/{user_id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    debug!(user_id = %user_id, "Getting user");

    let ctx = state.request_context();
    let user = state.user_service.get_by_user_id(&ctx, &user_id).await?;

    Ok(Json(UserResponse::from(&user)))
}
