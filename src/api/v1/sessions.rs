//! Session endpoints

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::Session;

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub user_id: String,
    pub expiry: String,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id().to_string(),
            user_id: session.user_id().to_string(),
            expiry: session.expiry().to_rfc3339(),
        }
    }
}

/// GET /v1/sessions/{session_id}
///
/// Validates the session under the request deadline; a slow cache answers 504.
pub async fn authorize_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    debug!(session_id = %session_id, "Authorizing session");

    let ctx = state.request_context();
    let session = state.session_service.authorize(&ctx, &session_id).await?;

    Ok(Json(SessionResponse::from(&session)))
}
