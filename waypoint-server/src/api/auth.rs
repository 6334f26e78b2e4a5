use axum::{extract::State, http::HeaderMap, Json};

use crate::{
    api::{ApiError, ApiResult},
    auth::auth_context,
    db::repositories::UserRepository,
    state::AppState,
};
use waypoint_types::{LoginRequest, LoginResponse};

/// POST /auth/login
///
/// Development login: exchanges a known username for a session token.
/// Credential checking belongs to the authentication collaborator.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = UserRepository::new(state.db.pool.clone())
        .get_by_username(&request.username)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let session_token = state.session_manager.create_session(user.id)?;

    tracing::info!("User {} logged in", user.username);
    Ok(Json(LoginResponse {
        user,
        session_token,
    }))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    auth_context(&state, &headers)?;

    let token = headers
        .get("X-Session-Token")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing session token".to_string()))?;

    state.session_manager.delete_session(token)?;

    Ok(Json(serde_json::json!({ "message": "logged out" })))
}
