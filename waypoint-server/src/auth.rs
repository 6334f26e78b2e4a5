use axum::http::HeaderMap;
use uuid::Uuid;

use waypoint_types::UserRole;

use crate::{api::ApiError, db::repositories::UserRepository, state::AppState};

/// The authenticated caller, resolved from the session token by the
/// auth collaborator's tables.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

/// Resolve the caller from the `X-Session-Token` header. Every
/// authenticated endpoint goes through here.
pub fn auth_context(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, ApiError> {
    let token = headers
        .get("X-Session-Token")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing session token".to_string()))?;

    let user_id = state
        .session_manager
        .validate_session(token)
        .map_err(|_| ApiError::Unauthorized("Invalid session token".to_string()))?;

    let user = UserRepository::new(state.db.pool.clone())
        .get_by_id(&user_id)?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

    Ok(AuthContext {
        user_id: user.id,
        username: user.username,
        role: user.role,
    })
}

/// The one authorization rule for comment deletion, shared by every
/// mutating entry point: the author, or a privileged role.
pub fn can_delete_comment(ctx: &AuthContext, author_id: &Uuid) -> bool {
    ctx.user_id == *author_id || ctx.role.is_privileged()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(user_id: Uuid, role: UserRole) -> AuthContext {
        AuthContext {
            user_id,
            username: "someone".to_string(),
            role,
        }
    }

    #[test]
    fn test_author_may_delete_own_comment() {
        let author = Uuid::new_v4();
        assert!(can_delete_comment(&ctx(author, UserRole::User), &author));
    }

    #[test]
    fn test_moderator_may_delete_any_comment() {
        let author = Uuid::new_v4();
        assert!(can_delete_comment(
            &ctx(Uuid::new_v4(), UserRole::Moderator),
            &author
        ));
    }

    #[test]
    fn test_other_users_may_not_delete() {
        let author = Uuid::new_v4();
        assert!(!can_delete_comment(
            &ctx(Uuid::new_v4(), UserRole::User),
            &author
        ));
    }
}
