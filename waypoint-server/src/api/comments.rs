use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use uuid::Uuid;

use crate::{
    api::{ApiError, ApiResult},
    auth::auth_context,
    feed::{FeedService, SubjectRef},
    state::AppState,
};
use waypoint_types::{Comment, CreateCommentRequest, SubjectType};

fn parse_subject(id: &str, subject_type: SubjectType) -> Result<SubjectRef, ApiError> {
    let id = Uuid::parse_str(id).map_err(|_| {
        ApiError::InvalidInput(match subject_type {
            SubjectType::Review => "Invalid review ID".to_string(),
            SubjectType::BadgeNotification => "Invalid badge announcement ID".to_string(),
        })
    })?;
    Ok(SubjectRef { id, subject_type })
}

fn parse_comment_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::InvalidInput("Invalid comment ID".to_string()))
}

async fn list_comments(
    state: AppState,
    headers: HeaderMap,
    subject: SubjectRef,
) -> ApiResult<Json<Vec<Comment>>> {
    auth_context(&state, &headers)?;

    let service = FeedService::new(state.db.pool.clone());
    let comments = service.comments(subject)?;

    Ok(Json(comments))
}

async fn create_comment(
    state: AppState,
    headers: HeaderMap,
    subject: SubjectRef,
    request: CreateCommentRequest,
) -> ApiResult<Json<Comment>> {
    let ctx = auth_context(&state, &headers)?;

    let service = FeedService::new(state.db.pool.clone());
    let comment = service.add_comment(subject, &ctx, &request.content)?;

    Ok(Json(comment))
}

async fn delete_comment(
    state: AppState,
    headers: HeaderMap,
    subject: SubjectRef,
    comment_id: Uuid,
) -> ApiResult<Json<serde_json::Value>> {
    let ctx = auth_context(&state, &headers)?;

    let service = FeedService::new(state.db.pool.clone());
    service.delete_comment(subject, &comment_id, &ctx)?;

    Ok(Json(serde_json::json!({
        "message": "comment deleted",
        "comment_id": comment_id,
    })))
}

/// GET /feed/reviews/:id/comments
pub async fn get_review_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Comment>>> {
    let subject = parse_subject(&id, SubjectType::Review)?;
    list_comments(state, headers, subject).await
}

/// POST /feed/reviews/:id/comments
pub async fn post_review_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<CreateCommentRequest>,
) -> ApiResult<Json<Comment>> {
    let subject = parse_subject(&id, SubjectType::Review)?;
    create_comment(state, headers, subject, request).await
}

/// DELETE /feed/reviews/:id/comments/:comment_id
pub async fn delete_review_comment(
    State(state): State<AppState>,
    Path((id, comment_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let subject = parse_subject(&id, SubjectType::Review)?;
    let comment_id = parse_comment_id(&comment_id)?;
    delete_comment(state, headers, subject, comment_id).await
}

/// GET /feed/badges/:id/comments
pub async fn get_badge_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Comment>>> {
    let subject = parse_subject(&id, SubjectType::BadgeNotification)?;
    list_comments(state, headers, subject).await
}

/// POST /feed/badges/:id/comments
pub async fn post_badge_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<CreateCommentRequest>,
) -> ApiResult<Json<Comment>> {
    let subject = parse_subject(&id, SubjectType::BadgeNotification)?;
    create_comment(state, headers, subject, request).await
}

/// DELETE /feed/badges/:id/comments/:comment_id
pub async fn delete_badge_comment(
    State(state): State<AppState>,
    Path((id, comment_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let subject = parse_subject(&id, SubjectType::BadgeNotification)?;
    let comment_id = parse_comment_id(&comment_id)?;
    delete_comment(state, headers, subject, comment_id).await
}
