use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use uuid::Uuid;

use crate::{
    api::{ApiError, ApiResult},
    auth::auth_context,
    db::repositories::ReactionOutcome,
    feed::{FeedService, SubjectRef},
    state::AppState,
};
use waypoint_types::{ReactionKind, SubjectType};

fn parse_subject(id: &str, subject_type: SubjectType) -> Result<SubjectRef, ApiError> {
    let id = Uuid::parse_str(id).map_err(|_| {
        ApiError::InvalidInput(match subject_type {
            SubjectType::Review => "Invalid review ID".to_string(),
            SubjectType::BadgeNotification => "Invalid badge announcement ID".to_string(),
        })
    })?;
    Ok(SubjectRef { id, subject_type })
}

async fn react(
    state: AppState,
    headers: HeaderMap,
    subject: SubjectRef,
    kind: ReactionKind,
) -> ApiResult<Json<serde_json::Value>> {
    let ctx = auth_context(&state, &headers)?;

    let service = FeedService::new(state.db.pool.clone());
    let outcome = service.react(subject, &ctx, kind)?;

    // Every outcome gets a descriptive body, including the no-op path
    let message = match (outcome, kind) {
        (ReactionOutcome::Created, ReactionKind::Like) => "liked",
        (ReactionOutcome::Created, ReactionKind::Dislike) => "disliked",
        (ReactionOutcome::AlreadyReacted, ReactionKind::Like) => "already liked",
        (ReactionOutcome::AlreadyReacted, ReactionKind::Dislike) => "already disliked",
        (ReactionOutcome::Switched, ReactionKind::Like) => "changed to like",
        (ReactionOutcome::Switched, ReactionKind::Dislike) => "changed to dislike",
    };

    Ok(Json(serde_json::json!({
        "message": message,
        "subject_id": subject.id,
        "reaction": kind.as_str(),
    })))
}

async fn unreact(
    state: AppState,
    headers: HeaderMap,
    subject: SubjectRef,
) -> ApiResult<Json<serde_json::Value>> {
    let ctx = auth_context(&state, &headers)?;

    let service = FeedService::new(state.db.pool.clone());
    service.unreact(subject, &ctx)?;

    Ok(Json(serde_json::json!({
        "message": "reaction removed",
        "subject_id": subject.id,
    })))
}

/// POST /feed/reviews/:id/like
pub async fn like_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let subject = parse_subject(&id, SubjectType::Review)?;
    react(state, headers, subject, ReactionKind::Like).await
}

/// POST /feed/reviews/:id/dislike
pub async fn dislike_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let subject = parse_subject(&id, SubjectType::Review)?;
    react(state, headers, subject, ReactionKind::Dislike).await
}

/// DELETE /feed/reviews/:id/reaction
pub async fn remove_review_reaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let subject = parse_subject(&id, SubjectType::Review)?;
    unreact(state, headers, subject).await
}

/// POST /feed/badges/:id/like
pub async fn like_badge(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let subject = parse_subject(&id, SubjectType::BadgeNotification)?;
    react(state, headers, subject, ReactionKind::Like).await
}

/// POST /feed/badges/:id/dislike
pub async fn dislike_badge(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let subject = parse_subject(&id, SubjectType::BadgeNotification)?;
    react(state, headers, subject, ReactionKind::Dislike).await
}

/// DELETE /feed/badges/:id/reaction
pub async fn remove_badge_reaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let subject = parse_subject(&id, SubjectType::BadgeNotification)?;
    unreact(state, headers, subject).await
}
