use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{
    api::ApiResult,
    auth::auth_context,
    feed::FeedService,
    state::AppState,
};
use waypoint_types::FeedResponse;

#[derive(Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

/// GET /feed - The viewer's paginated activity feed
pub async fn get_feed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Json<FeedResponse>> {
    let ctx = auth_context(&state, &headers)?;

    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);

    let service = FeedService::new(state.db.pool.clone());
    let response = service.assemble_page(ctx.user_id, page, limit).await?;

    Ok(Json(response))
}
