//! Admin blog and newsletter management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use skinior_core::BlogPostId;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::Paginated;
use crate::models::content::{
    BlogFilter, BlogPost, BlogPostInput, Subscriber, SubscriberFilter, SubscriberStats,
};
use crate::services::content::ContentService;
use crate::state::AppState;

/// `GET /api/admin/blog`
///
/// Drafts are included unless `include_drafts=false`.
pub async fn posts(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(mut filter): Query<BlogFilter>,
) -> Result<Json<Paginated<BlogPost>>> {
    filter.include_drafts.get_or_insert(true);
    Ok(Json(ContentService::new(state.pool()).posts(&filter, true).await?))
}

/// `GET /api/admin/blog/{id}`
pub async fn post(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<BlogPostId>,
) -> Result<Json<BlogPost>> {
    Ok(Json(ContentService::new(state.pool()).post(id).await?))
}

/// `POST /api/admin/blog`
pub async fn create_post(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<BlogPostInput>,
) -> Result<(StatusCode, Json<BlogPost>)> {
    let post = ContentService::new(state.pool()).create_post(&input).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// `PUT /api/admin/blog/{id}`
pub async fn update_post(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<BlogPostId>,
    Json(input): Json<BlogPostInput>,
) -> Result<Json<BlogPost>> {
    Ok(Json(ContentService::new(state.pool()).update_post(id, &input).await?))
}

/// `DELETE /api/admin/blog/{id}`
pub async fn delete_post(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<BlogPostId>,
) -> Result<StatusCode> {
    ContentService::new(state.pool()).delete_post(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/admin/newsletter/subscribers`
pub async fn subscribers(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<SubscriberFilter>,
) -> Result<Json<Paginated<Subscriber>>> {
    Ok(Json(ContentService::new(state.pool()).subscribers(&filter).await?))
}

/// `GET /api/admin/newsletter/stats`
pub async fn subscriber_stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<SubscriberStats>> {
    Ok(Json(ContentService::new(state.pool()).subscriber_stats().await?))
}
