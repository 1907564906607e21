//! Blog, newsletter and waitlist.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::LimitQuery;
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::models::Paginated;
use crate::models::content::{
    BlogFilter, BlogPost, JoinWaitlistRequest, SubscribeRequest, Subscriber, WaitlistEntry,
};
use crate::services::content::{ContentService, PostView};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub email: String,
}

/// `GET /api/blog`
pub async fn posts(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(filter): Query<BlogFilter>,
) -> Result<Json<Paginated<BlogPost>>> {
    let is_admin = user.as_ref().is_some_and(|u| u.is_admin());
    Ok(Json(ContentService::new(state.pool()).posts(&filter, is_admin).await?))
}

/// `GET /api/blog/featured`
pub async fn featured(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<BlogPost>>> {
    Ok(Json(ContentService::new(state.pool()).featured(query.limit).await?))
}

/// `GET /api/blog/{slug}`
///
/// Accepts the English or Arabic slug.
pub async fn post(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(slug): Path<String>,
) -> Result<Json<PostView>> {
    let is_admin = user.as_ref().is_some_and(|u| u.is_admin());
    Ok(Json(
        ContentService::new(state.pool())
            .post_by_slug(&slug, is_admin)
            .await?,
    ))
}

/// `POST /api/newsletter/subscribe`
pub async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<Subscriber>)> {
    let subscriber = ContentService::new(state.pool()).subscribe(&body).await?;
    Ok((StatusCode::CREATED, Json(subscriber)))
}

/// `POST /api/newsletter/unsubscribe`
pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(body): Json<UnsubscribeRequest>,
) -> Result<Json<Value>> {
    let unsubscribed = ContentService::new(state.pool())
        .unsubscribe(&body.email)
        .await?;
    Ok(Json(json!({ "unsubscribed": unsubscribed })))
}

/// `POST /api/waitlist`
pub async fn join_waitlist(
    State(state): State<AppState>,
    Json(body): Json<JoinWaitlistRequest>,
) -> Result<(StatusCode, Json<WaitlistEntry>)> {
    let entry = ContentService::new(state.pool()).join_waitlist(&body).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}
