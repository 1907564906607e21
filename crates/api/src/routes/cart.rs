//! Shopping cart.
//!
//! Logged-in users own their cart; anonymous visitors are tracked by a cart
//! token kept in the session, created on the first add.

use axum::{
    Json,
    extract::{Path, State},
};
use tower_sessions::Session;

use skinior_core::CartItemId;

use crate::error::Result;
use crate::middleware::{OptionalAuth, cart_token, ensure_cart_token};
use crate::models::CurrentUser;
use crate::models::cart::{AddItemRequest, CartOwner, CartView, UpdateItemRequest};
use crate::services::cart::CartService;
use crate::state::AppState;

/// The cart owner for this request, if there can be a cart at all.
pub async fn current_owner(
    session: &Session,
    user: Option<&CurrentUser>,
) -> Result<Option<CartOwner>> {
    if let Some(user) = user {
        return Ok(Some(CartOwner::User(user.id)));
    }
    Ok(cart_token(session).await?.map(CartOwner::Session))
}

async fn owner_or_create(session: &Session, user: Option<&CurrentUser>) -> Result<CartOwner> {
    match user {
        Some(user) => Ok(CartOwner::User(user.id)),
        None => Ok(CartOwner::Session(ensure_cart_token(session).await?)),
    }
}

/// `GET /api/cart`
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<CartView>> {
    let owner = current_owner(&session, user.as_ref()).await?;
    let cart = CartService::new(state.pool(), state.currency()).view(owner).await?;
    Ok(Json(cart))
}

/// `POST /api/cart/items`
pub async fn add_item(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let owner = owner_or_create(&session, user.as_ref()).await?;
    let cart = CartService::new(state.pool(), state.currency())
        .add_item(owner, &body)
        .await?;
    Ok(Json(cart))
}

/// `PUT /api/cart/items/{item_id}`
///
/// A quantity of zero or less removes the line.
pub async fn update_item(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Path(item_id): Path<CartItemId>,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    let owner = owner_or_create(&session, user.as_ref()).await?;
    let cart = CartService::new(state.pool(), state.currency())
        .update_item(owner, item_id, body.quantity)
        .await?;
    Ok(Json(cart))
}

/// `DELETE /api/cart/items/{item_id}`
pub async fn remove_item(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Path(item_id): Path<CartItemId>,
) -> Result<Json<CartView>> {
    let owner = owner_or_create(&session, user.as_ref()).await?;
    let cart = CartService::new(state.pool(), state.currency())
        .remove_item(owner, item_id)
        .await?;
    Ok(Json(cart))
}

/// `DELETE /api/cart`
pub async fn clear(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<CartView>> {
    let owner = current_owner(&session, user.as_ref()).await?;
    let cart = CartService::new(state.pool(), state.currency()).clear(owner).await?;
    Ok(Json(cart))
}
