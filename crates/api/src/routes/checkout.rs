//! Checkout, payment and order history.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tower_sessions::Session;

use skinior_core::OrderId;

use super::cart::current_owner;
use crate::error::Result;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::order::{
    AppliedDiscount, CreateOrderRequest, DiscountRequest, Order, OrderWithItems, PayRequest,
    PaymentOption, PlacedOrder, ShippingOption,
};
use crate::services::checkout::{self, CheckoutService};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CountryQuery {
    pub country: Option<String>,
}

/// `POST /api/checkout/shipping-options`
pub async fn shipping_options() -> Json<Vec<ShippingOption>> {
    Json(checkout::shipping_options())
}

/// `GET /api/checkout/payment-methods?country=`
pub async fn payment_methods(Query(query): Query<CountryQuery>) -> Json<Vec<PaymentOption>> {
    Json(checkout::payment_options(query.country.as_deref()))
}

/// `POST /api/checkout/discount`
pub async fn check_discount(
    State(state): State<AppState>,
    Json(body): Json<DiscountRequest>,
) -> Result<Json<AppliedDiscount>> {
    let applied = CheckoutService::new(state.pool())
        .check_discount(&body.code, body.subtotal)
        .await?;
    Ok(Json(applied))
}

/// `POST /api/checkout/orders`
///
/// Without explicit items the caller's cart is ordered.
pub async fn place_order(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<PlacedOrder>)> {
    let cart = current_owner(&session, user.as_ref()).await?;
    let placed = CheckoutService::new(state.pool())
        .place_order(
            &body,
            user.as_ref().map(|u| u.id),
            cart,
            state.config().default_currency,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

/// `POST /api/checkout/orders/{id}/pay`
pub async fn pay(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<OrderId>,
    Json(body): Json<PayRequest>,
) -> Result<Json<Order>> {
    let order = CheckoutService::new(state.pool())
        .pay(id, &body, user.as_ref(), state.stripe())
        .await?;
    Ok(Json(order))
}

/// `GET /api/orders`
pub async fn my_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderWithItems>>> {
    Ok(Json(CheckoutService::new(state.pool()).orders_for(user.id).await?))
}

/// `GET /api/orders/{id}`
pub async fn my_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderWithItems>> {
    Ok(Json(CheckoutService::new(state.pool()).order_for(id, &user).await?))
}
