//! Admin order management.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use skinior_core::OrderId;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::order::{Order, OrderFilter, OrderListItem, OrderUpdate, OrderWithItems};
use crate::models::{PageQuery, Paginated};
use crate::services::admin::AdminService;
use crate::state::AppState;

/// `GET /api/admin/orders`
pub async fn orders(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<OrderFilter>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Paginated<OrderListItem>>> {
    Ok(Json(
        AdminService::new(state.pool())
            .orders(&filter, page.into())
            .await?,
    ))
}

/// `GET /api/admin/orders/{id}`
pub async fn order(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderWithItems>> {
    Ok(Json(AdminService::new(state.pool()).order(id).await?))
}

/// `PUT /api/admin/orders/{id}`
pub async fn update_order(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(body): Json<OrderUpdate>,
) -> Result<Json<Order>> {
    Ok(Json(AdminService::new(state.pool()).update_order(id, &body).await?))
}
