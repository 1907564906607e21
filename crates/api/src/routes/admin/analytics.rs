//! Dashboard reports.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::analytics::{
    InventoryReport, OrderAnalytics, Overview, ProductAnalytics, RevenueQuery, RevenueReport,
};
use crate::routes::LimitQuery;
use crate::services::analytics::AnalyticsService;
use crate::state::AppState;

/// `GET /api/admin/analytics/overview`
pub async fn overview(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Overview>> {
    Ok(Json(AnalyticsService::new(state.pool()).overview().await?))
}

/// `GET /api/admin/analytics/orders`
pub async fn orders(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<OrderAnalytics>> {
    Ok(Json(AnalyticsService::new(state.pool()).orders(Utc::now()).await?))
}

/// `GET /api/admin/analytics/revenue?period=7d|30d|90d|1y`
pub async fn revenue(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<RevenueQuery>,
) -> Result<Json<RevenueReport>> {
    Ok(Json(
        AnalyticsService::new(state.pool())
            .revenue(query.period, Utc::now())
            .await?,
    ))
}

/// `GET /api/admin/analytics/products?limit=`
pub async fn products(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ProductAnalytics>> {
    Ok(Json(AnalyticsService::new(state.pool()).products(query.limit).await?))
}

/// `GET /api/admin/analytics/inventory`
pub async fn inventory(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<InventoryReport>> {
    Ok(Json(AnalyticsService::new(state.pool()).inventory().await?))
}
