//! Public catalog: products, categories, brands and reviews.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use skinior_core::ProductId;

use super::LimitQuery;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::catalog::{
    Brand, CategoryNode, ProductDetail, ProductFilter, ProductSummary, Review, ReviewInput,
};
use crate::models::{PageQuery, Paginated};
use crate::services::catalog::CatalogService;
use crate::state::AppState;

const FEATURED_DEFAULT: i64 = 8;

/// `GET /api/products`
pub async fn products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Paginated<ProductSummary>>> {
    let products = CatalogService::new(state.pool(), state.cache())
        .list_products(&filter, true, page.into())
        .await?;
    Ok(Json(products))
}

/// `GET /api/products/featured`
pub async fn featured(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<ProductSummary>>> {
    let limit = query.limit.unwrap_or(FEATURED_DEFAULT).clamp(1, 50);
    let products = CatalogService::new(state.pool(), state.cache())
        .featured(limit)
        .await?;
    Ok(Json(products.as_ref().clone()))
}

/// `GET /api/products/{id_or_slug}`
pub async fn product(
    State(state): State<AppState>,
    Path(id_or_slug): Path<String>,
) -> Result<Json<ProductDetail>> {
    let product = CatalogService::new(state.pool(), state.cache())
        .product_detail(&id_or_slug, true)
        .await?;
    Ok(Json(product))
}

/// `POST /api/products/{id}/reviews`
///
/// Reviews are stored unpublished until an admin approves them.
pub async fn create_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    Json(input): Json<ReviewInput>,
) -> Result<(StatusCode, Json<Review>)> {
    let review = CatalogService::new(state.pool(), state.cache())
        .create_review(product_id, user.id, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /api/categories`
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryNode>>> {
    let tree = CatalogService::new(state.pool(), state.cache())
        .category_tree()
        .await?;
    Ok(Json(tree.as_ref().clone()))
}

/// `GET /api/brands`
pub async fn brands(State(state): State<AppState>) -> Result<Json<Vec<Brand>>> {
    let brands = CatalogService::new(state.pool(), state.cache())
        .brands_list(true)
        .await?;
    Ok(Json(brands))
}
