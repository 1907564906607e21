//! Admin catalog management: products, images, imports, categories,
//! brands and reviews.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use skinior_core::{BrandId, CategoryId, ImageId, ProductId, ReviewId};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::catalog::{
    Brand, BrandInput, BulkRequest, Category, CategoryInput, ImageInput, Product, ProductDetail,
    ProductFilter, ProductImage, ProductInput, ProductSummary, Review,
};
use crate::models::import::{ImportLog, ImportOptions, ImportReport};
use crate::models::{PageQuery, Paginated};
use crate::routes::LimitQuery;
use crate::services::catalog::CatalogService;
use crate::services::import::ImportService;
use crate::state::AppState;

/// Largest accepted workbook upload.
pub const MAX_IMPORT_BYTES: usize = 10 * 1024 * 1024;

fn catalog(state: &AppState) -> CatalogService<'_> {
    CatalogService::new(state.pool(), state.cache())
}

// =============================================================================
// Products
// =============================================================================

/// `GET /api/admin/products`
pub async fn products(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<ProductFilter>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Paginated<ProductSummary>>> {
    Ok(Json(
        catalog(&state)
            .list_products(&filter, false, page.into())
            .await?,
    ))
}

/// `GET /api/admin/products/{id}`
pub async fn product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetail>> {
    Ok(Json(
        catalog(&state)
            .product_detail(&id.to_string(), false)
            .await?,
    ))
}

/// `POST /api/admin/products`
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = catalog(&state)
        .create_product(&input, state.config().default_currency)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /api/admin/products/{id}`
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    Ok(Json(
        catalog(&state)
            .update_product(id, &input, state.config().default_currency)
            .await?,
    ))
}

/// `DELETE /api/admin/products/{id}`
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    catalog(&state).delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/admin/products/bulk`
pub async fn bulk(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(body): Json<BulkRequest>,
) -> Result<Json<Value>> {
    let affected = catalog(&state).bulk(&body).await?;
    Ok(Json(json!({ "affected": affected })))
}

/// `POST /api/admin/products/{id}/images`
pub async fn add_image(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(body): Json<ImageInput>,
) -> Result<(StatusCode, Json<ProductImage>)> {
    let image = catalog(&state).add_image(id, &body).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

/// `PUT /api/admin/products/{id}/images/{image_id}/main`
pub async fn set_main_image(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path((id, image_id)): Path<(ProductId, ImageId)>,
) -> Result<Json<Vec<ProductImage>>> {
    Ok(Json(catalog(&state).set_main_image(id, image_id).await?))
}

/// `DELETE /api/admin/products/{id}/images/{image_id}`
pub async fn delete_image(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path((id, image_id)): Path<(ProductId, ImageId)>,
) -> Result<StatusCode> {
    catalog(&state).delete_image(id, image_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Import
// =============================================================================

/// `POST /api/admin/products/import`
///
/// Multipart upload with the workbook in the `file` field.
pub async fn import_products(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(options): Query<ImportOptions>,
    mut multipart: Multipart,
) -> Result<Json<ImportReport>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.xlsx").to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) = upload
        .ok_or_else(|| AppError::BadRequest("Multipart field `file` is required".to_owned()))?;
    if !file_name.to_ascii_lowercase().ends_with(".xlsx") {
        return Err(AppError::BadRequest("Only .xlsx workbooks are supported".to_owned()));
    }

    let report = ImportService::new(state.pool(), state.cache())
        .import(
            &file_name,
            bytes.to_vec(),
            options,
            admin.id,
            state.config().default_currency,
        )
        .await?;
    Ok(Json(report))
}

/// `GET /api/admin/imports`
pub async fn imports(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<ImportLog>>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    Ok(Json(
        ImportService::new(state.pool(), state.cache())
            .recent(limit)
            .await?,
    ))
}

// =============================================================================
// Categories
// =============================================================================

/// `GET /api/admin/categories`
pub async fn categories(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Category>>> {
    Ok(Json(catalog(&state).all_categories().await?))
}

/// `GET /api/admin/categories/{id}`
pub async fn category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>> {
    Ok(Json(catalog(&state).category(id).await?))
}

/// `POST /api/admin/categories`
pub async fn create_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = catalog(&state).create_category(&input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// `PUT /api/admin/categories/{id}`
pub async fn update_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>> {
    Ok(Json(catalog(&state).update_category(id, &input).await?))
}

/// `DELETE /api/admin/categories/{id}`
pub async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    catalog(&state).delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Brands
// =============================================================================

/// `GET /api/admin/brands`
pub async fn brands(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Brand>>> {
    Ok(Json(catalog(&state).brands_list(false).await?))
}

/// `GET /api/admin/brands/{id}`
pub async fn brand(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<BrandId>,
) -> Result<Json<Brand>> {
    Ok(Json(catalog(&state).brand(id).await?))
}

/// `POST /api/admin/brands`
pub async fn create_brand(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(input): Json<BrandInput>,
) -> Result<(StatusCode, Json<Brand>)> {
    let brand = catalog(&state).create_brand(&input).await?;
    Ok((StatusCode::CREATED, Json(brand)))
}

/// `PUT /api/admin/brands/{id}`
pub async fn update_brand(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<BrandId>,
    Json(input): Json<BrandInput>,
) -> Result<Json<Brand>> {
    Ok(Json(catalog(&state).update_brand(id, &input).await?))
}

/// `DELETE /api/admin/brands/{id}`
pub async fn delete_brand(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<BrandId>,
) -> Result<StatusCode> {
    catalog(&state).delete_brand(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Reviews
// =============================================================================

/// `PUT /api/admin/reviews/{id}/publish`
pub async fn publish_review(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ReviewId>,
) -> Result<Json<Review>> {
    Ok(Json(catalog(&state).publish_review(id).await?))
}

/// `DELETE /api/admin/reviews/{id}`
pub async fn delete_review(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode> {
    catalog(&state).delete_review(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
