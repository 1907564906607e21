//! Catalog models: products, images, reviews, categories and brands.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use skinior_core::{BrandId, CategoryId, ImageId, ProductId, ReviewId, UserId};

/// Stock level at or below which an active product counts as low stock.
pub const LOW_STOCK_THRESHOLD: i32 = 10;

/// A product category. Categories form a tree through `parent_id`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub name_ar: Option<String>,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A category with its nested children.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<Self>,
}

/// Category create/update payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub name_ar: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A product brand.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub name_ar: Option<String>,
    pub slug: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Brand create/update payload.
#[derive(Debug, Clone, Deserialize)]
pub struct BrandInput {
    pub name: String,
    pub name_ar: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A catalog product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub title_ar: Option<String>,
    pub slug: String,
    pub description_en: Option<String>,
    pub description_ar: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub currency: String,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub is_featured: bool,
    pub is_new: bool,
    pub category_id: Option<CategoryId>,
    pub brand_id: Option<BrandId>,
    pub active_ingredients: Option<String>,
    pub skin_types: Vec<String>,
    pub concerns: Vec<String>,
    pub features: Vec<String>,
    pub features_ar: Vec<String>,
    pub ingredients: Option<String>,
    pub ingredients_ar: Option<String>,
    pub how_to_use: Option<String>,
    pub how_to_use_ar: Option<String>,
    pub usage: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub attributes: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product image.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: ImageId,
    pub product_id: ProductId,
    pub url: String,
    pub alt_text: Option<String>,
    pub is_main: bool,
    pub sort_order: i32,
}

/// Image payload for product create/update.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageInput {
    pub url: String,
    pub alt_text: Option<String>,
    #[serde(default)]
    pub is_main: bool,
}

/// Published review statistics for a product.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct ReviewStats {
    /// Mean rating rounded to one decimal, 0 when there are no reviews.
    pub average_rating: f64,
    pub total_reviews: i64,
}

impl ReviewStats {
    #[must_use]
    pub fn new(average: Option<f64>, total: i64) -> Self {
        Self {
            average_rating: average.map_or(0.0, |avg| (avg * 10.0).round() / 10.0),
            total_reviews: total,
        }
    }
}

/// Product row as shown in listings.
#[derive(Debug, Clone, Serialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub title: String,
    pub title_ar: Option<String>,
    pub slug: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub currency: String,
    pub stock_quantity: i32,
    pub is_in_stock: bool,
    pub is_active: bool,
    pub is_featured: bool,
    pub is_new: bool,
    pub main_image: Option<String>,
    pub category_name: Option<String>,
    pub brand_name: Option<String>,
    pub review_stats: ReviewStats,
}

/// Flat row backing [`ProductSummary`].
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductSummaryRow {
    pub id: ProductId,
    pub title: String,
    pub title_ar: Option<String>,
    pub slug: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub currency: String,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub is_featured: bool,
    pub is_new: bool,
    pub main_image: Option<String>,
    pub category_name: Option<String>,
    pub brand_name: Option<String>,
    pub average_rating: Option<f64>,
    pub total_reviews: i64,
}

impl From<ProductSummaryRow> for ProductSummary {
    fn from(row: ProductSummaryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            title_ar: row.title_ar,
            slug: row.slug,
            price: row.price,
            compare_at_price: row.compare_at_price,
            currency: row.currency,
            stock_quantity: row.stock_quantity,
            is_in_stock: row.stock_quantity > 0,
            is_active: row.is_active,
            is_featured: row.is_featured,
            is_new: row.is_new,
            main_image: row.main_image,
            category_name: row.category_name,
            brand_name: row.brand_name,
            review_stats: ReviewStats::new(row.average_rating, row.total_reviews),
        }
    }
}

/// Full product view with images, category, brand and review statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub is_in_stock: bool,
    pub images: Vec<ProductImage>,
    pub category: Option<Category>,
    pub brand: Option<Brand>,
    pub review_stats: ReviewStats,
}

/// Product create/update payload (also produced by spreadsheet import).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    pub title: String,
    pub title_ar: Option<String>,
    pub description_en: Option<String>,
    pub description_ar: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub currency: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_new: bool,
    pub category_id: Option<CategoryId>,
    pub brand_id: Option<BrandId>,
    pub active_ingredients: Option<String>,
    #[serde(default)]
    pub skin_types: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub features_ar: Vec<String>,
    pub ingredients: Option<String>,
    pub ingredients_ar: Option<String>,
    pub how_to_use: Option<String>,
    pub how_to_use_ar: Option<String>,
    pub usage: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub attributes: Option<serde_json::Value>,
    /// Replaces all images when present.
    pub images: Option<Vec<ImageInput>>,
}

/// Admin product list filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub search: Option<String>,
    /// Category id or slug.
    pub category: Option<String>,
    /// Brand id or slug.
    pub brand: Option<String>,
    pub featured: Option<bool>,
    pub in_stock: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: Option<ProductSort>,
    /// Admin only; public listings are always active.
    pub status: Option<StatusFilter>,
    /// Admin only.
    pub stock: Option<StockFilter>,
}

impl ProductFilter {
    /// `is_active` value to filter on, `None` for all products.
    #[must_use]
    pub const fn active_flag(&self) -> Option<bool> {
        match self.status {
            Some(StatusFilter::Active) => Some(true),
            Some(StatusFilter::Inactive) => Some(false),
            Some(StatusFilter::All) | None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    Active,
    Inactive,
    All,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockFilter {
    InStock,
    OutOfStock,
    /// In stock at or below [`LOW_STOCK_THRESHOLD`].
    LowStock,
}

impl StockFilter {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InStock => "in_stock",
            Self::OutOfStock => "out_of_stock",
            Self::LowStock => "low_stock",
        }
    }
}

/// Admin bulk product operation.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Activate,
    Deactivate,
    Feature,
    Unfeature,
    SetCategory,
    SetBrand,
    Delete,
}

/// `POST /api/admin/products/bulk` body.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkRequest {
    pub ids: Vec<ProductId>,
    pub action: BulkAction,
    /// Category or brand id for `set_category` / `set_brand`.
    pub value: Option<i32>,
}

/// `POST /api/products/{id}/reviews` body.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewInput {
    pub rating: i16,
    pub title: Option<String>,
    pub body: Option<String>,
}

/// Index of the image that should be main: the first flagged one, else the first.
#[must_use]
pub fn main_image_index(images: &[ImageInput]) -> Option<usize> {
    if images.is_empty() {
        return None;
    }
    Some(images.iter().position(|i| i.is_main).unwrap_or(0))
}

/// Listing order.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
    RatingDesc,
}

impl ProductSort {
    /// SQL `ORDER BY` clause for the listing query.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::Oldest => "p.created_at ASC, p.id ASC",
            Self::PriceAsc => "p.price ASC, p.id ASC",
            Self::PriceDesc => "p.price DESC, p.id DESC",
            Self::RatingDesc => "average_rating DESC NULLS LAST, p.id DESC",
        }
    }
}

/// A product review.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: Option<UserId>,
    pub rating: i16,
    pub title: Option<String>,
    pub body: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_stats_rounding() {
        let stats = ReviewStats::new(Some(4.266_666), 3);
        assert!((stats.average_rating - 4.3).abs() < f64::EPSILON);
        assert_eq!(stats.total_reviews, 3);

        let empty = ReviewStats::new(None, 0);
        assert!(empty.average_rating.abs() < f64::EPSILON);
    }

    #[test]
    fn test_product_input_defaults() {
        let input: ProductInput =
            serde_json::from_str(r#"{"title": "Cleanser", "price": "12.50"}"#).unwrap_or_default();
        assert_eq!(input.title, "Cleanser");
        assert!(input.is_active);
        assert!(!input.is_featured);
        assert!(input.images.is_none());
        assert!(input.skin_types.is_empty());
    }

    fn image(is_main: bool) -> ImageInput {
        ImageInput {
            url: "https://cdn.skinior.com/p.jpg".to_string(),
            alt_text: None,
            is_main,
        }
    }

    #[test]
    fn test_main_image_index() {
        assert_eq!(main_image_index(&[]), None);
        assert_eq!(main_image_index(&[image(false), image(false)]), Some(0));
        assert_eq!(main_image_index(&[image(false), image(true), image(true)]), Some(1));
    }

    #[test]
    fn test_active_flag() {
        let filter: ProductFilter =
            serde_json::from_str(r#"{"status": "inactive", "stock": "low_stock"}"#).unwrap_or_default();
        assert_eq!(filter.active_flag(), Some(false));
        assert_eq!(filter.stock, Some(StockFilter::LowStock));
        assert_eq!(ProductFilter::default().active_flag(), None);
    }

    #[test]
    fn test_sort_parse() {
        let sort: ProductSort = serde_json::from_str("\"price_desc\"").unwrap_or_default();
        assert_eq!(sort, ProductSort::PriceDesc);
    }
}
