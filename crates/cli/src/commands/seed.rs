//! Seed the database with demo catalog data.
//!
//! Reads categories, brands, products and discount codes from a YAML file
//! (or the built-in `seed/catalog.yaml`) and inserts whatever is missing.
//! Rows are matched by name, SKU or code, so the command can be re-run.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, info, warn};

use skinior_api::cache::CatalogCache;
use skinior_api::db::{BrandRepository, CategoryRepository, RepositoryError};
use skinior_api::models::catalog::{BrandInput, CategoryInput, ProductInput};
use skinior_api::services::catalog::{CatalogError, CatalogService};
use skinior_core::{BrandId, CategoryId, CurrencyCode, DiscountType};

use super::{ConnectError, connect};

/// Demo catalog compiled into the binary.
const BUILTIN_CATALOG: &str = include_str!("../../seed/catalog.yaml");

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error("Unknown {kind} referenced by seed data: {name}")]
    UnknownReference { kind: &'static str, name: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Top-level seed file.
#[derive(Debug, Default, Deserialize)]
pub struct SeedCatalog {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    #[serde(default)]
    pub brands: Vec<SeedBrand>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
    #[serde(default)]
    pub discounts: Vec<SeedDiscount>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    pub name_ar: Option<String>,
    pub description: Option<String>,
    /// Name of the parent category.
    pub parent: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Deserialize)]
pub struct SeedBrand {
    pub name: String,
    pub name_ar: Option<String>,
    pub description: Option<String>,
    pub website_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub title: String,
    pub title_ar: Option<String>,
    pub description_en: Option<String>,
    pub description_ar: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub sku: String,
    #[serde(default)]
    pub stock_quantity: i32,
    /// Category name.
    pub category: Option<String>,
    /// Brand name.
    pub brand: Option<String>,
    #[serde(default)]
    pub skin_types: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
    pub active_ingredients: Option<String>,
    pub how_to_use: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub new: bool,
}

#[derive(Debug, Deserialize)]
pub struct SeedDiscount {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    #[serde(default)]
    pub minimum_amount: Decimal,
    pub usage_limit: Option<i32>,
}

/// Counts reported after a seed run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
}

impl SeedReport {
    const fn record(&mut self, inserted: bool) {
        if inserted {
            self.inserted += 1;
        } else {
            self.skipped += 1;
        }
    }
}

/// Check a seed catalog before touching the database.
///
/// Returns one message per problem; an empty list means the file is usable.
#[must_use]
pub fn validate(catalog: &SeedCatalog) -> Vec<String> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for category in &catalog.categories {
        if category.name.trim().is_empty() {
            errors.push("category with an empty name".to_owned());
        }
        if let Some(parent) = &category.parent
            && !seen.contains(&parent.to_lowercase())
        {
            errors.push(format!(
                "category '{}' must come after its parent '{parent}'",
                category.name
            ));
        }
        if !seen.insert(category.name.to_lowercase()) {
            errors.push(format!("duplicate category '{}'", category.name));
        }
    }

    let mut skus = HashSet::new();
    for product in &catalog.products {
        if product.title.trim().is_empty() {
            errors.push(format!("product '{}' has an empty title", product.sku));
        }
        if product.price <= Decimal::ZERO {
            errors.push(format!("product '{}' must have a positive price", product.sku));
        }
        if product.stock_quantity < 0 {
            errors.push(format!("product '{}' has negative stock", product.sku));
        }
        if !skus.insert(product.sku.as_str()) {
            errors.push(format!("duplicate SKU '{}'", product.sku));
        }
    }

    let mut codes = HashSet::new();
    for discount in &catalog.discounts {
        if discount.value <= Decimal::ZERO {
            errors.push(format!("discount '{}' must have a positive value", discount.code));
        }
        if discount.discount_type == DiscountType::Percentage && discount.value > Decimal::ONE_HUNDRED
        {
            errors.push(format!("discount '{}' exceeds 100%", discount.code));
        }
        if !codes.insert(discount.code.to_uppercase()) {
            errors.push(format!("duplicate discount code '{}'", discount.code));
        }
    }

    errors
}

/// Seed the catalog from `file_path`, or from the built-in demo catalog.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, or if a
/// database operation fails.
pub async fn catalog(file_path: Option<&str>) -> Result<(), SeedError> {
    let content = match file_path {
        Some(file_path) => {
            let path = Path::new(file_path);
            if !path.exists() {
                return Err(SeedError::FileNotFound(file_path.to_owned()));
            }
            info!(path = %file_path, "Loading seed catalog from file");
            tokio::fs::read_to_string(path).await?
        }
        None => {
            info!("Loading built-in demo catalog");
            BUILTIN_CATALOG.to_owned()
        }
    };

    let catalog: SeedCatalog = serde_yaml::from_str(&content)?;

    let errors = validate(&catalog);
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(SeedError::Invalid(errors.len()));
    }

    let pool = connect().await?;
    info!("Connected to database");

    let cache = CatalogCache::default();
    let service = CatalogService::new(&pool, &cache);

    let (categories, category_ids) = seed_categories(&pool, &service, &catalog.categories).await?;
    let (brands, brand_ids) = seed_brands(&pool, &service, &catalog.brands).await?;
    let products = seed_products(&pool, &service, &catalog.products, &category_ids, &brand_ids).await?;
    let discounts = seed_discounts(&pool, &catalog.discounts).await?;

    info!("Seeding complete!");
    for (kind, report) in [
        ("Categories", categories),
        ("Brands", brands),
        ("Products", products),
        ("Discount codes", discounts),
    ] {
        info!(
            "  {kind}: {} inserted, {} skipped (already exist)",
            report.inserted, report.skipped
        );
    }

    Ok(())
}

async fn seed_categories(
    pool: &PgPool,
    service: &CatalogService<'_>,
    categories: &[SeedCategory],
) -> Result<(SeedReport, HashMap<String, CategoryId>), SeedError> {
    let repo = CategoryRepository::new(pool);
    let mut report = SeedReport::default();
    let mut ids = HashMap::new();

    for category in categories {
        let id = if let Some(existing) = repo.find_by_name(&category.name).await? {
            report.record(false);
            existing.id
        } else {
            let parent_id = match &category.parent {
                Some(parent) => Some(
                    ids.get(&parent.to_lowercase())
                        .copied()
                        .ok_or_else(|| SeedError::UnknownReference {
                            kind: "category",
                            name: parent.clone(),
                        })?,
                ),
                None => None,
            };
            let created = service
                .create_category(&CategoryInput {
                    name: category.name.clone(),
                    name_ar: category.name_ar.clone(),
                    slug: None,
                    description: category.description.clone(),
                    image_url: None,
                    parent_id,
                    sort_order: category.sort_order,
                    is_active: true,
                })
                .await?;
            report.record(true);
            created.id
        };
        ids.insert(category.name.to_lowercase(), id);
    }

    Ok((report, ids))
}

async fn seed_brands(
    pool: &PgPool,
    service: &CatalogService<'_>,
    brands: &[SeedBrand],
) -> Result<(SeedReport, HashMap<String, BrandId>), SeedError> {
    let repo = BrandRepository::new(pool);
    let mut report = SeedReport::default();
    let mut ids = HashMap::new();

    for brand in brands {
        let id = if let Some(existing) = repo.find_by_name(&brand.name).await? {
            report.record(false);
            existing.id
        } else {
            let created = service
                .create_brand(&BrandInput {
                    name: brand.name.clone(),
                    name_ar: brand.name_ar.clone(),
                    slug: None,
                    description: brand.description.clone(),
                    logo_url: None,
                    website_url: brand.website_url.clone(),
                    is_active: true,
                })
                .await?;
            report.record(true);
            created.id
        };
        ids.insert(brand.name.to_lowercase(), id);
    }

    Ok((report, ids))
}

/// Resolve a name from the seed file, falling back to an existing row.
async fn resolve<Id, F, Fut>(
    name: Option<&String>,
    seeded: &HashMap<String, Id>,
    kind: &'static str,
    lookup: F,
) -> Result<Option<Id>, SeedError>
where
    Id: Copy,
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<Option<Id>, RepositoryError>>,
{
    let Some(name) = name else {
        return Ok(None);
    };
    if let Some(id) = seeded.get(&name.to_lowercase()) {
        return Ok(Some(*id));
    }
    lookup(name.clone())
        .await?
        .map(Some)
        .ok_or_else(|| SeedError::UnknownReference {
            kind,
            name: name.clone(),
        })
}

async fn seed_products(
    pool: &PgPool,
    service: &CatalogService<'_>,
    products: &[SeedProduct],
    category_ids: &HashMap<String, CategoryId>,
    brand_ids: &HashMap<String, BrandId>,
) -> Result<SeedReport, SeedError> {
    let categories = CategoryRepository::new(pool);
    let brands = BrandRepository::new(pool);
    let mut report = SeedReport::default();

    for product in products {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM skinior.product WHERE sku = $1)")
                .bind(&product.sku)
                .fetch_one(pool)
                .await?;
        if exists {
            report.record(false);
            continue;
        }

        let category_id = resolve(product.category.as_ref(), category_ids, "category", |name| {
            let categories = &categories;
            async move { categories.find_by_name(&name).await.map(|c| c.map(|c| c.id)) }
        })
        .await?;
        let brand_id = resolve(product.brand.as_ref(), brand_ids, "brand", |name| {
            let brands = &brands;
            async move { brands.find_by_name(&name).await.map(|b| b.map(|b| b.id)) }
        })
        .await?;

        let input = ProductInput {
            title: product.title.clone(),
            title_ar: product.title_ar.clone(),
            description_en: product.description_en.clone(),
            description_ar: product.description_ar.clone(),
            price: product.price,
            compare_at_price: product.compare_at_price,
            sku: Some(product.sku.clone()),
            stock_quantity: product.stock_quantity,
            is_active: true,
            is_featured: product.featured,
            is_new: product.new,
            category_id,
            brand_id,
            active_ingredients: product.active_ingredients.clone(),
            skin_types: product.skin_types.clone(),
            concerns: product.concerns.clone(),
            how_to_use: product.how_to_use.clone(),
            ..ProductInput::default()
        };

        match service.create_product(&input, CurrencyCode::default()).await {
            Ok(_) => report.record(true),
            Err(CatalogError::Repository(RepositoryError::Conflict(reason))) => {
                warn!(sku = %product.sku, %reason, "Product skipped");
                report.record(false);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(report)
}

async fn seed_discounts(pool: &PgPool, discounts: &[SeedDiscount]) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    for discount in discounts {
        let result = sqlx::query(
            "INSERT INTO skinior.discount_code
                (code, discount_type, value, minimum_amount, usage_limit)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (code) DO NOTHING",
        )
        .bind(discount.code.trim().to_uppercase())
        .bind(discount.discount_type)
        .bind(discount.value)
        .bind(discount.minimum_amount)
        .bind(discount.usage_limit)
        .execute(pool)
        .await?;
        report.record(result.rows_affected() > 0);
    }

    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog: SeedCatalog = serde_yaml::from_str(BUILTIN_CATALOG).unwrap();
        assert!(!catalog.products.is_empty());
        assert!(validate(&catalog).is_empty(), "{:?}", validate(&catalog));
    }

    #[test]
    fn test_parent_must_come_first() {
        let catalog: SeedCatalog = serde_yaml::from_str(
            "categories:\n  - name: Night Creams\n    parent: Moisturizers\n  - name: Moisturizers\n",
        )
        .unwrap();
        let errors = validate(&catalog);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("after its parent"));
    }

    #[test]
    fn test_duplicates_rejected() {
        let catalog: SeedCatalog = serde_yaml::from_str(
            r#"
products:
  - { title: A, price: "1.00", sku: X-1 }
  - { title: B, price: "2.00", sku: X-1 }
discounts:
  - { code: save5, discount_type: fixed, value: "5" }
  - { code: SAVE5, discount_type: fixed, value: "5" }
"#,
        )
        .unwrap();
        let errors = validate(&catalog);
        assert!(errors.iter().any(|e| e.contains("duplicate SKU")));
        assert!(errors.iter().any(|e| e.contains("duplicate discount code")));
    }

    #[test]
    fn test_percentage_over_hundred() {
        let catalog: SeedCatalog = serde_yaml::from_str(
            "discounts:\n  - { code: HALF, discount_type: percentage, value: \"150\" }\n",
        )
        .unwrap();
        assert_eq!(validate(&catalog), vec!["discount 'HALF' exceeds 100%".to_owned()]);
    }

    #[test]
    fn test_report_counts() {
        let mut report = SeedReport::default();
        report.record(true);
        report.record(false);
        report.record(false);
        assert_eq!(report, SeedReport { inserted: 1, skipped: 2 });
    }
}
