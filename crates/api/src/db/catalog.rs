//! Catalog repositories: products (with images and reviews), categories and brands.

use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use skinior_core::{BrandId, CategoryId, ImageId, ProductId, ReviewId, UserId};

use super::{RepositoryError, like_pattern};
use crate::models::PageRequest;
use crate::models::catalog::{
    Brand, BrandInput, BulkAction, Category, CategoryInput, ImageInput, LOW_STOCK_THRESHOLD,
    Product, ProductDetail, ProductFilter, ProductImage, ProductInput, ProductSummary,
    ProductSummaryRow, Review, ReviewInput, ReviewStats, main_image_index,
};

const PRODUCT_COLUMNS: &str = "id, title, title_ar, slug, description_en, description_ar, price, \
     compare_at_price, currency, sku, barcode, stock_quantity, is_active, is_featured, is_new, \
     category_id, brand_id, active_ingredients, skin_types, concerns, features, features_ar, \
     ingredients, ingredients_ar, how_to_use, how_to_use_ar, usage, meta_title, \
     meta_description, attributes, created_at, updated_at";

const SUMMARY_SELECT: &str = "SELECT p.id, p.title, p.title_ar, p.slug, p.price, p.compare_at_price,
            p.currency, p.stock_quantity, p.is_active, p.is_featured, p.is_new,
            (SELECT i.url FROM skinior.product_image i WHERE i.product_id = p.id
             ORDER BY i.is_main DESC, i.sort_order, i.id LIMIT 1) AS main_image,
            c.name AS category_name, b.name AS brand_name,
            r.average_rating, r.total_reviews
     FROM skinior.product p
     LEFT JOIN skinior.category c ON c.id = p.category_id
     LEFT JOIN skinior.brand b ON b.id = p.brand_id
     LEFT JOIN LATERAL (
         SELECT AVG(rating)::float8 AS average_rating, COUNT(*) AS total_reviews
         FROM skinior.product_review
         WHERE product_id = p.id AND is_published
     ) r ON TRUE";

const FILTER_PREDICATE: &str = "($1::boolean IS NULL OR p.is_active = $1)
     AND ($2::text IS NULL OR p.title ILIKE $2 OR p.title_ar ILIKE $2
          OR p.description_en ILIKE $2 OR p.description_ar ILIKE $2
          OR p.active_ingredients ILIKE $2 OR p.sku ILIKE $2)
     AND ($3::text IS NULL OR c.id::text = $3 OR c.slug = $3)
     AND ($4::text IS NULL OR b.id::text = $4 OR b.slug = $4)
     AND ($5::boolean IS NULL OR p.is_featured = $5)
     AND ($6::boolean IS NULL OR (p.stock_quantity > 0) = $6)
     AND ($7::numeric IS NULL OR p.price >= $7)
     AND ($8::numeric IS NULL OR p.price <= $8)
     AND ($9::text IS NULL
          OR ($9 = 'in_stock' AND p.stock_quantity > 0)
          OR ($9 = 'out_of_stock' AND p.stock_quantity = 0)
          OR ($9 = 'low_stock' AND p.stock_quantity > 0 AND p.stock_quantity <= $10))";

/// Bind the ten `FILTER_PREDICATE` parameters in order.
macro_rules! bind_filter {
    ($query:expr, $active:expr, $search:expr, $filter:expr) => {
        $query
            .bind($active)
            .bind($search)
            .bind($filter.category.as_deref())
            .bind($filter.brand.as_deref())
            .bind($filter.featured)
            .bind($filter.in_stock)
            .bind($filter.min_price)
            .bind($filter.max_price)
            .bind($filter.stock.map(|s| s.as_str()))
            .bind(LOW_STOCK_THRESHOLD)
    };
}

/// Bind the 29 `ProductInput` columns in insert order.
macro_rules! bind_product {
    ($query:expr, $input:expr, $slug:expr, $currency:expr) => {
        $query
            .bind($input.title.trim())
            .bind($input.title_ar.as_deref())
            .bind($slug)
            .bind($input.description_en.as_deref())
            .bind($input.description_ar.as_deref())
            .bind($input.price)
            .bind($input.compare_at_price)
            .bind($currency)
            .bind($input.sku.as_deref())
            .bind($input.barcode.as_deref())
            .bind($input.stock_quantity)
            .bind($input.is_active)
            .bind($input.is_featured)
            .bind($input.is_new)
            .bind($input.category_id)
            .bind($input.brand_id)
            .bind($input.active_ingredients.as_deref())
            .bind($input.skin_types.as_slice())
            .bind($input.concerns.as_slice())
            .bind($input.features.as_slice())
            .bind($input.features_ar.as_slice())
            .bind($input.ingredients.as_deref())
            .bind($input.ingredients_ar.as_deref())
            .bind($input.how_to_use.as_deref())
            .bind($input.how_to_use_ar.as_deref())
            .bind($input.usage.as_deref())
            .bind($input.meta_title.as_deref())
            .bind($input.meta_description.as_deref())
            .bind(
                $input
                    .attributes
                    .clone()
                    .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())),
            )
    };
}

fn product_write_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let message = match db_err.constraint() {
            Some("product_sku_key") => "a product with this SKU already exists",
            _ => "a product with this slug already exists",
        };
        return RepositoryError::Conflict(message.to_owned());
    }
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::Conflict("category or brand does not exist".to_owned());
    }
    RepositoryError::Database(e)
}

fn ids(ids: &[ProductId]) -> Vec<i32> {
    ids.iter().map(ProductId::as_i32).collect()
}

/// Repository for products, product images and reviews.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List product summaries matching a filter.
    ///
    /// `only_active` forces the active filter regardless of `filter.status`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        only_active: bool,
        page: PageRequest,
    ) -> Result<(Vec<ProductSummary>, i64), RepositoryError> {
        let active = if only_active {
            Some(true)
        } else {
            filter.active_flag()
        };
        let search = like_pattern(filter.search.as_deref());
        let order_by = filter.sort.unwrap_or_default().order_by();

        let total: i64 = bind_filter!(
            sqlx::query_scalar(&format!(
                "SELECT COUNT(*)
                 FROM skinior.product p
                 LEFT JOIN skinior.category c ON c.id = p.category_id
                 LEFT JOIN skinior.brand b ON b.id = p.brand_id
                 WHERE {FILTER_PREDICATE}"
            )),
            active,
            search.as_deref(),
            filter
        )
        .fetch_one(self.pool)
        .await?;

        let rows: Vec<ProductSummaryRow> = bind_filter!(
            sqlx::query_as(&format!(
                "{SUMMARY_SELECT} WHERE {FILTER_PREDICATE} ORDER BY {order_by} LIMIT $11 OFFSET $12"
            )),
            active,
            search.as_deref(),
            filter
        )
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((rows.into_iter().map(ProductSummary::from).collect(), total))
    }

    /// Active featured products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured(&self, limit: i64) -> Result<Vec<ProductSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductSummaryRow>(&format!(
            "{SUMMARY_SELECT} WHERE p.is_active AND p.is_featured
             ORDER BY p.created_at DESC, p.id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ProductSummary::from).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM skinior.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?)
    }

    /// Full product view by numeric ID or slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_detail(
        &self,
        id_or_slug: &str,
        only_active: bool,
    ) -> Result<Option<ProductDetail>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM skinior.product
             WHERE (id::text = $1 OR slug = $1) AND ($2 = FALSE OR is_active)
             ORDER BY (id::text = $1) DESC
             LIMIT 1"
        ))
        .bind(id_or_slug)
        .bind(only_active)
        .fetch_optional(self.pool)
        .await?;

        let Some(product) = product else {
            return Ok(None);
        };

        let images = self.images(product.id).await?;

        let category = match product.category_id {
            Some(id) => CategoryRepository::new(self.pool).get(id).await?,
            None => None,
        };
        let brand = match product.brand_id {
            Some(id) => BrandRepository::new(self.pool).get(id).await?,
            None => None,
        };

        let (average, total): (Option<f64>, i64) = sqlx::query_as(
            "SELECT AVG(rating)::float8, COUNT(*)
             FROM skinior.product_review WHERE product_id = $1 AND is_published",
        )
        .bind(product.id)
        .fetch_one(self.pool)
        .await?;

        Ok(Some(ProductDetail {
            is_in_stock: product.stock_quantity > 0,
            product,
            images,
            category,
            brand,
            review_stats: ReviewStats::new(average, total),
        }))
    }

    /// Whether a slug is taken by a product other than `exclude`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slug_exists(
        &self,
        slug: &str,
        exclude: Option<ProductId>,
    ) -> Result<bool, RepositoryError> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM skinior.product WHERE slug = $1 AND ($2::int IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(self.pool)
        .await?)
    }

    /// Create a product and its images in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a duplicate SKU or slug.
    #[instrument(skip(self, input), fields(title = %input.title, slug = %slug))]
    pub async fn create(
        &self,
        input: &ProductInput,
        slug: &str,
        currency: &str,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let product = insert_product(&mut tx, input, slug, currency).await?;
        if let Some(images) = &input.images {
            replace_images(&mut tx, product.id, images).await?;
        }
        tx.commit().await?;
        Ok(product)
    }

    /// Update a product; images are replaced when `input.images` is present.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` on a duplicate SKU or slug.
    #[instrument(skip(self, input), fields(product_id = %id))]
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
        slug: &str,
        currency: &str,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let product = bind_product!(
            sqlx::query_as::<_, Product>(&format!(
                "UPDATE skinior.product SET
                    title = $1, title_ar = $2, slug = $3, description_en = $4,
                    description_ar = $5, price = $6, compare_at_price = $7, currency = $8,
                    sku = $9, barcode = $10, stock_quantity = $11, is_active = $12,
                    is_featured = $13, is_new = $14, category_id = $15, brand_id = $16,
                    active_ingredients = $17, skin_types = $18, concerns = $19,
                    features = $20, features_ar = $21, ingredients = $22,
                    ingredients_ar = $23, how_to_use = $24, how_to_use_ar = $25,
                    usage = $26, meta_title = $27, meta_description = $28,
                    attributes = $29, updated_at = NOW()
                 WHERE id = $30
                 RETURNING {PRODUCT_COLUMNS}"
            )),
            input,
            slug,
            currency
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(product_write_error)?
        .ok_or(RepositoryError::NotFound)?;

        if let Some(images) = &input.images {
            replace_images(&mut tx, id, images).await?;
        }

        tx.commit().await?;
        Ok(product)
    }

    /// Delete a product. Images and reviews cascade; order lines keep their snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM skinior.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Apply a bulk action, returning the number of affected products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the target category or brand does not exist.
    #[instrument(skip(self, product_ids), fields(count = product_ids.len()))]
    pub async fn bulk(
        &self,
        product_ids: &[ProductId],
        action: BulkAction,
        value: Option<i32>,
    ) -> Result<u64, RepositoryError> {
        let sql = match action {
            BulkAction::Activate => {
                "UPDATE skinior.product SET is_active = TRUE, updated_at = NOW() WHERE id = ANY($1)"
            }
            BulkAction::Deactivate => {
                "UPDATE skinior.product SET is_active = FALSE, updated_at = NOW() WHERE id = ANY($1)"
            }
            BulkAction::Feature => {
                "UPDATE skinior.product SET is_featured = TRUE, updated_at = NOW() WHERE id = ANY($1)"
            }
            BulkAction::Unfeature => {
                "UPDATE skinior.product SET is_featured = FALSE, updated_at = NOW() WHERE id = ANY($1)"
            }
            BulkAction::SetCategory => {
                "UPDATE skinior.product SET category_id = $2, updated_at = NOW() WHERE id = ANY($1)"
            }
            BulkAction::SetBrand => {
                "UPDATE skinior.product SET brand_id = $2, updated_at = NOW() WHERE id = ANY($1)"
            }
            BulkAction::Delete => "DELETE FROM skinior.product WHERE id = ANY($1)",
        };

        let mut query = sqlx::query(sql).bind(ids(product_ids));
        if matches!(action, BulkAction::SetCategory | BulkAction::SetBrand) {
            query = query.bind(value);
        }

        let result = query.execute(self.pool).await.map_err(product_write_error)?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// All images of a product, main first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images(&self, product_id: ProductId) -> Result<Vec<ProductImage>, RepositoryError> {
        Ok(sqlx::query_as::<_, ProductImage>(
            "SELECT id, product_id, url, alt_text, is_main, sort_order
             FROM skinior.product_image WHERE product_id = $1
             ORDER BY is_main DESC, sort_order, id",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?)
    }

    /// Append an image. The first image of a product, or one flagged main, becomes main.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn add_image(
        &self,
        product_id: ProductId,
        image: &ImageInput,
    ) -> Result<ProductImage, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM skinior.product_image WHERE product_id = $1")
                .bind(product_id)
                .fetch_one(&mut *tx)
                .await?;

        let is_main = image.is_main || existing == 0;
        if is_main {
            sqlx::query("UPDATE skinior.product_image SET is_main = FALSE WHERE product_id = $1")
                .bind(product_id)
                .execute(&mut *tx)
                .await?;
        }

        let inserted = sqlx::query_as::<_, ProductImage>(
            "INSERT INTO skinior.product_image (product_id, url, alt_text, is_main, sort_order)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, product_id, url, alt_text, is_main, sort_order",
        )
        .bind(product_id)
        .bind(&image.url)
        .bind(image.alt_text.as_deref())
        .bind(is_main)
        .bind(i32::try_from(existing).unwrap_or(i32::MAX))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        tx.commit().await?;
        Ok(inserted)
    }

    /// Make one image the product's only main image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image does not belong to the product.
    pub async fn set_main_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM skinior.product_image WHERE id = $1 AND product_id = $2)",
        )
        .bind(image_id)
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;
        if !exists {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("UPDATE skinior.product_image SET is_main = FALSE WHERE product_id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE skinior.product_image SET is_main = TRUE WHERE id = $1")
            .bind(image_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Delete an image; if it was main, the next image is promoted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image does not belong to the product.
    pub async fn delete_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let was_main: Option<bool> = sqlx::query_scalar(
            "DELETE FROM skinior.product_image WHERE id = $1 AND product_id = $2 RETURNING is_main",
        )
        .bind(image_id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;

        match was_main {
            None => return Err(RepositoryError::NotFound),
            Some(true) => {
                sqlx::query(
                    "UPDATE skinior.product_image SET is_main = TRUE
                     WHERE id = (SELECT id FROM skinior.product_image WHERE product_id = $1
                                 ORDER BY sort_order, id LIMIT 1)",
                )
                .bind(product_id)
                .execute(&mut *tx)
                .await?;
            }
            Some(false) => {}
        }

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Store an unpublished review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn create_review(
        &self,
        product_id: ProductId,
        user_id: UserId,
        input: &ReviewInput,
    ) -> Result<Review, RepositoryError> {
        sqlx::query_as::<_, Review>(
            "INSERT INTO skinior.product_review (product_id, user_id, rating, title, body)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, product_id, user_id, rating, title, body, is_published, created_at",
        )
        .bind(product_id)
        .bind(user_id)
        .bind(input.rating)
        .bind(input.title.as_deref())
        .bind(input.body.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })
    }

    /// Publish a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn publish_review(&self, id: ReviewId) -> Result<Review, RepositoryError> {
        sqlx::query_as::<_, Review>(
            "UPDATE skinior.product_review SET is_published = TRUE WHERE id = $1
             RETURNING id, product_id, user_id, rating, title, body, is_published, created_at",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn delete_review(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM skinior.product_review WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

async fn insert_product(
    conn: &mut PgConnection,
    input: &ProductInput,
    slug: &str,
    currency: &str,
) -> Result<Product, RepositoryError> {
    bind_product!(
        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO skinior.product
                (title, title_ar, slug, description_en, description_ar, price,
                 compare_at_price, currency, sku, barcode, stock_quantity, is_active,
                 is_featured, is_new, category_id, brand_id, active_ingredients,
                 skin_types, concerns, features, features_ar, ingredients, ingredients_ar,
                 how_to_use, how_to_use_ar, usage, meta_title, meta_description, attributes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                     $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29)
             RETURNING {PRODUCT_COLUMNS}"
        )),
        input,
        slug,
        currency
    )
    .fetch_one(&mut *conn)
    .await
    .map_err(product_write_error)
}

async fn replace_images(
    conn: &mut PgConnection,
    product_id: ProductId,
    images: &[ImageInput],
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM skinior.product_image WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    let main = main_image_index(images);
    for (index, image) in images.iter().enumerate() {
        sqlx::query(
            "INSERT INTO skinior.product_image (product_id, url, alt_text, is_main, sort_order)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(product_id)
        .bind(&image.url)
        .bind(image.alt_text.as_deref())
        .bind(main == Some(index))
        .bind(i32::try_from(index).unwrap_or(i32::MAX))
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Products created by spreadsheet import. Each row runs in its own transaction.
///
/// Returns `None` when a product with the same SKU or title (case-insensitive)
/// already exists.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` on a duplicate slug or SKU race.
pub(crate) async fn import_product(
    pool: &PgPool,
    input: &ProductInput,
    slug: &str,
    currency: &str,
) -> Result<Option<Product>, RepositoryError> {
    let mut tx = pool.begin().await?;

    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(
             SELECT 1 FROM skinior.product
             WHERE ($1::text IS NOT NULL AND sku = $1) OR LOWER(title) = LOWER($2)
         )",
    )
    .bind(input.sku.as_deref())
    .bind(input.title.trim())
    .fetch_one(&mut *tx)
    .await?;
    if exists {
        return Ok(None);
    }

    let product = insert_product(&mut tx, input, slug, currency).await?;
    if let Some(images) = &input.images {
        replace_images(&mut tx, product.id, images).await?;
    }

    tx.commit().await?;
    Ok(Some(product))
}

// =============================================================================
// Categories
// =============================================================================

const CATEGORY_COLUMNS: &str = "id, name, name_ar, slug, description, image_url, parent_id, \
     sort_order, is_active, created_at, updated_at";

/// Repository for categories.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories ordered by `sort_order`, then name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, only_active: bool) -> Result<Vec<Category>, RepositoryError> {
        Ok(sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM skinior.category
             WHERE ($1 = FALSE OR is_active)
             ORDER BY sort_order, name"
        ))
        .bind(only_active)
        .fetch_all(self.pool)
        .await?)
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        Ok(sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM skinior.category WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?)
    }

    /// Whether a slug is taken by a category other than `exclude`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slug_exists(
        &self,
        slug: &str,
        exclude: Option<CategoryId>,
    ) -> Result<bool, RepositoryError> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM skinior.category WHERE slug = $1 AND ($2::int IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(self.pool)
        .await?)
    }

    /// Case-insensitive lookup by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Category>, RepositoryError> {
        Ok(sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM skinior.category
             WHERE LOWER(name) = LOWER($1) ORDER BY id LIMIT 1"
        ))
        .bind(name.trim())
        .fetch_optional(self.pool)
        .await?)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(
        &self,
        input: &CategoryInput,
        slug: &str,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO skinior.category
                (name, name_ar, slug, description, image_url, parent_id, sort_order, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(input.name.trim())
        .bind(input.name_ar.as_deref())
        .bind(slug)
        .bind(input.description.as_deref())
        .bind(input.image_url.as_deref())
        .bind(input.parent_id)
        .bind(input.sort_order)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "a category with this slug already exists"))
    }

    /// Update a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        input: &CategoryInput,
        slug: &str,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(&format!(
            "UPDATE skinior.category SET
                name = $2, name_ar = $3, slug = $4, description = $5, image_url = $6,
                parent_id = $7, sort_order = $8, is_active = $9, updated_at = NOW()
             WHERE id = $1
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(input.name_ar.as_deref())
        .bind(slug)
        .bind(input.description.as_deref())
        .bind(input.image_url.as_deref())
        .bind(input.parent_id)
        .bind(input.sort_order)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "a category with this slug already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a category, detaching its children and products in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE skinior.category SET parent_id = NULL, updated_at = NOW() WHERE parent_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE skinior.product SET category_id = NULL, updated_at = NOW() WHERE category_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM skinior.category WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }

    /// Number of categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM skinior.category")
            .fetch_one(self.pool)
            .await?)
    }
}

// =============================================================================
// Brands
// =============================================================================

const BRAND_COLUMNS: &str =
    "id, name, name_ar, slug, description, logo_url, website_url, is_active, created_at, updated_at";

/// Repository for brands.
pub struct BrandRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BrandRepository<'a> {
    /// Create a new brand repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Brands ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, only_active: bool) -> Result<Vec<Brand>, RepositoryError> {
        Ok(sqlx::query_as::<_, Brand>(&format!(
            "SELECT {BRAND_COLUMNS} FROM skinior.brand WHERE ($1 = FALSE OR is_active) ORDER BY name"
        ))
        .bind(only_active)
        .fetch_all(self.pool)
        .await?)
    }

    /// Get a brand by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BrandId) -> Result<Option<Brand>, RepositoryError> {
        Ok(sqlx::query_as::<_, Brand>(&format!(
            "SELECT {BRAND_COLUMNS} FROM skinior.brand WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?)
    }

    /// Whether a slug is taken by a brand other than `exclude`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slug_exists(
        &self,
        slug: &str,
        exclude: Option<BrandId>,
    ) -> Result<bool, RepositoryError> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM skinior.brand WHERE slug = $1 AND ($2::int IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(self.pool)
        .await?)
    }

    /// Case-insensitive lookup by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Brand>, RepositoryError> {
        Ok(sqlx::query_as::<_, Brand>(&format!(
            "SELECT {BRAND_COLUMNS} FROM skinior.brand WHERE LOWER(name) = LOWER($1) ORDER BY id LIMIT 1"
        ))
        .bind(name.trim())
        .fetch_optional(self.pool)
        .await?)
    }

    /// Create a brand.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, input: &BrandInput, slug: &str) -> Result<Brand, RepositoryError> {
        sqlx::query_as::<_, Brand>(&format!(
            "INSERT INTO skinior.brand (name, name_ar, slug, description, logo_url, website_url, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {BRAND_COLUMNS}"
        ))
        .bind(input.name.trim())
        .bind(input.name_ar.as_deref())
        .bind(slug)
        .bind(input.description.as_deref())
        .bind(input.logo_url.as_deref())
        .bind(input.website_url.as_deref())
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "a brand with this slug already exists"))
    }

    /// Update a brand.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the brand does not exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(
        &self,
        id: BrandId,
        input: &BrandInput,
        slug: &str,
    ) -> Result<Brand, RepositoryError> {
        sqlx::query_as::<_, Brand>(&format!(
            "UPDATE skinior.brand SET
                name = $2, name_ar = $3, slug = $4, description = $5, logo_url = $6,
                website_url = $7, is_active = $8, updated_at = NOW()
             WHERE id = $1
             RETURNING {BRAND_COLUMNS}"
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(input.name_ar.as_deref())
        .bind(slug)
        .bind(input.description.as_deref())
        .bind(input.logo_url.as_deref())
        .bind(input.website_url.as_deref())
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "a brand with this slug already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a brand, detaching its products in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the brand does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: BrandId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE skinior.product SET brand_id = NULL, updated_at = NOW() WHERE brand_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM skinior.brand WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }

    /// Number of brands.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM skinior.brand")
            .fetch_one(self.pool)
            .await?)
    }
}

