//! Catalog service: slugs, validation, the category tree and cache upkeep
//! around the catalog repositories.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use skinior_core::{BrandId, CategoryId, CurrencyCode, ImageId, ProductId, ReviewId, Slug, UserId};

use crate::cache::CatalogCache;
use crate::db::RepositoryError;
use crate::db::catalog::{BrandRepository, CategoryRepository, ProductRepository};
use crate::models::catalog::{
    Brand, BrandInput, BulkAction, BulkRequest, Category, CategoryInput, CategoryNode,
    ImageInput, Product, ProductDetail, ProductFilter, ProductImage, ProductInput,
    ProductSummary, Review, ReviewInput,
};
use crate::models::{PageRequest, Paginated};

/// Give up after this many `-n` suffixes.
const MAX_SLUG_ATTEMPTS: u32 = 100;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0}")]
    Invalid(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("a category cannot be its own ancestor")]
    CategoryCycle,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Find a free slug: `base`, then `base-1`, `base-2`, ...
///
/// `taken` reports whether a candidate is already in use.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` when no free slug is found.
pub async fn unique_slug<F, Fut>(base: &Slug, mut taken: F) -> Result<String, RepositoryError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, RepositoryError>>,
{
    if !taken(base.as_str().to_owned()).await? {
        return Ok(base.as_str().to_owned());
    }
    for n in 1..=MAX_SLUG_ATTEMPTS {
        let candidate = base.with_suffix(n);
        if !taken(candidate.as_str().to_owned()).await? {
            return Ok(candidate.into_inner());
        }
    }
    Err(RepositoryError::Conflict(format!(
        "no free slug for {base}"
    )))
}

fn slug_for(text: &str) -> Result<Slug, CatalogError> {
    Slug::from_title(text)
        .ok_or_else(|| CatalogError::Invalid("title must contain letters or digits".to_owned()))
}

/// Nest categories under their parents, keeping the input order among
/// siblings. Categories whose parent is absent become roots.
#[must_use]
pub fn build_tree(categories: Vec<Category>) -> Vec<CategoryNode> {
    let present: std::collections::HashSet<CategoryId> =
        categories.iter().map(|c| c.id).collect();

    let mut children: HashMap<Option<CategoryId>, Vec<Category>> = HashMap::new();
    for category in categories {
        let parent = category.parent_id.filter(|p| present.contains(p));
        children.entry(parent).or_default().push(category);
    }

    fn attach(
        parent: Option<CategoryId>,
        children: &mut HashMap<Option<CategoryId>, Vec<Category>>,
    ) -> Vec<CategoryNode> {
        children
            .remove(&parent)
            .unwrap_or_default()
            .into_iter()
            .map(|category| {
                let id = category.id;
                CategoryNode {
                    category,
                    children: attach(Some(id), children),
                }
            })
            .collect()
    }

    attach(None, &mut children)
}

/// Whether giving `id` the parent `new_parent` would make it its own ancestor.
///
/// `parents` maps every category to its current parent.
#[must_use]
pub fn creates_cycle(
    id: CategoryId,
    new_parent: CategoryId,
    parents: &HashMap<CategoryId, Option<CategoryId>>,
) -> bool {
    let mut current = Some(new_parent);
    let mut steps = 0;
    while let Some(node) = current {
        if node == id {
            return true;
        }
        steps += 1;
        // Existing data is already cyclic; refuse rather than loop.
        if steps > parents.len() {
            return true;
        }
        current = parents.get(&node).copied().flatten();
    }
    false
}

fn validate_product(input: &ProductInput, default_currency: CurrencyCode) -> Result<String, CatalogError> {
    if input.title.trim().is_empty() {
        return Err(CatalogError::Invalid("title is required".to_owned()));
    }
    if input.price < Decimal::ZERO {
        return Err(CatalogError::Invalid("price must not be negative".to_owned()));
    }
    if input.compare_at_price.is_some_and(|p| p < Decimal::ZERO) {
        return Err(CatalogError::Invalid("compare_at_price must not be negative".to_owned()));
    }
    if input.stock_quantity < 0 {
        return Err(CatalogError::Invalid("stock_quantity must not be negative".to_owned()));
    }
    if let Some(images) = &input.images
        && images.iter().any(|i| i.url.trim().is_empty())
    {
        return Err(CatalogError::Invalid("image url is required".to_owned()));
    }
    let currency = match input.currency.as_deref() {
        Some(code) => code.parse::<CurrencyCode>().map_err(CatalogError::Invalid)?,
        None => default_currency,
    };
    Ok(currency.code().to_owned())
}

/// Catalog operations shared by the public and admin routes.
pub struct CatalogService<'a> {
    pool: &'a PgPool,
    cache: &'a CatalogCache,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CatalogCache) -> Self {
        Self { pool, cache }
    }

    const fn products(&self) -> ProductRepository<'a> {
        ProductRepository::new(self.pool)
    }

    const fn categories(&self) -> CategoryRepository<'a> {
        CategoryRepository::new(self.pool)
    }

    const fn brands(&self) -> BrandRepository<'a> {
        BrandRepository::new(self.pool)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// A page of product summaries. Public listings pass `only_active`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        only_active: bool,
        page: PageRequest,
    ) -> Result<Paginated<ProductSummary>, CatalogError> {
        let (rows, total) = self.products().list(filter, only_active, page).await?;
        Ok(Paginated::new(rows, page, total))
    }

    /// Featured active products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn featured(&self, limit: i64) -> Result<Arc<Vec<ProductSummary>>, CatalogError> {
        if let Some(products) = self.cache.featured(limit).await {
            return Ok(products);
        }
        let products = Arc::new(self.products().featured(limit).await?);
        self.cache.put_featured(limit, Arc::clone(&products)).await;
        Ok(products)
    }

    /// A product by numeric id or slug.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if it does not exist (or is inactive
    /// when `only_active`).
    pub async fn product_detail(
        &self,
        id_or_slug: &str,
        only_active: bool,
    ) -> Result<ProductDetail, CatalogError> {
        self.products()
            .get_detail(id_or_slug, only_active)
            .await?
            .ok_or(CatalogError::NotFound("product"))
    }

    /// Create a product with a unique slug derived from its title.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for invalid input.
    /// Returns `CatalogError::Repository` with `Conflict` on a duplicate SKU.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_product(
        &self,
        input: &ProductInput,
        default_currency: CurrencyCode,
    ) -> Result<Product, CatalogError> {
        let currency = validate_product(input, default_currency)?;
        let base = slug_for(&input.title)?;
        let products = self.products();
        let slug = unique_slug(&base, |s| {
            let products = &products;
            async move { products.slug_exists(&s, None).await }
        })
        .await?;

        let product = products.create(input, &slug, &currency).await?;
        self.cache.invalidate_products().await;
        info!(product_id = %product.id, slug = %product.slug, "Product created");
        Ok(product)
    }

    /// Replace a product. The slug is regenerated only when the title changes.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist.
    /// Returns `CatalogError::Invalid` for invalid input.
    #[instrument(skip(self, input), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
        default_currency: CurrencyCode,
    ) -> Result<Product, CatalogError> {
        let currency = validate_product(input, default_currency)?;
        let products = self.products();
        let existing = products.get(id).await?.ok_or(CatalogError::NotFound("product"))?;

        let slug = if existing.title.trim() == input.title.trim() {
            existing.slug
        } else {
            let base = slug_for(&input.title)?;
            unique_slug(&base, |s| {
                let products = &products;
                async move { products.slug_exists(&s, Some(id)).await }
            })
            .await?
        };

        let product = products
            .update(id, input, &slug, &currency)
            .await
            .map_err(not_found("product"))?;
        self.cache.invalidate_products().await;
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist.
    pub async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        self.products().delete(id).await.map_err(not_found("product"))?;
        self.cache.invalidate_products().await;
        Ok(())
    }

    /// Apply a bulk action, returning the number of affected products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for an empty id list or a missing
    /// category/brand value.
    #[instrument(skip(self, request), fields(action = ?request.action, count = request.ids.len()))]
    pub async fn bulk(&self, request: &BulkRequest) -> Result<u64, CatalogError> {
        if request.ids.is_empty() {
            return Err(CatalogError::Invalid("ids must not be empty".to_owned()));
        }
        match request.action {
            BulkAction::SetCategory => {
                let id = request
                    .value
                    .ok_or_else(|| CatalogError::Invalid("value (category id) is required".to_owned()))?;
                self.categories()
                    .get(CategoryId::new(id))
                    .await?
                    .ok_or(CatalogError::NotFound("category"))?;
            }
            BulkAction::SetBrand => {
                let id = request
                    .value
                    .ok_or_else(|| CatalogError::Invalid("value (brand id) is required".to_owned()))?;
                self.brands()
                    .get(BrandId::new(id))
                    .await?
                    .ok_or(CatalogError::NotFound("brand"))?;
            }
            _ => {}
        }

        let affected = self
            .products()
            .bulk(&request.ids, request.action, request.value)
            .await?;
        self.cache.invalidate_products().await;
        Ok(affected)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist.
    pub async fn add_image(
        &self,
        product_id: ProductId,
        image: &ImageInput,
    ) -> Result<ProductImage, CatalogError> {
        if image.url.trim().is_empty() {
            return Err(CatalogError::Invalid("image url is required".to_owned()));
        }
        self.products()
            .get(product_id)
            .await?
            .ok_or(CatalogError::NotFound("product"))?;
        let image = self.products().add_image(product_id, image).await?;
        self.cache.invalidate_products().await;
        Ok(image)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the image is not on this product.
    pub async fn set_main_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<Vec<ProductImage>, CatalogError> {
        let products = self.products();
        products
            .set_main_image(product_id, image_id)
            .await
            .map_err(not_found("image"))?;
        self.cache.invalidate_products().await;
        Ok(products.images(product_id).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the image is not on this product.
    pub async fn delete_image(&self, product_id: ProductId, image_id: ImageId) -> Result<(), CatalogError> {
        self.products()
            .delete_image(product_id, image_id)
            .await
            .map_err(not_found("image"))?;
        self.cache.invalidate_products().await;
        Ok(())
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Submit a review; it stays hidden until published by an admin.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` if the rating is outside 1..=5.
    /// Returns `CatalogError::NotFound` if the product is missing or inactive.
    pub async fn create_review(
        &self,
        product_id: ProductId,
        user_id: UserId,
        input: &ReviewInput,
    ) -> Result<Review, CatalogError> {
        if !(1..=5).contains(&input.rating) {
            return Err(CatalogError::Invalid("rating must be between 1 and 5".to_owned()));
        }
        let product = self.products().get(product_id).await?;
        if !product.is_some_and(|p| p.is_active) {
            return Err(CatalogError::NotFound("product"));
        }
        Ok(self.products().create_review(product_id, user_id, input).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the review does not exist.
    pub async fn publish_review(&self, id: ReviewId) -> Result<Review, CatalogError> {
        let review = self
            .products()
            .publish_review(id)
            .await
            .map_err(not_found("review"))?;
        self.cache.invalidate_products().await;
        Ok(review)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the review does not exist.
    pub async fn delete_review(&self, id: ReviewId) -> Result<(), CatalogError> {
        self.products().delete_review(id).await.map_err(not_found("review"))?;
        self.cache.invalidate_products().await;
        Ok(())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Active categories as a tree.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn category_tree(&self) -> Result<Arc<Vec<CategoryNode>>, CatalogError> {
        if let Some(tree) = self.cache.category_tree().await {
            return Ok(tree);
        }
        let tree = Arc::new(build_tree(self.categories().list(true).await?));
        self.cache.put_category_tree(Arc::clone(&tree)).await;
        Ok(tree)
    }

    /// Every category, flat, for the admin.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn all_categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.categories().list(false).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the category does not exist.
    pub async fn category(&self, id: CategoryId) -> Result<Category, CatalogError> {
        self.categories()
            .get(id)
            .await?
            .ok_or(CatalogError::NotFound("category"))
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the parent does not exist.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category, CatalogError> {
        if let Some(parent) = input.parent_id {
            self.category(parent).await?;
        }
        let slug = self.category_slug(input, None).await?;
        let category = self.categories().create(input, &slug).await?;
        self.cache.invalidate_categories().await;
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::CategoryCycle` if the new parent is the category
    /// itself or one of its descendants.
    #[instrument(skip(self, input), fields(category_id = %id))]
    pub async fn update_category(
        &self,
        id: CategoryId,
        input: &CategoryInput,
    ) -> Result<Category, CatalogError> {
        let existing = self.category(id).await?;

        if let Some(parent) = input.parent_id {
            let all = self.categories().list(false).await?;
            if !all.iter().any(|c| c.id == parent) {
                return Err(CatalogError::NotFound("parent category"));
            }
            let parents = all.iter().map(|c| (c.id, c.parent_id)).collect();
            if creates_cycle(id, parent, &parents) {
                return Err(CatalogError::CategoryCycle);
            }
        }

        let slug = if input.slug.is_none() && existing.name.trim() == input.name.trim() {
            existing.slug
        } else {
            self.category_slug(input, Some(id)).await?
        };

        let category = self
            .categories()
            .update(id, input, &slug)
            .await
            .map_err(not_found("category"))?;
        self.cache.invalidate_categories().await;
        Ok(category)
    }

    /// Delete a category; children become roots and products lose the category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the category does not exist.
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), CatalogError> {
        self.categories().delete(id).await.map_err(not_found("category"))?;
        self.cache.invalidate_categories().await;
        self.cache.invalidate_products().await;
        Ok(())
    }

    async fn category_slug(
        &self,
        input: &CategoryInput,
        exclude: Option<CategoryId>,
    ) -> Result<String, CatalogError> {
        let base = slug_for(input.slug.as_deref().unwrap_or(&input.name))?;
        let categories = self.categories();
        Ok(unique_slug(&base, |s| {
            let categories = &categories;
            async move { categories.slug_exists(&s, exclude).await }
        })
        .await?)
    }

    // =========================================================================
    // Brands
    // =========================================================================

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn brands_list(&self, only_active: bool) -> Result<Vec<Brand>, CatalogError> {
        Ok(self.brands().list(only_active).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the brand does not exist.
    pub async fn brand(&self, id: BrandId) -> Result<Brand, CatalogError> {
        self.brands().get(id).await?.ok_or(CatalogError::NotFound("brand"))
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` if the name has no slug-worthy characters.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_brand(&self, input: &BrandInput) -> Result<Brand, CatalogError> {
        let slug = self.brand_slug(input, None).await?;
        Ok(self.brands().create(input, &slug).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the brand does not exist.
    pub async fn update_brand(&self, id: BrandId, input: &BrandInput) -> Result<Brand, CatalogError> {
        let existing = self.brand(id).await?;
        let slug = if input.slug.is_none() && existing.name.trim() == input.name.trim() {
            existing.slug
        } else {
            self.brand_slug(input, Some(id)).await?
        };
        let brand = self
            .brands()
            .update(id, input, &slug)
            .await
            .map_err(not_found("brand"))?;
        self.cache.invalidate_products().await;
        Ok(brand)
    }

    /// Delete a brand; its products become unbranded.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the brand does not exist.
    pub async fn delete_brand(&self, id: BrandId) -> Result<(), CatalogError> {
        self.brands().delete(id).await.map_err(not_found("brand"))?;
        self.cache.invalidate_products().await;
        Ok(())
    }

    async fn brand_slug(&self, input: &BrandInput, exclude: Option<BrandId>) -> Result<String, CatalogError> {
        let base = slug_for(input.slug.as_deref().unwrap_or(&input.name))?;
        let brands = self.brands();
        Ok(unique_slug(&base, |s| {
            let brands = &brands;
            async move { brands.slug_exists(&s, exclude).await }
        })
        .await?)
    }
}

/// Map `RepositoryError::NotFound` to a named `CatalogError::NotFound`.
fn not_found(what: &'static str) -> impl Fn(RepositoryError) -> CatalogError {
    move |e| match e {
        RepositoryError::NotFound => CatalogError::NotFound(what),
        other => CatalogError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    fn category(id: i32, parent: Option<i32>, name: &str) -> Category {
        Category {
            id: CategoryId::new(id),
            name: name.to_owned(),
            name_ar: None,
            slug: name.to_lowercase(),
            description: None,
            image_url: None,
            parent_id: parent.map(CategoryId::new),
            sort_order: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_tree_nests_children_in_order() {
        let tree = build_tree(vec![
            category(1, None, "Skincare"),
            category(2, Some(1), "Cleansers"),
            category(3, Some(1), "Serums"),
            category(4, Some(3), "Vitamin C"),
            category(5, None, "Haircare"),
        ]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].category.name, "Skincare");
        let names: Vec<_> = tree[0].children.iter().map(|n| n.category.name.as_str()).collect();
        assert_eq!(names, ["Cleansers", "Serums"]);
        assert_eq!(tree[0].children[1].children[0].category.name, "Vitamin C");
        assert!(tree[1].children.is_empty());
    }

    #[test]
    fn test_build_tree_orphans_become_roots() {
        // Parent 9 is inactive and therefore not in the list.
        let tree = build_tree(vec![category(2, Some(9), "Masks")]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].category.name, "Masks");
    }

    #[test]
    fn test_creates_cycle() {
        let parents: HashMap<_, _> = [(1, None), (2, Some(1)), (3, Some(2))]
            .into_iter()
            .map(|(id, p)| (CategoryId::new(id), p.map(CategoryId::new)))
            .collect();

        let id = CategoryId::new;
        assert!(creates_cycle(id(1), id(1), &parents));
        assert!(creates_cycle(id(1), id(3), &parents));
        assert!(!creates_cycle(id(3), id(1), &parents));
        assert!(!creates_cycle(id(2), id(1), &parents));
    }

    #[test]
    fn test_creates_cycle_on_corrupt_data() {
        let parents: HashMap<_, _> = [(1, Some(2)), (2, Some(1))]
            .into_iter()
            .map(|(id, p)| (CategoryId::new(id), p.map(CategoryId::new)))
            .collect();
        assert!(creates_cycle(CategoryId::new(7), CategoryId::new(1), &parents));
    }

    #[tokio::test]
    async fn test_unique_slug_appends_suffix() {
        let taken = ["serum", "serum-1"];
        let seen = Mutex::new(Vec::new());
        let slug = unique_slug(&Slug::from_title("Serum").unwrap(), |s| {
            seen.lock().unwrap().push(s.clone());
            let hit = taken.contains(&s.as_str());
            async move { Ok(hit) }
        })
        .await
        .unwrap();

        assert_eq!(slug, "serum-2");
        assert_eq!(*seen.lock().unwrap(), ["serum", "serum-1", "serum-2"]);
    }

    #[tokio::test]
    async fn test_unique_slug_free_base() {
        let slug = unique_slug(&Slug::from_title("غسول الوجه").unwrap(), |_| async { Ok(false) })
            .await
            .unwrap();
        assert_eq!(slug, "غسول-الوجه");
    }

    #[test]
    fn test_validate_product() {
        let mut input = ProductInput {
            title: "Cleanser".to_owned(),
            price: Decimal::new(1250, 2),
            ..ProductInput::default()
        };
        assert_eq!(validate_product(&input, CurrencyCode::JOD).unwrap(), "JOD");

        input.currency = Some("usd".to_owned());
        assert_eq!(validate_product(&input, CurrencyCode::JOD).unwrap(), "USD");

        input.currency = Some("GBP".to_owned());
        assert!(matches!(
            validate_product(&input, CurrencyCode::JOD),
            Err(CatalogError::Invalid(_))
        ));

        input.currency = None;
        input.price = Decimal::new(-1, 0);
        assert!(validate_product(&input, CurrencyCode::JOD).is_err());

        input.price = Decimal::ONE;
        input.title = "  ".to_owned();
        assert!(validate_product(&input, CurrencyCode::JOD).is_err());
    }
}
