//! Blog, newsletter and waitlist repositories.

use sqlx::PgPool;
use tracing::instrument;

use skinior_core::{BlogPostId, Locale};

use super::{RepositoryError, like_pattern};
use crate::models::PageRequest;
use crate::models::content::{
    BlogFilter, BlogPost, BlogPostDerived, BlogPostInput, Subscriber, SubscriberFilter,
    SubscriberStats, WaitlistEntry,
};

const POST_COLUMNS: &str = "id, title_en, title_ar, slug_en, slug_ar, excerpt_en, excerpt_ar, \
     content_en, content_ar, featured_image, author_name, category, tags, read_time_en, \
     read_time_ar, is_published, is_featured, views, published_at, created_at, updated_at";

const SUBSCRIBER_COLUMNS: &str = "id, email, locale, is_active, subscribed_at, unsubscribed_at";

/// Blog list predicate; `$1` include drafts, `$2` search, `$3` category,
/// `$4` tag, `$5` featured.
const POST_FILTER: &str = "($1 OR is_published)
     AND ($2::text IS NULL OR title_en ILIKE $2 OR title_ar ILIKE $2
          OR excerpt_en ILIKE $2 OR excerpt_ar ILIKE $2)
     AND ($3::text IS NULL OR category = $3)
     AND ($4::text IS NULL OR $4 = ANY(tags))
     AND ($5::bool IS NULL OR is_featured = $5)";

fn post_write_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::conflict_on_unique(e, "a post with this slug already exists")
}

/// Repository for blog posts.
pub struct BlogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BlogRepository<'a> {
    /// Create a new blog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Posts matching `filter`, newest published first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &BlogFilter,
        include_drafts: bool,
        page: PageRequest,
    ) -> Result<(Vec<BlogPost>, i64), RepositoryError> {
        let search = like_pattern(filter.search.as_deref());

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM skinior.blog_post WHERE {POST_FILTER}"
        ))
        .bind(include_drafts)
        .bind(search.as_deref())
        .bind(filter.category.as_deref())
        .bind(filter.tag.as_deref())
        .bind(filter.featured)
        .fetch_one(self.pool)
        .await?;

        let posts = sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {POST_COLUMNS} FROM skinior.blog_post WHERE {POST_FILTER}
             ORDER BY published_at DESC NULLS LAST, created_at DESC, id DESC
             LIMIT $6 OFFSET $7"
        ))
        .bind(include_drafts)
        .bind(search.as_deref())
        .bind(filter.category.as_deref())
        .bind(filter.tag.as_deref())
        .bind(filter.featured)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((posts, total))
    }

    /// Featured published posts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured(&self, limit: i64) -> Result<Vec<BlogPost>, RepositoryError> {
        Ok(sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {POST_COLUMNS} FROM skinior.blog_post
             WHERE is_published AND is_featured
             ORDER BY published_at DESC NULLS LAST, id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }

    /// Get a post by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BlogPostId) -> Result<Option<BlogPost>, RepositoryError> {
        Ok(sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {POST_COLUMNS} FROM skinior.blog_post WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?)
    }

    /// Get a post by its English or Arabic slug, counting the view.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn view_by_slug(
        &self,
        slug: &str,
        include_drafts: bool,
    ) -> Result<Option<BlogPost>, RepositoryError> {
        Ok(sqlx::query_as::<_, BlogPost>(&format!(
            "UPDATE skinior.blog_post SET views = views + 1
             WHERE (slug_en = $1 OR slug_ar = $1) AND ($2 OR is_published)
             RETURNING {POST_COLUMNS}"
        ))
        .bind(slug)
        .bind(include_drafts)
        .fetch_optional(self.pool)
        .await?)
    }

    /// Published posts sharing a category or a tag with `post`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn related(&self, post: &BlogPost, limit: i64) -> Result<Vec<BlogPost>, RepositoryError> {
        Ok(sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {POST_COLUMNS} FROM skinior.blog_post
             WHERE is_published AND id <> $1
               AND (($2::text IS NOT NULL AND category = $2) OR tags && $3)
             ORDER BY published_at DESC NULLS LAST, id DESC LIMIT $4"
        ))
        .bind(post.id)
        .bind(post.category.as_deref())
        .bind(post.tags.as_slice())
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }

    /// Whether a slug is used by any post other than `exclude`, in either language.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slug_exists(
        &self,
        slug: &str,
        exclude: Option<BlogPostId>,
    ) -> Result<bool, RepositoryError> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM skinior.blog_post
             WHERE (slug_en = $1 OR slug_ar = $1) AND ($2::int IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(self.pool)
        .await?)
    }

    /// Create a post.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a slug is taken.
    #[instrument(skip(self, input, derived), fields(slug = %derived.slug_en))]
    pub async fn create(
        &self,
        input: &BlogPostInput,
        derived: &BlogPostDerived,
    ) -> Result<BlogPost, RepositoryError> {
        sqlx::query_as::<_, BlogPost>(&format!(
            "INSERT INTO skinior.blog_post
                (title_en, title_ar, slug_en, slug_ar, excerpt_en, excerpt_ar, content_en,
                 content_ar, featured_image, author_name, category, tags, read_time_en,
                 read_time_ar, is_published, is_featured, published_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                     CASE WHEN $15 THEN NOW() END)
             RETURNING {POST_COLUMNS}"
        ))
        .bind(&input.title_en)
        .bind(&input.title_ar)
        .bind(&derived.slug_en)
        .bind(&derived.slug_ar)
        .bind(input.excerpt_en.as_deref())
        .bind(input.excerpt_ar.as_deref())
        .bind(&input.content_en)
        .bind(&input.content_ar)
        .bind(input.featured_image.as_deref())
        .bind(input.author_name.as_deref())
        .bind(input.category.as_deref())
        .bind(input.tags.as_slice())
        .bind(&derived.read_time_en)
        .bind(&derived.read_time_ar)
        .bind(input.is_published)
        .bind(input.is_featured)
        .fetch_one(self.pool)
        .await
        .map_err(post_write_error)
    }

    /// Replace a post. `published_at` is set the first time it is published.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the post does not exist.
    /// Returns `RepositoryError::Conflict` if a slug is taken.
    pub async fn update(
        &self,
        id: BlogPostId,
        input: &BlogPostInput,
        derived: &BlogPostDerived,
    ) -> Result<BlogPost, RepositoryError> {
        sqlx::query_as::<_, BlogPost>(&format!(
            "UPDATE skinior.blog_post SET
                title_en = $2, title_ar = $3, slug_en = $4, slug_ar = $5,
                excerpt_en = $6, excerpt_ar = $7, content_en = $8, content_ar = $9,
                featured_image = $10, author_name = $11, category = $12, tags = $13,
                read_time_en = $14, read_time_ar = $15, is_published = $16, is_featured = $17,
                published_at = CASE WHEN $16 AND published_at IS NULL THEN NOW()
                                    ELSE published_at END,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.title_en)
        .bind(&input.title_ar)
        .bind(&derived.slug_en)
        .bind(&derived.slug_ar)
        .bind(input.excerpt_en.as_deref())
        .bind(input.excerpt_ar.as_deref())
        .bind(&input.content_en)
        .bind(&input.content_ar)
        .bind(input.featured_image.as_deref())
        .bind(input.author_name.as_deref())
        .bind(input.category.as_deref())
        .bind(input.tags.as_slice())
        .bind(&derived.read_time_en)
        .bind(&derived.read_time_ar)
        .bind(input.is_published)
        .bind(input.is_featured)
        .fetch_optional(self.pool)
        .await
        .map_err(post_write_error)?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a post.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the post does not exist.
    pub async fn delete(&self, id: BlogPostId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM skinior.blog_post WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Repository for newsletter subscribers and waitlist signups.
pub struct NewsletterRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NewsletterRepository<'a> {
    /// Create a new newsletter repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe an address, reactivating it if it had unsubscribed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the address is already subscribed.
    #[instrument(skip(self, email))]
    pub async fn subscribe(&self, email: &str, locale: Locale) -> Result<Subscriber, RepositoryError> {
        sqlx::query_as::<_, Subscriber>(&format!(
            "INSERT INTO skinior.newsletter_subscriber (email, locale) VALUES ($1, $2)
             ON CONFLICT (email) DO UPDATE SET
                is_active = TRUE, locale = EXCLUDED.locale,
                subscribed_at = NOW(), unsubscribed_at = NULL
             WHERE NOT skinior.newsletter_subscriber.is_active
             RETURNING {SUBSCRIBER_COLUMNS}"
        ))
        .bind(email)
        .bind(locale)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| RepositoryError::Conflict("email is already subscribed".to_owned()))
    }

    /// Unsubscribe an address. Unknown or inactive addresses are left alone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unsubscribe(&self, email: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE skinior.newsletter_subscriber
             SET is_active = FALSE, unsubscribed_at = NOW()
             WHERE email = $1 AND is_active",
        )
        .bind(email)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Subscribers, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &SubscriberFilter,
        page: PageRequest,
    ) -> Result<(Vec<Subscriber>, i64), RepositoryError> {
        let predicate = "($1::skinior.locale IS NULL OR locale = $1)
             AND ($2::bool IS NULL OR is_active = $2)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM skinior.newsletter_subscriber WHERE {predicate}"
        ))
        .bind(filter.locale)
        .bind(filter.active)
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Subscriber>(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM skinior.newsletter_subscriber WHERE {predicate}
             ORDER BY subscribed_at DESC, id DESC LIMIT $3 OFFSET $4"
        ))
        .bind(filter.locale)
        .bind(filter.active)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Subscriber counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<SubscriberStats, RepositoryError> {
        Ok(sqlx::query_as::<_, SubscriberStats>(
            "SELECT COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE is_active) AS active,
                    COUNT(*) FILTER (WHERE is_active AND locale = 'en') AS english,
                    COUNT(*) FILTER (WHERE is_active AND locale = 'ar') AS arabic
             FROM skinior.newsletter_subscriber",
        )
        .fetch_one(self.pool)
        .await?)
    }

    /// Add an address to the launch waitlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the address is already on the list.
    pub async fn join_waitlist(
        &self,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<WaitlistEntry, RepositoryError> {
        sqlx::query_as::<_, WaitlistEntry>(
            "INSERT INTO skinior.waitlist_entry (email, first_name, last_name)
             VALUES ($1, $2, $3)
             RETURNING id, email, first_name, last_name, created_at",
        )
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "email is already on the waitlist"))
    }
}
