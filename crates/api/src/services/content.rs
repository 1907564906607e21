//! Blog posts, newsletter subscriptions and the waitlist.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use skinior_core::{BlogPostId, Email, EmailError, Slug};

use crate::db::RepositoryError;
use crate::db::content::{BlogRepository, NewsletterRepository};
use crate::models::PageRequest;
use crate::models::content::{
    BlogFilter, BlogPost, BlogPostDerived, BlogPostInput, JoinWaitlistRequest, SubscribeRequest,
    Subscriber, SubscriberFilter, SubscriberStats, WaitlistEntry,
};
use crate::models::pagination::Paginated;

const WORDS_PER_MINUTE: usize = 200;
const RELATED_LIMIT: i64 = 3;

/// Errors from content operations.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    InvalidEmail(#[from] EmailError),

    #[error("post not found")]
    NotFound,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn not_found(e: RepositoryError) -> ContentError {
    match e {
        RepositoryError::NotFound => ContentError::NotFound,
        other => ContentError::Repository(other),
    }
}

/// Reading time at 200 words per minute, at least one minute.
#[must_use]
pub fn read_minutes(content: &str) -> usize {
    content
        .split_whitespace()
        .count()
        .div_ceil(WORDS_PER_MINUTE)
        .max(1)
}

/// `(english, arabic)` read-time labels.
#[must_use]
pub fn read_time_labels(content_en: &str, content_ar: &str) -> (String, String) {
    (
        format!("{} min read", read_minutes(content_en)),
        format!("{} دقائق قراءة", read_minutes(content_ar)),
    )
}

/// Slugs and read times for a post.
///
/// # Errors
///
/// Returns `ContentError::Invalid` if a title has no letters or digits.
pub fn derive_post_fields(input: &BlogPostInput) -> Result<BlogPostDerived, ContentError> {
    let slug_en = Slug::from_title(&input.title_en)
        .ok_or_else(|| ContentError::Invalid("title_en must contain letters or digits".to_owned()))?;
    let slug_ar = Slug::from_title(&input.title_ar)
        .ok_or_else(|| ContentError::Invalid("title_ar must contain letters or digits".to_owned()))?;
    let (read_time_en, read_time_ar) = read_time_labels(&input.content_en, &input.content_ar);
    Ok(BlogPostDerived {
        slug_en: slug_en.into_inner(),
        slug_ar: slug_ar.into_inner(),
        read_time_en,
        read_time_ar,
    })
}

/// A post with posts related to it.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: BlogPost,
    pub related: Vec<BlogPost>,
}

/// Blog, newsletter and waitlist operations.
pub struct ContentService<'a> {
    pool: &'a PgPool,
}

impl<'a> ContentService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    fn blog(&self) -> BlogRepository<'a> {
        BlogRepository::new(self.pool)
    }

    fn newsletter(&self) -> NewsletterRepository<'a> {
        NewsletterRepository::new(self.pool)
    }

    /// Posts, newest published first. Drafts only for admins who ask for them.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Repository` if a query fails.
    pub async fn posts(
        &self,
        filter: &BlogFilter,
        is_admin: bool,
    ) -> Result<Paginated<BlogPost>, ContentError> {
        let page = PageRequest::new(filter.page, filter.limit);
        let include_drafts = is_admin && filter.include_drafts.unwrap_or(false);
        let (posts, total) = self.blog().list(filter, include_drafts, page).await?;
        Ok(Paginated::new(posts, page, total))
    }

    /// # Errors
    ///
    /// Returns `ContentError::Repository` if the query fails.
    pub async fn featured(&self, limit: Option<i64>) -> Result<Vec<BlogPost>, ContentError> {
        let limit = limit.unwrap_or(3).clamp(1, PageRequest::MAX_LIMIT);
        Ok(self.blog().featured(limit).await?)
    }

    /// A post by either slug, counting the view.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::NotFound` if no visible post has the slug.
    #[instrument(skip(self))]
    pub async fn post_by_slug(&self, slug: &str, is_admin: bool) -> Result<PostView, ContentError> {
        let blog = self.blog();
        let post = blog
            .view_by_slug(slug, is_admin)
            .await?
            .ok_or(ContentError::NotFound)?;
        let related = blog.related(&post, RELATED_LIMIT).await?;
        Ok(PostView { post, related })
    }

    /// # Errors
    ///
    /// Returns `ContentError::NotFound` if the post does not exist.
    pub async fn post(&self, id: BlogPostId) -> Result<BlogPost, ContentError> {
        self.blog().get(id).await?.ok_or(ContentError::NotFound)
    }

    async fn ensure_slugs_free(
        &self,
        derived: &BlogPostDerived,
        exclude: Option<BlogPostId>,
    ) -> Result<(), ContentError> {
        let blog = self.blog();
        if blog.slug_exists(&derived.slug_en, exclude).await?
            || blog.slug_exists(&derived.slug_ar, exclude).await?
        {
            return Err(RepositoryError::Conflict("a post with this slug already exists".to_owned()).into());
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ContentError::Invalid` for unusable titles and
    /// `ContentError::Repository` with `Conflict` when a slug is taken.
    #[instrument(skip(self, input), fields(title = %input.title_en))]
    pub async fn create_post(&self, input: &BlogPostInput) -> Result<BlogPost, ContentError> {
        let derived = derive_post_fields(input)?;
        self.ensure_slugs_free(&derived, None).await?;
        let post = self.blog().create(input, &derived).await?;
        info!(post_id = %post.id, slug = %post.slug_en, "Blog post created");
        Ok(post)
    }

    /// # Errors
    ///
    /// Returns `ContentError::NotFound` if the post does not exist and
    /// `ContentError::Repository` with `Conflict` when a slug is taken.
    #[instrument(skip(self, input))]
    pub async fn update_post(
        &self,
        id: BlogPostId,
        input: &BlogPostInput,
    ) -> Result<BlogPost, ContentError> {
        let derived = derive_post_fields(input)?;
        self.ensure_slugs_free(&derived, Some(id)).await?;
        self.blog().update(id, input, &derived).await.map_err(not_found)
    }

    /// # Errors
    ///
    /// Returns `ContentError::NotFound` if the post does not exist.
    #[instrument(skip(self))]
    pub async fn delete_post(&self, id: BlogPostId) -> Result<(), ContentError> {
        self.blog().delete(id).await.map_err(not_found)?;
        info!("Blog post deleted");
        Ok(())
    }

    /// Subscribe an address; a previously unsubscribed address is reactivated.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::InvalidEmail` for a malformed address and
    /// `ContentError::Repository` with `Conflict` when already subscribed.
    #[instrument(skip(self, request))]
    pub async fn subscribe(&self, request: &SubscribeRequest) -> Result<Subscriber, ContentError> {
        let email = Email::parse(&request.email)?;
        let subscriber = self.newsletter().subscribe(email.as_str(), request.locale).await?;
        info!(subscriber_id = %subscriber.id, locale = %request.locale, "Newsletter subscription");
        Ok(subscriber)
    }

    /// Returns whether an active subscription was ended.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::InvalidEmail` for a malformed address.
    pub async fn unsubscribe(&self, email: &str) -> Result<bool, ContentError> {
        let email = Email::parse(email)?;
        Ok(self.newsletter().unsubscribe(email.as_str()).await?)
    }

    /// # Errors
    ///
    /// Returns `ContentError::Repository` if a query fails.
    pub async fn subscribers(
        &self,
        filter: &SubscriberFilter,
    ) -> Result<Paginated<Subscriber>, ContentError> {
        let page = PageRequest::new(filter.page, filter.limit);
        let (rows, total) = self.newsletter().list(filter, page).await?;
        Ok(Paginated::new(rows, page, total))
    }

    /// # Errors
    ///
    /// Returns `ContentError::Repository` if the query fails.
    pub async fn subscriber_stats(&self) -> Result<SubscriberStats, ContentError> {
        Ok(self.newsletter().stats().await?)
    }

    /// # Errors
    ///
    /// Returns `ContentError::InvalidEmail` for a malformed address and
    /// `ContentError::Repository` with `Conflict` for a duplicate signup.
    #[instrument(skip(self, request))]
    pub async fn join_waitlist(
        &self,
        request: &JoinWaitlistRequest,
    ) -> Result<WaitlistEntry, ContentError> {
        let email = Email::parse(&request.email)?;
        Ok(self
            .newsletter()
            .join_waitlist(
                email.as_str(),
                request.first_name.as_deref().map(str::trim),
                request.last_name.as_deref().map(str::trim),
            )
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title_en: &str, title_ar: &str, words: usize) -> BlogPostInput {
        BlogPostInput {
            title_en: title_en.to_owned(),
            title_ar: title_ar.to_owned(),
            excerpt_en: None,
            excerpt_ar: None,
            content_en: vec!["word"; words].join(" "),
            content_ar: "كلمة ".repeat(words),
            featured_image: None,
            author_name: None,
            category: None,
            tags: Vec::new(),
            is_published: false,
            is_featured: false,
        }
    }

    #[test]
    fn test_read_minutes() {
        assert_eq!(read_minutes(""), 1);
        assert_eq!(read_minutes(&"a ".repeat(200)), 1);
        assert_eq!(read_minutes(&"a ".repeat(201)), 2);
        assert_eq!(read_minutes(&"a\n".repeat(1000)), 5);
    }

    #[test]
    fn test_read_time_labels() {
        let (en, ar) = read_time_labels(&"a ".repeat(450), "قصير");
        assert_eq!(en, "3 min read");
        assert_eq!(ar, "1 دقائق قراءة");
    }

    #[test]
    fn test_derive_post_fields() {
        let derived = derive_post_fields(&input("Morning Routine 101", "روتين الصباح", 10));
        let Ok(derived) = derived else {
            panic!("expected derived fields");
        };
        assert_eq!(derived.slug_en, "morning-routine-101");
        assert_eq!(derived.slug_ar, "روتين-الصباح");
        assert_eq!(derived.read_time_en, "1 min read");
    }

    #[test]
    fn test_derive_rejects_symbol_titles() {
        assert!(matches!(
            derive_post_fields(&input("!!!", "روتين", 1)),
            Err(ContentError::Invalid(_))
        ));
    }
}
