//! Blog, newsletter and waitlist models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use skinior_core::{BlogPostId, Locale, SubscriberId, WaitlistId};

/// A bilingual blog post.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BlogPost {
    pub id: BlogPostId,
    pub title_en: String,
    pub title_ar: String,
    pub slug_en: String,
    pub slug_ar: String,
    pub excerpt_en: Option<String>,
    pub excerpt_ar: Option<String>,
    pub content_en: String,
    pub content_ar: String,
    pub featured_image: Option<String>,
    pub author_name: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub read_time_en: String,
    pub read_time_ar: String,
    pub is_published: bool,
    pub is_featured: bool,
    pub views: i32,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Blog post create/update payload.
#[derive(Debug, Clone, Deserialize)]
pub struct BlogPostInput {
    pub title_en: String,
    pub title_ar: String,
    pub excerpt_en: Option<String>,
    pub excerpt_ar: Option<String>,
    pub content_en: String,
    pub content_ar: String,
    pub featured_image: Option<String>,
    pub author_name: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_featured: bool,
}

/// Derived fields computed by the content service before a write.
#[derive(Debug, Clone)]
pub struct BlogPostDerived {
    pub slug_en: String,
    pub slug_ar: String,
    pub read_time_en: String,
    pub read_time_ar: String,
}

/// Blog list filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlogFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub featured: Option<bool>,
    /// Admin only: include drafts.
    pub include_drafts: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// A newsletter subscriber.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub email: String,
    pub locale: Locale,
    pub is_active: bool,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriberFilter {
    pub locale: Option<Locale>,
    pub active: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Subscriber counts.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SubscriberStats {
    pub total: i64,
    pub active: i64,
    pub english: i64,
    pub arabic: i64,
}

/// A waitlist signup.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WaitlistEntry {
    pub id: WaitlistId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinWaitlistRequest {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}
