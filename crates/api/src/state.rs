//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::CatalogCache;
use crate::config::ApiConfig;
use crate::services::livekit::LiveKitClient;
use crate::services::stripe::StripeClient;

/// Application state shared across all handlers.
///
/// Cheap to clone. Stripe and LiveKit clients exist only when their
/// configuration sections are present; routes that need them answer 503
/// otherwise.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    cache: CatalogCache,
    stripe: Option<StripeClient>,
    livekit: Option<LiveKitClient>,
}

impl AppState {
    /// Build the state, creating third-party clients from `config`.
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool) -> Self {
        let stripe = config.stripe.as_ref().map(StripeClient::new);
        let livekit = config.livekit.as_ref().map(LiveKitClient::new);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                cache: CatalogCache::default(),
                stripe,
                livekit,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn cache(&self) -> &CatalogCache {
        &self.inner.cache
    }

    #[must_use]
    pub fn stripe(&self) -> Option<&StripeClient> {
        self.inner.stripe.as_ref()
    }

    #[must_use]
    pub fn livekit(&self) -> Option<&LiveKitClient> {
        self.inner.livekit.as_ref()
    }

    /// Default currency code for prices and carts.
    #[must_use]
    pub fn currency(&self) -> &'static str {
        self.inner.config.default_currency.code()
    }
}
