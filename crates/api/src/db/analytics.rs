//! Aggregate queries for the admin dashboard.
//!
//! Revenue is always summed over orders whose payment status is `paid`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::analytics::{
    DailySales, LabelCount, OrderCounts, ProductCounts, RecentOrder, RecentProduct,
    RevenueTotals, TopProduct, UserCounts, WindowTotals,
};
use crate::models::catalog::LOW_STOCK_THRESHOLD;

/// Order totals behind the order report.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct OrderSummary {
    pub total_orders: i64,
    pub paid_orders: i64,
    pub cod_orders: i64,
    pub revenue_total: Decimal,
    pub revenue_this_month: Decimal,
}

/// Stock totals over active products.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct StockTotals {
    pub out_of_stock: i64,
    pub total_units: i64,
    pub inventory_value: Decimal,
}

/// Ranking used by [`AnalyticsRepository::top_products`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopBy {
    Units,
    Revenue,
}

/// Repository for analytics aggregates.
pub struct AnalyticsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AnalyticsRepository<'a> {
    /// Create a new analytics repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_counts(&self) -> Result<ProductCounts, RepositoryError> {
        Ok(sqlx::query_as::<_, ProductCounts>(
            "SELECT COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE is_active) AS active,
                    COUNT(*) FILTER (WHERE is_active AND stock_quantity > 0
                                     AND stock_quantity <= $1) AS low_stock
             FROM skinior.product",
        )
        .bind(LOW_STOCK_THRESHOLD)
        .fetch_one(self.pool)
        .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn order_counts(&self) -> Result<OrderCounts, RepositoryError> {
        Ok(sqlx::query_as::<_, OrderCounts>(
            "SELECT COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                    COUNT(*) FILTER (WHERE created_at >= date_trunc('day', NOW())) AS today
             FROM skinior.customer_order",
        )
        .fetch_one(self.pool)
        .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revenue_totals(&self) -> Result<RevenueTotals, RepositoryError> {
        Ok(sqlx::query_as::<_, RevenueTotals>(
            "SELECT COALESCE(SUM(total), 0) AS total,
                    COALESCE(SUM(total) FILTER (WHERE created_at >= date_trunc('month', NOW())), 0)
                        AS this_month,
                    COALESCE(SUM(total) FILTER (WHERE created_at >= date_trunc('day', NOW())), 0)
                        AS today
             FROM skinior.customer_order WHERE payment_status = 'paid'",
        )
        .fetch_one(self.pool)
        .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn user_counts(&self) -> Result<UserCounts, RepositoryError> {
        Ok(sqlx::query_as::<_, UserCounts>(
            "SELECT COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE is_active) AS active,
                    COUNT(*) FILTER (WHERE created_at >= date_trunc('month', NOW())) AS new_this_month
             FROM skinior.user WHERE NOT is_system",
        )
        .fetch_one(self.pool)
        .await?)
    }

    /// Newest orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_orders(&self, limit: i64) -> Result<Vec<RecentOrder>, RepositoryError> {
        Ok(sqlx::query_as::<_, RecentOrder>(
            "SELECT id, order_number, customer_name, total, currency, status, payment_status,
                    created_at
             FROM skinior.customer_order ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }

    /// Newest products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_products(&self, limit: i64) -> Result<Vec<RecentProduct>, RepositoryError> {
        Ok(sqlx::query_as::<_, RecentProduct>(
            "SELECT id, title, sku, price, stock_quantity, created_at
             FROM skinior.product ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }

    /// Orders per status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status_counts(&self) -> Result<Vec<LabelCount>, RepositoryError> {
        Ok(sqlx::query_as::<_, LabelCount>(
            "SELECT status::text AS label, COUNT(*) AS count
             FROM skinior.customer_order GROUP BY status ORDER BY status",
        )
        .fetch_all(self.pool)
        .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn order_summary(&self) -> Result<OrderSummary, RepositoryError> {
        Ok(sqlx::query_as::<_, OrderSummary>(
            "SELECT COUNT(*) AS total_orders,
                    COUNT(*) FILTER (WHERE payment_status = 'paid') AS paid_orders,
                    COUNT(*) FILTER (WHERE payment_method = 'cod') AS cod_orders,
                    COALESCE(SUM(total) FILTER (WHERE payment_status = 'paid'), 0) AS revenue_total,
                    COALESCE(SUM(total) FILTER (WHERE payment_status = 'paid'
                        AND created_at >= date_trunc('month', NOW())), 0) AS revenue_this_month
             FROM skinior.customer_order",
        )
        .fetch_one(self.pool)
        .await?)
    }

    /// Orders and paid revenue per day since `since` (inclusive). Days
    /// without orders are absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn daily_sales(&self, since: NaiveDate) -> Result<Vec<DailySales>, RepositoryError> {
        Ok(sqlx::query_as::<_, DailySales>(
            "SELECT (created_at AT TIME ZONE 'UTC')::date AS date,
                    COUNT(*) AS orders,
                    COALESCE(SUM(total) FILTER (WHERE payment_status = 'paid'), 0) AS revenue
             FROM skinior.customer_order
             WHERE (created_at AT TIME ZONE 'UTC')::date >= $1
             GROUP BY 1 ORDER BY 1",
        )
        .bind(since)
        .fetch_all(self.pool)
        .await?)
    }

    /// Best-selling products over orders that were not cancelled or refunded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_products(&self, by: TopBy, limit: i64) -> Result<Vec<TopProduct>, RepositoryError> {
        let order = match by {
            TopBy::Units => "units_sold DESC, revenue DESC",
            TopBy::Revenue => "revenue DESC, units_sold DESC",
        };
        Ok(sqlx::query_as::<_, TopProduct>(&format!(
            "SELECT oi.product_id, MAX(oi.title) AS title,
                    SUM(oi.quantity)::int8 AS units_sold,
                    COALESCE(SUM(oi.total), 0) AS revenue
             FROM skinior.order_item oi
             JOIN skinior.customer_order o ON o.id = oi.order_id
             WHERE o.status NOT IN ('cancelled', 'refunded')
             GROUP BY oi.product_id
             ORDER BY {order}, title
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }

    /// Paid revenue and order count created in `[from, to)`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn window_totals(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<WindowTotals, RepositoryError> {
        Ok(sqlx::query_as::<_, WindowTotals>(
            "SELECT COALESCE(SUM(total), 0) AS revenue, COUNT(*) AS orders
             FROM skinior.customer_order
             WHERE payment_status = 'paid' AND created_at >= $1 AND created_at < $2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(self.pool)
        .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stock_totals(&self) -> Result<StockTotals, RepositoryError> {
        Ok(sqlx::query_as::<_, StockTotals>(
            "SELECT COUNT(*) FILTER (WHERE stock_quantity = 0) AS out_of_stock,
                    COALESCE(SUM(stock_quantity), 0)::int8 AS total_units,
                    COALESCE(SUM(price * stock_quantity), 0) AS inventory_value
             FROM skinior.product WHERE is_active",
        )
        .fetch_one(self.pool)
        .await?)
    }

    /// Active products with `0 < stock <= LOW_STOCK_THRESHOLD`, lowest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(&self, limit: i64) -> Result<Vec<RecentProduct>, RepositoryError> {
        Ok(sqlx::query_as::<_, RecentProduct>(
            "SELECT id, title, sku, price, stock_quantity, created_at
             FROM skinior.product
             WHERE is_active AND stock_quantity > 0 AND stock_quantity <= $1
             ORDER BY stock_quantity, title LIMIT $2",
        )
        .bind(LOW_STOCK_THRESHOLD)
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }
}
