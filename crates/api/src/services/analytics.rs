//! Admin dashboard reports.

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::PgPool;
use tracing::instrument;

use skinior_core::round_money;

use crate::db::RepositoryError;
use crate::db::analytics::{AnalyticsRepository, TopBy};
use crate::db::catalog::{BrandRepository, CategoryRepository};
use crate::models::analytics::{
    DailySales, InventoryReport, OrderAnalytics, Overview, ProductAnalytics, RevenuePeriod,
    RevenueReport,
};

const RECENT_LIMIT: i64 = 5;
const RECENT_ORDERS_LIMIT: i64 = 10;
const TOP_PRODUCTS_LIMIT: i64 = 10;
const LOW_STOCK_LIMIT: i64 = 20;
const TREND_DAYS: u64 = 7;

/// Percent change from `previous` to `current`, 2 dp.
///
/// With no previous revenue, growth is 0 when there is still none and 100
/// otherwise.
#[must_use]
pub fn growth_rate(current: Decimal, previous: Decimal) -> f64 {
    if previous.is_zero() {
        return if current > Decimal::ZERO { 100.0 } else { 0.0 };
    }
    let change = (current - previous) / previous * Decimal::ONE_HUNDRED;
    change.round_dp(2).to_f64().unwrap_or_default()
}

/// Mean order value rounded to cents, 0 without orders.
#[must_use]
pub fn average_order_value(revenue: Decimal, orders: i64) -> Decimal {
    if orders <= 0 {
        return Decimal::ZERO;
    }
    round_money(revenue / Decimal::from(orders))
}

/// One entry per day from `today - (days - 1)` to `today`, zero-filled.
#[must_use]
pub fn sales_trend(today: NaiveDate, days: u64, sales: &[DailySales]) -> Vec<DailySales> {
    (0..days)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|date| {
            sales
                .iter()
                .find(|s| s.date == date)
                .copied()
                .unwrap_or(DailySales {
                    date,
                    orders: 0,
                    revenue: Decimal::ZERO,
                })
        })
        .collect()
}

/// Read-only reports over orders, products and users.
pub struct AnalyticsService<'a> {
    pool: &'a PgPool,
}

impl<'a> AnalyticsService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    fn repo(&self) -> AnalyticsRepository<'a> {
        AnalyticsRepository::new(self.pool)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    #[instrument(skip(self))]
    pub async fn overview(&self) -> Result<Overview, RepositoryError> {
        let repo = self.repo();
        Ok(Overview {
            products: repo.product_counts().await?,
            orders: repo.order_counts().await?,
            revenue: repo.revenue_totals().await?,
            users: repo.user_counts().await?,
            categories: CategoryRepository::new(self.pool).count().await?,
            brands: BrandRepository::new(self.pool).count().await?,
            recent_orders: repo.recent_orders(RECENT_LIMIT).await?,
            recent_products: repo.recent_products(RECENT_LIMIT).await?,
        })
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    #[instrument(skip(self))]
    pub async fn orders(&self, now: DateTime<Utc>) -> Result<OrderAnalytics, RepositoryError> {
        let repo = self.repo();
        let summary = repo.order_summary().await?;
        let today = now.date_naive();
        let since = today
            .checked_sub_days(Days::new(TREND_DAYS - 1))
            .unwrap_or(today);
        let daily = repo.daily_sales(since).await?;

        Ok(OrderAnalytics {
            by_status: repo.status_counts().await?,
            total_orders: summary.total_orders,
            paid_orders: summary.paid_orders,
            cod_orders: summary.cod_orders,
            revenue_total: summary.revenue_total,
            revenue_this_month: summary.revenue_this_month,
            average_order_value: average_order_value(summary.revenue_total, summary.paid_orders),
            recent_orders: repo.recent_orders(RECENT_ORDERS_LIMIT).await?,
            sales_trend: sales_trend(today, TREND_DAYS, &daily),
            top_products: repo.top_products(TopBy::Units, TOP_PRODUCTS_LIMIT).await?,
        })
    }

    /// Current window against the previous window of the same length.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    #[instrument(skip(self))]
    pub async fn revenue(
        &self,
        period: RevenuePeriod,
        now: DateTime<Utc>,
    ) -> Result<RevenueReport, RepositoryError> {
        let repo = self.repo();
        let (previous_start, current_start) = period.windows(now);
        let current = repo.window_totals(current_start, now).await?;
        let previous = repo.window_totals(previous_start, current_start).await?;

        Ok(RevenueReport {
            period,
            growth_rate: growth_rate(current.revenue, previous.revenue),
            current,
            previous,
            from: current_start,
            to: now,
        })
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    pub async fn products(&self, limit: Option<i64>) -> Result<ProductAnalytics, RepositoryError> {
        let limit = limit.unwrap_or(TOP_PRODUCTS_LIMIT).clamp(1, 100);
        let repo = self.repo();
        Ok(ProductAnalytics {
            top_by_units: repo.top_products(TopBy::Units, limit).await?,
            top_by_revenue: repo.top_products(TopBy::Revenue, limit).await?,
        })
    }

    /// # Errors
    ///
    /// Returns `RepositoryError` if a query fails.
    pub async fn inventory(&self) -> Result<InventoryReport, RepositoryError> {
        let repo = self.repo();
        let totals = repo.stock_totals().await?;
        Ok(InventoryReport {
            out_of_stock: totals.out_of_stock,
            low_stock: repo.low_stock(LOW_STOCK_LIMIT).await?,
            total_units: totals.total_units,
            inventory_value: round_money(totals.inventory_value),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap_or_default()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap_or_default()
    }

    #[test]
    fn test_growth_rate() {
        assert!(growth_rate(Decimal::ZERO, Decimal::ZERO).abs() < f64::EPSILON);
        assert!((growth_rate(dec("10"), Decimal::ZERO) - 100.0).abs() < f64::EPSILON);
        assert!((growth_rate(dec("150"), dec("100")) - 50.0).abs() < f64::EPSILON);
        assert!((growth_rate(dec("50"), dec("100")) + 50.0).abs() < f64::EPSILON);
        assert!((growth_rate(dec("100"), dec("300")) + 66.67).abs() < 1e-9);
    }

    #[test]
    fn test_average_order_value() {
        assert_eq!(average_order_value(dec("100"), 0), Decimal::ZERO);
        assert_eq!(average_order_value(dec("100"), 3), dec("33.33"));
    }

    #[test]
    fn test_sales_trend_zero_fills() {
        let sales = [
            DailySales {
                date: day(3),
                orders: 2,
                revenue: dec("40"),
            },
            DailySales {
                date: day(7),
                orders: 1,
                revenue: dec("15.50"),
            },
        ];
        let trend = sales_trend(day(7), 7, &sales);

        assert_eq!(trend.len(), 7);
        assert_eq!(trend[0].date, day(1));
        assert_eq!(trend[6].date, day(7));
        assert_eq!(trend[2].orders, 2);
        assert_eq!(trend[1].orders, 0);
        assert_eq!(trend[1].revenue, Decimal::ZERO);
        assert_eq!(trend[6].revenue, dec("15.50"));
    }
}
