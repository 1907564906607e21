//! Admin analytics report types.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use skinior_core::{OrderId, OrderStatus, PaymentStatus, ProductId};

/// A label with a count (statuses, categories, brands).
#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq, Eq)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
pub struct ProductCounts {
    pub total: i64,
    pub active: i64,
    pub low_stock: i64,
}

#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
pub struct OrderCounts {
    pub total: i64,
    pub pending: i64,
    pub today: i64,
}

/// Revenue over paid orders.
#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
pub struct RevenueTotals {
    pub total: Decimal,
    pub this_month: Decimal,
    pub today: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
pub struct UserCounts {
    pub total: i64,
    pub active: i64,
    pub new_this_month: i64,
}

/// Order row used in dashboards.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecentOrder {
    pub id: OrderId,
    pub order_number: String,
    pub customer_name: String,
    pub total: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

/// Product row used in dashboards.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecentProduct {
    pub id: ProductId,
    pub title: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// `GET /api/admin/analytics/overview`.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub products: ProductCounts,
    pub orders: OrderCounts,
    pub revenue: RevenueTotals,
    pub users: UserCounts,
    pub categories: i64,
    pub brands: i64,
    pub recent_orders: Vec<RecentOrder>,
    pub recent_products: Vec<RecentProduct>,
}

/// Orders and revenue for one day.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, sqlx::FromRow)]
pub struct DailySales {
    pub date: NaiveDate,
    pub orders: i64,
    pub revenue: Decimal,
}

/// A product ranked by sales.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub product_id: Option<ProductId>,
    pub title: String,
    pub units_sold: i64,
    pub revenue: Decimal,
}

/// `GET /api/admin/analytics/orders`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderAnalytics {
    pub by_status: Vec<LabelCount>,
    pub total_orders: i64,
    pub paid_orders: i64,
    pub cod_orders: i64,
    pub revenue_total: Decimal,
    pub revenue_this_month: Decimal,
    pub average_order_value: Decimal,
    pub recent_orders: Vec<RecentOrder>,
    pub sales_trend: Vec<DailySales>,
    pub top_products: Vec<TopProduct>,
}

/// Revenue comparison window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum RevenuePeriod {
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "1y")]
    Year,
}

impl RevenuePeriod {
    #[must_use]
    pub const fn days(self) -> i64 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
            Self::Year => 365,
        }
    }

    /// `(previous_start, current_start)` for a window ending at `now`.
    #[must_use]
    pub fn windows(self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let len = Duration::days(self.days());
        let current_start = now - len;
        (current_start - len, current_start)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RevenueQuery {
    #[serde(default)]
    pub period: RevenuePeriod,
}

/// Paid revenue and order count in a window.
#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
pub struct WindowTotals {
    pub revenue: Decimal,
    pub orders: i64,
}

/// `GET /api/admin/analytics/revenue`.
#[derive(Debug, Clone, Serialize)]
pub struct RevenueReport {
    pub period: RevenuePeriod,
    pub current: WindowTotals,
    pub previous: WindowTotals,
    /// Percent change from the previous window, 2 dp.
    pub growth_rate: f64,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// `GET /api/admin/analytics/products`.
#[derive(Debug, Clone, Serialize)]
pub struct ProductAnalytics {
    pub top_by_units: Vec<TopProduct>,
    pub top_by_revenue: Vec<TopProduct>,
}

/// `GET /api/admin/analytics/inventory`.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryReport {
    pub out_of_stock: i64,
    pub low_stock: Vec<RecentProduct>,
    pub total_units: i64,
    pub inventory_value: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parse() {
        let q: RevenueQuery = serde_json::from_str(r#"{"period": "90d"}"#).unwrap_or_default();
        assert_eq!(q.period, RevenuePeriod::Quarter);
        let q: RevenueQuery = serde_json::from_str("{}").unwrap_or_default();
        assert_eq!(q.period, RevenuePeriod::Month);
    }

    #[test]
    fn test_period_windows() {
        let now = Utc::now();
        let (previous, current) = RevenuePeriod::Week.windows(now);
        assert_eq!(now - current, Duration::days(7));
        assert_eq!(current - previous, Duration::days(7));
    }
}
