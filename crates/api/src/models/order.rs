//! Order and discount models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use skinior_core::{
    DiscountId, DiscountType, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus,
    ProductId, ShippingMethod, UserId,
};

/// Postal address captured at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub phone: Option<String>,
}

impl Address {
    /// Whether the address is in Jordan (`JO` or `Jordan`, any case).
    #[must_use]
    pub fn is_jordan(&self) -> bool {
        is_jordan(&self.country)
    }
}

/// Whether a country name or code means Jordan (`JO` or `Jordan`, any case).
#[must_use]
pub fn is_jordan(country: &str) -> bool {
    let country = country.trim();
    country.eq_ignore_ascii_case("jo") || country.eq_ignore_ascii_case("jordan")
}

/// An order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub customer_email: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub shipping_method: ShippingMethod,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub discount_code: Option<String>,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub shipping_address: serde_json::Value,
    pub billing_address: Option<serde_json::Value>,
    pub stripe_payment_intent_id: Option<String>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order line. Title, SKU and price are snapshots taken at order time.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub title: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub total: Decimal,
}

/// An order with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Order row in admin listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    /// Number of distinct lines.
    pub item_count: i64,
    /// Sum of line quantities.
    pub total_units: i64,
}

/// Admin order list filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub search: Option<String>,
}

/// Admin order update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
}

/// A discount code.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DiscountCode {
    pub id: DiscountId,
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub minimum_amount: Decimal,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Product state read (and row-locked) while placing an order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderableProduct {
    pub id: ProductId,
    pub title: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub is_active: bool,
}

/// A fully priced order ready to be written.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: Option<UserId>,
    pub customer_email: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub shipping_method: ShippingMethod,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub discount_code: Option<String>,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub shipping_address: serde_json::Value,
    pub billing_address: Option<serde_json::Value>,
    pub notes: Option<String>,
}

/// A priced order line ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub title: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
}

impl NewOrderItem {
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Customer details on a checkout request.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerInfo {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

/// A requested order line.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct CheckoutItem {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// `POST /api/checkout/orders` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub customer: CustomerInfo,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    /// Falls back to the caller's cart when absent or empty.
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
    pub shipping_method: ShippingMethod,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub currency: Option<String>,
    pub discount_code: Option<String>,
    pub notes: Option<String>,
}

/// Result of placing an order.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: OrderWithItems,
    /// A passwordless account was created for a guest.
    pub account_created: bool,
}

/// `POST /api/checkout/orders/{id}/pay` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayRequest {
    pub payment_method_id: Option<String>,
}

/// `POST /api/checkout/discount` body.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountRequest {
    pub code: String,
    pub subtotal: Decimal,
}

/// A validated discount.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AppliedDiscount {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub discount_amount: Decimal,
    pub new_total: Decimal,
}

/// A shipping option offered at checkout.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShippingOption {
    pub method: ShippingMethod,
    pub name: &'static str,
    pub price: Decimal,
    pub estimated_days: &'static str,
}

/// A payment option offered at checkout.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaymentOption {
    pub method: PaymentMethod,
    pub name: &'static str,
    pub fee: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(country: &str) -> Address {
        Address {
            first_name: None,
            last_name: None,
            address1: "Rainbow St 12".to_string(),
            address2: None,
            city: "Amman".to_string(),
            state: None,
            postal_code: None,
            country: country.to_string(),
            phone: None,
        }
    }

    #[test]
    fn test_is_jordan() {
        assert!(address("JO").is_jordan());
        assert!(address(" jordan ").is_jordan());
        assert!(address("Jordan").is_jordan());
        assert!(!address("SA").is_jordan());
        assert!(!address("Jordania").is_jordan());
    }
}
