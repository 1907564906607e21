//! Shopping cart models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use skinior_core::{CartId, CartItemId, ProductId, UserId};

/// Who a cart belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOwner {
    /// Anonymous visitor, identified by the token stored in their session.
    Session(Uuid),
    /// Logged-in user.
    User(UserId),
}

/// A cart row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Cart {
    pub id: CartId,
    pub session_token: Option<Uuid>,
    pub user_id: Option<UserId>,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line joined with its product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub title: String,
    pub slug: String,
    pub image: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub stock_quantity: i32,
}

impl CartLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A line of another cart, as seen by the merge step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct CartItemRow {
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Cart line in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartLine,
    pub line_total: Decimal,
}

/// Priced cart returned by every cart endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart_id: Option<CartId>,
    pub items: Vec<CartLineView>,
    /// Sum of quantities.
    pub item_count: i64,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub currency: String,
}

/// `POST /api/cart/items` body.
#[derive(Debug, Clone, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// `PUT /api/cart/items/{id}` body.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

/// Union of two carts' lines by product, summing quantities.
///
/// Lines already in `target` keep their unit price; lines only in `incoming`
/// keep theirs. Order follows `target`, then new products from `incoming`.
#[must_use]
pub fn merge_lines(target: &[CartItemRow], incoming: &[CartItemRow]) -> Vec<CartItemRow> {
    let mut merged: Vec<CartItemRow> = target.to_vec();
    for line in incoming {
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => merged.push(*line),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn row(product: i32, quantity: i32, price: &str) -> CartItemRow {
        CartItemRow {
            product_id: ProductId::new(product),
            quantity,
            unit_price: Decimal::from_str(price).unwrap_or_default(),
        }
    }

    #[test]
    fn test_merge_sums_shared_products_and_keeps_target_price() {
        let user = [row(1, 2, "10.00"), row(2, 1, "4.50")];
        let anonymous = [row(1, 3, "9.00"), row(3, 1, "20.00")];

        let merged = merge_lines(&user, &anonymous);

        assert_eq!(
            merged,
            vec![row(1, 5, "10.00"), row(2, 1, "4.50"), row(3, 1, "20.00")]
        );
    }

    #[test]
    fn test_merge_into_empty_cart() {
        let anonymous = [row(7, 2, "3.00")];
        assert_eq!(merge_lines(&[], &anonymous), anonymous.to_vec());
        assert!(merge_lines(&[], &[]).is_empty());
    }

    #[test]
    fn test_line_total() {
        let line = CartLine {
            item_id: CartItemId::new(1),
            product_id: ProductId::new(1),
            title: "Hydrating Serum".to_string(),
            slug: "hydrating-serum".to_string(),
            image: None,
            unit_price: Decimal::from_str("12.25").unwrap_or_default(),
            quantity: 3,
            stock_quantity: 10,
        };
        assert_eq!(line.line_total(), Decimal::from_str("36.75").unwrap_or_default());
    }
}
