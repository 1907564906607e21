//! Cart service: pricing, stock checks and login migration.

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use skinior_core::{CartItemId, UserId, round_money, tax_on};

use crate::db::RepositoryError;
use crate::db::carts::{CartRepository, MergeOutcome};
use crate::db::catalog::ProductRepository;
use crate::models::cart::{AddItemRequest, Cart, CartLine, CartLineView, CartOwner, CartView};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("product not found")]
    ProductNotFound,

    #[error("cart item not found")]
    ItemNotFound,

    #[error("only {available} in stock")]
    InsufficientStock { available: i32 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Price a cart. Shipping is chosen at checkout, so it is always zero here.
#[must_use]
pub fn price_cart(cart: Option<&Cart>, lines: Vec<CartLine>, default_currency: &str) -> CartView {
    let subtotal = round_money(lines.iter().map(CartLine::line_total).sum::<Decimal>());
    let tax = tax_on(subtotal);
    let item_count = lines.iter().map(|l| i64::from(l.quantity)).sum();

    CartView {
        cart_id: cart.map(|c| c.id),
        items: lines
            .into_iter()
            .map(|line| CartLineView {
                line_total: round_money(line.line_total()),
                line,
            })
            .collect(),
        item_count,
        subtotal,
        tax,
        shipping: Decimal::ZERO,
        total: subtotal + tax,
        currency: cart.map_or_else(|| default_currency.to_owned(), |c| c.currency.clone()),
    }
}

fn check_stock(requested: i32, stock: i32) -> Result<(), CartError> {
    if requested > stock {
        return Err(CartError::InsufficientStock {
            available: stock.max(0),
        });
    }
    Ok(())
}

/// Cart operations for one owner.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    products: ProductRepository<'a>,
    currency: &'a str,
}

impl<'a> CartService<'a> {
    /// `currency` is used for new carts and for the empty view.
    #[must_use]
    pub const fn new(pool: &'a PgPool, currency: &'a str) -> Self {
        Self {
            carts: CartRepository::new(pool),
            products: ProductRepository::new(pool),
            currency,
        }
    }

    /// The priced cart of `owner`. Creates nothing.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a query fails.
    pub async fn view(&self, owner: Option<CartOwner>) -> Result<CartView, CartError> {
        let Some(owner) = owner else {
            return Ok(price_cart(None, Vec::new(), self.currency));
        };
        let Some(cart) = self.carts.find(owner).await? else {
            return Ok(price_cart(None, Vec::new(), self.currency));
        };
        let lines = self.carts.lines(cart.id).await?;
        Ok(price_cart(Some(&cart), lines, self.currency))
    }

    /// Add a product, creating the cart on first use.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the product is missing or inactive.
    /// Returns `CartError::InsufficientStock` if the cart would exceed stock.
    #[instrument(skip(self, request), fields(product_id = %request.product_id, quantity = request.quantity))]
    pub async fn add_item(
        &self,
        owner: CartOwner,
        request: &AddItemRequest,
    ) -> Result<CartView, CartError> {
        if request.quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }
        let product = self
            .products
            .get(request.product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(CartError::ProductNotFound)?;

        let cart = self.carts.get_or_create(owner, self.currency).await?;
        let existing = self.carts.quantity_of(cart.id, product.id).await?;
        check_stock(existing.saturating_add(request.quantity), product.stock_quantity)?;

        self.carts
            .add_item(cart.id, product.id, request.quantity, product.price)
            .await?;
        self.priced(&cart).await
    }

    /// Set a line's quantity; zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the line is not in the owner's cart.
    /// Returns `CartError::InsufficientStock` if the quantity exceeds stock.
    pub async fn update_item(
        &self,
        owner: CartOwner,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        let cart = self.carts.find(owner).await?.ok_or(CartError::ItemNotFound)?;
        let (product_id, _) = self
            .carts
            .item(cart.id, item_id)
            .await
            .map_err(item_not_found)?;

        if quantity <= 0 {
            self.carts
                .remove_item(cart.id, item_id)
                .await
                .map_err(item_not_found)?;
        } else {
            if let Some(product) = self.products.get(product_id).await? {
                check_stock(quantity, product.stock_quantity)?;
            }
            self.carts
                .set_quantity(cart.id, item_id, quantity)
                .await
                .map_err(item_not_found)?;
        }
        self.priced(&cart).await
    }

    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the line is not in the owner's cart.
    pub async fn remove_item(
        &self,
        owner: CartOwner,
        item_id: CartItemId,
    ) -> Result<CartView, CartError> {
        let cart = self.carts.find(owner).await?.ok_or(CartError::ItemNotFound)?;
        self.carts
            .remove_item(cart.id, item_id)
            .await
            .map_err(item_not_found)?;
        self.priced(&cart).await
    }

    /// Empty the owner's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if a query fails.
    pub async fn clear(&self, owner: Option<CartOwner>) -> Result<CartView, CartError> {
        if let Some(owner) = owner
            && let Some(cart) = self.carts.find(owner).await?
        {
            self.carts.clear(cart.id).await?;
            return Ok(price_cart(Some(&cart), Vec::new(), self.currency));
        }
        Ok(price_cart(None, Vec::new(), self.currency))
    }

    /// Fold the anonymous cart of `token` into the user's cart at login.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the merge transaction fails.
    pub async fn migrate(&self, token: Uuid, user_id: UserId) -> Result<MergeOutcome, CartError> {
        let outcome = self.carts.merge_into_user(token, user_id).await?;
        if outcome != MergeOutcome::NoAnonymousCart {
            info!(user_id = %user_id, ?outcome, "Anonymous cart migrated");
        }
        Ok(outcome)
    }

    async fn priced(&self, cart: &Cart) -> Result<CartView, CartError> {
        let lines = self.carts.lines(cart.id).await?;
        Ok(price_cart(Some(cart), lines, self.currency))
    }
}

fn item_not_found(e: RepositoryError) -> CartError {
    match e {
        RepositoryError::NotFound => CartError::ItemNotFound,
        other => CartError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use skinior_core::ProductId;

    use super::*;

    fn line(id: i32, price: &str, quantity: i32) -> CartLine {
        CartLine {
            item_id: CartItemId::new(id),
            product_id: ProductId::new(id),
            title: format!("Product {id}"),
            slug: format!("product-{id}"),
            image: None,
            unit_price: Decimal::from_str(price).unwrap(),
            quantity,
            stock_quantity: 50,
        }
    }

    #[test]
    fn test_price_cart_totals() {
        let view = price_cart(None, vec![line(1, "12.50", 2), line(2, "7.99", 1)], "JOD");

        assert_eq!(view.item_count, 3);
        assert_eq!(view.subtotal, Decimal::from_str("32.99").unwrap());
        assert_eq!(view.tax, Decimal::from_str("2.64").unwrap());
        assert_eq!(view.shipping, Decimal::ZERO);
        assert_eq!(view.total, Decimal::from_str("35.63").unwrap());
        assert_eq!(view.items[0].line_total, Decimal::from_str("25.00").unwrap());
        assert_eq!(view.currency, "JOD");
    }

    #[test]
    fn test_empty_cart_view() {
        let view = price_cart(None, Vec::new(), "USD");
        assert!(view.cart_id.is_none());
        assert_eq!(view.item_count, 0);
        assert_eq!(view.total, Decimal::ZERO);
        assert_eq!(view.currency, "USD");
    }

    #[test]
    fn test_check_stock() {
        assert!(check_stock(5, 5).is_ok());
        assert!(matches!(
            check_stock(6, 5),
            Err(CartError::InsufficientStock { available: 5 })
        ));
        assert!(matches!(
            check_stock(1, -2),
            Err(CartError::InsufficientStock { available: 0 })
        ));
    }
}
