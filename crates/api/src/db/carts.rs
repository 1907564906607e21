//! Cart repository.
//!
//! A cart is owned either by an anonymous session token or by a user, never
//! both (enforced by a CHECK constraint).

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};
use uuid::Uuid;

use skinior_core::{CartId, CartItemId, ProductId, UserId};

use super::RepositoryError;
use crate::models::cart::{Cart, CartItemRow, CartLine, CartOwner, merge_lines};

const CART_COLUMNS: &str = "id, session_token, user_id, currency, created_at, updated_at";

/// What happened when an anonymous cart was folded into a user's cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The session had no cart.
    NoAnonymousCart,
    /// The user had no cart, so the anonymous cart now belongs to them.
    Reassigned(CartId),
    /// Lines were merged into the user's existing cart.
    Merged { cart_id: CartId, lines: usize },
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the cart of an owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, owner: CartOwner) -> Result<Option<Cart>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        find_cart(&mut conn, owner, false).await
    }

    /// Find or create the cart of an owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create(
        &self,
        owner: CartOwner,
        currency: &str,
    ) -> Result<Cart, RepositoryError> {
        let sql = match owner {
            CartOwner::Session(_) => format!(
                "INSERT INTO skinior.cart (session_token, currency) VALUES ($1, $2)
                 ON CONFLICT (session_token) DO UPDATE SET updated_at = NOW()
                 RETURNING {CART_COLUMNS}"
            ),
            CartOwner::User(_) => format!(
                "INSERT INTO skinior.cart (user_id, currency) VALUES ($1, $2)
                 ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW()
                 RETURNING {CART_COLUMNS}"
            ),
        };

        let query = sqlx::query_as::<_, Cart>(&sql);
        let query = match owner {
            CartOwner::Session(token) => query.bind(token),
            CartOwner::User(user_id) => query.bind(user_id),
        };

        Ok(query.bind(currency).fetch_one(self.pool).await?)
    }

    /// Lines of a cart joined with product data, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        cart_lines(&mut conn, cart_id).await
    }

    /// Quantity of a product already in the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn quantity_of(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<i32, RepositoryError> {
        let quantity: Option<i32> = sqlx::query_scalar(
            "SELECT quantity FROM skinior.cart_item WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(quantity.unwrap_or(0))
    }

    /// Product and current quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not in this cart.
    pub async fn item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<(ProductId, i32), RepositoryError> {
        sqlx::query_as::<_, (ProductId, i32)>(
            "SELECT product_id, quantity FROM skinior.cart_item WHERE id = $1 AND cart_id = $2",
        )
        .bind(item_id)
        .bind(cart_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Add a product, summing with any existing line. The unit price of an
    /// existing line is kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO skinior.cart_item (cart_id, product_id, quantity, unit_price)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (cart_id, product_id)
             DO UPDATE SET quantity = skinior.cart_item.quantity + EXCLUDED.quantity,
                           updated_at = NOW()",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price)
        .execute(self.pool)
        .await?;

        touch(self.pool, cart_id).await
    }

    /// Set the quantity of a line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not in this cart.
    pub async fn set_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE skinior.cart_item SET quantity = $3, updated_at = NOW()
             WHERE id = $1 AND cart_id = $2",
        )
        .bind(item_id)
        .bind(cart_id)
        .bind(quantity)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        touch(self.pool, cart_id).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not in this cart.
    pub async fn remove_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM skinior.cart_item WHERE id = $1 AND cart_id = $2")
            .bind(item_id)
            .bind(cart_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        touch(self.pool, cart_id).await
    }

    /// Remove every line of a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        clear_cart(&mut conn, cart_id).await
    }

    /// Fold the anonymous cart of `token` into the cart of `user_id`.
    ///
    /// Runs in one transaction; afterwards no cart has `token`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn merge_into_user(
        &self,
        token: Uuid,
        user_id: UserId,
    ) -> Result<MergeOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let Some(anonymous) = find_cart(&mut tx, CartOwner::Session(token), true).await? else {
            return Ok(MergeOutcome::NoAnonymousCart);
        };

        let Some(user_cart) = find_cart(&mut tx, CartOwner::User(user_id), true).await? else {
            sqlx::query(
                "UPDATE skinior.cart SET session_token = NULL, user_id = $2, updated_at = NOW()
                 WHERE id = $1",
            )
            .bind(anonymous.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            debug!(cart_id = %anonymous.id, "Reassigned anonymous cart");
            return Ok(MergeOutcome::Reassigned(anonymous.id));
        };

        let target = item_rows(&mut tx, user_cart.id).await?;
        let incoming = item_rows(&mut tx, anonymous.id).await?;
        let merged = merge_lines(&target, &incoming);

        for line in &merged {
            sqlx::query(
                "INSERT INTO skinior.cart_item (cart_id, product_id, quantity, unit_price)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (cart_id, product_id)
                 DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()",
            )
            .bind(user_cart.id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM skinior.cart WHERE id = $1")
            .bind(anonymous.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE skinior.cart SET updated_at = NOW() WHERE id = $1")
            .bind(user_cart.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(cart_id = %user_cart.id, lines = merged.len(), "Merged anonymous cart");
        Ok(MergeOutcome::Merged {
            cart_id: user_cart.id,
            lines: merged.len(),
        })
    }
}

async fn touch(pool: &PgPool, cart_id: CartId) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE skinior.cart SET updated_at = NOW() WHERE id = $1")
        .bind(cart_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn find_cart(
    conn: &mut PgConnection,
    owner: CartOwner,
    for_update: bool,
) -> Result<Option<Cart>, RepositoryError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let cart = match owner {
        CartOwner::Session(token) => {
            sqlx::query_as::<_, Cart>(&format!(
                "SELECT {CART_COLUMNS} FROM skinior.cart WHERE session_token = $1{lock}"
            ))
            .bind(token)
            .fetch_optional(&mut *conn)
            .await?
        }
        CartOwner::User(user_id) => {
            sqlx::query_as::<_, Cart>(&format!(
                "SELECT {CART_COLUMNS} FROM skinior.cart WHERE user_id = $1{lock}"
            ))
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?
        }
    };
    Ok(cart)
}

pub(crate) async fn cart_lines(
    conn: &mut PgConnection,
    cart_id: CartId,
) -> Result<Vec<CartLine>, RepositoryError> {
    Ok(sqlx::query_as::<_, CartLine>(
        "SELECT ci.id AS item_id, ci.product_id, p.title, p.slug,
                (SELECT i.url FROM skinior.product_image i WHERE i.product_id = p.id
                 ORDER BY i.is_main DESC, i.sort_order, i.id LIMIT 1) AS image,
                ci.unit_price, ci.quantity, p.stock_quantity
         FROM skinior.cart_item ci
         JOIN skinior.product p ON p.id = ci.product_id
         WHERE ci.cart_id = $1
         ORDER BY ci.created_at, ci.id",
    )
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await?)
}

pub(crate) async fn clear_cart(
    conn: &mut PgConnection,
    cart_id: CartId,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM skinior.cart_item WHERE cart_id = $1")
        .bind(cart_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn item_rows(
    conn: &mut PgConnection,
    cart_id: CartId,
) -> Result<Vec<CartItemRow>, RepositoryError> {
    Ok(sqlx::query_as::<_, CartItemRow>(
        "SELECT product_id, quantity, unit_price FROM skinior.cart_item
         WHERE cart_id = $1 ORDER BY created_at, id",
    )
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await?)
}
