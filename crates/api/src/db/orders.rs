//! Order and discount repository.
//!
//! Order placement runs inside a transaction owned by the checkout service,
//! so the write path is exposed as connection-level functions.

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use skinior_core::{DiscountId, OrderId, OrderStatus, ProductId, UserId};

use super::{RepositoryError, like_pattern};
use crate::models::PageRequest;
use crate::models::order::{
    DiscountCode, NewOrder, NewOrderItem, Order, OrderFilter, OrderItem, OrderListItem,
    OrderUpdate, OrderWithItems, OrderableProduct,
};

const ORDER_COLUMNS: &str = "id, order_number, user_id, customer_email, customer_name, \
     customer_phone, status, payment_method, payment_status, shipping_method, subtotal, \
     discount_amount, discount_code, tax, shipping, total, currency, shipping_address, \
     billing_address, stripe_payment_intent_id, tracking_number, notes, created_at, updated_at";

const DISCOUNT_COLUMNS: &str = "id, code, discount_type, value, minimum_amount, usage_limit, \
     usage_count, starts_at, ends_at, is_active";

/// Repository for orders and discount codes.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM skinior.customer_order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?)
    }

    /// Get an order with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_with_items(&self, id: OrderId) -> Result<Option<OrderWithItems>, RepositoryError> {
        let Some(order) = self.get(id).await? else {
            return Ok(None);
        };
        let items = self.items(&[order.id]).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    /// A user's orders with their lines, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM skinior.customer_order
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in self.items(&ids).await? {
            by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = by_order.remove(&order.id).unwrap_or_default();
                OrderWithItems { order, items }
            })
            .collect())
    }

    async fn items(&self, order_ids: &[OrderId]) -> Result<Vec<OrderItem>, RepositoryError> {
        let ids: Vec<i32> = order_ids.iter().map(OrderId::as_i32).collect();
        Ok(sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, product_id, title, sku, price, quantity, total
             FROM skinior.order_item WHERE order_id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?)
    }

    /// Admin order listing with line counts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<(Vec<OrderListItem>, i64), RepositoryError> {
        let search = like_pattern(filter.search.as_deref());
        let predicate = "($1::skinior.order_status IS NULL OR o.status = $1)
             AND ($2::skinior.payment_status IS NULL OR o.payment_status = $2)
             AND ($3::text IS NULL OR o.order_number ILIKE $3
                  OR o.customer_name ILIKE $3 OR o.customer_email ILIKE $3)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM skinior.customer_order o WHERE {predicate}"
        ))
        .bind(filter.status)
        .bind(filter.payment_status)
        .bind(search.as_deref())
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, OrderListItem>(&format!(
            "SELECT o.*,
                    (SELECT COUNT(*) FROM skinior.order_item i WHERE i.order_id = o.id) AS item_count,
                    (SELECT COALESCE(SUM(i.quantity), 0)::int8 FROM skinior.order_item i
                     WHERE i.order_id = o.id) AS total_units
             FROM skinior.customer_order o
             WHERE {predicate}
             ORDER BY o.created_at DESC, o.id DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(filter.status)
        .bind(filter.payment_status)
        .bind(search.as_deref())
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Apply an admin update. The caller validates the status transition;
    /// the update only applies if the status is still `current`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    /// Returns `RepositoryError::Conflict` if the status changed concurrently.
    #[instrument(skip(self, update), fields(order_id = %id))]
    pub async fn update(
        &self,
        id: OrderId,
        current: OrderStatus,
        update: &OrderUpdate,
    ) -> Result<Order, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE skinior.customer_order SET
                status = COALESCE($3, status),
                payment_status = COALESCE($4, payment_status),
                tracking_number = COALESCE($5, tracking_number),
                notes = COALESCE($6, notes),
                updated_at = NOW()
             WHERE id = $1 AND status = $2
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(current)
        .bind(update.status)
        .bind(update.payment_status)
        .bind(update.tracking_number.as_deref())
        .bind(update.notes.as_deref())
        .fetch_optional(self.pool)
        .await?;

        match order {
            Some(order) => Ok(order),
            None if self.get(id).await?.is_some() => Err(RepositoryError::Conflict(
                "order status changed, reload and retry".to_owned(),
            )),
            None => Err(RepositoryError::NotFound),
        }
    }

    /// Confirm a cash-on-delivery order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn confirm_cod(&self, id: OrderId) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE skinior.customer_order
             SET status = 'confirmed', payment_status = 'cod_pending', updated_at = NOW()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Record a successful card payment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    #[instrument(skip(self))]
    pub async fn mark_paid(
        &self,
        id: OrderId,
        payment_intent_id: &str,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE skinior.customer_order
             SET status = CASE WHEN status = 'pending' THEN 'confirmed'::skinior.order_status
                               ELSE status END,
                 payment_status = 'paid',
                 stripe_payment_intent_id = $2,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(payment_intent_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Record a failed card payment. A paid order is never touched.
    ///
    /// With `cancel` set, a still-pending order is also cancelled. Returns
    /// `None` when the order is unknown or already paid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn mark_payment_failed(
        &self,
        id: OrderId,
        cancel: bool,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(sqlx::query_as::<_, Order>(&format!(
            "UPDATE skinior.customer_order
             SET payment_status = 'failed',
                 status = CASE WHEN $2 AND status = 'pending'
                               THEN 'cancelled'::skinior.order_status ELSE status END,
                 updated_at = NOW()
             WHERE id = $1 AND payment_status <> 'paid'
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(cancel)
        .fetch_optional(self.pool)
        .await?)
    }

    /// Look up a discount code (already upper-cased).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn discount(&self, code: &str) -> Result<Option<DiscountCode>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        discount_by_code(&mut conn, code, false).await
    }
}

/// Look up a discount code, optionally locking it for a usage increment.
pub(crate) async fn discount_by_code(
    conn: &mut PgConnection,
    code: &str,
    for_update: bool,
) -> Result<Option<DiscountCode>, RepositoryError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    Ok(sqlx::query_as::<_, DiscountCode>(&format!(
        "SELECT {DISCOUNT_COLUMNS} FROM skinior.discount_code WHERE code = $1{lock}"
    ))
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?)
}

pub(crate) async fn increment_discount_usage(
    conn: &mut PgConnection,
    id: DiscountId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE skinior.discount_code SET usage_count = usage_count + 1 WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Lock the given products for the rest of the transaction, in id order.
pub(crate) async fn lock_products(
    conn: &mut PgConnection,
    product_ids: &[ProductId],
) -> Result<Vec<OrderableProduct>, RepositoryError> {
    let ids: Vec<i32> = product_ids.iter().map(ProductId::as_i32).collect();
    Ok(sqlx::query_as::<_, OrderableProduct>(
        "SELECT id, title, sku, price, stock_quantity, is_active
         FROM skinior.product WHERE id = ANY($1)
         ORDER BY id
         FOR UPDATE",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?)
}

/// Take `quantity` units out of stock. Fails with `Conflict` rather than going negative.
pub(crate) async fn decrement_stock(
    conn: &mut PgConnection,
    product_id: ProductId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        "UPDATE skinior.product SET stock_quantity = stock_quantity - $2, updated_at = NOW()
         WHERE id = $1 AND stock_quantity >= $2",
    )
    .bind(product_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::Conflict(format!(
            "insufficient stock for product {product_id}"
        )));
    }
    Ok(())
}

/// Write an order and its lines.
///
/// A taken order number is reported as `RepositoryError::Conflict` without
/// aborting the surrounding transaction, so the caller can retry with a new one.
pub(crate) async fn insert_order(
    conn: &mut PgConnection,
    order: &NewOrder,
    items: &[NewOrderItem],
) -> Result<OrderWithItems, RepositoryError> {
    let inserted = sqlx::query_as::<_, Order>(&format!(
        "INSERT INTO skinior.customer_order
            (order_number, user_id, customer_email, customer_name, customer_phone,
             status, payment_method, payment_status, shipping_method, subtotal,
             discount_amount, discount_code, tax, shipping, total, currency,
             shipping_address, billing_address, notes)
         VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                 $16, $17, $18)
         ON CONFLICT (order_number) DO NOTHING
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(&order.order_number)
    .bind(order.user_id)
    .bind(&order.customer_email)
    .bind(&order.customer_name)
    .bind(order.customer_phone.as_deref())
    .bind(order.payment_method)
    .bind(order.payment_status)
    .bind(order.shipping_method)
    .bind(order.subtotal)
    .bind(order.discount_amount)
    .bind(order.discount_code.as_deref())
    .bind(order.tax)
    .bind(order.shipping)
    .bind(order.total)
    .bind(&order.currency)
    .bind(&order.shipping_address)
    .bind(order.billing_address.as_ref())
    .bind(order.notes.as_deref())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| RepositoryError::Conflict("order number already exists".to_owned()))?;

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let line = sqlx::query_as::<_, OrderItem>(
            "INSERT INTO skinior.order_item (order_id, product_id, title, sku, price, quantity, total)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id, order_id, product_id, title, sku, price, quantity, total",
        )
        .bind(inserted.id)
        .bind(item.product_id)
        .bind(&item.title)
        .bind(item.sku.as_deref())
        .bind(item.price)
        .bind(item.quantity)
        .bind(item.total())
        .fetch_one(&mut *conn)
        .await?;
        lines.push(line);
    }

    Ok(OrderWithItems {
        order: inserted,
        items: lines,
    })
}
