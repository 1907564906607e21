//! Checkout: shipping and payment options, discounts, order placement,
//! payment and Stripe webhook handling.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use skinior_core::{
    CurrencyCode, DiscountType, Email, EmailError, OrderId, OrderStatus, PaymentMethod,
    PaymentStatus, ProductId, ShippingMethod, UserId, UserRole, round_money, tax_on,
    to_minor_units,
};

use crate::db::RepositoryError;
use crate::db::carts::{cart_lines, clear_cart, find_cart};
use crate::db::orders::{
    OrderRepository, decrement_stock, discount_by_code, increment_discount_usage, insert_order,
    lock_products,
};
use crate::db::users::find_or_create_customer;
use crate::models::CurrentUser;
use crate::models::cart::CartOwner;
use crate::models::order::{
    AppliedDiscount, CheckoutItem, CreateOrderRequest, DiscountCode, NewOrder, NewOrderItem,
    Order, OrderWithItems, PayRequest, PaymentOption, PlacedOrder, ShippingOption, is_jordan,
};
use crate::models::user::NewUser;
use crate::services::stripe::{StripeClient, StripeError, WebhookEvent};

/// Handling fee added to shipping for cash on delivery.
pub const COD_FEE: Decimal = Decimal::from_parts(200, 0, 0, false, 2);

const ORDER_NUMBER_ATTEMPTS: usize = 10;

/// Why a discount code was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscountRejection {
    #[error("discount code not found")]
    NotFound,
    #[error("discount code is not active")]
    Inactive,
    #[error("discount code is not valid yet")]
    NotStarted,
    #[error("discount code has expired")]
    Expired,
    #[error("order subtotal must be at least {0}")]
    BelowMinimum(Decimal),
    #[error("discount code usage limit reached")]
    Exhausted,
}

/// Errors from checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("no items to order")]
    EmptyOrder,

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error(transparent)]
    InvalidEmail(#[from] EmailError),

    #[error("{0}")]
    InvalidCurrency(String),

    #[error("product {0} is not available")]
    ProductUnavailable(ProductId),

    #[error("only {available} of product {product_id} in stock")]
    InsufficientStock { product_id: ProductId, available: i32 },

    #[error("cash on delivery is only available in Jordan")]
    CodUnavailable,

    #[error(transparent)]
    Discount(#[from] DiscountRejection),

    #[error("order not found")]
    OrderNotFound,

    #[error("order is already paid")]
    AlreadyPaid,

    #[error("order cannot be paid in its current state")]
    NotPayable,

    #[error("payment_method_id is required for card payments")]
    PaymentMethodRequired,

    #[error("payment failed: {0}")]
    PaymentFailed(String),

    #[error("card payments are not configured")]
    StripeUnavailable,

    #[error(transparent)]
    Stripe(#[from] StripeError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Shipping options, cheapest first.
#[must_use]
pub fn shipping_options() -> Vec<ShippingOption> {
    [ShippingMethod::Standard, ShippingMethod::Express]
        .into_iter()
        .map(|method| ShippingOption {
            method,
            name: match method {
                ShippingMethod::Standard => "Standard Shipping",
                ShippingMethod::Express => "Express Shipping",
            },
            price: shipping_price(method),
            estimated_days: match method {
                ShippingMethod::Standard => "5-7",
                ShippingMethod::Express => "2-3",
            },
        })
        .collect()
}

#[must_use]
pub const fn shipping_price(method: ShippingMethod) -> Decimal {
    match method {
        ShippingMethod::Standard => Decimal::from_parts(500, 0, 0, false, 2),
        ShippingMethod::Express => Decimal::from_parts(1500, 0, 0, false, 2),
    }
}

/// Payment options for a destination country. Cash on delivery is Jordan only.
#[must_use]
pub fn payment_options(country: Option<&str>) -> Vec<PaymentOption> {
    let mut options = vec![PaymentOption {
        method: PaymentMethod::Stripe,
        name: "Credit / Debit Card",
        fee: Decimal::ZERO,
    }];
    if country.is_some_and(is_jordan) {
        options.push(PaymentOption {
            method: PaymentMethod::Cod,
            name: "Cash on Delivery",
            fee: COD_FEE,
        });
    }
    options
}

/// Check a discount against a subtotal and compute the amount off.
///
/// # Errors
///
/// Returns the reason the code cannot be used.
pub fn evaluate_discount(
    discount: &DiscountCode,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> Result<AppliedDiscount, DiscountRejection> {
    if !discount.is_active {
        return Err(DiscountRejection::Inactive);
    }
    if discount.starts_at.is_some_and(|start| now < start) {
        return Err(DiscountRejection::NotStarted);
    }
    if discount.ends_at.is_some_and(|end| now > end) {
        return Err(DiscountRejection::Expired);
    }
    if subtotal < discount.minimum_amount {
        return Err(DiscountRejection::BelowMinimum(discount.minimum_amount));
    }
    if discount.usage_limit.is_some_and(|limit| discount.usage_count >= limit) {
        return Err(DiscountRejection::Exhausted);
    }

    let amount = match discount.discount_type {
        DiscountType::Percentage => {
            round_money(subtotal * discount.value / Decimal::ONE_HUNDRED).min(subtotal)
        }
        DiscountType::Fixed => discount.value.min(subtotal),
    }
    .max(Decimal::ZERO);

    Ok(AppliedDiscount {
        code: discount.code.clone(),
        discount_type: discount.discount_type,
        value: discount.value,
        discount_amount: amount,
        new_total: (subtotal - amount).max(Decimal::ZERO),
    })
}

/// Money totals of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// Tax is charged on the discounted subtotal; COD adds its fee to shipping.
#[must_use]
pub fn order_totals(
    subtotal: Decimal,
    discount: Decimal,
    shipping_method: ShippingMethod,
    payment_method: PaymentMethod,
) -> OrderTotals {
    let subtotal = round_money(subtotal);
    let tax = tax_on(subtotal - discount);
    let mut shipping = shipping_price(shipping_method);
    if payment_method == PaymentMethod::Cod {
        shipping += COD_FEE;
    }
    OrderTotals {
        subtotal,
        discount,
        tax,
        shipping,
        total: subtotal - discount + tax + shipping,
    }
}

/// `SKN-{year}-{4 digits}`.
#[must_use]
pub fn generate_order_number(year: i32) -> String {
    let n: u16 = rand::rng().random_range(1000..10_000);
    format!("SKN-{year}-{n}")
}

/// The order numbers tried, in order, before placement gives up.
fn order_number_candidates(year: i32) -> impl Iterator<Item = String> {
    std::iter::repeat_with(move || generate_order_number(year)).take(ORDER_NUMBER_ATTEMPTS)
}

/// Sum quantities per product, in product id order.
fn consolidate(items: &[CheckoutItem]) -> Result<Vec<CheckoutItem>, CheckoutError> {
    let mut by_product: BTreeMap<ProductId, i32> = BTreeMap::new();
    for item in items {
        if item.quantity < 1 {
            return Err(CheckoutError::InvalidQuantity);
        }
        let entry = by_product.entry(item.product_id).or_insert(0);
        *entry = entry.saturating_add(item.quantity);
    }
    Ok(by_product
        .into_iter()
        .map(|(product_id, quantity)| CheckoutItem {
            product_id,
            quantity,
        })
        .collect())
}

fn customer_name(first: &str, last: &str, email: &Email) -> String {
    let name = format!("{} {}", first.trim(), last.trim());
    let name = name.trim();
    if name.is_empty() {
        email.to_string()
    } else {
        name.to_owned()
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, CheckoutError> {
    serde_json::to_value(value)
        .map_err(|e| RepositoryError::DataCorruption(e.to_string()).into())
}

/// Checkout operations.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Validate a discount code against a subtotal without using it.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Discount` if the code cannot be used.
    pub async fn check_discount(
        &self,
        code: &str,
        subtotal: Decimal,
    ) -> Result<AppliedDiscount, CheckoutError> {
        let discount = OrderRepository::new(self.pool)
            .discount(&code.trim().to_uppercase())
            .await?
            .ok_or(DiscountRejection::NotFound)?;
        Ok(evaluate_discount(&discount, subtotal, Utc::now())?)
    }

    /// Place an order in one transaction.
    ///
    /// Lines come from the request, or from `cart` when the request has none.
    /// Prices are read from the locked product rows.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyOrder` if there is nothing to order,
    /// `CheckoutError::ProductUnavailable` / `InsufficientStock` for bad lines,
    /// `CheckoutError::CodUnavailable` for COD outside Jordan, and
    /// `CheckoutError::Discount` for an unusable discount code.
    #[instrument(skip(self, request, cart), fields(caller = ?caller, payment = %request.payment_method))]
    pub async fn place_order(
        &self,
        request: &CreateOrderRequest,
        caller: Option<UserId>,
        cart: Option<CartOwner>,
        default_currency: CurrencyCode,
    ) -> Result<PlacedOrder, CheckoutError> {
        let email = Email::parse(&request.customer.email)?;
        if request.payment_method == PaymentMethod::Cod && !request.shipping_address.is_jordan() {
            return Err(CheckoutError::CodUnavailable);
        }
        let currency = match request.currency.as_deref() {
            Some(code) => code
                .parse::<CurrencyCode>()
                .map_err(CheckoutError::InvalidCurrency)?,
            None => default_currency,
        };

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let mut cart_used = None;
        let requested = if request.items.is_empty() {
            let Some(owner) = cart else {
                return Err(CheckoutError::EmptyOrder);
            };
            let Some(cart) = find_cart(&mut tx, owner, true).await? else {
                return Err(CheckoutError::EmptyOrder);
            };
            let lines = cart_lines(&mut tx, cart.id).await?;
            cart_used = Some(cart.id);
            lines
                .iter()
                .map(|l| CheckoutItem {
                    product_id: l.product_id,
                    quantity: l.quantity,
                })
                .collect()
        } else {
            request.items.clone()
        };
        let requested = consolidate(&requested)?;
        if requested.is_empty() {
            return Err(CheckoutError::EmptyOrder);
        }

        let ids: Vec<ProductId> = requested.iter().map(|i| i.product_id).collect();
        let products = lock_products(&mut tx, &ids).await?;

        let mut items = Vec::with_capacity(requested.len());
        for line in &requested {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id)
                .filter(|p| p.is_active)
                .ok_or(CheckoutError::ProductUnavailable(line.product_id))?;
            if product.stock_quantity < line.quantity {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    available: product.stock_quantity.max(0),
                });
            }
            items.push(NewOrderItem {
                product_id: product.id,
                title: product.title.clone(),
                sku: product.sku.clone(),
                price: product.price,
                quantity: line.quantity,
            });
        }
        let subtotal = round_money(items.iter().map(NewOrderItem::total).sum());

        let mut discount_amount = Decimal::ZERO;
        let mut discount_code = None;
        if let Some(code) = request.discount_code.as_deref().and_then(non_blank) {
            let code = code.to_uppercase();
            let discount = discount_by_code(&mut tx, &code, true)
                .await?
                .ok_or(DiscountRejection::NotFound)?;
            let applied = evaluate_discount(&discount, subtotal, Utc::now())?;
            increment_discount_usage(&mut tx, discount.id).await?;
            discount_amount = applied.discount_amount;
            discount_code = Some(applied.code);
        }

        let totals = order_totals(
            subtotal,
            discount_amount,
            request.shipping_method,
            request.payment_method,
        );

        let customer = &request.customer;
        let (user_id, account_created) = match caller {
            Some(id) => (id, false),
            None => {
                let (user, created) = find_or_create_customer(
                    &mut tx,
                    &NewUser {
                        email: email.clone(),
                        first_name: non_blank(&customer.first_name),
                        last_name: non_blank(&customer.last_name),
                        phone: customer.phone.as_deref().and_then(non_blank),
                        role: UserRole::Customer,
                        password_hash: None,
                    },
                )
                .await?;
                (user.id, created)
            }
        };

        for item in &items {
            decrement_stock(&mut tx, item.product_id, item.quantity)
                .await
                .map_err(|e| match e {
                    RepositoryError::Conflict(_) => CheckoutError::InsufficientStock {
                        product_id: item.product_id,
                        available: 0,
                    },
                    other => other.into(),
                })?;
        }

        let mut new_order = NewOrder {
            order_number: String::new(),
            user_id: Some(user_id),
            customer_email: email.to_string(),
            customer_name: customer_name(&customer.first_name, &customer.last_name, &email),
            customer_phone: customer.phone.as_deref().and_then(non_blank),
            payment_method: request.payment_method,
            payment_status: request.payment_method.initial_payment_status(),
            shipping_method: request.shipping_method,
            subtotal: totals.subtotal,
            discount_amount: totals.discount,
            discount_code,
            tax: totals.tax,
            shipping: totals.shipping,
            total: totals.total,
            currency: currency.code().to_owned(),
            shipping_address: to_json(&request.shipping_address)?,
            billing_address: request.billing_address.as_ref().map(to_json).transpose()?,
            notes: request.notes.clone(),
        };
        let mut placed = None;
        for candidate in order_number_candidates(Utc::now().year()) {
            new_order.order_number = candidate;
            match insert_order(&mut tx, &new_order, &items).await {
                Ok(order) => {
                    placed = Some(order);
                    break;
                }
                Err(RepositoryError::Conflict(_)) => {
                    warn!(order_number = %new_order.order_number, "Order number taken, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        let order = placed.ok_or_else(|| {
            RepositoryError::Conflict("could not allocate an order number".to_owned())
        })?;

        if let Some(cart_id) = cart_used {
            clear_cart(&mut tx, cart_id).await?;
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        info!(
            order_id = %order.order.id,
            order_number = %order.order.order_number,
            total = %order.order.total,
            account_created,
            "Order placed"
        );
        Ok(PlacedOrder {
            order,
            account_created,
        })
    }

    /// Pay for an order with its chosen payment method.
    ///
    /// Signed-in callers may only pay their own orders (admins any order).
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::OrderNotFound`, `AlreadyPaid` or `NotPayable`
    /// for orders that cannot be paid, `StripeUnavailable` when card payments
    /// are not configured and `PaymentFailed` when the card is declined.
    #[instrument(skip(self, request, stripe, caller), fields(order_id = %id))]
    pub async fn pay(
        &self,
        id: OrderId,
        request: &PayRequest,
        caller: Option<&CurrentUser>,
        stripe: Option<&StripeClient>,
    ) -> Result<Order, CheckoutError> {
        let orders = OrderRepository::new(self.pool);
        let order = orders.get(id).await?.ok_or(CheckoutError::OrderNotFound)?;
        if let Some(caller) = caller
            && !caller.is_admin()
            && order.user_id != Some(caller.id)
        {
            return Err(CheckoutError::OrderNotFound);
        }
        if order.payment_status == PaymentStatus::Paid {
            return Err(CheckoutError::AlreadyPaid);
        }
        if order.status != OrderStatus::Pending {
            return Err(CheckoutError::NotPayable);
        }

        match order.payment_method {
            PaymentMethod::Cod => Ok(orders.confirm_cod(id).await?),
            PaymentMethod::Stripe => {
                let stripe = stripe.ok_or(CheckoutError::StripeUnavailable)?;
                let payment_method_id = request
                    .payment_method_id
                    .as_deref()
                    .and_then(non_blank)
                    .ok_or(CheckoutError::PaymentMethodRequired)?;
                let amount = to_minor_units(order.total).ok_or(CheckoutError::NotPayable)?;

                match stripe
                    .create_and_confirm(
                        amount,
                        &order.currency,
                        &payment_method_id,
                        order.id,
                        &order.order_number,
                    )
                    .await
                {
                    Ok(intent) if intent.succeeded() => Ok(orders.mark_paid(id, &intent.id).await?),
                    Ok(intent) => {
                        warn!(intent_id = %intent.id, status = %intent.status, "PaymentIntent not completed");
                        orders.mark_payment_failed(id, false).await?;
                        Err(CheckoutError::PaymentFailed(format!(
                            "payment is {}",
                            intent.status.replace('_', " ")
                        )))
                    }
                    Err(StripeError::Api { message, .. }) => {
                        orders.mark_payment_failed(id, false).await?;
                        Err(CheckoutError::PaymentFailed(message))
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    /// Apply a verified Stripe event to its order.
    ///
    /// Events without an order reference are acknowledged and ignored.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if the order update fails.
    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn handle_stripe_event(&self, event: &WebhookEvent) -> Result<(), CheckoutError> {
        let orders = OrderRepository::new(self.pool);
        match event.event_type.as_str() {
            "payment_intent.succeeded" => {
                let (Some(order_id), Some(intent_id)) = (event.order_id(), event.object_id()) else {
                    warn!("Payment succeeded without an order reference");
                    return Ok(());
                };
                match orders.mark_paid(order_id, intent_id).await {
                    Ok(order) => info!(order_number = %order.order_number, "Order paid"),
                    Err(RepositoryError::NotFound) => warn!(%order_id, "Paid order not found"),
                    Err(e) => return Err(e.into()),
                }
            }
            "payment_intent.payment_failed" => {
                let Some(order_id) = event.order_id() else {
                    warn!("Payment failure without an order reference");
                    return Ok(());
                };
                match orders.mark_payment_failed(order_id, true).await? {
                    Some(order) => info!(order_number = %order.order_number, "Order payment failed"),
                    None => info!(%order_id, "Failure ignored for unknown or paid order"),
                }
            }
            "charge.dispute.created" => {
                warn!(object_id = ?event.object_id(), "Charge disputed");
            }
            other => info!(event_type = other, "Unhandled Stripe event"),
        }
        Ok(())
    }

    /// The caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if the query fails.
    pub async fn orders_for(&self, user_id: UserId) -> Result<Vec<OrderWithItems>, CheckoutError> {
        Ok(OrderRepository::new(self.pool).list_for_user(user_id).await?)
    }

    /// An order visible to `caller`: their own, or any for admins.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::OrderNotFound` otherwise.
    pub async fn order_for(
        &self,
        id: OrderId,
        caller: &CurrentUser,
    ) -> Result<OrderWithItems, CheckoutError> {
        let order = OrderRepository::new(self.pool)
            .get_with_items(id)
            .await?
            .ok_or(CheckoutError::OrderNotFound)?;
        if caller.is_admin() || order.order.user_id == Some(caller.id) {
            Ok(order)
        } else {
            Err(CheckoutError::OrderNotFound)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use chrono::Duration;
    use skinior_core::DiscountId;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn discount(discount_type: DiscountType, value: &str) -> DiscountCode {
        DiscountCode {
            id: DiscountId::new(1),
            code: "WELCOME10".to_owned(),
            discount_type,
            value: dec(value),
            minimum_amount: Decimal::ZERO,
            usage_limit: None,
            usage_count: 0,
            starts_at: None,
            ends_at: None,
            is_active: true,
        }
    }

    #[test]
    fn test_shipping_options() {
        let options = shipping_options();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].price, dec("5.00"));
        assert_eq!(options[1].method, ShippingMethod::Express);
        assert_eq!(options[1].price, dec("15.00"));
        assert_eq!(options[1].estimated_days, "2-3");
    }

    #[test]
    fn test_payment_options_cod_only_in_jordan() {
        assert_eq!(payment_options(None).len(), 1);
        assert_eq!(payment_options(Some("SA")).len(), 1);

        let options = payment_options(Some("Jordan"));
        assert_eq!(options.len(), 2);
        assert_eq!(options[1].method, PaymentMethod::Cod);
        assert_eq!(options[1].fee, dec("2.00"));
        assert_eq!(payment_options(Some("jo")).len(), 2);
    }

    #[test]
    fn test_percentage_discount() {
        let applied = evaluate_discount(&discount(DiscountType::Percentage, "15"), dec("33.33"), Utc::now())
            .unwrap();
        assert_eq!(applied.discount_amount, dec("5.00"));
        assert_eq!(applied.new_total, dec("28.33"));
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let applied =
            evaluate_discount(&discount(DiscountType::Fixed, "50"), dec("20.00"), Utc::now()).unwrap();
        assert_eq!(applied.discount_amount, dec("20.00"));
        assert_eq!(applied.new_total, Decimal::ZERO);
    }

    #[test]
    fn test_discount_rejections() {
        let now = Utc::now();
        let base = discount(DiscountType::Fixed, "5");

        let inactive = DiscountCode { is_active: false, ..base.clone() };
        assert_eq!(evaluate_discount(&inactive, dec("10"), now), Err(DiscountRejection::Inactive));

        let future = DiscountCode { starts_at: Some(now + Duration::days(1)), ..base.clone() };
        assert_eq!(evaluate_discount(&future, dec("10"), now), Err(DiscountRejection::NotStarted));

        let expired = DiscountCode { ends_at: Some(now - Duration::days(1)), ..base.clone() };
        assert_eq!(evaluate_discount(&expired, dec("10"), now), Err(DiscountRejection::Expired));

        let minimum = DiscountCode { minimum_amount: dec("25"), ..base.clone() };
        assert_eq!(
            evaluate_discount(&minimum, dec("10"), now),
            Err(DiscountRejection::BelowMinimum(dec("25")))
        );

        let used_up = DiscountCode { usage_limit: Some(3), usage_count: 3, ..base };
        assert_eq!(evaluate_discount(&used_up, dec("10"), now), Err(DiscountRejection::Exhausted));
    }

    #[test]
    fn test_order_totals_tax_on_discounted_subtotal() {
        let totals = order_totals(dec("100.00"), dec("10.00"), ShippingMethod::Standard, PaymentMethod::Stripe);
        assert_eq!(totals.tax, dec("7.20"));
        assert_eq!(totals.shipping, dec("5.00"));
        assert_eq!(totals.total, dec("102.20"));
    }

    #[test]
    fn test_order_totals_cod_fee() {
        let totals = order_totals(dec("40.00"), Decimal::ZERO, ShippingMethod::Express, PaymentMethod::Cod);
        assert_eq!(totals.shipping, dec("17.00"));
        assert_eq!(totals.tax, dec("3.20"));
        assert_eq!(totals.total, dec("60.20"));
    }

    #[test]
    fn test_order_number_format() {
        let number = generate_order_number(2026);
        let digits = number.strip_prefix("SKN-2026-").unwrap();
        assert_eq!(digits.len(), 4);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_order_number_candidates_bounded() {
        let candidates: Vec<String> = order_number_candidates(2026).collect();
        assert_eq!(candidates.len(), ORDER_NUMBER_ATTEMPTS);
        assert!(candidates.iter().all(|n| n.starts_with("SKN-2026-")));
    }

    #[test]
    fn test_consolidate_sums_duplicates() {
        let item = |id, quantity| CheckoutItem { product_id: ProductId::new(id), quantity };
        let lines = consolidate(&[item(3, 1), item(1, 2), item(3, 4)]).unwrap();
        assert_eq!(lines, vec![item(1, 2), item(3, 5)]);
        assert!(matches!(consolidate(&[item(1, 0)]), Err(CheckoutError::InvalidQuantity)));
    }

    #[test]
    fn test_customer_name_falls_back_to_email() {
        let email = Email::parse("lina@example.com").unwrap();
        assert_eq!(customer_name(" Lina ", "Saleh", &email), "Lina Saleh");
        assert_eq!(customer_name("", " ", &email), "lina@example.com");
    }
}
