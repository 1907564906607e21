//! Admin management of users and orders.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use skinior_core::{OrderId, OrderStatus, UserId};

use crate::db::RepositoryError;
use crate::db::orders::OrderRepository;
use crate::db::users::UserRepository;
use crate::models::PageRequest;
use crate::models::order::{Order, OrderFilter, OrderListItem, OrderUpdate, OrderWithItems};
use crate::models::pagination::Paginated;
use crate::models::user::{User, UserFilter, UserUpdate, UserWithStats};

/// Errors from admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("you cannot delete your own account")]
    CannotDeleteSelf,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn not_found(what: &'static str) -> impl Fn(RepositoryError) -> AdminError {
    move |e| match e {
        RepositoryError::NotFound => AdminError::NotFound(what),
        other => AdminError::Repository(other),
    }
}

/// Check a requested status change. Keeping the current status is allowed.
///
/// # Errors
///
/// Returns `AdminError::InvalidTransition` if the order may not move to `to`.
pub fn check_transition(from: OrderStatus, to: Option<OrderStatus>) -> Result<(), AdminError> {
    match to {
        Some(to) if to != from && !from.can_transition_to(to) => {
            Err(AdminError::InvalidTransition { from, to })
        }
        _ => Ok(()),
    }
}

/// User and order administration.
pub struct AdminService<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// # Errors
    ///
    /// Returns `AdminError::Repository` if the query fails.
    pub async fn users(&self, filter: &UserFilter) -> Result<Paginated<User>, AdminError> {
        let page = PageRequest::new(filter.page, filter.limit);
        let (users, total) = UserRepository::new(self.pool).list(filter, page).await?;
        Ok(Paginated::new(users, page, total))
    }

    /// # Errors
    ///
    /// Returns `AdminError::NotFound` if the user does not exist.
    pub async fn user(&self, id: UserId) -> Result<UserWithStats, AdminError> {
        UserRepository::new(self.pool)
            .get_with_stats(id)
            .await?
            .ok_or(AdminError::NotFound("user"))
    }

    /// # Errors
    ///
    /// Returns `AdminError::NotFound` if the user does not exist.
    #[instrument(skip(self, update))]
    pub async fn update_user(&self, id: UserId, update: &UserUpdate) -> Result<User, AdminError> {
        let user = UserRepository::new(self.pool)
            .update(id, update)
            .await
            .map_err(not_found("user"))?;
        info!(role = %user.role, is_active = user.is_active, "User updated");
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `AdminError::CannotDeleteSelf` when `id` is the acting admin and
    /// `AdminError::NotFound` if the user does not exist.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: UserId, acting: UserId) -> Result<(), AdminError> {
        if id == acting {
            return Err(AdminError::CannotDeleteSelf);
        }
        UserRepository::new(self.pool)
            .delete(id)
            .await
            .map_err(not_found("user"))?;
        info!("User deleted");
        Ok(())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// # Errors
    ///
    /// Returns `AdminError::Repository` if the query fails.
    pub async fn orders(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<Paginated<OrderListItem>, AdminError> {
        let (orders, total) = OrderRepository::new(self.pool).list(filter, page).await?;
        Ok(Paginated::new(orders, page, total))
    }

    /// # Errors
    ///
    /// Returns `AdminError::NotFound` if the order does not exist.
    pub async fn order(&self, id: OrderId) -> Result<OrderWithItems, AdminError> {
        OrderRepository::new(self.pool)
            .get_with_items(id)
            .await?
            .ok_or(AdminError::NotFound("order"))
    }

    /// Apply an update, enforcing the order status transitions.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::InvalidTransition` for a forbidden status change,
    /// `AdminError::NotFound` for an unknown order and
    /// `AdminError::Repository` with `Conflict` if the status changed meanwhile.
    #[instrument(skip(self, update))]
    pub async fn update_order(&self, id: OrderId, update: &OrderUpdate) -> Result<Order, AdminError> {
        let repo = OrderRepository::new(self.pool);
        let current = repo.get(id).await?.ok_or(AdminError::NotFound("order"))?;

        if let Err(e) = check_transition(current.status, update.status) {
            warn!(from = %current.status, to = ?update.status, "Rejected order status change");
            return Err(e);
        }

        let order = repo
            .update(id, current.status, update)
            .await
            .map_err(not_found("order"))?;
        info!(
            order_number = %order.order_number,
            status = %order.status,
            payment_status = %order.payment_status,
            "Order updated"
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_transition() {
        assert!(check_transition(OrderStatus::Pending, Some(OrderStatus::Confirmed)).is_ok());
        assert!(check_transition(OrderStatus::Shipped, Some(OrderStatus::Delivered)).is_ok());
        assert!(check_transition(OrderStatus::Delivered, None).is_ok());
    }

    #[test]
    fn test_same_status_is_allowed() {
        assert!(check_transition(OrderStatus::Cancelled, Some(OrderStatus::Cancelled)).is_ok());
    }

    #[test]
    fn test_invalid_transition() {
        let err = check_transition(OrderStatus::Delivered, Some(OrderStatus::Pending));
        assert!(matches!(
            err,
            Err(AdminError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Pending
            })
        ));
        assert!(check_transition(OrderStatus::Refunded, Some(OrderStatus::Shipped)).is_err());
    }

    #[test]
    fn test_transition_message() {
        let err = AdminError::InvalidTransition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Pending,
        };
        assert_eq!(err.to_string(), "cannot change order status from shipped to pending");
    }
}
