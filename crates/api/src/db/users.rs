//! User repository: customers, admins and agent accounts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use skinior_core::{Email, UserId, UserRole};

use super::{RepositoryError, like_pattern};
use crate::models::PageRequest;
use crate::models::user::{NewUser, User, UserFilter, UserUpdate, UserWithStats};

const USER_COLUMNS: &str = "id, email, first_name, last_name, phone, role, is_active, is_system, \
     password_hash IS NOT NULL AS has_password, api_key_description, token_expires_at, \
     created_at, updated_at";

/// Raw user row; the email is validated on the way out.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    role: UserRole,
    is_active: bool,
    is_system: bool,
    has_password: bool,
    api_key_description: Option<String>,
    token_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(Self {
            id: r.id,
            email,
            first_name: r.first_name,
            last_name: r.last_name,
            phone: r.phone,
            role: r.role,
            is_active: r.is_active,
            is_system: r.is_system,
            has_password: r.has_password,
            api_key_description: r.api_key_description,
            token_expires_at: r.token_expires_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserStatsRow {
    #[sqlx(flatten)]
    user: UserRow,
    order_count: i64,
    total_spent: Decimal,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM skinior.user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    /// Get a user by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM skinior.user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    /// Get a user and their password hash by email, for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, Option<String>)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct Row {
            #[sqlx(flatten)]
            user: UserRow,
            password_hash: Option<String>,
        }

        let row = sqlx::query_as::<_, Row>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM skinior.user WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok::<_, RepositoryError>((User::try_from(r.user)?, r.password_hash)))
            .transpose()
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, new_user), fields(email = %new_user.email))]
    pub async fn create(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_user(&mut conn, new_user, None).await
    }

    /// Set the password of an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_password(&self, id: UserId, password_hash: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE skinior.user SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// List users with filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<(Vec<User>, i64), RepositoryError> {
        let search = like_pattern(filter.search.as_deref());
        let predicate = "($1::skinior.user_role IS NULL OR role = $1)
             AND ($2::boolean IS NULL OR is_active = $2)
             AND ($3::text IS NULL OR email ILIKE $3 OR first_name ILIKE $3 OR last_name ILIKE $3)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM skinior.user WHERE {predicate}"
        ))
        .bind(filter.role)
        .bind(filter.active)
        .bind(search.as_deref())
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM skinior.user WHERE {predicate}
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(filter.role)
        .bind(filter.active)
        .bind(search.as_deref())
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((users, total))
    }

    /// Get a user with order count and total spent on paid orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_stats(&self, id: UserId) -> Result<Option<UserWithStats>, RepositoryError> {
        let row = sqlx::query_as::<_, UserStatsRow>(
            "SELECT u.id, u.email, u.first_name, u.last_name, u.phone, u.role, u.is_active,
                    u.is_system, u.password_hash IS NOT NULL AS has_password,
                    u.api_key_description, u.token_expires_at, u.created_at, u.updated_at,
                    COUNT(o.id) AS order_count,
                    COALESCE(SUM(o.total) FILTER (WHERE o.payment_status = 'paid'), 0) AS total_spent
             FROM skinior.user u
             LEFT JOIN skinior.customer_order o ON o.user_id = u.id
             WHERE u.id = $1
             GROUP BY u.id",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| {
            Ok::<_, RepositoryError>(UserWithStats {
                user: User::try_from(r.user)?,
                order_count: r.order_count,
                total_spent: r.total_spent,
            })
        })
        .transpose()
    }

    /// Update profile fields, role and active flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update(&self, id: UserId, update: &UserUpdate) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE skinior.user SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone),
                role = COALESCE($5, role),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.first_name.as_deref())
        .bind(update.last_name.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.role)
        .bind(update.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(row)
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM skinior.user WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Agent accounts
    // =========================================================================

    /// Create an agent system account holding an API key digest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    #[instrument(skip(self, new_user, api_key_hash), fields(email = %new_user.email))]
    pub async fn create_agent(
        &self,
        new_user: &NewUser,
        api_key_hash: &str,
        description: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_user(
            &mut conn,
            new_user,
            Some(AgentKey {
                hash: api_key_hash,
                description,
                expires_at,
            }),
        )
        .await
    }

    /// List agent accounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_agents(&self) -> Result<Vec<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM skinior.user WHERE role = 'agent' ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
    }

    /// Find the active, unexpired agent owning an API key digest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_agent_by_key_hash(
        &self,
        api_key_hash: &str,
    ) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM skinior.user
             WHERE api_key_hash = $1
               AND role = 'agent'
               AND is_active
               AND (token_expires_at IS NULL OR token_expires_at > NOW())"
        ))
        .bind(api_key_hash)
        .fetch_optional(self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    /// Extend an agent key's expiry and reactivate the agent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no agent has this ID.
    pub async fn refresh_agent(
        &self,
        id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE skinior.user
             SET token_expires_at = $2, is_active = TRUE, updated_at = NOW()
             WHERE id = $1 AND role = 'agent'
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(expires_at)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(row)
    }

    /// Deactivate an agent; its key stops authenticating immediately.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no agent has this ID.
    pub async fn deactivate_agent(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE skinior.user SET is_active = FALSE, updated_at = NOW()
             WHERE id = $1 AND role = 'agent'",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

struct AgentKey<'k> {
    hash: &'k str,
    description: Option<&'k str>,
    expires_at: DateTime<Utc>,
}

async fn insert_user(
    conn: &mut PgConnection,
    new_user: &NewUser,
    agent: Option<AgentKey<'_>>,
) -> Result<User, RepositoryError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "INSERT INTO skinior.user
            (email, first_name, last_name, phone, role, password_hash, is_system,
             api_key_hash, api_key_description, token_expires_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(new_user.email.as_str())
    .bind(new_user.first_name.as_deref())
    .bind(new_user.last_name.as_deref())
    .bind(new_user.phone.as_deref())
    .bind(new_user.role)
    .bind(new_user.password_hash.as_deref())
    .bind(agent.is_some())
    .bind(agent.as_ref().map(|a| a.hash))
    .bind(agent.as_ref().and_then(|a| a.description))
    .bind(agent.as_ref().map(|a| a.expires_at))
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::conflict_on_unique(e, "email already exists"))?;

    User::try_from(row)
}

/// Find a customer by email or create a passwordless one, filling in
/// missing names and phone on an existing account.
///
/// Returns the user and whether it was created. Runs on the caller's
/// connection so guest checkout can do it inside the order transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub(crate) async fn find_or_create_customer(
    conn: &mut PgConnection,
    new_user: &NewUser,
) -> Result<(User, bool), RepositoryError> {
    let existing = sqlx::query_as::<_, UserRow>(&format!(
        "UPDATE skinior.user SET
            first_name = COALESCE(first_name, $2),
            last_name = COALESCE(last_name, $3),
            phone = COALESCE(phone, $4),
            updated_at = NOW()
         WHERE email = $1
         RETURNING {USER_COLUMNS}"
    ))
    .bind(new_user.email.as_str())
    .bind(new_user.first_name.as_deref())
    .bind(new_user.last_name.as_deref())
    .bind(new_user.phone.as_deref())
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(row) = existing {
        return Ok((User::try_from(row)?, false));
    }

    let user = insert_user(conn, new_user, None).await?;
    Ok((user, true))
}
