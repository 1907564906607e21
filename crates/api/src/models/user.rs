//! User account models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use skinior_core::{Email, UserId, UserRole};

/// A user account (customer, admin or agent).
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub is_system: bool,
    /// False for accounts created by guest checkout that were never claimed.
    pub has_password: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "First Last", falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.email.to_string()
        } else {
            name
        }
    }
}

/// A user with order statistics, for the admin detail view.
#[derive(Debug, Clone, Serialize)]
pub struct UserWithStats {
    #[serde(flatten)]
    pub user: User,
    pub order_count: i64,
    pub total_spent: Decimal,
}

/// Profile fields for new accounts.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: UserRole,
    pub password_hash: Option<String>,
}

/// Admin user list filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub active: Option<bool>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Admin user update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

/// `POST /api/admin/agents` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAgentRequest {
    pub name: String,
    pub email: String,
    pub description: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// `POST /api/admin/agents/{id}/refresh` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshAgentRequest {
    pub expires_at: Option<DateTime<Utc>>,
}

/// A freshly issued agent key. The key is only ever returned here.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedAgentKey {
    pub agent: User,
    pub api_key: String,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(first: Option<&str>, last: Option<&str>) -> User {
        User {
            id: UserId::new(1),
            email: Email::parse("rania@example.com").unwrap(),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
            phone: None,
            role: UserRole::Customer,
            is_active: true,
            is_system: false,
            has_password: true,
            api_key_description: None,
            token_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(user(Some("Rania"), Some("Haddad")).display_name(), "Rania Haddad");
        assert_eq!(user(Some("Rania"), None).display_name(), "Rania");
        assert_eq!(user(Some("  "), None).display_name(), "rania@example.com");
    }
}
