//! Status and classification enums.
//!
//! Enums stored in the database map to Postgres enum types in the `skinior`
//! schema (with the `postgres` feature). All of them serialize as
//! `snake_case` strings.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Implements `as_str`, `Display` and `FromStr` from one variant table.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Wire and database representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!("invalid {}: {s}", stringify!($name))),
                }
            }
        }
    };
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "skinior.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Shoppers, including passwordless accounts created by guest checkout.
    #[default]
    Customer,
    /// Store staff with access to `/api/admin`.
    Admin,
    /// System account for an AI integration, authenticated by API key.
    Agent,
}

string_enum!(UserRole {
    Customer => "customer",
    Admin => "admin",
    Agent => "agent",
});

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "skinior.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

string_enum!(OrderStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Confirmed,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
        Self::Refunded,
    ];

    /// Whether an order in this status may move to `next`.
    ///
    /// Re-applying the current status is always allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use OrderStatus::{
            Cancelled, Confirmed, Delivered, Pending, Processing, Refunded, Shipped,
        };

        if self as u8 == next as u8 {
            return true;
        }
        matches!(
            (self, next),
            (Pending, Confirmed | Cancelled)
                | (Confirmed, Processing | Shipped | Cancelled)
                | (Processing, Shipped | Cancelled)
                | (Shipped, Delivered)
                | (Delivered, Refunded)
        )
    }

    /// Cancelled and refunded orders never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "skinior.payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
    /// Cash on delivery, collected by the courier.
    CodPending,
}

string_enum!(PaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Refunded => "refunded",
    CodPending => "cod_pending",
});

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "skinior.payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card payment through Stripe.
    #[default]
    Stripe,
    /// Cash on delivery (Jordan only).
    Cod,
}

string_enum!(PaymentMethod {
    Stripe => "stripe",
    Cod => "cod",
});

impl PaymentMethod {
    /// Payment status a freshly placed order starts in.
    #[must_use]
    pub const fn initial_payment_status(self) -> PaymentStatus {
        match self {
            Self::Stripe => PaymentStatus::Pending,
            Self::Cod => PaymentStatus::CodPending,
        }
    }
}

/// Delivery speed chosen at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "skinior.shipping_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
}

string_enum!(ShippingMethod {
    Standard => "standard",
    Express => "express",
});

/// How a discount code reduces the order amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "skinior.discount_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is a percentage of the amount.
    Percentage,
    /// `value` is a flat amount in the order currency.
    Fixed,
}

string_enum!(DiscountType {
    Percentage => "percentage",
    Fixed => "fixed",
});

/// State of an AI skin-analysis session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "skinior.analysis_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    #[default]
    InProgress,
    Completed,
    Cancelled,
}

string_enum!(AnalysisStatus {
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

/// Priority of a product recommendation. Declared low to high so the
/// database enum sorts the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "skinior.recommendation_priority", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPriority {
    Low,
    #[default]
    Medium,
    High,
}

string_enum!(RecommendationPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
});

/// What the customer did with a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "skinior.recommendation_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    #[default]
    Recommended,
    Purchased,
    Tried,
    NotInterested,
    Wishlist,
}

string_enum!(RecommendationStatus {
    Recommended => "recommended",
    Purchased => "purchased",
    Tried => "tried",
    NotInterested => "not_interested",
    Wishlist => "wishlist",
});

impl RecommendationStatus {
    /// Purchased or tried, i.e. the customer followed the advice.
    #[must_use]
    pub const fn is_followed(self) -> bool {
        matches!(self, Self::Purchased | Self::Tried)
    }
}

/// State of a treatment plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "skinior.treatment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentStatus {
    #[default]
    Active,
    Paused,
    Completed,
    Cancelled,
}

string_enum!(TreatmentStatus {
    Active => "active",
    Paused => "paused",
    Completed => "completed",
    Cancelled => "cancelled",
});

/// Content and newsletter locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "skinior.locale", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    En,
    Ar,
}

string_enum!(Locale {
    En => "en",
    Ar => "ar",
});

/// Spoken language of a video consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationLanguage {
    English,
    #[default]
    Arabic,
}

string_enum!(ConsultationLanguage {
    English => "english",
    Arabic => "arabic",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_happy_path_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Delivered.can_transition_to(Refunded));
    }

    #[test]
    fn test_order_rejected_transitions() {
        use OrderStatus::*;
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Refunded.can_transition_to(Delivered));
        assert!(!Delivered.can_transition_to(Pending));
    }

    #[test]
    fn test_same_status_is_allowed() {
        for status in OrderStatus::ALL {
            assert!(status.can_transition_to(status));
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(!OrderStatus::Delivered.is_terminal());
    }

    #[test]
    fn test_initial_payment_status() {
        assert_eq!(PaymentMethod::Cod.initial_payment_status(), PaymentStatus::CodPending);
        assert_eq!(PaymentMethod::Stripe.initial_payment_status(), PaymentStatus::Pending);
    }

    #[test]
    fn test_string_round_trip_matches_serde() {
        let json = serde_json::to_string(&RecommendationStatus::NotInterested).unwrap();
        assert_eq!(json, "\"not_interested\"");
        assert_eq!(
            "not_interested".parse::<RecommendationStatus>().unwrap(),
            RecommendationStatus::NotInterested
        );
        assert_eq!(PaymentStatus::CodPending.to_string(), "cod_pending");
        assert!("bogus".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(RecommendationPriority::High > RecommendationPriority::Medium);
        assert!(RecommendationPriority::Medium > RecommendationPriority::Low);
    }

    #[test]
    fn test_followed_recommendations() {
        assert!(RecommendationStatus::Purchased.is_followed());
        assert!(RecommendationStatus::Tried.is_followed());
        assert!(!RecommendationStatus::Wishlist.is_followed());
    }

    #[test]
    fn test_treatment_status_strings() {
        assert_eq!(TreatmentStatus::default(), TreatmentStatus::Active);
        assert_eq!("paused".parse::<TreatmentStatus>().unwrap(), TreatmentStatus::Paused);
        assert_eq!(
            serde_json::to_string(&TreatmentStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }
}
