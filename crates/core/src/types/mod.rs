//! Core types for Skinior.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod slug;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CurrencyCode, TAX_RATE_PERCENT, round_money, tax_on, to_minor_units};
pub use slug::Slug;
pub use status::*;
