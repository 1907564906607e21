//! Business logic services.
//!
//! Services borrow the pool (and whatever clients they need) for the length
//! of a request and return their own error enums, which [`crate::error`]
//! maps onto HTTP responses.
//!
//! # Services
//!
//! - `auth` - Passwords, sessions and agent API keys
//! - `catalog` - Products, categories, brands, images and reviews
//! - `cart` - Session and user carts, cart migration on login
//! - `checkout` - Discounts, order placement and payment
//! - `stripe` - PaymentIntents and webhook verification
//! - `admin` - User and order administration
//! - `analytics` - Dashboard reports
//! - `import` - Product import from Excel workbooks
//! - `analysis` - Skin-analysis records and recommendations
//! - `consultations` - Consultation history built from analysis sessions
//! - `treatments` - Treatment plans and milestones
//! - `livekit` / `rooms` - Video consultation rooms
//! - `content` - Blog, newsletter and waitlist

pub mod admin;
pub mod analysis;
pub mod analytics;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod consultations;
pub mod content;
pub mod import;
pub mod livekit;
pub mod rooms;
pub mod stripe;
pub mod treatments;
