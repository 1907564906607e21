//! Skinior API library.
//!
//! The JSON API behind the Skinior storefront and dashboard: catalog,
//! carts, checkout with Stripe, admin tools and reports, Excel product
//! import, skin-analysis records written by the Agent16 integration, LiveKit
//! video consultations, and blog/newsletter content.
//!
//! Exposed as a library so the CLI and tests can reuse the database layer
//! and services.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
