//! Skinior Core - Shared domain types.
//!
//! This crate provides the types used across all Skinior components:
//! - `api` - The JSON API server (catalog, cart, checkout, admin, consultations)
//! - `cli` - Command-line tools for migrations, seeding and account management
//!
//! # Architecture
//!
//! The core crate contains only types and pure domain rules - no I/O, no
//! database access, no HTTP clients. Database encoding for the types is
//! available behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, slugs, money helpers and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
