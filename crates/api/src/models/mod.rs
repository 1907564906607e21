//! Domain and API models.
//!
//! Row types derive `sqlx::FromRow` for the runtime queries in [`crate::db`];
//! request bodies derive `Deserialize` and responses derive `Serialize`.

pub mod analysis;
pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod consultation;
pub mod content;
pub mod import;
pub mod order;
pub mod pagination;
pub mod room;
pub mod session;
pub mod treatment;
pub mod user;

pub use pagination::{OffsetQuery, PageQuery, PageRequest, Paginated, Pagination};
pub use session::CurrentUser;
pub use user::User;
