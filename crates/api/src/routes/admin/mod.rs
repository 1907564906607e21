//! Admin endpoints. Every handler requires an admin session.

pub mod analytics;
pub mod catalog;
pub mod content;
pub mod orders;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

use super::rooms;
use crate::state::AppState;

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::products).post(catalog::create_product))
        .route("/bulk", post(catalog::bulk))
        .route(
            "/import",
            post(catalog::import_products).layer(DefaultBodyLimit::max(catalog::MAX_IMPORT_BYTES)),
        )
        .route(
            "/{id}",
            get(catalog::product)
                .put(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route("/{id}/images", post(catalog::add_image))
        .route("/{id}/images/{image_id}", axum::routing::delete(catalog::delete_image))
        .route("/{id}/images/{image_id}/main", put(catalog::set_main_image))
}

fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::categories).post(catalog::create_category))
        .route(
            "/{id}",
            get(catalog::category)
                .put(catalog::update_category)
                .delete(catalog::delete_category),
        )
}

fn brand_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::brands).post(catalog::create_brand))
        .route(
            "/{id}",
            get(catalog::brand)
                .put(catalog::update_brand)
                .delete(catalog::delete_brand),
        )
}

fn user_routes() -> Router<AppState> {
    Router::new().route("/", get(users::users)).route(
        "/{id}",
        get(users::user)
            .put(users::update_user)
            .delete(users::delete_user),
    )
}

fn agent_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::agents).post(users::create_agent))
        .route("/{id}", axum::routing::delete(users::deactivate_agent))
        .route("/{id}/refresh", post(users::refresh_agent))
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::orders))
        .route("/{id}", get(orders::order).put(orders::update_order))
}

fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/overview", get(analytics::overview))
        .route("/orders", get(analytics::orders))
        .route("/revenue", get(analytics::revenue))
        .route("/products", get(analytics::products))
        .route("/inventory", get(analytics::inventory))
}

fn blog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(content::posts).post(content::create_post))
        .route(
            "/{id}",
            get(content::post)
                .put(content::update_post)
                .delete(content::delete_post),
        )
}

/// Routes nested under `/api/admin`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .nest("/brands", brand_routes())
        .route("/reviews/{id}", axum::routing::delete(catalog::delete_review))
        .route("/reviews/{id}/publish", put(catalog::publish_review))
        .route("/imports", get(catalog::imports))
        .nest("/users", user_routes())
        .nest("/agents", agent_routes())
        .nest("/orders", order_routes())
        .nest("/analytics", analytics_routes())
        .nest("/blog", blog_routes())
        .route("/newsletter/subscribers", get(content::subscribers))
        .route("/newsletter/stats", get(content::subscriber_stats))
        .route("/rooms/close-all", post(rooms::close_all))
}
