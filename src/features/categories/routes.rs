use std::sync::Arc;

use axum::{routing::get, routing::put, Router};

use crate::features::categories::handlers;
use crate::features::categories::services::CategoryService;

/// Create routes for the categories feature
///
/// Note: This feature is public (no authentication required)
pub fn routes(service: Arc<CategoryService>) -> Router {
    Router::new()
        .route(
            "/api/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/api/categories/level/{level}",
            get(handlers::list_categories_by_level),
        )
        // GET resolves by slug; PUT/DELETE address the row by id
        .route(
            "/api/categories/{slug}",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .route(
            "/api/categories/{id}/image",
            put(handlers::change_category_image).delete(handlers::remove_category_image),
        )
        .with_state(service)
}
