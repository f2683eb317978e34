pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::orders::handlers as orders;
use crate::orders::validation::MAX_RESUME_BYTES;
use crate::payments::handlers as payments;
use crate::state::AppState;

/// Multipart framing and the text fields ride on top of the file itself.
const ORDER_BODY_LIMIT: usize = MAX_RESUME_BYTES + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Orders API
        .route(
            "/api/v1/orders",
            post(orders::handle_create_order)
                .layer(DefaultBodyLimit::max(ORDER_BODY_LIMIT))
                .get(orders::handle_list_orders),
        )
        .route("/api/v1/orders/:id", get(orders::handle_get_order))
        .route(
            "/api/v1/orders/:id/artifacts/:kind",
            get(orders::handle_download_artifact),
        )
        // Payments
        .route(
            "/api/v1/webhooks/stripe",
            post(payments::handle_stripe_webhook),
        )
        .with_state(state)
}
