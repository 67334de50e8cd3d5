//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use crate::api::websocket::ws_handler;
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// JSON 404 for unknown routes
async fn fallback_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "application/json")],
        Body::from(r#"{"error":"Not Found"}"#),
    )
}

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // WebSocket event feed
        .route("/ws", get(ws_handler))
        // Vault state
        .route("/api/vault", get(handlers::get_vault_info))
        .route("/api/deposit", post(handlers::deposit))
        // Transactions
        .route(
            "/api/transactions",
            get(handlers::list_transactions).post(handlers::submit_transaction),
        )
        .route(
            "/api/transactions/valid",
            get(handlers::get_valid_transactions),
        )
        .route("/api/transactions/{id}", get(handlers::get_transaction))
        .route(
            "/api/transactions/{id}/confirm",
            post(handlers::confirm_transaction),
        )
        .route(
            "/api/transactions/{id}/revoke",
            post(handlers::revoke_transaction),
        )
        .route(
            "/api/transactions/{id}/execute",
            post(handlers::execute_transaction),
        )
        // Owner management (admin only)
        .route(
            "/api/owners",
            get(handlers::get_owners).post(handlers::add_owner),
        )
        .route("/api/owners/remove", post(handlers::remove_owner))
        .route("/api/owners/replace", post(handlers::replace_owner))
        .route("/api/admin/transfer", post(handlers::transfer_admin))
        .fallback(fallback_handler)
        // Add state and middleware
        .with_state(state)
        .layer(cors)
}
